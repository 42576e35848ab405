/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/*!

Schema-evolution metadata.

The coordinator keeps the common path free of metadata work: after each
user-type write it checks the schema registry and does nothing when the
schema is already known. Only on genuine evolution does it run the second
(byte-free) collection pass, merge into the accumulated per-type metadata,
publish through the [`MetadataTransport`] callback, and register the new
schema. A failed publish never fails the write — the bytes are already
complete — it is queued and retried out-of-band via
[`MetadataCoordinator::retry_pending`].

*/

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::descriptor::TypeDescriptor;
use crate::error::{Error, Result};
use crate::ident::IdMapper;
use crate::registry::SchemaRegistry;
use crate::schema::Schema;
use crate::ser::{FieldSink, RawSink};
use crate::value::Value;
use crate::wire::TypeTag;

/// Published per-type metadata: the name, the affinity key, the union of
/// every field ever observed with its wire tag, and every schema observed.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMetadata {
    type_name: String,
    affinity_key: Option<String>,
    fields: BTreeMap<String, TypeTag>,
    schemas: BTreeMap<i32, Arc<Schema>>,
}

impl TypeMetadata {
    pub fn new(type_name: impl Into<String>, affinity_key: Option<String>) -> Self {
        Self {
            type_name: type_name.into(),
            affinity_key,
            fields: BTreeMap::new(),
            schemas: BTreeMap::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn affinity_key(&self) -> Option<&str> {
        self.affinity_key.as_deref()
    }

    pub fn fields(&self) -> &BTreeMap<String, TypeTag> {
        &self.fields
    }

    pub fn schemas(&self) -> impl Iterator<Item = &Arc<Schema>> {
        self.schemas.values()
    }

    pub fn schema(&self, schema_id: i32) -> Option<&Arc<Schema>> {
        self.schemas.get(&schema_id)
    }

    pub fn add_field(&mut self, name: impl Into<String>, tag: TypeTag) -> Result<()> {
        let name = name.into();
        match self.fields.get(&name) {
            Some(&existing) if existing != tag => Err(Error::MetadataConflict(format!(
                "field '{name}' of '{}' seen as {existing:?} and {tag:?}",
                self.type_name
            ))),
            _ => {
                self.fields.insert(name, tag);
                Ok(())
            }
        }
    }

    pub fn add_schema(&mut self, schema: Arc<Schema>) -> Result<()> {
        match self.schemas.get(&schema.id()) {
            Some(existing) if existing.field_ids() != schema.field_ids() => {
                Err(Error::MetadataConflict(format!(
                    "schema id 0x{:08x} of '{}' maps to two different layouts",
                    schema.id(),
                    self.type_name
                )))
            }
            _ => {
                self.schemas.insert(schema.id(), schema);
                Ok(())
            }
        }
    }

    /// Merges `other` into `self`: field union (tag conflicts are fatal)
    /// and schema union.
    pub fn merge(&mut self, other: &TypeMetadata) -> Result<()> {
        if let (Some(a), Some(b)) = (&self.affinity_key, &other.affinity_key) {
            if a != b {
                return Err(Error::MetadataConflict(format!(
                    "affinity key of '{}' seen as '{a}' and '{b}'",
                    self.type_name
                )));
            }
        }
        if self.affinity_key.is_none() {
            self.affinity_key = other.affinity_key.clone();
        }
        for (name, &tag) in &other.fields {
            self.add_field(name.clone(), tag)?;
        }
        for schema in other.schemas.values() {
            self.add_schema(Arc::clone(schema))?;
        }
        Ok(())
    }
}

/// Callback through which merged metadata leaves the codec. Runs on the
/// writing thread and may block until the cluster acknowledges.
pub trait MetadataTransport: Send + Sync {
    fn update(&self, type_id: i32, meta: &TypeMetadata) -> anyhow::Result<()>;

    /// Fire-and-forget variant: failures are logged, never surfaced.
    fn update_detached(&self, type_id: i32, meta: &TypeMetadata) {
        if let Err(e) = self.update(type_id, meta) {
            warn!(
                type_id = format_args!("0x{type_id:08x}"),
                error = %e,
                "detached metadata publish failed"
            );
        }
    }
}

/// Transport that drops every update; the default for purely local use.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTransport;

impl MetadataTransport for NoopTransport {
    fn update(&self, _type_id: i32, _meta: &TypeMetadata) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Caller-supplied cancellation flag, honored only at metadata-update
/// boundaries; byte-level work always runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Collector standing in for the output during the second serializer pass:
/// it records field names and tags and discards bytes.
#[derive(Debug, Default)]
pub struct MetaCollector {
    fields: Vec<(String, TypeTag)>,
    null_raw: NullRaw,
}

#[derive(Debug, Default)]
struct NullRaw;

impl RawSink for NullRaw {
    fn push_bytes(&mut self, _bytes: &[u8]) -> Result<()> {
        Ok(())
    }
}

impl MetaCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_fields(self) -> Vec<(String, TypeTag)> {
        self.fields
    }
}

impl FieldSink for MetaCollector {
    fn write_field(&mut self, name: &str, value: &Value) -> Result<()> {
        self.fields.push((name.to_owned(), value.tag()));
        Ok(())
    }

    fn raw(&mut self) -> Result<&mut dyn RawSink> {
        Ok(&mut self.null_raw)
    }
}

/// Detects new schemas after writes, merges and publishes per-type
/// metadata, and keeps the out-of-band retry queue.
pub struct MetadataCoordinator {
    transport: Arc<dyn MetadataTransport>,
    accumulated: Mutex<HashMap<i32, TypeMetadata>>,
    pending: Mutex<Vec<i32>>,
}

impl MetadataCoordinator {
    pub fn new(transport: Arc<dyn MetadataTransport>) -> Self {
        Self {
            transport,
            accumulated: Mutex::new(HashMap::new()),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Post-write hook. `collect` runs only when the schema is new; it
    /// yields the `(field name, tag)` pairs of the object just written.
    pub fn on_object_written(
        &self,
        registry: &SchemaRegistry,
        desc: &TypeDescriptor,
        schema: Arc<Schema>,
        collect: impl FnOnce() -> Result<Vec<(String, TypeTag)>>,
        cancel: Option<&CancelToken>,
    ) -> Result<()> {
        if registry.lookup(desc.type_id(), schema.id()).is_some() {
            return Ok(());
        }

        if !desc.metadata_enabled() {
            return registry.insert(desc.type_id(), schema);
        }

        let fields = collect()?;
        let merged = {
            let mut acc = self.accumulated.lock();
            let meta = acc.entry(desc.type_id()).or_insert_with(|| {
                TypeMetadata::new(desc.type_name(), desc.affinity_key().map(str::to_owned))
            });
            for (name, tag) in fields {
                meta.add_field(name, tag)?;
            }
            meta.add_schema(Arc::clone(&schema))?;
            meta.clone()
        };

        if let Some(token) = cancel {
            if token.is_cancelled() {
                self.enqueue_pending(desc.type_id());
                return Err(Error::Cancelled);
            }
        }

        debug!(
            type_id = format_args!("0x{:08x}", desc.type_id()),
            schema_id = format_args!("0x{:08x}", schema.id()),
            "publishing metadata for new schema"
        );
        if let Err(e) = self.transport.update(desc.type_id(), &merged) {
            warn!(
                type_id = format_args!("0x{:08x}", desc.type_id()),
                error = %e,
                "metadata publish failed; queued for out-of-band retry"
            );
            self.enqueue_pending(desc.type_id());
        }

        registry.insert(desc.type_id(), schema)
    }

    fn enqueue_pending(&self, type_id: i32) {
        let mut pending = self.pending.lock();
        if !pending.contains(&type_id) {
            pending.push(type_id);
        }
    }

    /// Re-drives queued publications. Returns the number that succeeded;
    /// failures stay queued.
    pub fn retry_pending(&self) -> usize {
        let drained: Vec<i32> = std::mem::take(&mut *self.pending.lock());
        let mut published = 0;
        for type_id in drained {
            let snapshot = self.accumulated.lock().get(&type_id).cloned();
            let Some(meta) = snapshot else { continue };
            match self.transport.update(type_id, &meta) {
                Ok(()) => published += 1,
                Err(e) => {
                    warn!(
                        type_id = format_args!("0x{type_id:08x}"),
                        error = %e,
                        "metadata publish retry failed"
                    );
                    self.enqueue_pending(type_id);
                }
            }
        }
        published
    }

    /// Number of type ids waiting for a publish retry.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Snapshot of the accumulated metadata for a type.
    pub fn metadata(&self, type_id: i32) -> Option<TypeMetadata> {
        self.accumulated.lock().get(&type_id).cloned()
    }

    /// Resolves a field id back to its name using the accumulated metadata
    /// and the given mapper. Cold path, used when decoding frames of types
    /// with no local descriptor.
    pub fn field_name(
        &self,
        type_id: i32,
        field_id: i32,
        mapper: &dyn IdMapper,
    ) -> Option<String> {
        let acc = self.accumulated.lock();
        let meta = acc.get(&type_id)?;
        meta.fields
            .keys()
            .find(|name| mapper.field_id(type_id, name) == field_id)
            .cloned()
    }
}
