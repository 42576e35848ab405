/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/*!

The codec context.

A [`Context`] owns the id mapper, the known type descriptors, the schema
registry, and the metadata coordinator. It is explicit — every encode and
decode call takes one — and cheap to clone (an `Arc` handle). Descriptor
creation is serialized per type id through the map's entry API; once
published, a descriptor is immutable and read lock-free.

*/

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::descriptor::{TypeDescriptor, TypeSpec};
use crate::error::{Error, Result};
use crate::ident::{IdMapper, NameMapper};
use crate::meta::{MetadataCoordinator, MetadataTransport, NoopTransport};
use crate::portable::Portable;
use crate::registry::SchemaRegistry;
use crate::value::ObjInst;
use crate::UNREGISTERED_TYPE_ID;

/// Codec-wide configuration, consumed by [`Context::new`].
pub struct Configuration {
    compact_footer: bool,
    mapper: Arc<dyn IdMapper>,
    transport: Arc<dyn MetadataTransport>,
    types: Vec<TypeSpec>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            compact_footer: true,
            mapper: Arc::new(NameMapper),
            transport: Arc::new(NoopTransport),
            types: Vec::new(),
        }
    }
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compact footers omit field ids and need a registry lookup on read.
    /// On by default.
    pub fn with_compact_footer(mut self, compact: bool) -> Self {
        self.compact_footer = compact;
        self
    }

    pub fn with_mapper(mut self, mapper: Arc<dyn IdMapper>) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn MetadataTransport>) -> Self {
        self.transport = transport;
        self
    }

    /// Registers a type at context construction.
    pub fn with_type(mut self, spec: TypeSpec) -> Self {
        self.types.push(spec);
        self
    }
}

struct Inner {
    compact_footer: bool,
    mapper: Arc<dyn IdMapper>,
    descriptors: DashMap<i32, Arc<TypeDescriptor>>,
    by_name: DashMap<String, i32>,
    registry: SchemaRegistry,
    coordinator: MetadataCoordinator,
}

/// Shared handle to the codec state. See the module docs.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Default for Context {
    fn default() -> Self {
        // No registered types, so construction cannot fail.
        Self::new(Configuration::default()).expect("default configuration is valid")
    }
}

impl Context {
    pub fn new(cfg: Configuration) -> Result<Self> {
        let ctx = Self {
            inner: Arc::new(Inner {
                compact_footer: cfg.compact_footer,
                mapper: cfg.mapper,
                descriptors: DashMap::new(),
                by_name: DashMap::new(),
                registry: SchemaRegistry::new(),
                coordinator: MetadataCoordinator::new(cfg.transport),
            }),
        };
        for spec in cfg.types {
            ctx.register(spec)?;
        }
        Ok(ctx)
    }

    /// Registers a type and returns its descriptor. Re-registering the same
    /// name is idempotent and returns the existing descriptor; two distinct
    /// names colliding on one type id is a fatal configuration error.
    pub fn register(&self, spec: TypeSpec) -> Result<Arc<TypeDescriptor>> {
        let desc = TypeDescriptor::build(spec, &self.inner.mapper)?;
        let desc = match self.inner.descriptors.entry(desc.type_id()) {
            Entry::Occupied(e) => {
                let existing = Arc::clone(e.get());
                if !existing.type_name().eq_ignore_ascii_case(desc.type_name()) {
                    return Err(Error::TypeConfig(format!(
                        "type id collision: '{}' and '{}' both map to 0x{:08x}",
                        existing.type_name(),
                        desc.type_name(),
                        desc.type_id()
                    )));
                }
                return Ok(existing);
            }
            Entry::Vacant(e) => {
                let desc = Arc::new(desc);
                e.insert(Arc::clone(&desc));
                desc
            }
        };
        self.inner
            .by_name
            .insert(desc.type_name().to_lowercase(), desc.type_id());

        // Declared-field types publish their stable schema right away, so
        // peers can resolve compact footers before the first local write.
        if let Some(schema) = desc.schema() {
            let pairs = desc
                .metadata_map()
                .iter()
                .map(|(name, &tag)| (name.clone(), tag))
                .collect::<Vec<_>>();
            self.inner.coordinator.on_object_written(
                &self.inner.registry,
                &desc,
                Arc::clone(schema),
                || Ok(pairs),
                None,
            )?;
        }
        Ok(desc)
    }

    /// Registers a [`Portable`] type from its derived specification.
    pub fn register_portable<T: Portable>(&self) -> Result<Arc<TypeDescriptor>> {
        self.register(T::type_spec())
    }

    pub fn descriptor(&self, type_id: i32) -> Option<Arc<TypeDescriptor>> {
        self.inner
            .descriptors
            .get(&type_id)
            .map(|e| Arc::clone(e.value()))
    }

    pub fn descriptor_by_name(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        let id = *self.inner.by_name.get(&name.to_lowercase())?;
        self.descriptor(id)
    }

    /// Descriptor for an instance about to be written, creating a dynamic
    /// one on first encounter of a new type name.
    pub(crate) fn descriptor_for_instance(&self, inst: &ObjInst) -> Result<Arc<TypeDescriptor>> {
        if inst.type_id() != UNREGISTERED_TYPE_ID {
            if let Some(desc) = self.descriptor(inst.type_id()) {
                return Ok(desc);
            }
        }
        match inst.type_name() {
            Some(name) => match self.descriptor_by_name(name) {
                Some(desc) => Ok(desc),
                None => self.register(TypeSpec::new(name)),
            },
            None => Err(Error::UnknownType {
                type_id: inst.type_id(),
            }),
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.inner.registry
    }

    pub fn metadata(&self) -> &MetadataCoordinator {
        &self.inner.coordinator
    }

    pub fn compact_footer(&self) -> bool {
        self.inner.compact_footer
    }

    pub fn mapper(&self) -> &Arc<dyn IdMapper> {
        &self.inner.mapper
    }

    /// Type id of a name under this context's default mapper.
    pub fn type_id(&self, name: &str) -> i32 {
        self.inner.mapper.type_id(name)
    }

    /// Affinity key field of a type, from its descriptor or the accumulated
    /// metadata.
    pub fn affinity_key(&self, type_id: i32) -> Option<String> {
        if let Some(desc) = self.descriptor(type_id) {
            if let Some(key) = desc.affinity_key() {
                return Some(key.to_owned());
            }
        }
        self.inner
            .coordinator
            .metadata(type_id)
            .and_then(|m| m.affinity_key().map(str::to_owned))
    }
}
