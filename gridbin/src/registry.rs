/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::schema::Schema;

/// Concurrent cache of the schemas known per type.
///
/// Lookups are lock-free on the hot path; inserts go through the map's
/// entry API, which serializes writers per key. A second insert of an equal
/// schema is a no-op; an unequal schema under the same id is a fatal
/// invariant violation.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: DashMap<(i32, i32), Arc<Schema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, type_id: i32, schema_id: i32) -> Option<Arc<Schema>> {
        self.schemas
            .get(&(type_id, schema_id))
            .map(|e| Arc::clone(e.value()))
    }

    /// Registers a schema for `type_id`. Idempotent.
    pub fn insert(&self, type_id: i32, schema: Arc<Schema>) -> Result<()> {
        match self.schemas.entry((type_id, schema.id())) {
            Entry::Occupied(e) => {
                if e.get().field_ids() != schema.field_ids() {
                    return Err(Error::MetadataConflict(format!(
                        "schema id 0x{:08x} of type 0x{type_id:08x} maps to two different layouts",
                        schema.id()
                    )));
                }
                Ok(())
            }
            Entry::Vacant(e) => {
                debug!(
                    type_id = format_args!("0x{type_id:08x}"),
                    schema_id = format_args!("0x{:08x}", schema.id()),
                    fields = schema.len(),
                    "registered schema"
                );
                e.insert(schema);
                Ok(())
            }
        }
    }

    /// All schemas currently known for a type.
    pub fn schemas_of(&self, type_id: i32) -> Vec<Arc<Schema>> {
        self.schemas
            .iter()
            .filter(|e| e.key().0 == type_id)
            .map(|e| Arc::clone(e.value()))
            .collect()
    }

    /// Forgets everything known about a type. Meant for tests and for
    /// node-local cache invalidation.
    pub fn clear_type(&self, type_id: i32) {
        self.schemas.retain(|k, _| k.0 != type_id);
    }

    pub fn clear(&self) {
        self.schemas.clear();
    }
}
