/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/*!

Per-type encoding descriptors.

A [`TypeDescriptor`] is built once per type from a [`TypeSpec`] and is
immutable afterwards; the schemas accumulated for the type live in the
[`SchemaRegistry`](crate::registry::SchemaRegistry) instead. The descriptor
selects the encoding [`Mode`], owns the ordered field-accessor table for
declared-field types, and carries the optional value-substitution hooks
applied before encode (`write_replace`) and after decode (`read_resolve`).

*/

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::deser::{FieldReader, RawReader};
use crate::error::{Error, Result};
use crate::ident::IdMapper;
use crate::schema::Schema;
use crate::ser::{FieldSink, RawSink};
use crate::value::{ObjInst, Value};
use crate::wire::TypeTag;
use crate::UNREGISTERED_TYPE_ID;

/// User-supplied binary serializer: encodes through the writer's
/// named-field surface and decodes through random field access.
pub trait CustomSerializer: Send + Sync {
    fn write_binary(&self, obj: &ObjInst, out: &mut dyn FieldSink) -> Result<()>;
    fn read_binary(&self, input: &mut FieldReader<'_, '_>) -> Result<ObjInst>;
}

/// User-supplied byte-level serializer: the type owns its whole payload as
/// an opaque raw tail, with no schema footer and no random field access.
pub trait ExternalSerializer: Send + Sync {
    fn write_external(&self, obj: &ObjInst, out: &mut dyn RawSink) -> Result<()>;
    fn read_external(&self, input: &mut RawReader<'_>) -> Result<ObjInst>;
}

/// Value-substitution hook (`write_replace` / `read_resolve`). Failures are
/// surfaced as [`Error::UserHook`].
pub type ValueHook = Arc<dyn Fn(&Value) -> anyhow::Result<Value> + Send + Sync>;

/// How values of a type are put on the wire.
#[derive(Clone)]
pub enum Mode {
    /// Predefined primitive-like type; encoded by tag dispatch, never
    /// through a descriptor.
    Predefined(TypeTag),
    /// Plain user type: fields from the declared accessor table, or from
    /// the instance itself when no fields were declared.
    Reflected,
    /// User-supplied [`CustomSerializer`].
    Custom(Arc<dyn CustomSerializer>),
    /// User-supplied [`ExternalSerializer`]; payload is a raw tail.
    External(Arc<dyn ExternalSerializer>),
    /// Never encoded; written as `NULL`.
    Excluded,
}

impl fmt::Debug for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Predefined(t) => write!(f, "Predefined({t:?})"),
            Mode::Reflected => write!(f, "Reflected"),
            Mode::Custom(_) => write!(f, "Custom"),
            Mode::External(_) => write!(f, "External"),
            Mode::Excluded => write!(f, "Excluded"),
        }
    }
}

/// Declared field of a type: name plus expected wire tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub tag: TypeTag,
}

/// One row of the field-accessor table: resolved id, name, declared tag.
#[derive(Debug, Clone)]
pub struct FieldAccessor {
    id: i32,
    name: String,
    tag: TypeTag,
}

impl FieldAccessor {
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    /// Reads this field out of an instance.
    pub fn get<'a>(&self, inst: &'a ObjInst) -> Option<&'a Value> {
        inst.get(&self.name)
    }

    /// Stores a decoded value into an instance under this field's slot.
    pub fn set(&self, inst: &mut ObjInst, value: Value) {
        inst.push_field(crate::value::ObjField {
            id: self.id,
            name: Some(self.name.clone()),
            value,
        });
    }
}

/// Build-time specification of a type, consumed by
/// [`Context::register`](crate::context::Context::register).
///
/// The by-value setters chain:
///
/// ```
/// use gridbin::prelude::*;
///
/// let spec = TypeSpec::new("Point")
///     .with_field("x", TypeTag::Int)
///     .with_field("y", TypeTag::Int)
///     .with_affinity_key("x");
/// ```
#[derive(Clone)]
pub struct TypeSpec {
    type_name: String,
    fields: Vec<FieldSpec>,
    affinity_key: Option<String>,
    mapper: Option<Arc<dyn IdMapper>>,
    custom: Option<Arc<dyn CustomSerializer>>,
    external: Option<Arc<dyn ExternalSerializer>>,
    excluded: bool,
    predefined: Option<TypeTag>,
    metadata_enabled: bool,
    keep_deserialized: bool,
    registered: bool,
    write_replace: Option<ValueHook>,
    read_resolve: Option<ValueHook>,
}

impl TypeSpec {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
            affinity_key: None,
            mapper: None,
            custom: None,
            external: None,
            excluded: false,
            predefined: None,
            metadata_enabled: true,
            keep_deserialized: false,
            registered: true,
            write_replace: None,
            read_resolve: None,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, tag: TypeTag) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            tag,
        });
        self
    }

    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn with_affinity_key(mut self, field: impl Into<String>) -> Self {
        self.affinity_key = Some(field.into());
        self
    }

    pub fn with_mapper(mut self, mapper: Arc<dyn IdMapper>) -> Self {
        self.mapper = Some(mapper);
        self
    }

    pub fn with_custom(mut self, serializer: Arc<dyn CustomSerializer>) -> Self {
        self.custom = Some(serializer);
        self
    }

    pub fn with_external(mut self, serializer: Arc<dyn ExternalSerializer>) -> Self {
        self.external = Some(serializer);
        self
    }

    /// Values of this type are never encoded; the writer emits `NULL`.
    pub fn excluded(mut self) -> Self {
        self.excluded = true;
        self
    }

    /// Predefined primitive-like type with a fixed tag.
    pub fn predefined(type_name: impl Into<String>, tag: TypeTag) -> Self {
        let mut spec = Self::new(type_name);
        spec.predefined = Some(tag);
        spec.metadata_enabled = false;
        spec
    }

    pub fn with_metadata(mut self, enabled: bool) -> Self {
        self.metadata_enabled = enabled;
        self
    }

    /// Caches the deserialized value on [`BinaryObject`] views of this type.
    ///
    /// [`BinaryObject`]: crate::object::BinaryObject
    pub fn with_keep_deserialized(mut self, keep: bool) -> Self {
        self.keep_deserialized = keep;
        self
    }

    /// The type id is not assigned cluster-wide: frames carry the sentinel
    /// id plus the type name, and readers resolve the name locally.
    pub fn unregistered(mut self) -> Self {
        self.registered = false;
        self
    }

    pub fn with_write_replace(mut self, hook: ValueHook) -> Self {
        self.write_replace = Some(hook);
        self
    }

    pub fn with_read_resolve(mut self, hook: ValueHook) -> Self {
        self.read_resolve = Some(hook);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

/// Everything the codec knows about one type. Immutable once built.
pub struct TypeDescriptor {
    type_id: i32,
    type_name: String,
    mode: Mode,
    /// Ordered accessor table; `None` for dynamic types whose layout
    /// follows each instance.
    declared: Option<Vec<FieldAccessor>>,
    /// The declaration-order schema of a declared-field type.
    stable_schema: Option<Arc<Schema>>,
    metadata_map: BTreeMap<String, TypeTag>,
    affinity_key: Option<String>,
    mapper: Arc<dyn IdMapper>,
    metadata_enabled: bool,
    keep_deserialized: bool,
    registered: bool,
    user_type: bool,
    write_replace: Option<ValueHook>,
    read_resolve: Option<ValueHook>,
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_id", &self.type_id)
            .field("type_name", &self.type_name)
            .field("mode", &self.mode)
            .field("registered", &self.registered)
            .finish_non_exhaustive()
    }
}

impl TypeDescriptor {
    /// Builds the descriptor, resolving field ids and rejecting duplicate
    /// field names and id collisions.
    pub fn build(spec: TypeSpec, default_mapper: &Arc<dyn IdMapper>) -> Result<Self> {
        let mapper = spec.mapper.unwrap_or_else(|| Arc::clone(default_mapper));
        let type_id = mapper.type_id(&spec.type_name);
        if type_id == UNREGISTERED_TYPE_ID {
            return Err(Error::TypeConfig(format!(
                "type '{}' maps to the reserved id 0",
                spec.type_name
            )));
        }

        let mode = if let Some(s) = spec.custom {
            Mode::Custom(s)
        } else if let Some(s) = spec.external {
            Mode::External(s)
        } else if spec.excluded {
            Mode::Excluded
        } else if let Some(tag) = spec.predefined {
            Mode::Predefined(tag)
        } else {
            Mode::Reflected
        };

        let mut declared = None;
        let mut stable_schema = None;
        let mut metadata_map = BTreeMap::new();
        if !spec.fields.is_empty() {
            let mut table = Vec::with_capacity(spec.fields.len());
            let mut ids = Vec::with_capacity(spec.fields.len());
            for field in &spec.fields {
                let lower = field.name.to_lowercase();
                if table
                    .iter()
                    .any(|a: &FieldAccessor| a.name.to_lowercase() == lower)
                {
                    return Err(Error::TypeConfig(format!(
                        "duplicate field name '{}' in type '{}'",
                        field.name, spec.type_name
                    )));
                }
                let id = mapper.field_id(type_id, &field.name);
                if ids.contains(&id) {
                    return Err(Error::TypeConfig(format!(
                        "field id collision on '{}' (0x{id:08x}) in type '{}'",
                        field.name, spec.type_name
                    )));
                }
                ids.push(id);
                metadata_map.insert(field.name.clone(), field.tag);
                table.push(FieldAccessor {
                    id,
                    name: field.name.clone(),
                    tag: field.tag,
                });
            }
            stable_schema = Some(Arc::new(Schema::new(ids)));
            declared = Some(table);
        }

        if let (Some(key), Some(table)) = (&spec.affinity_key, &declared) {
            if !table.iter().any(|a| a.name == *key) {
                return Err(Error::TypeConfig(format!(
                    "affinity key '{key}' is not a field of type '{}'",
                    spec.type_name
                )));
            }
        }

        let user_type = spec.predefined.is_none();
        Ok(Self {
            type_id,
            type_name: spec.type_name,
            mode,
            declared,
            stable_schema,
            metadata_map,
            affinity_key: spec.affinity_key,
            mapper,
            metadata_enabled: spec.metadata_enabled && user_type,
            keep_deserialized: spec.keep_deserialized,
            registered: spec.registered,
            user_type,
            write_replace: spec.write_replace,
            read_resolve: spec.read_resolve,
        })
    }

    pub fn type_id(&self) -> i32 {
        self.type_id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// The declaration-order schema, for types with declared fields.
    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.stable_schema.as_ref()
    }

    pub fn declared_fields(&self) -> Option<&[FieldAccessor]> {
        self.declared.as_deref()
    }

    pub fn accessor_by_id(&self, id: i32) -> Option<&FieldAccessor> {
        self.declared.as_ref()?.iter().find(|a| a.id == id)
    }

    pub fn accessor_by_name(&self, name: &str) -> Option<&FieldAccessor> {
        self.declared.as_ref()?.iter().find(|a| a.name == name)
    }

    /// `name -> tag` map published as part of the type's metadata.
    pub fn metadata_map(&self) -> &BTreeMap<String, TypeTag> {
        &self.metadata_map
    }

    pub fn affinity_key(&self) -> Option<&str> {
        self.affinity_key.as_deref()
    }

    /// Derives a field id with this type's mapper.
    pub fn field_id(&self, name: &str) -> i32 {
        self.mapper.field_id(self.type_id, name)
    }

    pub fn metadata_enabled(&self) -> bool {
        self.metadata_enabled
    }

    pub fn keep_deserialized(&self) -> bool {
        self.keep_deserialized
    }

    pub fn registered(&self) -> bool {
        self.registered
    }

    pub fn user_type(&self) -> bool {
        self.user_type
    }

    pub fn write_replace(&self) -> Option<&ValueHook> {
        self.write_replace.as_ref()
    }

    pub fn read_resolve(&self) -> Option<&ValueHook> {
        self.read_resolve.as_ref()
    }
}
