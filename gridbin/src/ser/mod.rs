/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/*!

Encoding.

A [`Writer`] encodes one value tree per [`Writer::write`] call into an
[`OutBuffer`]. User-type objects get a reserved header that is back-patched
in `post_write`, a schema recorder collecting `(fieldId, offset)` pairs, and
an entry in the handle table so shared and cyclic references are emitted as
back-references instead of second encodings. New schemas discovered during a
write are reported to the metadata coordinator after the object's bytes are
complete.

A `Writer` is cheap and single-threaded; create one per request (the
[`Context`] behind it is the shared, thread-safe part).

*/

use std::collections::HashMap;
use std::sync::Arc;

pub mod fields;
pub use fields::*;
mod recorder;
pub(crate) use recorder::SchemaRecorder;

use crate::context::Context;
use crate::descriptor::{Mode, TypeDescriptor};
use crate::error::{Error, Result};
use crate::ident::content_hash;
use crate::meta::{CancelToken, MetaCollector};
use crate::object::BinaryObject;
use crate::schema::Schema;
use crate::value::{EnumValue, ObjRef, Value};
use crate::wire::{header::offsets, Flags, OutBuffer, TypeTag, HEADER_LEN};
use crate::{PROTO_VER, UNREGISTERED_TYPE_ID};

/// Encodes `value` into a fresh byte vector.
pub fn encode(ctx: &Context, value: &Value) -> Result<Vec<u8>> {
    let mut out = OutBuffer::new();
    Writer::new(ctx, &mut out).write(value)?;
    Ok(out.into_vec())
}

/// One-value-tree-at-a-time encoder. See the module docs.
pub struct Writer<'a> {
    ctx: &'a Context,
    out: &'a mut OutBuffer,
    /// Object identity -> absolute header offset, for the current root.
    handles: HashMap<usize, usize>,
    cancel: Option<CancelToken>,
    /// Semantic hash to patch into the root object of the next write.
    pending_hash: Option<(usize, i32)>,
}

impl<'a> Writer<'a> {
    pub fn new(ctx: &'a Context, out: &'a mut OutBuffer) -> Self {
        Self {
            ctx,
            out,
            handles: HashMap::new(),
            cancel: None,
            pending_hash: None,
        }
    }

    /// Installs a cancellation token, honored at metadata-update
    /// boundaries only.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Encodes one root value. Returns the root's starting offset in the
    /// output buffer.
    ///
    /// On error the buffer keeps whatever was written; roll back with the
    /// [`OutBuffer::mark`] recorded before the call.
    pub fn write(&mut self, value: &Value) -> Result<usize> {
        let start = self.out.len();
        self.handles.clear();
        self.write_value(value)?;
        Ok(start)
    }

    /// Like [`Writer::write`], but patches the given semantic hash into the
    /// root object's header instead of the content hash. The root must be a
    /// user-type object.
    pub fn write_with_hash(&mut self, value: &Value, hash: i32) -> Result<usize> {
        if !matches!(value, Value::Obj(_)) {
            return Err(Error::Unsupported(
                "semantic hash override applies to user-type objects only".into(),
            ));
        }
        self.pending_hash = Some((self.out.len(), hash));
        let res = self.write(value);
        self.pending_hash = None;
        res
    }

    pub(crate) fn out_len(&self) -> usize {
        self.out.len()
    }

    pub(crate) fn out_mut(&mut self) -> &mut OutBuffer {
        self.out
    }

    pub(crate) fn write_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Obj(obj) => return self.write_object(obj),
            Value::Null => self.out.push_u8(TypeTag::Null.into()),
            Value::Byte(v) => {
                self.out.push_u8(TypeTag::Byte.into());
                self.out.push_i8(*v);
            }
            Value::Short(v) => {
                self.out.push_u8(TypeTag::Short.into());
                self.out.push_i16(*v);
            }
            Value::Int(v) => {
                self.out.push_u8(TypeTag::Int.into());
                self.out.push_i32(*v);
            }
            Value::Long(v) => {
                self.out.push_u8(TypeTag::Long.into());
                self.out.push_i64(*v);
            }
            Value::Float(v) => {
                self.out.push_u8(TypeTag::Float.into());
                self.out.push_f32(*v);
            }
            Value::Double(v) => {
                self.out.push_u8(TypeTag::Double.into());
                self.out.push_f64(*v);
            }
            Value::Char(v) => {
                self.out.push_u8(TypeTag::Char.into());
                self.push_char(*v)?;
            }
            Value::Bool(v) => {
                self.out.push_u8(TypeTag::Boolean.into());
                self.out.push_u8(*v as u8);
            }
            Value::Decimal(v) => {
                self.out.push_u8(TypeTag::Decimal.into());
                self.push_decimal(v);
            }
            Value::String(v) => {
                self.out.push_u8(TypeTag::String.into());
                self.push_string(v);
            }
            Value::Uuid(v) => {
                self.out.push_u8(TypeTag::Uuid.into());
                let (msb, lsb) = v.as_u64_pair();
                self.out.push_i64(msb as i64);
                self.out.push_i64(lsb as i64);
            }
            Value::Date(v) => {
                self.out.push_u8(TypeTag::Date.into());
                self.out.push_i64(v.millis());
            }
            Value::Timestamp(v) => {
                self.out.push_u8(TypeTag::Timestamp.into());
                self.out.push_i64(v.millis);
                self.out.push_i32(v.nanos);
            }
            Value::ByteArr(v) => {
                self.out.push_u8(TypeTag::ByteArr.into());
                self.out.push_i32(v.len() as i32);
                for &b in v {
                    self.out.push_i8(b);
                }
            }
            Value::ShortArr(v) => {
                self.out.push_u8(TypeTag::ShortArr.into());
                self.out.push_i32(v.len() as i32);
                for &x in v {
                    self.out.push_i16(x);
                }
            }
            Value::IntArr(v) => {
                self.out.push_u8(TypeTag::IntArr.into());
                self.out.push_i32(v.len() as i32);
                for &x in v {
                    self.out.push_i32(x);
                }
            }
            Value::LongArr(v) => {
                self.out.push_u8(TypeTag::LongArr.into());
                self.out.push_i32(v.len() as i32);
                for &x in v {
                    self.out.push_i64(x);
                }
            }
            Value::FloatArr(v) => {
                self.out.push_u8(TypeTag::FloatArr.into());
                self.out.push_i32(v.len() as i32);
                for &x in v {
                    self.out.push_f32(x);
                }
            }
            Value::DoubleArr(v) => {
                self.out.push_u8(TypeTag::DoubleArr.into());
                self.out.push_i32(v.len() as i32);
                for &x in v {
                    self.out.push_f64(x);
                }
            }
            Value::CharArr(v) => {
                self.out.push_u8(TypeTag::CharArr.into());
                self.out.push_i32(v.len() as i32);
                for &c in v {
                    self.push_char(c)?;
                }
            }
            Value::BoolArr(v) => {
                self.out.push_u8(TypeTag::BooleanArr.into());
                self.out.push_i32(v.len() as i32);
                for &b in v {
                    self.out.push_u8(b as u8);
                }
            }
            Value::DecimalArr(v) => {
                self.out.push_u8(TypeTag::DecimalArr.into());
                self.out.push_i32(v.len() as i32);
                for d in v {
                    match d {
                        None => self.out.push_u8(TypeTag::Null.into()),
                        Some(d) => {
                            self.out.push_u8(TypeTag::Decimal.into());
                            self.push_decimal(d);
                        }
                    }
                }
            }
            Value::StringArr(v) => {
                self.out.push_u8(TypeTag::StringArr.into());
                self.out.push_i32(v.len() as i32);
                for s in v {
                    match s {
                        None => self.out.push_u8(TypeTag::Null.into()),
                        Some(s) => {
                            self.out.push_u8(TypeTag::String.into());
                            self.push_string(s);
                        }
                    }
                }
            }
            Value::UuidArr(v) => {
                self.out.push_u8(TypeTag::UuidArr.into());
                self.out.push_i32(v.len() as i32);
                for u in v {
                    match u {
                        None => self.out.push_u8(TypeTag::Null.into()),
                        Some(u) => {
                            self.out.push_u8(TypeTag::Uuid.into());
                            let (msb, lsb) = u.as_u64_pair();
                            self.out.push_i64(msb as i64);
                            self.out.push_i64(lsb as i64);
                        }
                    }
                }
            }
            Value::DateArr(v) => {
                self.out.push_u8(TypeTag::DateArr.into());
                self.out.push_i32(v.len() as i32);
                for d in v {
                    match d {
                        None => self.out.push_u8(TypeTag::Null.into()),
                        Some(d) => {
                            self.out.push_u8(TypeTag::Date.into());
                            self.out.push_i64(d.millis());
                        }
                    }
                }
            }
            Value::TimestampArr(v) => {
                self.out.push_u8(TypeTag::TimestampArr.into());
                self.out.push_i32(v.len() as i32);
                for t in v {
                    match t {
                        None => self.out.push_u8(TypeTag::Null.into()),
                        Some(t) => {
                            self.out.push_u8(TypeTag::Timestamp.into());
                            self.out.push_i64(t.millis);
                            self.out.push_i32(t.nanos);
                        }
                    }
                }
            }
            Value::ObjArr(arr) => {
                self.out.push_u8(TypeTag::ObjArr.into());
                self.push_component(arr.type_id, arr.type_name.as_deref());
                self.out.push_i32(arr.elems.len() as i32);
                for e in &arr.elems {
                    self.write_value(e)?;
                }
            }
            Value::Collection(col) => {
                self.out.push_u8(TypeTag::Col.into());
                self.out.push_i32(col.items.len() as i32);
                self.out.push_i8(col.kind as i8);
                for item in &col.items {
                    self.write_value(item)?;
                }
            }
            Value::Map(map) => {
                self.out.push_u8(TypeTag::Map.into());
                self.out.push_i32(map.entries.len() as i32);
                self.out.push_i8(map.kind as i8);
                for (k, v) in &map.entries {
                    self.write_value(k)?;
                    self.write_value(v)?;
                }
            }
            Value::MapEntry(entry) => {
                self.out.push_u8(TypeTag::MapEntry.into());
                self.write_value(&entry.0)?;
                self.write_value(&entry.1)?;
            }
            Value::Enum(ev) => self.write_enum(ev)?,
            Value::EnumArr(arr) => {
                self.out.push_u8(TypeTag::EnumArr.into());
                self.push_component(arr.type_id, arr.type_name.as_deref());
                self.out.push_i32(arr.elems.len() as i32);
                for e in &arr.elems {
                    match e {
                        None => self.out.push_u8(TypeTag::Null.into()),
                        Some(ev) => self.write_enum(ev)?,
                    }
                }
            }
            Value::Class(name) => {
                self.out.push_u8(TypeTag::Class.into());
                let registered = self
                    .ctx
                    .descriptor_by_name(name)
                    .map(|d| d.registered())
                    .unwrap_or(false);
                if registered {
                    self.out.push_i32(self.ctx.type_id(name));
                } else {
                    self.push_component(UNREGISTERED_TYPE_ID, Some(name));
                }
            }
            Value::Binary(b) => self.write_binary_object(b),
        }
        Ok(())
    }

    fn write_enum(&mut self, ev: &EnumValue) -> Result<()> {
        self.out.push_u8(TypeTag::Enum.into());
        self.push_component(ev.type_id, ev.type_name.as_deref());
        self.out.push_i32(ev.ordinal);
        Ok(())
    }

    /// Component-type reference: the id, or the sentinel id plus the name
    /// when the type is not registered cluster-wide.
    fn push_component(&mut self, type_id: i32, type_name: Option<&str>) {
        if type_id != UNREGISTERED_TYPE_ID {
            self.out.push_i32(type_id);
        } else {
            self.out.push_i32(UNREGISTERED_TYPE_ID);
            self.out.push_u8(TypeTag::String.into());
            self.push_string(type_name.unwrap_or(""));
        }
    }

    fn write_binary_object(&mut self, b: &BinaryObject) {
        self.out.push_u8(TypeTag::PortableObj.into());
        let array = b.backing_bytes();
        self.out.push_i32(array.len() as i32);
        self.out.push_bytes(array);
        self.out.push_i32(b.start() as i32);
    }

    fn push_string(&mut self, s: &str) {
        self.out.push_i32(s.len() as i32);
        self.out.push_bytes(s.as_bytes());
    }

    fn push_char(&mut self, c: char) -> Result<()> {
        let code = c as u32;
        if code > 0xFFFF {
            return Err(Error::Unsupported(format!(
                "char U+{code:X} does not fit a single UTF-16 code unit"
            )));
        }
        self.out.push_u16(code as u16);
        Ok(())
    }

    fn push_decimal(&mut self, d: &crate::value::Decimal) {
        let scale = if d.negative() {
            d.scale() | i32::MIN
        } else {
            d.scale()
        };
        self.out.push_i32(scale);
        self.out.push_i32(d.magnitude().len() as i32);
        self.out.push_bytes(d.magnitude());
    }

    fn write_object(&mut self, obj: &ObjRef) -> Result<()> {
        if let Some(&header_pos) = self.handles.get(&obj.addr()) {
            let handle_pos = self.out.len();
            self.out.push_u8(TypeTag::Handle.into());
            self.out.push_i32((handle_pos - header_pos) as i32);
            return Ok(());
        }

        let desc = {
            let inst = obj.borrow();
            self.ctx.descriptor_for_instance(&inst)?
        };

        if let Some(hook) = desc.write_replace() {
            let replaced = hook(&Value::Obj(obj.clone())).map_err(Error::UserHook)?;
            return match replaced {
                Value::Obj(o2) if o2.ptr_eq(obj) => self.write_object_body(&desc, obj),
                Value::Obj(o2) => {
                    let d2 = {
                        let inst = o2.borrow();
                        self.ctx.descriptor_for_instance(&inst)?
                    };
                    self.write_object_body(&d2, &o2)
                }
                other => self.write_value(&other),
            };
        }
        self.write_object_body(&desc, obj)
    }

    fn write_object_body(&mut self, desc: &Arc<TypeDescriptor>, obj: &ObjRef) -> Result<()> {
        match desc.mode() {
            Mode::Excluded => {
                self.out.push_u8(TypeTag::Null.into());
                return Ok(());
            }
            Mode::Predefined(tag) => {
                return Err(Error::Unsupported(format!(
                    "predefined type '{}' ({tag:?}) cannot encode an object instance",
                    desc.type_name()
                )));
            }
            _ => {}
        }

        let start = self.out.len();
        self.out.reserve_zeroed(HEADER_LEN);
        self.handles.insert(obj.addr(), start);
        obj.borrow_mut().set_type_id(desc.type_id());

        let mut rec = SchemaRecorder::new(start, Arc::clone(desc));
        if !desc.registered() {
            self.out.push_u8(TypeTag::String.into());
            self.push_string(desc.type_name());
        }

        match desc.mode() {
            Mode::Reflected => {
                let inst = obj.borrow();
                if let Some(accessors) = desc.declared_fields() {
                    for acc in accessors {
                        let offset = self.out.len() - start;
                        rec.record(acc.id(), offset)?;
                        match acc.get(&inst) {
                            Some(v) => self.write_value(v)?,
                            None => self.out.push_u8(TypeTag::Null.into()),
                        }
                    }
                } else {
                    for field in inst.fields() {
                        let id = if field.id != 0 {
                            field.id
                        } else {
                            match &field.name {
                                Some(name) => desc.field_id(name),
                                None => {
                                    return Err(Error::TypeConfig(format!(
                                        "anonymous field in dynamic '{}' object",
                                        desc.type_name()
                                    )))
                                }
                            }
                        };
                        let offset = self.out.len() - start;
                        rec.record(id, offset)?;
                        self.write_value(&field.value)?;
                    }
                    if let Some(raw) = inst.raw() {
                        rec.enter_raw(self.out.len() - start)?;
                        self.out.push_bytes(raw);
                    }
                }
            }
            Mode::Custom(serializer) => {
                let serializer = Arc::clone(serializer);
                let inst = obj.borrow();
                let mut sink = FieldWriter::new(self, &mut rec);
                serializer.write_binary(&inst, &mut sink)?;
            }
            Mode::External(serializer) => {
                let serializer = Arc::clone(serializer);
                rec.enter_raw(self.out.len() - start)?;
                let inst = obj.borrow();
                let mut sink = RawWriter::new(self.out);
                serializer.write_external(&inst, &mut sink)?;
            }
            Mode::Excluded | Mode::Predefined(_) => unreachable!(),
        }

        self.post_write(rec, obj)
    }

    /// Emits the footer, patches the header, and reports the schema to the
    /// metadata coordinator.
    fn post_write(&mut self, rec: SchemaRecorder, obj: &ObjRef) -> Result<()> {
        let desc = Arc::clone(rec.desc());
        let start = rec.start();
        let fields_end = self.out.len();

        let schema = Schema::new(rec.field_ids().to_vec());
        let mut flags = Flags::USER_TYPE;
        let mut schema_or_raw = 0usize;

        if !rec.is_empty() {
            flags |= Flags::HAS_SCHEMA;
            flags |= Flags::for_max_offset(rec.max_offset());
            let compact = self.ctx.compact_footer();
            if compact {
                flags |= Flags::COMPACT_FOOTER;
            }
            schema_or_raw = fields_end - start;
            let width = flags.offset_width();
            for (id, off) in rec.entries() {
                if !compact {
                    self.out.push_i32(id);
                }
                match width {
                    1 => self.out.push_u8(off as u8),
                    2 => self.out.push_u16(off as u16),
                    _ => self.out.push_i32(off as i32),
                }
            }
            if let Some(raw_off) = rec.raw_offset() {
                flags |= Flags::HAS_RAW;
                self.out.push_i32(raw_off as i32);
            }
        } else if let Some(raw_off) = rec.raw_offset() {
            flags |= Flags::HAS_RAW;
            schema_or_raw = raw_off;
        }

        let total_len = self.out.len() - start;
        let hash = match self.pending_hash {
            Some((s, h)) if s == start => h,
            _ => content_hash(self.out.range(start + HEADER_LEN, fields_end)),
        };
        let wire_type_id = if desc.registered() {
            desc.type_id()
        } else {
            UNREGISTERED_TYPE_ID
        };

        self.out.patch_u8(start + offsets::TAG, TypeTag::Obj.into());
        self.out.patch_u8(start + offsets::VERSION, PROTO_VER);
        self.out.patch_u16(start + offsets::FLAGS, flags.bits());
        self.out.patch_i32(start + offsets::TYPE_ID, wire_type_id);
        self.out.patch_i32(start + offsets::HASH, hash);
        self.out.patch_i32(start + offsets::TOTAL_LEN, total_len as i32);
        self.out.patch_i32(start + offsets::SCHEMA_ID, schema.id());
        self.out
            .patch_i32(start + offsets::SCHEMA_OR_RAW, schema_or_raw as i32);

        if desc.user_type() {
            let collect = || -> Result<Vec<(String, TypeTag)>> {
                match desc.mode() {
                    Mode::Custom(serializer) => {
                        let mut collector = MetaCollector::new();
                        serializer.write_binary(&obj.borrow(), &mut collector)?;
                        Ok(collector.into_fields())
                    }
                    Mode::Reflected => {
                        if desc.declared_fields().is_some() {
                            Ok(desc
                                .metadata_map()
                                .iter()
                                .map(|(name, &tag)| (name.clone(), tag))
                                .collect())
                        } else {
                            Ok(obj
                                .borrow()
                                .fields()
                                .iter()
                                .filter_map(|f| f.name.clone().map(|n| (n, f.value.tag())))
                                .collect())
                        }
                    }
                    _ => Ok(Vec::new()),
                }
            };
            self.ctx.metadata().on_object_written(
                self.ctx.registry(),
                &desc,
                Arc::new(schema),
                collect,
                self.cancel.as_ref(),
            )?;
        }
        Ok(())
    }
}
