/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/*!

Decoding.

A [`Reader`] sits over a byte range and offers two paths: full
materialization ([`Reader::read_root`]) and random field access
([`Reader::field`] and friends), which walks the schema footer and touches
only the header, the footer, and the requested field's bytes.

Cycles decode through the reader-side handle table: an object instance is
installed under its header offset *before* its children are decoded, so a
back-reference inside the subtree resolves to the instance under
construction. The table is keyed by absolute offset and scoped to one
`Reader`; like the writer, a `Reader` is single-threaded and per-request.

*/

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

pub mod fields;
pub use fields::*;

use crate::context::Context;
use crate::descriptor::{Mode, TypeDescriptor, TypeSpec};
use crate::error::{Error, Result};
use crate::object::BinaryObject;
use crate::value::{
    Collection, CollectionKind, Date, Decimal, EnumArray, EnumValue, MapKind, MapValue, ObjArray,
    ObjField, ObjInst, ObjRef, Timestamp, Value,
};
use crate::wire::{Cursor, ObjectHeader, TypeTag, HEADER_LEN};
use uuid::Uuid;

/// Decodes the root value at offset 0 of `bytes`.
pub fn decode(ctx: &Context, bytes: &[u8]) -> Result<Value> {
    Reader::new(ctx, bytes).read_root()
}

/// One-decode-at-a-time decoder. See the module docs.
pub struct Reader<'a> {
    ctx: &'a Context,
    bytes: &'a [u8],
    root: usize,
    /// Absolute header offset -> materialized value.
    handles: HashMap<usize, Value>,
}

impl<'a> Reader<'a> {
    pub fn new(ctx: &'a Context, bytes: &'a [u8]) -> Self {
        Self::at(ctx, bytes, 0)
    }

    /// Reader over the value starting at `root`.
    pub fn at(ctx: &'a Context, bytes: &'a [u8], root: usize) -> Self {
        Self {
            ctx,
            bytes,
            root,
            handles: HashMap::new(),
        }
    }

    pub(crate) fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Fully materializes the root value.
    pub fn read_root(&mut self) -> Result<Value> {
        let mut cur = Cursor::at(self.bytes, self.root);
        self.read_value(&mut cur)
    }

    /// Random access to a field of the root object by name.
    pub fn field(&mut self, name: &str) -> Result<Option<Value>> {
        self.field_of(self.root, name)
    }

    /// Random access by field id.
    pub fn field_by_id(&mut self, field_id: i32) -> Result<Option<Value>> {
        let hdr = ObjectHeader::read(self.bytes, self.root)?;
        let (type_id, _desc) = self.resolve_type(&hdr)?;
        self.field_by_id_in(&hdr, type_id, field_id)
    }

    /// Position-based access: the `index`-th field in footer order.
    pub fn field_by_order(&mut self, index: usize) -> Result<Option<Value>> {
        let hdr = ObjectHeader::read(self.bytes, self.root)?;
        let count = hdr.field_count()?;
        if index >= count {
            return Ok(None);
        }
        let (footer_start, _) = hdr.footer().expect("count > 0 implies footer");
        let width = hdr.flags.offset_width();
        let id_size = if hdr.compact_footer() { 0 } else { 4 };
        let entry_pos = footer_start + index * (id_size + width) + id_size;
        let rel = self.read_footer_offset(entry_pos, width)?;
        self.value_at(&hdr, rel).map(Some)
    }

    pub(crate) fn field_of(&mut self, start: usize, name: &str) -> Result<Option<Value>> {
        let hdr = ObjectHeader::read(self.bytes, start)?;
        let (type_id, desc) = self.resolve_type(&hdr)?;
        let field_id = match &desc {
            Some(d) => d.field_id(name),
            None => self.ctx.mapper().field_id(type_id, name),
        };
        self.field_by_id_in(&hdr, type_id, field_id)
    }

    fn field_by_id_in(
        &mut self,
        hdr: &ObjectHeader,
        type_id: i32,
        field_id: i32,
    ) -> Result<Option<Value>> {
        let Some((footer_start, _)) = hdr.footer() else {
            return Ok(None);
        };
        let width = hdr.flags.offset_width();
        let count = hdr.field_count()?;
        let rel = if hdr.compact_footer() {
            let schema = self
                .ctx
                .registry()
                .lookup(type_id, hdr.schema_id)
                .ok_or(Error::UnknownSchema {
                    type_id,
                    schema_id: hdr.schema_id,
                })?;
            if schema.len() != count {
                return Err(Error::corrupt(format!(
                    "footer has {count} entries but schema 0x{:08x} has {}",
                    hdr.schema_id,
                    schema.len()
                )));
            }
            let Some(index) = schema.order_of(field_id) else {
                return Ok(None);
            };
            self.read_footer_offset(footer_start + index * width, width)?
        } else {
            let entry = 4 + width;
            let mut found = None;
            for i in 0..count {
                let mut cur = Cursor::at(self.bytes, footer_start + i * entry);
                if cur.read_i32()? == field_id {
                    found = Some(self.read_footer_offset(footer_start + i * entry + 4, width)?);
                    break;
                }
            }
            match found {
                Some(rel) => rel,
                None => return Ok(None),
            }
        };
        self.value_at(hdr, rel).map(Some)
    }

    fn read_footer_offset(&self, pos: usize, width: usize) -> Result<usize> {
        let mut cur = Cursor::at(self.bytes, pos);
        Ok(match width {
            1 => cur.read_u8()? as usize,
            2 => cur.read_u16()? as usize,
            _ => {
                let off = cur.read_i32()?;
                usize::try_from(off)
                    .map_err(|_| Error::corrupt(format!("negative field offset {off}")))?
            }
        })
    }

    fn value_at(&mut self, hdr: &ObjectHeader, rel: usize) -> Result<Value> {
        if rel < HEADER_LEN || rel >= hdr.total_len {
            return Err(Error::corrupt(format!(
                "field offset {rel} outside object of {} bytes",
                hdr.total_len
            )));
        }
        let mut cur = Cursor::at(self.bytes, hdr.start + rel);
        self.read_value(&mut cur)
    }

    /// Resolves the type of an object header, reading the embedded type
    /// name when the frame carries the unregistered sentinel.
    fn resolve_type(
        &mut self,
        hdr: &ObjectHeader,
    ) -> Result<(i32, Option<Arc<TypeDescriptor>>)> {
        if hdr.unregistered() {
            let mut cur = Cursor::at(self.bytes, hdr.start + HEADER_LEN);
            let name = match TypeTag::from_byte(cur.read_u8()?)? {
                TypeTag::String => self.read_string(&mut cur)?,
                other => {
                    return Err(Error::corrupt(format!(
                        "expected embedded type name, found {other:?}"
                    )))
                }
            };
            let desc = match self.ctx.descriptor_by_name(&name) {
                Some(d) => d,
                None => self.ctx.register(TypeSpec::new(&name).unregistered())?,
            };
            Ok((desc.type_id(), Some(desc)))
        } else {
            Ok((hdr.type_id, self.ctx.descriptor(hdr.type_id)))
        }
    }

    /// Bounds of the raw tail of the object at `start`.
    pub(crate) fn raw_region_of(&mut self, start: usize) -> Result<(usize, usize)> {
        let hdr = ObjectHeader::read(self.bytes, start)?;
        let rel = hdr
            .raw_offset(self.bytes)?
            .ok_or_else(|| Error::corrupt("object has no raw tail"))?;
        let end = match hdr.footer() {
            Some((footer_start, _)) => footer_start,
            None => hdr.end(),
        };
        Ok((start + rel, end))
    }

    fn read_value(&mut self, cur: &mut Cursor<'a>) -> Result<Value> {
        let tag_pos = cur.pos();
        let tag = TypeTag::from_byte(cur.read_u8()?)?;
        Ok(match tag {
            TypeTag::Null => Value::Null,
            TypeTag::Byte => Value::Byte(cur.read_i8()?),
            TypeTag::Short => Value::Short(cur.read_i16()?),
            TypeTag::Int => Value::Int(cur.read_i32()?),
            TypeTag::Long => Value::Long(cur.read_i64()?),
            TypeTag::Float => Value::Float(cur.read_f32()?),
            TypeTag::Double => Value::Double(cur.read_f64()?),
            TypeTag::Char => Value::Char(self.read_char(cur)?),
            TypeTag::Boolean => Value::Bool(cur.read_u8()? != 0),
            TypeTag::Decimal => Value::Decimal(self.read_decimal(cur)?),
            TypeTag::String => Value::String(self.read_string(cur)?),
            TypeTag::Uuid => Value::Uuid(self.read_uuid(cur)?),
            TypeTag::Date => Value::Date(Date(cur.read_i64()?)),
            TypeTag::Timestamp => Value::Timestamp(self.read_timestamp(cur)?),
            TypeTag::ByteArr => {
                let len = cur.read_len()?;
                let mut v = Vec::with_capacity(len);
                for _ in 0..len {
                    v.push(cur.read_i8()?);
                }
                Value::ByteArr(v)
            }
            TypeTag::ShortArr => {
                let len = cur.read_len()?;
                let mut v = Vec::with_capacity(len);
                for _ in 0..len {
                    v.push(cur.read_i16()?);
                }
                Value::ShortArr(v)
            }
            TypeTag::IntArr => {
                let len = cur.read_len()?;
                let mut v = Vec::with_capacity(len);
                for _ in 0..len {
                    v.push(cur.read_i32()?);
                }
                Value::IntArr(v)
            }
            TypeTag::LongArr => {
                let len = cur.read_len()?;
                let mut v = Vec::with_capacity(len);
                for _ in 0..len {
                    v.push(cur.read_i64()?);
                }
                Value::LongArr(v)
            }
            TypeTag::FloatArr => {
                let len = cur.read_len()?;
                let mut v = Vec::with_capacity(len);
                for _ in 0..len {
                    v.push(cur.read_f32()?);
                }
                Value::FloatArr(v)
            }
            TypeTag::DoubleArr => {
                let len = cur.read_len()?;
                let mut v = Vec::with_capacity(len);
                for _ in 0..len {
                    v.push(cur.read_f64()?);
                }
                Value::DoubleArr(v)
            }
            TypeTag::CharArr => {
                let len = cur.read_len()?;
                let mut v = Vec::with_capacity(len);
                for _ in 0..len {
                    v.push(self.read_char(cur)?);
                }
                Value::CharArr(v)
            }
            TypeTag::BooleanArr => {
                let len = cur.read_len()?;
                let mut v = Vec::with_capacity(len);
                for _ in 0..len {
                    v.push(cur.read_u8()? != 0);
                }
                Value::BoolArr(v)
            }
            TypeTag::DecimalArr => {
                let len = cur.read_len()?;
                let mut v = Vec::with_capacity(len);
                for _ in 0..len {
                    v.push(self.read_nullable(cur, TypeTag::Decimal, Self::read_decimal)?);
                }
                Value::DecimalArr(v)
            }
            TypeTag::StringArr => {
                let len = cur.read_len()?;
                let mut v = Vec::with_capacity(len);
                for _ in 0..len {
                    v.push(self.read_nullable(cur, TypeTag::String, Self::read_string)?);
                }
                Value::StringArr(v)
            }
            TypeTag::UuidArr => {
                let len = cur.read_len()?;
                let mut v = Vec::with_capacity(len);
                for _ in 0..len {
                    v.push(self.read_nullable(cur, TypeTag::Uuid, Self::read_uuid)?);
                }
                Value::UuidArr(v)
            }
            TypeTag::DateArr => {
                let len = cur.read_len()?;
                let mut v = Vec::with_capacity(len);
                for _ in 0..len {
                    v.push(self.read_nullable(cur, TypeTag::Date, |_, c| {
                        Ok(Date(c.read_i64()?))
                    })?);
                }
                Value::DateArr(v)
            }
            TypeTag::TimestampArr => {
                let len = cur.read_len()?;
                let mut v = Vec::with_capacity(len);
                for _ in 0..len {
                    v.push(self.read_nullable(cur, TypeTag::Timestamp, Self::read_timestamp)?);
                }
                Value::TimestampArr(v)
            }
            TypeTag::ObjArr => {
                let (type_id, type_name) = self.read_component(cur)?;
                let len = cur.read_len()?;
                let mut elems = Vec::with_capacity(len);
                for _ in 0..len {
                    elems.push(self.read_value(cur)?);
                }
                Value::ObjArr(ObjArray {
                    type_id,
                    type_name,
                    elems,
                })
            }
            TypeTag::Col => {
                let len = cur.read_len()?;
                let kind_byte = cur.read_i8()?;
                let kind = CollectionKind::from_byte(kind_byte).ok_or_else(|| {
                    Error::corrupt(format!("unknown collection kind {kind_byte}"))
                })?;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(self.read_value(cur)?);
                }
                Value::Collection(Collection { kind, items })
            }
            TypeTag::Map => {
                let len = cur.read_len()?;
                let kind_byte = cur.read_i8()?;
                let kind = MapKind::from_byte(kind_byte)
                    .ok_or_else(|| Error::corrupt(format!("unknown map kind {kind_byte}")))?;
                let mut entries = Vec::with_capacity(len);
                for _ in 0..len {
                    let k = self.read_value(cur)?;
                    let v = self.read_value(cur)?;
                    entries.push((k, v));
                }
                Value::Map(MapValue { kind, entries })
            }
            TypeTag::MapEntry => {
                let k = self.read_value(cur)?;
                let v = self.read_value(cur)?;
                Value::MapEntry(Box::new((k, v)))
            }
            TypeTag::Enum => Value::Enum(self.read_enum_body(cur)?),
            TypeTag::EnumArr => {
                let (type_id, type_name) = self.read_component(cur)?;
                let len = cur.read_len()?;
                let mut elems = Vec::with_capacity(len);
                for _ in 0..len {
                    let elem_tag = TypeTag::from_byte(cur.read_u8()?)?;
                    elems.push(match elem_tag {
                        TypeTag::Null => None,
                        TypeTag::Enum => Some(self.read_enum_body(cur)?),
                        other => {
                            return Err(Error::corrupt(format!(
                                "unexpected {other:?} in enum array"
                            )))
                        }
                    });
                }
                Value::EnumArr(EnumArray {
                    type_id,
                    type_name,
                    elems,
                })
            }
            TypeTag::Class => {
                let (type_id, type_name) = self.read_component(cur)?;
                match type_name {
                    Some(name) => Value::Class(name),
                    None => {
                        let desc = self
                            .ctx
                            .descriptor(type_id)
                            .ok_or(Error::UnknownType { type_id })?;
                        Value::Class(desc.type_name().to_owned())
                    }
                }
            }
            TypeTag::PortableObj => {
                let len = cur.read_len()?;
                let array = cur.take(len)?.to_vec();
                let offset = cur.read_len()?;
                let view = BinaryObject::attached(
                    self.ctx.clone(),
                    Rc::new(array),
                    offset,
                    true,
                )?;
                Value::Binary(view)
            }
            TypeTag::Handle => {
                let back = cur.read_i32()?;
                let target = usize::try_from(back)
                    .ok()
                    .filter(|&b| b > 0 && b <= tag_pos)
                    .map(|b| tag_pos - b)
                    .ok_or_else(|| Error::corrupt(format!("bad handle offset {back}")))?;
                if let Some(v) = self.handles.get(&target) {
                    v.clone()
                } else {
                    let mut referent = Cursor::at(self.bytes, target);
                    self.read_value(&mut referent)?
                }
            }
            TypeTag::Obj => {
                cur.seek(tag_pos)?;
                self.read_object(cur)?
            }
        })
    }

    /// Decodes a user-type object whose header starts at the cursor.
    fn read_object(&mut self, cur: &mut Cursor<'a>) -> Result<Value> {
        let start = cur.pos();
        let hdr = ObjectHeader::read(self.bytes, start)?;
        if let Some(v) = self.handles.get(&start) {
            let v = v.clone();
            cur.seek(hdr.end())?;
            return Ok(v);
        }

        let (type_id, desc) = self.resolve_type(&hdr)?;
        let type_name = desc.as_ref().map(|d| d.type_name().to_owned());

        // Install the placeholder before decoding children so cycles
        // resolve to the instance under construction.
        let obj = ObjRef::new(ObjInst::with_type_id(type_id, type_name.clone()));
        self.handles.insert(start, Value::Obj(obj.clone()));

        let mode = desc.as_ref().map(|d| d.mode().clone());
        match mode {
            Some(Mode::Custom(serializer)) => {
                let mut input = FieldReader::new(self, start);
                let mut inst = serializer.read_binary(&mut input)?;
                inst.set_type_id(type_id);
                inst.set_type_name(type_name);
                *obj.borrow_mut() = inst;
            }
            Some(Mode::External(serializer)) => {
                let (raw_start, raw_end) = self.raw_region_of(start)?;
                let mut input = RawReader::new(self.bytes, raw_start, raw_end);
                let mut inst = serializer.read_external(&mut input)?;
                inst.set_type_id(type_id);
                inst.set_type_name(type_name);
                *obj.borrow_mut() = inst;
            }
            _ => {
                for (field_id, rel) in self.footer_entries(&hdr, type_id)? {
                    let name = desc
                        .as_ref()
                        .and_then(|d| d.accessor_by_id(field_id).map(|a| a.name().to_owned()))
                        .or_else(|| {
                            self.ctx.metadata().field_name(
                                type_id,
                                field_id,
                                self.ctx.mapper().as_ref(),
                            )
                        });
                    let value = self.value_at(&hdr, rel)?;
                    obj.borrow_mut().push_field(ObjField {
                        id: field_id,
                        name,
                        value,
                    });
                }
                if hdr.has_raw() {
                    let (raw_start, raw_end) = self.raw_region_of(start)?;
                    obj.borrow_mut()
                        .set_raw(self.bytes[raw_start..raw_end].to_vec());
                }
            }
        }

        let mut result = Value::Obj(obj);
        if let Some(hook) = desc.as_ref().and_then(|d| d.read_resolve()) {
            result = hook(&result).map_err(Error::UserHook)?;
            // Only back-references resolved after this point observe the
            // replacement.
            self.handles.insert(start, result.clone());
        }
        cur.seek(hdr.end())?;
        Ok(result)
    }

    /// Footer entries as `(fieldId, relative offset)` pairs, resolving the
    /// schema through the registry under compact footers.
    fn footer_entries(&mut self, hdr: &ObjectHeader, type_id: i32) -> Result<Vec<(i32, usize)>> {
        let Some((footer_start, _)) = hdr.footer() else {
            return Ok(Vec::new());
        };
        let count = hdr.field_count()?;
        let width = hdr.flags.offset_width();
        let mut entries = Vec::with_capacity(count);
        if hdr.compact_footer() {
            let schema = self
                .ctx
                .registry()
                .lookup(type_id, hdr.schema_id)
                .ok_or(Error::UnknownSchema {
                    type_id,
                    schema_id: hdr.schema_id,
                })?;
            if schema.len() != count {
                return Err(Error::corrupt(format!(
                    "footer has {count} entries but schema 0x{:08x} has {}",
                    hdr.schema_id,
                    schema.len()
                )));
            }
            for (i, &field_id) in schema.field_ids().iter().enumerate() {
                let rel = self.read_footer_offset(footer_start + i * width, width)?;
                entries.push((field_id, rel));
            }
        } else {
            let entry = 4 + width;
            for i in 0..count {
                let mut cur = Cursor::at(self.bytes, footer_start + i * entry);
                let field_id = cur.read_i32()?;
                let rel = self.read_footer_offset(footer_start + i * entry + 4, width)?;
                entries.push((field_id, rel));
            }
        }
        Ok(entries)
    }

    fn read_component(&mut self, cur: &mut Cursor<'a>) -> Result<(i32, Option<String>)> {
        let type_id = cur.read_i32()?;
        if type_id != crate::UNREGISTERED_TYPE_ID {
            return Ok((type_id, None));
        }
        match TypeTag::from_byte(cur.read_u8()?)? {
            TypeTag::String => {
                let name = self.read_string(cur)?;
                Ok((type_id, Some(name)))
            }
            other => Err(Error::corrupt(format!(
                "expected component type name, found {other:?}"
            ))),
        }
    }

    fn read_enum_body(&mut self, cur: &mut Cursor<'a>) -> Result<EnumValue> {
        let (type_id, type_name) = self.read_component(cur)?;
        let ordinal = cur.read_i32()?;
        Ok(EnumValue {
            type_id,
            type_name,
            ordinal,
        })
    }

    fn read_nullable<T>(
        &mut self,
        cur: &mut Cursor<'a>,
        expected: TypeTag,
        read: impl FnOnce(&mut Self, &mut Cursor<'a>) -> Result<T>,
    ) -> Result<Option<T>> {
        let tag = TypeTag::from_byte(cur.read_u8()?)?;
        if tag == TypeTag::Null {
            return Ok(None);
        }
        if tag != expected {
            return Err(Error::corrupt(format!(
                "expected {expected:?} or NULL, found {tag:?}"
            )));
        }
        read(self, cur).map(Some)
    }

    fn read_char(&mut self, cur: &mut Cursor<'a>) -> Result<char> {
        let code = cur.read_u16()? as u32;
        char::from_u32(code)
            .ok_or_else(|| Error::corrupt(format!("invalid char code unit 0x{code:04x}")))
    }

    fn read_string(&mut self, cur: &mut Cursor<'a>) -> Result<String> {
        let len = cur.read_len()?;
        let bytes = cur.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::corrupt(format!("invalid UTF-8 in string: {e}")))
    }

    fn read_uuid(&mut self, cur: &mut Cursor<'a>) -> Result<Uuid> {
        let msb = cur.read_i64()?;
        let lsb = cur.read_i64()?;
        Ok(Uuid::from_u64_pair(msb as u64, lsb as u64))
    }

    fn read_decimal(&mut self, cur: &mut Cursor<'a>) -> Result<Decimal> {
        let raw_scale = cur.read_i32()?;
        let negative = raw_scale < 0;
        let scale = raw_scale & i32::MAX;
        let len = cur.read_len()?;
        let magnitude = cur.take(len)?.to_vec();
        Decimal::from_parts(negative, scale, magnitude)
    }

    fn read_timestamp(&mut self, cur: &mut Cursor<'a>) -> Result<Timestamp> {
        let millis = cur.read_i64()?;
        let nanos = cur.read_i32()?;
        Ok(Timestamp { millis, nanos })
    }
}
