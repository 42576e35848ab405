/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use uuid::Uuid;

use crate::deser::Reader;
use crate::error::Result;
use crate::impls::FieldValue;
use crate::value::{Date, Decimal, ObjRef, Timestamp, Value};
use crate::wire::Cursor;

/// The named-field surface handed to custom serializers on decode.
///
/// Every read is a random access through the object's footer: only the
/// header, the footer, and the requested field's bytes are touched.
pub struct FieldReader<'r, 'a> {
    rd: &'r mut Reader<'a>,
    start: usize,
}

impl<'r, 'a> FieldReader<'r, 'a> {
    pub(crate) fn new(rd: &'r mut Reader<'a>, start: usize) -> Self {
        Self { rd, start }
    }

    /// Reads one named field; `None` when the object has no such field.
    pub fn read_field(&mut self, name: &str) -> Result<Option<Value>> {
        self.rd.field_of(self.start, name)
    }

    /// Reads and converts one named field; a missing field converts from
    /// `NULL`.
    pub fn read<T: FieldValue>(&mut self, name: &str) -> Result<T> {
        let value = self.read_field(name)?.unwrap_or(Value::Null);
        T::from_value(&value)
    }

    pub fn read_byte(&mut self, name: &str) -> Result<i8> {
        self.read(name)
    }

    pub fn read_short(&mut self, name: &str) -> Result<i16> {
        self.read(name)
    }

    pub fn read_int(&mut self, name: &str) -> Result<i32> {
        self.read(name)
    }

    pub fn read_long(&mut self, name: &str) -> Result<i64> {
        self.read(name)
    }

    pub fn read_float(&mut self, name: &str) -> Result<f32> {
        self.read(name)
    }

    pub fn read_double(&mut self, name: &str) -> Result<f64> {
        self.read(name)
    }

    pub fn read_char(&mut self, name: &str) -> Result<char> {
        self.read(name)
    }

    pub fn read_bool(&mut self, name: &str) -> Result<bool> {
        self.read(name)
    }

    pub fn read_string(&mut self, name: &str) -> Result<String> {
        self.read(name)
    }

    pub fn read_decimal(&mut self, name: &str) -> Result<Decimal> {
        self.read(name)
    }

    pub fn read_uuid(&mut self, name: &str) -> Result<Uuid> {
        self.read(name)
    }

    pub fn read_date(&mut self, name: &str) -> Result<Date> {
        self.read(name)
    }

    pub fn read_timestamp(&mut self, name: &str) -> Result<Timestamp> {
        self.read(name)
    }

    pub fn read_obj(&mut self, name: &str) -> Result<Option<ObjRef>> {
        Ok(match self.read_field(name)? {
            Some(Value::Obj(o)) => Some(o),
            _ => None,
        })
    }

    /// The raw tail of this object.
    pub fn raw(&mut self) -> Result<RawReader<'a>> {
        let (start, end) = self.rd.raw_region_of(self.start)?;
        Ok(RawReader::new(self.rd.bytes(), start, end))
    }
}

/// Bounds-checked reader over an object's raw tail.
pub struct RawReader<'a> {
    cur: Cursor<'a>,
}

impl<'a> RawReader<'a> {
    pub(crate) fn new(bytes: &'a [u8], start: usize, end: usize) -> Self {
        Self {
            cur: Cursor::at(&bytes[..end], start),
        }
    }

    pub fn remaining(&self) -> usize {
        self.cur.len() - self.cur.pos()
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.cur.take(n)
    }

    /// Everything left in the raw tail.
    pub fn read_rest(&mut self) -> Result<&'a [u8]> {
        self.cur.take(self.remaining())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.cur.read_u8()
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.cur.read_i8()
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.cur.read_i16()
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.cur.read_i32()
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.cur.read_i64()
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.cur.read_f32()
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.cur.read_f64()
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.cur.read_u8()? != 0)
    }
}
