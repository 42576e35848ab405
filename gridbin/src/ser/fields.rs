/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use uuid::Uuid;

use crate::error::Result;
use crate::ser::{SchemaRecorder, Writer};
use crate::value::{Date, Decimal, ObjRef, Timestamp, Value};
use crate::wire::OutBuffer;

/// The named-field surface handed to custom serializers.
///
/// Every call records one `(fieldId, offset)` pair in the current object's
/// schema and encodes the value. The same surface is implemented by the
/// metadata collector, which records names and tags without producing
/// bytes, so a serializer runs unchanged in both passes.
pub trait FieldSink {
    /// Writes one named field.
    fn write_field(&mut self, name: &str, value: &Value) -> Result<()>;

    /// Switches this object to raw mode and returns the raw byte sink.
    /// One-way: no named fields may follow.
    fn raw(&mut self) -> Result<&mut dyn RawSink>;

    fn write_byte(&mut self, name: &str, v: i8) -> Result<()> {
        self.write_field(name, &Value::Byte(v))
    }

    fn write_short(&mut self, name: &str, v: i16) -> Result<()> {
        self.write_field(name, &Value::Short(v))
    }

    fn write_int(&mut self, name: &str, v: i32) -> Result<()> {
        self.write_field(name, &Value::Int(v))
    }

    fn write_long(&mut self, name: &str, v: i64) -> Result<()> {
        self.write_field(name, &Value::Long(v))
    }

    fn write_float(&mut self, name: &str, v: f32) -> Result<()> {
        self.write_field(name, &Value::Float(v))
    }

    fn write_double(&mut self, name: &str, v: f64) -> Result<()> {
        self.write_field(name, &Value::Double(v))
    }

    fn write_char(&mut self, name: &str, v: char) -> Result<()> {
        self.write_field(name, &Value::Char(v))
    }

    fn write_bool(&mut self, name: &str, v: bool) -> Result<()> {
        self.write_field(name, &Value::Bool(v))
    }

    fn write_string(&mut self, name: &str, v: &str) -> Result<()> {
        self.write_field(name, &Value::String(v.to_owned()))
    }

    fn write_decimal(&mut self, name: &str, v: &Decimal) -> Result<()> {
        self.write_field(name, &Value::Decimal(v.clone()))
    }

    fn write_uuid(&mut self, name: &str, v: Uuid) -> Result<()> {
        self.write_field(name, &Value::Uuid(v))
    }

    fn write_date(&mut self, name: &str, v: Date) -> Result<()> {
        self.write_field(name, &Value::Date(v))
    }

    fn write_timestamp(&mut self, name: &str, v: Timestamp) -> Result<()> {
        self.write_field(name, &Value::Timestamp(v))
    }

    fn write_obj(&mut self, name: &str, v: &ObjRef) -> Result<()> {
        self.write_field(name, &Value::Obj(v.clone()))
    }
}

/// Append-only byte sink of an object's raw tail.
pub trait RawSink {
    fn push_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    fn push_u8(&mut self, v: u8) -> Result<()> {
        self.push_bytes(&[v])
    }

    fn push_i8(&mut self, v: i8) -> Result<()> {
        self.push_bytes(&[v as u8])
    }

    fn push_i16(&mut self, v: i16) -> Result<()> {
        self.push_bytes(&v.to_le_bytes())
    }

    fn push_i32(&mut self, v: i32) -> Result<()> {
        self.push_bytes(&v.to_le_bytes())
    }

    fn push_i64(&mut self, v: i64) -> Result<()> {
        self.push_bytes(&v.to_le_bytes())
    }

    fn push_f32(&mut self, v: f32) -> Result<()> {
        self.push_bytes(&v.to_le_bytes())
    }

    fn push_f64(&mut self, v: f64) -> Result<()> {
        self.push_bytes(&v.to_le_bytes())
    }

    fn push_bool(&mut self, v: bool) -> Result<()> {
        self.push_bytes(&[v as u8])
    }
}

/// [`FieldSink`] writing real bytes through the [`Writer`].
pub struct FieldWriter<'w, 'a> {
    writer: &'w mut Writer<'a>,
    rec: &'w mut SchemaRecorder,
}

impl<'w, 'a> FieldWriter<'w, 'a> {
    pub(crate) fn new(writer: &'w mut Writer<'a>, rec: &'w mut SchemaRecorder) -> Self {
        Self { writer, rec }
    }
}

impl FieldSink for FieldWriter<'_, '_> {
    fn write_field(&mut self, name: &str, value: &Value) -> Result<()> {
        let id = self.rec.field_id_for(name);
        let offset = self.writer.out_len() - self.rec.start();
        self.rec.record(id, offset)?;
        self.writer.write_value(value)
    }

    fn raw(&mut self) -> Result<&mut dyn RawSink> {
        let offset = self.writer.out_len() - self.rec.start();
        self.rec.enter_raw(offset)?;
        Ok(self)
    }
}

impl RawSink for FieldWriter<'_, '_> {
    fn push_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.out_mut().push_bytes(bytes);
        Ok(())
    }
}

/// [`RawSink`] over the output buffer, handed to external serializers.
pub struct RawWriter<'o> {
    out: &'o mut OutBuffer,
}

impl<'o> RawWriter<'o> {
    pub(crate) fn new(out: &'o mut OutBuffer) -> Self {
        Self { out }
    }
}

impl RawSink for RawWriter<'_> {
    fn push_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.out.push_bytes(bytes);
        Ok(())
    }
}
