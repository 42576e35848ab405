/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use uuid::Uuid;

use super::{mismatch, FieldValue};
use crate::error::Result;
use crate::value::{Date, Decimal, ObjRef, Timestamp, Value};
use crate::wire::TypeTag;

impl FieldValue for Uuid {
    fn tag() -> TypeTag {
        TypeTag::Uuid
    }

    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Uuid(u) => Ok(*u),
            other => Err(mismatch(TypeTag::Uuid, other)),
        }
    }
}

impl FieldValue for Decimal {
    fn tag() -> TypeTag {
        TypeTag::Decimal
    }

    fn to_value(&self) -> Value {
        Value::Decimal(self.clone())
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Decimal(d) => Ok(d.clone()),
            other => Err(mismatch(TypeTag::Decimal, other)),
        }
    }
}

impl FieldValue for Date {
    fn tag() -> TypeTag {
        TypeTag::Date
    }

    fn to_value(&self) -> Value {
        Value::Date(*self)
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Date(d) => Ok(*d),
            other => Err(mismatch(TypeTag::Date, other)),
        }
    }
}

impl FieldValue for Timestamp {
    fn tag() -> TypeTag {
        TypeTag::Timestamp
    }

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Timestamp(t) => Ok(*t),
            other => Err(mismatch(TypeTag::Timestamp, other)),
        }
    }
}

impl FieldValue for ObjRef {
    fn tag() -> TypeTag {
        TypeTag::Obj
    }

    fn to_value(&self) -> Value {
        Value::Obj(self.clone())
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Obj(o) => Ok(o.clone()),
            other => Err(mismatch(TypeTag::Obj, other)),
        }
    }
}
