/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{mismatch, FieldValue};
use crate::error::Result;
use crate::value::Value;
use crate::wire::TypeTag;

impl FieldValue for String {
    fn tag() -> TypeTag {
        TypeTag::String
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(mismatch(TypeTag::String, other)),
        }
    }
}
