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

macro_rules! impl_prim_vec {
    ($($elem:ty => $tag:ident / $variant:ident),* $(,)?) => {$(
        impl FieldValue for Vec<$elem> {
            fn tag() -> TypeTag {
                TypeTag::$tag
            }

            fn to_value(&self) -> Value {
                Value::$variant(self.clone())
            }

            fn from_value(value: &Value) -> Result<Self> {
                match value {
                    Value::$variant(v) => Ok(v.clone()),
                    other => Err(mismatch(TypeTag::$tag, other)),
                }
            }
        }
    )*};
}

impl_prim_vec! {
    i8 => ByteArr / ByteArr,
    i16 => ShortArr / ShortArr,
    i32 => IntArr / IntArr,
    i64 => LongArr / LongArr,
    f32 => FloatArr / FloatArr,
    f64 => DoubleArr / DoubleArr,
    char => CharArr / CharArr,
    bool => BooleanArr / BoolArr,
}

impl FieldValue for Vec<u8> {
    fn tag() -> TypeTag {
        TypeTag::ByteArr
    }

    fn to_value(&self) -> Value {
        Value::ByteArr(self.iter().map(|&b| b as i8).collect())
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::ByteArr(v) => Ok(v.iter().map(|&b| b as u8).collect()),
            other => Err(mismatch(TypeTag::ByteArr, other)),
        }
    }
}

impl FieldValue for Vec<Option<String>> {
    fn tag() -> TypeTag {
        TypeTag::StringArr
    }

    fn to_value(&self) -> Value {
        Value::StringArr(self.clone())
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::StringArr(v) => Ok(v.clone()),
            other => Err(mismatch(TypeTag::StringArr, other)),
        }
    }
}

impl FieldValue for Vec<String> {
    fn tag() -> TypeTag {
        TypeTag::StringArr
    }

    fn to_value(&self) -> Value {
        Value::StringArr(self.iter().cloned().map(Some).collect())
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::StringArr(v) => v
                .iter()
                .map(|s| {
                    s.clone()
                        .ok_or_else(|| mismatch(TypeTag::String, &Value::Null))
                })
                .collect(),
            other => Err(mismatch(TypeTag::StringArr, other)),
        }
    }
}
