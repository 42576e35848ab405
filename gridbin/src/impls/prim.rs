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

macro_rules! impl_prim {
    ($($ty:ty => $tag:ident / $variant:ident),* $(,)?) => {$(
        impl FieldValue for $ty {
            fn tag() -> TypeTag {
                TypeTag::$tag
            }

            fn to_value(&self) -> Value {
                Value::$variant(*self)
            }

            fn from_value(value: &Value) -> Result<Self> {
                match value {
                    Value::$variant(v) => Ok(*v),
                    other => Err(mismatch(TypeTag::$tag, other)),
                }
            }
        }
    )*};
}

impl_prim! {
    i8 => Byte / Byte,
    i16 => Short / Short,
    i32 => Int / Int,
    i64 => Long / Long,
    f32 => Float / Float,
    f64 => Double / Double,
    char => Char / Char,
    bool => Boolean / Bool,
}

// Java has no unsigned byte; `u8` travels as a reinterpreted `BYTE`.
impl FieldValue for u8 {
    fn tag() -> TypeTag {
        TypeTag::Byte
    }

    fn to_value(&self) -> Value {
        Value::Byte(*self as i8)
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Byte(v) => Ok(*v as u8),
            other => Err(mismatch(TypeTag::Byte, other)),
        }
    }
}
