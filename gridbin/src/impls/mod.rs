/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/*!

[`FieldValue`] implementations for standard types.

These are the conversions the derive macro and the typed
[`FieldReader`](crate::deser::FieldReader) accessors go through: each
implementing type knows its wire tag and how to move between itself and a
[`Value`].

*/

pub mod misc;
pub mod prim;
pub mod string;
pub mod vec;

use crate::error::{Error, Result};
use crate::value::Value;
use crate::wire::TypeTag;

/// A type that maps to exactly one wire tag and converts to and from
/// [`Value`].
pub trait FieldValue: Sized {
    /// Wire tag fields of this type are declared under.
    fn tag() -> TypeTag;

    fn to_value(&self) -> Value;

    fn from_value(value: &Value) -> Result<Self>;
}

pub(crate) fn mismatch(expected: TypeTag, found: &Value) -> Error {
    Error::Unsupported(format!(
        "cannot convert {:?} field to {expected:?}",
        found.tag()
    ))
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn tag() -> TypeTag {
        T::tag()
    }

    fn to_value(&self) -> Value {
        match self {
            None => Value::Null,
            Some(v) => v.to_value(),
        }
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
