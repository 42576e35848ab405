/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/*!

Typed entry into the dynamic value universe.

A [`Portable`] type carries its own [`TypeSpec`] — the ordered
field-accessor table — and converts between itself and a dynamic object
instance. The `#[derive(Portable)]` macro generates all three methods from a
named struct's fields, together with a [`FieldValue`](crate::impls::FieldValue)
implementation so derived types nest inside each other.

*/

use crate::context::Context;
use crate::descriptor::TypeSpec;
use crate::error::{Error, Result};
use crate::value::{ObjInst, Value};

/// A Rust type with a portable wire representation.
pub trait Portable: Sized {
    /// The type's registration spec: name plus ordered fields.
    fn type_spec() -> TypeSpec;

    /// Converts into a dynamic instance with all fields set.
    fn to_object(&self) -> ObjInst;

    /// Rebuilds the type from a decoded instance. Missing fields convert
    /// from `NULL`.
    fn from_object(inst: &ObjInst) -> Result<Self>;
}

/// Registers `T` (idempotent) and encodes one value.
pub fn to_bytes<T: Portable>(ctx: &Context, value: &T) -> Result<Vec<u8>> {
    ctx.register_portable::<T>()?;
    crate::ser::encode(ctx, &Value::Obj(value.to_object().into_ref()))
}

/// Registers `T` (idempotent) and decodes one value.
pub fn from_bytes<T: Portable>(ctx: &Context, bytes: &[u8]) -> Result<T> {
    ctx.register_portable::<T>()?;
    match crate::deser::decode(ctx, bytes)? {
        Value::Obj(o) => T::from_object(&o.borrow()),
        other => Err(Error::Unsupported(format!(
            "expected a user-type object, decoded {:?}",
            other.tag()
        ))),
    }
}
