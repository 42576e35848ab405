/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/*!

Schema-aware binary object codec for in-memory data grids.

`gridbin` encodes values into a language-neutral little-endian wire format
with random field access over raw bytes: every user-type object carries a
fixed header, a field payload, and a schema footer mapping field ids to
offsets, so a single field can be read without materializing the object.
Type identities and field layouts are coordinated through a per-context
schema registry and a metadata evolution protocol; how the published
metadata travels between nodes is the caller's business (a transport
callback).

The building blocks, bottom up:

- [`wire`] — little-endian buffers, tags, flags, the object header;
- [`ident`] — frozen type/field/schema id hashes;
- [`value`] — the dynamic value universe, including shared, cycle-capable
  object instances;
- [`schema`], [`registry`] — observed field layouts and their concurrent
  per-type cache;
- [`descriptor`] — per-type encoding modes, accessor tables, hooks;
- [`context`] — the explicit, shareable codec state;
- [`ser`], [`deser`] — the writer (handle table, schema recorder, footer
  emission) and the reader (full decode and footer-driven random access);
- [`object`] — lazy [`BinaryObject`](object::BinaryObject) views;
- [`meta`] — schema-evolution detection and metadata publication;
- [`portable`] + `#[derive(Portable)]` — typed structs on the dynamic
  codec.

*/

#![deny(unconditional_recursion)]

#[cfg(feature = "derive")]
pub use gridbin_derive::Portable;

pub mod context;
pub mod descriptor;
pub mod deser;
pub mod error;
pub mod ident;
pub mod impls;
pub mod meta;
pub mod object;
pub mod portable;
pub mod registry;
pub mod schema;
pub mod ser;
pub mod value;
pub mod wire;

pub use error::{Error, Result};

/// Wire protocol version stamped into every object header.
pub const PROTO_VER: u8 = 1;

/// Sentinel type id of a type not registered cluster-wide; the frame then
/// carries the type name after the header.
pub const UNREGISTERED_TYPE_ID: i32 = 0;

pub mod prelude {
    pub use crate::context::{Configuration, Context};
    pub use crate::descriptor::{
        CustomSerializer, ExternalSerializer, FieldSpec, Mode, TypeDescriptor, TypeSpec,
    };
    pub use crate::deser::{decode, FieldReader, RawReader, Reader};
    pub use crate::error::{Error, Result};
    pub use crate::ident::{IdMapper, NameMapper};
    pub use crate::impls::FieldValue;
    pub use crate::meta::{
        CancelToken, MetadataCoordinator, MetadataTransport, NoopTransport, TypeMetadata,
    };
    pub use crate::object::BinaryObject;
    pub use crate::portable::{from_bytes, to_bytes, Portable};
    pub use crate::registry::SchemaRegistry;
    pub use crate::schema::Schema;
    pub use crate::ser::{encode, FieldSink, RawSink, Writer};
    pub use crate::value::*;
    pub use crate::wire::{Cursor, Flags, ObjectHeader, OutBuffer, TypeTag, HEADER_LEN};
    #[cfg(feature = "derive")]
    pub use gridbin_derive::Portable;
}
