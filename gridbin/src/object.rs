/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/*!

Lazy views over encoded objects.

A [`BinaryObject`] is a window into an encoded byte range: header getters
are constant-time reads, field access goes through the footer without
materializing the rest of the object, and [`BinaryObject::deserialize`]
produces the full value on demand. A view is *attached* when it shares a
larger backing buffer and *detached* when the buffer contains exactly its
own bytes; [`BinaryObject::detach`] is idempotent.

*/

use core::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::context::Context;
use crate::deser::Reader;
use crate::error::{Error, Result};
use crate::ser::Writer;
use crate::value::Value;
use crate::wire::{header::offsets, Cursor, Flags, ObjectHeader, OutBuffer};

/// Lazy view over one encoded user-type object. See the module docs.
#[derive(Clone)]
pub struct BinaryObject {
    ctx: Context,
    bytes: Rc<Vec<u8>>,
    start: usize,
    total_len: usize,
    detach_allowed: bool,
    cached: Rc<RefCell<Option<Value>>>,
}

impl BinaryObject {
    /// View over a buffer that starts with the object's header. The buffer
    /// may extend past the object.
    pub fn from_bytes(ctx: &Context, bytes: Vec<u8>) -> Result<Self> {
        Self::attached(ctx.clone(), Rc::new(bytes), 0, true)
    }

    /// Encodes a user-type value into a fresh detached view.
    pub fn encode(ctx: &Context, value: &Value) -> Result<Self> {
        match value {
            Value::Obj(_) => {
                let mut out = OutBuffer::new();
                Writer::new(ctx, &mut out).write(value)?;
                Self::from_bytes(ctx, out.into_vec())
            }
            Value::Binary(b) => Ok(b.detach()),
            other => Err(Error::Unsupported(format!(
                "cannot take a binary view of a {:?} value",
                other.tag()
            ))),
        }
    }

    pub(crate) fn attached(
        ctx: Context,
        bytes: Rc<Vec<u8>>,
        start: usize,
        detach_allowed: bool,
    ) -> Result<Self> {
        let hdr = ObjectHeader::read(&bytes, start)?;
        Ok(Self {
            ctx,
            bytes,
            start,
            total_len: hdr.total_len,
            detach_allowed,
            cached: Rc::new(RefCell::new(None)),
        })
    }

    fn header_i32(&self, offset: usize) -> i32 {
        let mut cur = Cursor::at(&self.bytes, self.start + offset);
        cur.read_i32().expect("header validated at construction")
    }

    /// Type id from the header; the sentinel `0` for unregistered types.
    pub fn type_id(&self) -> i32 {
        self.header_i32(offsets::TYPE_ID)
    }

    pub fn schema_id(&self) -> i32 {
        self.header_i32(offsets::SCHEMA_ID)
    }

    pub fn hash_code(&self) -> i32 {
        self.header_i32(offsets::HASH)
    }

    pub fn total_len(&self) -> usize {
        self.total_len
    }

    pub fn flags(&self) -> Flags {
        let mut cur = Cursor::at(&self.bytes, self.start + offsets::FLAGS);
        Flags::from_bits_truncate(cur.read_u16().expect("header validated at construction"))
    }

    /// Offset of the object within its backing buffer.
    pub fn start(&self) -> usize {
        self.start
    }

    /// The whole backing buffer; handles inside the object may point
    /// anywhere in it.
    pub(crate) fn backing_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Exactly this object's bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[self.start..self.start + self.total_len]
    }

    pub fn clone_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    /// Random access to one field by name, without materializing the
    /// object.
    pub fn field(&self, name: &str) -> Result<Option<Value>> {
        Reader::at(&self.ctx, &self.bytes, self.start).field(name)
    }

    pub fn field_by_id(&self, field_id: i32) -> Result<Option<Value>> {
        Reader::at(&self.ctx, &self.bytes, self.start).field_by_id(field_id)
    }

    pub fn field_by_order(&self, index: usize) -> Result<Option<Value>> {
        Reader::at(&self.ctx, &self.bytes, self.start).field_by_order(index)
    }

    /// Full materialization. When the type descriptor has
    /// `keep_deserialized`, the result is cached on the view.
    pub fn deserialize(&self) -> Result<Value> {
        if let Some(v) = self.cached.borrow().as_ref() {
            return Ok(v.clone());
        }
        let value = Reader::at(&self.ctx, &self.bytes, self.start).read_root()?;
        let keep = self
            .ctx
            .descriptor(self.type_id())
            .map(|d| d.keep_deserialized())
            .unwrap_or(false);
        if keep {
            *self.cached.borrow_mut() = Some(value.clone());
        }
        Ok(value)
    }

    /// `true` when the backing buffer contains exactly this object.
    pub fn detached(&self) -> bool {
        self.start == 0 && self.total_len == self.bytes.len()
    }

    /// Copies the object into its own buffer, if allowed and not already
    /// detached. Idempotent.
    pub fn detach(&self) -> BinaryObject {
        if !self.detach_allowed || self.detached() {
            return self.clone();
        }
        BinaryObject {
            ctx: self.ctx.clone(),
            bytes: Rc::new(self.as_bytes().to_vec()),
            start: 0,
            total_len: self.total_len,
            detach_allowed: self.detach_allowed,
            cached: Rc::clone(&self.cached),
        }
    }
}

// Byte-for-byte equality of the viewed range.
impl PartialEq for BinaryObject {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl fmt::Debug for BinaryObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryObject")
            .field("type_id", &format_args!("0x{:08x}", self.type_id()))
            .field("schema_id", &format_args!("0x{:08x}", self.schema_id()))
            .field("len", &self.total_len)
            .field("detached", &self.detached())
            .finish()
    }
}
