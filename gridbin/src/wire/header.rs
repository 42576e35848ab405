/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::error::{Error, Result};
use crate::wire::{Cursor, Flags, TypeTag};
use crate::{PROTO_VER, UNREGISTERED_TYPE_ID};

/// Fixed header length of an encoded user-type object.
pub const HEADER_LEN: usize = 24;

/// Byte offsets of the header fields, relative to the object start.
pub mod offsets {
    pub const TAG: usize = 0;
    pub const VERSION: usize = 1;
    pub const FLAGS: usize = 2;
    pub const TYPE_ID: usize = 4;
    pub const HASH: usize = 8;
    pub const TOTAL_LEN: usize = 12;
    pub const SCHEMA_ID: usize = 16;
    pub const SCHEMA_OR_RAW: usize = 20;
}

/// Parsed and validated header of one encoded object.
///
/// The on-wire layout after the header is: field payload, then the raw tail
/// (if any), then the schema footer (if any), then — when both a footer and
/// a raw tail are present — a trailing `i32` holding the raw-tail offset.
/// `schema_or_raw` points at the footer when a footer exists, at the raw
/// tail otherwise. All offsets are relative to the object start.
#[derive(Debug, Clone, Copy)]
pub struct ObjectHeader {
    /// Absolute offset of the object start within the buffer.
    pub start: usize,
    pub flags: Flags,
    pub type_id: i32,
    pub hash: i32,
    pub total_len: usize,
    pub schema_id: i32,
    pub schema_or_raw: usize,
}

impl ObjectHeader {
    /// Parses the 24-byte header at `start` and validates that the whole
    /// object fits in `bytes`.
    pub fn read(bytes: &[u8], start: usize) -> Result<Self> {
        if start + HEADER_LEN > bytes.len() {
            return Err(Error::corrupt(format!(
                "object header at {start} truncated: buffer is {} bytes",
                bytes.len()
            )));
        }
        let mut cur = Cursor::at(bytes, start);
        let tag = cur.read_u8()?;
        if tag != u8::from(TypeTag::Obj) {
            return Err(Error::corrupt(format!(
                "expected object tag 0x{:02x}, found 0x{tag:02x}",
                u8::from(TypeTag::Obj)
            )));
        }
        let version = cur.read_u8()?;
        if version != PROTO_VER {
            return Err(Error::corrupt(format!(
                "unsupported protocol version {version}"
            )));
        }
        let raw_flags = cur.read_u16()?;
        let flags = Flags::from_bits(raw_flags)
            .ok_or_else(|| Error::corrupt(format!("unknown flag bits 0x{raw_flags:04x}")))?;
        let type_id = cur.read_i32()?;
        let hash = cur.read_i32()?;
        let total_len = cur.read_i32()?;
        let schema_id = cur.read_i32()?;
        let schema_or_raw = cur.read_i32()?;

        let total_len = usize::try_from(total_len)
            .ok()
            .filter(|&l| l >= HEADER_LEN)
            .ok_or_else(|| Error::corrupt(format!("bad total length {total_len}")))?;
        if start + total_len > bytes.len() {
            return Err(Error::corrupt(format!(
                "object of {total_len} bytes at {start} overruns {}-byte buffer",
                bytes.len()
            )));
        }
        let schema_or_raw = usize::try_from(schema_or_raw)
            .ok()
            .filter(|&o| o == 0 || (HEADER_LEN..=total_len).contains(&o))
            .ok_or_else(|| Error::corrupt(format!("bad schema/raw offset {schema_or_raw}")))?;

        Ok(Self {
            start,
            flags,
            type_id,
            hash,
            total_len,
            schema_id,
            schema_or_raw,
        })
    }

    pub fn has_schema(&self) -> bool {
        self.flags.contains(Flags::HAS_SCHEMA)
    }

    pub fn has_raw(&self) -> bool {
        self.flags.contains(Flags::HAS_RAW)
    }

    pub fn compact_footer(&self) -> bool {
        self.flags.contains(Flags::COMPACT_FOOTER)
    }

    pub fn unregistered(&self) -> bool {
        self.type_id == UNREGISTERED_TYPE_ID
    }

    /// Absolute end of the object.
    pub fn end(&self) -> usize {
        self.start + self.total_len
    }

    /// Absolute footer bounds, if a footer is present.
    pub fn footer(&self) -> Option<(usize, usize)> {
        if !self.has_schema() {
            return None;
        }
        let footer_start = self.start + self.schema_or_raw;
        let footer_end = if self.has_raw() {
            self.end() - 4
        } else {
            self.end()
        };
        Some((footer_start, footer_end))
    }

    /// Size in bytes of one footer entry.
    pub fn footer_entry_size(&self) -> usize {
        let id_size = if self.compact_footer() { 0 } else { 4 };
        id_size + self.flags.offset_width()
    }

    /// Number of fields recorded in the footer.
    pub fn field_count(&self) -> Result<usize> {
        let Some((fs, fe)) = self.footer() else {
            return Ok(0);
        };
        let span = fe
            .checked_sub(fs)
            .ok_or_else(|| Error::corrupt("footer bounds inverted"))?;
        let entry = self.footer_entry_size();
        if span % entry != 0 {
            return Err(Error::corrupt(format!(
                "footer span {span} not a multiple of entry size {entry}"
            )));
        }
        Ok(span / entry)
    }

    /// Offset of the raw tail relative to the object start, if present.
    pub fn raw_offset(&self, bytes: &[u8]) -> Result<Option<usize>> {
        if !self.has_raw() {
            return Ok(None);
        }
        let rel = if self.has_schema() {
            let mut cur = Cursor::at(bytes, self.end() - 4);
            cur.read_i32()?
        } else {
            self.schema_or_raw as i32
        };
        usize::try_from(rel)
            .ok()
            .filter(|&o| (HEADER_LEN..=self.total_len).contains(&o))
            .map(Some)
            .ok_or_else(|| Error::corrupt(format!("bad raw offset {rel}")))
    }

    /// Absolute bounds of the payload region (fields plus raw tail), i.e.
    /// the region covered by the header hash code.
    pub fn payload(&self) -> (usize, usize) {
        let end = match self.footer() {
            Some((fs, _)) => fs,
            None => self.end(),
        };
        (self.start + HEADER_LEN, end)
    }
}
