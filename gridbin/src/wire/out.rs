/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/// Growable output buffer with absolute-offset back-patching.
///
/// The writer appends payload bytes at the end, but object headers are
/// reserved up front and patched once the payload length, schema id, and
/// flags are known. [`OutBuffer::mark`]/[`OutBuffer::truncate`] give callers
/// the pre-write mark they need to roll back a failed write.
#[derive(Debug, Default)]
pub struct OutBuffer {
    buf: Vec<u8>,
}

impl OutBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    /// Current position, to be passed to [`OutBuffer::truncate`] if the
    /// write that follows fails.
    pub fn mark(&self) -> usize {
        self.buf.len()
    }

    /// Drops everything written after `mark`.
    pub fn truncate(&mut self, mark: usize) {
        self.buf.truncate(mark);
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Appends `len` zero bytes and returns their starting offset.
    pub fn reserve_zeroed(&mut self, len: usize) -> usize {
        let off = self.buf.len();
        self.buf.resize(off + len, 0);
        off
    }

    #[inline(always)]
    pub fn push_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    #[inline(always)]
    pub fn push_i8(&mut self, v: i8) {
        self.buf.push(v as u8);
    }

    #[inline(always)]
    pub fn push_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline(always)]
    pub fn push_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline(always)]
    pub fn push_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline(always)]
    pub fn push_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline(always)]
    pub fn push_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline(always)]
    pub fn push_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline(always)]
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Patches one byte at an absolute offset. The offset must have been
    /// reserved earlier.
    pub fn patch_u8(&mut self, off: usize, v: u8) {
        self.buf[off] = v;
    }

    pub fn patch_u16(&mut self, off: usize, v: u16) {
        self.buf[off..off + 2].copy_from_slice(&v.to_le_bytes());
    }

    pub fn patch_i32(&mut self, off: usize, v: i32) {
        self.buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
    }

    /// Bytes written so far in `[from, to)`, for content hashing.
    pub fn range(&self, from: usize, to: usize) -> &[u8] {
        &self.buf[from..to]
    }
}

impl From<Vec<u8>> for OutBuffer {
    fn from(buf: Vec<u8>) -> Self {
        Self { buf }
    }
}
