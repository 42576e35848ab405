/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::sync::Arc;

use crate::descriptor::TypeDescriptor;
use crate::error::{Error, Result};

/// Per-object write state. The header is reserved before the recorder is
/// created; `post_write` emits the footer and patches the header, consuming
/// the recorder. The transition to `Raw` is one-way: once raw bytes exist,
/// no further named fields may be recorded for this object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecState {
    FieldsOpen,
    Raw,
}

/// Collects `(fieldId, offset)` pairs while one object's fields are being
/// written. Offsets are relative to the object start.
pub(crate) struct SchemaRecorder {
    start: usize,
    desc: Arc<TypeDescriptor>,
    state: RecState,
    field_ids: Vec<i32>,
    offsets: Vec<usize>,
    raw_offset: Option<usize>,
}

impl SchemaRecorder {
    pub fn new(start: usize, desc: Arc<TypeDescriptor>) -> Self {
        Self {
            start,
            desc,
            state: RecState::FieldsOpen,
            field_ids: Vec::new(),
            offsets: Vec::new(),
            raw_offset: None,
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn desc(&self) -> &Arc<TypeDescriptor> {
        &self.desc
    }

    /// Field id under this object's type, via the descriptor's mapper.
    pub fn field_id_for(&self, name: &str) -> i32 {
        self.desc.field_id(name)
    }

    /// Records one field at the given relative offset.
    pub fn record(&mut self, field_id: i32, offset: usize) -> Result<()> {
        if self.state == RecState::Raw {
            return Err(Error::TypeConfig(format!(
                "serializer for '{}' wrote a named field after switching to raw mode",
                self.desc.type_name()
            )));
        }
        if self.field_ids.contains(&field_id) {
            return Err(Error::TypeConfig(format!(
                "field id 0x{field_id:08x} written twice in one '{}' object",
                self.desc.type_name()
            )));
        }
        self.field_ids.push(field_id);
        self.offsets.push(offset);
        Ok(())
    }

    /// Switches to raw mode at the given relative offset. Idempotent.
    pub fn enter_raw(&mut self, offset: usize) -> Result<()> {
        if self.state == RecState::FieldsOpen {
            self.state = RecState::Raw;
            self.raw_offset = Some(offset);
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.field_ids.is_empty()
    }

    pub fn field_ids(&self) -> &[i32] {
        &self.field_ids
    }

    pub fn entries(&self) -> impl Iterator<Item = (i32, usize)> + '_ {
        self.field_ids.iter().copied().zip(self.offsets.iter().copied())
    }

    pub fn max_offset(&self) -> usize {
        self.offsets.iter().copied().max().unwrap_or(0)
    }

    pub fn raw_offset(&self) -> Option<usize> {
        self.raw_offset
    }
}
