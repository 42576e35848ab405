/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use bitflags::bitflags;

bitflags! {
    /// Header flags of a user-type object (16-bit field at offset 2).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Flags: u16 {
        /// User-defined type (vs. a predefined primitive-like value).
        const USER_TYPE = 0x0001;
        /// Schema footer present.
        const HAS_SCHEMA = 0x0002;
        /// Raw tail present.
        const HAS_RAW = 0x0004;
        /// Footer offsets are 1 byte wide.
        const OFFSET_1 = 0x0008;
        /// Footer offsets are 2 bytes wide.
        const OFFSET_2 = 0x0010;
        /// Footer omits field ids; the schema is resolved by `schemaId`.
        const COMPACT_FOOTER = 0x0020;
    }
}

impl Flags {
    /// Width in bytes of one footer offset.
    pub fn offset_width(self) -> usize {
        if self.contains(Flags::OFFSET_1) {
            1
        } else if self.contains(Flags::OFFSET_2) {
            2
        } else {
            4
        }
    }

    /// Flags encoding the minimal offset width that fits `max_offset`.
    pub fn for_max_offset(max_offset: usize) -> Flags {
        if max_offset < 0x100 {
            Flags::OFFSET_1
        } else if max_offset < 0x1_0000 {
            Flags::OFFSET_2
        } else {
            Flags::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_width() {
        assert_eq!(Flags::for_max_offset(0xFF).offset_width(), 1);
        assert_eq!(Flags::for_max_offset(0x100).offset_width(), 2);
        assert_eq!(Flags::for_max_offset(0xFFFF).offset_width(), 2);
        assert_eq!(Flags::for_max_offset(0x1_0000).offset_width(), 4);
    }
}
