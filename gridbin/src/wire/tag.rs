/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::error::{Error, Result};

/// One-byte tag preceding every encoded value.
///
/// The numeric values are part of the wire format and frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeTag {
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    Char = 7,
    Boolean = 8,
    String = 9,
    Uuid = 10,
    Date = 11,
    ByteArr = 12,
    ShortArr = 13,
    IntArr = 14,
    LongArr = 15,
    FloatArr = 16,
    DoubleArr = 17,
    CharArr = 18,
    BooleanArr = 19,
    StringArr = 20,
    UuidArr = 21,
    DateArr = 22,
    ObjArr = 23,
    Col = 24,
    Map = 25,
    MapEntry = 26,
    PortableObj = 27,
    Enum = 28,
    EnumArr = 29,
    Decimal = 30,
    DecimalArr = 31,
    Class = 32,
    Timestamp = 33,
    TimestampArr = 34,
    /// Predefined `NULL` marker.
    Null = 101,
    /// Back-reference to a previously encoded object.
    Handle = 102,
    /// User-type object header.
    Obj = 103,
}

impl TypeTag {
    /// Decodes a tag byte, rejecting unknown values.
    pub fn from_byte(b: u8) -> Result<Self> {
        use TypeTag::*;
        Ok(match b {
            1 => Byte,
            2 => Short,
            3 => Int,
            4 => Long,
            5 => Float,
            6 => Double,
            7 => Char,
            8 => Boolean,
            9 => String,
            10 => Uuid,
            11 => Date,
            12 => ByteArr,
            13 => ShortArr,
            14 => IntArr,
            15 => LongArr,
            16 => FloatArr,
            17 => DoubleArr,
            18 => CharArr,
            19 => BooleanArr,
            20 => StringArr,
            21 => UuidArr,
            22 => DateArr,
            23 => ObjArr,
            24 => Col,
            25 => Map,
            26 => MapEntry,
            27 => PortableObj,
            28 => Enum,
            29 => EnumArr,
            30 => Decimal,
            31 => DecimalArr,
            32 => Class,
            33 => Timestamp,
            34 => TimestampArr,
            101 => Null,
            102 => Handle,
            103 => Obj,
            other => return Err(Error::corrupt(format!("unknown tag byte 0x{other:02x}"))),
        })
    }
}

impl From<TypeTag> for u8 {
    fn from(t: TypeTag) -> u8 {
        t as u8
    }
}
