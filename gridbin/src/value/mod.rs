/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/*!

The dynamic value universe.

The codec has no runtime reflection to lean on, so everything it can encode
is expressible as a [`Value`]: primitives, decimals, strings, UUIDs,
date/time instants, arrays, collections, maps, enums, nested
already-encoded objects, and user-type instances ([`ObjRef`]). Typed Rust
structs enter and leave this universe through the
[`Portable`](crate::portable::Portable) trait.

*/

pub mod decimal;
pub use decimal::*;
pub mod object;
pub use object::*;
pub mod time;
pub use time::*;

use crate::object::BinaryObject;
use crate::wire::TypeTag;
use uuid::Uuid;

/// Flavor byte of an encoded collection, preserved through decode so a
/// re-encoded value keeps its original container kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum CollectionKind {
    UserSet = -1,
    UserCol = 0,
    ArrayList = 1,
    LinkedList = 2,
    HashSet = 3,
    LinkedHashSet = 4,
}

impl CollectionKind {
    pub fn from_byte(b: i8) -> Option<Self> {
        Some(match b {
            -1 => Self::UserSet,
            0 => Self::UserCol,
            1 => Self::ArrayList,
            2 => Self::LinkedList,
            3 => Self::HashSet,
            4 => Self::LinkedHashSet,
            _ => return None,
        })
    }
}

/// Flavor byte of an encoded map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum MapKind {
    HashMap = 1,
    LinkedHashMap = 2,
}

impl MapKind {
    pub fn from_byte(b: i8) -> Option<Self> {
        Some(match b {
            1 => Self::HashMap,
            2 => Self::LinkedHashMap,
            _ => return None,
        })
    }
}

/// An enum constant: the enum type's identity plus the constant's ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub type_id: i32,
    /// Set when the enum type is not registered cluster-wide and travels by
    /// name instead.
    pub type_name: Option<String>,
    pub ordinal: i32,
}

/// Typed object array: the component type's identity plus the elements.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjArray {
    pub type_id: i32,
    pub type_name: Option<String>,
    pub elems: Vec<Value>,
}

/// Array of enum constants of one enum type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumArray {
    pub type_id: i32,
    pub type_name: Option<String>,
    pub elems: Vec<Option<EnumValue>>,
}

/// Ordered collection with a kind byte.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub kind: CollectionKind,
    pub items: Vec<Value>,
}

/// Map with a kind byte; entry order is preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct MapValue {
    pub kind: MapKind,
    pub entries: Vec<(Value, Value)>,
}

/// Any value the codec can put on the wire.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    Bool(bool),
    Decimal(Decimal),
    String(String),
    Uuid(Uuid),
    Date(Date),
    Timestamp(Timestamp),
    ByteArr(Vec<i8>),
    ShortArr(Vec<i16>),
    IntArr(Vec<i32>),
    LongArr(Vec<i64>),
    FloatArr(Vec<f32>),
    DoubleArr(Vec<f64>),
    CharArr(Vec<char>),
    BoolArr(Vec<bool>),
    DecimalArr(Vec<Option<Decimal>>),
    StringArr(Vec<Option<String>>),
    UuidArr(Vec<Option<Uuid>>),
    DateArr(Vec<Option<Date>>),
    TimestampArr(Vec<Option<Timestamp>>),
    ObjArr(ObjArray),
    Collection(Collection),
    Map(MapValue),
    MapEntry(Box<(Value, Value)>),
    Enum(EnumValue),
    EnumArr(EnumArray),
    /// Reference to a type by name (the `CLASS` wire tag).
    Class(String),
    /// A nested, already-encoded object carried as bytes.
    Binary(BinaryObject),
    /// A user-type instance.
    Obj(ObjRef),
}

impl Value {
    /// The wire tag this value is encoded under.
    pub fn tag(&self) -> TypeTag {
        match self {
            Value::Null => TypeTag::Null,
            Value::Byte(_) => TypeTag::Byte,
            Value::Short(_) => TypeTag::Short,
            Value::Int(_) => TypeTag::Int,
            Value::Long(_) => TypeTag::Long,
            Value::Float(_) => TypeTag::Float,
            Value::Double(_) => TypeTag::Double,
            Value::Char(_) => TypeTag::Char,
            Value::Bool(_) => TypeTag::Boolean,
            Value::Decimal(_) => TypeTag::Decimal,
            Value::String(_) => TypeTag::String,
            Value::Uuid(_) => TypeTag::Uuid,
            Value::Date(_) => TypeTag::Date,
            Value::Timestamp(_) => TypeTag::Timestamp,
            Value::ByteArr(_) => TypeTag::ByteArr,
            Value::ShortArr(_) => TypeTag::ShortArr,
            Value::IntArr(_) => TypeTag::IntArr,
            Value::LongArr(_) => TypeTag::LongArr,
            Value::FloatArr(_) => TypeTag::FloatArr,
            Value::DoubleArr(_) => TypeTag::DoubleArr,
            Value::CharArr(_) => TypeTag::CharArr,
            Value::BoolArr(_) => TypeTag::BooleanArr,
            Value::DecimalArr(_) => TypeTag::DecimalArr,
            Value::StringArr(_) => TypeTag::StringArr,
            Value::UuidArr(_) => TypeTag::UuidArr,
            Value::DateArr(_) => TypeTag::DateArr,
            Value::TimestampArr(_) => TypeTag::TimestampArr,
            Value::ObjArr(_) => TypeTag::ObjArr,
            Value::Collection(_) => TypeTag::Col,
            Value::Map(_) => TypeTag::Map,
            Value::MapEntry(_) => TypeTag::MapEntry,
            Value::Enum(_) => TypeTag::Enum,
            Value::EnumArr(_) => TypeTag::EnumArr,
            Value::Class(_) => TypeTag::Class,
            Value::Binary(_) => TypeTag::PortableObj,
            Value::Obj(_) => TypeTag::Obj,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The user-type instance inside, if this is one.
    pub fn as_obj(&self) -> Option<&ObjRef> {
        match self {
            Value::Obj(o) => Some(o),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        }
    )*};
}

impl_from! {
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    char => Char,
    bool => Bool,
    Decimal => Decimal,
    String => String,
    Uuid => Uuid,
    Date => Date,
    Timestamp => Timestamp,
    Vec<i8> => ByteArr,
    Vec<i16> => ShortArr,
    Vec<i32> => IntArr,
    Vec<i64> => LongArr,
    Vec<f32> => FloatArr,
    Vec<f64> => DoubleArr,
    ObjRef => Obj,
    BinaryObject => Binary,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<ObjInst> for Value {
    fn from(inst: ObjInst) -> Self {
        Value::Obj(inst.into_ref())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
