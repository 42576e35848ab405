/*
 * SPDX-FileCopyrightText: 2023 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![cfg(test)]

//! Byte-exact layout checks of encoded user-type objects.

use gridbin::prelude::*;

fn i32_at(bytes: &[u8], off: usize) -> i32 {
    i32::from_le_bytes(bytes[off..off + 4].try_into().unwrap())
}

fn u16_at(bytes: &[u8], off: usize) -> u16 {
    u16::from_le_bytes(bytes[off..off + 2].try_into().unwrap())
}

fn point_ctx(compact: bool) -> Context {
    Context::new(
        Configuration::new()
            .with_compact_footer(compact)
            .with_type(
                TypeSpec::new("Point")
                    .with_field("x", TypeTag::Int)
                    .with_field("y", TypeTag::Int),
            ),
    )
    .unwrap()
}

fn point(x: i32, y: i32) -> Value {
    ObjInst::new("Point").set("x", x).set("y", y).into()
}

#[test]
fn full_footer_layout() {
    let ctx = point_ctx(false);
    let bytes = encode(&ctx, &point(3, 4)).unwrap();

    // 24-byte header.
    assert_eq!(bytes[0], 0x67);
    assert_eq!(bytes[1], 1);
    let flags = Flags::from_bits(u16_at(&bytes, 2)).unwrap();
    assert_eq!(flags, Flags::USER_TYPE | Flags::HAS_SCHEMA | Flags::OFFSET_1);
    assert_eq!(i32_at(&bytes, 4), 0x065E_5590); // typeId("point")
    assert_eq!(i32_at(&bytes, 8), 783_969_056); // content hash of payload
    assert_eq!(i32_at(&bytes, 12), 44); // total length
    assert_eq!(i32_at(&bytes, 16), -224_143_308); // schemaId([x, y])
    assert_eq!(i32_at(&bytes, 20), 34); // footer offset
    assert_eq!(bytes.len(), 44);

    // Payload: INT 3, INT 4 in declaration order.
    assert_eq!(&bytes[24..34], &[3, 3, 0, 0, 0, 3, 4, 0, 0, 0]);

    // Footer: (fieldId, offset) pairs with 1-byte offsets.
    assert_eq!(i32_at(&bytes, 34), 120); // fieldId("x")
    assert_eq!(bytes[38], 24); // offset of x
    assert_eq!(i32_at(&bytes, 39), 121); // fieldId("y")
    assert_eq!(bytes[43], 29); // offset of y
}

#[test]
fn compact_footer_layout() {
    let ctx = point_ctx(true);
    let bytes = encode(&ctx, &point(3, 4)).unwrap();

    let flags = Flags::from_bits(u16_at(&bytes, 2)).unwrap();
    assert_eq!(
        flags,
        Flags::USER_TYPE | Flags::HAS_SCHEMA | Flags::OFFSET_1 | Flags::COMPACT_FOOTER
    );
    assert_eq!(i32_at(&bytes, 12), 36);
    assert_eq!(bytes.len(), 36);
    // Footer holds offsets only; field ids come from the registry.
    assert_eq!(&bytes[34..36], &[24, 29]);
}

#[test]
fn empty_object_has_no_footer() {
    let ctx = Context::default();
    let bytes = encode(&ctx, &ObjInst::new("Empty").into()).unwrap();
    let flags = Flags::from_bits(u16_at(&bytes, 2)).unwrap();
    assert_eq!(flags, Flags::USER_TYPE);
    assert_eq!(i32_at(&bytes, 16), 0); // schemaId of the empty layout
    assert_eq!(bytes.len(), 24);
}

#[test]
fn footer_width_grows_with_offsets() {
    let ctx = Context::default();

    let small = encode(
        &ctx,
        &ObjInst::new("W1").set("a", vec![0i8; 10]).set("b", 1i32).into(),
    )
    .unwrap();
    assert!(Flags::from_bits(u16_at(&small, 2)).unwrap().contains(Flags::OFFSET_1));

    let medium = encode(
        &ctx,
        &ObjInst::new("W2").set("a", vec![0i8; 300]).set("b", 1i32).into(),
    )
    .unwrap();
    let flags = Flags::from_bits(u16_at(&medium, 2)).unwrap();
    assert!(flags.contains(Flags::OFFSET_2));
    assert!(!flags.contains(Flags::OFFSET_1));

    let large = encode(
        &ctx,
        &ObjInst::new("W3")
            .set("a", vec![0i8; 70_000])
            .set("b", 1i32)
            .into(),
    )
    .unwrap();
    let flags = Flags::from_bits(u16_at(&large, 2)).unwrap();
    assert!(!flags.contains(Flags::OFFSET_1));
    assert!(!flags.contains(Flags::OFFSET_2));
    assert_eq!(flags.offset_width(), 4);
}

#[test]
fn unregistered_type_embeds_name() {
    let ctx = Context::new(
        Configuration::new().with_type(
            TypeSpec::new("Ghost")
                .with_field("v", TypeTag::Int)
                .unregistered(),
        ),
    )
    .unwrap();
    let bytes = encode(&ctx, &ObjInst::new("Ghost").set("v", 9i32).into()).unwrap();

    // Sentinel id in the header, tagged name string right after it.
    assert_eq!(i32_at(&bytes, 4), 0);
    assert_eq!(bytes[24], u8::from(TypeTag::String));
    assert_eq!(i32_at(&bytes, 25), 5);
    assert_eq!(&bytes[29..34], b"Ghost");

    // Readers resolve the name locally.
    let decoded = decode(&ctx, &bytes).unwrap();
    let obj = decoded.as_obj().unwrap();
    assert_eq!(obj.get("v"), Some(Value::Int(9)));
    assert_eq!(obj.borrow().type_id(), ctx.type_id("Ghost"));
}

#[test]
fn semantic_hash_override() {
    let ctx = point_ctx(true);
    let mut out = OutBuffer::new();
    Writer::new(&ctx, &mut out)
        .write_with_hash(&point(3, 4), 0x5EED)
        .unwrap();
    assert_eq!(i32_at(out.as_slice(), 8), 0x5EED);
}
