/*
 * SPDX-FileCopyrightText: 2023 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![cfg(test)]

//! Footer-driven field access without full materialization, schema
//! resolution under compact footers, and corrupt-frame handling.

use std::sync::Arc;

use gridbin::prelude::*;

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

fn point_bytes(ctx: &Context, x: i32, y: i32) -> Vec<u8> {
    encode(
        ctx,
        &ObjInst::new("Point").set("x", x).set("y", y).into(),
    )
    .unwrap()
}

#[test]
fn field_by_name_compact_and_full() {
    for compact in [true, false] {
        let ctx = point_ctx(compact);
        let bytes = point_bytes(&ctx, 3, 4);
        let mut reader = Reader::new(&ctx, &bytes);
        assert_eq!(reader.field("x").unwrap(), Some(Value::Int(3)));
        assert_eq!(reader.field("y").unwrap(), Some(Value::Int(4)));
        assert_eq!(reader.field("z").unwrap(), None);
    }
}

#[test]
fn field_by_id_and_order() {
    let ctx = point_ctx(true);
    let bytes = point_bytes(&ctx, -1, 9);
    let mut reader = Reader::new(&ctx, &bytes);
    assert_eq!(reader.field_by_id(120).unwrap(), Some(Value::Int(-1)));
    assert_eq!(reader.field_by_id(121).unwrap(), Some(Value::Int(9)));
    assert_eq!(reader.field_by_id(7).unwrap(), None);
    assert_eq!(reader.field_by_order(0).unwrap(), Some(Value::Int(-1)));
    assert_eq!(reader.field_by_order(1).unwrap(), Some(Value::Int(9)));
    assert_eq!(reader.field_by_order(2).unwrap(), None);
}

#[test]
fn mixed_field_types_random_access() {
    let ctx = Context::default();
    let v: Value = ObjInst::new("Order")
        .set("id", "A-17")
        .set("qty", 4i32)
        .set("price", 9.75f64)
        .into();
    let bytes = encode(&ctx, &v).unwrap();
    let mut reader = Reader::new(&ctx, &bytes);
    assert_eq!(
        reader.field("id").unwrap(),
        Some(Value::String("A-17".into()))
    );
    assert_eq!(reader.field("price").unwrap(), Some(Value::Double(9.75)));
}

#[test]
fn compact_footer_needs_registry() {
    let writer_ctx = point_ctx(true);
    let bytes = point_bytes(&writer_ctx, 3, 4);
    let type_id = writer_ctx.type_id("Point");

    // A fresh context has never seen the schema.
    let reader_ctx = Context::default();
    let err = Reader::new(&reader_ctx, &bytes).field("x").unwrap_err();
    assert!(matches!(
        err,
        Error::UnknownSchema { type_id: t, .. } if t == type_id
    ));

    // Populating the registry with the emitted schema recovers the read.
    let schema_id = BinaryObject::from_bytes(&reader_ctx, bytes.clone())
        .unwrap()
        .schema_id();
    let schema = writer_ctx.registry().lookup(type_id, schema_id).unwrap();
    reader_ctx.registry().insert(type_id, schema).unwrap();
    let mut reader = Reader::new(&reader_ctx, &bytes);
    assert_eq!(reader.field("x").unwrap(), Some(Value::Int(3)));
    assert_eq!(reader.field("y").unwrap(), Some(Value::Int(4)));
}

#[test]
fn cleared_registry_recovers_after_rewrite() {
    let ctx = point_ctx(true);
    let bytes = point_bytes(&ctx, 3, 4);
    let type_id = ctx.type_id("Point");

    ctx.registry().clear_type(type_id);
    assert!(matches!(
        Reader::new(&ctx, &bytes).field("x").unwrap_err(),
        Error::UnknownSchema { .. }
    ));

    // The next write re-discovers the schema and re-registers it.
    let _ = point_bytes(&ctx, 0, 0);
    assert_eq!(
        Reader::new(&ctx, &bytes).field("x").unwrap(),
        Some(Value::Int(3))
    );
}

#[test]
fn full_footer_readable_without_descriptor() {
    let writer_ctx = point_ctx(false);
    let bytes = point_bytes(&writer_ctx, 5, 6);

    // Field ids travel in the footer, so a bare context can read by name
    // through the default mapper.
    let reader_ctx = Context::default();
    let mut reader = Reader::new(&reader_ctx, &bytes);
    assert_eq!(reader.field("x").unwrap(), Some(Value::Int(5)));
}

#[test]
fn truncated_buffer_is_corrupt() {
    let ctx = point_ctx(true);
    let bytes = point_bytes(&ctx, 3, 4);

    let truncated = &bytes[..bytes.len() - 1];
    assert!(matches!(
        decode(&ctx, truncated).unwrap_err(),
        Error::CorruptFrame(_)
    ));
    assert!(matches!(
        Reader::new(&ctx, truncated).field("x").unwrap_err(),
        Error::CorruptFrame(_)
    ));

    // Shorter than a header.
    assert!(matches!(
        decode(&ctx, &bytes[..10]).unwrap_err(),
        Error::CorruptFrame(_)
    ));
}

#[test]
fn bad_header_tag_is_corrupt() {
    let ctx = point_ctx(true);
    let mut bytes = point_bytes(&ctx, 3, 4);
    bytes[0] = 0x00;
    assert!(matches!(
        decode(&ctx, &bytes).unwrap_err(),
        Error::CorruptFrame(_)
    ));
}

#[test]
fn overrunning_total_length_is_corrupt() {
    let ctx = point_ctx(true);
    let mut bytes = point_bytes(&ctx, 3, 4);
    bytes[12..16].copy_from_slice(&500i32.to_le_bytes());
    assert!(matches!(
        BinaryObject::from_bytes(&ctx, bytes).unwrap_err(),
        Error::CorruptFrame(_)
    ));
}

#[test]
fn custom_mapper_drives_field_lookup() {
    #[derive(Debug)]
    struct ShiftMapper;
    impl IdMapper for ShiftMapper {
        fn type_id(&self, name: &str) -> i32 {
            gridbin::ident::lower_name_hash(name) ^ 0x5A5A
        }
        fn field_id(&self, _type_id: i32, name: &str) -> i32 {
            gridbin::ident::lower_name_hash(name).wrapping_add(1000)
        }
    }

    let ctx = Context::new(
        Configuration::new()
            .with_mapper(Arc::new(ShiftMapper))
            .with_type(TypeSpec::new("P").with_field("x", TypeTag::Int)),
    )
    .unwrap();
    let bytes = encode(&ctx, &ObjInst::new("P").set("x", 11i32).into()).unwrap();
    let mut reader = Reader::new(&ctx, &bytes);
    assert_eq!(reader.field("x").unwrap(), Some(Value::Int(11)));
    assert_eq!(
        reader.field_by_id(120 + 1000).unwrap(),
        Some(Value::Int(11))
    );
}
