/*
 * SPDX-FileCopyrightText: 2023 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![cfg(test)]

//! `BinaryObject` views: constant-time header getters, lazy field access,
//! the deserialization cache, and detach semantics.

use gridbin::prelude::*;

fn point_ctx() -> Context {
    Context::new(
        Configuration::new().with_type(
            TypeSpec::new("Point")
                .with_field("x", TypeTag::Int)
                .with_field("y", TypeTag::Int),
        ),
    )
    .unwrap()
}

fn point_view(ctx: &Context, x: i32, y: i32) -> BinaryObject {
    BinaryObject::encode(
        ctx,
        &ObjInst::new("Point").set("x", x).set("y", y).into(),
    )
    .unwrap()
}

#[test]
fn header_getters() {
    let ctx = point_ctx();
    let view = point_view(&ctx, 3, 4);
    assert_eq!(view.type_id(), ctx.type_id("Point"));
    assert_eq!(view.schema_id(), -224_143_308);
    assert_eq!(view.hash_code(), 783_969_056);
    assert_eq!(view.total_len(), 36);
    assert!(view.flags().contains(Flags::USER_TYPE));
}

#[test]
fn lazy_field_access() {
    let ctx = point_ctx();
    let view = point_view(&ctx, 3, 4);
    assert_eq!(view.field("x").unwrap(), Some(Value::Int(3)));
    assert_eq!(view.field_by_id(121).unwrap(), Some(Value::Int(4)));
    assert_eq!(view.field_by_order(0).unwrap(), Some(Value::Int(3)));
    assert_eq!(view.field("nope").unwrap(), None);
}

#[test]
fn deserialize_matches_decode() {
    let ctx = point_ctx();
    let v: Value = ObjInst::new("Point").set("x", 1i32).set("y", 2i32).into();
    let view = BinaryObject::encode(&ctx, &v).unwrap();
    assert_eq!(view.deserialize().unwrap(), v);
}

#[test]
fn keep_deserialized_caches_the_value() {
    let ctx = Context::new(
        Configuration::new().with_type(
            TypeSpec::new("Cached")
                .with_field("v", TypeTag::Int)
                .with_keep_deserialized(true),
        ),
    )
    .unwrap();
    let view =
        BinaryObject::encode(&ctx, &ObjInst::new("Cached").set("v", 1i32).into()).unwrap();
    let first = view.deserialize().unwrap();
    let second = view.deserialize().unwrap();
    assert!(first
        .as_obj()
        .unwrap()
        .ptr_eq(second.as_obj().unwrap()));

    // Without the option, every call materializes afresh.
    let plain = point_ctx();
    let view = point_view(&plain, 1, 2);
    let first = view.deserialize().unwrap();
    let second = view.deserialize().unwrap();
    assert!(!first.as_obj().unwrap().ptr_eq(second.as_obj().unwrap()));
}

#[test]
fn detach_is_idempotent() {
    let ctx = point_ctx();
    // A buffer with trailing bytes: the view is not detached.
    let mut bytes = point_view(&ctx, 3, 4).clone_bytes();
    bytes.extend_from_slice(&[0xAA; 16]);
    let attached = BinaryObject::from_bytes(&ctx, bytes).unwrap();
    assert!(!attached.detached());

    let detached = attached.detach();
    assert!(detached.detached());
    assert_eq!(detached.as_bytes(), attached.as_bytes());
    assert_eq!(detached.total_len(), detached.as_bytes().len());

    let again = detached.detach();
    assert!(again.detached());
    assert_eq!(again, detached);
}

#[test]
fn nested_binary_object_round_trips() {
    let ctx = point_ctx();
    let inner = point_view(&ctx, 9, 10);
    let outer: Value = ObjInst::new("Envelope")
        .set("payload", Value::Binary(inner.clone()))
        .into();

    let bytes = encode(&ctx, &outer).unwrap();
    let decoded = decode(&ctx, &bytes).unwrap();
    let obj = decoded.as_obj().unwrap();
    let Some(Value::Binary(view)) = obj.get("payload") else {
        panic!("expected a nested binary object");
    };
    assert_eq!(view, inner);
    assert_eq!(view.field("x").unwrap(), Some(Value::Int(9)));
    assert_eq!(
        view.deserialize().unwrap(),
        inner.deserialize().unwrap()
    );
}

#[test]
fn garbage_bytes_rejected() {
    let ctx = point_ctx();
    assert!(matches!(
        BinaryObject::from_bytes(&ctx, vec![1, 2, 3]).unwrap_err(),
        Error::CorruptFrame(_)
    ));
    assert!(matches!(
        BinaryObject::from_bytes(&ctx, vec![0x67; 24]).unwrap_err(),
        Error::CorruptFrame(_)
    ));
}
