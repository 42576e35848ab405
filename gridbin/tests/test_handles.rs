/*
 * SPDX-FileCopyrightText: 2023 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![cfg(test)]

//! Sharing and cycles: handle emission on write, identity-preserving
//! resolution on read.

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

fn point(x: i32, y: i32) -> ObjRef {
    ObjInst::new("Point").set("x", x).set("y", y).into_ref()
}

#[test]
fn shared_element_becomes_handle() {
    let ctx = point_ctx();
    let a = point(1, 2);
    let b = point(3, 4);
    let list = Value::Collection(Collection {
        kind: CollectionKind::ArrayList,
        items: vec![Value::Obj(a.clone()), Value::Obj(b), Value::Obj(a)],
    });
    let bytes = encode(&ctx, &list).unwrap();

    // COL tag + i32 size + i8 kind, then two 36-byte objects, then the
    // handle to the first.
    let first_header = 6;
    let handle_pos = 6 + 36 + 36;
    assert_eq!(bytes[handle_pos], u8::from(TypeTag::Handle));
    let back = i32::from_le_bytes(bytes[handle_pos + 1..handle_pos + 5].try_into().unwrap());
    assert_eq!(back as usize, handle_pos - first_header);

    // At most one full encoding of the shared node.
    let headers = bytes.iter().filter(|&&b| b == 0x67).count();
    assert_eq!(headers, 2);
}

#[test]
fn shared_element_decodes_to_same_identity() {
    let ctx = point_ctx();
    let a = point(1, 2);
    let b = point(3, 4);
    let list = Value::Collection(Collection {
        kind: CollectionKind::ArrayList,
        items: vec![Value::Obj(a.clone()), Value::Obj(b), Value::Obj(a)],
    });
    let bytes = encode(&ctx, &list).unwrap();

    let decoded = decode(&ctx, &bytes).unwrap();
    let Value::Collection(col) = decoded else {
        panic!("expected a collection")
    };
    let first = col.items[0].as_obj().unwrap();
    let second = col.items[1].as_obj().unwrap();
    let third = col.items[2].as_obj().unwrap();
    assert!(first.ptr_eq(third));
    assert!(!first.ptr_eq(second));
    assert_eq!(first.get("x"), Some(Value::Int(1)));
}

#[test]
fn self_cycle_round_trips() {
    let ctx = Context::default();
    let node = ObjInst::new("Node").into_ref();
    node.borrow_mut().put("self", Value::Obj(node.clone()));

    let bytes = encode(&ctx, &Value::Obj(node)).unwrap();
    let decoded = decode(&ctx, &bytes).unwrap();
    let obj = decoded.as_obj().unwrap();
    let inner = obj.get("self").unwrap();
    assert!(inner.as_obj().unwrap().ptr_eq(obj));
}

#[test]
fn two_node_cycle_round_trips() {
    let ctx = Context::default();
    let left = ObjInst::new("Link").into_ref();
    let right = ObjInst::new("Link").into_ref();
    left.borrow_mut().put("next", Value::Obj(right.clone()));
    right.borrow_mut().put("next", Value::Obj(left.clone()));

    let bytes = encode(&ctx, &Value::Obj(left)).unwrap();
    let decoded = decode(&ctx, &bytes).unwrap();
    let l = decoded.as_obj().unwrap();
    let r = l.get("next").unwrap();
    let r = r.as_obj().unwrap();
    let back = r.get("next").unwrap();
    assert!(back.as_obj().unwrap().ptr_eq(l));
    assert!(!l.ptr_eq(r));
}

#[test]
fn diamond_sharing_preserved() {
    let ctx = point_ctx();
    let shared = point(7, 8);
    let root: Value = ObjInst::new("Pair")
        .set("left", Value::Obj(shared.clone()))
        .set("right", Value::Obj(shared))
        .into();

    let bytes = encode(&ctx, &root).unwrap();
    let decoded = decode(&ctx, &bytes).unwrap();
    let obj = decoded.as_obj().unwrap();
    let l = obj.get("left").unwrap();
    let r = obj.get("right").unwrap();
    assert!(l.as_obj().unwrap().ptr_eq(r.as_obj().unwrap()));
}

#[test]
fn handle_table_resets_between_roots() {
    let ctx = point_ctx();
    let a = point(1, 2);
    let mut out = OutBuffer::new();
    let mut writer = Writer::new(&ctx, &mut out);
    let first = writer.write(&Value::Obj(a.clone())).unwrap();
    let second = writer.write(&Value::Obj(a)).unwrap();

    // The second root is a full encoding, not a cross-root handle.
    assert_eq!(out.as_slice()[first], 0x67);
    assert_eq!(out.as_slice()[second], 0x67);
}
