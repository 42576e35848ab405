/*
 * SPDX-FileCopyrightText: 2023 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![cfg(test)]

//! Descriptor construction: mode selection, duplicate rejection, id
//! collisions, hooks.

use std::sync::Arc;

use gridbin::ident::IdMapper;
use gridbin::prelude::*;

#[test]
fn reflected_descriptor_builds_stable_schema() {
    let ctx = Context::default();
    let desc = ctx
        .register(
            TypeSpec::new("Person")
                .with_field("name", TypeTag::String)
                .with_field("age", TypeTag::Int),
        )
        .unwrap();
    assert_eq!(desc.type_id(), ctx.type_id("Person"));
    assert!(matches!(desc.mode(), Mode::Reflected));
    let schema = desc.schema().unwrap();
    assert_eq!(schema.field_ids(), &[0x0033_7A8B, 0x0001_78FF]);
    assert_eq!(schema.id(), 1_946_200_325);
    assert_eq!(desc.metadata_map().len(), 2);
}

#[test]
fn duplicate_field_name_rejected() {
    let ctx = Context::default();
    let err = ctx
        .register(
            TypeSpec::new("Bad")
                .with_field("Value", TypeTag::Int)
                .with_field("value", TypeTag::Long),
        )
        .unwrap_err();
    assert!(matches!(err, Error::TypeConfig(_)));
}

#[test]
fn colliding_field_ids_rejected() {
    // A mapper collapsing every field name onto one id.
    #[derive(Debug)]
    struct CollidingMapper;
    impl IdMapper for CollidingMapper {
        fn type_id(&self, name: &str) -> i32 {
            gridbin::ident::lower_name_hash(name)
        }
        fn field_id(&self, _type_id: i32, _name: &str) -> i32 {
            7
        }
    }

    let ctx = Context::default();
    let err = ctx
        .register(
            TypeSpec::new("Bad")
                .with_mapper(Arc::new(CollidingMapper))
                .with_field("a", TypeTag::Int)
                .with_field("b", TypeTag::Int),
        )
        .unwrap_err();
    assert!(matches!(err, Error::TypeConfig(_)));
}

#[test]
fn colliding_type_ids_rejected() {
    #[derive(Debug)]
    struct OneIdMapper;
    impl IdMapper for OneIdMapper {
        fn type_id(&self, _name: &str) -> i32 {
            42
        }
        fn field_id(&self, _type_id: i32, name: &str) -> i32 {
            gridbin::ident::lower_name_hash(name)
        }
    }

    let ctx = Context::new(Configuration::new().with_mapper(Arc::new(OneIdMapper))).unwrap();
    ctx.register(TypeSpec::new("First")).unwrap();
    let err = ctx.register(TypeSpec::new("Second")).unwrap_err();
    assert!(matches!(err, Error::TypeConfig(_)));
}

#[test]
fn re_registration_is_idempotent() {
    let ctx = Context::default();
    let a = ctx
        .register(TypeSpec::new("Point").with_field("x", TypeTag::Int))
        .unwrap();
    let b = ctx
        .register(TypeSpec::new("point").with_field("x", TypeTag::Int))
        .unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn affinity_key_must_be_a_field() {
    let ctx = Context::default();
    let err = ctx
        .register(
            TypeSpec::new("Acct")
                .with_field("owner", TypeTag::String)
                .with_affinity_key("missing"),
        )
        .unwrap_err();
    assert!(matches!(err, Error::TypeConfig(_)));

    ctx.register(
        TypeSpec::new("Acct")
            .with_field("owner", TypeTag::String)
            .with_affinity_key("owner"),
    )
    .unwrap();
    assert_eq!(
        ctx.affinity_key(ctx.type_id("Acct")).as_deref(),
        Some("owner")
    );
}

#[test]
fn predefined_descriptor_never_encodes_objects() {
    let ctx = Context::default();
    let desc = ctx
        .register(TypeSpec::predefined("int", TypeTag::Int))
        .unwrap();
    assert!(matches!(desc.mode(), Mode::Predefined(TypeTag::Int)));
    assert!(!desc.user_type());

    let err = encode(&ctx, &ObjInst::new("int").set("v", 1i32).into()).unwrap_err();
    assert!(matches!(err, Error::Unsupported(_)));
}

#[test]
fn write_replace_substitutes_value() {
    let ctx = Context::new(
        Configuration::new().with_type(
            TypeSpec::new("Token").with_write_replace(Arc::new(|_v: &Value| {
                Ok(Value::String("redacted".to_owned()))
            })),
        ),
    )
    .unwrap();
    let bytes = encode(&ctx, &ObjInst::new("Token").set("secret", 1i32).into()).unwrap();
    assert_eq!(
        decode(&ctx, &bytes).unwrap(),
        Value::String("redacted".to_owned())
    );
}

#[test]
fn read_resolve_substitutes_value() {
    let ctx = Context::new(
        Configuration::new().with_type(
            TypeSpec::new("Marker")
                .with_field("v", TypeTag::Int)
                .with_read_resolve(Arc::new(|v: &Value| {
                    let obj = v.as_obj().expect("resolve runs on objects");
                    let Some(Value::Int(n)) = obj.get("v") else {
                        anyhow::bail!("missing field");
                    };
                    Ok(Value::Long(n as i64 * 2))
                })),
        ),
    )
    .unwrap();
    let bytes = encode(&ctx, &ObjInst::new("Marker").set("v", 21i32).into()).unwrap();
    assert_eq!(decode(&ctx, &bytes).unwrap(), Value::Long(42));
}

#[test]
fn failing_hook_surfaces_as_user_hook_error() {
    let ctx = Context::new(
        Configuration::new().with_type(
            TypeSpec::new("Broken")
                .with_write_replace(Arc::new(|_| anyhow::bail!("hook blew up"))),
        ),
    )
    .unwrap();
    let err = encode(&ctx, &ObjInst::new("Broken").into()).unwrap_err();
    assert!(matches!(err, Error::UserHook(_)));
}

#[test]
fn dynamic_duplicate_field_ids_rejected_at_write() {
    // Two instance slots that the default mapper sends to one id.
    let ctx = Context::default();
    let mut inst = ObjInst::new("Dup");
    inst.put("X", 1i32);
    inst.put("x", 2i32); // distinct slot names, same lowercase hash
    let err = encode(&ctx, &inst.into()).unwrap_err();
    assert!(matches!(err, Error::TypeConfig(_)));
}
