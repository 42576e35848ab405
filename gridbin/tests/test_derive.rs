/*
 * SPDX-FileCopyrightText: 2023 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![cfg(test)]

//! `#[derive(Portable)]`: generated specs, conversions, and nesting.

use gridbin::prelude::*;
use uuid::Uuid;

#[derive(Portable, Debug, Clone, PartialEq)]
struct Point {
    x: i32,
    y: i32,
}

#[derive(Portable, Debug, Clone, PartialEq)]
struct Person {
    name: String,
    age: i32,
    id: Uuid,
    nickname: Option<String>,
    scores: Vec<i64>,
    home: Point,
}

#[test]
fn generated_spec_lists_fields_in_declaration_order() {
    let ctx = Context::default();
    let desc = ctx.register_portable::<Point>().unwrap();
    assert_eq!(desc.type_name(), "Point");
    let fields: Vec<_> = desc
        .declared_fields()
        .unwrap()
        .iter()
        .map(|a| (a.name().to_owned(), a.tag()))
        .collect();
    assert_eq!(
        fields,
        [
            ("x".to_owned(), TypeTag::Int),
            ("y".to_owned(), TypeTag::Int)
        ]
    );
    assert_eq!(desc.schema().unwrap().field_ids(), &[120, 121]);
}

#[test]
fn typed_round_trip() {
    let ctx = Context::default();
    let p = Person {
        name: "Ada".to_owned(),
        age: 36,
        id: Uuid::from_u64_pair(1, 2),
        nickname: None,
        scores: vec![10, 20, 30],
        home: Point { x: 1, y: 2 },
    };
    let bytes = to_bytes(&ctx, &p).unwrap();
    let back: Person = from_bytes(&ctx, &bytes).unwrap();
    assert_eq!(back, p);
}

#[test]
fn derived_bytes_support_random_access() {
    let ctx = Context::default();
    let p = Person {
        name: "Ada".to_owned(),
        age: 36,
        id: Uuid::from_u64_pair(1, 2),
        nickname: Some("ada".to_owned()),
        scores: Vec::new(),
        home: Point { x: 7, y: 8 },
    };
    let bytes = to_bytes(&ctx, &p).unwrap();

    let view = BinaryObject::from_bytes(&ctx, bytes).unwrap();
    assert_eq!(view.field("age").unwrap(), Some(Value::Int(36)));
    assert_eq!(
        view.field("name").unwrap(),
        Some(Value::String("Ada".into()))
    );
    let Some(Value::Obj(home)) = view.field("home").unwrap() else {
        panic!("expected nested object");
    };
    assert_eq!(home.get("x"), Some(Value::Int(7)));
}

#[test]
fn option_fields_travel_as_null() {
    let ctx = Context::default();
    let p = Person {
        name: String::new(),
        age: 0,
        id: Uuid::nil(),
        nickname: None,
        scores: Vec::new(),
        home: Point { x: 0, y: 0 },
    };
    let bytes = to_bytes(&ctx, &p).unwrap();
    let view = BinaryObject::from_bytes(&ctx, bytes.clone()).unwrap();
    assert_eq!(view.field("nickname").unwrap(), Some(Value::Null));

    let back: Person = from_bytes(&ctx, &bytes).unwrap();
    assert_eq!(back.nickname, None);
}

#[test]
fn field_value_conversion_mismatch_errors() {
    let v = Value::String("not a number".into());
    assert!(i32::from_value(&v).is_err());
    assert!(<Option<i32>>::from_value(&Value::Null).unwrap().is_none());
}
