/*
 * SPDX-FileCopyrightText: 2023 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![cfg(test)]

//! Custom and external serializers: the named-field surface, raw tails,
//! and the one-way raw transition.

use std::sync::Arc;

use gridbin::prelude::*;

/// Writes the two fields through the named-field API and reads them back
/// with random access.
struct PairSerializer;

impl CustomSerializer for PairSerializer {
    fn write_binary(&self, obj: &ObjInst, out: &mut dyn FieldSink) -> Result<()> {
        out.write_int("a", i32::from_value(obj.get("a").unwrap_or(&Value::Null))?)?;
        out.write_string("b", &String::from_value(obj.get("b").unwrap_or(&Value::Null))?)?;
        Ok(())
    }

    fn read_binary(&self, input: &mut FieldReader<'_, '_>) -> Result<ObjInst> {
        let a: i32 = input.read("a")?;
        let b: String = input.read("b")?;
        Ok(ObjInst::new("Pair").set("a", a).set("b", b))
    }
}

#[test]
fn custom_serializer_round_trip() {
    let ctx = Context::new(
        Configuration::new()
            .with_type(TypeSpec::new("Pair").with_custom(Arc::new(PairSerializer))),
    )
    .unwrap();
    let v: Value = ObjInst::new("Pair").set("a", 17i32).set("b", "hi").into();
    let bytes = encode(&ctx, &v).unwrap();
    assert_eq!(decode(&ctx, &bytes).unwrap(), v);

    // The schema footer works like any other: random access applies.
    let mut reader = Reader::new(&ctx, &bytes);
    assert_eq!(reader.field("a").unwrap(), Some(Value::Int(17)));
}

/// A length-prefixed blob: one named field plus an opaque raw tail.
struct BlobSerializer;

impl CustomSerializer for BlobSerializer {
    fn write_binary(&self, obj: &ObjInst, out: &mut dyn FieldSink) -> Result<()> {
        let payload = Vec::<u8>::from_value(obj.get("payload").unwrap_or(&Value::Null))?;
        out.write_int("len", payload.len() as i32)?;
        let raw = out.raw()?;
        raw.push_bytes(&payload)?;
        Ok(())
    }

    fn read_binary(&self, input: &mut FieldReader<'_, '_>) -> Result<ObjInst> {
        let len: i32 = input.read("len")?;
        let mut raw = input.raw()?;
        let payload = raw.read_bytes(len as usize)?.to_vec();
        Ok(ObjInst::new("Blob")
            .set("len", len)
            .set("payload", Vec::<u8>::to_value(&payload)))
    }
}

#[test]
fn custom_serializer_with_raw_tail() {
    let ctx = Context::new(
        Configuration::new()
            .with_type(TypeSpec::new("Blob").with_custom(Arc::new(BlobSerializer))),
    )
    .unwrap();
    let v: Value = ObjInst::new("Blob")
        .set("len", 4i32)
        .set("payload", Vec::<u8>::to_value(&vec![0xDE, 0xAD, 0xBE, 0xEF]))
        .into();
    let bytes = encode(&ctx, &v).unwrap();
    assert_eq!(decode(&ctx, &bytes).unwrap(), v);

    let view = BinaryObject::from_bytes(&ctx, bytes).unwrap();
    assert!(view.flags().contains(Flags::HAS_RAW));
    assert!(view.flags().contains(Flags::HAS_SCHEMA));
}

/// Violates the state machine: a named field after switching to raw.
struct LateFieldSerializer;

impl CustomSerializer for LateFieldSerializer {
    fn write_binary(&self, _obj: &ObjInst, out: &mut dyn FieldSink) -> Result<()> {
        out.raw()?.push_i32(1)?;
        out.write_int("late", 2)
    }

    fn read_binary(&self, _input: &mut FieldReader<'_, '_>) -> Result<ObjInst> {
        unreachable!("writes never succeed")
    }
}

#[test]
fn named_field_after_raw_is_rejected() {
    let ctx = Context::new(
        Configuration::new()
            .with_type(TypeSpec::new("Late").with_custom(Arc::new(LateFieldSerializer))),
    )
    .unwrap();
    let err = encode(&ctx, &ObjInst::new("Late").into()).unwrap_err();
    assert!(matches!(err, Error::TypeConfig(_)));
}

/// Full byte-level ownership: no footer, everything in the raw tail.
struct ExtSerializer;

impl ExternalSerializer for ExtSerializer {
    fn write_external(&self, obj: &ObjInst, out: &mut dyn RawSink) -> Result<()> {
        let v = i32::from_value(obj.get("v").unwrap_or(&Value::Null))?;
        out.push_i32(v)?;
        out.push_bool(true)
    }

    fn read_external(&self, input: &mut RawReader<'_>) -> Result<ObjInst> {
        let v = input.read_i32()?;
        let _flag = input.read_bool()?;
        Ok(ObjInst::new("Ext").set("v", v))
    }
}

#[test]
fn external_serializer_round_trip() {
    let ctx = Context::new(
        Configuration::new()
            .with_type(TypeSpec::new("Ext").with_external(Arc::new(ExtSerializer))),
    )
    .unwrap();
    let v: Value = ObjInst::new("Ext").set("v", -5i32).into();
    let bytes = encode(&ctx, &v).unwrap();

    let view = BinaryObject::from_bytes(&ctx, bytes.clone()).unwrap();
    assert!(view.flags().contains(Flags::HAS_RAW));
    assert!(!view.flags().contains(Flags::HAS_SCHEMA));

    assert_eq!(decode(&ctx, &bytes).unwrap(), v);
}

#[test]
fn raw_tail_kept_opaque_without_descriptor() {
    // A frame with a raw tail decoded without its serializer keeps the
    // tail on the instance for inspection.
    let writer_ctx = Context::new(
        Configuration::new()
            .with_type(TypeSpec::new("Ext").with_external(Arc::new(ExtSerializer))),
    )
    .unwrap();
    let bytes = encode(&writer_ctx, &ObjInst::new("Ext").set("v", 7i32).into()).unwrap();

    let bare_ctx = Context::default();
    let decoded = decode(&bare_ctx, &bytes).unwrap();
    let obj = decoded.as_obj().unwrap();
    assert_eq!(obj.borrow().raw(), Some(&[7, 0, 0, 0, 1][..]));
}

#[test]
fn dynamic_raw_tail_round_trips() {
    // A dynamic instance carrying both named fields and a raw tail.
    let ctx = Context::default();
    let mut inst = ObjInst::new("Carrier");
    inst.put("kind", 3i32);
    inst.set_raw(vec![1, 2, 3, 4]);
    let v: Value = inst.into();

    let bytes = encode(&ctx, &v).unwrap();
    let view = BinaryObject::from_bytes(&ctx, bytes.clone()).unwrap();
    assert!(view.flags().contains(Flags::HAS_RAW));
    assert!(view.flags().contains(Flags::HAS_SCHEMA));

    let decoded = decode(&ctx, &bytes).unwrap();
    assert_eq!(decoded, v);
    assert_eq!(encode(&ctx, &decoded).unwrap(), bytes);
}
