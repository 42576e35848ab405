/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! A custom serializer mixing named fields with a raw tail.

use std::sync::Arc;

use gridbin::prelude::*;

struct BlobSerializer;

impl CustomSerializer for BlobSerializer {
    fn write_binary(&self, obj: &ObjInst, out: &mut dyn FieldSink) -> Result<()> {
        let payload = Vec::<u8>::from_value(obj.get("payload").unwrap_or(&Value::Null))?;
        out.write_int("len", payload.len() as i32)?;
        out.raw()?.push_bytes(&payload)?;
        Ok(())
    }

    fn read_binary(&self, input: &mut FieldReader<'_, '_>) -> Result<ObjInst> {
        let len: i32 = input.read("len")?;
        let payload = input.raw()?.read_bytes(len as usize)?.to_vec();
        Ok(ObjInst::new("Blob")
            .set("len", len)
            .set("payload", Vec::<u8>::to_value(&payload)))
    }
}

fn main() -> Result<()> {
    let ctx = Context::new(
        Configuration::new()
            .with_type(TypeSpec::new("Blob").with_custom(Arc::new(BlobSerializer))),
    )?;

    let blob: Value = ObjInst::new("Blob")
        .set("len", 3i32)
        .set("payload", Vec::<u8>::to_value(&vec![1, 2, 3]))
        .into();
    let bytes = encode(&ctx, &blob)?;

    // The named field is still randomly accessible; the tail is opaque.
    let mut reader = Reader::new(&ctx, &bytes);
    println!("len = {:?}", reader.field("len")?);

    assert_eq!(decode(&ctx, &bytes)?, blob);
    Ok(())
}
