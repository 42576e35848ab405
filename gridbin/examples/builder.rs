/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Dynamic objects: build, encode, evolve — no Rust type required.

use gridbin::prelude::*;

fn main() -> Result<()> {
    let ctx = Context::default();

    let order: Value = ObjInst::new("Order")
        .set("id", "A-17")
        .set("qty", 4i32)
        .set("price", 9.75f64)
        .into();
    let bytes = encode(&ctx, &order)?;

    // A later writer adds a field: a second schema for the same type.
    let v2: Value = ObjInst::new("Order")
        .set("id", "A-18")
        .set("qty", 1i32)
        .set("price", 12.00f64)
        .set("note", "gift wrap")
        .into();
    encode(&ctx, &v2)?;

    let meta = ctx.metadata().metadata(ctx.type_id("Order")).unwrap();
    println!("fields known: {:?}", meta.fields().keys().collect::<Vec<_>>());
    println!("schemas known: {}", meta.schemas().count());

    let mut reader = Reader::new(&ctx, &bytes);
    println!("qty = {:?}", reader.field("qty")?);
    Ok(())
}
