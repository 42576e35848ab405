/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Typed round trip with `#[derive(Portable)]`.

use gridbin::prelude::*;

#[derive(Portable, Debug, Clone, PartialEq)]
struct Point {
    x: i32,
    y: i32,
}

fn main() -> Result<()> {
    let ctx = Context::default();
    let p = Point { x: 3, y: 4 };

    let bytes = to_bytes(&ctx, &p)?;
    println!("encoded {} bytes", bytes.len());

    // Random access straight over the bytes.
    let view = BinaryObject::from_bytes(&ctx, bytes.clone())?;
    println!("x = {:?}", view.field("x")?);
    println!("type id = 0x{:08x}", view.type_id());

    let back: Point = from_bytes(&ctx, &bytes)?;
    assert_eq!(back, p);
    Ok(())
}
