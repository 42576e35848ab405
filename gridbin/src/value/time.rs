/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/// Calendar date-time as epoch milliseconds, the `DATE` wire type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Date(pub i64);

impl Date {
    pub fn millis(self) -> i64 {
        self.0
    }
}

/// High-resolution instant: epoch milliseconds plus the sub-millisecond
/// remainder in nanoseconds, the `TIMESTAMP` wire type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Timestamp {
    pub millis: i64,
    /// Nanoseconds past `millis`, in `0..1_000_000`.
    pub nanos: i32,
}

impl Timestamp {
    pub fn new(millis: i64, nanos: i32) -> Self {
        Self { millis, nanos }
    }
}
