/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::error::{Error, Result};

/// Arbitrary-precision decimal as it exists on the wire: a non-negative
/// scale, a sign, and the minimal big-endian magnitude of the unscaled
/// value. The codec does not do arithmetic on decimals; it only moves them.
///
/// On the wire the sign lives in the top bit of the scale word, so the scale
/// itself is limited to 31 bits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Decimal {
    negative: bool,
    scale: i32,
    magnitude: Vec<u8>,
}

impl Decimal {
    /// Builds a decimal from raw parts. The magnitude must be big-endian;
    /// leading zero bytes are stripped so equal values compare equal.
    pub fn from_parts(negative: bool, scale: i32, magnitude: Vec<u8>) -> Result<Self> {
        if scale < 0 {
            return Err(Error::Unsupported(format!("negative decimal scale {scale}")));
        }
        let lead = magnitude.iter().take_while(|&&b| b == 0).count();
        let magnitude = magnitude[lead..].to_vec();
        // -0 normalizes to +0
        let negative = negative && !magnitude.is_empty();
        Ok(Self {
            negative,
            scale,
            magnitude,
        })
    }

    /// Decimal with the given unscaled value and scale, e.g. `(1999, 2)`
    /// for `19.99`.
    pub fn from_unscaled(unscaled: i64, scale: i32) -> Result<Self> {
        let mag = unscaled.unsigned_abs();
        let bytes = mag.to_be_bytes();
        Self::from_parts(unscaled < 0, scale, bytes.to_vec())
    }

    pub fn negative(&self) -> bool {
        self.negative
    }

    pub fn scale(&self) -> i32 {
        self.scale
    }

    /// Minimal big-endian magnitude of the unscaled absolute value.
    pub fn magnitude(&self) -> &[u8] {
        &self.magnitude
    }

    /// Unscaled value, if it fits an `i64`.
    pub fn to_unscaled(&self) -> Option<i64> {
        if self.magnitude.len() > 8 {
            return None;
        }
        let mut buf = [0u8; 8];
        buf[8 - self.magnitude.len()..].copy_from_slice(&self.magnitude);
        let mag = u64::from_be_bytes(buf);
        if self.negative {
            (mag <= 1 << 63).then(|| (mag as i64).wrapping_neg())
        } else {
            i64::try_from(mag).ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_leading_zeros() {
        let a = Decimal::from_parts(false, 2, vec![0, 0, 7, 0xCF]).unwrap();
        let b = Decimal::from_unscaled(1999, 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unscaled_round_trip() {
        for v in [0i64, 1, -1, 1999, -1999, i64::MAX, i64::MIN] {
            let d = Decimal::from_unscaled(v, 4).unwrap();
            assert_eq!(d.to_unscaled(), Some(v));
        }
    }

    #[test]
    fn rejects_negative_scale() {
        assert!(Decimal::from_unscaled(1, -1).is_err());
    }
}
