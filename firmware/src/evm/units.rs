// Portal Hardware Wallet firmware and supporting software libraries
//
// Copyright (C) 2024 Alekos Filini
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Big-endian unsigned integers of arbitrary length, as found in RLP fields

pub const COIN_DECIMALS: usize = 18;
pub const COIN_SYMBOL: &str = "SEI";

fn strip_zeros(be: &[u8]) -> &[u8] {
    let first = be.iter().position(|b| *b != 0).unwrap_or(be.len());
    &be[first..]
}

pub fn to_u64(be: &[u8]) -> Option<u64> {
    let be = strip_zeros(be);
    if be.len() > 8 {
        return None;
    }
    Some(be.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64))
}

pub fn to_decimal(be: &[u8]) -> String {
    let mut num = strip_zeros(be).to_vec();
    if num.is_empty() {
        return "0".to_string();
    }

    let mut digits = vec![];
    while !num.is_empty() {
        let mut rem = 0u32;
        for b in num.iter_mut() {
            let cur = (rem << 8) | *b as u32;
            *b = (cur / 10) as u8;
            rem = cur % 10;
        }
        digits.push(b'0' + rem as u8);
        num = strip_zeros(&num).to_vec();
    }

    digits.iter().rev().map(|d| *d as char).collect()
}

pub fn mul(a: &[u8], b: &[u8]) -> Vec<u8> {
    let a = strip_zeros(a);
    let b = strip_zeros(b);
    let mut out = vec![0u32; a.len() + b.len()];

    for (i, x) in a.iter().rev().enumerate() {
        let mut carry = 0u32;
        for (j, y) in b.iter().rev().enumerate() {
            let idx = out.len() - 1 - (i + j);
            let cur = out[idx] + *x as u32 * *y as u32 + carry;
            out[idx] = cur & 0xFF;
            carry = cur >> 8;
        }
        let mut idx = out.len() - 1 - (i + b.len());
        while carry > 0 {
            let cur = out[idx] + carry;
            out[idx] = cur & 0xFF;
            carry = cur >> 8;
            idx = idx.wrapping_sub(1);
        }
    }

    out.into_iter().map(|v| v as u8).collect()
}

/// Insert the decimal point and drop the trailing zeros, `"1500"` with 3 decimals becomes `"1.5"`
pub fn fixed_point(decimal: &str, decimals: usize) -> String {
    let padded = format!("{:0>width$}", decimal, width = decimals + 1);
    let (int, frac) = padded.split_at(padded.len() - decimals);
    let frac = frac.trim_end_matches('0');

    match frac.is_empty() {
        true => int.to_string(),
        false => format!("{}.{}", int, frac),
    }
}

pub fn format_coin(be: &[u8]) -> String {
    format!("{} {}", fixed_point(&to_decimal(be), COIN_DECIMALS), COIN_SYMBOL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_decimal() {
        assert_eq!(to_decimal(&[]), "0");
        assert_eq!(to_decimal(&[0x00, 0x00]), "0");
        assert_eq!(to_decimal(&[0x05, 0x31]), "1329");
        assert_eq!(
            to_decimal(&[0xFF; 16]),
            "340282366920938463463374607431768211455"
        );
    }

    #[test]
    fn test_to_u64() {
        assert_eq!(to_u64(&[0x05, 0x31]), Some(1329));
        assert_eq!(to_u64(&[0x00; 12]), Some(0));
        assert_eq!(to_u64(&[0x01; 9]), None);
    }

    #[test]
    fn test_mul() {
        assert_eq!(to_decimal(&mul(&[0x52, 0x08], &[0x6d, 0x6e, 0x2e, 0xdc, 0x00])), "9870000000000000");
        assert_eq!(to_decimal(&mul(&[0xFF], &[0xFF, 0xFF])), "16711425");
        assert_eq!(to_decimal(&mul(&[], &[0x01])), "0");
    }

    #[test]
    fn test_fixed_point() {
        assert_eq!(fixed_point("1500", 3), "1.5");
        assert_eq!(fixed_point("0", 18), "0");
        assert_eq!(fixed_point("5", 3), "0.005");
        assert_eq!(fixed_point("12000", 3), "12");
        assert_eq!(format_coin(&[0x0D, 0xE0, 0xB6, 0xB3, 0xA7, 0x64, 0x00, 0x00]), "1 SEI");
    }
}
