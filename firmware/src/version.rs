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

const fn parse_int(s: &str) -> u16 {
    let mut v = 0;
    let mut i = 0;
    loop {
        if i >= s.as_bytes().len() {
            break;
        }

        v *= 10;
        v += match s.as_bytes()[i] {
            b'0' => 0,
            b'1' => 1,
            b'2' => 2,
            b'3' => 3,
            b'4' => 4,
            b'5' => 5,
            b'6' => 6,
            b'7' => 7,
            b'8' => 8,
            b'9' => 9,
            _ => panic!("Invalid digit"),
        };

        i += 1;
    }

    v
}

pub const VERSION_MAJOR: u16 = parse_int(env!("CARGO_PKG_VERSION_MAJOR"));
pub const VERSION_MINOR: u16 = parse_int(env!("CARGO_PKG_VERSION_MINOR"));
pub const VERSION_PATCH: u16 = parse_int(env!("CARGO_PKG_VERSION_PATCH"));

pub const VERSION_STRING: &str = concat!("v", env!("CARGO_PKG_VERSION"));

/// Reply to `GET_VERSION`: test mode, major, minor, patch, locked flag and target id
pub fn version_reply(target_id: u32, locked: bool) -> Vec<u8> {
    let mut v = vec![0x00];
    v.extend_from_slice(&VERSION_MAJOR.to_be_bytes());
    v.extend_from_slice(&VERSION_MINOR.to_be_bytes());
    v.extend_from_slice(&VERSION_PATCH.to_be_bytes());
    v.push(locked as u8);
    v.extend_from_slice(&target_id.to_be_bytes());
    v
}
