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

/// A decoded RLP item, borrowing from the input buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RlpItem<'a> {
    Bytes(&'a [u8]),
    /// Payload of a list, still encoded
    List(&'a [u8]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RlpError {
    Empty,
    Truncated,
    LengthOverflow,
    TrailingBytes,
    UnexpectedType,
}

impl<'a> RlpItem<'a> {
    pub fn bytes(&self) -> Result<&'a [u8], RlpError> {
        match self {
            RlpItem::Bytes(b) => Ok(b),
            RlpItem::List(_) => Err(RlpError::UnexpectedType),
        }
    }

    pub fn list(&self) -> Result<Vec<RlpItem<'a>>, RlpError> {
        match self {
            RlpItem::List(payload) => decode_list(payload),
            RlpItem::Bytes(_) => Err(RlpError::UnexpectedType),
        }
    }
}

fn be_len(bytes: &[u8]) -> Result<usize, RlpError> {
    if bytes.len() > core::mem::size_of::<usize>() {
        return Err(RlpError::LengthOverflow);
    }
    Ok(bytes.iter().fold(0usize, |acc, b| (acc << 8) | *b as usize))
}

/// Split the buffer into `(header length, payload length)` of the first item
fn header(data: &[u8]) -> Result<(usize, usize), RlpError> {
    let marker = *data.first().ok_or(RlpError::Empty)?;
    let (header_len, payload_len) = match marker {
        0x00..=0x7F => (0, 1),
        0x80..=0xB7 => (1, (marker - 0x80) as usize),
        0xC0..=0xF7 => (1, (marker - 0xC0) as usize),
        0xB8..=0xBF | 0xF8..=0xFF => {
            let len_of_len = match marker >= 0xF8 {
                true => (marker - 0xF7) as usize,
                false => (marker - 0xB7) as usize,
            };
            let len_bytes = data.get(1..1 + len_of_len).ok_or(RlpError::Truncated)?;
            (1 + len_of_len, be_len(len_bytes)?)
        }
    };

    Ok((header_len, payload_len))
}

/// Decode the first item, returning it along with the remaining bytes
pub fn decode(data: &[u8]) -> Result<(RlpItem<'_>, &[u8]), RlpError> {
    let (header_len, payload_len) = header(data)?;
    let end = header_len
        .checked_add(payload_len)
        .ok_or(RlpError::LengthOverflow)?;
    if data.len() < end {
        return Err(RlpError::Truncated);
    }

    let payload = &data[header_len..end];
    let item = if data[0] >= 0xC0 {
        RlpItem::List(payload)
    } else {
        RlpItem::Bytes(payload)
    };

    Ok((item, &data[end..]))
}

/// Decode exactly one item, with nothing left over
pub fn decode_exact(data: &[u8]) -> Result<RlpItem<'_>, RlpError> {
    match decode(data)? {
        (item, []) => Ok(item),
        _ => Err(RlpError::TrailingBytes),
    }
}

pub fn decode_list(mut payload: &[u8]) -> Result<Vec<RlpItem<'_>>, RlpError> {
    let mut items = vec![];
    while !payload.is_empty() {
        let (item, rest) = decode(payload)?;
        items.push(item);
        payload = rest;
    }
    Ok(items)
}

/// Total length of a serialized transaction, read from its RLP header
///
/// Typed transactions (`0x01`, `0x02`) are prefixed by their type byte. Returns `None` if the
/// header is incomplete or not a list.
pub fn tx_rlp_len(data: &[u8]) -> Option<usize> {
    let offset = match data.first()? {
        0x01 | 0x02 => 1,
        _ => 0,
    };

    let marker = *data.get(offset)?;
    if marker < 0xC0 {
        return None;
    }

    let (header_len, payload_len) = header(&data[offset..]).ok()?;
    offset
        .checked_add(header_len)?
        .checked_add(payload_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_items() {
        // ["cat", "dog"]
        let data = [0xC8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g'];
        let item = decode_exact(&data).unwrap();
        let list = item.list().unwrap();
        assert_eq!(list, vec![RlpItem::Bytes(b"cat"), RlpItem::Bytes(b"dog")]);

        // single byte and empty string
        assert_eq!(decode_exact(&[0x05]).unwrap(), RlpItem::Bytes(&[0x05]));
        assert_eq!(decode_exact(&[0x80]).unwrap(), RlpItem::Bytes(&[]));
        assert!(decode_exact(&[0xC0]).unwrap().list().unwrap().is_empty());
    }

    #[test]
    fn test_long_string() {
        let mut data = vec![0xB8, 60];
        data.extend_from_slice(&[0xAA; 60]);
        assert_eq!(decode_exact(&data).unwrap().bytes().unwrap(), &[0xAA; 60][..]);
    }

    #[test]
    fn test_errors() {
        assert_eq!(decode(&[]), Err(RlpError::Empty));
        assert_eq!(decode(&[0x83, b'c']), Err(RlpError::Truncated));
        assert_eq!(decode_exact(&[0x01, 0x02]), Err(RlpError::TrailingBytes));
        assert_eq!(
            decode_exact(&[0x05]).unwrap().list(),
            Err(RlpError::UnexpectedType)
        );
    }

    #[test]
    fn test_tx_rlp_len() {
        // legacy, short list
        assert_eq!(tx_rlp_len(&[0xEB, 0x80]), Some(1 + 0x2B));
        // legacy, long list
        assert_eq!(tx_rlp_len(&[0xF8, 0x7C, 0x01]), Some(2 + 0x7C));
        // typed, long list with two length bytes
        assert_eq!(tx_rlp_len(&[0x02, 0xF9, 0x0A, 0x75]), Some(1 + 3 + 0x0A75));
        // typed, short list
        assert_eq!(tx_rlp_len(&[0x02, 0xF7]), Some(1 + 1 + 0x37));

        assert_eq!(tx_rlp_len(&[]), None);
        assert_eq!(tx_rlp_len(&[0x02]), None);
        assert_eq!(tx_rlp_len(&[0x02, 0xF9, 0x0A]), None);
        assert_eq!(tx_rlp_len(&[0x83, 0x01]), None);
    }
}
