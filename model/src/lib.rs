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

use core::fmt;
use core::str::FromStr;

pub mod emulator;

pub const HARDENED_FLAG: u32 = 0x80000000;

/// Class used by the native (Cosmos-style) instructions
pub const CLA: u8 = 0x62;
/// Class used by the EVM instructions
pub const CLA_ETH: u8 = 0xE0;

pub const INS_GET_VERSION: u8 = 0x00;
pub const INS_GET_ADDR: u8 = 0x01;
pub const INS_GET_ADDR_ETH: u8 = 0x02;
pub const INS_SIGN_ETH: u8 = 0x04;

pub const P1_ETH_FIRST_CHUNK: u8 = 0x00;
pub const P1_ETH_MORE_CHUNKS: u8 = 0x80;

pub const P1_NO_CONFIRM: u8 = 0x00;
pub const P1_CONFIRM: u8 = 0x01;

pub const P2_NO_CHAINCODE: u8 = 0x00;
pub const P2_CHAINCODE: u8 = 0x01;

pub const MAX_APDU_DATA_LEN: usize = 255;
pub const APDU_HEADER_LEN: usize = 5;

pub const PK_LEN_SECP256K1: usize = 33;
pub const PK_LEN_SECP256K1_UNCOMPRESSED: usize = 65;
pub const ETH_ADDR_HEX_LEN: usize = 40;
pub const CHAIN_CODE_LEN: usize = 32;

pub const HRP: &str = "sei";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduCommand {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
}

impl ApduCommand {
    pub fn serialize(&self) -> Result<Vec<u8>, MessageError> {
        if self.data.len() > MAX_APDU_DATA_LEN {
            return Err(MessageError::MessageTooLong);
        }

        let mut v = Vec::with_capacity(APDU_HEADER_LEN + self.data.len());
        v.extend_from_slice(&[self.cla, self.ins, self.p1, self.p2, self.data.len() as u8]);
        v.extend_from_slice(&self.data);
        Ok(v)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, MessageError> {
        if bytes.len() < APDU_HEADER_LEN {
            return Err(MessageError::IncompleteMessage);
        }

        let lc = bytes[4] as usize;
        let data = &bytes[APDU_HEADER_LEN..];
        if data.len() != lc {
            return Err(MessageError::WrongLength {
                declared: lc,
                actual: data.len(),
            });
        }

        Ok(ApduCommand {
            cla: bytes[0],
            ins: bytes[1],
            p1: bytes[2],
            p2: bytes[3],
            data: data.to_vec(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduAnswer {
    data: Vec<u8>,
    status: u16,
}

impl ApduAnswer {
    pub fn new(data: Vec<u8>, status: StatusWord) -> Self {
        ApduAnswer {
            data,
            status: status as u16,
        }
    }

    pub fn ok(data: Vec<u8>) -> Self {
        Self::new(data, StatusWord::Ok)
    }

    pub fn from_status(status: StatusWord) -> Self {
        Self::new(vec![], status)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn raw_status(&self) -> u16 {
        self.status
    }

    pub fn status_word(&self) -> Result<StatusWord, u16> {
        StatusWord::try_from(self.status)
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut v = self.data.clone();
        v.extend_from_slice(&self.status.to_be_bytes());
        v
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, MessageError> {
        if bytes.len() < 2 {
            return Err(MessageError::IncompleteMessage);
        }

        let (data, sw) = bytes.split_at(bytes.len() - 2);
        Ok(ApduAnswer {
            data: data.to_vec(),
            status: u16::from_be_bytes([sw[0], sw[1]]),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum StatusWord {
    Ok = 0x9000,
    Busy = 0x9001,
    WrongLength = 0x6700,
    DataInvalid = 0x6984,
    BlindSigningDisabled = 0x6985,
    Rejected = 0x6986,
    InsNotSupported = 0x6D00,
    ClaNotSupported = 0x6E00,
    Unknown = 0x6F00,
}

impl StatusWord {
    pub fn description(&self) -> &'static str {
        match self {
            StatusWord::Ok => "No errors",
            StatusWord::Busy => "Device is busy",
            StatusWord::WrongLength => "Wrong length",
            StatusWord::DataInvalid => "Data is invalid",
            StatusWord::BlindSigningDisabled => "Blind signing is disabled",
            StatusWord::Rejected => "Transaction rejected",
            StatusWord::InsNotSupported => "Instruction not supported",
            StatusWord::ClaNotSupported => "CLA not supported",
            StatusWord::Unknown => "Unknown error",
        }
    }
}

impl TryFrom<u16> for StatusWord {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Ok(match value {
            0x9000 => StatusWord::Ok,
            0x9001 => StatusWord::Busy,
            0x6700 => StatusWord::WrongLength,
            0x6984 => StatusWord::DataInvalid,
            0x6985 => StatusWord::BlindSigningDisabled,
            0x6986 => StatusWord::Rejected,
            0x6D00 => StatusWord::InsNotSupported,
            0x6E00 => StatusWord::ClaNotSupported,
            0x6F00 => StatusWord::Unknown,
            v => return Err(v),
        })
    }
}

/// Hardware variant an app image is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "emulator", derive(serde::Serialize, serde::Deserialize))]
pub enum Target {
    NanoX,
    NanoSP,
    Stax,
    Flex,
}

impl Target {
    pub const ALL: [Target; 4] = [Target::NanoX, Target::NanoSP, Target::Stax, Target::Flex];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Target::NanoX => "nanox",
            Target::NanoSP => "nanosp",
            Target::Stax => "stax",
            Target::Flex => "flex",
        }
    }

    /// Name of the app image built for this target
    pub fn image_name(&self) -> &'static str {
        match self {
            Target::NanoX => "app_x",
            Target::NanoSP => "app_s2",
            Target::Stax => "app_stax",
            Target::Flex => "app_flex",
        }
    }

    pub fn from_image_name(image: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.image_name() == image)
    }

    /// Width and height of the screen, in pixels
    pub fn display_size(&self) -> (u32, u32) {
        match self {
            Target::NanoX | Target::NanoSP => (128, 64),
            Target::Stax => (400, 672),
            Target::Flex => (480, 600),
        }
    }

    pub fn is_touch(&self) -> bool {
        matches!(self, Target::Stax | Target::Flex)
    }

    pub fn target_id(&self) -> u32 {
        match self {
            Target::NanoX => 0x3300_0004,
            Target::NanoSP => 0x3310_0004,
            Target::Stax => 0x3320_0004,
            Target::Flex => 0x3330_0004,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A BIP32 derivation path, e.g. `m/44'/60'/0'/0'/5`
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "emulator", derive(serde::Serialize, serde::Deserialize))]
pub struct Bip32Path(Vec<u32>);

impl Bip32Path {
    pub fn new(components: Vec<u32>) -> Self {
        Bip32Path(components)
    }

    pub fn components(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length-prefixed, big-endian encoding used by the EVM instructions
    pub fn serialize_be(&self) -> Vec<u8> {
        let mut v = vec![self.0.len() as u8];
        for c in &self.0 {
            v.extend_from_slice(&c.to_be_bytes());
        }
        v
    }

    /// Fixed-length, little-endian encoding used by the native instructions
    pub fn serialize_le(&self) -> Vec<u8> {
        self.0.iter().flat_map(|c| c.to_le_bytes()).collect()
    }

    /// Returns the path and the number of bytes consumed
    pub fn deserialize_be(bytes: &[u8]) -> Result<(Self, usize), MessageError> {
        let len = *bytes.first().ok_or(MessageError::IncompleteMessage)? as usize;
        let end = 1 + len * 4;
        if bytes.len() < end {
            return Err(MessageError::IncompleteMessage);
        }

        let components = bytes[1..end]
            .chunks_exact(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok((Bip32Path(components), end))
    }

    pub fn deserialize_le(bytes: &[u8], num_components: usize) -> Result<Self, MessageError> {
        if bytes.len() < num_components * 4 {
            return Err(MessageError::IncompleteMessage);
        }

        Ok(Bip32Path(
            bytes[..num_components * 4]
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ))
    }
}

impl FromStr for Bip32Path {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        if parts.next() != Some("m") {
            return Err(MessageError::InvalidPath(s.to_string()));
        }

        let components = parts
            .map(|p| {
                let (num, hardened) = match p.strip_suffix('\'').or_else(|| p.strip_suffix('h')) {
                    Some(num) => (num, true),
                    None => (p, false),
                };
                let num = num
                    .parse::<u32>()
                    .map_err(|_| MessageError::InvalidPath(s.to_string()))?;
                if num & HARDENED_FLAG != 0 {
                    return Err(MessageError::InvalidPath(s.to_string()));
                }

                Ok(if hardened { num | HARDENED_FLAG } else { num })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Bip32Path(components))
    }
}

impl fmt::Display for Bip32Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for c in &self.0 {
            if c & HARDENED_FLAG != 0 {
                write!(f, "/{}'", c & !HARDENED_FLAG)?;
            } else {
                write!(f, "/{}", c)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    MessageTooLong,
    IncompleteMessage,
    WrongLength { declared: usize, actual: usize },
    InvalidPath(String),
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:?}", self))
    }
}
impl std::error::Error for MessageError {}
