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

//! Client for the Sei application, over any APDU transport

use std::str;

use model::{
    ApduAnswer, ApduCommand, Bip32Path, MessageError, StatusWord, CHAIN_CODE_LEN, CLA, CLA_ETH,
    ETH_ADDR_HEX_LEN, INS_GET_ADDR, INS_GET_ADDR_ETH, INS_GET_VERSION, INS_SIGN_ETH,
    MAX_APDU_DATA_LEN, P1_CONFIRM, P1_ETH_FIRST_CHUNK, P1_ETH_MORE_CHUNKS, P1_NO_CONFIRM,
    P2_CHAINCODE, P2_NO_CHAINCODE, PK_LEN_SECP256K1, PK_LEN_SECP256K1_UNCOMPRESSED,
};

const VERSION_REPLY_LEN: usize = 12;
const SIGNATURE_LEN: usize = 65;

/// Something that can deliver an APDU to a device and bring back its answer
#[async_trait::async_trait]
pub trait Exchange {
    type Error: core::fmt::Display + Send;

    async fn exchange(&self, command: &ApduCommand) -> Result<ApduAnswer, Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkError {
    Transport(String),
    Message(MessageError),
    /// The device answered with an error status
    Device(u16),
    InvalidReply,
    Utf8,
}

impl SdkError {
    pub fn status_word(&self) -> Option<StatusWord> {
        match self {
            SdkError::Device(sw) => StatusWord::try_from(*sw).ok(),
            _ => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.status_word() == Some(StatusWord::Rejected)
    }
}

impl core::fmt::Display for SdkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status_word() {
            Some(sw) => f.write_fmt(format_args!("{:?} ({})", self, sw.description())),
            None => f.write_fmt(format_args!("{:?}", self)),
        }
    }
}

impl std::error::Error for SdkError {}

impl From<MessageError> for SdkError {
    fn from(e: MessageError) -> Self {
        SdkError::Message(e)
    }
}
impl From<str::Utf8Error> for SdkError {
    fn from(_: str::Utf8Error) -> Self {
        SdkError::Utf8
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub test_mode: bool,
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
    pub locked: bool,
    pub target_id: u32,
}

/// Native address, compressed public key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub public_key: Vec<u8>,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmAddress {
    /// Uncompressed public key
    pub public_key: Vec<u8>,
    /// `0x` followed by the lowercase hex address
    pub address: String,
    pub chain_code: Option<[u8; CHAIN_CODE_LEN]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub v: u8,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl Signature {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SdkError> {
        if bytes.len() != SIGNATURE_LEN {
            return Err(SdkError::InvalidReply);
        }

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[1..33]);
        s.copy_from_slice(&bytes[33..65]);

        Ok(Signature { v: bytes[0], r, s })
    }
}

/// Split `path || tx` into `SIGN_ETH` commands, the first one marked as such
pub fn evm_sign_commands(path: &Bip32Path, tx: &[u8]) -> Vec<ApduCommand> {
    let mut data = path.serialize_be();
    data.extend_from_slice(tx);

    data.chunks(MAX_APDU_DATA_LEN)
        .enumerate()
        .map(|(i, chunk)| ApduCommand {
            cla: CLA_ETH,
            ins: INS_SIGN_ETH,
            p1: if i == 0 {
                P1_ETH_FIRST_CHUNK
            } else {
                P1_ETH_MORE_CHUNKS
            },
            p2: 0x00,
            data: chunk.to_vec(),
        })
        .collect()
}

pub struct SeiApp<E> {
    transport: E,
}

impl<E> SeiApp<E> {
    pub const fn new(transport: E) -> Self {
        SeiApp { transport }
    }

    pub fn transport(&self) -> &E {
        &self.transport
    }
}

impl<E> SeiApp<E>
where
    E: Exchange + Send + Sync,
{
    async fn send(&self, command: &ApduCommand) -> Result<ApduAnswer, SdkError> {
        log::trace!(
            "> CLA={:02X} INS={:02X} P1={:02X} P2={:02X} {:02X?}",
            command.cla,
            command.ins,
            command.p1,
            command.p2,
            command.data
        );

        let answer = self
            .transport
            .exchange(command)
            .await
            .map_err(|e| SdkError::Transport(e.to_string()))?;

        log::trace!("< {:04X} {:02X?}", answer.raw_status(), answer.data());

        match answer.status_word() {
            Ok(StatusWord::Ok) => Ok(answer),
            _ => Err(SdkError::Device(answer.raw_status())),
        }
    }

    pub async fn version(&self) -> Result<Version, SdkError> {
        let answer = self
            .send(&ApduCommand {
                cla: CLA,
                ins: INS_GET_VERSION,
                p1: 0x00,
                p2: 0x00,
                data: vec![],
            })
            .await?;

        let data = answer.data();
        if data.len() < VERSION_REPLY_LEN {
            return Err(SdkError::InvalidReply);
        }

        Ok(Version {
            test_mode: data[0] != 0,
            major: u16::from_be_bytes([data[1], data[2]]),
            minor: u16::from_be_bytes([data[3], data[4]]),
            patch: u16::from_be_bytes([data[5], data[6]]),
            locked: data[7] != 0,
            target_id: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
        })
    }

    /// Native address for `hrp`, never shown on the device unless `show` is set
    pub async fn address(
        &self,
        path: &Bip32Path,
        hrp: &str,
        show: bool,
    ) -> Result<Address, SdkError> {
        let mut data = vec![hrp.len() as u8];
        data.extend_from_slice(hrp.as_bytes());
        data.extend(path.serialize_le());

        let answer = self
            .send(&ApduCommand {
                cla: CLA,
                ins: INS_GET_ADDR,
                p1: if show { P1_CONFIRM } else { P1_NO_CONFIRM },
                p2: 0x00,
                data,
            })
            .await?;

        let data = answer.data();
        if data.len() <= PK_LEN_SECP256K1 {
            return Err(SdkError::InvalidReply);
        }

        Ok(Address {
            public_key: data[..PK_LEN_SECP256K1].to_vec(),
            address: str::from_utf8(&data[PK_LEN_SECP256K1..])?.to_string(),
        })
    }

    pub async fn evm_address(
        &self,
        path: &Bip32Path,
        show: bool,
        chain_code: bool,
    ) -> Result<EvmAddress, SdkError> {
        let answer = self
            .send(&ApduCommand {
                cla: CLA_ETH,
                ins: INS_GET_ADDR_ETH,
                p1: if show { P1_CONFIRM } else { P1_NO_CONFIRM },
                p2: if chain_code {
                    P2_CHAINCODE
                } else {
                    P2_NO_CHAINCODE
                },
                data: path.serialize_be(),
            })
            .await?;

        let data = answer.data();
        let pk_len = *data.first().ok_or(SdkError::InvalidReply)? as usize;
        if pk_len != PK_LEN_SECP256K1_UNCOMPRESSED {
            return Err(SdkError::InvalidReply);
        }
        let public_key = data.get(1..1 + pk_len).ok_or(SdkError::InvalidReply)?;

        let addr_start = 1 + pk_len + 1;
        let addr_len = *data.get(1 + pk_len).ok_or(SdkError::InvalidReply)? as usize;
        if addr_len != ETH_ADDR_HEX_LEN {
            return Err(SdkError::InvalidReply);
        }
        let address = data
            .get(addr_start..addr_start + addr_len)
            .ok_or(SdkError::InvalidReply)?;

        let rest = &data[addr_start + addr_len..];
        let chain_code = match (chain_code, rest.len()) {
            (false, 0) => None,
            (true, CHAIN_CODE_LEN) => {
                let mut cc = [0u8; CHAIN_CODE_LEN];
                cc.copy_from_slice(rest);
                Some(cc)
            }
            _ => return Err(SdkError::InvalidReply),
        };

        Ok(EvmAddress {
            public_key: public_key.to_vec(),
            address: format!("0x{}", str::from_utf8(address)?),
            chain_code,
        })
    }

    /// Sign a raw EVM transaction, waiting for the user to approve it
    pub async fn sign_evm(&self, path: &Bip32Path, tx: &[u8]) -> Result<Signature, SdkError> {
        let commands = evm_sign_commands(path, tx);
        let last = commands.len() - 1;

        for (i, command) in commands.iter().enumerate() {
            let answer = self.send(command).await?;
            if i == last {
                return Signature::from_bytes(answer.data());
            }
            if !answer.data().is_empty() {
                return Err(SdkError::InvalidReply);
            }
        }

        Err(SdkError::InvalidReply)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replays canned answers and records the commands
    #[derive(Default)]
    struct MockTransport {
        answers: Mutex<VecDeque<ApduAnswer>>,
        commands: Mutex<Vec<ApduCommand>>,
    }

    impl MockTransport {
        fn with_answers(answers: Vec<ApduAnswer>) -> Self {
            MockTransport {
                answers: Mutex::new(answers.into()),
                ..Default::default()
            }
        }
    }

    #[async_trait::async_trait]
    impl Exchange for MockTransport {
        type Error = String;

        async fn exchange(&self, command: &ApduCommand) -> Result<ApduAnswer, Self::Error> {
            self.commands.lock().unwrap().push(command.clone());
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| "no answer".to_string())
        }
    }

    fn path() -> Bip32Path {
        "m/44'/60'/0'/0'/5".parse().unwrap()
    }

    #[test]
    fn test_sign_commands() {
        let tx = vec![0xAA; 600];
        let commands = evm_sign_commands(&path(), &tx);

        // 21 bytes of path + 600 of tx
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0].p1, P1_ETH_FIRST_CHUNK);
        assert_eq!(commands[1].p1, P1_ETH_MORE_CHUNKS);
        assert_eq!(commands[2].p1, P1_ETH_MORE_CHUNKS);
        assert_eq!(commands[0].data.len(), 255);
        assert_eq!(commands[2].data.len(), 21 + 600 - 2 * 255);
        assert_eq!(&commands[0].data[..21], &path().serialize_be()[..]);

        let short = evm_sign_commands(&path(), &[0xC0]);
        assert_eq!(short.len(), 1);
        assert_eq!(short[0].data.len(), 22);
    }

    #[tokio::test]
    async fn test_sign_evm() {
        let mut sig = vec![0x85];
        sig.extend([0x11; 32]);
        sig.extend([0x22; 32]);

        let transport = MockTransport::with_answers(vec![
            ApduAnswer::ok(vec![]),
            ApduAnswer::ok(sig),
        ]);
        let app = SeiApp::new(transport);

        let signature = app.sign_evm(&path(), &[0xAA; 300]).await.unwrap();
        assert_eq!(signature.v, 0x85);
        assert_eq!(signature.r, [0x11; 32]);
        assert_eq!(signature.s, [0x22; 32]);
        assert_eq!(app.transport().commands.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_device_errors() {
        let transport = MockTransport::with_answers(vec![
            ApduAnswer::from_status(StatusWord::Rejected),
            ApduAnswer::from_status(StatusWord::BlindSigningDisabled),
        ]);
        let app = SeiApp::new(transport);

        let err = app.sign_evm(&path(), &[0xC0]).await.unwrap_err();
        assert!(err.is_rejected());

        let err = app.evm_address(&path(), false, false).await.unwrap_err();
        assert_eq!(err.status_word(), Some(StatusWord::BlindSigningDisabled));

        let err = app.version().await.unwrap_err();
        assert_eq!(err, SdkError::Transport("no answer".to_string()));
    }

    #[tokio::test]
    async fn test_evm_address() {
        let mut data = vec![65];
        data.extend([0x04; 65]);
        data.push(40);
        data.extend_from_slice(b"cadff9350e9548bc68cb1e44d744bd9a801d5a5b");

        let app = SeiApp::new(MockTransport::with_answers(vec![ApduAnswer::ok(data)]));
        let address = app.evm_address(&path(), true, false).await.unwrap();
        assert_eq!(address.address, "0xcadff9350e9548bc68cb1e44d744bd9a801d5a5b");
        assert_eq!(address.public_key.len(), 65);
        assert_eq!(address.chain_code, None);

        let command = app.transport().commands.lock().unwrap()[0].clone();
        assert_eq!((command.cla, command.ins, command.p1), (CLA_ETH, INS_GET_ADDR_ETH, P1_CONFIRM));
    }

    #[tokio::test]
    async fn test_version_and_native_address() {
        let version = vec![0, 0, 1, 0, 2, 0, 3, 0, 0x33, 0x10, 0x00, 0x04];
        let mut address = vec![0x02; 33];
        address.extend_from_slice(b"sei1zxg7kfwt5wcfr5vjutcvpsgmpnkefyphpa4lkq");

        let app = SeiApp::new(MockTransport::with_answers(vec![
            ApduAnswer::ok(version),
            ApduAnswer::ok(address),
        ]));

        let version = app.version().await.unwrap();
        assert_eq!((version.major, version.minor, version.patch), (1, 2, 3));
        assert_eq!(version.target_id, 0x33100004);
        assert!(!version.locked);

        let address = app.address(&path(), "sei", false).await.unwrap();
        assert_eq!(address.address, "sei1zxg7kfwt5wcfr5vjutcvpsgmpnkefyphpa4lkq");

        let command = app.transport().commands.lock().unwrap()[1].clone();
        assert_eq!(command.data[0], 3);
        assert_eq!(&command.data[1..4], b"sei");
        assert_eq!(command.data.len(), 1 + 3 + 20);
    }
}
