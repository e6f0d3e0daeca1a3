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

use bitcoin::secp256k1;
use bitcoin::util::bip32;

use crate::evm::rlp::RlpError;
use crate::evm::tx::TxError;

#[derive(Debug)]
pub enum Error {
    /// The host went away
    Disconnected,

    InvalidMnemonic,
    InvalidPath,
    Encoding,

    Key(bip32::Error),
    Secp(secp256k1::Error),
    Message(model::MessageError),
    Rlp(RlpError),
    Transaction(TxError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{:?}", self))
    }
}
impl std::error::Error for Error {}

impl From<bip32::Error> for Error {
    fn from(e: bip32::Error) -> Self {
        Error::Key(e)
    }
}
impl From<secp256k1::Error> for Error {
    fn from(e: secp256k1::Error) -> Self {
        Error::Secp(e)
    }
}
impl From<model::MessageError> for Error {
    fn from(e: model::MessageError) -> Self {
        Error::Message(e)
    }
}
impl From<RlpError> for Error {
    fn from(e: RlpError) -> Self {
        Error::Rlp(e)
    }
}
impl From<TxError> for Error {
    fn from(e: TxError) -> Self {
        Error::Transaction(e)
    }
}
impl From<bitcoin::bech32::Error> for Error {
    fn from(_: bitcoin::bech32::Error) -> Self {
        Error::Encoding
    }
}
impl From<core::convert::Infallible> for Error {
    fn from(e: core::convert::Infallible) -> Self {
        match e {}
    }
}

impl From<Error> for model::StatusWord {
    fn from(e: Error) -> Self {
        use model::{MessageError, StatusWord};

        match e {
            Error::Message(MessageError::IncompleteMessage)
            | Error::Message(MessageError::WrongLength { .. }) => StatusWord::WrongLength,
            Error::InvalidPath
            | Error::Message(_)
            | Error::Rlp(_)
            | Error::Transaction(_) => StatusWord::DataInvalid,
            _ => StatusWord::Unknown,
        }
    }
}
