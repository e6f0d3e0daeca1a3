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

use futures::prelude::*;

use gui::{ReviewItem, ReviewKind};
use model::{
    ApduAnswer, ApduCommand, Bip32Path, StatusWord, ETH_ADDR_HEX_LEN, P1_CONFIRM,
    P1_ETH_FIRST_CHUNK, P1_ETH_MORE_CHUNKS, P1_NO_CONFIRM, P2_CHAINCODE, P2_NO_CHAINCODE,
    PK_LEN_SECP256K1_UNCOMPRESSED,
};

use super::apdu::Action;
use super::review::{self, Outcome};
use super::*;
use crate::crypto::{self, Keychain};
use crate::evm::rlp;
use crate::evm::tx::EthTransaction;

pub const BLIND_SIGNING_DISABLED_MESSAGE: &str = "Enable blind signing in the settings";

/// A transaction being received over multiple chunks
#[derive(Debug)]
pub struct TxReceiver {
    path: Bip32Path,
    buffer: Vec<u8>,
    expected_len: usize,
}

/// Replies with `[65][uncompressed pk][40][hex address]`, followed by the chain code if requested
pub fn handle_get_address(
    cmd: &ApduCommand,
    peripherals: &mut HandlerPeripherals,
) -> Result<Action, StatusWord> {
    let (path, _) = Bip32Path::deserialize_be(&cmd.data).map_err(|_| StatusWord::WrongLength)?;
    crypto::validate_path(&path)?;

    let pk = peripherals.keychain.public_key(&path)?;
    let address = crypto::eth_address_hex(&pk);

    let mut reply = vec![PK_LEN_SECP256K1_UNCOMPRESSED as u8];
    reply.extend_from_slice(&pk.serialize_uncompressed());
    reply.push(ETH_ADDR_HEX_LEN as u8);
    reply.extend_from_slice(address.as_bytes());

    match cmd.p2 {
        P2_NO_CHAINCODE => {}
        P2_CHAINCODE => reply.extend_from_slice(&peripherals.keychain.chain_code(&path)?),
        _ => return Err(StatusWord::DataInvalid),
    }

    match cmd.p1 {
        P1_NO_CONFIRM => Ok(Action::Reply(ApduAnswer::ok(reply))),
        P1_CONFIRM => Ok(Action::Transition(CurrentState::DisplayAddress {
            items: vec![ReviewItem::new("EVM Address", format!("0x{}", address))],
            reply,
        })),
        _ => Err(StatusWord::DataInvalid),
    }
}

/// Accumulate a transaction chunk
///
/// The first chunk carries the derivation path followed by the beginning of the transaction,
/// whose total length is read from the RLP header. Intermediate chunks are acknowledged with an
/// empty reply.
pub fn handle_sign_chunk(
    cmd: &ApduCommand,
    receiver: &mut Option<TxReceiver>,
    peripherals: &mut HandlerPeripherals,
) -> Result<Action, StatusWord> {
    let chunk = match cmd.p1 {
        P1_ETH_FIRST_CHUNK => {
            let (path, consumed) =
                Bip32Path::deserialize_be(&cmd.data).map_err(|_| StatusWord::WrongLength)?;
            crypto::validate_path(&path)?;

            let chunk = &cmd.data[consumed..];
            let expected_len = rlp::tx_rlp_len(chunk).ok_or(StatusWord::DataInvalid)?;
            log::debug!("Receiving transaction of {} bytes", expected_len);

            *receiver = Some(TxReceiver {
                path,
                buffer: Vec::with_capacity(expected_len),
                expected_len,
            });
            chunk
        }
        P1_ETH_MORE_CHUNKS => &cmd.data[..],
        _ => return Err(StatusWord::DataInvalid),
    };

    let rx = receiver.as_mut().ok_or(StatusWord::DataInvalid)?;
    rx.buffer.extend_from_slice(chunk);
    if rx.buffer.len() > rx.expected_len {
        return Err(StatusWord::DataInvalid);
    } else if rx.buffer.len() < rx.expected_len {
        return Ok(Action::Reply(ApduAnswer::ok(vec![])));
    }

    let TxReceiver { path, buffer, .. } = match receiver.take() {
        Some(rx) => rx,
        None => return Err(StatusWord::DataInvalid),
    };
    let tx = EthTransaction::parse(&buffer).map_err(|e| {
        log::warn!("Invalid transaction: {:?}", e);
        StatusWord::DataInvalid
    })?;
    peripherals.host.log(format!(
        "Received {:?} transaction, blind signing required: {}",
        tx.tx_type,
        tx.requires_blind_signing()
    ));

    if tx.requires_blind_signing() && !peripherals.settings.blind_signing {
        return Ok(Action::ReplyAndTransition(
            ApduAnswer::from_status(StatusWord::BlindSigningDisabled),
            CurrentState::Error {
                message: BLIND_SIGNING_DISABLED_MESSAGE.to_string(),
            },
        ));
    }

    Ok(Action::Transition(CurrentState::ConfirmTx {
        path,
        payload: buffer,
        tx,
    }))
}

/// `v || r || s` over the keccak-256 digest of the raw transaction
fn sign_transaction(
    keychain: &Keychain,
    path: &Bip32Path,
    payload: &[u8],
    tx: &EthTransaction,
) -> Result<Vec<u8>, Error> {
    let digest = crypto::keccak256(payload);
    let sig = keychain.sign_digest(path, &digest)?;

    let mut data = Vec::with_capacity(65);
    data.push(tx.signature_v(sig.parity));
    data.extend_from_slice(&sig.r);
    data.extend_from_slice(&sig.s);
    Ok(data)
}

pub async fn handle_confirm_tx<E>(
    path: Bip32Path,
    payload: Vec<u8>,
    tx: EthTransaction,
    events: &mut E,
    peripherals: &mut HandlerPeripherals,
) -> Result<CurrentState, Error>
where
    E: Stream<Item = Event> + Unpin,
{
    log::info!("handle_confirm_tx");

    let items = tx.review_items();
    let outcome = review::run_review(
        ReviewKind::Transaction,
        &items,
        tx.requires_blind_signing(),
        events,
        peripherals,
    )
    .await?;

    let answer = match outcome {
        Outcome::Approved => match sign_transaction(&peripherals.keychain, &path, &payload, &tx) {
            Ok(data) => ApduAnswer::ok(data),
            Err(e) => {
                log::error!("Signing failed: {:?}", e);
                ApduAnswer::from_status(e.into())
            }
        },
        Outcome::Rejected => ApduAnswer::from_status(StatusWord::Rejected),
    };
    peripherals.reply(answer)?;

    Ok(CurrentState::Idle)
}

pub async fn handle_display_address<E>(
    items: Vec<ReviewItem>,
    reply: Vec<u8>,
    events: &mut E,
    peripherals: &mut HandlerPeripherals,
) -> Result<CurrentState, Error>
where
    E: Stream<Item = Event> + Unpin,
{
    log::info!("handle_display_address");

    let answer = match review::run_review(ReviewKind::Address, &items, false, events, peripherals)
        .await?
    {
        Outcome::Approved => ApduAnswer::ok(reply),
        Outcome::Rejected => ApduAnswer::from_status(StatusWord::Rejected),
    };
    peripherals.reply(answer)?;

    Ok(CurrentState::Idle)
}
