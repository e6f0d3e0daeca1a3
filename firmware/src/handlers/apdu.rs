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

use gui::ReviewItem;
use model::{
    ApduAnswer, ApduCommand, Bip32Path, StatusWord, CLA, CLA_ETH, INS_GET_ADDR, INS_GET_ADDR_ETH,
    INS_GET_VERSION, INS_SIGN_ETH, P1_CONFIRM, P1_NO_CONFIRM,
};

use super::ethereum::{self, TxReceiver};
use super::*;
use crate::crypto;
use crate::version;

const NATIVE_PATH_COMPONENTS: usize = 5;
const MAX_HRP_LEN: usize = 83;

/// Result of a request handled while idle
pub enum Action {
    Reply(ApduAnswer),
    /// Move to another state, the reply will be sent from there
    Transition(CurrentState),
    ReplyAndTransition(ApduAnswer, CurrentState),
}

impl From<StatusWord> for Action {
    fn from(status: StatusWord) -> Self {
        Action::Reply(ApduAnswer::from_status(status))
    }
}

pub fn handle_request(
    cmd: &ApduCommand,
    receiver: &mut Option<TxReceiver>,
    peripherals: &mut HandlerPeripherals,
) -> Action {
    log::debug!(
        "Request CLA={:02X} INS={:02X} P1={:02X} P2={:02X} Lc={}",
        cmd.cla,
        cmd.ins,
        cmd.p1,
        cmd.p2,
        cmd.data.len()
    );

    let result = match (cmd.cla, cmd.ins) {
        (CLA, INS_GET_VERSION) => Ok(Action::Reply(ApduAnswer::ok(version::version_reply(
            peripherals.target.target_id(),
            false,
        )))),
        (CLA, INS_GET_ADDR) => handle_get_address(cmd, peripherals),
        // EVM instructions are only served on their own class
        (CLA, INS_SIGN_ETH) => Err(StatusWord::ClaNotSupported),
        (CLA, _) => Err(StatusWord::InsNotSupported),

        (CLA_ETH, INS_GET_ADDR_ETH) => ethereum::handle_get_address(cmd, peripherals),
        (CLA_ETH, INS_SIGN_ETH) => ethereum::handle_sign_chunk(cmd, receiver, peripherals),
        (CLA_ETH, _) => Err(StatusWord::InsNotSupported),

        _ => Err(StatusWord::ClaNotSupported),
    };

    // any failure aborts a partially received transaction
    if result.is_err() || cmd.ins != INS_SIGN_ETH {
        if receiver.take().is_some() {
            log::debug!("Dropping partial transaction");
        }
    }

    result.unwrap_or_else(|status| {
        log::debug!("Request failed: {:?}", status);
        status.into()
    })
}

/// Native address: `[hrp len][hrp][5 x u32 LE path]`, replies with `[compressed pk][bech32 address]`
fn handle_get_address(
    cmd: &ApduCommand,
    peripherals: &mut HandlerPeripherals,
) -> Result<Action, StatusWord> {
    let hrp_len = *cmd.data.first().ok_or(StatusWord::WrongLength)? as usize;
    if hrp_len == 0 || hrp_len > MAX_HRP_LEN {
        return Err(StatusWord::DataInvalid);
    }
    let hrp = cmd
        .data
        .get(1..1 + hrp_len)
        .ok_or(StatusWord::WrongLength)?;
    let hrp = core::str::from_utf8(hrp).map_err(|_| StatusWord::DataInvalid)?;

    let path = Bip32Path::deserialize_le(&cmd.data[1 + hrp_len..], NATIVE_PATH_COMPONENTS)
        .map_err(|_| StatusWord::WrongLength)?;
    crypto::validate_path(&path)?;

    let pk = peripherals.keychain.public_key(&path)?;
    let address = crypto::bech32_address(&pk, hrp)?;

    let mut reply = pk.serialize().to_vec();
    reply.extend_from_slice(address.as_bytes());

    match cmd.p1 {
        P1_NO_CONFIRM => Ok(Action::Reply(ApduAnswer::ok(reply))),
        P1_CONFIRM => Ok(Action::Transition(CurrentState::DisplayAddress {
            items: vec![ReviewItem::new("Address", address)],
            reply,
        })),
        _ => Err(StatusWord::DataInvalid),
    }
}
