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

use core::pin::Pin;

use futures::prelude::*;

use gui::{ErrorPage, Layout, Page, ReviewItem};
use model::emulator::{EmulatorMessage, Input};
use model::{ApduAnswer, ApduCommand, Bip32Path, StatusWord, Target};

use crate::config::Settings;
use crate::crypto::Keychain;
use crate::evm::tx::EthTransaction;
use crate::{hw, Error};

pub mod apdu;
pub mod ethereum;
pub mod idle;
pub mod review;

pub enum CurrentState {
    /// Home screen and menus, serving requests that don't need a confirmation
    Idle,
    /// Confirm sign request
    ConfirmTx {
        path: Bip32Path,
        payload: Vec<u8>,
        tx: EthTransaction,
    },
    /// Display an address, replying with `reply` once confirmed
    DisplayAddress {
        items: Vec<ReviewItem>,
        reply: Vec<u8>,
    },
    /// Error page, dismissed by any input
    Error { message: String },
}

#[derive(Debug)]
pub enum Event {
    Input(Input),
    Request(ApduCommand),
    /// An APDU that could not be decoded
    Invalid(StatusWord),
}

impl From<EmulatorMessage> for Event {
    fn from(msg: EmulatorMessage) -> Self {
        match msg {
            EmulatorMessage::Input(input) => Event::Input(input),
            EmulatorMessage::Apdu(bytes) => match ApduCommand::deserialize(&bytes) {
                Ok(cmd) => Event::Request(cmd),
                Err(e) => {
                    log::warn!("Invalid APDU {:02X?}: {:?}", bytes, e);
                    Event::Invalid(StatusWord::WrongLength)
                }
            },
        }
    }
}

pub struct HandlerPeripherals {
    pub host: hw::HostLink,
    pub display: hw::Display,
    pub keychain: Keychain,
    pub target: Target,
    pub layout: Layout,
    pub settings: Settings,
}

impl HandlerPeripherals {
    pub fn reply(&self, answer: ApduAnswer) -> Result<(), Error> {
        self.host.send_apdu(answer.serialize())
    }

    pub fn reply_status(&self, status: StatusWord) -> Result<(), Error> {
        self.reply(ApduAnswer::from_status(status))
    }

    pub fn draw<P: Page>(&mut self, page: &P) -> Result<(), Error> {
        page.init_display(&mut self.display)?;
        self.display.flush(page.text())
    }
}

async fn next_event<E>(events: &mut E) -> Result<Event, Error>
where
    E: Stream<Item = Event> + Unpin,
{
    events.next().await.ok_or(Error::Disconnected)
}

/// Wait for the next input, turning away requests while the user is busy with the device
async fn next_input<E>(events: &mut E, peripherals: &mut HandlerPeripherals) -> Result<Input, Error>
where
    E: Stream<Item = Event> + Unpin,
{
    loop {
        match next_event(events).await? {
            Event::Input(input) => break Ok(input),
            Event::Request(cmd) => {
                log::debug!("Busy, ignoring {:02X?}", cmd);
                peripherals.reply_status(StatusWord::Busy)?;
            }
            Event::Invalid(status) => peripherals.reply_status(status)?,
        }
    }
}

type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<CurrentState, Error>> + Send + 'a>>;

/// Run the handler of the current state and move to the next one
///
/// Only returns an error when the host goes away.
pub async fn dispatch_handler<'a, E>(
    current_state: &'a mut CurrentState,
    events: &'a mut E,
    peripherals: &'a mut HandlerPeripherals,
) -> Result<(), Error>
where
    E: Stream<Item = Event> + Unpin + Send + 'a,
{
    let mut moved_state = CurrentState::Idle;
    core::mem::swap(&mut moved_state, current_state);

    let result = match moved_state {
        CurrentState::Idle => {
            Box::pin(idle::handle_idle(events, &mut *peripherals)) as HandlerFuture<'_>
        }
        CurrentState::ConfirmTx { path, payload, tx } => Box::pin(ethereum::handle_confirm_tx(
            path,
            payload,
            tx,
            events,
            &mut *peripherals,
        )) as HandlerFuture<'_>,
        CurrentState::DisplayAddress { items, reply } => Box::pin(
            ethereum::handle_display_address(items, reply, events, &mut *peripherals),
        ) as HandlerFuture<'_>,
        CurrentState::Error { message } => {
            Box::pin(handle_error_page(message, events, &mut *peripherals)) as HandlerFuture<'_>
        }
    }
    .await;

    *current_state = match result {
        Ok(new_state) => new_state,
        Err(e @ Error::Disconnected) => return Err(e),
        Err(e) => handle_error(e),
    };

    Ok(())
}

fn handle_error(err: Error) -> CurrentState {
    log::error!("{:?}", err);

    let message = match err {
        Error::InvalidMnemonic | Error::Key(_) | Error::Secp(_) => "Key derivation failed",
        Error::Message(_) | Error::Rlp(_) | Error::Transaction(_) => "Invalid request",
        _ => "General failure",
    };

    CurrentState::Error {
        message: message.to_string(),
    }
}

async fn handle_error_page<E>(
    message: String,
    events: &mut E,
    peripherals: &mut HandlerPeripherals,
) -> Result<CurrentState, Error>
where
    E: Stream<Item = Event> + Unpin,
{
    log::info!("handle_error_page");
    peripherals.host.log(format!("Error: {}", message));

    let page = ErrorPage::new(peripherals.layout, &message);
    peripherals.draw(&page)?;

    next_input(events, peripherals).await?;

    Ok(CurrentState::Idle)
}
