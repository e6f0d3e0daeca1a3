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

//! The Sei wallet application, running as an async task against an emulated host

use futures::channel::mpsc;
use futures::prelude::*;
use tokio::sync::watch;

use gui::Layout;
use model::emulator::{CardMessage, EmulatorMessage, Frame};

pub mod config;
pub mod crypto;
pub mod error;
pub mod evm;
pub mod handlers;
pub mod hw;
pub mod version;

pub use config::Config;
pub use error::Error;

use config::Settings;
use handlers::{CurrentState, Event, HandlerPeripherals};

/// Run the application until the host closes the `incoming` channel
///
/// APDU replies and log lines are sent through `outgoing`, every rendered screen is published on
/// `frames`.
pub async fn run(
    config: Config,
    incoming: mpsc::UnboundedReceiver<EmulatorMessage>,
    outgoing: mpsc::UnboundedSender<CardMessage>,
    frames: watch::Sender<Frame>,
) -> Result<(), Error> {
    let keychain = crypto::Keychain::from_mnemonic(&config.mnemonic)?;

    let mut peripherals = HandlerPeripherals {
        host: hw::HostLink::new(outgoing, config.logging),
        display: hw::Display::new(config.target, frames),
        keychain,
        target: config.target,
        layout: Layout::for_target(config.target),
        settings: Settings {
            blind_signing: config.blind_signing,
        },
    };
    peripherals.host.log(format!(
        "Sei app {} starting on {}",
        version::VERSION_STRING,
        config.target
    ));

    let mut events = incoming.map(Event::from);
    let mut state = CurrentState::Idle;

    loop {
        if let Err(e) = handlers::dispatch_handler(&mut state, &mut events, &mut peripherals).await {
            log::debug!("Stopping: {:?}", e);
            break Ok(());
        }
    }
}
