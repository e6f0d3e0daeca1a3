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

//! Requests are issued without waiting for them: the caller drives the approval screens in the
//! meantime and only then collects the result through [`PendingRequest::wait`].

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

use model::Bip32Path;
use sdk::{Address, EvmAddress, SdkError, Signature};

use crate::approval::{FlowHandle, FlowState};
use crate::fixtures::HRP;
use crate::utils::model::TestAction;
use crate::utils::EmulatorInstance;
use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressIdentity {
    pub evm: EvmAddress,
    /// Native address of the same key, when requested
    pub native: Option<Address>,
}

/// An operation running on the device
pub struct PendingRequest<T> {
    handle: JoinHandle<Result<T, SdkError>>,
    flow: FlowHandle,
}

impl<T> PendingRequest<T> {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the device to answer
    pub async fn wait(mut self, timeout: Duration) -> Result<T, Error> {
        let result = match tokio::time::timeout(timeout, &mut self.handle).await {
            Ok(result) => result?,
            Err(_) => {
                self.handle.abort();
                set_flow(&self.flow, FlowState::TimedOut);
                return Err(Error::ApprovalTimeout(format!(
                    "No answer from the device after {:?}",
                    timeout
                )));
            }
        };

        result.map_err(|e| match e {
            e if e.is_rejected() => Error::ApprovalRejected,
            SdkError::Transport(msg) => {
                log::debug!("Transport error: {}", msg);
                Error::SessionClosed
            }
            e => Error::Sdk(e),
        })
    }
}

fn set_flow(flow: &FlowHandle, state: FlowState) {
    if let Ok(mut flow) = flow.lock() {
        *flow = state;
    }
}

/// Refuse a new request while another one is being reviewed
fn begin_request(session: &EmulatorInstance, description: String) -> Result<FlowHandle, Error> {
    if session.is_closed() {
        return Err(Error::SessionClosed);
    }

    let flow = session.flow();
    {
        let mut state = flow.lock().map_err(|_| Error::SessionClosed)?;
        if state.is_in_flight() {
            log::debug!("Refusing {}, flow is {:?}", description, *state);
            return Err(Error::Busy);
        }
        *state = FlowState::AwaitingRequest;
    }

    session.record(TestAction::Request(description).into());
    Ok(flow)
}

fn spawn_request<T, F>(flow: FlowHandle, fut: F) -> PendingRequest<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T, SdkError>> + Send + 'static,
{
    let task_flow = FlowHandle::clone(&flow);
    let handle = tokio::spawn(async move {
        let result = fut.await;

        if let Ok(mut state) = task_flow.lock() {
            match &result {
                Err(e) if e.is_rejected() => *state = FlowState::Rejected,
                Err(_) => *state = FlowState::Idle,
                // nothing was shown on the device
                Ok(_) if *state == FlowState::AwaitingRequest => *state = FlowState::Idle,
                Ok(_) => {}
            }
        }

        result
    });

    PendingRequest { handle, flow }
}

/// Fetch the EVM identity of `path`, and the native one too with `require_second_coin_type`
///
/// With `show_on_device` the address has to be confirmed on the device before the request
/// resolves.
pub fn retrieve_address(
    session: &EmulatorInstance,
    path: &Bip32Path,
    show_on_device: bool,
    require_second_coin_type: bool,
) -> Result<PendingRequest<AddressIdentity>, Error> {
    let flow = begin_request(
        session,
        format!(
            "GetAddress(path={}, show={}, native={})",
            path, show_on_device, require_second_coin_type
        ),
    )?;

    let app = session.app();
    let path = path.clone();
    Ok(spawn_request(flow, async move {
        let evm = app.evm_address(&path, show_on_device, false).await?;
        let native = if require_second_coin_type {
            Some(app.address(&path, HRP, false).await?)
        } else {
            None
        };

        Ok(AddressIdentity { evm, native })
    }))
}

/// Send `raw_payload` to be signed, returning as soon as the request is on its way
pub fn sign_transaction(
    session: &EmulatorInstance,
    path: &Bip32Path,
    raw_payload: &[u8],
) -> Result<PendingRequest<Signature>, Error> {
    let flow = begin_request(
        session,
        format!("SignEvm(path={}, {} bytes)", path, raw_payload.len()),
    )?;

    let app = session.app();
    let path = path.clone();
    let payload = raw_payload.to_vec();
    Ok(spawn_request(flow, async move {
        app.sign_evm(&path, &payload).await
    }))
}
