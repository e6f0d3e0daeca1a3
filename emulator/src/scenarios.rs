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

//! End-to-end flows shared by the functional tests and the `suite` binary

use std::time::Duration;

use sdk::Signature;

use crate::fixtures::{
    eth_path, DeviceModel, TestVector, EXPECTED_ADDRESS, EXPECTED_ETH_ADDRESS, EXPECTED_ETH_PK,
    EXPECTED_PK,
};
use crate::orchestrator::{self, AddressIdentity};
use crate::utils::model::{Journal, TestAssertion};
use crate::utils::{EmulatorInstance, StartOptions};
use crate::{verify, Error};

pub const APPROVAL_TIMEOUT: Duration = Duration::from_millis(15_000);

pub async fn start(
    model: &DeviceModel,
    options: StartOptions,
    journal: Option<&Journal>,
) -> Result<EmulatorInstance, Error> {
    let sim = EmulatorInstance::start(model, options).await?;
    Ok(match journal {
        Some(journal) => sim.with_journal(journal.clone()),
        None => sim,
    })
}

/// Close the session whatever `result` is, the first error wins
pub async fn finish<T>(sim: EmulatorInstance, result: Result<T, Error>) -> Result<T, Error> {
    let closed = sim.close().await;
    let value = result?;
    closed?;
    Ok(value)
}

pub fn check_identity(identity: &AddressIdentity) -> Result<(), Error> {
    let evm_pk = hex::encode(&identity.evm.public_key);
    if evm_pk != EXPECTED_ETH_PK || identity.evm.address != EXPECTED_ETH_ADDRESS {
        return Err(Error::Verification(format!(
            "Unexpected EVM identity {} {}",
            evm_pk, identity.evm.address
        )));
    }

    if let Some(native) = &identity.native {
        let pk = hex::encode(&native.public_key);
        if pk != EXPECTED_PK || native.address != EXPECTED_ADDRESS {
            return Err(Error::Verification(format!(
                "Unexpected native identity {} {}",
                pk, native.address
            )));
        }
    }

    Ok(())
}

/// Fetch both identities without showing anything on the device
pub async fn get_address(sim: &mut EmulatorInstance) -> Result<AddressIdentity, Error> {
    let identity = orchestrator::retrieve_address(sim, &eth_path(), false, true)?
        .wait(APPROVAL_TIMEOUT)
        .await?;
    check_identity(&identity)?;
    sim.record(TestAssertion::Verified(identity.evm.address.clone()).into());

    Ok(identity)
}

/// Show the EVM address on the device and approve it
pub async fn show_address(sim: &mut EmulatorInstance) -> Result<AddressIdentity, Error> {
    let pending = orchestrator::retrieve_address(sim, &eth_path(), true, false)?;

    let home = sim.main_menu_snapshot();
    sim.wait_until_screen_is_not(&home, APPROVAL_TIMEOUT).await?;
    let label = sim.model.snapshot_label("show_eth_address");
    sim.compare_snapshots_and_approve(&label, false).await?;

    let identity = pending.wait(APPROVAL_TIMEOUT).await?;
    check_identity(&identity)?;

    Ok(identity)
}

/// Sign `vector` on a session that already has blind signing enabled, then verify the signature
pub async fn sign_vector(
    sim: &mut EmulatorInstance,
    vector: &TestVector,
) -> Result<Signature, Error> {
    let payload = vector.payload()?;

    // do not wait here, the review has to be walked first
    let pending = orchestrator::sign_transaction(sim, &eth_path(), &payload)?;

    let home = sim.main_menu_snapshot();
    sim.wait_until_screen_is_not(&home, APPROVAL_TIMEOUT).await?;
    let label = vector.snapshot_label(&sim.model);
    sim.compare_snapshots_and_approve(&label, vector.blindsign_required)
        .await?;

    let signature = pending.wait(APPROVAL_TIMEOUT).await?;
    verify::verify_or_fail(&payload, &signature, &hex::decode(EXPECTED_PK)?)?;
    sim.record(TestAssertion::Verified(vector.name.to_string()).into());

    Ok(signature)
}

/// Full run of a vector on a fresh session
pub async fn run_sign_vector(
    model: &DeviceModel,
    vector: &TestVector,
    options: StartOptions,
    journal: Option<&Journal>,
) -> Result<Signature, Error> {
    log::info!("Signing {} on {}", vector.name, model.name);

    let mut sim = start(model, options, journal).await?;
    let result = async {
        sim.toggle_blind_signing().await?;
        sign_vector(&mut sim, vector).await
    }
    .await;

    finish(sim, result).await
}
