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

use std::time::Duration;

use futures::future::join_all;

use functional_test_wrapper::functional_test;
use model::StatusWord;

use crate::approval::FlowState;
use crate::fixtures::{
    eth_path, vector_by_name, TestVector, EXPECTED_ADDRESS, EXPECTED_ETH_ADDRESS,
    SIGN_TEST_DATA,
};
use crate::orchestrator;
use crate::scenarios::{self, APPROVAL_TIMEOUT};
use crate::utils::model::Journal;
use crate::utils::snapshot::encode_png;
use crate::Error;

use super::Tester;

fn vector(name: &str) -> &'static TestVector {
    vector_by_name(name).expect("Known vector")
}

#[functional_test]
async fn test_get_address(tester: Tester) -> Result<(), Error> {
    let mut sim = tester.start().await?;
    let first = scenarios::get_address(&mut sim).await?;
    // nothing is shown for a silent request
    assert_eq!(sim.current_screen(), sim.main_menu_snapshot());
    sim.close().await?;

    let mut sim = tester.start().await?;
    let second = scenarios::get_address(&mut sim).await?;
    sim.close().await?;

    assert_eq!(first, second);
    assert_eq!(first.evm.address, EXPECTED_ETH_ADDRESS);
    assert_eq!(
        first.native.map(|a| a.address).as_deref(),
        Some(EXPECTED_ADDRESS)
    );

    Ok(())
}

#[functional_test]
async fn test_show_address(tester: Tester) -> Result<(), Error> {
    let mut sim = tester.start().await?;
    let identity = scenarios::show_address(&mut sim).await?;
    assert!(identity.native.is_none());
    assert_eq!(sim.flow_state(), FlowState::Approved);

    let label = tester.model.snapshot_label("show_eth_address");
    // at least the address and the home screen after approving
    assert!(sim.snapshot_store().count(&label).await? >= 2);

    sim.close().await
}

#[functional_test]
async fn test_sign_all_vectors(tester: Tester) -> Result<(), Error> {
    // one journal per session so that the report reads vector by vector
    let journals = SIGN_TEST_DATA
        .iter()
        .map(|_| Journal::default())
        .collect::<Vec<_>>();
    let runs = SIGN_TEST_DATA.iter().zip(&journals).map(|(vector, journal)| {
        scenarios::run_sign_vector(tester.model, vector, tester.options(), Some(journal))
    });
    let results = join_all(runs).await;

    for journal in &journals {
        tester.journal().append(journal);
    }
    let signatures = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    assert_eq!(signatures.len(), SIGN_TEST_DATA.len());

    Ok(())
}

#[functional_test]
async fn test_sign_basic_transfer(tester: Tester) -> Result<(), Error> {
    let vector = vector("basic_transfer");
    assert!(!vector.blindsign_required);

    // clear signing works with the default settings
    let mut sim = tester.start().await?;
    scenarios::sign_vector(&mut sim, vector).await?;
    assert_eq!(sim.flow_state(), FlowState::Approved);

    sim.close().await
}

#[functional_test]
async fn test_sign_blind(tester: Tester) -> Result<(), Error> {
    let vector = vector("erc721_safe_transfer_from_data");
    assert!(vector.blindsign_required);

    scenarios::run_sign_vector(tester.model, vector, tester.options(), Some(tester.journal()))
        .await?;

    Ok(())
}

#[functional_test]
async fn test_blind_signing_disabled(tester: Tester) -> Result<(), Error> {
    let vector = vector("erc721_safe_transfer_from");

    let mut sim = tester.start_unrecorded(tester.options()).await?;
    let pending = orchestrator::sign_transaction(&sim, &eth_path(), &vector.payload()?)?;

    let home = sim.main_menu_snapshot();
    sim.wait_until_screen_is_not(&home, APPROVAL_TIMEOUT).await?;
    let walk = sim
        .compare_snapshots_and_approve(&vector.snapshot_label(tester.model), true)
        .await;
    assert!(matches!(walk, Err(Error::ProtocolMismatch(_))), "{:?}", walk);

    match pending.wait(APPROVAL_TIMEOUT).await {
        Err(Error::Sdk(e)) => {
            assert_eq!(e.status_word(), Some(StatusWord::BlindSigningDisabled))
        }
        other => panic!("Unexpected result {:?}", other),
    }

    sim.close().await
}

#[functional_test]
async fn test_reject(tester: Tester) -> Result<(), Error> {
    let vector = vector("legacy_transfer");

    let mut sim = tester.start().await?;
    let pending = orchestrator::sign_transaction(&sim, &eth_path(), &vector.payload()?)?;

    let home = sim.main_menu_snapshot();
    sim.wait_until_screen_is_not(&home, APPROVAL_TIMEOUT).await?;
    sim.compare_snapshots_and_reject(&tester.model.snapshot_label("eth-reject"), false)
        .await?;

    let result = pending.wait(APPROVAL_TIMEOUT).await;
    assert!(matches!(result, Err(Error::ApprovalRejected)), "{:?}", result);
    assert_eq!(sim.flow_state(), FlowState::Rejected);
    assert_eq!(sim.current_screen(), sim.main_menu_snapshot());

    sim.close().await
}

#[functional_test]
async fn test_snapshots_verify(tester: Tester) -> Result<(), Error> {
    let vector = vector("legacy_transfer");
    let label = vector.snapshot_label(tester.model);

    let mut sim = tester.start().await?;
    scenarios::sign_vector(&mut sim, vector).await?;
    let recorded = sim.snapshot_store().count(&label).await?;
    sim.close().await?;
    assert!(recorded >= 2);

    // same flow, same screens
    let mut sim = tester.start_with(tester.verify_options()).await?;
    scenarios::sign_vector(&mut sim, vector).await?;
    assert_eq!(sim.snapshot_store().count(&label).await?, recorded);
    let golden = sim.snapshot_store().golden_path(&label, 0);
    sim.close().await?;

    let other = model::emulator::Screen::blank(1, 1);
    tokio::fs::write(&golden, encode_png(&other)?).await?;

    let mut sim = tester.start_unrecorded(tester.verify_options()).await?;
    let result = scenarios::sign_vector(&mut sim, vector).await;
    assert!(matches!(result, Err(Error::ProtocolMismatch(_))), "{:?}", result);

    sim.close().await
}

#[functional_test]
async fn test_malformed_payload(tester: Tester) -> Result<(), Error> {
    let mut sim = tester.start().await?;

    for payload in [vec![], vec![0xC0]] {
        let pending = orchestrator::sign_transaction(&sim, &eth_path(), &payload)?;
        match pending.wait(APPROVAL_TIMEOUT).await {
            Err(Error::Sdk(e)) => assert_eq!(e.status_word(), Some(StatusWord::DataInvalid)),
            other => panic!("Unexpected result {:?}", other),
        }

        assert_eq!(sim.flow_state(), FlowState::Idle);
        assert_eq!(sim.current_screen(), sim.main_menu_snapshot());
    }

    sim.close().await
}

#[functional_test(models = "nanox, stax")]
async fn test_busy(tester: Tester) -> Result<(), Error> {
    let vector = vector("basic_transfer");
    let payload = vector.payload()?;

    let mut sim = tester.start().await?;
    let pending = orchestrator::sign_transaction(&sim, &eth_path(), &payload)?;
    assert!(matches!(
        orchestrator::sign_transaction(&sim, &eth_path(), &payload),
        Err(Error::Busy)
    ));

    let home = sim.main_menu_snapshot();
    sim.wait_until_screen_is_not(&home, APPROVAL_TIMEOUT).await?;
    assert!(matches!(
        orchestrator::retrieve_address(&sim, &eth_path(), false, false),
        Err(Error::Busy)
    ));
    assert!(!pending.is_finished());

    sim.compare_snapshots_and_reject(&tester.model.snapshot_label("eth-busy"), false)
        .await?;
    assert!(matches!(
        pending.wait(APPROVAL_TIMEOUT).await,
        Err(Error::ApprovalRejected)
    ));

    // the session accepts requests again
    scenarios::get_address(&mut sim).await?;

    sim.close().await
}

#[functional_test]
async fn test_approval_timeout(tester: Tester) -> Result<(), Error> {
    let mut sim = tester.start_unrecorded(tester.options()).await?;

    // nothing was requested, the home screen stays
    let home = sim.main_menu_snapshot();
    let result = sim
        .wait_until_screen_is_not(&home, Duration::from_millis(300))
        .await;
    assert!(matches!(result, Err(Error::ApprovalTimeout(_))), "{:?}", result);
    assert_eq!(sim.flow_state(), FlowState::TimedOut);

    // the review is never walked
    let vector = vector("basic_transfer");
    let pending = orchestrator::sign_transaction(&sim, &eth_path(), &vector.payload()?)?;
    sim.wait_until_screen_is_not(&home, APPROVAL_TIMEOUT).await?;
    let result = pending.wait(Duration::from_millis(300)).await;
    assert!(matches!(result, Err(Error::ApprovalTimeout(_))), "{:?}", result);
    assert_eq!(sim.flow_state(), FlowState::TimedOut);

    sim.close().await
}

#[functional_test(models = "nanox, flex")]
async fn test_request_after_timeout(tester: Tester) -> Result<(), Error> {
    let vector = vector("basic_transfer");

    let mut sim = tester.start().await?;
    let pending = orchestrator::sign_transaction(&sim, &eth_path(), &vector.payload()?)?;
    let home = sim.main_menu_snapshot();
    sim.wait_until_screen_is_not(&home, APPROVAL_TIMEOUT).await?;

    let result = pending.wait(Duration::from_millis(200)).await;
    assert!(matches!(result, Err(Error::ApprovalTimeout(_))), "{:?}", result);

    // the device answers the abandoned request once the review ends
    sim.compare_snapshots_and_reject(&tester.model.snapshot_label("eth-timeout"), false)
        .await?;
    assert_eq!(sim.flow_state(), FlowState::Rejected);

    // that answer is not mistaken for the reply to the next request
    let identity = scenarios::get_address(&mut sim).await?;
    assert_eq!(identity.evm.address, EXPECTED_ETH_ADDRESS);
    assert_eq!(sim.flow_state(), FlowState::Idle);

    sim.close().await
}
