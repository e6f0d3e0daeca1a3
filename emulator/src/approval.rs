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

use std::sync::{Arc, Mutex};
use std::time::Duration;

use gui::ScreenKind;
use model::emulator::{Input, Screen, TapArea};

use crate::utils::model::TestAssertion;
use crate::utils::EmulatorInstance;
use crate::Error;

/// Review walks longer than this are considered stuck
pub const MAX_REVIEW_STEPS: usize = 64;

/// Where the approval flow of a session is
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum FlowState {
    Idle,
    /// A request was sent, its screens are not shown yet
    AwaitingRequest,
    /// Showing screen `n` of the review, starting from 1
    Displaying(usize),
    Approved,
    Rejected,
    TimedOut,
}

impl FlowState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, FlowState::AwaitingRequest | FlowState::Displaying(_))
    }
}

pub type FlowHandle = Arc<Mutex<FlowState>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finish {
    Approve,
    Reject,
}

/// What to press on a screen of the review
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Move {
    Next(Input),
    Last(Input),
}

/// Input sequence that flips the blind signing setting, starting and ending on the home screen
fn toggle_sequence(touch: bool) -> [Input; 3] {
    if touch {
        [
            Input::Tap(TapArea::Settings),
            Input::Tap(TapArea::Toggle),
            Input::Tap(TapArea::Back),
        ]
    } else {
        [Input::Right, Input::Both, Input::Left]
    }
}

fn mismatch(screen: &Screen, expected: &str) -> Error {
    Error::ProtocolMismatch(format!(
        "Expected {}, found: {}",
        expected,
        screen.joined_text()
    ))
}

/// Decide how to move forward from `screen`, the `index`-th screen of the review
fn next_move(
    screen: &Screen,
    index: usize,
    touch: bool,
    requires_blind: bool,
    finish: Finish,
) -> Result<Move, Error> {
    let kind = ScreenKind::classify(&screen.text);

    match kind {
        ScreenKind::BlindWarning if !requires_blind => {
            return Err(mismatch(screen, "a clear signing review"))
        }
        ScreenKind::BlindWarning if index > 0 => {
            return Err(mismatch(screen, "the warning on the first screen only"))
        }
        ScreenKind::BlindWarning => {}
        _ if requires_blind && index == 0 => {
            return Err(mismatch(screen, "the blind signing warning"))
        }
        _ => {}
    }

    let next = if touch {
        Input::SwipeNext
    } else {
        Input::Right
    };

    Ok(match (kind, finish) {
        (ScreenKind::BlindWarning, _) if touch => Move::Next(Input::Tap(TapArea::Confirm)),
        (ScreenKind::BlindWarning, _) => Move::Next(Input::Both),
        (ScreenKind::Review, _) => Move::Next(next),

        (ScreenKind::Approve, Finish::Approve) => Move::Last(Input::Both),
        (ScreenKind::Approve, Finish::Reject) => Move::Next(Input::Right),
        (ScreenKind::Reject, Finish::Reject) => Move::Last(Input::Both),
        (ScreenKind::Decision, Finish::Approve) => Move::Last(Input::Tap(TapArea::Confirm)),
        (ScreenKind::Decision, Finish::Reject) => Move::Last(Input::Tap(TapArea::Reject)),

        (ScreenKind::Reject, Finish::Approve) => {
            return Err(mismatch(screen, "the approve screen before the reject one"))
        }
        _ => return Err(mismatch(screen, "a review screen")),
    })
}

impl EmulatorInstance {
    /// Wait until the device moves away from `reference`, usually [`Self::main_menu_snapshot`]
    pub async fn wait_until_screen_is_not(
        &mut self,
        reference: &Screen,
        timeout: Duration,
    ) -> Result<(), Error> {
        match self.wait_for_screen(|s| s != reference, timeout).await {
            Ok(_) => {
                self.set_flow(FlowState::Displaying(1));
                self.record(TestAssertion::ScreenChanged.into());
                Ok(())
            }
            Err(e) => {
                if let Error::ApprovalTimeout(_) = e {
                    self.set_flow(FlowState::TimedOut);
                }
                self.record(TestAssertion::ScreenChanged.into());
                self.record_failure(&e.to_string());
                Err(e)
            }
        }
    }

    /// Flip the blind signing setting through the device menus and go back home
    pub async fn toggle_blind_signing(&mut self) -> Result<(), Error> {
        let [open, toggle, back] = toggle_sequence(self.target.is_touch());

        let before = self.send_input(open).await?;
        let after = self.send_input(toggle).await?;
        if before.text == after.text {
            let e = mismatch(&after, "the blind signing setting to change");
            self.record_failure(&e.to_string());
            return Err(e);
        }

        let home = self.send_input(back).await?;
        if ScreenKind::classify(&home.text) != ScreenKind::Home {
            let e = mismatch(&home, "the home screen");
            self.record_failure(&e.to_string());
            return Err(e);
        }

        Ok(())
    }

    /// Walk the review shown on the device storing a snapshot of every screen, then approve it
    ///
    /// With `requires_blind` the first screen has to be the blind signing warning, without it no
    /// warning can be shown at all.
    pub async fn compare_snapshots_and_approve(
        &mut self,
        label: &str,
        requires_blind: bool,
    ) -> Result<(), Error> {
        self.walk_review(label, requires_blind, Finish::Approve)
            .await
    }

    /// Same as [`Self::compare_snapshots_and_approve`], rejecting at the end
    pub async fn compare_snapshots_and_reject(
        &mut self,
        label: &str,
        requires_blind: bool,
    ) -> Result<(), Error> {
        self.walk_review(label, requires_blind, Finish::Reject)
            .await
    }

    async fn store_snapshot(&self, label: &str, index: usize, screen: &Screen) -> Result<(), Error> {
        self.record(
            TestAssertion::Snapshot {
                label: label.to_string(),
                index,
            }
            .into(),
        );
        self.snapshot_store()
            .compare_and_store(label, index, screen)
            .await?;
        Ok(())
    }

    async fn walk_review(
        &mut self,
        label: &str,
        requires_blind: bool,
        finish: Finish,
    ) -> Result<(), Error> {
        let result = self.walk_review_inner(label, requires_blind, finish).await;

        match &result {
            Ok(()) => self.set_flow(match finish {
                Finish::Approve => FlowState::Approved,
                Finish::Reject => FlowState::Rejected,
            }),
            Err(e) => {
                if let Error::ApprovalTimeout(_) = e {
                    self.set_flow(FlowState::TimedOut);
                }
                self.record_failure(&e.to_string());
            }
        }

        result
    }

    async fn walk_review_inner(
        &mut self,
        label: &str,
        requires_blind: bool,
        finish: Finish,
    ) -> Result<(), Error> {
        let touch = self.target.is_touch();
        let mut screen = self.current_screen();

        for index in 0..MAX_REVIEW_STEPS {
            self.set_flow(FlowState::Displaying(index + 1));
            self.store_snapshot(label, index, &screen).await?;

            match next_move(&screen, index, touch, requires_blind, finish)? {
                Move::Next(input) => {
                    screen = self.send_input(input).await?;
                }
                Move::Last(input) => {
                    let home = self.send_input(input).await?;
                    self.store_snapshot(label, index + 1, &home).await?;

                    return match ScreenKind::classify(&home.text) {
                        ScreenKind::Home => Ok(()),
                        _ => Err(mismatch(&home, "the home screen")),
                    };
                }
            }
        }

        Err(Error::ApprovalTimeout(format!(
            "Review of {} longer than {} screens",
            label, MAX_REVIEW_STEPS
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen(text: &[&str]) -> Screen {
        Screen {
            width: 1,
            height: 1,
            pixels: vec![0],
            text: text.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_next_move_buttons() {
        let warning = screen(&[gui::BLIND_WARNING_TITLE]);
        let review = screen(&[gui::REVIEW_TX_TITLE, "Nonce", "1"]);
        let approve = screen(&[gui::APPROVE_TITLE, "Sign transaction"]);
        let reject = screen(&[gui::REJECT_TITLE, "Reject transaction"]);

        assert_eq!(
            next_move(&warning, 0, false, true, Finish::Approve).unwrap(),
            Move::Next(Input::Both)
        );
        assert_eq!(
            next_move(&review, 1, false, true, Finish::Approve).unwrap(),
            Move::Next(Input::Right)
        );
        assert_eq!(
            next_move(&approve, 3, false, false, Finish::Approve).unwrap(),
            Move::Last(Input::Both)
        );
        assert_eq!(
            next_move(&approve, 3, false, false, Finish::Reject).unwrap(),
            Move::Next(Input::Right)
        );
        assert_eq!(
            next_move(&reject, 4, false, false, Finish::Reject).unwrap(),
            Move::Last(Input::Both)
        );

        assert!(matches!(
            next_move(&warning, 0, false, false, Finish::Approve),
            Err(Error::ProtocolMismatch(_))
        ));
        assert!(matches!(
            next_move(&review, 0, false, true, Finish::Approve),
            Err(Error::ProtocolMismatch(_))
        ));
        assert!(matches!(
            next_move(&warning, 2, false, true, Finish::Approve),
            Err(Error::ProtocolMismatch(_))
        ));
        assert!(matches!(
            next_move(&reject, 4, false, false, Finish::Approve),
            Err(Error::ProtocolMismatch(_))
        ));
    }

    #[test]
    fn test_next_move_touch() {
        let warning = screen(&[gui::BLIND_WARNING_TITLE, gui::REJECT_LABEL, gui::CONFIRM_LABEL]);
        let review = screen(&["Review transaction (1/2)", "Chain ID", "1329"]);
        let decision = screen(&[gui::SIGN_TX_QUESTION, gui::REJECT_LABEL, gui::CONFIRM_LABEL]);
        let home = screen(&[gui::APP_NAME, "Ready", gui::SETTINGS_TITLE]);
        let error = screen(&[gui::ERROR_TITLE, "Enable blind signing"]);

        assert_eq!(
            next_move(&warning, 0, true, true, Finish::Approve).unwrap(),
            Move::Next(Input::Tap(TapArea::Confirm))
        );
        assert_eq!(
            next_move(&review, 0, true, false, Finish::Approve).unwrap(),
            Move::Next(Input::SwipeNext)
        );
        assert_eq!(
            next_move(&decision, 2, true, false, Finish::Approve).unwrap(),
            Move::Last(Input::Tap(TapArea::Confirm))
        );
        assert_eq!(
            next_move(&decision, 2, true, false, Finish::Reject).unwrap(),
            Move::Last(Input::Tap(TapArea::Reject))
        );

        for unexpected in [home, error] {
            assert!(matches!(
                next_move(&unexpected, 1, true, false, Finish::Approve),
                Err(Error::ProtocolMismatch(_))
            ));
        }
    }

    #[test]
    fn test_toggle_sequence() {
        assert_eq!(
            toggle_sequence(false),
            [Input::Right, Input::Both, Input::Left]
        );
        assert!(toggle_sequence(true).iter().all(|i| i.is_touch()));
        assert!(FlowState::Displaying(2).is_in_flight());
        assert!(!FlowState::Rejected.is_in_flight());
    }
}
