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

use gui::{BlindWarningPage, Decision, DecisionPage, ReviewItem, ReviewKind, ReviewPage};
use model::emulator::{Input, TapArea};

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Warning,
    Review(usize),
    Approve,
    Reject,
    /// Touch devices have a single page with both buttons
    Decide,
}

fn steps(num_screens: usize, blind: bool, touch: bool) -> Vec<Step> {
    let mut steps = vec![];
    if blind {
        steps.push(Step::Warning);
    }
    steps.extend((0..num_screens).map(Step::Review));
    if touch {
        steps.push(Step::Decide);
    } else {
        steps.push(Step::Approve);
        steps.push(Step::Reject);
    }
    steps
}

enum Action {
    Move(usize),
    Stay,
    Finish(Outcome),
}

/// What an input does on the given step. `first` is the first step the user can go back to.
fn next_action(steps: &[Step], pos: usize, first: usize, input: Input) -> Action {
    let last = steps.len() - 1;
    let forward = (pos + 1).min(last);
    let back = pos.saturating_sub(1).max(first);

    match (steps[pos], input) {
        (Step::Warning, Input::Both) | (Step::Warning, Input::Tap(TapArea::Confirm)) => {
            Action::Move(forward)
        }
        (Step::Warning, Input::Left) | (Step::Warning, Input::Tap(TapArea::Reject)) => {
            Action::Finish(Outcome::Rejected)
        }
        (Step::Warning, _) => Action::Stay,

        (Step::Approve, Input::Both) | (Step::Decide, Input::Tap(TapArea::Confirm)) => {
            Action::Finish(Outcome::Approved)
        }
        (Step::Reject, Input::Both) | (Step::Decide, Input::Tap(TapArea::Reject)) => {
            Action::Finish(Outcome::Rejected)
        }

        (_, Input::Right) | (_, Input::SwipeNext) => Action::Move(forward),
        (_, Input::Left) | (_, Input::SwipePrevious) => Action::Move(back),
        _ => Action::Stay,
    }
}

/// Walk the user through the review screens until the request is approved or rejected
///
/// Every input that doesn't end the review redraws the screen exactly once.
pub async fn run_review<E>(
    kind: ReviewKind,
    items: &[ReviewItem],
    blind: bool,
    events: &mut E,
    peripherals: &mut HandlerPeripherals,
) -> Result<Outcome, Error>
where
    E: Stream<Item = Event> + Unpin,
{
    let layout = peripherals.layout;
    let screens = gui::paginate(items, &layout);
    let steps = steps(screens.len(), blind, layout.touch);

    let mut pos = 0;
    let mut first = 0;

    loop {
        match steps[pos] {
            Step::Warning => peripherals.draw(&BlindWarningPage::new(layout))?,
            Step::Review(i) => {
                peripherals.draw(&ReviewPage::new(layout, kind, &screens[i], i, screens.len()))?
            }
            Step::Approve => peripherals.draw(&DecisionPage::new(layout, kind, Decision::Approve))?,
            Step::Reject => peripherals.draw(&DecisionPage::new(layout, kind, Decision::Reject))?,
            Step::Decide => peripherals.draw(&DecisionPage::new(layout, kind, Decision::Both))?,
        }

        let input = next_input(events, peripherals).await?;
        log::trace!("Review input {:?} on {:?}", input, steps[pos]);

        match next_action(&steps, pos, first, input) {
            Action::Finish(outcome) => {
                peripherals
                    .host
                    .log(format!("Review finished: {:?}", outcome));
                return Ok(outcome);
            }
            Action::Move(next) => {
                if steps[pos] == Step::Warning && next != pos {
                    // once accepted the warning is not shown again
                    first = next;
                }
                pos = next;
            }
            Action::Stay => {}
        }
    }
}
