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

use gui::{HomePage, MenuItemPage, SettingsPage, QUIT_LABEL, VERSION_LABEL};
use model::emulator::{Input, TapArea};

use super::apdu::{self, Action};
use super::*;
use crate::version::VERSION_STRING;

pub const READY_TEXT: &str = "Ready";

/// Position in the idle screens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Menu {
    Home,
    BlindSigning,
    Version,
    Quit,
    /// Settings page of the touch devices
    Settings,
}

impl Menu {
    const BUTTONS: [Menu; 4] = [Menu::Home, Menu::BlindSigning, Menu::Version, Menu::Quit];

    fn index(&self) -> usize {
        Self::BUTTONS.iter().position(|m| m == self).unwrap_or(0)
    }

    fn handle_input(self, input: Input, settings: &mut Settings) -> Menu {
        let len = Self::BUTTONS.len();

        match (self, input) {
            (Menu::Settings, Input::Tap(TapArea::Toggle)) => {
                settings.toggle_blind_signing();
                Menu::Settings
            }
            (Menu::Settings, Input::Tap(TapArea::Back)) => Menu::Home,
            (Menu::Settings, _) => Menu::Settings,
            (Menu::Home, Input::Tap(TapArea::Settings)) => Menu::Settings,

            (Menu::BlindSigning, Input::Both) => {
                settings.toggle_blind_signing();
                Menu::BlindSigning
            }
            (Menu::Quit, Input::Both) => Menu::Home,
            (menu, Input::Right) => Self::BUTTONS[(menu.index() + 1) % len],
            (menu, Input::Left) => Self::BUTTONS[(menu.index() + len - 1) % len],
            (menu, _) => menu,
        }
    }

    fn draw(&self, peripherals: &mut HandlerPeripherals) -> Result<(), Error> {
        let layout = peripherals.layout;
        let blind_signing = peripherals.settings.blind_signing;

        match self {
            Menu::Home => peripherals.draw(&HomePage::new(layout, READY_TEXT)),
            Menu::BlindSigning => peripherals.draw(&MenuItemPage::blind_signing(blind_signing)),
            Menu::Version => {
                peripherals.draw(&MenuItemPage::new(VERSION_LABEL, Some(VERSION_STRING)))
            }
            Menu::Quit => peripherals.draw(&MenuItemPage::new(QUIT_LABEL, None)),
            Menu::Settings => {
                peripherals.draw(&SettingsPage::new(layout, blind_signing, VERSION_STRING))
            }
        }
    }
}

pub async fn handle_idle<E>(
    events: &mut E,
    peripherals: &mut HandlerPeripherals,
) -> Result<CurrentState, Error>
where
    E: Stream<Item = Event> + Unpin,
{
    log::info!("handle_idle");

    let mut menu = Menu::Home;
    let mut receiver = None;
    menu.draw(peripherals)?;

    loop {
        match next_event(events).await? {
            Event::Input(input) => {
                menu = menu.handle_input(input, &mut peripherals.settings);
                menu.draw(peripherals)?;
            }
            Event::Invalid(status) => peripherals.reply_status(status)?,
            Event::Request(cmd) => match apdu::handle_request(&cmd, &mut receiver, peripherals) {
                Action::Reply(answer) => peripherals.reply(answer)?,
                Action::Transition(state) => break Ok(state),
                Action::ReplyAndTransition(answer, state) => {
                    peripherals.reply(answer)?;
                    break Ok(state);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_menu() {
        let mut settings = Settings::default();

        let menu = Menu::Home.handle_input(Input::Right, &mut settings);
        assert_eq!(menu, Menu::BlindSigning);
        let menu = menu.handle_input(Input::Both, &mut settings);
        assert_eq!(menu, Menu::BlindSigning);
        assert!(settings.blind_signing);
        let menu = menu.handle_input(Input::Left, &mut settings);
        assert_eq!(menu, Menu::Home);

        assert_eq!(Menu::Home.handle_input(Input::Left, &mut settings), Menu::Quit);
        assert_eq!(Menu::Quit.handle_input(Input::Both, &mut settings), Menu::Home);
        assert_eq!(Menu::Home.handle_input(Input::Both, &mut settings), Menu::Home);
        assert!(settings.blind_signing);
    }

    #[test]
    fn test_touch_settings() {
        let mut settings = Settings::default();

        let menu = Menu::Home.handle_input(Input::Tap(TapArea::Settings), &mut settings);
        assert_eq!(menu, Menu::Settings);
        let menu = menu.handle_input(Input::Tap(TapArea::Toggle), &mut settings);
        assert!(settings.blind_signing);
        let menu = menu.handle_input(Input::SwipeNext, &mut settings);
        assert_eq!(menu, Menu::Settings);
        let menu = menu.handle_input(Input::Tap(TapArea::Back), &mut settings);
        assert_eq!(menu, Menu::Home);
        assert!(settings.blind_signing);
    }
}
