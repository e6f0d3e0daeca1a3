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

use model::Target;

/// Settings the simulated device boots with
#[derive(Debug, Clone)]
pub struct Config {
    pub target: Target,
    pub mnemonic: String,
    pub blind_signing: bool,
    /// Forward log lines to the host
    pub logging: bool,
}

impl Config {
    pub fn new(target: Target, mnemonic: &str) -> Self {
        Config {
            target,
            mnemonic: mnemonic.to_string(),
            blind_signing: false,
            logging: false,
        }
    }

    pub fn with_logging(mut self, logging: bool) -> Self {
        self.logging = logging;
        self
    }

    pub fn with_blind_signing(mut self, blind_signing: bool) -> Self {
        self.blind_signing = blind_signing;
        self
    }
}

/// Settings changed at runtime from the device menu
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settings {
    pub blind_signing: bool,
}

impl Settings {
    pub fn toggle_blind_signing(&mut self) {
        self.blind_signing = !self.blind_signing;
        log::debug!("Blind signing enabled: {}", self.blind_signing);
    }
}
