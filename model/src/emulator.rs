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

use std::sync::Arc;

/// Touch area on the screen of a touch device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "emulator", derive(serde::Deserialize, serde::Serialize))]
pub enum TapArea {
    Confirm,
    Reject,
    Settings,
    Toggle,
    Back,
}

/// Physical interaction with the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "emulator", derive(serde::Deserialize, serde::Serialize))]
pub enum Input {
    Left,
    Right,
    Both,
    SwipeNext,
    SwipePrevious,
    Tap(TapArea),
}

impl Input {
    pub fn is_touch(&self) -> bool {
        matches!(self, Input::SwipeNext | Input::SwipePrevious | Input::Tap(_))
    }
}

/// Messages sent from the host to the simulated device
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "emulator", derive(serde::Deserialize, serde::Serialize))]
pub enum EmulatorMessage {
    Apdu(Vec<u8>),
    Input(Input),
}

/// Messages sent from the simulated device to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardMessage {
    Apdu(Vec<u8>),
    Log(String),
}

/// A rendered screen: one byte per pixel (0 or 255) plus the text lines that were drawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub text: Vec<String>,
}

impl Screen {
    pub fn blank(width: u32, height: u32) -> Self {
        Screen {
            width,
            height,
            pixels: vec![0; (width * height) as usize],
            text: vec![],
        }
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.text.iter().any(|l| l.contains(needle))
    }

    pub fn joined_text(&self) -> String {
        self.text.join(" | ")
    }
}

/// A screen together with its render sequence number
#[derive(Debug, Clone)]
pub struct Frame {
    pub seq: u64,
    pub screen: Arc<Screen>,
}

impl Frame {
    pub fn new(seq: u64, screen: Screen) -> Self {
        Frame {
            seq,
            screen: Arc::new(screen),
        }
    }
}
