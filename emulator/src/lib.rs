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

//! Acceptance harness for the Sei signing flows
//!
//! Every test starts its own simulated device ([`utils::EmulatorInstance`]), issues requests
//! through the [`orchestrator`] without waiting for them, walks the approval screens with the
//! [`approval`] driver and finally checks the returned signatures with [`verify`].

pub mod approval;
pub mod fixtures;
pub mod link;
pub mod orchestrator;
pub mod scenarios;
pub mod utils;
pub mod verify;

#[cfg(test)]
mod tests;

#[derive(Debug)]
pub enum Error {
    /// The simulator could not be started
    SessionStart(String),
    /// The session was closed or its device went away
    SessionClosed,
    ApprovalTimeout(String),
    /// The user rejected the request on the device
    ApprovalRejected,
    /// The device showed something the flow did not expect
    ProtocolMismatch(String),
    Verification(String),
    /// A screen could not be encoded as a snapshot
    Snapshot(String),
    /// Another request is still in flight on this session
    Busy,

    Sdk(sdk::SdkError),
    Io(std::io::Error),
    Image(image::ImageError),
    Template(String),
    Json(serde_json::Error),
    Join(tokio::task::JoinError),
    Hex(hex::FromHexError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{:?}", self))
    }
}
impl std::error::Error for Error {}

impl From<sdk::SdkError> for Error {
    fn from(e: sdk::SdkError) -> Self {
        Error::Sdk(e)
    }
}
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e)
    }
}
impl From<handlebars::TemplateError> for Error {
    fn from(e: handlebars::TemplateError) -> Self {
        Error::Template(e.to_string())
    }
}
impl From<handlebars::RenderError> for Error {
    fn from(e: handlebars::RenderError) -> Self {
        Error::Template(e.to_string())
    }
}
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}
impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Join(e)
    }
}
impl From<hex::FromHexError> for Error {
    fn from(e: hex::FromHexError) -> Self {
        Error::Hex(e)
    }
}
