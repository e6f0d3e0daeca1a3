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

use futures::channel::mpsc;
use futures::StreamExt;
use tokio::task::JoinHandle;

use model::emulator::{CardMessage, EmulatorMessage};
use model::{ApduAnswer, ApduCommand, MessageError};

/// Log lines forwarded by the device, drained by the session at every step
pub type LogBuffer = Arc<Mutex<Vec<String>>>;

#[derive(Debug)]
pub enum LinkError {
    Closed,
    /// Replies of aborted exchanges never arrived, the link can't be trusted anymore
    Desynced(usize),
    Message(MessageError),
}

impl core::fmt::Display for LinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{:?}", self))
    }
}
impl std::error::Error for LinkError {}

impl From<MessageError> for LinkError {
    fn from(e: MessageError) -> Self {
        LinkError::Message(e)
    }
}

/// Split what the device sends into APDU replies and log lines
pub fn stream_incoming_messages(
    mut card_msgs: mpsc::UnboundedReceiver<CardMessage>,
    logs: LogBuffer,
) -> (JoinHandle<()>, mpsc::UnboundedReceiver<Vec<u8>>) {
    let (replies_s, replies) = mpsc::unbounded();

    let handle = tokio::spawn(async move {
        while let Some(card_message) = card_msgs.next().await {
            match card_message {
                CardMessage::Apdu(data) => {
                    log::trace!("< Apdu({})", data.len());
                    if replies_s.unbounded_send(data).is_err() {
                        log::warn!("Reply dropped, transport is gone");
                        break;
                    }
                }
                CardMessage::Log(line) => {
                    log::debug!("[device] {}", line);
                    if let Ok(mut logs) = logs.lock() {
                        logs.push(line);
                    }
                }
            }
        }

        log::trace!("Device link closed");
    });

    (handle, replies)
}

/// How long a reply left behind by an aborted exchange is waited for before giving up
pub const STALE_REPLY_TIMEOUT: Duration = Duration::from_millis(1_000);

struct ReplyQueue {
    replies: mpsc::UnboundedReceiver<Vec<u8>>,
    /// Replies the device still owes to exchanges that were dropped before reading them
    owed: usize,
}

/// APDU transport talking to the simulated device
///
/// Exchanges are serialized: a command is only sent once the previous one got its reply. An
/// exchange dropped while waiting leaves its reply owed, the next exchange discards it first.
pub struct EmulatorTransport {
    card: mpsc::UnboundedSender<EmulatorMessage>,
    queue: tokio::sync::Mutex<ReplyQueue>,
    stale_reply_timeout: Duration,
}

impl EmulatorTransport {
    pub fn new(
        card: mpsc::UnboundedSender<EmulatorMessage>,
        replies: mpsc::UnboundedReceiver<Vec<u8>>,
    ) -> Self {
        EmulatorTransport {
            card,
            queue: tokio::sync::Mutex::new(ReplyQueue { replies, owed: 0 }),
            stale_reply_timeout: STALE_REPLY_TIMEOUT,
        }
    }

    pub fn with_stale_reply_timeout(mut self, timeout: Duration) -> Self {
        self.stale_reply_timeout = timeout;
        self
    }
}

#[async_trait::async_trait]
impl sdk::Exchange for EmulatorTransport {
    type Error = LinkError;

    async fn exchange(&self, command: &ApduCommand) -> Result<ApduAnswer, Self::Error> {
        let bytes = command.serialize()?;

        let mut queue = self.queue.lock().await;
        while queue.owed > 0 {
            match tokio::time::timeout(self.stale_reply_timeout, queue.replies.next()).await {
                Ok(Some(stale)) => {
                    log::debug!("Discarding stale reply {:02X?}", stale);
                    queue.owed -= 1;
                }
                Ok(None) => return Err(LinkError::Closed),
                Err(_) => return Err(LinkError::Desynced(queue.owed)),
            }
        }

        log::trace!("> {:02X?}", bytes);
        self.card
            .unbounded_send(EmulatorMessage::Apdu(bytes))
            .map_err(|_| LinkError::Closed)?;

        // settled again once the reply is read
        queue.owed += 1;
        let reply = queue.replies.next().await.ok_or(LinkError::Closed)?;
        queue.owed -= 1;
        log::trace!("< {:02X?}", reply);

        Ok(ApduAnswer::deserialize(&reply)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use model::{StatusWord, CLA, INS_GET_VERSION};
    use sdk::Exchange;

    #[tokio::test]
    async fn test_exchange_and_logs() {
        let (card, mut card_r) = mpsc::unbounded();
        let (device, device_r) = mpsc::unbounded();
        let logs = LogBuffer::default();

        let (handle, replies) = stream_incoming_messages(device_r, Arc::clone(&logs));
        let transport = EmulatorTransport::new(card, replies);

        device
            .unbounded_send(CardMessage::Log("hello".to_string()))
            .unwrap();
        device
            .unbounded_send(CardMessage::Apdu(vec![0x01, 0x90, 0x00]))
            .unwrap();

        let command = ApduCommand {
            cla: CLA,
            ins: INS_GET_VERSION,
            p1: 0,
            p2: 0,
            data: vec![],
        };
        let answer = transport.exchange(&command).await.unwrap();
        assert_eq!(answer.data(), &[0x01]);
        assert_eq!(answer.status_word(), Ok(StatusWord::Ok));
        assert_eq!(
            card_r.next().await,
            Some(EmulatorMessage::Apdu(vec![CLA, INS_GET_VERSION, 0, 0, 0]))
        );
        assert_eq!(logs.lock().unwrap().as_slice(), &["hello".to_string()]);

        drop(device);
        handle.await.unwrap();
        assert!(matches!(
            transport.exchange(&command).await,
            Err(LinkError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_reply_of_dropped_exchange_is_discarded() {
        let (card, mut card_r) = mpsc::unbounded();
        let (device, device_r) = mpsc::unbounded();
        let (_handle, replies) = stream_incoming_messages(device_r, LogBuffer::default());
        let transport = EmulatorTransport::new(card, replies)
            .with_stale_reply_timeout(Duration::from_millis(200));

        let command = ApduCommand {
            cla: CLA,
            ins: INS_GET_VERSION,
            p1: 0,
            p2: 0,
            data: vec![],
        };

        // the device is still busy, the caller gives up
        let dropped =
            tokio::time::timeout(Duration::from_millis(50), transport.exchange(&command)).await;
        assert!(dropped.is_err());
        assert!(card_r.next().await.is_some());

        device
            .unbounded_send(CardMessage::Apdu(vec![0x69, 0x86]))
            .unwrap();
        device
            .unbounded_send(CardMessage::Apdu(vec![0x02, 0x90, 0x00]))
            .unwrap();
        let answer = transport.exchange(&command).await.unwrap();
        assert_eq!(answer.data(), &[0x02]);
        assert_eq!(answer.status_word(), Ok(StatusWord::Ok));

        // this time the owed reply never comes
        let dropped =
            tokio::time::timeout(Duration::from_millis(50), transport.exchange(&command)).await;
        assert!(dropped.is_err());
        assert!(matches!(
            transport.exchange(&command).await,
            Err(LinkError::Desynced(1))
        ));
    }
}
