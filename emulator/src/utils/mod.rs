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

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::channel::mpsc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use ::model::emulator::{EmulatorMessage, Frame, Input, Screen};
use ::model::Target;

use sdk::SeiApp;

use crate::approval::{FlowHandle, FlowState};
use crate::fixtures::{DeviceModel, SEED};
use crate::link::{self, EmulatorTransport, LogBuffer};
use crate::Error;

pub mod model;
pub mod report;
pub mod snapshot;

use self::model::{Journal, TestAction, TestOp};
use self::snapshot::{SnapshotMode, SnapshotStore};

pub type App = SeiApp<EmulatorTransport>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum HtmlReport {
    None,
    OnlyFailing,
    All,
}

/// How a simulated device is started
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StartOptions {
    /// Forward the device log lines
    pub logging: bool,
    /// Seed phrase loaded on the device, the standard test seed when missing
    pub custom_seed: Option<String>,
    /// Open a window on the host display. Not available, the simulator is headless.
    pub x11: bool,
    /// Text the home screen shows once the app is ready
    pub start_text: String,
    pub start_timeout_ms: u64,
    /// Maximum time an input may take to produce a new screen
    pub settle_timeout_ms: u64,
    /// Start with blind signing already enabled
    pub blind_signing: bool,
    pub snapshots_dir: PathBuf,
    pub snapshots_tmp_dir: PathBuf,
    pub snapshot_mode: SnapshotMode,
}

impl Default for StartOptions {
    fn default() -> Self {
        StartOptions {
            logging: false,
            custom_seed: None,
            x11: false,
            start_text: firmware::handlers::idle::READY_TEXT.to_string(),
            start_timeout_ms: 20_000,
            settle_timeout_ms: 5_000,
            blind_signing: false,
            snapshots_dir: PathBuf::from("snapshots"),
            snapshots_tmp_dir: PathBuf::from("snapshots-tmp"),
            snapshot_mode: SnapshotMode::Record,
        }
    }
}

impl StartOptions {
    pub fn seed(&self) -> &str {
        self.custom_seed.as_deref().unwrap_or(SEED)
    }
}

/// A running simulated device
///
/// Dropping the instance stops the device, [`EmulatorInstance::close`] also waits for it.
pub struct EmulatorInstance {
    pub model: DeviceModel,
    pub target: Target,
    options: StartOptions,

    app: Arc<App>,
    card: mpsc::UnboundedSender<EmulatorMessage>,
    frames: watch::Receiver<Frame>,
    home: Arc<Screen>,
    logs: LogBuffer,
    snapshots: SnapshotStore,
    flow: FlowHandle,
    journal: Option<Journal>,

    tasks: Vec<JoinHandle<()>>,
}

impl EmulatorInstance {
    pub async fn start(model: &DeviceModel, options: StartOptions) -> Result<Self, Error> {
        log::debug!("Starting {} ({})", model.name, model.image);

        if options.x11 {
            return Err(Error::SessionStart(
                "X11 display requested, the simulator is headless".into(),
            ));
        }
        let target = Target::from_image_name(model.image)
            .ok_or_else(|| Error::SessionStart(format!("Unknown app image {}", model.image)))?;

        let (card, incoming) = mpsc::unbounded();
        let (outgoing, card_msgs) = mpsc::unbounded();
        let (width, height) = target.display_size();
        let (frames_s, frames) = watch::channel(Frame::new(0, Screen::blank(width, height)));

        let config = firmware::Config::new(target, options.seed())
            .with_logging(options.logging)
            .with_blind_signing(options.blind_signing);
        let device_task = tokio::spawn(async move {
            if let Err(e) = firmware::run(config, incoming, outgoing, frames_s).await {
                log::warn!("Device stopped: {:?}", e);
            }
        });

        let logs = LogBuffer::default();
        let (router, replies) = link::stream_incoming_messages(card_msgs, Arc::clone(&logs));
        let app = Arc::new(SeiApp::new(EmulatorTransport::new(card.clone(), replies)));

        let snapshots = SnapshotStore::new(
            &options.snapshots_dir,
            &options.snapshots_tmp_dir,
            options.snapshot_mode,
        );

        let mut instance = EmulatorInstance {
            model: *model,
            target,
            home: Arc::new(Screen::blank(width, height)),
            options,
            app,
            card,
            frames,
            logs,
            snapshots,
            flow: Arc::new(Mutex::new(FlowState::Idle)),
            journal: None,
            tasks: vec![device_task, router],
        };

        // on failure the instance is dropped here, stopping the tasks
        let start_text = instance.options.start_text.clone();
        let home = instance
            .wait_for_screen(
                |s| s.contains_text(&start_text),
                Duration::from_millis(instance.options.start_timeout_ms),
            )
            .await
            .map_err(|e| Error::SessionStart(format!("Home screen not shown: {:?}", e)))?;
        instance.home = home;

        log::debug!("Started {}", model.name);
        Ok(instance)
    }

    /// Record every step of this session in `journal`
    pub fn with_journal(mut self, journal: Journal) -> Self {
        journal.push(
            TestAction::Start {
                model: self.model.name.to_string(),
            }
            .into(),
            Arc::clone(&self.home),
            self.drain_logs(),
        );
        self.journal = Some(journal);
        self
    }

    pub fn app(&self) -> Arc<App> {
        Arc::clone(&self.app)
    }

    pub fn options(&self) -> &StartOptions {
        &self.options
    }

    pub fn snapshot_store(&self) -> &SnapshotStore {
        &self.snapshots
    }

    pub fn flow(&self) -> FlowHandle {
        Arc::clone(&self.flow)
    }

    pub fn flow_state(&self) -> FlowState {
        self.flow.lock().map(|s| *s).unwrap_or(FlowState::Idle)
    }

    pub(crate) fn set_flow(&self, state: FlowState) {
        if let Ok(mut flow) = self.flow.lock() {
            log::trace!("Flow {:?} -> {:?}", *flow, state);
            *flow = state;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tasks.iter().any(|t| t.is_finished()) || self.card.is_closed()
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.options.settle_timeout_ms)
    }

    pub fn current_screen(&self) -> Arc<Screen> {
        Arc::clone(&self.frames.borrow().screen)
    }

    /// The home screen as it was rendered when the app started
    pub fn main_menu_snapshot(&self) -> Arc<Screen> {
        Arc::clone(&self.home)
    }

    pub(crate) fn drain_logs(&self) -> Vec<String> {
        self.logs
            .lock()
            .map(|mut logs| std::mem::take(&mut *logs))
            .unwrap_or_default()
    }

    pub(crate) fn record(&self, op: TestOp) {
        if let Some(journal) = &self.journal {
            journal.push(op, self.current_screen(), self.drain_logs());
        }
    }

    pub(crate) fn record_failure(&self, reason: &str) {
        if let Some(journal) = &self.journal {
            journal.fail(reason);
        }
    }

    /// Wait until the current frame satisfies `f`
    pub async fn wait_for_screen<F>(
        &mut self,
        mut f: F,
        timeout: Duration,
    ) -> Result<Arc<Screen>, Error>
    where
        F: FnMut(&Screen) -> bool + Send,
    {
        let wait = self.frames.wait_for(|frame| f(&*frame.screen));
        let outcome = tokio::time::timeout(timeout, wait)
            .await
            .map(|r| r.map(|frame| Arc::clone(&frame.screen)));

        match outcome {
            Ok(Ok(screen)) => Ok(screen),
            Ok(Err(_)) => Err(Error::SessionClosed),
            Err(_) => Err(Error::ApprovalTimeout(format!(
                "Screen still showing: {}",
                self.current_screen().joined_text()
            ))),
        }
    }

    /// Send an input and wait for the screen it produces
    pub async fn send_input(&mut self, input: Input) -> Result<Arc<Screen>, Error> {
        if input.is_touch() != self.target.is_touch() {
            return Err(Error::ProtocolMismatch(format!(
                "{:?} is not available on {}",
                input, self.model.name
            )));
        }

        let seq = self.frames.borrow().seq;
        log::trace!("Input {:?} on {}", input, self.model.name);
        self.card
            .unbounded_send(EmulatorMessage::Input(input))
            .map_err(|_| Error::SessionClosed)?;

        let timeout = self.settle_timeout();
        let wait = self.frames.wait_for(|frame| frame.seq > seq);
        let outcome = tokio::time::timeout(timeout, wait)
            .await
            .map(|r| r.map(|frame| Arc::clone(&frame.screen)));
        let screen = match outcome {
            Ok(Ok(screen)) => screen,
            Ok(Err(_)) => return Err(Error::SessionClosed),
            Err(_) => {
                return Err(Error::ApprovalTimeout(format!(
                    "No screen after {:?}",
                    input
                )))
            }
        };

        self.record(TestAction::Input(input).into());
        Ok(screen)
    }

    fn stop(&mut self) -> Vec<JoinHandle<()>> {
        let tasks = std::mem::take(&mut self.tasks);
        for task in &tasks {
            task.abort();
        }
        tasks
    }

    pub async fn close(mut self) -> Result<(), Error> {
        log::debug!("Closing {}", self.model.name);
        self.record(TestAction::Close.into());

        for task in self.stop() {
            match task.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }
}

impl Drop for EmulatorInstance {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::fixtures::MODELS;

    #[test]
    fn test_options_serde() {
        let options: StartOptions =
            serde_json::from_str(r#"{"logging": true, "custom_seed": "abandon"}"#).unwrap();
        assert!(options.logging);
        assert_eq!(options.seed(), "abandon");
        assert_eq!(options.start_text, "Ready");
        assert_eq!(options.snapshot_mode, SnapshotMode::Record);

        assert_eq!(StartOptions::default().seed(), SEED);
    }

    #[tokio::test]
    async fn test_start_and_close() {
        let dir = tempdir::TempDir::new("session").unwrap();
        let options = StartOptions {
            snapshots_dir: dir.path().join("golden"),
            snapshots_tmp_dir: dir.path().join("current"),
            ..Default::default()
        };

        let mut sim = EmulatorInstance::start(&MODELS[0], options).await.unwrap();
        assert!(sim.current_screen().contains_text("Ready"));
        assert_eq!(sim.current_screen(), sim.main_menu_snapshot());
        assert_eq!(sim.flow_state(), FlowState::Idle);

        let screen = sim.send_input(Input::Right).await.unwrap();
        assert!(screen.contains_text(gui::BLIND_SIGNING_LABEL));
        assert!(matches!(
            sim.send_input(Input::SwipeNext).await,
            Err(Error::ProtocolMismatch(_))
        ));

        sim.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_failures() {
        let unknown = DeviceModel {
            name: "nanos",
            prefix: "S",
            image: "app_s",
        };
        assert!(matches!(
            EmulatorInstance::start(&unknown, StartOptions::default()).await,
            Err(Error::SessionStart(_))
        ));

        let options = StartOptions {
            x11: true,
            ..Default::default()
        };
        assert!(matches!(
            EmulatorInstance::start(&MODELS[2], options).await,
            Err(Error::SessionStart(_))
        ));

        let options = StartOptions {
            custom_seed: Some("not a valid mnemonic".into()),
            start_timeout_ms: 1_000,
            ..Default::default()
        };
        assert!(matches!(
            EmulatorInstance::start(&MODELS[1], options).await,
            Err(Error::SessionStart(_))
        ));
    }
}
