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

use std::future::Future;
use std::path::PathBuf;
use std::sync::{Once, OnceLock};

use crate::fixtures::{model_by_name, DeviceModel};
use crate::scenarios;
use crate::utils::model::Journal;
use crate::utils::snapshot::SnapshotMode;
use crate::utils::{EmulatorInstance, StartOptions};

mod eth;

pub static INIT_LOG: Once = Once::new();

/// Handle given to every functional test, bound to one device model
#[derive(Debug, Clone)]
pub struct Tester {
    pub model: &'static DeviceModel,
    pub name: String,
    journal: Journal,
}

impl Tester {
    fn new(name: &str, model: &str) -> Self {
        Tester {
            model: model_by_name(model).expect("Known model"),
            name: name.to_string(),
            journal: Journal::default(),
        }
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Snapshots of every test go in their own directory, tests run concurrently
    pub fn snapshots_dir(&self) -> PathBuf {
        get_temp_dir().join("snapshots").join(&self.name)
    }

    pub fn options(&self) -> StartOptions {
        StartOptions {
            logging: true,
            snapshots_dir: self.snapshots_dir().join("golden"),
            snapshots_tmp_dir: self.snapshots_dir().join("current"),
            ..Default::default()
        }
    }

    pub fn verify_options(&self) -> StartOptions {
        StartOptions {
            snapshot_mode: SnapshotMode::Verify,
            ..self.options()
        }
    }

    pub async fn start(&self) -> Result<EmulatorInstance, crate::Error> {
        self.start_with(self.options()).await
    }

    /// Session whose steps are not journaled, for flows expected to fail
    pub async fn start_unrecorded(
        &self,
        options: StartOptions,
    ) -> Result<EmulatorInstance, crate::Error> {
        scenarios::start(self.model, options, None).await
    }

    pub async fn start_with(&self, options: StartOptions) -> Result<EmulatorInstance, crate::Error> {
        scenarios::start(self.model, options, Some(&self.journal)).await
    }
}

pub async fn run_functional_test<F, Fut>(
    name: &str,
    model: &str,
    test: F,
) -> Result<(), crate::Error>
where
    F: FnOnce(Tester) -> Fut,
    Fut: Future<Output = Result<(), crate::Error>>,
{
    INIT_LOG.call_once(|| {
        env_logger::init();
    });

    let tester = Tester::new(name, model);
    let journal = tester.journal().clone();

    let result = test(tester).await;
    if let Err(e) = &result {
        journal.fail(&e.to_string());
    }

    let log = journal.take_log(name);
    if !log.result || result.is_err() {
        let to = get_temp_dir().join(format!("{}.html", name));
        crate::utils::report::render_report(&to, &log)?;

        let failed = log.steps.iter().find(|s| !s.pass).map(|s| &s.op);
        panic!(
            "Test '{}' failed at {:?}: {:?}. Report available here: {}",
            name,
            failed,
            result.err(),
            to.display()
        );
    }

    Ok(())
}

fn get_temp_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("REPORT_TMP_DIR") {
        let path = PathBuf::from(&dir);
        if !path.exists() {
            std::fs::create_dir_all(&path).expect("Can create the report dir");
        }

        path
    } else {
        // n.b. static items do not call [`Drop`] on program termination, but this is
        // actually good for us because it means the tempdir will be kept
        static TEMPDIR: OnceLock<tempdir::TempDir> = OnceLock::new();
        TEMPDIR
            .get_or_init(|| tempdir::TempDir::new("sei-func-tests").expect("Can create temp directory"))
            .path()
            .to_path_buf()
    }
}
