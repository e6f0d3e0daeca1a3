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

use serde::Serialize;

use model::emulator::{Input, Screen};

use super::snapshot::encode_png;

#[derive(Debug, Clone, Serialize)]
pub enum TestAction {
    Start { model: String },
    Input(Input),
    Request(String),
    Close,
}

#[derive(Debug, Clone, Serialize)]
pub enum TestAssertion {
    ScreenChanged,
    Snapshot { label: String, index: usize },
    Verified(String),
}

#[derive(Debug, Clone, Serialize)]
pub enum TestOp {
    Action(TestAction),
    Assertion(TestAssertion),
}

impl From<TestAction> for TestOp {
    fn from(value: TestAction) -> Self {
        TestOp::Action(value)
    }
}
impl From<TestAssertion> for TestOp {
    fn from(value: TestAssertion) -> Self {
        TestOp::Assertion(value)
    }
}

#[derive(Debug)]
pub struct TestLogStep {
    pub op: TestOp,
    pub display: Arc<Screen>,
    pub pass: bool,
    pub fail: Option<String>,
    pub log_lines: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TestLog {
    pub name: String,
    pub result: bool, // used in the Handlebars template
    pub steps: Vec<TestLogStep>,
}

impl Serialize for TestLogStep {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::{Error, SerializeMap};

        let mut map = serializer.serialize_map(None)?;
        match &self.op {
            TestOp::Assertion(a) => {
                map.serialize_entry("is_assertion", &true)?;
                map.serialize_entry(
                    "assertion",
                    &serde_json::to_string(&a).map_err(S::Error::custom)?,
                )?;
            }
            TestOp::Action(a) => {
                map.serialize_entry("is_action", &true)?;
                map.serialize_entry("action", &serde_json::to_string(&a).map_err(S::Error::custom)?)?;
            }
        }
        let png = encode_png(&self.display).map_err(S::Error::custom)?;
        map.serialize_entry("display", &base64::encode(png))?;
        map.serialize_entry("screen_text", &self.display.joined_text())?;
        map.serialize_entry("pass", &self.pass)?;
        map.serialize_entry("fail", &self.fail)?;
        map.serialize_entry("print_log_lines", &!self.log_lines.is_empty())?;
        map.serialize_entry("log_lines", &self.log_lines)?;
        map.end()
    }
}

/// Steps of a test, shared by all the sessions the test starts
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<TestLogStep>>>);

impl Journal {
    pub fn push(&self, op: TestOp, display: Arc<Screen>, log_lines: Vec<String>) {
        if let Ok(mut steps) = self.0.lock() {
            steps.push(TestLogStep {
                op,
                display,
                pass: true,
                fail: None,
                log_lines,
            });
        }
    }

    /// Mark the last step as the one that failed
    pub fn fail(&self, reason: &str) {
        if let Ok(mut steps) = self.0.lock() {
            if let Some(step) = steps.last_mut() {
                step.pass = false;
                step.fail = Some(reason.to_string());
            }
        }
    }

    /// Move the steps of `other` at the end of this journal
    pub fn append(&self, other: &Journal) {
        let steps = other
            .0
            .lock()
            .map(|mut steps| std::mem::take(&mut *steps))
            .unwrap_or_default();
        if let Ok(mut own) = self.0.lock() {
            own.extend(steps);
        }
    }

    pub fn len(&self) -> usize {
        self.0.lock().map(|steps| steps.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Move the recorded steps into a [`TestLog`]
    pub fn take_log(&self, name: &str) -> TestLog {
        let steps = self
            .0
            .lock()
            .map(|mut steps| std::mem::take(&mut *steps))
            .unwrap_or_default();

        TestLog {
            name: name.to_string(),
            result: steps.iter().all(|s| s.pass),
            steps,
        }
    }
}
