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

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use model::emulator::Screen;

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum SnapshotMode {
    /// Overwrite the reference snapshots with the current run
    Record,
    /// Compare the current run with the reference snapshots
    Verify,
}

/// Screens captured during a flow, stored as `<root>/<label>/NNNNN.png`
///
/// Every run writes to `current`, reference images live in `golden`.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    golden: PathBuf,
    current: PathBuf,
    mode: SnapshotMode,
}

pub fn encode_png(screen: &Screen) -> Result<Vec<u8>, Error> {
    let buffer = image::GrayImage::from_raw(screen.width, screen.height, screen.pixels.clone())
        .ok_or_else(|| {
            Error::Snapshot(format!(
                "Invalid frame buffer of {} bytes for {}x{}",
                screen.pixels.len(),
                screen.width,
                screen.height
            ))
        })?;

    let mut png = vec![];
    image::DynamicImage::ImageLuma8(buffer).write_to(&mut png, image::ImageOutputFormat::Png)?;
    Ok(png)
}

impl SnapshotStore {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(golden: P, current: Q, mode: SnapshotMode) -> Self {
        SnapshotStore {
            golden: golden.into(),
            current: current.into(),
            mode,
        }
    }

    pub fn mode(&self) -> SnapshotMode {
        self.mode
    }

    pub fn golden_path(&self, label: &str, index: usize) -> PathBuf {
        Self::file_path(&self.golden, label, index)
    }

    pub fn current_path(&self, label: &str, index: usize) -> PathBuf {
        Self::file_path(&self.current, label, index)
    }

    fn file_path(root: &Path, label: &str, index: usize) -> PathBuf {
        root.join(label).join(format!("{:05}.png", index))
    }

    async fn reset_dir(dir: &Path) -> Result<(), Error> {
        if tokio::fs::metadata(dir).await.is_ok() {
            tokio::fs::remove_dir_all(dir).await?;
        }
        tokio::fs::create_dir_all(dir).await?;
        Ok(())
    }

    /// Store snapshot `index` of `label`, comparing it with the reference image in verify mode
    ///
    /// The first snapshot of a label clears what a previous run left behind. A missing or different
    /// reference image is a [`Error::ProtocolMismatch`], the device drifted from the recorded flow.
    pub async fn compare_and_store(
        &self,
        label: &str,
        index: usize,
        screen: &Screen,
    ) -> Result<PathBuf, Error> {
        let png = encode_png(screen)?;

        if index == 0 {
            Self::reset_dir(&self.current.join(label)).await?;
            if self.mode == SnapshotMode::Record {
                Self::reset_dir(&self.golden.join(label)).await?;
            }
        }

        let current = self.current_path(label, index);
        tokio::fs::write(&current, &png).await?;
        log::trace!("Stored snapshot {}", current.display());

        let golden = self.golden_path(label, index);
        match self.mode {
            SnapshotMode::Record => {
                tokio::fs::write(&golden, &png).await?;
            }
            SnapshotMode::Verify => {
                let expected = tokio::fs::read(&golden).await.map_err(|e| {
                    Error::ProtocolMismatch(format!("Missing snapshot {}: {}", golden.display(), e))
                })?;
                if expected != png {
                    return Err(Error::ProtocolMismatch(format!(
                        "{} differs from {}",
                        current.display(),
                        golden.display()
                    )));
                }
            }
        }

        Ok(current)
    }

    /// Number of reference snapshots stored for `label`
    pub async fn count(&self, label: &str) -> Result<usize, Error> {
        let mut count = 0;
        let mut stream = match tokio::fs::read_dir(self.golden.join(label)).await {
            Ok(stream) => stream,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = stream.next_entry().await? {
            if entry.file_name().to_string_lossy().ends_with(".png") {
                count += 1;
            }
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen(fill: u8) -> Screen {
        Screen {
            width: 4,
            height: 2,
            pixels: vec![fill; 8],
            text: vec![],
        }
    }

    #[tokio::test]
    async fn test_record_then_verify() {
        let dir = tempdir::TempDir::new("snapshots").unwrap();
        let golden = dir.path().join("golden");
        let current = dir.path().join("current");

        let store = SnapshotStore::new(&golden, &current, SnapshotMode::Record);
        store.compare_and_store("x-flow", 0, &screen(0)).await.unwrap();
        store.compare_and_store("x-flow", 1, &screen(255)).await.unwrap();
        assert_eq!(store.count("x-flow").await.unwrap(), 2);
        assert!(golden.join("x-flow").join("00001.png").exists());

        let store = SnapshotStore::new(&golden, &current, SnapshotMode::Verify);
        store.compare_and_store("x-flow", 0, &screen(0)).await.unwrap();
        assert!(matches!(
            store.compare_and_store("x-flow", 1, &screen(0)).await,
            Err(Error::ProtocolMismatch(_))
        ));
        assert!(matches!(
            store.compare_and_store("x-flow", 2, &screen(0)).await,
            Err(Error::ProtocolMismatch(_))
        ));
        assert_eq!(store.count("missing").await.unwrap(), 0);
    }

    #[test]
    fn test_invalid_buffer() {
        let mut broken = screen(0);
        broken.pixels.pop();
        assert!(matches!(encode_png(&broken), Err(Error::Snapshot(_))));
        assert!(encode_png(&screen(255)).is_ok());
    }
}
