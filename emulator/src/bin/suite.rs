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
use std::time::Instant;

use env_logger::Env;

use clap::{Args, Parser};

use emulator::fixtures::{model_by_name, vector_by_name, DeviceModel, TestVector, MODELS, SIGN_TEST_DATA};
use emulator::scenarios;
use emulator::utils::model::Journal;
use emulator::utils::report::render_report;
use emulator::utils::snapshot::SnapshotMode;
use emulator::utils::{HtmlReport, StartOptions};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    #[clap(flatten)]
    global_opts: GlobalOpts,
}

#[derive(Debug, Args)]
struct GlobalOpts {
    /// Device models to run against, all of them when unspecified
    #[clap(long, short = 'm', value_parser = parse_model)]
    model: Vec<&'static DeviceModel>,

    /// Transactions to sign, all of them when unspecified
    #[clap(long, short = 't', value_parser = parse_vector)]
    vector: Vec<&'static TestVector>,

    /// Seed phrase loaded on the devices
    ///
    /// The addresses and signatures are checked against the standard test seed, any other seed
    /// will fail the checks.
    #[clap(long)]
    seed: Option<String>,

    /// Directory containing the reference snapshots
    #[clap(long, default_value = "./snapshots/")]
    snapshots: PathBuf,

    /// Directory the snapshots of this run are written to
    #[clap(long, default_value = "./snapshots-tmp/")]
    snapshots_tmp: PathBuf,

    /// Overwrite the reference snapshots instead of comparing against them
    #[clap(long, action = clap::ArgAction::SetTrue, default_value_t = false)]
    record: bool,

    /// Which runs get an HTML report
    #[clap(long, value_enum, default_value_t = HtmlReport::OnlyFailing)]
    html_report: HtmlReport,

    /// Directory the HTML reports are written to
    #[clap(long, default_value = "./reports/")]
    report_dir: PathBuf,

    /// Maximum time an input may take to produce a new screen
    #[clap(long, default_value = "5000")]
    timeout_ms: u64,

    /// Whether to print the device logs
    #[clap(long, short = 'j', action = clap::ArgAction::SetTrue, default_value_t = false)]
    join_logs: bool,
}

fn parse_model(name: &str) -> Result<&'static DeviceModel, String> {
    model_by_name(name).ok_or_else(|| {
        let known = MODELS.iter().map(|m| m.name).collect::<Vec<_>>();
        format!("Unknown model {}, known: {}", name, known.join(", "))
    })
}

fn parse_vector(name: &str) -> Result<&'static TestVector, String> {
    vector_by_name(name).ok_or_else(|| format!("Unknown vector {}", name))
}

#[tokio::main]
async fn main() -> Result<(), emulator::Error> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse().global_opts;

    let models: Vec<&DeviceModel> = match args.model.is_empty() {
        true => MODELS.iter().collect(),
        false => args.model.clone(),
    };
    let vectors: Vec<&TestVector> = match args.vector.is_empty() {
        true => SIGN_TEST_DATA.iter().collect(),
        false => args.vector.clone(),
    };

    let options = StartOptions {
        logging: args.join_logs,
        custom_seed: args.seed.clone(),
        settle_timeout_ms: args.timeout_ms,
        snapshots_dir: args.snapshots.clone(),
        snapshots_tmp_dir: args.snapshots_tmp.clone(),
        snapshot_mode: match args.record {
            true => SnapshotMode::Record,
            false => SnapshotMode::Verify,
        },
        ..Default::default()
    };

    if args.html_report != HtmlReport::None {
        tokio::fs::create_dir_all(&args.report_dir).await?;
    }

    let mut failed = vec![];
    for model in &models {
        for vector in &vectors {
            let name = vector.snapshot_label(model);
            let journal = Journal::default();

            let start = Instant::now();
            let result =
                scenarios::run_sign_vector(model, vector, options.clone(), Some(&journal)).await;
            if let Err(e) = &result {
                journal.fail(&e.to_string());
            }

            let log = journal.take_log(&name);
            let pass = result.is_ok() && log.result;
            match &result {
                Ok(sig) => log::info!(
                    "PASS {} ({:?}) v={} r={}",
                    name,
                    start.elapsed(),
                    sig.v,
                    hex::encode(sig.r)
                ),
                Err(e) => log::error!("FAIL {}: {}", name, e),
            }

            let render = match args.html_report {
                HtmlReport::None => false,
                HtmlReport::OnlyFailing => !pass,
                HtmlReport::All => true,
            };
            if render {
                render_report(&args.report_dir.join(format!("{}.html", name)), &log)?;
            }

            if !pass {
                failed.push(name);
            }
        }
    }

    let total = models.len() * vectors.len();
    log::info!("{} passed, {} failed", total - failed.len(), failed.len());
    for name in &failed {
        log::info!("  failed: {}", name);
    }

    if !failed.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}
