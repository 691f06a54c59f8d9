//! LightFlow simulator - replays a scenario through the engine and prints one JSON
//! `LightingIntent` per line on stdout.
//!
//! ```text
//! lightflow-sim <scenario> [--config <file>] [--log-level <level>] [--log-file] [--events]
//! ```

#![warn(missing_docs)]

mod logging_setup;
mod scenario;

use anyhow::{bail, Context, Result};
use lightflow_core::{EngineConfig, FrameOutput, LogConfig};
use scenario::Scenario;
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

const USAGE: &str = "Usage: lightflow-sim <scenario.{json,ron,toml}> [--config <file>] \
[--log-level <level>] [--log-file] [--events]";

/// Parsed command line
#[derive(Debug, Default, PartialEq)]
struct Args {
    scenario: PathBuf,
    config: Option<PathBuf>,
    log_level: Option<String>,
    log_file: bool,
    events: bool,
}

impl Args {
    fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Option<Self>> {
        let mut parsed = Args::default();
        let mut scenario = None;
        let mut iter = args.into_iter();

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-h" | "--help" => return Ok(None),
                "--config" => {
                    let value = iter.next().context("--config needs a file")?;
                    parsed.config = Some(PathBuf::from(value));
                }
                "--log-level" => {
                    parsed.log_level = Some(iter.next().context("--log-level needs a level")?);
                }
                "--log-file" => parsed.log_file = true,
                "--events" => parsed.events = true,
                flag if flag.starts_with("--") => bail!("Unknown option '{}'\n{}", flag, USAGE),
                _ if scenario.is_none() => scenario = Some(PathBuf::from(arg)),
                _ => bail!("Unexpected argument '{}'\n{}", arg, USAGE),
            }
        }

        match scenario {
            Some(path) => {
                parsed.scenario = path;
                Ok(Some(parsed))
            }
            None => bail!("Missing scenario file\n{}", USAGE),
        }
    }

    fn log_config(&self) -> LogConfig {
        let mut config = LogConfig::default().with_session_stamp();
        if let Some(level) = &self.log_level {
            config.level = level.clone();
        }
        config.file_output = self.log_file;
        config
    }
}

#[derive(Serialize)]
struct FrameLine<'a> {
    frame: usize,
    #[serde(flatten)]
    output: FrameView<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum FrameView<'a> {
    Intent {
        intent: &'a lightflow_core::LightingIntent,
    },
    Full(&'a FrameOutput),
}

fn main() -> Result<()> {
    let Some(args) = Args::parse(std::env::args().skip(1))? else {
        println!("{}", USAGE);
        return Ok(());
    };

    let _guard = logging_setup::init(&args.log_config())?;

    let scenario = Scenario::load(&args.scenario)?;
    let config = args
        .config
        .as_deref()
        .map(EngineConfig::load)
        .transpose()
        .context("Failed to load engine configuration")?;
    let mut engine = scenario.build_engine(config)?;

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let summary = scenario.run(&mut engine, |frame, output| {
        let output = if args.events {
            FrameView::Full(output)
        } else {
            FrameView::Intent {
                intent: &output.intent,
            }
        };
        serde_json::to_writer(&mut out, &FrameLine { frame, output })?;
        out.write_all(b"\n")?;
        Ok(())
    })?;
    out.flush()?;

    tracing::info!(
        "{} frames, {} events, {:.1} s of engine time",
        summary.frames,
        summary.events,
        summary.clock_ms / 1000.0
    );
    Ok(())
}
