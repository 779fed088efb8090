//! Frame stream replay.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Args;
use serde::Serialize;
use vigil_engine::{Frame, FrameResult, Orchestrator};

use super::{open_store, print_verbose};
use crate::Cli;

/// Run a recorded frame stream through the engine.
///
/// Input is JSON lines, one frame per line:
/// `{"identity": [..] | null, "expression": [..] | null}`.
/// Output is one JSON line per frame with the stabilized labels.
#[derive(Args)]
pub struct ReplayCommand {
    /// Frames file, or - for stdin
    #[arg(short = 'f', long)]
    file: PathBuf,
    /// Only print frames where a stable label changed
    #[arg(long)]
    changes_only: bool,
}

#[derive(Serialize)]
struct ReplayLine {
    frame: usize,
    #[serde(flatten)]
    result: FrameResult,
}

impl ReplayCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let (cfg, store) = open_store(cli)?;
        let mut engine = Orchestrator::new(store, &cfg)?;

        let reader: Box<dyn BufRead> = if self.file.as_os_str() == "-" {
            Box::new(BufReader::new(io::stdin()))
        } else {
            let file = File::open(&self.file)
                .with_context(|| format!("opening {}", self.file.display()))?;
            Box::new(BufReader::new(file))
        };

        let stdout = io::stdout();
        let mut out = stdout.lock();
        let mut frames = 0usize;
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let frame: Frame = serde_json::from_str(&line)
                .with_context(|| format!("line {}: invalid frame", n + 1))?;
            let result = engine.process(&frame);
            frames += 1;

            let changed = result.identity.changed
                || result.expression.as_ref().is_some_and(|e| e.changed);
            if self.changes_only && !changed {
                continue;
            }
            serde_json::to_writer(&mut out, &ReplayLine { frame: n + 1, result })?;
            writeln!(out)?;
        }

        print_verbose(cli, &format!("replayed {frames} frame(s)"));
        Ok(())
    }
}
