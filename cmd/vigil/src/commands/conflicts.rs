//! Conflict diagnosis between two subjects.

use clap::Args;
use vigil_featstore::{FeatureStore, SubjectId};

use super::{open_store, output_result};
use crate::Cli;

/// List reference vectors of two subjects that lie too close together.
///
/// Such vectors were usually enrolled against the wrong subject and make
/// the two subjects ambiguous at match time.
#[derive(Args)]
pub struct ConflictsCommand {
    /// First subject ID
    a: u64,
    /// Second subject ID
    b: u64,
    /// Report pairs closer than this distance
    #[arg(long, default_value_t = 0.1)]
    threshold: f32,
}

impl ConflictsCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let (_, store) = open_store(cli)?;
        let conflicts =
            store.find_conflicts(SubjectId(self.a), SubjectId(self.b), self.threshold)?;
        if conflicts.is_empty() && !cli.json {
            println!(
                "no reference vectors closer than {} between subjects {} and {}",
                self.threshold, self.a, self.b
            );
            return Ok(());
        }
        output_result(&conflicts, cli.json)
    }
}
