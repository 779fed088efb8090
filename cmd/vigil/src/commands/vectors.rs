//! Reference vector maintenance commands.

use clap::{Args, Subcommand};
use vigil_featstore::{FeatureStore, ReferenceId, SubjectId};

use super::{open_store, print_success, print_warning};
use crate::Cli;

/// Manage reference vectors.
#[derive(Args)]
pub struct VectorsCommand {
    #[command(subcommand)]
    command: VectorsSubcommand,
}

#[derive(Subcommand)]
enum VectorsSubcommand {
    /// Remove every reference vector of a subject, keeping the subject
    Clear { subject: u64 },
    /// Remove specific reference vectors
    Delete {
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Remove reference vectors whose subject no longer exists
    PurgeOrphans,
}

impl VectorsCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let (_, store) = open_store(cli)?;

        match &self.command {
            VectorsSubcommand::Clear { subject } => {
                let removed = store.clear_reference_vectors(SubjectId(*subject))?;
                print_success(&format!(
                    "removed {removed} reference vector(s) from subject {subject}"
                ));
            }
            VectorsSubcommand::Delete { ids } => {
                let ids: Vec<ReferenceId> = ids.iter().copied().map(ReferenceId).collect();
                let removed = store.delete_reference_vectors(&ids)?;
                if removed < ids.len() {
                    print_warning(&format!(
                        "{} of {} id(s) did not exist",
                        ids.len() - removed,
                        ids.len()
                    ));
                }
                print_success(&format!("removed {removed} reference vector(s)"));
            }
            VectorsSubcommand::PurgeOrphans => {
                let removed = store.purge_orphans()?;
                print_success(&format!("purged {removed} orphan reference vector(s)"));
            }
        }
        Ok(())
    }
}
