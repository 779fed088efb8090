//! Subject management commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use vigil_featstore::{FeatureStore, ReferenceId, Subject, SubjectId};

use super::{open_store, output_result, print_success};
use crate::Cli;

/// Manage subjects.
#[derive(Args)]
pub struct SubjectCommand {
    #[command(subcommand)]
    command: SubjectSubcommand,
}

#[derive(Subcommand)]
enum SubjectSubcommand {
    /// Create a subject (anonymous without --name)
    Create {
        #[arg(long)]
        name: Option<String>,
    },
    /// List subjects with their reference counts
    List {
        /// Include inactive subjects
        #[arg(long)]
        all: bool,
    },
    /// Show a subject and its reference vectors
    Show { id: u64 },
    /// Set or clear (omit --name) the display name
    Rename {
        id: u64,
        #[arg(long)]
        name: Option<String>,
    },
    /// Exclude a subject from matching
    Deactivate { id: u64 },
    /// Include a subject in matching again
    Activate { id: u64 },
    /// Delete a subject and all of its reference vectors
    Delete { id: u64 },
    /// Move all reference vectors of one subject to another
    Merge {
        #[arg(long)]
        from: u64,
        #[arg(long)]
        to: u64,
        /// Delete the source subject afterwards
        #[arg(long)]
        delete_source: bool,
    },
}

#[derive(Serialize)]
struct ReferenceInfo {
    id: ReferenceId,
    dim: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<f32>,
    created_at: String,
}

#[derive(Serialize)]
struct SubjectDetail {
    subject: Subject,
    references: Vec<ReferenceInfo>,
}

impl SubjectCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let (_, store) = open_store(cli)?;

        match &self.command {
            SubjectSubcommand::Create { name } => {
                let subject = store.create_subject(name.as_deref())?;
                print_success(&format!("created subject {}", subject.display_name()));
                output_result(&subject, cli.json)
            }
            SubjectSubcommand::List { all } => {
                let subjects = store.list_subjects(*all)?;
                if cli.json {
                    return output_result(&subjects, true);
                }
                if subjects.is_empty() {
                    println!("no subjects");
                    return Ok(());
                }
                println!("{:>6}  {:<24} {:>6}  {:<8}", "ID", "NAME", "REFS", "STATUS");
                for s in &subjects {
                    println!(
                        "{:>6}  {:<24} {:>6}  {:<8}",
                        s.subject.id,
                        s.subject.display_name(),
                        s.references,
                        if s.subject.active { "active" } else { "inactive" }
                    );
                }
                Ok(())
            }
            SubjectSubcommand::Show { id } => {
                let id = SubjectId(*id);
                let subject = store
                    .subject(id)?
                    .ok_or_else(|| anyhow::anyhow!("subject {id} not found"))?;
                let references = store
                    .reference_vectors(id)?
                    .into_iter()
                    .map(|r| ReferenceInfo {
                        id: r.id,
                        dim: r.vector.dim(),
                        quality: r.quality,
                        created_at: r.created_at.to_rfc3339(),
                    })
                    .collect();
                output_result(
                    &SubjectDetail {
                        subject,
                        references,
                    },
                    cli.json,
                )
            }
            SubjectSubcommand::Rename { id, name } => {
                let subject = store.rename_subject(SubjectId(*id), name.as_deref())?;
                print_success(&format!("subject {id} is now {}", subject.display_name()));
                Ok(())
            }
            SubjectSubcommand::Deactivate { id } => {
                store.set_active(SubjectId(*id), false)?;
                print_success(&format!("deactivated subject {id}"));
                Ok(())
            }
            SubjectSubcommand::Activate { id } => {
                store.set_active(SubjectId(*id), true)?;
                print_success(&format!("activated subject {id}"));
                Ok(())
            }
            SubjectSubcommand::Delete { id } => {
                let removed = store.delete_subject(SubjectId(*id))?;
                print_success(&format!(
                    "deleted subject {id} and {removed} reference vector(s)"
                ));
                Ok(())
            }
            SubjectSubcommand::Merge {
                from,
                to,
                delete_source,
            } => {
                let report =
                    store.merge_subjects(SubjectId(*from), SubjectId(*to), *delete_source)?;
                print_success(&format!(
                    "moved {} reference vector(s) from {from} to {to}",
                    report.moved
                ));
                output_result(&report, cli.json)
            }
        }
    }
}
