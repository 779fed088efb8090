//! Single-vector identification.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use vigil_featstore::{FeatureStore, SubjectId};
use vigil_matcher::{MatchCandidate, MatchResolver, Ranked};

use super::{load_vectors, open_store, output_result};
use crate::Cli;

/// Resolve a single vector against the store.
///
/// Prints the ranked candidates and the resolver's verdict, without any
/// temporal stabilization.
#[derive(Args)]
pub struct IdentifyCommand {
    /// JSON file with one vector
    #[arg(short = 'f', long)]
    file: PathBuf,
    /// Number of ranked candidates to print
    #[arg(long, default_value_t = 5)]
    top: usize,
}

#[derive(Serialize)]
struct IdentifyOutput {
    candidates: Vec<Ranked<SubjectId>>,
    #[serde(rename = "match")]
    matched: Option<MatchCandidate<SubjectId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl IdentifyCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let (cfg, store) = open_store(cli)?;
        let mut vectors = load_vectors(&self.file)?;
        if vectors.len() != 1 {
            anyhow::bail!(
                "{} must contain exactly one vector, found {}",
                self.file.display(),
                vectors.len()
            );
        }
        let query = vectors.remove(0);

        let resolver = MatchResolver::new(store.clone(), cfg.resolver)?;
        let mut candidates = resolver.rank(&query)?;
        candidates.truncate(self.top);
        let matched = resolver.resolve(&query)?.into_candidate();
        let name = match &matched {
            Some(m) => store.subject(m.label)?.map(|s| s.display_name()),
            None => None,
        };

        output_result(
            &IdentifyOutput {
                candidates,
                matched,
                name,
            },
            cli.json,
        )
    }
}
