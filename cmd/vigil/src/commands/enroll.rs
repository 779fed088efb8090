//! Enrollment command.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use vigil_featstore::{FeatureStore, FeatureVector, ReferenceId, SubjectId};

use super::{load_vectors, open_store, output_result, print_success};
use crate::Cli;

/// Enroll reference vectors for a subject.
#[derive(Args)]
pub struct EnrollCommand {
    /// Subject ID
    subject: u64,
    /// JSON file with one vector or an array of vectors
    #[arg(short = 'f', long)]
    file: PathBuf,
    /// Quality score in [0, 1] stored with every vector
    #[arg(long)]
    quality: Option<f32>,
}

#[derive(Serialize)]
struct EnrollOutput {
    subject: SubjectId,
    references: Vec<ReferenceId>,
}

impl EnrollCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let (_, store) = open_store(cli)?;
        let subject = SubjectId(self.subject);
        let vectors = load_vectors(&self.file)?;
        if vectors.is_empty() {
            anyhow::bail!("{} contains no vectors", self.file.display());
        }

        let mut references = Vec::with_capacity(vectors.len());
        for v in vectors {
            references.push(store.add_reference_vector(
                subject,
                FeatureVector::from(v),
                self.quality,
            )?);
        }

        print_success(&format!(
            "enrolled {} vector(s) for subject {subject}",
            references.len()
        ));
        output_result(
            &EnrollOutput {
                subject,
                references,
            },
            cli.json,
        )
    }
}
