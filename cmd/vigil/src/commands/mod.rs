//! CLI commands module.

mod config;
mod conflicts;
mod enroll;
mod identify;
mod replay;
mod subject;
mod util;
mod vectors;

pub use config::ConfigCommand;
pub use conflicts::ConflictsCommand;
pub use enroll::EnrollCommand;
pub use identify::IdentifyCommand;
pub use replay::ReplayCommand;
pub use subject::SubjectCommand;
pub use vectors::VectorsCommand;

pub(crate) use util::*;
