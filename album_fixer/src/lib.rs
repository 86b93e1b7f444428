//! album_fixer - repair exported photo archives
//!
//! Pairs every media file with its JSON sidecar, writes the sidecar's
//! capture date, location, title and description back into the file with
//! exiftool, and records the outcome per file in a CSV ledger. Failed files
//! are classified and remediated, inline or in a later `fix-errors` pass.

pub mod analysis;
pub mod applier;
pub mod classifier;
pub mod config;
pub mod ledger;
pub mod media;
pub mod metadata_builder;
pub mod offset_time;
pub mod orchestrator;
pub mod pairing;
pub mod probe;
pub mod remediation;
pub mod sidecar;

#[cfg(test)]
mod test_support;

pub use analysis::{analyze, AnalysisReport};
pub use applier::{MetadataApplier, MetadataOutcome, WriteMode};
pub use classifier::{classify, ErrorClassification, ErrorKind};
pub use config::FixerConfig;
pub use ledger::{Ledger, LedgerRow};
pub use media::{MediaFile, MediaKind};
pub use metadata_builder::{FieldAssignment, MetadataBuilder};
pub use offset_time::OffsetTimeTable;
pub use orchestrator::{Orchestrator, RunSummary};
pub use pairing::{magic_path, MatchKind, PairResolver, Pairing};
pub use probe::MediaProbe;
pub use remediation::{create_remediator, remediate, RemediationContext, RemediationResult, Remediator};
pub use sidecar::{GeoPoint, SidecarRecord};
