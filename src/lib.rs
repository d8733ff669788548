pub mod alignment_job;
pub mod codon_mapping;
pub mod config;
pub mod crosswalk;
pub mod error;
pub mod feature_location;
pub mod hover;
pub mod pair_format;
pub mod pairwise;
pub mod position_map;
pub mod remote_alignment;
pub mod resolver;
pub mod substitution;
pub mod transcript;
pub mod view_registry;

pub use crosswalk_protocol::{
    AlignedSequence, Alignment, AlignmentAlgorithm, GenomeRange, HoverState, Strand,
};
pub use error::{CrosswalkError, ErrorCode};

pub fn version_cli_text() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
