//! Machine-readable contracts shared between the crosswalk engine and the
//! structure viewer / genome browser hosts that consume it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Gap character used inside aligned sequences.
pub const GAP_CHAR: char = '-';
/// Consensus marker for a column whose two residues match.
pub const CONSENSUS_MATCH: char = '|';
/// Consensus marker for every other column.
pub const CONSENSUS_BLANK: char = ' ';

pub const FIRST_SEQUENCE_ID: &str = "a";
pub const SECOND_SEQUENCE_ID: &str = "b";

/// One row of a pairwise alignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedSequence {
    pub id: String,
    pub seq: String,
}

/// A pairwise alignment. Both rows always have the same length and
/// `consensus` carries one marker per column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alignment {
    pub consensus: String,
    pub alns: [AlignedSequence; 2],
}

impl Alignment {
    pub fn len(&self) -> usize {
        self.alns[0].seq.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.alns[0].seq.is_empty()
    }

    pub fn first(&self) -> &AlignedSequence {
        &self.alns[0]
    }

    pub fn second(&self) -> &AlignedSequence {
        &self.alns[1]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentAlgorithm {
    /// In-process global alignment.
    NeedlemanWunsch,
    /// In-process local alignment.
    SmithWaterman,
    /// EMBOSS matcher run by the remote service.
    Matcher,
    /// EMBOSS needle run by the remote service.
    Needle,
    /// EMBOSS water run by the remote service.
    Water,
}

impl AlignmentAlgorithm {
    pub const ALL: [AlignmentAlgorithm; 5] = [
        AlignmentAlgorithm::NeedlemanWunsch,
        AlignmentAlgorithm::SmithWaterman,
        AlignmentAlgorithm::Matcher,
        AlignmentAlgorithm::Needle,
        AlignmentAlgorithm::Water,
    ];

    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            AlignmentAlgorithm::Matcher | AlignmentAlgorithm::Needle | AlignmentAlgorithm::Water
        )
    }

    /// Remote local algorithms report only the aligned region.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            AlignmentAlgorithm::SmithWaterman
                | AlignmentAlgorithm::Matcher
                | AlignmentAlgorithm::Water
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            AlignmentAlgorithm::NeedlemanWunsch => "needleman_wunsch",
            AlignmentAlgorithm::SmithWaterman => "smith_waterman",
            AlignmentAlgorithm::Matcher => "matcher",
            AlignmentAlgorithm::Needle => "needle",
            AlignmentAlgorithm::Water => "water",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|a| a.name() == normalized)
    }
}

impl fmt::Display for AlignmentAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    /// Anything other than `-1` is treated as forward.
    pub fn from_i8(value: i8) -> Self {
        if value == -1 {
            Strand::Reverse
        } else {
            Strand::Forward
        }
    }

    pub fn as_i8(&self) -> i8 {
        match self {
            Strand::Forward => 1,
            Strand::Reverse => -1,
        }
    }

    pub fn is_reverse(&self) -> bool {
        matches!(self, Strand::Reverse)
    }
}

/// Region descriptor handed to the genome browser (0-based, half-open).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenomeRange {
    pub ref_name: String,
    pub start: u64,
    pub end: u64,
}

impl GenomeRange {
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// What the host session currently reports as hovered, validated once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum HoverState {
    #[default]
    None,
    GenomePosition { ref_name: String, coord: u64 },
    StructureResidue { structure_id: Option<String>, residue: usize },
}
