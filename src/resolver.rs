//! Structure residue <-> genome coordinate resolution.
//!
//! Composes the transcript codon map with the structure/transcript
//! crosswalk. The structure sequence is always row `a` of the alignment and
//! the transcript protein row `b`.

use crate::codon_mapping::GenomeTranscriptMapping;
use crate::crosswalk::build_crosswalk;
use crate::error::CrosswalkError;
use crate::pairwise::{LocalAligner, run_local_alignment};
use crate::position_map::{PositionMap, identity_map};
use crosswalk_protocol::{Alignment, GAP_CHAR, GenomeRange, HoverState};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// What a hover event resolves to in the other view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HoverTarget {
    #[default]
    None,
    StructureResidue { residue: usize },
    GenomeRange(GenomeRange),
}

pub fn strip_trailing_stops(seq: &str) -> &str {
    seq.trim_end_matches('*')
}

fn strip_chr(name: &str) -> &str {
    match name.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("chr") => &name[3..],
        _ => name,
    }
}

/// `chr1` and `1` name the same reference.
fn same_reference(a: &str, b: &str) -> bool {
    a == b || strip_chr(a).eq_ignore_ascii_case(strip_chr(b))
}

/// Unaligned inputs must not carry the gap character, whichever backend
/// aligns them.
pub fn check_ungapped(transcript_seq: &str, structure_seq: &str) -> Result<(), CrosswalkError> {
    for (label, seq) in [("transcript", transcript_seq), ("structure", structure_seq)] {
        if seq.contains(GAP_CHAR) {
            return Err(CrosswalkError::invalid_input(format!(
                "The {label} sequence contains the gap character '{GAP_CHAR}'"
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureTranscriptLink {
    pub mapping: GenomeTranscriptMapping,
    pub structure_to_transcript: PositionMap,
    pub transcript_to_structure: PositionMap,
    /// `None` when the sequences matched and no alignment was computed.
    pub alignment: Option<Alignment>,
    identity: bool,
}

impl StructureTranscriptLink {
    /// Links a structure to a transcript, aligning the two protein sequences
    /// unless they are identical once trailing stops are removed.
    pub fn new(
        mapping: GenomeTranscriptMapping,
        transcript_seq: &str,
        structure_seq: &str,
        aligner: LocalAligner,
    ) -> Result<Self, CrosswalkError> {
        check_ungapped(transcript_seq, structure_seq)?;
        let transcript = strip_trailing_stops(transcript_seq);
        let structure = strip_trailing_stops(structure_seq);

        if transcript.eq_ignore_ascii_case(structure) {
            log::debug!(
                "structure and transcript sequences match ({} residues), using identity crosswalk",
                structure.chars().count()
            );
            let identity = identity_map(structure.chars().count());
            return Ok(Self {
                mapping,
                transcript_to_structure: identity.clone(),
                structure_to_transcript: identity,
                alignment: None,
                identity: true,
            });
        }

        let alignment = run_local_alignment(structure, transcript, aligner);
        Self::from_alignment(mapping, alignment)
    }

    /// Links through an alignment computed elsewhere, e.g. by the remote
    /// service. Row `a` must be the structure sequence.
    pub fn from_alignment(
        mapping: GenomeTranscriptMapping,
        alignment: Alignment,
    ) -> Result<Self, CrosswalkError> {
        let walk = build_crosswalk(&alignment)?;
        Ok(Self {
            mapping,
            structure_to_transcript: walk.a_to_b,
            transcript_to_structure: walk.b_to_a,
            alignment: Some(alignment),
            identity: false,
        })
    }

    pub fn is_identity(&self) -> bool {
        self.identity
    }

    pub fn structure_residue_to_genome_range(&self, structure_residue: usize) -> Option<GenomeRange> {
        let transcript_residue = self.structure_to_transcript.get(&structure_residue)?;
        self.mapping.codon_range(*transcript_residue)
    }

    pub fn genome_to_structure_residue(&self, genome_base: u64) -> Option<usize> {
        let transcript_residue = self.mapping.residue_for_base(genome_base)?;
        self.transcript_to_structure.get(&transcript_residue).copied()
    }

    /// Codon ranges of every mapped residue in `residues`, sorted and with
    /// touching ranges merged.
    pub fn structure_span_to_genome_ranges(&self, residues: Range<usize>) -> Vec<GenomeRange> {
        let mut ranges: Vec<GenomeRange> = residues
            .filter_map(|residue| self.structure_residue_to_genome_range(residue))
            .collect();
        ranges.sort_by_key(|r| r.start);

        let mut merged: Vec<GenomeRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
                _ => merged.push(range),
            }
        }
        merged
    }

    pub fn resolve_hover(&self, hover: &HoverState) -> HoverTarget {
        match hover {
            HoverState::None => HoverTarget::None,
            HoverState::GenomePosition { ref_name, coord } => {
                if !same_reference(ref_name, &self.mapping.ref_name) {
                    return HoverTarget::None;
                }
                self.genome_to_structure_residue(*coord)
                    .map(|residue| HoverTarget::StructureResidue { residue })
                    .unwrap_or_default()
            }
            HoverState::StructureResidue { residue, .. } => self
                .structure_residue_to_genome_range(*residue)
                .map(HoverTarget::GenomeRange)
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codon_mapping::build_genome_transcript_mapping;
    use crate::transcript::{SubFeature, TranscriptFeature};

    fn forward_mapping(residues: u64) -> GenomeTranscriptMapping {
        let feature =
            TranscriptFeature::new("chr7", 1, vec![SubFeature::cds(1000, 1000 + 3 * residues, 0)]);
        build_genome_transcript_mapping(&feature).unwrap()
    }

    #[test]
    fn trailing_stops_are_ignored_for_identity() {
        assert_eq!(strip_trailing_stops("MKA**"), "MKA");
        assert_eq!(strip_trailing_stops("M*KA"), "M*KA");
        let link =
            StructureTranscriptLink::new(forward_mapping(4), "MKAW*", "mkaw", LocalAligner::Global)
                .unwrap();
        assert!(link.is_identity());
        assert!(link.alignment.is_none());
        assert_eq!(link.structure_to_transcript, identity_map(4));
    }

    #[test]
    fn mismatched_sequences_resolve_through_alignment() {
        // Structure lacks the second residue of the transcript.
        let link = StructureTranscriptLink::new(
            forward_mapping(10),
            "MKAAYLSMFG",
            "MAAYLSMFG",
            LocalAligner::Global,
        )
        .unwrap();
        assert!(!link.is_identity());
        let range = link.structure_residue_to_genome_range(1).unwrap();
        assert_eq!((range.start, range.end), (1006, 1009));
        assert_eq!(range.ref_name, "chr7");
        assert_eq!(link.genome_to_structure_residue(1003), None);
        assert_eq!(link.genome_to_structure_residue(1007), Some(1));
        assert_eq!(link.structure_residue_to_genome_range(50), None);
    }

    #[test]
    fn gapped_sequences_are_rejected() {
        let err =
            StructureTranscriptLink::new(forward_mapping(3), "MK-", "MKA", LocalAligner::Global)
                .unwrap_err();
        assert!(err.message.contains("gap"));
        assert_eq!(err.code, crate::error::ErrorCode::InvalidInput);

        assert!(check_ungapped("MKA", "MKA").is_ok());
        let err = check_ungapped("MKA", "M-KA").unwrap_err();
        assert!(err.message.contains("structure"));
    }

    #[test]
    fn span_ranges_merge_adjacent_codons() {
        let link =
            StructureTranscriptLink::new(forward_mapping(6), "MKAAYL", "MKAAYL", LocalAligner::Global)
                .unwrap();
        let ranges = link.structure_span_to_genome_ranges(1..4);
        assert_eq!(ranges.len(), 1);
        assert_eq!((ranges[0].start, ranges[0].end), (1003, 1012));
        assert!(link.structure_span_to_genome_ranges(10..12).is_empty());
    }

    #[test]
    fn span_ranges_split_over_introns() {
        let feature = TranscriptFeature::new(
            "chr3",
            -1,
            vec![SubFeature::cds(100, 106, 0), SubFeature::cds(200, 206, 0)],
        );
        let mapping = build_genome_transcript_mapping(&feature).unwrap();
        let link =
            StructureTranscriptLink::new(mapping, "MKAW", "MKAW", LocalAligner::Global).unwrap();
        let ranges = link.structure_span_to_genome_ranges(0..4);
        assert_eq!(ranges.len(), 2);
        assert_eq!((ranges[0].start, ranges[0].end), (100, 106));
        assert_eq!((ranges[1].start, ranges[1].end), (200, 206));
    }

    #[test]
    fn hover_resolution_respects_reference_name() {
        let link =
            StructureTranscriptLink::new(forward_mapping(4), "MKAW", "MKAW", LocalAligner::Global)
                .unwrap();
        assert_eq!(
            link.resolve_hover(&HoverState::GenomePosition {
                ref_name: "7".to_string(),
                coord: 1004,
            }),
            HoverTarget::StructureResidue { residue: 1 }
        );
        assert_eq!(
            link.resolve_hover(&HoverState::GenomePosition {
                ref_name: "chr8".to_string(),
                coord: 1004,
            }),
            HoverTarget::None
        );
        match link.resolve_hover(&HoverState::StructureResidue {
            structure_id: None,
            residue: 3,
        }) {
            HoverTarget::GenomeRange(range) => assert_eq!((range.start, range.end), (1009, 1012)),
            other => panic!("unexpected hover target {other:?}"),
        }
        assert_eq!(link.resolve_hover(&HoverState::None), HoverTarget::None);
    }
}
