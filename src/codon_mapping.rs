//! Genome base <-> protein residue mapping for one transcript.

use crate::error::CrosswalkError;
use crate::position_map::PositionMap;
use crate::transcript::TranscriptFeature;
use crosswalk_protocol::{GenomeRange, Strand};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenomeTranscriptMapping {
    /// Genome base -> protein residue index.
    pub g2p: PositionMap<u64, usize>,
    /// Protein residue index -> first base of its codon in transcription order.
    pub p2g: PositionMap<usize, u64>,
    pub ref_name: String,
    pub strand: Strand,
}

impl GenomeTranscriptMapping {
    pub fn residue_for_base(&self, base: u64) -> Option<usize> {
        self.g2p.get(&base).copied()
    }

    pub fn representative_base(&self, residue: usize) -> Option<u64> {
        self.p2g.get(&residue).copied()
    }

    /// Three-base window anchored on the representative base, extending in
    /// transcription direction. `None` when a reverse-strand codon would run
    /// past coordinate 0.
    pub fn codon_range(&self, residue: usize) -> Option<GenomeRange> {
        let base = self.representative_base(residue)?;
        let (start, end) = match self.strand {
            Strand::Forward => (base, base + 3),
            Strand::Reverse => (base.checked_sub(2)?, base + 1),
        };
        Some(GenomeRange {
            ref_name: self.ref_name.clone(),
            start,
            end,
        })
    }

    pub fn residue_count(&self) -> usize {
        self.p2g.keys().next_back().map(|last| last + 1).unwrap_or(0)
    }
}

/// Walks every CDS base in transcription order. The counter starts at
/// `(3 - phase) % 3` of the first CDS, and each residue keeps the first base
/// seen for it.
pub fn build_genome_transcript_mapping(
    feature: &TranscriptFeature,
) -> Result<GenomeTranscriptMapping, CrosswalkError> {
    let cds = feature.cds_in_transcription_order()?;
    let strand = feature.strand();

    let mut g2p = PositionMap::new();
    let mut p2g = PositionMap::new();
    let mut counter = cds
        .first()
        .map(|first| (3 - u64::from(first.phase)) % 3)
        .unwrap_or(0);

    let mut visit = |base: u64| {
        let residue = (counter / 3) as usize;
        g2p.insert(base, residue);
        p2g.entry(residue).or_insert(base);
        counter += 1;
    };
    for segment in &cds {
        match strand {
            Strand::Forward => (segment.start..segment.end).for_each(&mut visit),
            Strand::Reverse => (segment.start..segment.end).rev().for_each(&mut visit),
        }
    }

    log::debug!(
        "mapped {} CDS segment(s) on {} ({:?}) to {} residue(s)",
        cds.len(),
        feature.ref_name,
        strand,
        p2g.len()
    );
    Ok(GenomeTranscriptMapping {
        g2p,
        p2g,
        ref_name: feature.ref_name.clone(),
        strand,
    })
}
