//! GenBank CDS locations (gb-io) converted into transcript features.

use crate::error::CrosswalkError;
use crate::transcript::{CDS_TYPE, SubFeature, TranscriptFeature};
use gb_io::seq::{Feature, Location};

/// One local span of a CDS location and whether it sits under an odd number
/// of `complement(..)` wrappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CdsPart {
    start: u64,
    end: u64,
    reverse: bool,
}

fn collect_cds_parts(location: &Location, reverse: bool, parts: &mut Vec<CdsPart>) {
    match location {
        Location::Range((from, _), (to, _)) | Location::Between(from, to) => {
            let (Ok(a), Ok(b)) = (u64::try_from(*from), u64::try_from(*to)) else {
                return;
            };
            parts.push(CdsPart {
                start: a.min(b),
                end: a.max(b),
                reverse,
            });
        }
        Location::Complement(inner) => collect_cds_parts(inner, !reverse, parts),
        Location::Join(inner)
        | Location::Order(inner)
        | Location::Bond(inner)
        | Location::OneOf(inner) => {
            for part in inner {
                collect_cds_parts(part, reverse, parts);
            }
        }
        Location::External(_, _) | Location::Gap(_) => {}
    }
}

/// Strand of a CDS by majority vote over its local parts; ties read as forward.
fn parts_are_reverse(parts: &[CdsPart]) -> bool {
    parts.iter().filter(|p| p.reverse).count() * 2 > parts.len()
}

pub fn location_is_reverse(location: &Location) -> bool {
    let mut parts = Vec::new();
    collect_cds_parts(location, false, &mut parts);
    parts_are_reverse(&parts)
}

impl TranscriptFeature {
    /// Builds a transcript from a GenBank `CDS` feature. `/codon_start`
    /// (1-based) becomes the phase of the first segment in transcription order.
    pub fn from_genbank_cds(feature: &Feature, ref_name: &str) -> Result<Self, CrosswalkError> {
        let kind = feature.kind.to_string();
        if !kind.eq_ignore_ascii_case(CDS_TYPE) {
            return Err(CrosswalkError::invalid_input(format!(
                "GenBank feature of kind '{kind}' is not a CDS"
            )));
        }

        let mut parts = Vec::new();
        collect_cds_parts(&feature.location, false, &mut parts);
        if parts.is_empty() {
            return Err(CrosswalkError::invalid_input(format!(
                "CDS on '{ref_name}' has no local ranges"
            )));
        }

        let reverse = parts_are_reverse(&parts);
        let phase = match feature.qualifier_values("codon_start".into()).next() {
            Some(raw) => {
                let codon_start = raw.trim().parse::<u8>().map_err(|e| {
                    CrosswalkError::invalid_input(format!("Invalid /codon_start '{raw}': {e}"))
                })?;
                if !(1..=3).contains(&codon_start) {
                    return Err(CrosswalkError::invalid_input(format!(
                        "/codon_start must be 1, 2 or 3, got {codon_start}"
                    )));
                }
                codon_start - 1
            }
            None => 0,
        };

        if reverse {
            parts.sort_unstable_by(|a, b| b.start.cmp(&a.start));
        } else {
            parts.sort_unstable_by(|a, b| a.start.cmp(&b.start));
        }
        let subfeatures = parts
            .iter()
            .enumerate()
            .map(|(i, part)| SubFeature::cds(part.start, part.end, if i == 0 { phase } else { 0 }))
            .collect();

        let mut transcript = TranscriptFeature::new(ref_name, if reverse { -1 } else { 1 }, subfeatures);
        transcript.id = feature
            .qualifier_values("protein_id".into())
            .next()
            .or_else(|| feature.qualifier_values("gene".into()).next())
            .map(str::to_string);
        Ok(transcript)
    }
}
