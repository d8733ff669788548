//! Transcript features as delivered by the genome browser.

use crate::error::CrosswalkError;
use crosswalk_protocol::Strand;
use serde::{Deserialize, Serialize};

pub const CDS_TYPE: &str = "CDS";

/// A child interval of a transcript (0-based, half-open).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubFeature {
    #[serde(rename = "type")]
    pub kind: String,
    pub start: u64,
    pub end: u64,
    #[serde(default)]
    pub phase: u8,
}

impl SubFeature {
    pub fn cds(start: u64, end: u64, phase: u8) -> Self {
        Self {
            kind: CDS_TYPE.to_string(),
            start,
            end,
            phase,
        }
    }

    pub fn is_cds(&self) -> bool {
        self.kind.eq_ignore_ascii_case(CDS_TYPE)
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptFeature {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default = "default_transcript_type")]
    pub kind: String,
    pub ref_name: String,
    pub start: u64,
    pub end: u64,
    pub strand: i8,
    #[serde(default)]
    pub subfeatures: Vec<SubFeature>,
}

fn default_transcript_type() -> String {
    "mRNA".to_string()
}

impl TranscriptFeature {
    pub fn new(ref_name: &str, strand: i8, subfeatures: Vec<SubFeature>) -> Self {
        let start = subfeatures.iter().map(|s| s.start).min().unwrap_or(0);
        let end = subfeatures.iter().map(|s| s.end).max().unwrap_or(0);
        Self {
            id: None,
            kind: default_transcript_type(),
            ref_name: ref_name.to_string(),
            start,
            end,
            strand,
            subfeatures,
        }
    }

    pub fn strand(&self) -> Strand {
        Strand::from_i8(self.strand)
    }

    /// CDS children sorted by transcription direction: ascending start on the
    /// forward strand, descending on the reverse strand.
    ///
    /// A childless feature is only accepted when it is a CDS itself.
    pub fn cds_in_transcription_order(&self) -> Result<Vec<SubFeature>, CrosswalkError> {
        let mut cds: Vec<SubFeature> = if self.subfeatures.is_empty() {
            if !self.kind.eq_ignore_ascii_case(CDS_TYPE) {
                return Err(CrosswalkError::invalid_input(format!(
                    "Feature '{}' of type '{}' has no subfeatures to map",
                    self.id.as_deref().unwrap_or("<unnamed>"),
                    self.kind
                )));
            }
            vec![SubFeature::cds(self.start, self.end, 0)]
        } else {
            self.subfeatures.iter().filter(|s| s.is_cds()).cloned().collect()
        };

        for segment in &cds {
            if segment.end < segment.start {
                return Err(CrosswalkError::invalid_input(format!(
                    "CDS {}..{} on '{}' ends before it starts",
                    segment.start, segment.end, self.ref_name
                )));
            }
            if segment.phase > 2 {
                return Err(CrosswalkError::invalid_input(format!(
                    "CDS {}..{} on '{}' has phase {}, expected 0, 1 or 2",
                    segment.start, segment.end, self.ref_name, segment.phase
                )));
            }
        }

        if self.strand().is_reverse() {
            cds.sort_by(|a, b| b.start.cmp(&a.start));
        } else {
            cds.sort_by(|a, b| a.start.cmp(&b.start));
        }
        Ok(cds)
    }
}
