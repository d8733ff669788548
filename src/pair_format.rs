//! Parser for the two-block "pair" alignment text returned by the EMBOSS
//! services (`needle`, `water`, `matcher`).
//!
//! ```text
//! # Program: needle
//! #=======================================
//!
//! a                  1 MKAAYLSMFG     10
//!                      ||| ||||||
//! b                  1 MKA-YLSMFG      9
//! ```
//!
//! Header lines start with `#`, markup lines start with whitespace and are
//! ignored; the consensus is rebuilt from the rows.

use crate::error::CrosswalkError;
use crate::pairwise::build_consensus;
use crosswalk_protocol::{AlignedSequence, Alignment, GAP_CHAR};
use regex::Regex;
use std::sync::OnceLock;

fn row_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\S+)\s+(\d+)\s+([A-Za-z*.\-]+)\s+(\d+)\s*$").expect("valid row pattern")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPair {
    pub ids: [String; 2],
    pub rows: [String; 2],
    /// 1-based number of the first residue reported for each row.
    pub starts: [usize; 2],
}

pub fn parse_pair_alignment(text: &str) -> Result<ParsedPair, CrosswalkError> {
    let mut ids: Vec<String> = Vec::with_capacity(2);
    let mut rows: Vec<String> = Vec::with_capacity(2);
    let mut starts: Vec<usize> = Vec::with_capacity(2);

    for line in text.lines() {
        if line.starts_with('#') || line.trim().is_empty() || line.starts_with(char::is_whitespace)
        {
            continue;
        }
        let Some(caps) = row_pattern().captures(line) else {
            continue;
        };
        let name = &caps[1];
        let start = caps[2].parse::<usize>().map_err(|e| {
            CrosswalkError::malformed_result(format!("Bad residue number in '{line}': {e}"))
        })?;
        let chunk: String = caps[3]
            .chars()
            .map(|c| if c == '.' { GAP_CHAR } else { c.to_ascii_uppercase() })
            .collect();

        match ids.iter().position(|id| id == name) {
            Some(idx) => rows[idx].push_str(&chunk),
            None => {
                if ids.len() == 2 {
                    return Err(CrosswalkError::malformed_result(format!(
                        "Pair alignment names a third sequence '{name}'"
                    )));
                }
                ids.push(name.to_string());
                rows.push(chunk);
                starts.push(start);
            }
        }
    }

    if ids.len() != 2 {
        return Err(CrosswalkError::malformed_result(format!(
            "Expected two aligned sequences, found {}",
            ids.len()
        )));
    }
    if rows[0].len() != rows[1].len() {
        return Err(CrosswalkError::malformed_result(format!(
            "Aligned rows '{}' and '{}' differ in length ({} vs {})",
            ids[0],
            ids[1],
            rows[0].len(),
            rows[1].len()
        )));
    }

    Ok(ParsedPair {
        ids: [ids[0].clone(), ids[1].clone()],
        rows: [rows[0].clone(), rows[1].clone()],
        starts: [starts[0], starts[1]],
    })
}

fn ungapped(row: &str) -> String {
    row.chars().filter(|c| *c != GAP_CHAR).collect()
}

fn locate_region(full: &str, row: &str, start: usize, label: &str) -> Result<usize, CrosswalkError> {
    let core = ungapped(row);
    let reported = start.saturating_sub(1);
    let fits = full
        .get(reported..reported + core.len())
        .is_some_and(|s| s.eq_ignore_ascii_case(&core));
    if fits {
        return Ok(reported);
    }
    full.to_ascii_uppercase().find(&core).ok_or_else(|| {
        CrosswalkError::malformed_result(format!(
            "Aligned region of '{label}' does not occur in the submitted sequence"
        ))
    })
}

fn gap_run(len: usize) -> String {
    std::iter::repeat_n(GAP_CHAR, len).collect()
}

impl ParsedPair {
    /// Pads a region-only alignment back to the full submitted sequences,
    /// producing the same shape as the in-process local aligner.
    pub fn into_full_alignment(self, seq1: &str, seq2: &str) -> Result<Alignment, CrosswalkError> {
        if !seq1.is_ascii() || !seq2.is_ascii() {
            return Err(CrosswalkError::invalid_input(
                "Submitted sequences must be plain ASCII residue letters",
            ));
        }
        let o1 = locate_region(seq1, &self.rows[0], self.starts[0], &self.ids[0])?;
        let o2 = locate_region(seq2, &self.rows[1], self.starts[1], &self.ids[1])?;
        let e1 = o1 + ungapped(&self.rows[0]).len();
        let e2 = o2 + ungapped(&self.rows[1]).len();

        let mut row1 = seq1[..o1].to_string();
        row1.push_str(&gap_run(o2));
        row1.push_str(&self.rows[0]);
        row1.push_str(&seq1[e1..]);
        row1.push_str(&gap_run(seq2.len() - e2));

        let mut row2 = gap_run(o1);
        row2.push_str(&seq2[..o2]);
        row2.push_str(&self.rows[1]);
        row2.push_str(&gap_run(seq1.len() - e1));
        row2.push_str(&seq2[e2..]);

        let [id1, id2] = self.ids;
        Ok(Alignment {
            consensus: build_consensus(&row1, &row2),
            alns: [
                AlignedSequence { id: id1, seq: row1 },
                AlignedSequence { id: id2, seq: row2 },
            ],
        })
    }
}
