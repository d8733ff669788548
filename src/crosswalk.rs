//! Position crosswalks derived from a pairwise alignment.
//!
//! `a` is the first alignment row and `b` the second. Residue indices count
//! non-gap characters only; a column with a gap on either side produces no
//! a/b entry. Mismatched columns still map.

use crate::error::CrosswalkError;
use crate::position_map::PositionMap;
use crosswalk_protocol::{Alignment, GAP_CHAR};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentCrosswalk {
    pub a_to_b: PositionMap,
    pub b_to_a: PositionMap,
    pub a_to_column: PositionMap,
    pub b_to_column: PositionMap,
}

impl AlignmentCrosswalk {
    pub fn column_to_a(&self) -> PositionMap {
        crate::position_map::invert_map(&self.a_to_column)
    }

    pub fn column_to_b(&self) -> PositionMap {
        crate::position_map::invert_map(&self.b_to_column)
    }
}

/// Residue index -> alignment column for one gapped row.
pub fn sequence_position_to_column(aligned: &str) -> PositionMap {
    aligned
        .chars()
        .enumerate()
        .filter(|(_, c)| *c != GAP_CHAR)
        .enumerate()
        .map(|(residue, (column, _))| (residue, column))
        .collect()
}

/// Builds all four maps in one pass over the alignment columns.
pub fn build_crosswalk(alignment: &Alignment) -> Result<AlignmentCrosswalk, CrosswalkError> {
    let a: Vec<char> = alignment.alns[0].seq.chars().collect();
    let b: Vec<char> = alignment.alns[1].seq.chars().collect();
    if a.len() != b.len() {
        return Err(CrosswalkError::invalid_input(format!(
            "Aligned rows '{}' and '{}' differ in length ({} vs {})",
            alignment.alns[0].id,
            alignment.alns[1].id,
            a.len(),
            b.len()
        )));
    }

    let mut walk = AlignmentCrosswalk::default();
    let (mut j, mut k) = (0usize, 0usize);
    for (column, (ca, cb)) in a.iter().zip(b.iter()).enumerate() {
        let a_residue = *ca != GAP_CHAR;
        let b_residue = *cb != GAP_CHAR;
        if a_residue && b_residue {
            walk.a_to_b.insert(j, k);
            walk.b_to_a.insert(k, j);
        }
        if a_residue {
            walk.a_to_column.insert(j, column);
            j += 1;
        }
        if b_residue {
            walk.b_to_column.insert(k, column);
            k += 1;
        }
    }
    Ok(walk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairwise::build_consensus;
    use crosswalk_protocol::AlignedSequence;

    fn alignment(a: &str, b: &str) -> Alignment {
        Alignment {
            consensus: build_consensus(a, b),
            alns: [
                AlignedSequence {
                    id: "a".to_string(),
                    seq: a.to_string(),
                },
                AlignedSequence {
                    id: "b".to_string(),
                    seq: b.to_string(),
                },
            ],
        }
    }

    #[test]
    fn structure_positions_skip_gap_columns() {
        let map = sequence_position_to_column("MK-AA");
        let expected: PositionMap = [(0, 0), (1, 1), (2, 3), (3, 4)].into_iter().collect();
        assert_eq!(map, expected);
    }

    #[test]
    fn crosswalk_maps_across_gaps_and_mismatches() {
        let walk = build_crosswalk(&alignment("MK-AW", "MKAAA")).unwrap();
        let a_to_b: PositionMap = [(0, 0), (1, 1), (2, 3), (3, 4)].into_iter().collect();
        assert_eq!(walk.a_to_b, a_to_b);
        assert_eq!(walk.b_to_a.get(&2), None);
        assert_eq!(walk.b_to_a.get(&4), Some(&3));
        assert_eq!(walk.b_to_column.len(), 5);
        assert_eq!(walk.a_to_column.get(&2), Some(&3));
    }

    #[test]
    fn columns_project_between_rows() {
        let walk = build_crosswalk(&alignment("--MKA", "QQMK-")).unwrap();
        let column_to_b = walk.column_to_b();
        let column = walk.a_to_column[&1];
        assert_eq!(column, 3);
        assert_eq!(column_to_b.get(&column), Some(&3));
        assert_eq!(walk.a_to_b.get(&2), None);
    }

    #[test]
    fn rejects_rows_of_different_length() {
        let mut broken = alignment("MKA", "MKA");
        broken.alns[1].seq = "MK".to_string();
        let err = build_crosswalk(&broken).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidInput);
    }
}
