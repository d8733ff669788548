//! Affine-gap pairwise protein alignment (Needleman-Wunsch and Smith-Waterman).
//!
//! Both aligners use three score layers (Gotoh): `M` ends in an aligned pair,
//! `Ix` ends in a gap in the second sequence and `Iy` ends in a gap in the
//! first sequence. Opening a gap costs `open`, each further column `extend`.
//! Local results are padded back to full length so that removing the gap
//! characters from either row always reproduces the input sequence.

use crate::substitution;
use crosswalk_protocol::{
    AlignedSequence, Alignment, AlignmentAlgorithm, CONSENSUS_BLANK, CONSENSUS_MATCH,
    FIRST_SEQUENCE_ID, GAP_CHAR, SECOND_SEQUENCE_ID,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_GAP_OPEN: f64 = -10.0;
pub const DEFAULT_GAP_EXTEND: f64 = -0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapPenalties {
    pub open: f64,
    pub extend: f64,
}

impl Default for GapPenalties {
    fn default() -> Self {
        Self {
            open: DEFAULT_GAP_OPEN,
            extend: DEFAULT_GAP_EXTEND,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalAligner {
    Global,
    Local,
}

impl LocalAligner {
    pub fn for_algorithm(algorithm: AlignmentAlgorithm) -> Option<Self> {
        match algorithm {
            AlignmentAlgorithm::NeedlemanWunsch => Some(LocalAligner::Global),
            AlignmentAlgorithm::SmithWaterman => Some(LocalAligner::Local),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentResult {
    pub aligned_seq1: String,
    pub aligned_seq2: String,
    pub score: f64,
    /// Half-open residue range of the first input covered by the core alignment.
    pub region1: (usize, usize),
    /// Half-open residue range of the second input covered by the core alignment.
    pub region2: (usize, usize),
}

impl AlignmentResult {
    pub fn into_alignment(self) -> Alignment {
        let consensus = build_consensus(&self.aligned_seq1, &self.aligned_seq2);
        Alignment {
            consensus,
            alns: [
                AlignedSequence {
                    id: FIRST_SEQUENCE_ID.to_string(),
                    seq: self.aligned_seq1,
                },
                AlignedSequence {
                    id: SECOND_SEQUENCE_ID.to_string(),
                    seq: self.aligned_seq2,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Match,
    GapInSecond,
    GapInFirst,
}

struct DpTables {
    cols: usize,
    m: Vec<f64>,
    ix: Vec<f64>,
    iy: Vec<f64>,
    tb_m: Vec<Layer>,
    tb_ix: Vec<Layer>,
    tb_iy: Vec<Layer>,
}

impl DpTables {
    fn idx(&self, i: usize, j: usize) -> usize {
        i * self.cols + j
    }
}

/// Picks the best of the three layers, preferring `M`, then `Ix`, then `Iy` on ties.
fn best_layer(m: f64, ix: f64, iy: f64) -> (Layer, f64) {
    if m >= ix && m >= iy {
        (Layer::Match, m)
    } else if ix >= iy {
        (Layer::GapInSecond, ix)
    } else {
        (Layer::GapInFirst, iy)
    }
}

fn fill_tables(s1: &[char], s2: &[char], gaps: GapPenalties, local: bool) -> DpTables {
    let rows = s1.len() + 1;
    let cols = s2.len() + 1;
    let inf = f64::NEG_INFINITY;
    let mut t = DpTables {
        cols,
        m: vec![inf; rows * cols],
        ix: vec![inf; rows * cols],
        iy: vec![inf; rows * cols],
        tb_m: vec![Layer::Match; rows * cols],
        tb_ix: vec![Layer::Match; rows * cols],
        tb_iy: vec![Layer::Match; rows * cols],
    };

    let origin = t.idx(0, 0);
    t.m[origin] = 0.0;
    if local {
        for i in 1..rows {
            let k = t.idx(i, 0);
            t.m[k] = 0.0;
        }
        for j in 1..cols {
            let k = t.idx(0, j);
            t.m[k] = 0.0;
        }
    } else {
        for i in 1..rows {
            let k = t.idx(i, 0);
            t.ix[k] = gaps.open + (i - 1) as f64 * gaps.extend;
            if i > 1 {
                t.tb_ix[k] = Layer::GapInSecond;
            }
        }
        for j in 1..cols {
            let k = t.idx(0, j);
            t.iy[k] = gaps.open + (j - 1) as f64 * gaps.extend;
            if j > 1 {
                t.tb_iy[k] = Layer::GapInFirst;
            }
        }
    }

    for i in 1..rows {
        for j in 1..cols {
            let here = t.idx(i, j);
            let diag = t.idx(i - 1, j - 1);
            let up = t.idx(i - 1, j);
            let left = t.idx(i, j - 1);

            let (from, best) = best_layer(t.m[diag], t.ix[diag], t.iy[diag]);
            let mut value = best + substitution::score(s1[i - 1], s2[j - 1]) as f64;
            if local && value < 0.0 {
                value = 0.0;
            }
            t.m[here] = value;
            t.tb_m[here] = from;

            let open = t.m[up] + gaps.open;
            let extend = t.ix[up] + gaps.extend;
            if open >= extend {
                t.ix[here] = open;
                t.tb_ix[here] = Layer::Match;
            } else {
                t.ix[here] = extend;
                t.tb_ix[here] = Layer::GapInSecond;
            }

            let open = t.m[left] + gaps.open;
            let extend = t.iy[left] + gaps.extend;
            if open >= extend {
                t.iy[here] = open;
                t.tb_iy[here] = Layer::Match;
            } else {
                t.iy[here] = extend;
                t.tb_iy[here] = Layer::GapInFirst;
            }
        }
    }
    t
}

fn gap_run(len: usize) -> String {
    std::iter::repeat_n(GAP_CHAR, len).collect()
}

fn fully_gapped(s1: &[char], s2: &[char], score: f64) -> AlignmentResult {
    let mut aligned_seq1: String = s1.iter().collect();
    aligned_seq1.push_str(&gap_run(s2.len()));
    let mut aligned_seq2 = gap_run(s1.len());
    aligned_seq2.extend(s2.iter());
    AlignmentResult {
        aligned_seq1,
        aligned_seq2,
        score,
        region1: (0, s1.len()),
        region2: (0, s2.len()),
    }
}

fn pure_gap_cost(len: usize, gaps: GapPenalties) -> f64 {
    if len == 0 {
        0.0
    } else {
        gaps.open + (len - 1) as f64 * gaps.extend
    }
}

/// Global alignment of the two sequences, end to end.
pub fn align_global(seq1: &str, seq2: &str, gaps: GapPenalties) -> AlignmentResult {
    let s1: Vec<char> = seq1.chars().collect();
    let s2: Vec<char> = seq2.chars().collect();
    if s1.is_empty() || s2.is_empty() {
        let cost = pure_gap_cost(s1.len().max(s2.len()), gaps);
        return fully_gapped(&s1, &s2, cost);
    }

    let t = fill_tables(&s1, &s2, gaps, false);
    let (mut i, mut j) = (s1.len(), s2.len());
    let end = t.idx(i, j);
    let (mut layer, score) = best_layer(t.m[end], t.ix[end], t.iy[end]);

    let mut out1 = Vec::with_capacity(i + j);
    let mut out2 = Vec::with_capacity(i + j);
    while i > 0 || j > 0 {
        let here = t.idx(i, j);
        match layer {
            Layer::Match => {
                if i == 0 || j == 0 {
                    break;
                }
                out1.push(s1[i - 1]);
                out2.push(s2[j - 1]);
                layer = t.tb_m[here];
                i -= 1;
                j -= 1;
            }
            Layer::GapInSecond => {
                if i == 0 {
                    break;
                }
                out1.push(s1[i - 1]);
                out2.push(GAP_CHAR);
                layer = t.tb_ix[here];
                i -= 1;
            }
            Layer::GapInFirst => {
                if j == 0 {
                    break;
                }
                out1.push(GAP_CHAR);
                out2.push(s2[j - 1]);
                layer = t.tb_iy[here];
                j -= 1;
            }
        }
    }

    AlignmentResult {
        aligned_seq1: out1.into_iter().rev().collect(),
        aligned_seq2: out2.into_iter().rev().collect(),
        score,
        region1: (0, s1.len()),
        region2: (0, s2.len()),
    }
}

/// Local alignment; residues outside the best-scoring region are kept in the
/// output opposite gap characters. Flanking residues that score below zero
/// against themselves (`X`, letters outside the table such as `U`) fall
/// outside the region, so identical inputs only come back as the identity
/// alignment when their ends are standard residues.
pub fn align_local(seq1: &str, seq2: &str, gaps: GapPenalties) -> AlignmentResult {
    let s1: Vec<char> = seq1.chars().collect();
    let s2: Vec<char> = seq2.chars().collect();
    if s1.is_empty() || s2.is_empty() {
        let mut result = fully_gapped(&s1, &s2, 0.0);
        result.region1 = (0, 0);
        result.region2 = (0, 0);
        return result;
    }

    let t = fill_tables(&s1, &s2, gaps, true);
    let (mut best_score, mut best_i, mut best_j) = (0.0, 0, 0);
    for i in 1..=s1.len() {
        for j in 1..=s2.len() {
            let value = t.m[t.idx(i, j)];
            if value > best_score {
                best_score = value;
                best_i = i;
                best_j = j;
            }
        }
    }

    let (mut i, mut j) = (best_i, best_j);
    let mut layer = Layer::Match;
    let mut core1 = Vec::new();
    let mut core2 = Vec::new();
    while i > 0 && j > 0 {
        let here = t.idx(i, j);
        match layer {
            Layer::Match => {
                if t.m[here] <= 0.0 {
                    break;
                }
                core1.push(s1[i - 1]);
                core2.push(s2[j - 1]);
                layer = t.tb_m[here];
                i -= 1;
                j -= 1;
            }
            Layer::GapInSecond => {
                core1.push(s1[i - 1]);
                core2.push(GAP_CHAR);
                layer = t.tb_ix[here];
                i -= 1;
            }
            Layer::GapInFirst => {
                core1.push(GAP_CHAR);
                core2.push(s2[j - 1]);
                layer = t.tb_iy[here];
                j -= 1;
            }
        }
    }
    let (start_i, start_j) = (i, j);

    let mut aligned_seq1: String = s1[..start_i].iter().collect();
    aligned_seq1.push_str(&gap_run(start_j));
    aligned_seq1.extend(core1.iter().rev());
    aligned_seq1.extend(s1[best_i..].iter());
    aligned_seq1.push_str(&gap_run(s2.len() - best_j));

    let mut aligned_seq2 = gap_run(start_i);
    aligned_seq2.extend(s2[..start_j].iter());
    aligned_seq2.extend(core2.iter().rev());
    aligned_seq2.push_str(&gap_run(s1.len() - best_i));
    aligned_seq2.extend(s2[best_j..].iter());

    AlignmentResult {
        aligned_seq1,
        aligned_seq2,
        score: best_score,
        region1: (start_i, best_i),
        region2: (start_j, best_j),
    }
}

/// `'|'` where both columns hold the same residue (ignoring case), blank otherwise.
pub fn build_consensus(aligned_seq1: &str, aligned_seq2: &str) -> String {
    aligned_seq1
        .chars()
        .zip(aligned_seq2.chars())
        .map(|(a, b)| {
            if a != GAP_CHAR && b != GAP_CHAR && a.eq_ignore_ascii_case(&b) {
                CONSENSUS_MATCH
            } else {
                CONSENSUS_BLANK
            }
        })
        .collect()
}

pub fn run_local_alignment(seq1: &str, seq2: &str, aligner: LocalAligner) -> Alignment {
    run_local_alignment_with(seq1, seq2, aligner, GapPenalties::default())
}

pub fn run_local_alignment_with(
    seq1: &str,
    seq2: &str,
    aligner: LocalAligner,
    gaps: GapPenalties,
) -> Alignment {
    log::debug!(
        "aligning {} x {} residues ({aligner:?}, open {}, extend {})",
        seq1.len(),
        seq2.len(),
        gaps.open,
        gaps.extend
    );
    let result = match aligner {
        LocalAligner::Global => align_global(seq1, seq2, gaps),
        LocalAligner::Local => align_local(seq1, seq2, gaps),
    };
    result.into_alignment()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentStats {
    pub length: usize,
    pub identities: usize,
    pub gap_columns: usize,
    pub percent_identity: f64,
}

pub fn alignment_stats(alignment: &Alignment) -> AlignmentStats {
    let length = alignment.len();
    let identities = alignment
        .consensus
        .chars()
        .filter(|c| *c == CONSENSUS_MATCH)
        .count();
    let gap_columns = alignment
        .first()
        .seq
        .chars()
        .zip(alignment.second().seq.chars())
        .filter(|(a, b)| *a == GAP_CHAR || *b == GAP_CHAR)
        .count();
    let percent_identity = if length == 0 {
        0.0
    } else {
        identities as f64 * 100.0 / length as f64
    };
    AlignmentStats {
        length,
        identities,
        gap_columns,
        percent_identity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ungapped(s: &str) -> String {
        s.chars().filter(|c| *c != GAP_CHAR).collect()
    }

    #[test]
    fn identical_sequences_align_without_gaps() {
        let result = align_global("ACGT", "ACGT", GapPenalties::default());
        assert_eq!(result.aligned_seq1, "ACGT");
        assert_eq!(result.aligned_seq2, "ACGT");

        let seq = "MKAAYLSMFGKEDHKPFGDDEVELFRAVPGLKLKIAG";
        let alignment = run_local_alignment(seq, seq, LocalAligner::Global);
        assert_eq!(alignment.alns[0].seq, seq);
        assert_eq!(alignment.alns[1].seq, seq);
        assert_eq!(alignment.alns[0].id, "a");
        assert_eq!(alignment.alns[1].id, "b");
        assert!(alignment.consensus.chars().all(|c| c == '|'));
        assert_eq!(alignment.consensus.len(), seq.len());
    }

    #[test]
    fn global_alignment_round_trips_inputs() {
        let result = align_global("MKAAYLSMFG", "MKAYLSMFG", GapPenalties::default());
        assert_eq!(result.aligned_seq1.len(), result.aligned_seq2.len());
        assert_eq!(ungapped(&result.aligned_seq1), "MKAAYLSMFG");
        assert_eq!(ungapped(&result.aligned_seq2), "MKAYLSMFG");
        assert_eq!(result.aligned_seq2.matches(GAP_CHAR).count(), 1);
    }

    #[test]
    fn global_score_of_single_gap_uses_open_penalty() {
        let result = align_global("MKAW", "MKW", GapPenalties::default());
        // M/M 5 + K/K 5 + W/W 11, one opened gap
        assert_eq!(result.score, 21.0 - 10.0);
    }

    #[test]
    fn local_alignment_finds_embedded_core() {
        let result = align_local("XXXMKAAYYY", "MKAA", GapPenalties::default());
        assert_eq!(result.aligned_seq1.len(), result.aligned_seq2.len());
        let core: String = result
            .aligned_seq1
            .chars()
            .zip(result.aligned_seq2.chars())
            .filter(|(a, b)| *a != GAP_CHAR && *b != GAP_CHAR)
            .map(|(a, _)| a)
            .collect();
        assert_eq!(core, "MKAA");
        assert_eq!(result.region1, (3, 7));
        assert_eq!(result.region2, (0, 4));
        assert_eq!(ungapped(&result.aligned_seq1), "XXXMKAAYYY");
        assert_eq!(ungapped(&result.aligned_seq2), "MKAA");
        assert_eq!(result.score, 18.0);
    }

    #[test]
    fn local_alignment_of_identical_standard_residues_is_identity() {
        for seq in ["ACDEFGHIKLMNPQRSTVWY", "MKAAYLSMFGKEDHKPFGDDEVELFRAVPGLKLKIAG", "W"] {
            let alignment = run_local_alignment(seq, seq, LocalAligner::Local);
            assert_eq!(alignment.alns[0].seq, seq);
            assert_eq!(alignment.alns[1].seq, seq);
            assert!(alignment.consensus.chars().all(|c| c == CONSENSUS_MATCH));
        }

        let result = align_local("MKAAYLSMFGX", "MKAAYLSMFGX", GapPenalties::default());
        assert_eq!(result.region1, (0, 10));
        assert_eq!(result.aligned_seq1, "MKAAYLSMFGX-");
        assert_eq!(result.aligned_seq2, "MKAAYLSMFG-X");
    }

    #[test]
    fn local_alignment_pads_both_flanks() {
        let result = align_local("PPPWWWW", "WWWWGGG", GapPenalties::default());
        assert_eq!(result.aligned_seq1, "PPPWWWW---");
        assert_eq!(result.aligned_seq2, "---WWWWGGG");
    }

    #[test]
    fn aligned_rows_have_equal_length() {
        let pairs = [
            ("MKVLA", "QWERTY"),
            ("A", "WWWWWW"),
            ("HEAGAWGHEE", "PAWHEAE"),
            ("MSTNPKPQRKTKRNTNRRPQDVKFPGG", "MSTKPQRKTKRNTNRRPQDVKFPGGGQIVGGVYLLPRRGPRLGVRATRK"),
        ];
        for (a, b) in pairs {
            for aligner in [LocalAligner::Global, LocalAligner::Local] {
                let alignment = run_local_alignment(a, b, aligner);
                assert_eq!(alignment.alns[0].seq.len(), alignment.alns[1].seq.len());
                assert_eq!(alignment.consensus.len(), alignment.alns[0].seq.len());
                assert_eq!(ungapped(&alignment.alns[0].seq), a);
                assert_eq!(ungapped(&alignment.alns[1].seq), b);
            }
        }
    }

    #[test]
    fn empty_input_yields_fully_gapped_alignment() {
        for aligner in [LocalAligner::Global, LocalAligner::Local] {
            let alignment = run_local_alignment("", "MKA", aligner);
            assert_eq!(alignment.alns[0].seq, "---");
            assert_eq!(alignment.alns[1].seq, "MKA");
            assert_eq!(alignment.consensus, "   ");

            let alignment = run_local_alignment("MK", "", aligner);
            assert_eq!(alignment.alns[0].seq, "MK");
            assert_eq!(alignment.alns[1].seq, "--");
        }
        let both_empty = align_global("", "", GapPenalties::default());
        assert_eq!(both_empty.aligned_seq1, "");
        assert_eq!(both_empty.score, 0.0);
    }

    #[test]
    fn consensus_is_case_insensitive_and_ignores_gaps() {
        assert_eq!(build_consensus("MKa-A", "mKA-W"), "|||  ");
        assert_eq!(build_consensus("--", "--"), "  ");
    }

    #[test]
    fn stats_count_identities_and_gap_columns() {
        let alignment = run_local_alignment("MKAAYLSMFG", "MKAYLSMFG", LocalAligner::Global);
        let stats = alignment_stats(&alignment);
        assert_eq!(stats.length, 10);
        assert_eq!(stats.identities, 9);
        assert_eq!(stats.gap_columns, 1);
        assert!((stats.percent_identity - 90.0).abs() < 1e-9);
    }

    #[test]
    fn remote_algorithms_have_no_local_aligner() {
        assert_eq!(
            LocalAligner::for_algorithm(AlignmentAlgorithm::SmithWaterman),
            Some(LocalAligner::Local)
        );
        assert_eq!(LocalAligner::for_algorithm(AlignmentAlgorithm::Needle), None);
    }
}
