//! Partial position maps between coordinate spaces.
//!
//! An absent key means "no corresponding position" and is a normal result.

use std::collections::BTreeMap;

pub type PositionMap<K = usize, V = usize> = BTreeMap<K, V>;

/// Inverts `k -> v` into `v -> k`.
///
/// Keys are visited in ascending order, so when several keys share a value
/// the highest key wins.
pub fn invert_map<K: Ord + Copy, V: Ord + Copy>(map: &PositionMap<K, V>) -> PositionMap<V, K> {
    let mut inverted = BTreeMap::new();
    for (key, value) in map {
        inverted.insert(*value, *key);
    }
    inverted
}

/// `0 -> 0, 1 -> 1, ..., len-1 -> len-1`.
pub fn identity_map(len: usize) -> PositionMap {
    (0..len).map(|i| (i, i)).collect()
}

/// Follows `first` then `second`; unmapped at either step stays unmapped.
pub fn compose<K, M, V>(first: &PositionMap<K, M>, second: &PositionMap<M, V>) -> PositionMap<K, V>
where
    K: Ord + Copy,
    M: Ord,
    V: Copy,
{
    first
        .iter()
        .filter_map(|(k, mid)| second.get(mid).map(|v| (*k, *v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverts_simple_map() {
        let map: PositionMap = [(0, 10), (1, 20), (2, 30)].into_iter().collect();
        let inverted = invert_map(&map);
        let expected: PositionMap = [(10, 0), (20, 1), (30, 2)].into_iter().collect();
        assert_eq!(inverted, expected);
        assert!(invert_map(&PositionMap::<usize, usize>::new()).is_empty());
    }

    #[test]
    fn highest_source_key_wins_on_collision() {
        let map: PositionMap = [(0, 7), (5, 7), (3, 7)].into_iter().collect();
        assert_eq!(invert_map(&map).get(&7), Some(&5));
    }

    #[test]
    fn compose_drops_unmapped_links() {
        let first: PositionMap = [(0, 1), (1, 2), (2, 9)].into_iter().collect();
        let second: PositionMap = [(1, 100), (2, 200)].into_iter().collect();
        let composed = compose(&first, &second);
        assert_eq!(composed.get(&0), Some(&100));
        assert_eq!(composed.get(&1), Some(&200));
        assert_eq!(composed.get(&2), None);
    }

    #[test]
    fn identity_covers_every_index() {
        let id = identity_map(4);
        assert_eq!(id.len(), 4);
        assert!(id.iter().all(|(k, v)| k == v));
    }
}
