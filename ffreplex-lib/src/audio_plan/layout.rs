//! Channel layout quality table
//!
//! Ranks ffmpeg channel layout tokens by fidelity. Unknown tokens rank `-1`
//! and always sort after every known layout.

use std::cmp::Ordering;

/// Known layouts, lowest fidelity first
const LAYOUT_ORDER: &[&str] = &[
    "mono",
    "downmix",
    "stereo",
    "2.1",
    "3.0",
    "3.0(back)",
    "4.0",
    "quad",
    "quad(side)",
    "3.1",
    "5.0",
    "5.0(side)",
    "4.1",
    "5.1",
    "5.1(side)",
    "6.0",
    "6.0(front)",
    "hexagonal",
    "6.1",
    "6.1(back)",
    "6.1(front)",
    "7.0",
    "7.0(front)",
    "7.1",
    "7.1(wide)",
    "7.1(wide-side)",
    "5.1.2",
    "octagonal",
    "cube",
    "5.1.4",
    "7.1.2",
    "7.1.4",
    "7.2.3",
    "9.1.4",
    "hexadecagonal",
    "22.2",
];

/// Rank of a layout token, `-1` when unknown
pub fn rank(layout: &str) -> i32 {
    LAYOUT_ORDER
        .iter()
        .position(|l| *l == layout)
        .map(|p| p as i32)
        .unwrap_or(-1)
}

/// Whether the token is part of the quality table
pub fn is_known(layout: &str) -> bool {
    rank(layout) >= 0
}

/// Strict total order over layout tokens, worst first.
///
/// Two unknown tokens share rank `-1` and fall back to comparing their text.
pub fn compare(a: &str, b: &str) -> Ordering {
    rank(a).cmp(&rank(b)).then_with(|| {
        if is_known(a) {
            Ordering::Equal
        } else {
            a.cmp(b)
        }
    })
}

/// Track order: best layout first, lower input index first on ties
pub fn compare_tracks(a: (&str, usize), b: (&str, usize)) -> Ordering {
    compare(b.0, a.0).then_with(|| a.1.cmp(&b.1))
}

/// Picks the best source among `(layout, index)` candidates
pub fn best_source<'a, I>(candidates: I) -> Option<usize>
where
    I: IntoIterator<Item = (&'a str, usize)>,
{
    candidates
        .into_iter()
        .min_by(|a, b| compare_tracks(*a, *b))
        .map(|(_, index)| index)
}

/// All known layouts, lowest fidelity first
pub fn known_layouts() -> &'static [&'static str] {
    LAYOUT_ORDER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_known_and_unknown() {
        assert_eq!(rank("mono"), 0);
        assert!(rank("stereo") > rank("mono"));
        assert!(rank("5.1") > rank("stereo"));
        assert!(rank("7.1(wide)") > rank("7.1"));
        assert!(rank("22.2") > rank("7.1"));
        assert_eq!(rank("weird"), -1);
        assert_eq!(rank(""), -1);
    }

    #[test]
    fn test_compare_is_strict_total_order() {
        let mut tokens: Vec<&str> = known_layouts().to_vec();
        tokens.extend(["unknown", "zz", "aa"]);

        for a in &tokens {
            assert_eq!(compare(a, a), Ordering::Equal);
            for b in &tokens {
                if a != b {
                    assert_ne!(compare(a, b), Ordering::Equal, "{} vs {}", a, b);
                    assert_eq!(compare(a, b), compare(b, a).reverse());
                }
                for c in &tokens {
                    if compare(a, b) == Ordering::Less && compare(b, c) == Ordering::Less {
                        assert_eq!(compare(a, c), Ordering::Less);
                    }
                }
            }
        }
    }

    #[test]
    fn test_unknown_sorts_after_known() {
        let mut tracks = vec![("unknown", 0), ("mono", 1), ("5.1", 2), ("foo", 3)];
        tracks.sort_by(|a, b| compare_tracks(*a, *b));
        let order: Vec<&str> = tracks.iter().map(|t| t.0).collect();
        assert_eq!(order, vec!["5.1", "mono", "unknown", "foo"]);
    }

    #[test]
    fn test_ties_broken_by_index() {
        let mut tracks = vec![("stereo", 4), ("5.1", 3), ("stereo", 1)];
        tracks.sort_by(|a, b| compare_tracks(*a, *b));
        assert_eq!(tracks, vec![("5.1", 3), ("stereo", 1), ("stereo", 4)]);
    }

    #[test]
    fn test_best_source() {
        assert_eq!(best_source(vec![("5.1", 2), ("7.1", 5), ("7.1", 3)]), Some(3));
        assert_eq!(best_source(Vec::<(&str, usize)>::new()), None);
    }
}
