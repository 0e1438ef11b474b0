//! kolscore-evaluators — Concrete scoring dimensions and the default tree.
//!
//! Four dimensions are deterministic functions of account attributes
//! (originality, KOL influence, engagement, views); two delegate a judgment
//! call to a chat model (human vitality, content depth). [`tree::default_tree`]
//! assembles them into the standard scoring tree.

pub mod deterministic;
pub mod llm;
pub mod narrative;
pub mod tree;

/// Pick a comment for a score from descending threshold bands.
///
/// `bands` pairs a lower threshold with its comment, highest band first;
/// `below` covers scores under every threshold.
pub fn banded_comment<'a>(score: f64, bands: &[(f64, &'a str)], below: &'a str) -> &'a str {
    for (threshold, comment) in bands {
        if score >= *threshold {
            return comment;
        }
    }
    below
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANDS: &[(f64, &str)] = &[(0.8, "excellent"), (0.6, "good"), (0.4, "average")];

    #[test]
    fn picks_highest_matching_band() {
        assert_eq!(banded_comment(0.9, BANDS, "poor"), "excellent");
        assert_eq!(banded_comment(0.8, BANDS, "poor"), "excellent");
        assert_eq!(banded_comment(0.5, BANDS, "poor"), "average");
    }

    #[test]
    fn falls_through_to_below() {
        assert_eq!(banded_comment(0.1, BANDS, "poor"), "poor");
    }
}
