use crate::core::photo::TagSet;

/// Transition score between two slides: `min(|A∩B|, |A\B|, |B\A|)`.
///
/// Symmetric, and zero whenever the sets are identical, disjoint, or
/// one of them is empty.
pub fn interest_factor(a: &TagSet, b: &TagSet) -> u32 {
    let common = a.intersection_len(b);
    common.min(a.len() - common).min(b.len() - common) as u32
}

/// Highest score any slide can reach against `tags`.
///
/// The shared and the unique part of `tags` compete for the same elements,
/// so the smaller of the two is at most half of the set.
pub fn upper_bound(tags: &TagSet) -> u32 {
    (tags.len() / 2) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::photo::{Orientation, PhotoSet};
    use proptest::prelude::*;

    fn tags(ids: &[u32]) -> TagSet {
        TagSet::from_ids(ids.iter().copied())
    }

    #[test]
    fn test_partial_overlap_scores_minimum() {
        let photos = PhotoSet::builder()
            .with(Orientation::Horizontal, ["a", "b", "c"])
            .with(Orientation::Horizontal, ["b", "c", "d"])
            .build();
        let a = &photos.get(0).unwrap().tags;
        let b = &photos.get(1).unwrap().tags;
        assert_eq!(interest_factor(a, b), 1);
    }

    #[test]
    fn test_identical_tags_score_zero() {
        let photos = PhotoSet::builder()
            .with(Orientation::Horizontal, ["cat"])
            .with(Orientation::Horizontal, ["cat"])
            .build();
        let a = &photos.get(0).unwrap().tags;
        let b = &photos.get(1).unwrap().tags;
        assert_eq!(interest_factor(a, b), 0);
    }

    #[test]
    fn test_subset_and_disjoint_score_zero() {
        assert_eq!(interest_factor(&tags(&[1, 2, 3]), &tags(&[1, 2])), 0);
        assert_eq!(interest_factor(&tags(&[1, 2]), &tags(&[3, 4])), 0);
        assert_eq!(interest_factor(&tags(&[1, 2]), &TagSet::new()), 0);
    }

    #[test]
    fn test_balanced_overlap() {
        // 2 shared, 2 unique on each side
        let a = tags(&[1, 2, 3, 4]);
        let b = tags(&[3, 4, 5, 6]);
        assert_eq!(interest_factor(&a, &b), 2);
        assert_eq!(upper_bound(&a), 2);
    }

    proptest! {
        #[test]
        fn prop_symmetric(a in prop::collection::vec(0u32..20, 0..12),
                          b in prop::collection::vec(0u32..20, 0..12)) {
            let (a, b) = (tags(&a), tags(&b));
            prop_assert_eq!(interest_factor(&a, &b), interest_factor(&b, &a));
        }

        #[test]
        fn prop_self_and_empty_score_zero(a in prop::collection::vec(0u32..50, 0..16)) {
            let a = tags(&a);
            prop_assert_eq!(interest_factor(&a, &a), 0);
            prop_assert_eq!(interest_factor(&a, &TagSet::new()), 0);
        }

        #[test]
        fn prop_never_exceeds_upper_bound(a in prop::collection::vec(0u32..20, 0..12),
                                          b in prop::collection::vec(0u32..20, 0..12)) {
            let (a, b) = (tags(&a), tags(&b));
            let score = interest_factor(&a, &b);
            prop_assert!(score <= upper_bound(&a));
            prop_assert!(score <= upper_bound(&b));
        }
    }
}
