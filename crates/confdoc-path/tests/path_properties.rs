//! Property tests for path parsing and matching.

use confdoc_path::{PathAddress, PathPattern, Segment};
use proptest::prelude::*;

fn segment() -> impl Strategy<Value = Segment> {
    prop_oneof![
        "[a-zA-Z_][a-zA-Z0-9_-]{0,8}".prop_map(Segment::Key),
        (0usize..64).prop_map(Segment::Index),
    ]
}

fn address() -> impl Strategy<Value = PathAddress> {
    prop::collection::vec(segment(), 0..6).prop_map(PathAddress::new)
}

proptest! {
    #[test]
    fn canonical_form_parses_back(path in address()) {
        let rendered = path.to_string();
        let parsed: PathAddress = rendered.parse().unwrap();
        prop_assert_eq!(parsed, path);
    }

    #[test]
    fn every_prefix_is_a_prefix(path in address(), cut in 0usize..6) {
        let cut = cut.min(path.len());
        let prefix = PathAddress::from(&path.segments()[..cut]);
        prop_assert!(path.starts_with(&prefix));
        prop_assert!(PathPattern::from(prefix.clone()).matches_prefix_of(&path));
        if cut < path.len() {
            prop_assert!(prefix.is_ancestor_of(&path));
            prop_assert!(PathPattern::from(path.clone()).may_match_below(&prefix));
        }
    }

    #[test]
    fn star_pattern_matches_any_address_of_same_length(path in address()) {
        let expr = vec!["*"; path.len()].join(".");
        let pattern: PathPattern = expr.parse().unwrap();
        prop_assert!(pattern.matches(&path));
    }

    #[test]
    fn any_depth_matches_everything(path in address()) {
        let pattern: PathPattern = "**".parse().unwrap();
        prop_assert!(pattern.matches(&path));
    }
}
