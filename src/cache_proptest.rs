//! Property-based tests for mirror path derivation and commit comparison.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::cache::{mirror_dir_name, CacheLayout};
    use crate::git::{same_commit, short_commit};
    use proptest::prelude::*;
    use std::path::{Component, PathBuf};

    proptest! {
        /// Property: the mirror name never contains a path separator
        #[test]
        fn mirror_dir_name_has_no_separators(url in ".*") {
            let name = mirror_dir_name(&url);
            prop_assert!(!name.contains('/'));
            prop_assert!(!name.contains('\\'));
            prop_assert!(!name.contains(':'));
        }

        /// Property: the mirror directory is a direct child of the cache root
        #[test]
        fn mirror_dir_stays_inside_root(url in ".*") {
            let layout = CacheLayout::new(PathBuf::from("/cache"));
            let dir = layout.mirror_dir(&url);
            prop_assert_eq!(dir.parent(), Some(layout.root()));
            let last = dir.components().last();
            prop_assert!(matches!(last, Some(Component::Normal(_))));
        }

        /// Property: mirror_dir_name is deterministic
        #[test]
        fn mirror_dir_name_is_deterministic(url in ".*") {
            prop_assert_eq!(mirror_dir_name(&url), mirror_dir_name(&url));
        }

        /// Property: plain host and repository names are kept as-is
        #[test]
        fn mirror_dir_name_preserves_alphanumeric(name in "[a-zA-Z0-9][a-zA-Z0-9.-]*") {
            prop_assert_eq!(mirror_dir_name(&name), name);
        }

        /// Property: a commit always matches its own short form
        #[test]
        fn commit_matches_its_short_form(commit in "[0-9a-f]{7,40}") {
            prop_assert!(same_commit(&commit, short_commit(&commit)));
            prop_assert_eq!(short_commit(&commit).len(), 7);
        }

        /// Property: commit comparison is symmetric
        #[test]
        fn same_commit_is_symmetric(a in "[0-9a-f]{0,40}", b in "[0-9a-f]{0,40}") {
            prop_assert_eq!(same_commit(&a, &b), same_commit(&b, &a));
        }

        /// Property: commits differing in the first seven characters never match
        #[test]
        fn different_prefixes_do_not_match(
            a in "[0-9a-f]{7}",
            b in "[0-9a-f]{7}",
            tail in "[0-9a-f]{0,33}",
        ) {
            prop_assume!(a != b);
            let full_a = format!("{}{}", a, tail);
            let full_b = format!("{}{}", b, tail);
            prop_assert!(!same_commit(&full_a, &full_b));
        }
    }
}
