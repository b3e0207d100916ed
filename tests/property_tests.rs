//! Property-based tests for the merge rule and level handling.

use fanlog::{level_name, EntryPatch, Level, LogEntry};
use proptest::prelude::*;
use serde_json::{json, Value};

fn small_values() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(any::<i64>().prop_map(|n| json!(n)), 0..8)
}

proptest! {
    #[test]
    fn merge_concatenates_context_base_first(
        base in small_values(),
        patch in small_values(),
    ) {
        let mut entry = LogEntry::empty(30);
        entry.context = base.clone();

        let mut p = EntryPatch::new();
        p.context = patch.clone();

        let merged = entry.merge(p);
        prop_assert_eq!(merged.context.len(), base.len() + patch.len());
        prop_assert_eq!(&merged.context[..base.len()], &base[..]);
        prop_assert_eq!(&merged.context[base.len()..], &patch[..]);
    }

    #[test]
    fn merge_metadata_is_last_write_wins(
        base_keys in prop::collection::btree_map("[a-d]", any::<i64>(), 0..4),
        patch_keys in prop::collection::btree_map("[a-d]", any::<i64>(), 0..4),
    ) {
        let mut entry = LogEntry::empty(30);
        for (k, v) in &base_keys {
            entry.metadata.insert(k.clone(), json!(v));
        }
        let mut patch = EntryPatch::new();
        for (k, v) in &patch_keys {
            patch.metadata.insert(k.clone(), json!(v));
        }

        let merged = entry.merge(patch);
        for (k, v) in &patch_keys {
            prop_assert_eq!(merged.metadata.get(k), Some(&json!(v)));
        }
        for (k, v) in &base_keys {
            if !patch_keys.contains_key(k) {
                prop_assert_eq!(merged.metadata.get(k), Some(&json!(v)));
            }
        }
    }

    #[test]
    fn merge_level_overlay_is_optional(level in any::<i32>(), patched in any::<i32>()) {
        let entry = LogEntry::empty(level);
        prop_assert_eq!(entry.clone().merge(EntryPatch::new()).level, level);

        let mut patch = EntryPatch::new();
        patch.level = Some(patched);
        prop_assert_eq!(entry.merge(patch).level, patched);
    }

    #[test]
    fn named_levels_roundtrip_through_names(index in 0usize..7) {
        let level = Level::ALL[index];
        prop_assert_eq!(level_name(level.value()).parse::<Level>().unwrap(), level);
    }

    #[test]
    fn unnamed_levels_render_numerically(value in any::<i32>()) {
        prop_assume!(Level::from_value(value).is_none());
        prop_assert_eq!(level_name(value), value.to_string());
    }
}

#[cfg(feature = "telegram")]
mod telegram_props {
    use fanlog::transports::telegram::{chunk_text, escape_markdown_v2};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn chunks_never_exceed_limit_and_concatenate(text in ".{0,2000}", max in 1usize..500) {
            let chunks = chunk_text(&text, max);
            for chunk in &chunks {
                prop_assert!(chunk.chars().count() <= max);
            }
            prop_assert_eq!(chunks.concat(), text);
        }

        #[test]
        fn chunk_boundaries_never_split_escape_pairs(
            text in r"[ab\\.!*]{0,300}",
            max in 2usize..64,
        ) {
            let chunks = chunk_text(&text, max);
            // Every non-final chunk ends with complete escapes only.
            for chunk in chunks.iter().take(chunks.len().saturating_sub(1)) {
                let trailing = chunk.chars().rev().take_while(|c| *c == '\\').count();
                prop_assert_eq!(trailing % 2, 0);
            }
            prop_assert_eq!(chunks.concat(), text);
        }

        #[test]
        fn escaping_preserves_original_after_unescape(text in "[a-z.!*_-]{0,64}") {
            let escaped = escape_markdown_v2(&text);
            prop_assert_eq!(escaped.replace('\\', ""), text);
        }
    }
}
