//! Property tests for query normalization.
//!
//! The cache key is a hash of the normalized query's serialization, so
//! normalization must be deterministic for arbitrary input - including
//! filter maps built in any insertion order.

use std::collections::HashMap;

use proptest::prelude::*;

use availability_engine::query::{normalize, SearchQuery};

fn filter_key() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("meal_type".to_string()),
        Just("is_available".to_string()),
        Just("capacity".to_string()),
        Just("date".to_string()),
        Just("table".to_string()),
        Just("table_number".to_string()),
        "[a-z]{1,8}",
    ]
}

fn filter_value() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("dinner".to_string()),
        Just("true".to_string()),
        Just("false".to_string()),
        Just("2025-03-01".to_string()),
        Just("01/03/2025".to_string()),
        "[0-9]{1,3}",
        "[ -~]{0,12}",
    ]
}

fn raw_query() -> impl Strategy<Value = SearchQuery> {
    (
        "[ -~]{0,24}",
        0usize..1000,
        0usize..1000,
        "[a-z_]{0,12}",
        prop_oneof![
            Just(String::new()),
            Just("asc".to_string()),
            Just("desc".to_string())
        ],
        prop::collection::vec((filter_key(), filter_value()), 0..6),
    )
        .prop_map(|(q, page, size, sort, order, filter_pairs)| SearchQuery {
            q,
            page,
            size,
            sort,
            order,
            filters: filter_pairs.into_iter().collect(),
        })
}

proptest! {
    /// normalize(q) == normalize(q), and serializations are byte-identical.
    #[test]
    fn normalization_is_deterministic(raw in raw_query()) {
        let a = normalize(&raw);
        let b = normalize(&raw);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );
        prop_assert_eq!(a.cache_key(), b.cache_key());
    }

    /// Filter-map insertion order never changes the result.
    #[test]
    fn filter_order_does_not_matter(
        pairs in prop::collection::vec((filter_key(), filter_value()), 0..6)
    ) {
        let forward = SearchQuery {
            filters: pairs.iter().cloned().collect::<HashMap<_, _>>(),
            ..Default::default()
        };
        let reversed = SearchQuery {
            filters: pairs.iter().rev().cloned().collect::<HashMap<_, _>>(),
            ..Default::default()
        };

        // Same key set either way (later duplicates win in both, but the
        // *set* of keys is equal, which is what the property needs).
        if forward.filters == reversed.filters {
            let a = normalize(&forward);
            let b = normalize(&reversed);
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.cache_key(), b.cache_key());
        }
    }

    /// Paging is always clamped into the engine's accepted range.
    #[test]
    fn paging_is_always_clamped(raw in raw_query()) {
        let n = normalize(&raw);
        prop_assert!(n.page >= 1);
        prop_assert!((1..=100).contains(&n.size));
    }

    /// The normalized text query is never empty.
    #[test]
    fn text_query_is_never_empty(raw in raw_query()) {
        let n = normalize(&raw);
        prop_assert!(!n.query.is_empty());
    }
}
