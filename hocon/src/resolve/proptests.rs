//! Property-based tests for merging and resolution.

use std::collections::HashMap;

use super::{ResolveOptions, SubstitutionResolver};
use crate::merge::ConfigMerger;
use crate::parser;
use crate::path::ConfigPath;
use crate::value::{ConfigObject, ConfigValue};
use proptest::prelude::*;

// Each key is either a literal or a reference to an earlier key, so the
// reference graph is acyclic.
fn definitions_strategy() -> impl Strategy<Value = Vec<(i64, Option<usize>)>> {
    prop::collection::vec((any::<i64>(), prop::option::of(any::<prop::sample::Index>())), 1..12)
        .prop_map(|defs| {
            defs.into_iter()
                .enumerate()
                .map(|(i, (value, target))| {
                    let target = if i == 0 { None } else { target.map(|idx| idx.index(i)) };
                    (value, target)
                })
                .collect()
        })
}

fn render(defs: &[(i64, Option<usize>)], order: &[usize]) -> String {
    order
        .iter()
        .map(|&i| match defs[i].1 {
            Some(target) => format!("k{i} = ${{k{target}}}\n"),
            None => format!("k{i} = {}\n", defs[i].0),
        })
        .collect()
}

fn expected(defs: &[(i64, Option<usize>)], i: usize) -> i64 {
    match defs[i].1 {
        Some(target) => expected(defs, target),
        None => defs[i].0,
    }
}

fn flat_layer() -> impl Strategy<Value = ConfigObject> {
    prop::collection::vec(("[a-e]", any::<i32>()), 0..6).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(key, value)| (key, ConfigValue::from(value)))
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 1000,
        max_shrink_iters: 10000,
        .. ProptestConfig::default()
    })]

    // Resolution does not depend on declaration order
    #[test]
    fn resolution_is_order_independent(
        defs in definitions_strategy(),
        seed in any::<prop::sample::Index>(),
    ) {
        let forward: Vec<usize> = (0..defs.len()).collect();
        let mut rotated = forward.clone();
        rotated.rotate_left(seed.index(defs.len()));
        let reversed: Vec<usize> = forward.iter().rev().copied().collect();

        for order in [&forward, &rotated, &reversed] {
            let raw = parser::parse(&render(&defs, order)).unwrap();
            let root = SubstitutionResolver::resolve(raw, &ResolveOptions::default()).unwrap();
            for i in 0..defs.len() {
                prop_assert_eq!(
                    root.get(&format!("k{i}")),
                    Some(&ConfigValue::from(expected(&defs, i)))
                );
            }
        }
    }

    // The last assignment of a scalar key wins
    #[test]
    fn later_assignment_wins(
        assignments in prop::collection::vec(("[a-d]", any::<i64>()), 1..20)
    ) {
        let text: String = assignments
            .iter()
            .map(|(key, value)| format!("{key} = {value}\n"))
            .collect();
        let root = parser::parse(&text).unwrap();

        let mut last = HashMap::new();
        for (key, value) in &assignments {
            last.insert(key.clone(), *value);
        }
        prop_assert_eq!(root.len(), last.len());
        for (key, value) in last {
            prop_assert_eq!(root.get(&key), Some(&ConfigValue::from(value)));
        }
    }

    // Each key takes its value from the highest-priority layer defining it
    #[test]
    fn merge_layers_respects_priority(
        layers in prop::collection::vec(flat_layer(), 0..5)
    ) {
        let merged = ConfigMerger::merge_layers(layers.clone());
        for key in ["a", "b", "c", "d", "e"] {
            let winner = layers.iter().find_map(|layer| layer.get(key));
            prop_assert_eq!(merged.get(key), winner);
        }
    }

    // A rendered path parses back to the same segments
    #[test]
    fn path_display_round_trips(
        segments in prop::collection::vec("[a-z][a-z0-9. \"$]{0,8}", 1..5)
    ) {
        let path = ConfigPath::from_segments(segments.clone());
        let reparsed = ConfigPath::parse(&path.to_string()).unwrap();
        prop_assert_eq!(reparsed.segments(), segments.as_slice());
    }
}
