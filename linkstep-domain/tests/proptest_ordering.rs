//! Property-based tests for enumeration order and address assignment.
//!
//! These tests verify that:
//! - Target order is the sorted list of stripped names, independent of listing order
//! - Re-enumerating the same listing gives an identical sequence
//! - Addresses are base + step * ordinal, distinct and strictly increasing

use linkstep_domain::{AddressPlan, canonical_name, enumerate_targets};
use linkstep_types::LoadAddress;
use proptest::prelude::*;

fn arb_file_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        (
            prop::string::string_regex(r"[a-z0-9_-]{1,10}").unwrap(),
            prop::sample::select(vec!["", ".rs", ".S", ".test.rs"]),
        )
            .prop_map(|(stem, ext)| format!("{stem}{ext}")),
        0..12,
    )
}

proptest! {
    #[test]
    fn order_is_sorted_stripped_names(names in arb_file_names()) {
        let targets = enumerate_targets(&names);

        let mut expected: Vec<String> =
            names.iter().map(|n| canonical_name(n).to_string()).collect();
        expected.sort();

        let actual: Vec<String> = targets.iter().map(|t| t.name.clone()).collect();
        prop_assert_eq!(actual, expected);
        for (i, t) in targets.iter().enumerate() {
            prop_assert_eq!(t.ordinal, i as u64);
        }
    }

    #[test]
    fn enumeration_is_deterministic(names in arb_file_names()) {
        let first = enumerate_targets(&names);
        let second = enumerate_targets(&names);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn listing_order_does_not_matter(names in arb_file_names()) {
        let mut reversed = names.clone();
        reversed.reverse();
        prop_assert_eq!(enumerate_targets(&names), enumerate_targets(&reversed));
    }

    #[test]
    fn addresses_follow_base_plus_step(
        base in 0u64..0xFFFF_FFFF,
        step in 1u64..0x10_0000,
        n in 0u64..64,
    ) {
        let plan = AddressPlan::new(LoadAddress::new(base), LoadAddress::new(step)).unwrap();
        let mut prev: Option<u64> = None;
        for i in 0..n {
            let addr = plan.address_for(i).unwrap().get();
            prop_assert_eq!(addr, base + step * i);
            if let Some(p) = prev {
                prop_assert!(addr > p);
            }
            prev = Some(addr);
        }
    }
}

#[test]
fn three_target_batch_addresses() {
    let plan =
        AddressPlan::new(LoadAddress::new(0x8040_0000), LoadAddress::new(0x20000)).unwrap();
    let targets = enumerate_targets(["gamma.rs", "alpha.rs", "beta.rs"]);
    let assigned: Vec<(String, String)> = plan
        .assign(&targets)
        .unwrap()
        .into_iter()
        .map(|(t, a)| (t.name.clone(), a.to_string()))
        .collect();
    assert_eq!(
        assigned,
        vec![
            ("alpha".to_string(), "0x80400000".to_string()),
            ("beta".to_string(), "0x80420000".to_string()),
            ("gamma".to_string(), "0x80440000".to_string()),
        ]
    );
}
