//! Property-based tests for TabRegistry invariants.
//!
//! For any operation sequence, the current-tab pointer either is unset or
//! refers to a tab actually present in the registry, and the tab count
//! tracks creates minus removals.

use std::rc::Rc;

use deskbrowser::engine::HostSurface;
use deskbrowser::managers::tab_registry::{TabRegistry, TabRegistryTrait};
use deskbrowser::types::engine::NativeHandle;
use proptest::prelude::*;

struct StubSurface;

impl HostSurface for StubSurface {
    fn is_realized(&self) -> bool {
        false
    }
    fn size(&self) -> (u32, u32) {
        (0, 0)
    }
    fn native_handle(&self) -> Option<NativeHandle> {
        None
    }
}

#[derive(Debug, Clone)]
enum RegistryOp {
    /// Create a tab with the nth canned URL.
    Create(usize),
    /// Select the tab at this index of the current id list (mod length).
    Select(usize),
    /// Clear the selection.
    Deselect,
    /// Remove the tab at this index of the current id list (mod length).
    Remove(usize),
}

fn arb_ops() -> impl Strategy<Value = Vec<RegistryOp>> {
    prop::collection::vec(
        prop_oneof![
            3 => (0..8usize).prop_map(RegistryOp::Create),
            2 => (0..16usize).prop_map(RegistryOp::Select),
            1 => Just(RegistryOp::Deselect),
            2 => (0..16usize).prop_map(RegistryOp::Remove),
        ],
        1..80,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn current_tab_always_lives_in_the_registry(ops in arb_ops()) {
        let mut registry = TabRegistry::new();
        let mut expected_count = 0usize;

        for op in &ops {
            match op {
                RegistryOp::Create(n) => {
                    let url = format!("https://site{}.example", n);
                    registry.create_tab(Rc::new(StubSurface), &url, "New Tab");
                    expected_count += 1;
                }
                RegistryOp::Select(idx) => {
                    let ids = registry.tab_ids();
                    if !ids.is_empty() {
                        registry.select_tab(Some(ids[idx % ids.len()]));
                    }
                }
                RegistryOp::Deselect => registry.select_tab(None),
                RegistryOp::Remove(idx) => {
                    let ids = registry.tab_ids();
                    if !ids.is_empty() {
                        registry.remove_tab(ids[idx % ids.len()]);
                        expected_count -= 1;
                    }
                }
            }

            // Invariant: a set current pointer refers to a live tab.
            if let Some(current) = registry.current_tab() {
                prop_assert!(
                    registry.contains(current),
                    "dangling current tab after {:?}",
                    op
                );
            }
            prop_assert_eq!(registry.tab_count(), expected_count);
        }
    }

    // Selection of a live tab always works and survives unrelated removals.
    #[test]
    fn selection_survives_unrelated_removals(extra in 1..6usize) {
        let mut registry = TabRegistry::new();
        let keep = registry.create_tab(Rc::new(StubSurface), "https://keep.example", "New Tab");
        let mut others = Vec::new();
        for n in 0..extra {
            let url = format!("https://other{}.example", n);
            others.push(registry.create_tab(Rc::new(StubSurface), &url, "New Tab"));
        }

        registry.select_tab(Some(keep));
        for id in others {
            registry.remove_tab(id);
            prop_assert_eq!(registry.current_tab(), Some(keep));
        }
    }

    // find_by_url agrees with the tab that was created for that URL.
    #[test]
    fn find_by_url_roundtrip(n in 0..50usize) {
        let mut registry = TabRegistry::new();
        let url = format!("site{}.example", n);
        let id = registry.create_tab(Rc::new(StubSurface), &url, "New Tab");
        prop_assert_eq!(registry.find_by_url(&url), Some(id));
        prop_assert_eq!(
            registry.find_by_url(&format!("https://site{}.example", n)),
            Some(id)
        );
    }
}
