// src/devices/resolver/tests.rs
//! Tests for intent resolution

use super::*;
use std::collections::BTreeSet;

fn d(name: &str) -> Device {
    Device::parse(name).unwrap()
}

fn ds(names: &[&str]) -> Vec<Device> {
    names.iter().map(|n| d(n)).collect()
}

fn list(names: &[&str]) -> DeviceList {
    DeviceList::from_names(names.iter().copied()).unwrap()
}

fn positional(add: &[&str], remove: &[&str], position: Position) -> EditIntent {
    EditIntent::Positional {
        add: ds(add),
        remove: ds(remove),
        position,
    }
}

fn custom(add: &[&str], remove: &[&str], order: &[&str], insert_index: i64) -> EditIntent {
    EditIntent::Custom {
        add: ds(add),
        remove: ds(remove),
        order: ds(order),
        insert_index,
    }
}

#[test]
fn test_start_prepends_after_removal() {
    let edit = resolve(&list(&["A", "B", "C"]), &positional(&["X", "Y"], &["B"], Position::Start)).unwrap();
    assert_eq!(edit.final_order, list(&["X", "Y", "A", "C"]));
    assert_eq!(edit.added, ds(&["X", "Y"]));
    assert_eq!(edit.removed, ds(&["B"]));
}

#[test]
fn test_end_appends_after_removal() {
    let edit = resolve(&list(&["A", "B", "C"]), &positional(&["X", "Y"], &["B"], Position::End)).unwrap();
    assert_eq!(edit.final_order, list(&["A", "C", "X", "Y"]));
}

#[test]
fn test_after_splices_next_to_anchor() {
    let reference = list(&["A", "B", "C"]);
    let edit = resolve(&reference, &positional(&["X"], &["B"], Position::After(d("A")))).unwrap();
    assert_eq!(edit.final_order, list(&["A", "X", "C"]));

    // Anchor index shifts left once an earlier device is removed.
    let edit = resolve(&reference, &positional(&["X"], &["A"], Position::After(d("C")))).unwrap();
    assert_eq!(edit.final_order, list(&["B", "C", "X"]));
}

#[test]
fn test_anchor_removed_iff_anchor_in_remove() {
    let reference = list(&["A", "B", "C", "D"]);
    let remove = ["B", "D"];
    for anchor in ["A", "B", "C", "D"] {
        let result = resolve(&reference, &positional(&["X"], &remove, Position::After(d(anchor))));
        if remove.contains(&anchor) {
            assert_eq!(result.unwrap_err(), DeviceError::AnchorRemoved(d(anchor)));
        } else {
            assert!(result.is_ok(), "anchor {} should survive", anchor);
        }
    }
}

#[test]
fn test_anchor_missing() {
    let err = resolve(&list(&["A"]), &positional(&["X"], &[], Position::After(d("Z")))).unwrap_err();
    assert_eq!(err, DeviceError::AnchorMissing(d("Z")));
}

#[test]
fn test_add_and_remove_preconditions() {
    let reference = list(&["A", "B"]);
    assert_eq!(
        resolve(&reference, &positional(&["B"], &[], Position::End)).unwrap_err(),
        DeviceError::AddAlreadyPresent(d("B"))
    );
    assert_eq!(
        resolve(&reference, &positional(&[], &["Z"], Position::End)).unwrap_err(),
        DeviceError::RemoveNotPresent(d("Z"))
    );
}

#[test]
fn test_repeated_adds_are_normalized() {
    let edit = resolve(&list(&["A"]), &positional(&["X", "Y", "X"], &["A", "A"], Position::End)).unwrap();
    assert_eq!(edit.final_order, list(&["X", "Y"]));
    assert_eq!(edit.added, ds(&["X", "Y"]));
    assert_eq!(edit.removed, ds(&["A"]));
}

#[test]
fn test_start_end_length_property() {
    let cases: &[(&[&str], &[&str], &[&str])] = &[
        (&["A", "B", "C"], &["X"], &[]),
        (&["A", "B", "C"], &["X", "Y", "X"], &["A", "C"]),
        (&["A"], &[], &["A"]),
        (&[], &["X", "Y"], &[]),
    ];
    for &(reference, add, remove) in cases {
        let reference = list(reference);
        for position in [Position::Start, Position::End] {
            let edit = resolve(&reference, &positional(add, remove, position.clone())).unwrap();
            let unique_add: BTreeSet<&str> = add.iter().copied().collect();
            assert_eq!(
                edit.final_order.len(),
                reference.len() - remove.len() + unique_add.len(),
                "{:?} at {:?}",
                add,
                position
            );
            for device in add {
                let hits = edit.final_order.iter().filter(|x| x.as_str() == *device).count();
                assert_eq!(hits, 1);
            }
        }
    }
}

#[test]
fn test_remove_then_readd_restores_set() {
    let reference = list(&["A", "B", "C", "D"]);
    let removed = resolve(&reference, &positional(&[], &["B", "D"], Position::End)).unwrap();
    let restored = resolve(&removed.final_order, &positional(&["B", "D"], &[], Position::Start)).unwrap();

    let before: BTreeSet<&Device> = reference.iter().collect();
    let after: BTreeSet<&Device> = restored.final_order.iter().collect();
    assert_eq!(before, after);
    assert_eq!(restored.final_order, list(&["B", "D", "A", "C"]));
}

#[test]
fn test_custom_order_splices_at_index() {
    let reference = list(&["A", "B", "C"]);
    let edit = resolve(&reference, &custom(&["X"], &["A"], &["C", "A", "B"], 1)).unwrap();
    assert_eq!(edit.final_order, list(&["C", "X", "B"]));
}

#[test]
fn test_custom_index_is_clamped() {
    let reference = list(&["A", "B"]);
    let high = resolve(&reference, &custom(&["X"], &[], &["B", "A"], 99)).unwrap();
    assert_eq!(high.final_order, list(&["B", "A", "X"]));
    let low = resolve(&reference, &custom(&["X"], &[], &["B", "A"], -5)).unwrap();
    assert_eq!(low.final_order, list(&["X", "B", "A"]));
    // Clamped against the length after removal.
    let removed = resolve(&reference, &custom(&["X"], &["A"], &["B", "A"], 2)).unwrap();
    assert_eq!(removed.final_order, list(&["B", "X"]));
}

#[test]
fn test_custom_order_must_be_permutation() {
    let err = resolve(&list(&["A", "B", "C"]), &custom(&[], &[], &["A", "B", "Z"], 0)).unwrap_err();
    assert_eq!(
        err,
        DeviceError::CustomOrderMismatch {
            missing: ds(&["C"]),
            unknown: ds(&["Z"]),
        }
    );
}

#[test]
fn test_final_order_is_passed_through() {
    let reference = list(&["A", "B", "C"]);
    let intent = EditIntent::FinalOrder { order: ds(&["C", "X", "A"]) };
    let edit = resolve(&reference, &intent).unwrap();
    assert_eq!(edit.final_order.as_slice(), ds(&["C", "X", "A"]).as_slice());
    assert_eq!(edit.added, ds(&["X"]));
    assert_eq!(edit.removed, ds(&["B"]));
}

#[test]
fn test_final_order_pure_reorder_has_no_changes() {
    let intent = EditIntent::FinalOrder { order: ds(&["B", "A"]) };
    let edit = resolve(&list(&["A", "B"]), &intent).unwrap();
    assert!(edit.added.is_empty());
    assert!(edit.removed.is_empty());
}

#[test]
fn test_resolve_per_group_narrows_intent() {
    let groups = vec![
        DeviceGroup {
            products: vec!["P1".to_string(), "P2".to_string()],
            devices: list(&["A", "B"]),
        },
        DeviceGroup {
            products: vec!["P3".to_string()],
            devices: list(&["C", "D"]),
        },
    ];
    // "C" is already in the second group and "A" is absent from it.
    let intent = positional(&["E", "C"], &["A"], Position::End);
    let previews = resolve_per_group(&groups, &intent);

    assert_eq!(previews.len(), 2);
    assert_eq!(previews[0].result.as_ref().unwrap().final_order, list(&["B", "E", "C"]));
    assert_eq!(previews[1].products, vec!["P3"]);
    assert_eq!(previews[1].result.as_ref().unwrap().final_order, list(&["C", "D", "E"]));
}

#[test]
fn test_resolve_per_group_reports_missing_anchor() {
    let groups = vec![
        DeviceGroup { products: vec!["P1".to_string()], devices: list(&["A", "B"]) },
        DeviceGroup { products: vec!["P2".to_string()], devices: list(&["C"]) },
    ];
    let previews = resolve_per_group(&groups, &positional(&["X"], &[], Position::After(d("A"))));
    assert_eq!(previews[0].result.as_ref().unwrap().final_order, list(&["A", "X", "B"]));
    assert_eq!(
        previews[1].result.as_ref().unwrap_err(),
        &DeviceError::AnchorMissing(d("A"))
    );
}

#[test]
fn test_custom_order_projected_per_group() {
    let group = list(&["B", "D"]);
    let intent = custom(&["X"], &[], &["D", "A", "B", "C"], 2);
    let narrowed = intent.narrowed_to(&group);
    assert_eq!(narrowed, custom(&["X"], &[], &["D", "B"], 1));
    let edit = resolve(&group, &narrowed).unwrap();
    assert_eq!(edit.final_order, list(&["D", "X", "B"]));
}

#[test]
fn test_intent_serde_shape() {
    let intent = positional(&["X"], &[], Position::After(d("A")));
    let json = serde_json::to_value(&intent).unwrap();
    assert_eq!(json["kind"], "positional");
    assert_eq!(json["position"]["after"], "A");

    let parsed: EditIntent =
        serde_json::from_str(r#"{"kind":"final_order","order":["B","A"]}"#).unwrap();
    assert_eq!(parsed, EditIntent::FinalOrder { order: ds(&["B", "A"]) });
}

#[test]
fn test_describe() {
    let intent = positional(&["X", "Y"], &["A"], Position::After(d("B")));
    assert_eq!(intent.describe(), "add [X|Y] after 'B', remove [A]");
}
