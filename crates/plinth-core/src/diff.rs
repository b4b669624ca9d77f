//! Field-level change detection between two miniature snapshots.
//!
//! The audit trail records only the fields that actually changed, each
//! as a `{from, to}` pair. Equality is field-specific:
//!
//! - `types`: equal iff the *sets* of `(type_id, proxy_type)` pairs
//!   match. Array order is irrelevant; flipping a proxy flag is not.
//! - `tags`: equal iff the sets of tag ids match; tag names are display
//!   data and ignored here.
//! - any other array-valued field: equal iff the sorted, stringified
//!   element lists match.
//! - scalars: strict equality.
//!
//! The tracked-field list is fixed and deliberately narrower than the
//! full record: timestamps and the product chain beyond the set id are
//! excluded so incidental touches do not generate history noise.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::{json, Value};

use crate::models::MiniatureSnapshot;

/// Fields the audit trail tracks, in the order they are reported.
pub const TRACKED_FIELDS: [&str; 10] = [
    "name",
    "description",
    "location",
    "quantity",
    "painted_by_id",
    "base_size_id",
    "product_set_id",
    "in_use_since",
    "types",
    "tags",
];

/// Before/after pair for a single field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDelta {
    pub from: Value,
    pub to: Value,
}

/// Map of changed field name to its delta. Ordered for stable output.
pub type ChangeSet = BTreeMap<String, FieldDelta>;

/// Compare two snapshots field by field.
///
/// Returns `None` when every tracked field compares equal; the caller
/// must not write an audit entry in that case. Otherwise returns a map
/// containing only the differing fields.
pub fn detect_changes(old: &MiniatureSnapshot, new: &MiniatureSnapshot) -> Option<ChangeSet> {
    let old_fields = tracked_values(old);
    let new_fields = tracked_values(new);

    let mut changes = ChangeSet::new();
    for ((field, from), (_, to)) in old_fields.into_iter().zip(new_fields) {
        if !field_equal(field, &from, &to) {
            changes.insert(field.to_string(), FieldDelta { from, to });
        }
    }

    if changes.is_empty() {
        None
    } else {
        Some(changes)
    }
}

/// Project a snapshot onto the tracked fields as JSON values, in
/// [`TRACKED_FIELDS`] order.
fn tracked_values(s: &MiniatureSnapshot) -> Vec<(&'static str, Value)> {
    vec![
        ("name", json!(s.name)),
        ("description", json!(s.description)),
        ("location", json!(s.location)),
        ("quantity", json!(s.quantity)),
        ("painted_by_id", json!(s.painted_by_id)),
        ("base_size_id", json!(s.base_size_id)),
        ("product_set_id", json!(s.product_set_id)),
        ("in_use_since", json!(s.in_use_since)),
        ("types", json!(s.types)),
        ("tags", json!(s.tags)),
    ]
}

/// Field-specific equality.
fn field_equal(field: &str, a: &Value, b: &Value) -> bool {
    match field {
        "types" => assignment_set(a) == assignment_set(b),
        "tags" => id_set(a) == id_set(b),
        _ => match (a.as_array(), b.as_array()) {
            (Some(x), Some(y)) => sorted_repr(x) == sorted_repr(y),
            _ => a == b,
        },
    }
}

/// The order-independent identity of a type-assignment array: the set
/// of `(type_id, proxy_type)` pairs.
fn assignment_set(v: &Value) -> BTreeSet<(i64, bool)> {
    v.as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    (
                        item.get("type_id").and_then(Value::as_i64).unwrap_or(0),
                        item.get("proxy_type")
                            .and_then(Value::as_bool)
                            .unwrap_or(false),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

/// The order-independent identity of a tag array: the set of ids.
fn id_set(v: &Value) -> BTreeSet<i64> {
    v.as_array()
        .map(|items| items.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default()
}

/// Canonical representation of a generic array: elements stringified
/// and sorted, so reordering alone never reads as a change.
fn sorted_repr(items: &[Value]) -> Vec<String> {
    let mut reprs: Vec<String> = items.iter().map(Value::to_string).collect();
    reprs.sort();
    reprs
}
