//! Multi-key stable sort over in-memory records

use std::cmp::Ordering;

use serde_json::Value;

use crate::record::Record;

/// Produce a stably sorted copy of `records`.
///
/// Keys are compared in order; the first non-equal comparison decides.
/// `descending` reverses the whole ordering. Records where a key is
/// missing, or where the two values have incomparable types, compare
/// equal under that key, so original order is preserved among them.
pub fn sort_records(records: &[Record], keys: &[String], descending: bool) -> Vec<Record> {
    let mut sorted = records.to_vec();
    if keys.is_empty() {
        return sorted;
    }

    sorted.sort_by(|a, b| {
        let mut ordering = Ordering::Equal;
        for key in keys {
            ordering = compare_values(a.get(key), b.get(key));
            if ordering != Ordering::Equal {
                break;
            }
        }
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
    sorted
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        // Missing keys, nulls, and mismatched types sort as equal.
        _ => Ordering::Equal,
    }
}
