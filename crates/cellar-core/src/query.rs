//! The composed select pipeline: filter, then sort, then limit
//!
//! `select` works over a full result set fetched from the host store; the
//! pipeline order is fixed regardless of which options are present.

use crate::record::Record;
use crate::sort::sort_records;

/// Filter clause for a composed select.
pub enum Where {
    /// A predicate over the full result set, returning the records to keep.
    Predicate(Box<dyn Fn(Vec<Record>) -> Vec<Record>>),
    /// An equality match: a record passes when ANY of the clause's fields
    /// equals the record's value for that field (logical OR across fields).
    /// The OR semantic is contractual; callers wanting AND compose a
    /// predicate instead.
    Match(Record),
}

impl std::fmt::Debug for Where {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Where::Predicate(_) => f.write_str("Where::Predicate(..)"),
            Where::Match(fields) => f.debug_tuple("Where::Match").field(fields).finish(),
        }
    }
}

/// Options for a composed select.
#[derive(Debug, Default)]
pub struct SelectOptions {
    /// Optional filter clause.
    pub filter: Option<Where>,
    /// Sort keys, applied in order; empty means no sort.
    pub sort_by: Vec<String>,
    /// Reverse the sort ordering.
    pub order_by_desc: bool,
    /// Keep at most this many records, counted after sorting.
    pub limit: Option<usize>,
}

impl SelectOptions {
    /// Options with a single sort key.
    pub fn sorted_by(key: impl Into<String>) -> Self {
        Self {
            sort_by: vec![key.into()],
            ..Self::default()
        }
    }

    /// Options with an equality-match filter.
    pub fn matching(fields: Record) -> Self {
        Self {
            filter: Some(Where::Match(fields)),
            ..Self::default()
        }
    }
}

/// Run the pipeline over a full result set: filter, sort, limit.
pub fn apply_select(records: Vec<Record>, options: SelectOptions) -> Vec<Record> {
    let mut result = match options.filter {
        Some(Where::Predicate(predicate)) => predicate(records),
        Some(Where::Match(fields)) => records
            .into_iter()
            .filter(|record| matches_any_field(record, &fields))
            .collect(),
        None => records,
    };

    if !options.sort_by.is_empty() {
        result = sort_records(&result, &options.sort_by, options.order_by_desc);
    }

    if let Some(limit) = options.limit {
        result.truncate(limit);
    }

    result
}

fn matches_any_field(record: &Record, fields: &Record) -> bool {
    fields
        .iter()
        .any(|(key, expected)| record.get(key) == Some(expected))
}
