// SPDX-License-Identifier: Apache-2.0

//! Shaping of raw database responses into tabular rows.
//!
//! Documents arrive as `{ref, data: {…}, …}` maps with refs encoded as
//! `{"@ref": {…}}` and timestamps as `{"@ts": …}`. Rows are flat string-keyed
//! maps of scalars: refs collapse to their ID, timestamps to timezone-aware
//! date-times, and anything still nested is rejected.

use std::collections::BTreeMap;

use crate::error::{DriverError, DriverResult};
use crate::fql::Scalar;
use crate::model::Column;

/// A result row.
pub type Row = BTreeMap<String, Scalar>;

/// Converts one wire value into a row scalar. Refs become their ID string.
pub fn to_scalar(value: &serde_json::Value) -> DriverResult<Scalar> {
    if let Some(id) = ref_id(value) {
        return Ok(Scalar::String(id.to_string()));
    }

    Scalar::from_wire(value).map_err(DriverError::internal)
}

fn ref_fields(value: &serde_json::Value) -> Option<&serde_json::Map<String, serde_json::Value>> {
    value.get("@ref")?.as_object()
}

/// The ID carried by a wire ref, if the value is one.
pub fn ref_id(value: &serde_json::Value) -> Option<&str> {
    ref_fields(value)?.get("id")?.as_str()
}

/// Flattens a bare ref into a row: every field of its value map except
/// `metadata`, with nested refs becoming `<key>_id`.
pub fn reference_to_row(value: &serde_json::Value) -> DriverResult<Row> {
    let fields = ref_fields(value)
        .ok_or_else(|| DriverError::internal(format!("Expected a ref value, got: {value}")))?;

    let mut row = Row::new();
    for (key, field_value) in fields {
        if key == "metadata" {
            continue;
        }
        if let Some(id) = ref_id(field_value) {
            row.insert(format!("{key}_id"), Scalar::String(id.to_string()));
            continue;
        }
        row.insert(key.clone(), to_scalar(field_value)?);
    }
    Ok(row)
}

/// Flattens a document into a row: `id` from the document's ref, every
/// top-level key except `ref`/`data`, then every key inside `data`. Aliases
/// are applied to the flattened keys.
pub fn document_to_row(
    document: &serde_json::Value,
    aliases: &BTreeMap<String, String>,
) -> DriverResult<Row> {
    let Some(entries) = document.as_object() else {
        return Err(DriverError::internal(format!(
            "Expected a document object, got: {document}"
        )));
    };

    let mut row = Row::new();
    if let Some(id) = entries.get("ref").and_then(ref_id) {
        row.insert("id".to_string(), Scalar::String(id.to_string()));
    }

    for (key, value) in entries {
        if key == "ref" || key == "data" {
            continue;
        }
        row.insert(key.clone(), to_scalar(value)?);
    }

    if let Some(data) = entries.get("data").and_then(|d| d.as_object()) {
        for (key, value) in data {
            row.insert(key.clone(), to_scalar(value)?);
        }
    }

    Ok(row
        .into_iter()
        .map(|(key, value)| {
            let key = aliases.get(&key).cloned().unwrap_or(key);
            (key, value)
        })
        .collect())
}

/// Applies the projection: rows keep the projected aliases (plus the
/// document ID); a `*` projection keeps everything.
pub fn project_columns(columns: &[Column], row: Row) -> Row {
    if columns.iter().any(Column::is_wildcard) {
        return row;
    }

    row.into_iter()
        .filter(|(key, _)| key == "id" || columns.iter().any(|c| c.alias == *key))
        .collect()
}

/// The list of result documents in a response resource. A single document
/// returned instead of a page is wrapped into a one-element list.
pub fn unwrap_documents(resource: &serde_json::Value) -> Vec<serde_json::Value> {
    match resource.get("data") {
        Some(serde_json::Value::Array(documents)) => documents.clone(),
        _ => vec![resource.clone()],
    }
}
