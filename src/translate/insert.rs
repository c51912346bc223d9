// SPDX-License-Identifier: Apache-2.0

//! INSERT translation.
//!
//! Parsing yields the target table and the provided column/value pairs; the
//! driver then reads the collection's field metadata, fills in defaults and
//! dispatches the final `create` expression. The write is always restricted
//! to the keys present in the metadata.

use std::collections::BTreeMap;

use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::Token;

use crate::error::{DriverError, DriverResult};
use crate::fql::{self, Expr, Scalar};
use crate::model::{Column, FieldsMetadata, Table};
use crate::token::value::extract_value;
use crate::token::{Group, GroupKind};

/// The parsed pieces of an INSERT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertPlan {
    pub table: Table,
    pub record: BTreeMap<String, Scalar>,
}

pub fn translate_insert(statement: &Group) -> DriverResult<InsertPlan> {
    let into_idx = statement
        .find_keyword(Keyword::INTO, 0)
        .ok_or_else(|| DriverError::programming("INSERT requires an INTO clause"))?;
    let (_, target) = statement
        .find_group(GroupKind::Function, into_idx)
        .ok_or_else(|| {
            DriverError::programming("INSERT requires a table name and column list")
        })?;

    let table_name = target.children[0]
        .name_value()
        .ok_or_else(|| DriverError::programming("INSERT requires a table name"))?;
    let column_group = target.children[1]
        .group_of(GroupKind::Parenthesis)
        .ok_or_else(|| DriverError::programming("INSERT requires a column list"))?;

    let (_, identifiers) = column_group
        .find_first(0, |n| {
            n.as_group()
                .is_some_and(|g| matches!(g.kind, GroupKind::Identifier | GroupKind::IdentifierList))
        })
        .ok_or_else(|| DriverError::programming("INSERT requires a column list"))?;
    let columns = Column::from_identifier_group(identifiers)?;

    let (_, values_group) = statement
        .find_group(GroupKind::Values, into_idx)
        .ok_or_else(|| DriverError::programming("INSERT requires a VALUES clause"))?;
    let (_, value_tuple) = values_group
        .find_group(GroupKind::Parenthesis, 0)
        .ok_or_else(|| DriverError::programming("INSERT requires a VALUES tuple"))?;

    let values: Vec<Scalar> = value_tuple
        .flatten()
        .into_iter()
        .filter(|t| !matches!(t, Token::Comma))
        .map(extract_value)
        .collect::<DriverResult<_>>()?;

    if columns.len() != values.len() {
        return Err(DriverError::programming(format!(
            "Lengths didn't match: {} columns and {} values",
            columns.len(),
            values.len()
        )));
    }

    let mut table = Table::new(table_name);
    let record = columns
        .iter()
        .zip(values)
        .map(|(column, value)| (column.name.clone(), value))
        .collect();
    for column in columns {
        table.add_column(column);
    }

    Ok(InsertPlan { table, record })
}

/// The metadata read issued before every INSERT. No caching: the cost of an
/// extra round-trip buys correctness across schema changes.
pub fn metadata_query(table_name: &str) -> Expr {
    fql::get(fql::collection(table_name))
}

/// Digs the field metadata out of a fetched collection document.
pub fn fields_from_collection(resource: &serde_json::Value) -> DriverResult<Option<FieldsMetadata>> {
    let Some(fields) = resource
        .get("data")
        .and_then(|d| d.get("metadata"))
        .and_then(|m| m.get("fields"))
    else {
        return Ok(None);
    };

    serde_json::from_value(fields.clone())
        .map(Some)
        .map_err(|e| DriverError::internal(format!("Invalid field metadata: {e}")))
}

/// Builds the record to write: one entry per metadata field, taking the
/// provided value when present and the field's default otherwise. Columns
/// absent from the metadata are never written.
pub fn apply_field_defaults(
    record: &BTreeMap<String, Scalar>,
    fields: Option<&FieldsMetadata>,
) -> BTreeMap<String, Scalar> {
    let Some(fields) = fields else {
        return BTreeMap::new();
    };

    fields
        .iter()
        .map(|(field_name, field_data)| {
            let value = record
                .get(field_name)
                .cloned()
                .unwrap_or_else(|| field_data.default.clone());
            (field_name.clone(), value)
        })
        .collect()
}

/// `create(collection(t), {data: <record>})`
pub fn build_create(table_name: &str, record: BTreeMap<String, Scalar>) -> Expr {
    let data = record
        .into_iter()
        .map(|(field, value)| (field, Expr::Scalar(value)))
        .collect();
    fql::create(
        fql::collection(table_name),
        fql::object(BTreeMap::from([("data".to_string(), fql::object(data))])),
    )
}
