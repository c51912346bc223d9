// SPDX-License-Identifier: Apache-2.0

//! UPDATE translation.

use std::collections::BTreeMap;

use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::Token;

use crate::error::{DriverError, DriverResult};
use crate::fql::{self, Expr};
use crate::model::{Column, Table};
use crate::token::value::extract_value;
use crate::token::{Group, GroupKind, Node};

/// Translates `UPDATE t SET c = v WHERE …` into an expression that updates
/// the matched document and returns the matched-record count as
/// `{data: [{count: <n>}]}`.
pub fn translate_update(statement: &Group) -> DriverResult<Expr> {
    let (table_idx, table_identifier) = statement
        .find_group(GroupKind::Identifier, 0)
        .ok_or_else(|| {
            DriverError::not_supported("Only one table per query is currently supported")
        })?;
    let table = Table::from_identifier(table_identifier)?;

    let set_idx = statement
        .find_keyword(Keyword::SET, table_idx)
        .ok_or_else(|| DriverError::programming("UPDATE requires a SET clause"))?;
    let assignment = statement
        .find_group(GroupKind::Comparison, set_idx)
        .map(|(_, g)| g)
        .ok_or_else(|| DriverError::programming("No '=' were found for value assignment."))?;

    let (_, update_column) = assignment
        .find_group(GroupKind::Identifier, 0)
        .ok_or_else(|| DriverError::programming("No column found for value assignment."))?;
    let column = Column::from_identifier(update_column)?;

    let has_equals = assignment
        .children
        .iter()
        .any(|n| matches!(n.as_leaf(), Some(Token::Eq)));
    if !has_equals {
        return Err(DriverError::programming("No '=' were found for value assignment."));
    }

    let value_token = assignment
        .children
        .last()
        .and_then(Node::as_leaf)
        .ok_or_else(|| DriverError::programming("No value found for value assignment."))?;
    let value = extract_value(value_token)?;

    let comparisons = super::where_clause::parse_where(super::where_clause::find_where(statement))?;
    let records_to_update =
        super::where_clause::matched_records(&table.name, comparisons.as_ref())?;

    // The update call itself does not report a count, so the matched set is
    // counted in the same compound expression.
    let updated_count = fql::do_(vec![
        fql::update(
            fql::select(&["ref"], fql::get(records_to_update.clone())),
            fql::object(BTreeMap::from([(
                "data".to_string(),
                fql::object(BTreeMap::from([(column.name, Expr::Scalar(value))])),
            )])),
        ),
        fql::count(records_to_update),
    ]);

    Ok(fql::let_(
        vec![("count".to_string(), updated_count)],
        fql::object(BTreeMap::from([(
            "data".to_string(),
            Expr::Array(vec![fql::object(BTreeMap::from([(
                "count".to_string(),
                fql::var("count"),
            )]))]),
        )])),
    ))
}
