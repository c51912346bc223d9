// SPDX-License-Identifier: Apache-2.0

//! WHERE clause parsing and the record-matching expressions it produces.

use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::Token;

use crate::error::{DriverError, DriverResult};
use crate::fql::{self, Expr, Scalar};
use crate::model::{Comparisons, ID_COLUMN};
use crate::token::value::extract_value;
use crate::token::{Group, GroupKind, Node};

const EQUALITY_ONLY: &str = "Only column-value equality conditions are currently supported";

/// Reduces a WHERE group to the supported comparison set: an optional `id`
/// lookup plus AND-joined field equalities.
pub fn parse_where(where_group: Option<&Group>) -> DriverResult<Option<Comparisons>> {
    let Some(where_group) = where_group else {
        return Ok(None);
    };

    if where_group.contains_keyword(Keyword::OR) {
        return Err(DriverError::not_supported(
            "OR not yet supported in WHERE clauses.",
        ));
    }
    if where_group.contains_keyword(Keyword::BETWEEN) {
        return Err(DriverError::not_supported(
            "BETWEEN not yet supported in WHERE clauses.",
        ));
    }
    if where_group.contains_keyword(Keyword::LIKE) || where_group.contains_keyword(Keyword::IN) {
        return Err(DriverError::not_supported(EQUALITY_ONLY));
    }

    let mut comparisons = Comparisons::default();
    let mut idx = 0;
    let mut condition_count = 0;

    while let Some((found_idx, condition)) = where_group.find_group(GroupKind::Comparison, idx) {
        if condition_count > 0 {
            let joined_by_and = where_group.children[idx..found_idx]
                .iter()
                .any(|n| n.is_keyword(Keyword::AND));
            if !joined_by_and {
                return Err(DriverError::not_supported(
                    "Multiple WHERE conditions must be joined by AND",
                ));
            }
        }

        let (column_name, value) = parse_comparison(condition)?;
        if column_name == ID_COLUMN {
            if matches!(value, Scalar::Float(_)) {
                return Err(DriverError::programming(
                    "Querying by ID requires a string or integer value",
                ));
            }
            comparisons.by_id = Some(value);
        } else {
            comparisons.by_index.push((column_name, value));
        }

        condition_count += 1;
        idx = found_idx + 1;
    }

    if condition_count == 0 {
        return Err(DriverError::not_supported(EQUALITY_ONLY));
    }

    Ok(Some(comparisons))
}

fn parse_comparison(condition: &Group) -> DriverResult<(String, Scalar)> {
    let (_, identifier) = condition
        .find_group(GroupKind::Identifier, 0)
        .ok_or_else(|| DriverError::not_supported(EQUALITY_ONLY))?;

    // The table qualifier, if any, is irrelevant: queries are single-table.
    let column_name = identifier
        .flatten()
        .into_iter()
        .filter_map(crate::token::name_value)
        .last()
        .ok_or_else(|| DriverError::not_supported(EQUALITY_ONLY))?
        .to_string();

    let equals = condition
        .children
        .iter()
        .any(|n| matches!(n.as_leaf(), Some(Token::Eq)));
    if !equals {
        return Err(DriverError::not_supported(EQUALITY_ONLY));
    }

    let value_token = condition
        .children
        .last()
        .and_then(Node::as_leaf)
        .ok_or_else(|| DriverError::not_supported(EQUALITY_ONLY))?;

    Ok((column_name, extract_value(value_token)?))
}

/// Builds the record-matching expression for a table and its parsed WHERE
/// comparisons.
///
/// No WHERE clause matches everything through the table's `all_` index; an
/// `id` lookup becomes a direct reference; anything else intersects one
/// index match per field equality.
pub fn matched_records(table_name: &str, comparisons: Option<&Comparisons>) -> DriverResult<Expr> {
    let Some(comparisons) = comparisons else {
        return Ok(fql::intersection(vec![fql::match_(
            fql::index(format!("all_{table_name}")),
            vec![],
        )]));
    };

    if let Some(by_id) = &comparisons.by_id {
        if !comparisons.by_index.is_empty() {
            return Err(DriverError::not_supported(
                "When querying by ID, including other conditions in the WHERE \
                 clause is not supported.",
            ));
        }

        let id = match by_id {
            Scalar::String(s) => s.clone(),
            Scalar::Int(i) => i.to_string(),
            other => {
                return Err(DriverError::programming(format!(
                    "Querying by ID requires a string or integer value, got {other:?}"
                )))
            }
        };
        return Ok(fql::ref_(fql::collection(table_name), id));
    }

    let matches = comparisons
        .by_index
        .iter()
        .map(|(field, value)| {
            fql::match_(
                fql::index(format!("{table_name}_by_{field}")),
                vec![Expr::Scalar(value.clone())],
            )
        })
        .collect();

    Ok(fql::intersection(matches))
}

/// Convenience wrapper: the WHERE group of a statement, if any.
pub fn find_where(statement: &Group) -> Option<&Group> {
    statement.find_group(GroupKind::Where, 0).map(|(_, g)| g)
}
