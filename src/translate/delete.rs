// SPDX-License-Identifier: Apache-2.0

//! DELETE translation.
//!
//! The matched-record expression feeds a single `get`, so a DELETE without a
//! WHERE clause only succeeds when the table holds at most one document.
//! The SQL surface has no bulk delete here.

use sqlparser::keywords::Keyword;

use crate::error::{DriverError, DriverResult};
use crate::fql::{self, Expr};
use crate::model::Table;
use crate::token::{Group, GroupKind};

use super::where_clause::{find_where, matched_records, parse_where};

pub fn translate_delete(statement: &Group) -> DriverResult<Expr> {
    let from_idx = statement
        .find_keyword(Keyword::FROM, 0)
        .ok_or_else(|| DriverError::programming("DELETE requires a FROM clause"))?;
    let (_, table_identifier) = statement
        .find_group(GroupKind::Identifier, from_idx)
        .ok_or_else(|| DriverError::programming("DELETE requires a table name"))?;
    let table = Table::from_identifier(table_identifier)?;

    let comparisons = parse_where(find_where(statement))?;
    let records_to_delete = matched_records(&table.name, comparisons.as_ref())?;

    Ok(fql::delete(fql::select(
        &["ref"],
        fql::get(records_to_delete),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::lexer::parse_single_statement;
    use serde_json::json;

    fn translate(sql: &str) -> DriverResult<Expr> {
        translate_delete(&parse_single_statement(sql).unwrap())
    }

    #[test]
    fn delete_by_id_targets_the_reference() {
        let expr = translate("DELETE FROM users WHERE id = '42'").unwrap();
        assert_eq!(
            serde_json::to_value(&expr).unwrap(),
            json!({"delete": {
                "select": "ref",
                "from": {"get": {"ref": {"collection": "users"}, "id": "42"}}
            }})
        );
    }

    #[test]
    fn delete_without_where_matches_through_the_all_index() {
        let expr = translate("DELETE FROM users").unwrap();
        assert_eq!(
            serde_json::to_value(&expr).unwrap(),
            json!({"delete": {
                "select": "ref",
                "from": {"get": {"intersection": [{"match": {"index": "all_users"}}]}}
            }})
        );
    }
}
