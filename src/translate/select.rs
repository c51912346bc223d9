// SPDX-License-Identifier: Apache-2.0

//! SELECT translation: projection parsing, table extraction and the
//! document-matching query. `INFORMATION_SCHEMA` pseudo-tables are detected
//! here and dispatched by parsed table name.

use sqlparser::keywords::Keyword;

use crate::error::{DriverError, DriverResult};
use crate::fql::{self, Expr};
use crate::model::{Column, Table};
use crate::token::{Group, GroupKind};

use super::information_schema::{self, InfoSchemaQuery};
use super::where_clause::{find_where, matched_records, parse_where};

/// A translated SELECT: either a document query against one table or an
/// introspection query against a pseudo-table.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectPlan {
    Documents(DocumentSelect),
    Info(InfoSchemaQuery),
}

/// A single-table document query plus the projection needed to shape rows.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSelect {
    pub query: Expr,
    pub table: Table,
}

pub fn translate_select(statement: &Group) -> DriverResult<SelectPlan> {
    let table_name = extract_table_name(statement)?;

    if table_name.starts_with("INFORMATION_SCHEMA.") {
        return Ok(SelectPlan::Info(information_schema::parse(
            &table_name,
            statement,
        )?));
    }

    let projection = statement
        .children
        .get(1)
        .ok_or_else(|| DriverError::programming("SELECT statement has no column list"))?;
    let columns = Column::from_identifier_group(projection)?;

    let mut qualifiers: Vec<&str> = columns
        .iter()
        .filter_map(|c| c.table_name.as_deref())
        .collect();
    qualifiers.sort_unstable();
    qualifiers.dedup();
    if qualifiers.len() > 1 {
        return Err(DriverError::not_supported(format!(
            "Only one table per query is currently supported, but received:\n{}",
            statement.sql_text()
        )));
    }

    let mut table = Table::new(table_name);
    for column in columns {
        table.add_column(column);
    }

    let comparisons = parse_where(find_where(statement))?;
    let matched = matched_records(&table.name, comparisons.as_ref())?;

    let query = fql::map_(
        fql::lambda("document", fql::get(fql::var("document"))),
        fql::paginate(matched),
    );

    Ok(SelectPlan::Documents(DocumentSelect { query, table }))
}

/// The table name following FROM. Multi-table FROM clauses are rejected.
fn extract_table_name(statement: &Group) -> DriverResult<String> {
    let from_idx = statement
        .find_keyword(Keyword::FROM, 0)
        .ok_or_else(|| DriverError::programming("SELECT statement has no FROM clause"))?;

    if statement.find_group(GroupKind::IdentifierList, from_idx).is_some() {
        return Err(DriverError::not_supported(format!(
            "Only one table per query is currently supported, but received:\n{}",
            statement.sql_text()
        )));
    }

    let (_, identifier) = statement
        .find_group(GroupKind::Identifier, from_idx)
        .ok_or_else(|| DriverError::programming("SELECT statement has no table name"))?;

    Table::from_identifier(identifier).map(|t| t.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::lexer::parse_single_statement;
    use serde_json::json;

    fn plan(sql: &str) -> DriverResult<SelectPlan> {
        translate_select(&parse_single_statement(sql).unwrap())
    }

    fn document_plan(sql: &str) -> DocumentSelect {
        match plan(sql).unwrap() {
            SelectPlan::Documents(p) => p,
            other => panic!("expected document plan, got {other:?}"),
        }
    }

    #[test]
    fn select_without_where_paginates_the_all_index() {
        let plan = document_plan("SELECT users.id FROM users");
        assert_eq!(
            serde_json::to_value(&plan.query).unwrap(),
            json!({
                "map": {"lambda": "document", "expr": {"get": {"var": "document"}}},
                "collection": {"paginate": {"intersection": [{"match": {"index": "all_users"}}]}}
            })
        );
        assert_eq!(plan.table.name, "users");
    }

    #[test]
    fn select_by_id_paginates_a_direct_reference() {
        let plan = document_plan(
            "SELECT users.id, users.name AS user_name FROM users WHERE users.id = '42'",
        );
        assert_eq!(
            serde_json::to_value(&plan.query).unwrap(),
            json!({
                "map": {"lambda": "document", "expr": {"get": {"var": "document"}}},
                "collection": {"paginate": {"ref": {"collection": "users"}, "id": "42"}}
            })
        );

        let aliases = plan.table.column_alias_map();
        assert_eq!(aliases["id"], "id");
        assert_eq!(aliases["name"], "user_name");
    }

    #[test]
    fn select_with_field_equality_uses_the_field_index() {
        let plan = document_plan("SELECT * FROM users WHERE users.name = 'Bob'");
        assert_eq!(
            serde_json::to_value(&plan.query).unwrap(),
            json!({
                "map": {"lambda": "document", "expr": {"get": {"var": "document"}}},
                "collection": {"paginate": {"intersection": [
                    {"match": {"index": "users_by_name"}, "terms": ["Bob"]}
                ]}}
            })
        );
    }

    #[test]
    fn select_across_two_tables_is_rejected() {
        let err = plan("SELECT users.id, teams.id FROM users").unwrap_err();
        assert!(matches!(err, DriverError::NotSupported { .. }));
        assert!(err.message().contains("Only one table per query"));
    }

    #[test]
    fn multi_table_from_clause_is_rejected() {
        let err = plan("SELECT * FROM users, teams").unwrap_err();
        assert!(err.message().contains("Only one table per query"));
    }

    #[test]
    fn information_schema_tables_dispatch_by_name() {
        match plan("SELECT * FROM INFORMATION_SCHEMA.TABLES").unwrap() {
            SelectPlan::Info(InfoSchemaQuery::Tables) => {}
            other => panic!("expected INFORMATION_SCHEMA.TABLES plan, got {other:?}"),
        }
    }
}
