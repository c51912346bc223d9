// SPDX-License-Identifier: Apache-2.0

//! Introspection queries over `INFORMATION_SCHEMA` pseudo-tables.
//!
//! Only the exact query shapes an ORM dialect issues are supported: listing
//! collections, reading one collection's field metadata, and enumerating the
//! indexes built over one collection.

use crate::error::{DriverError, DriverResult};
use crate::fql::{self, Expr, Scalar};
use crate::token::Group;

use super::where_clause::{find_where, parse_where};

pub const TABLES: &str = "INFORMATION_SCHEMA.TABLES";
pub const COLUMNS: &str = "INFORMATION_SCHEMA.COLUMNS";
pub const CONSTRAINTS: &str = "INFORMATION_SCHEMA.CONSTRAINT_TABLE_USAGE";

/// A recognized introspection query.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoSchemaQuery {
    /// All collections.
    Tables,
    /// Field metadata for one collection.
    Columns { table_name: String },
    /// Indexes whose source is one collection.
    Constraints { table_name: String },
}

pub fn parse(table_name: &str, statement: &Group) -> DriverResult<InfoSchemaQuery> {
    match table_name {
        TABLES => Ok(InfoSchemaQuery::Tables),
        COLUMNS => Ok(InfoSchemaQuery::Columns {
            table_name: where_table_name(statement, "SELECT COLUMN_NAME")?,
        }),
        CONSTRAINTS => Ok(InfoSchemaQuery::Constraints {
            table_name: where_table_name(statement, &format!("SELECT FROM {CONSTRAINTS}"))?,
        }),
        other => Err(DriverError::not_supported(format!(
            "Unsupported INFORMATION_SCHEMA table: {other}"
        ))),
    }
}

/// Extracts the `WHERE TABLE_NAME = '<value>'` condition these queries are
/// required to carry.
fn where_table_name(statement: &Group, context: &str) -> DriverResult<String> {
    let unsupported =
        || DriverError::not_supported(format!("Only TABLE_NAME condition is supported for {context}"));

    let comparisons = parse_where(find_where(statement))?.ok_or_else(unsupported)?;

    match comparisons.by_index.as_slice() {
        [(column, Scalar::String(value))] if column == "TABLE_NAME" => Ok(value.clone()),
        _ => Err(unsupported()),
    }
}

/// `map(λc. get(c), paginate(collections()))`
pub fn tables_query() -> Expr {
    fql::map_(
        fql::lambda("collection", fql::get(fql::var("collection"))),
        fql::paginate(fql::collections()),
    )
}

/// `select(["data","metadata","fields"], get(collection(t)))`
pub fn columns_query(table_name: &str) -> Expr {
    fql::select(
        &["data", "metadata", "fields"],
        fql::get(fql::collection(table_name)),
    )
}

/// `map(λi. get(i), filter(λi. equals(select(["source","id"], get(i)), t),
/// paginate(indexes())))`
pub fn constraints_query(table_name: &str) -> Expr {
    let is_based_on_collection = fql::lambda(
        "index",
        fql::equals(vec![
            fql::select(&["source", "id"], fql::get(fql::var("index"))),
            Expr::Scalar(Scalar::String(table_name.to_string())),
        ]),
    );

    fql::map_(
        fql::lambda("index", fql::get(fql::var("index"))),
        fql::filter_(is_based_on_collection, fql::paginate(fql::indexes())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::lexer::parse_single_statement;
    use serde_json::json;

    fn parse_info(sql: &str) -> DriverResult<InfoSchemaQuery> {
        let statement = parse_single_statement(sql).unwrap();
        let table_name = sql
            .split_whitespace()
            .find(|w| w.starts_with("INFORMATION_SCHEMA"))
            .unwrap()
            .to_string();
        parse(&table_name, &statement)
    }

    #[test]
    fn recognizes_the_three_pseudo_tables() {
        assert_eq!(
            parse_info("SELECT * FROM INFORMATION_SCHEMA.TABLES").unwrap(),
            InfoSchemaQuery::Tables
        );
        assert_eq!(
            parse_info("SELECT * FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = 'users'")
                .unwrap(),
            InfoSchemaQuery::Columns { table_name: "users".to_string() }
        );
        assert_eq!(
            parse_info(
                "SELECT * FROM INFORMATION_SCHEMA.CONSTRAINT_TABLE_USAGE WHERE TABLE_NAME = 'users'"
            )
            .unwrap(),
            InfoSchemaQuery::Constraints { table_name: "users".to_string() }
        );
    }

    #[test]
    fn unknown_pseudo_tables_are_rejected() {
        let err = parse_info("SELECT * FROM INFORMATION_SCHEMA.VIEWS").unwrap_err();
        assert!(matches!(err, DriverError::NotSupported { .. }));
    }

    #[test]
    fn columns_query_requires_a_table_name_condition() {
        let err = parse_info("SELECT * FROM INFORMATION_SCHEMA.COLUMNS").unwrap_err();
        assert!(err
            .message()
            .contains("Only TABLE_NAME condition is supported for SELECT COLUMN_NAME"));

        let err =
            parse_info("SELECT * FROM INFORMATION_SCHEMA.COLUMNS WHERE OTHER = 'users'").unwrap_err();
        assert!(err.message().contains("Only TABLE_NAME condition"));
    }

    #[test]
    fn tables_query_paginates_collections() {
        assert_eq!(
            serde_json::to_value(tables_query()).unwrap(),
            json!({
                "map": {"lambda": "collection", "expr": {"get": {"var": "collection"}}},
                "collection": {"paginate": {"collections": null}}
            })
        );
    }

    #[test]
    fn columns_query_selects_field_metadata() {
        assert_eq!(
            serde_json::to_value(columns_query("users")).unwrap(),
            json!({
                "select": ["data", "metadata", "fields"],
                "from": {"get": {"collection": "users"}}
            })
        );
    }

    #[test]
    fn constraints_query_filters_indexes_by_source() {
        assert_eq!(
            serde_json::to_value(constraints_query("users")).unwrap(),
            json!({
                "map": {"lambda": "index", "expr": {"get": {"var": "index"}}},
                "collection": {
                    "filter": {
                        "lambda": "index",
                        "expr": {"equals": [
                            {"select": ["source", "id"], "from": {"get": {"var": "index"}}},
                            "users"
                        ]}
                    },
                    "collection": {"paginate": {"indexes": null}}
                }
            })
        );
    }
}
