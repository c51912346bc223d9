// SPDX-License-Identifier: Apache-2.0

//! ALTER translation. Only `ALTER TABLE t ALTER COLUMN c DROP DEFAULT` is
//! supported; everything else fails with a construct-specific message.

use std::collections::BTreeMap;

use sqlparser::keywords::Keyword;

use crate::error::{DriverError, DriverResult};
use crate::fql::{self, Expr, Scalar};
use crate::model::{Column, Table};
use crate::token::{Group, GroupKind};

pub fn translate_alter(statement: &Group) -> DriverResult<Expr> {
    let table_idx = statement.find_keyword(Keyword::TABLE, 0).ok_or_else(|| {
        DriverError::not_supported("For ALTER queries, only ALTER TABLE is currently supported.")
    })?;
    let (idx, table_identifier) = statement
        .find_group(GroupKind::Identifier, table_idx)
        .ok_or_else(|| DriverError::programming("ALTER TABLE requires a table name"))?;
    let table = Table::from_identifier(table_identifier)?;

    let second_alter = statement.find_keyword(Keyword::ALTER, idx + 1);
    let column_keyword = statement.find_keyword(Keyword::COLUMN, idx + 1);
    if second_alter.is_none() || column_keyword.is_none() {
        return Err(DriverError::not_supported(
            "For ALTER TABLE queries, only ALTER COLUMN is currently supported.",
        ));
    }

    let (column_idx, column_identifier) = statement
        .find_group(GroupKind::Identifier, column_keyword.unwrap())
        .ok_or_else(|| DriverError::programming("ALTER COLUMN requires a column name"))?;
    let column = Column::from_identifier(column_identifier)?;

    let drop_keyword = statement.find_keyword(Keyword::DROP, column_idx + 1);
    let default_keyword = statement.find_keyword(Keyword::DEFAULT, column_idx + 1);
    if drop_keyword.is_none() || default_keyword.is_none() {
        return Err(DriverError::not_supported(
            "For statements with ALTER COLUMN, only DROP DEFAULT is currently supported.",
        ));
    }

    Ok(drop_default(&table.name, &column.name))
}

/// Nulls out the field's default in the collection metadata and returns the
/// collection ref as `{data: [{id: <ref>}]}`.
fn drop_default(table_name: &str, column_name: &str) -> Expr {
    let nulled = fql::object(BTreeMap::from([(
        "metadata".to_string(),
        fql::object(BTreeMap::from([(
            "fields".to_string(),
            fql::object(BTreeMap::from([(
                column_name.to_string(),
                fql::object(BTreeMap::from([(
                    "default".to_string(),
                    Expr::Scalar(Scalar::Null),
                )])),
            )])),
        )])),
    )]));

    let drop_default = fql::update(
        fql::collection(table_name),
        fql::object(BTreeMap::from([("data".to_string(), nulled)])),
    );

    fql::let_(
        vec![(
            "collection".to_string(),
            fql::select(&["ref"], drop_default),
        )],
        fql::object(BTreeMap::from([(
            "data".to_string(),
            Expr::Array(vec![fql::object(BTreeMap::from([(
                "id".to_string(),
                fql::var("collection"),
            )]))]),
        )])),
    )
}
