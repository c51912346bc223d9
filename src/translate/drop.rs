// SPDX-License-Identifier: Apache-2.0

//! DROP TABLE translation.

use sqlparser::keywords::Keyword;

use crate::error::{DriverError, DriverResult};
use crate::fql::{self, Expr};
use crate::model::Table;
use crate::token::{Group, GroupKind};

pub fn translate_drop(statement: &Group) -> DriverResult<Expr> {
    let table_idx = statement
        .find_keyword(Keyword::TABLE, 0)
        .ok_or_else(|| DriverError::not_supported("Only DROP TABLE is currently supported."))?;
    let (_, table_identifier) = statement
        .find_group(GroupKind::Identifier, table_idx)
        .ok_or_else(|| DriverError::programming("DROP TABLE requires a table name"))?;
    let table = Table::from_identifier(table_identifier)?;

    Ok(fql::delete(fql::collection(table.name)))
}
