// SPDX-License-Identifier: Apache-2.0

//! Per-verb SQL-to-FQL translators and the statement dispatcher.

pub mod alter;
pub mod create;
pub mod delete;
pub mod drop;
pub mod information_schema;
pub mod insert;
pub mod select;
pub mod update;
pub mod where_clause;

use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::Token;

use crate::error::{DriverError, DriverResult};
use crate::fql::Expr;
use crate::token::Group;

pub use insert::InsertPlan;
pub use select::{DocumentSelect, SelectPlan};

/// The translated form of one SQL statement, dispatched on its leading
/// keyword.
#[derive(Debug, Clone, PartialEq)]
pub enum Translation {
    Select(SelectPlan),
    /// CREATE may emit several expressions, executed in order.
    Create(Vec<Expr>),
    Drop(Expr),
    Insert(InsertPlan),
    Update(Expr),
    Delete(Expr),
    Alter(Expr),
}

pub fn translate_statement(statement: &Group) -> DriverResult<Translation> {
    let keyword = match statement.first_token() {
        Some(Token::Word(word)) => word.keyword,
        _ => Keyword::NoKeyword,
    };

    match keyword {
        Keyword::SELECT => Ok(Translation::Select(select::translate_select(statement)?)),
        Keyword::CREATE => Ok(Translation::Create(create::translate_create(statement)?)),
        Keyword::DROP => Ok(Translation::Drop(drop::translate_drop(statement)?)),
        Keyword::INSERT => Ok(Translation::Insert(insert::translate_insert(statement)?)),
        Keyword::UPDATE => Ok(Translation::Update(update::translate_update(statement)?)),
        Keyword::DELETE => Ok(Translation::Delete(delete::translate_delete(statement)?)),
        Keyword::ALTER => Ok(Translation::Alter(alter::translate_alter(statement)?)),
        _ => Err(DriverError::not_supported(
            "Only SELECT, CREATE, DROP, INSERT, UPDATE, DELETE, and ALTER \
             statements are currently supported",
        )),
    }
}
