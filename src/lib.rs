// SPDX-License-Identifier: Apache-2.0

//! SQL-to-FQL translation layer and driver for document databases.
//!
//! A subset of SQL (DDL + DML) is lexed into a token tree, interpreted by
//! per-verb translators and emitted as expressions in the database's
//! functional query algebra. The [`SqlDriver`] façade ties it together:
//! `sql(query)` formats the statement, translates it, executes the emitted
//! expressions in order and reshapes the response into tabular rows.

pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod fql;
pub mod model;
pub mod retry;
pub mod rows;
pub mod token;
pub mod translate;

pub use client::{HttpClient, QueryRunner};
pub use config::ConnectionConfig;
pub use driver::SqlDriver;
pub use error::{DriverError, DriverResult};
pub use fql::{Expr, Scalar};
pub use rows::Row;
pub use token::format::format_sql;
