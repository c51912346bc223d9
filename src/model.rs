// SPDX-License-Identifier: Apache-2.0

//! Typed views over parsed identifier groups and the per-column metadata
//! stored alongside each collection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::Token;

use crate::error::{DriverError, DriverResult};
use crate::fql::Scalar;
use crate::token::{Group, GroupKind, Node};

/// The synthetic document-reference field backing the SQL `id` column.
pub const REF_FIELD: &str = "ref";
pub const ID_COLUMN: &str = "id";

/// A column parsed from an identifier group.
///
/// `name` is the underlying document field — the SQL column `id` maps to the
/// reference field `ref` — while `alias` is the key the column takes in
/// result rows, defaulting to the SQL name.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub alias: String,
    pub table_name: Option<String>,
}

impl Column {
    fn new(table_name: Option<String>, sql_name: String, alias: Option<String>) -> Self {
        let alias = alias.unwrap_or_else(|| sql_name.clone());
        let name = if sql_name == ID_COLUMN {
            REF_FIELD.to_string()
        } else {
            sql_name
        };
        Self { name, alias, table_name }
    }

    /// Builds a column from a single identifier group
    /// (`column`, `table.column`, `… AS alias`, or an aliased function).
    pub fn from_identifier(identifier: &Group) -> DriverResult<Column> {
        debug_assert_eq!(identifier.kind, GroupKind::Identifier);

        if let Some(function) = identifier.children.first().and_then(|n| n.group_of(GroupKind::Function)) {
            let alias = alias_of(identifier).map(str::to_string);
            let text = function.sql_text();
            return Ok(Column { name: text.clone(), alias: alias.unwrap_or(text), table_name: None });
        }

        let mut names: Vec<String> = Vec::new();
        let mut alias = None;
        let mut nodes = identifier.children.iter();
        while let Some(node) = nodes.next() {
            if node.is_keyword(Keyword::AS) {
                alias = nodes.next().and_then(Node::name_value).map(str::to_string);
                break;
            }
            if let Some(name) = node.name_value() {
                names.push(name.to_string());
            }
        }

        match names.len() {
            1 => Ok(Column::new(None, names.pop().unwrap(), alias)),
            2 => {
                let column = names.pop().unwrap();
                Ok(Column::new(names.pop(), column, alias))
            }
            _ => Err(DriverError::not_supported(format!(
                "Unsupported column identifier: {}",
                identifier.sql_text()
            ))),
        }
    }

    /// Builds the column list for a projection or INSERT column group. The
    /// node may be a single identifier, an identifier list, a bare function
    /// group, or the `*` wildcard.
    pub fn from_identifier_group(node: &Node) -> DriverResult<Vec<Column>> {
        if matches!(node.as_leaf(), Some(Token::Mul)) {
            return Ok(vec![Column {
                name: "*".to_string(),
                alias: "*".to_string(),
                table_name: None,
            }]);
        }

        let Some(group) = node.as_group() else {
            return Err(DriverError::not_supported(
                "Expected a column identifier or list of identifiers",
            ));
        };

        match group.kind {
            GroupKind::Identifier => Ok(vec![Column::from_identifier(group)?]),
            GroupKind::Function => {
                let text = group.sql_text();
                Ok(vec![Column { name: text.clone(), alias: text, table_name: None }])
            }
            GroupKind::IdentifierList => group
                .children
                .iter()
                .filter_map(|n| n.group_of(GroupKind::Identifier))
                .map(Column::from_identifier)
                .collect(),
            _ => Err(DriverError::not_supported(
                "Expected a column identifier or list of identifiers",
            )),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.name == "*"
    }

    /// The key this column has in a flattened result row before aliasing.
    pub fn source_key(&self) -> &str {
        if self.name == REF_FIELD {
            ID_COLUMN
        } else {
            &self.name
        }
    }
}

fn alias_of(identifier: &Group) -> Option<&str> {
    let as_idx = identifier.find_keyword(Keyword::AS, 0)?;
    identifier.children.get(as_idx + 1).and_then(Node::name_value)
}

/// A table parsed from an identifier group, owning its projected columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), columns: Vec::new() }
    }

    /// Builds a table from the identifier following FROM/INTO/UPDATE.
    /// Dotted names (e.g. `INFORMATION_SCHEMA.TABLES`) stay dotted.
    pub fn from_identifier(identifier: &Group) -> DriverResult<Table> {
        let names: Vec<&str> = identifier
            .children
            .iter()
            .filter_map(Node::name_value)
            .collect();
        if names.is_empty() {
            return Err(DriverError::not_supported(format!(
                "Unsupported table identifier: {}",
                identifier.sql_text()
            )));
        }
        Ok(Table::new(names.join(".")))
    }

    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    /// Row-key → alias map for the owned columns.
    pub fn column_alias_map(&self) -> BTreeMap<String, String> {
        self.columns
            .iter()
            .filter(|c| !c.is_wildcard())
            .map(|c| (c.source_key().to_string(), c.alias.clone()))
            .collect()
    }
}

/// The operator subset a WHERE clause reduces to: a direct ID lookup and/or
/// equality matches served by per-field indexes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Comparisons {
    pub by_id: Option<Scalar>,
    pub by_index: Vec<(String, Scalar)>,
}

/// Constraints and type information for one column, persisted in the
/// collection's `data.metadata.fields` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMetadata {
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub default: Scalar,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<BTreeMap<String, String>>,
}

impl Default for FieldMetadata {
    fn default() -> Self {
        Self {
            unique: false,
            not_null: false,
            default: Scalar::Null,
            field_type: String::new(),
            references: None,
        }
    }
}

impl FieldMetadata {
    pub fn is_foreign_key(&self) -> bool {
        self.references.is_some()
    }
}

/// Field name → metadata, in deterministic (sorted) order.
pub type FieldsMetadata = BTreeMap<String, FieldMetadata>;

/// Maps a SQL data type name to the database's canonical type.
pub fn canonical_type(sql_type: &str) -> Option<&'static str> {
    let canonical = match sql_type.to_uppercase().as_str() {
        "CHAR" | "VARCHAR" | "BINARY" | "VARBINARY" | "TINYBLOB" | "TINYTEXT" | "TEXT"
        | "BLOB" | "MEDIUMTEXT" | "MEDIUMBLOB" | "LONGTEXT" | "LONGBLOB" | "ENUM" | "SET" => {
            "String"
        }
        "BIT" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT" | "YEAR" => {
            "Integer"
        }
        "FLOAT" | "DOUBLE" | "DOUBLE PRECISION" | "DECIMAL" | "DEC" => "Float",
        "BOOL" | "BOOLEAN" => "Boolean",
        "DATE" => "Date",
        "DATETIME" | "TIMESTAMP" => "TimeStamp",
        // The database has no concept of time independent of the date.
        "TIME" => "String",
        _ => return None,
    };
    Some(canonical)
}
