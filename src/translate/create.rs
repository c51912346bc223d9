// SPDX-License-Identifier: Apache-2.0

//! CREATE TABLE and CREATE INDEX translation.
//!
//! Column definitions are split on top-level commas and classified in
//! priority order: PRIMARY KEY constraints, UNIQUE constraints, FOREIGN
//! KEYs, then ordinary column definitions. The result is the collection's
//! field metadata plus the index set derived from it.

use std::collections::BTreeMap;

use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::Token;

use crate::error::{DriverError, DriverResult};
use crate::fql::{self, Expr, Scalar};
use crate::model::{canonical_type, FieldsMetadata, ID_COLUMN};
use crate::token::value::extract_value;
use crate::token::{is_keyword, name_value, Group, GroupKind, Node};

pub fn translate_create(statement: &Group) -> DriverResult<Vec<Expr>> {
    if let Some(table_idx) = statement.find_keyword(Keyword::TABLE, 0) {
        return translate_create_table(statement, table_idx);
    }
    if let Some(index_idx) = statement.find_keyword(Keyword::INDEX, 0) {
        return translate_create_index(statement, index_idx);
    }
    Err(DriverError::not_supported(
        "Only TABLE and INDEX are supported in CREATE statements.",
    ))
}

/// Emits the collection creation followed by a compound expression for the
/// index set. The two must be dispatched separately: expressions inside a
/// `do` cannot reference names bound by earlier expressions in the same
/// request, so the collection has to exist before its indexes are created.
fn translate_create_table(statement: &Group, table_idx: usize) -> DriverResult<Vec<Expr>> {
    let (_, definition) = statement
        .find_group(GroupKind::Function, table_idx)
        .ok_or_else(|| {
            DriverError::programming("CREATE TABLE requires a table name and column definitions")
        })?;

    let table_name = definition.children[0]
        .name_value()
        .ok_or_else(|| DriverError::programming("CREATE TABLE requires a table name"))?
        .to_string();
    let columns = definition.children[1]
        .group_of(GroupKind::Parenthesis)
        .ok_or_else(|| DriverError::programming("CREATE TABLE requires column definitions"))?;

    let fields = extract_column_definitions(columns)?;

    let fields_wire = serde_json::to_value(&fields)
        .map_err(|e| DriverError::internal(format!("Failed to serialize field metadata: {e}")))?;
    let create_collection = fql::create_collection(fql::object(BTreeMap::from([
        ("name".to_string(), Expr::Scalar(Scalar::String(table_name.clone()))),
        (
            "data".to_string(),
            fql::object(BTreeMap::from([(
                "metadata".to_string(),
                fql::object(BTreeMap::from([(
                    "fields".to_string(),
                    fql::value_to_expr(&fields_wire),
                )])),
            )])),
        ),
    ])));

    let mut index_queries = vec![fql::create_index(fql::object(BTreeMap::from([
        ("name".to_string(), Expr::Scalar(Scalar::String(format!("all_{table_name}")))),
        ("source".to_string(), fql::collection(table_name.as_str())),
    ])))];

    // Unique columns and foreign keys are such common filter values that
    // indexes for them are created up front. Documents can always be fetched
    // by ID, so the reference field is never indexed.
    for (field_name, field_data) in &fields {
        if field_name == ID_COLUMN || !(field_data.unique || field_data.is_foreign_key()) {
            continue;
        }

        index_queries.push(fql::create_index(fql::object(BTreeMap::from([
            (
                "name".to_string(),
                Expr::Scalar(Scalar::String(format!("{table_name}_by_{field_name}"))),
            ),
            ("source".to_string(), fql::collection(table_name.as_str())),
            (
                "terms".to_string(),
                Expr::Array(vec![term_for_field(field_name)]),
            ),
            ("unique".to_string(), Expr::Scalar(Scalar::Bool(field_data.unique))),
        ]))));
    }

    // Return a ref from the compound expression.
    index_queries.push(fql::collection(table_name.as_str()));

    Ok(vec![create_collection, fql::do_(index_queries)])
}

/// `CREATE [UNIQUE] INDEX ON t(c1, c2, …)`. Any explicit index name is
/// ignored; the name is always derived from the sorted column list.
fn translate_create_index(statement: &Group, index_idx: usize) -> DriverResult<Vec<Expr>> {
    let unique = statement
        .find_keyword(Keyword::UNIQUE, 0)
        .is_some_and(|i| i < index_idx);

    let on_idx = statement
        .find_keyword(Keyword::ON, index_idx)
        .ok_or_else(|| DriverError::programming("CREATE INDEX requires an ON clause"))?;
    let (_, index_params) = statement
        .find_group(GroupKind::Function, on_idx)
        .ok_or_else(|| {
            DriverError::programming("CREATE INDEX requires a table name and column list")
        })?;

    let table_name = index_params.children[0]
        .name_value()
        .ok_or_else(|| DriverError::programming("CREATE INDEX requires a table name"))?
        .to_string();
    let column_group = index_params.children[1]
        .group_of(GroupKind::Parenthesis)
        .ok_or_else(|| DriverError::programming("CREATE INDEX requires a column list"))?;

    let index_fields: Vec<String> = column_group
        .flatten()
        .into_iter()
        .filter_map(name_value)
        .map(str::to_string)
        .collect();
    if index_fields.is_empty() {
        return Err(DriverError::programming("CREATE INDEX requires at least one column"));
    }

    let terms: Vec<Expr> = index_fields.iter().map(|f| term_for_field(f)).collect();

    let mut sorted_fields = index_fields;
    sorted_fields.sort_unstable();
    let index_name = format!("{table_name}_by_{}", sorted_fields.join("_and_"));

    Ok(vec![fql::do_(vec![
        fql::create_index(fql::object(BTreeMap::from([
            ("name".to_string(), Expr::Scalar(Scalar::String(index_name))),
            ("source".to_string(), fql::collection(table_name.as_str())),
            ("terms".to_string(), Expr::Array(terms)),
            ("unique".to_string(), Expr::Scalar(Scalar::Bool(unique))),
        ]))),
        fql::collection(table_name.as_str()),
    ])])
}

fn term_for_field(field_name: &str) -> Expr {
    fql::object(BTreeMap::from([(
        "field".to_string(),
        Expr::Array(vec![
            Expr::Scalar(Scalar::String("data".to_string())),
            Expr::Scalar(Scalar::String(field_name.to_string())),
        ]),
    )]))
}

fn extract_column_definitions(columns: &Group) -> DriverResult<FieldsMetadata> {
    let mut metadata = FieldsMetadata::new();

    for segment in split_top_level_commas(columns) {
        let tokens = flatten_nodes(&segment);
        if tokens.is_empty() {
            continue;
        }
        build_field_metadata(&mut metadata, &tokens)?;
    }

    Ok(metadata)
}

fn split_top_level_commas<'a>(group: &'a Group) -> Vec<Vec<&'a Node>> {
    let mut segments = vec![Vec::new()];
    for node in &group.children {
        if matches!(node.as_leaf(), Some(Token::Comma)) {
            segments.push(Vec::new());
        } else {
            segments.last_mut().unwrap().push(node);
        }
    }
    segments
}

fn flatten_nodes<'a>(nodes: &[&'a Node]) -> Vec<&'a Token> {
    let mut tokens = Vec::new();
    for node in nodes {
        match node {
            Node::Leaf(token) => tokens.push(token),
            Node::Group(group) => tokens.extend(group.flatten()),
        }
    }
    tokens
}

fn build_field_metadata(metadata: &mut FieldsMetadata, tokens: &[&Token]) -> DriverResult<()> {
    if define_primary_key(metadata, tokens)? {
        return Ok(());
    }
    if define_unique_constraint(metadata, tokens)? {
        return Ok(());
    }
    if define_foreign_key(metadata, tokens)? {
        return Ok(());
    }
    define_column(metadata, tokens)
}

fn position_keyword(tokens: &[&Token], keyword: Keyword, from: usize) -> Option<usize> {
    tokens
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, t)| is_keyword(t, keyword))
        .map(|(i, _)| i)
}

fn next_name<'a>(tokens: &[&'a Token], from: usize) -> Option<(usize, &'a str)> {
    tokens
        .iter()
        .enumerate()
        .skip(from)
        .find_map(|(i, t)| name_value(t).map(|name| (i, name)))
}

fn has_name_after(tokens: &[&Token], from: usize) -> bool {
    next_name(tokens, from).is_some()
}

/// `PRIMARY KEY (cols…)` or `CONSTRAINT … PRIMARY KEY (cols…)`. Marks each
/// listed column unique and not-null. An inline `PRIMARY KEY` with no
/// trailing column names is left for `define_column`.
fn define_primary_key(metadata: &mut FieldsMetadata, tokens: &[&Token]) -> DriverResult<bool> {
    let constraint = position_keyword(tokens, Keyword::CONSTRAINT, 0);
    let primary = position_keyword(tokens, Keyword::PRIMARY, constraint.map_or(0, |i| i + 1));

    if constraint.is_some() && primary.is_none() {
        return Err(DriverError::not_supported(
            "When a column definition clause begins with CONSTRAINT, \
             only a PRIMARY KEY constraint is supported",
        ));
    }

    let Some(primary) = primary else {
        return Ok(false);
    };
    if !has_name_after(tokens, primary + 1) {
        return Ok(false);
    }

    let mut idx = primary + 1;
    while let Some((found, name)) = next_name(tokens, idx) {
        idx = found + 1;
        // The reference field is managed by the database itself.
        if name == ID_COLUMN {
            continue;
        }
        let entry = metadata.entry(name.to_string()).or_default();
        entry.unique = true;
        entry.not_null = true;
    }

    Ok(true)
}

/// `UNIQUE (cols…)`. An inline `UNIQUE` with no trailing column names is
/// left for `define_column`.
fn define_unique_constraint(metadata: &mut FieldsMetadata, tokens: &[&Token]) -> DriverResult<bool> {
    let Some(unique) = position_keyword(tokens, Keyword::UNIQUE, 0) else {
        return Ok(false);
    };
    if !has_name_after(tokens, unique + 1) {
        return Ok(false);
    }

    let mut idx = unique + 1;
    while let Some((found, name)) = next_name(tokens, idx) {
        idx = found + 1;
        if name == ID_COLUMN {
            continue;
        }
        metadata.entry(name.to_string()).or_default().unique = true;
    }

    Ok(true)
}

/// `FOREIGN KEY (col) REFERENCES table(col)`.
fn define_foreign_key(metadata: &mut FieldsMetadata, tokens: &[&Token]) -> DriverResult<bool> {
    let Some(foreign) = position_keyword(tokens, Keyword::FOREIGN, 0) else {
        return Ok(false);
    };

    let malformed = || DriverError::programming("Malformed FOREIGN KEY constraint");

    let key = position_keyword(tokens, Keyword::KEY, foreign + 1).ok_or_else(malformed)?;
    let (idx, column_name) = next_name(tokens, key + 1).ok_or_else(malformed)?;
    let references = position_keyword(tokens, Keyword::REFERENCES, idx + 1).ok_or_else(malformed)?;
    let (idx, reference_table) = next_name(tokens, references + 1).ok_or_else(malformed)?;
    let (_, reference_column) = next_name(tokens, idx + 1).ok_or_else(malformed)?;

    metadata.entry(column_name.to_string()).or_default().references = Some(BTreeMap::from([(
        reference_table.to_string(),
        reference_column.to_string(),
    )]));

    Ok(true)
}

/// `NAME TYPE [NOT NULL] [UNIQUE] [PRIMARY KEY] [DEFAULT lit]`.
fn define_column(metadata: &mut FieldsMetadata, tokens: &[&Token]) -> DriverResult<()> {
    let (name_idx, column_name) = next_name(tokens, 0).ok_or_else(|| {
        DriverError::programming("Column definition is missing a column name")
    })?;

    // The reference field is generated by the database; definitions of it
    // are ignored.
    if column_name == ID_COLUMN {
        return Ok(());
    }
    let column_name = column_name.to_string();

    if position_keyword(tokens, Keyword::CHECK, 0).is_some() {
        return Err(DriverError::not_supported("CHECK keyword is not supported."));
    }

    let type_token = tokens[name_idx + 1..]
        .iter()
        .find(|t| matches!(t, Token::Word(_)))
        .ok_or_else(|| {
            DriverError::programming(format!("Column {column_name} is missing a data type"))
        })?;
    let type_name = match type_token {
        Token::Word(word) => word.value.as_str(),
        _ => unreachable!(),
    };
    let field_type = canonical_type(type_name).ok_or_else(|| {
        DriverError::not_supported(format!("Data type {type_name} is not supported"))
    })?;

    let is_primary_key = position_keyword(tokens, Keyword::PRIMARY, 0).is_some();
    let is_unique = position_keyword(tokens, Keyword::UNIQUE, 0).is_some();
    let is_not_null = (0..tokens.len().saturating_sub(1)).any(|i| {
        is_keyword(tokens[i], Keyword::NOT) && is_keyword(tokens[i + 1], Keyword::NULL)
    });

    let default = match position_keyword(tokens, Keyword::DEFAULT, 0) {
        Some(default_idx) => {
            let value_token = tokens.get(default_idx + 1).ok_or_else(|| {
                DriverError::programming(format!("Column {column_name} has DEFAULT with no value"))
            })?;
            extract_value(value_token)?
        }
        None => Scalar::Null,
    };

    let entry = metadata.entry(column_name).or_default();
    entry.unique = is_unique || is_primary_key || entry.unique;
    entry.not_null = is_not_null || is_primary_key || entry.not_null;
    entry.default = default;
    entry.field_type = field_type.to_string();

    Ok(())
}
