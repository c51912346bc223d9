// SPDX-License-Identifier: Apache-2.0

//! SQL lexing and token grouping.
//!
//! `sqlparser` provides the raw token stream; the passes here assemble it
//! into the grouped tree the translators consume. Grouping runs in a fixed
//! order: parentheses, identifiers/functions, VALUES clauses, comparisons,
//! WHERE clauses, identifier lists.

use sqlparser::dialect::GenericDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer};

use crate::error::{DriverError, DriverResult};

use super::{is_comparison_op, is_name_token, Group, GroupKind, Node};

/// Tokenizes a SQL string, whitespace and comments included.
pub fn tokenize(sql: &str) -> DriverResult<Vec<Token>> {
    Tokenizer::new(&GenericDialect {}, sql)
        .tokenize()
        .map_err(|e| DriverError::programming(format!("Failed to tokenize SQL: {e}")))
}

/// Parses a SQL string into grouped statement trees, split on `;`.
pub fn parse_statements(sql: &str) -> DriverResult<Vec<Group>> {
    let tokens: Vec<Token> = tokenize(sql)?
        .into_iter()
        .filter(|t| !matches!(t, Token::Whitespace(_) | Token::EOF))
        .collect();

    let mut statements = Vec::new();
    for chunk in tokens.split(|t| matches!(t, Token::SemiColon)) {
        if chunk.is_empty() {
            continue;
        }
        statements.push(group_statement(chunk)?);
    }
    Ok(statements)
}

/// Parses a SQL string that must contain exactly one statement.
pub fn parse_single_statement(sql: &str) -> DriverResult<Group> {
    let mut statements = parse_statements(sql)?;
    match statements.len() {
        0 => Err(DriverError::programming("The SQL string contains no statements.")),
        1 => Ok(statements.remove(0)),
        _ => Err(DriverError::not_supported(format!(
            "Only one SQL statement at a time is currently supported. \
             The following query has more than one:\n{sql}"
        ))),
    }
}

fn group_statement(tokens: &[Token]) -> DriverResult<Group> {
    let nodes = group_parens(tokens)?;
    Ok(Group::new(GroupKind::Statement, structure(nodes)))
}

fn group_parens(tokens: &[Token]) -> DriverResult<Vec<Node>> {
    fn walk(tokens: &[Token], i: &mut usize, nested: bool) -> DriverResult<Vec<Node>> {
        let mut nodes = Vec::new();
        while *i < tokens.len() {
            match &tokens[*i] {
                Token::LParen => {
                    *i += 1;
                    let inner = walk(tokens, i, true)?;
                    nodes.push(Node::Group(Group::new(GroupKind::Parenthesis, inner)));
                }
                Token::RParen => {
                    if nested {
                        *i += 1;
                        return Ok(nodes);
                    }
                    return Err(DriverError::programming(
                        "Unbalanced closing parenthesis in SQL statement.",
                    ));
                }
                token => {
                    nodes.push(Node::Leaf(token.clone()));
                    *i += 1;
                }
            }
        }
        if nested {
            return Err(DriverError::programming(
                "Unbalanced opening parenthesis in SQL statement.",
            ));
        }
        Ok(nodes)
    }

    let mut i = 0;
    walk(tokens, &mut i, false)
}

fn structure(nodes: Vec<Node>) -> Vec<Node> {
    let nodes: Vec<Node> = nodes
        .into_iter()
        .map(|node| match node {
            Node::Group(group) if group.kind == GroupKind::Parenthesis => Node::Group(
                Group::new(GroupKind::Parenthesis, structure(group.children)),
            ),
            other => other,
        })
        .collect();

    let nodes = group_identifiers(nodes);
    let nodes = group_values(nodes);
    let nodes = group_comparisons(nodes);
    let nodes = group_where(nodes);
    group_identifier_lists(nodes)
}

fn is_name_node(node: &Node) -> bool {
    node.as_leaf().is_some_and(is_name_token)
}

/// Groups `NAME (. NAME)* (AS NAME)?` chains into identifiers and
/// `NAME ( … )` into function groups (with an optional alias wrapper).
fn group_identifiers(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::new();
    let mut i = 0;

    while i < nodes.len() {
        if !is_name_node(&nodes[i]) {
            out.push(nodes[i].clone());
            i += 1;
            continue;
        }

        // A name directly followed by a parenthesis group is a function-style
        // group (also covers `table (columns…)` in INSERT / CREATE INDEX).
        if nodes
            .get(i + 1)
            .is_some_and(|n| n.group_of(GroupKind::Parenthesis).is_some())
        {
            let function = Group::new(
                GroupKind::Function,
                vec![nodes[i].clone(), nodes[i + 1].clone()],
            );
            i += 2;

            if nodes.get(i).is_some_and(|n| n.is_keyword(Keyword::AS))
                && nodes.get(i + 1).is_some_and(is_name_node)
            {
                out.push(Node::Group(Group::new(
                    GroupKind::Identifier,
                    vec![Node::Group(function), nodes[i].clone(), nodes[i + 1].clone()],
                )));
                i += 2;
            } else {
                out.push(Node::Group(function));
            }
            continue;
        }

        let mut children = vec![nodes[i].clone()];
        i += 1;

        while nodes.get(i).is_some_and(|n| matches!(n.as_leaf(), Some(Token::Period)))
            && nodes.get(i + 1).is_some_and(is_name_node)
        {
            children.push(nodes[i].clone());
            children.push(nodes[i + 1].clone());
            i += 2;
        }

        if nodes.get(i).is_some_and(|n| n.is_keyword(Keyword::AS))
            && nodes.get(i + 1).is_some_and(is_name_node)
        {
            children.push(nodes[i].clone());
            children.push(nodes[i + 1].clone());
            i += 2;
        }

        out.push(Node::Group(Group::new(GroupKind::Identifier, children)));
    }

    out
}

/// Groups a VALUES keyword with its following parenthesized tuples.
fn group_values(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::new();
    let mut i = 0;

    while i < nodes.len() {
        if !nodes[i].is_keyword(Keyword::VALUES) {
            out.push(nodes[i].clone());
            i += 1;
            continue;
        }

        let mut children = vec![nodes[i].clone()];
        i += 1;
        while nodes.get(i).is_some_and(|n| {
            n.group_of(GroupKind::Parenthesis).is_some()
                || matches!(n.as_leaf(), Some(Token::Comma))
        }) {
            children.push(nodes[i].clone());
            i += 1;
        }
        out.push(Node::Group(Group::new(GroupKind::Values, children)));
    }

    out
}

/// Groups `<identifier> <op> <operand>` triples into comparison groups.
fn group_comparisons(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::new();
    let mut i = 0;

    while i < nodes.len() {
        let lhs_is_comparable = nodes[i]
            .as_group()
            .is_some_and(|g| matches!(g.kind, GroupKind::Identifier | GroupKind::Function));
        let op_follows = nodes
            .get(i + 1)
            .and_then(|n| n.as_leaf())
            .is_some_and(is_comparison_op);

        if lhs_is_comparable && op_follows && nodes.get(i + 2).is_some() {
            out.push(Node::Group(Group::new(
                GroupKind::Comparison,
                vec![nodes[i].clone(), nodes[i + 1].clone(), nodes[i + 2].clone()],
            )));
            i += 3;
        } else {
            out.push(nodes[i].clone());
            i += 1;
        }
    }

    out
}

/// Wraps everything from a WHERE keyword to the end of the level into a
/// WHERE group.
fn group_where(nodes: Vec<Node>) -> Vec<Node> {
    let Some(where_idx) = nodes.iter().position(|n| n.is_keyword(Keyword::WHERE)) else {
        return nodes;
    };

    let mut out: Vec<Node> = nodes[..where_idx].to_vec();
    out.push(Node::Group(Group::new(
        GroupKind::Where,
        nodes[where_idx..].to_vec(),
    )));
    out
}

/// Wraps comma-separated runs of identifiers into identifier lists.
fn group_identifier_lists(nodes: Vec<Node>) -> Vec<Node> {
    let is_identifier =
        |node: &Node| node.as_group().is_some_and(|g| g.kind == GroupKind::Identifier);

    let mut out = Vec::new();
    let mut i = 0;

    while i < nodes.len() {
        let starts_run = is_identifier(&nodes[i])
            && (i == 0 || !is_identifier(&nodes[i - 1]))
            && nodes
                .get(i + 1)
                .is_some_and(|n| matches!(n.as_leaf(), Some(Token::Comma)))
            && nodes.get(i + 2).is_some_and(is_identifier);

        if !starts_run {
            out.push(nodes[i].clone());
            i += 1;
            continue;
        }

        let mut end = i;
        while nodes
            .get(end + 1)
            .is_some_and(|n| matches!(n.as_leaf(), Some(Token::Comma)))
            && nodes.get(end + 2).is_some_and(is_identifier)
        {
            end += 2;
        }

        out.push(Node::Group(Group::new(
            GroupKind::IdentifierList,
            nodes[i..=end].to_vec(),
        )));
        i = end + 1;
    }

    out
}
