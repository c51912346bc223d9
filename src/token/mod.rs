// SPDX-License-Identifier: Apache-2.0

//! Token model for SQL statements.
//!
//! Lexing is delegated to `sqlparser`; this module adds the structure the
//! translators work with: a tree of leaf tokens and typed composite groups
//! (identifiers, parentheses, WHERE clauses, comparisons, …) plus small
//! combinators for walking it.

pub mod format;
pub mod lexer;
pub mod value;

use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::Token;

/// Classification of a composite token group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Statement,
    Parenthesis,
    Identifier,
    IdentifierList,
    Function,
    Where,
    Comparison,
    Values,
}

/// A node in the grouped token tree: either a raw lexer token or a group.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf(Token),
    Group(Group),
}

/// A composite group of nodes with a classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub kind: GroupKind,
    pub children: Vec<Node>,
}

/// Keywords with structural meaning in the supported SQL subset. Anything
/// else — including soft keywords like `NAME`, `YEAR` or SQL type names —
/// may still be used as an identifier.
pub fn is_reserved(keyword: Keyword) -> bool {
    matches!(
        keyword,
        Keyword::SELECT
            | Keyword::FROM
            | Keyword::WHERE
            | Keyword::AND
            | Keyword::OR
            | Keyword::NOT
            | Keyword::NULL
            | Keyword::AS
            | Keyword::CREATE
            | Keyword::TABLE
            | Keyword::INDEX
            | Keyword::UNIQUE
            | Keyword::PRIMARY
            | Keyword::KEY
            | Keyword::FOREIGN
            | Keyword::REFERENCES
            | Keyword::CONSTRAINT
            | Keyword::DEFAULT
            | Keyword::CHECK
            | Keyword::INSERT
            | Keyword::INTO
            | Keyword::VALUES
            | Keyword::UPDATE
            | Keyword::SET
            | Keyword::DELETE
            | Keyword::DROP
            | Keyword::ALTER
            | Keyword::COLUMN
            | Keyword::ON
            | Keyword::BETWEEN
            | Keyword::LIKE
            | Keyword::IN
            | Keyword::TRUE
            | Keyword::FALSE
            | Keyword::NONE
    )
}

/// Whether a token can act as a name (identifier part).
pub fn is_name_token(token: &Token) -> bool {
    match token {
        Token::Word(word) => word.quote_style.is_some() || !is_reserved(word.keyword),
        _ => false,
    }
}

/// The textual value of a name token.
pub fn name_value(token: &Token) -> Option<&str> {
    match token {
        Token::Word(word) if is_name_token(token) => Some(&word.value),
        _ => None,
    }
}

/// Whether a token is the given keyword.
pub fn is_keyword(token: &Token, keyword: Keyword) -> bool {
    matches!(token, Token::Word(word) if word.keyword == keyword && word.quote_style.is_none())
}

/// Whether a token is a comparison operator.
pub fn is_comparison_op(token: &Token) -> bool {
    matches!(
        token,
        Token::Eq | Token::Neq | Token::Lt | Token::Gt | Token::LtEq | Token::GtEq
    )
}

impl Node {
    pub fn as_leaf(&self) -> Option<&Token> {
        match self {
            Node::Leaf(token) => Some(token),
            Node::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Node::Group(group) => Some(group),
            Node::Leaf(_) => None,
        }
    }

    pub fn group_of(&self, kind: GroupKind) -> Option<&Group> {
        self.as_group().filter(|g| g.kind == kind)
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.as_leaf().is_some_and(|t| is_keyword(t, keyword))
    }

    pub fn name_value(&self) -> Option<&str> {
        self.as_leaf().and_then(name_value)
    }
}

impl Group {
    pub fn new(kind: GroupKind, children: Vec<Node>) -> Self {
        Self { kind, children }
    }

    /// First child node satisfying the predicate, searching from `from`
    /// (inclusive).
    pub fn find_first<P>(&self, from: usize, pred: P) -> Option<(usize, &Node)>
    where
        P: Fn(&Node) -> bool,
    {
        self.children
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, node)| pred(node))
    }

    /// First child group with the given kind, searching from `from`.
    pub fn find_group(&self, kind: GroupKind, from: usize) -> Option<(usize, &Group)> {
        self.find_first(from, |n| n.group_of(kind).is_some())
            .map(|(i, n)| (i, n.as_group().unwrap()))
    }

    /// First child group matching any of the given kinds.
    pub fn find_any_group(&self, kinds: &[GroupKind], from: usize) -> Option<(usize, &Group)> {
        self.find_first(from, |n| {
            n.as_group().is_some_and(|g| kinds.contains(&g.kind))
        })
        .map(|(i, n)| (i, n.as_group().unwrap()))
    }

    /// Position of the first leaf with the given keyword, searching from
    /// `from`.
    pub fn find_keyword(&self, keyword: Keyword, from: usize) -> Option<usize> {
        self.find_first(from, |n| n.is_keyword(keyword)).map(|(i, _)| i)
    }

    /// Whether any leaf anywhere under this group is the given keyword.
    pub fn contains_keyword(&self, keyword: Keyword) -> bool {
        self.flatten().into_iter().any(|t| is_keyword(t, keyword))
    }

    /// Depth-first sequence of leaf tokens.
    pub fn flatten(&self) -> Vec<&Token> {
        let mut leaves = Vec::new();
        collect_leaves(&self.children, &mut leaves);
        leaves
    }

    pub fn first_token(&self) -> Option<&Token> {
        self.flatten().first().copied()
    }

    /// Reconstructs SQL-ish text for this group, used for function column
    /// names and error messages.
    pub fn sql_text(&self) -> String {
        render_nodes(&self.children, self.kind == GroupKind::Parenthesis)
    }
}

fn collect_leaves<'a>(nodes: &'a [Node], out: &mut Vec<&'a Token>) {
    for node in nodes {
        match node {
            Node::Leaf(token) => out.push(token),
            Node::Group(group) => collect_leaves(&group.children, out),
        }
    }
}

fn render_nodes(nodes: &[Node], parenthesized: bool) -> String {
    let mut out = String::new();
    if parenthesized {
        out.push('(');
    }

    let mut prev_tight = true;
    for node in nodes {
        let (text, tight_before, tight_after) = match node {
            Node::Leaf(Token::Period) => (".".to_string(), true, true),
            Node::Leaf(Token::Comma) => (",".to_string(), true, false),
            Node::Leaf(token) => (token.to_string(), false, false),
            Node::Group(group) if group.kind == GroupKind::Parenthesis => {
                (group.sql_text(), true, false)
            }
            Node::Group(group) => (group.sql_text(), false, false),
        };

        if !out.ends_with('(') && !out.is_empty() && !tight_before && !prev_tight {
            out.push(' ');
        }
        out.push_str(&text);
        prev_tight = tight_after;
    }

    if parenthesized {
        out.push(')');
    }
    out
}
