// SPDX-License-Identifier: Apache-2.0

//! The document database's query algebra.
//!
//! Queries are trees of [`Expr`] nodes, one variant per query primitive,
//! built through the constructor functions below and serialized to the wire
//! JSON format by a single `Serialize` implementation. The translator only
//! composes expressions; it never interprets them.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Deserializer, Serialize};

/// A scalar value as it travels between SQL literals, query expressions and
/// result rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

impl Default for Scalar {
    fn default() -> Self {
        Scalar::Null
    }
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Converts a plain wire JSON value into a scalar. Timestamps arrive as
    /// `{"@ts": <rfc3339>}`, dates as `{"@date": <yyyy-mm-dd>}`; any other
    /// nested list or map is not a scalar.
    pub fn from_wire(value: &serde_json::Value) -> Result<Self, String> {
        match value {
            serde_json::Value::Null => Ok(Scalar::Null),
            serde_json::Value::Bool(b) => Ok(Scalar::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Scalar::Int(i))
                } else {
                    Ok(Scalar::Float(n.as_f64().unwrap_or_default()))
                }
            }
            serde_json::Value::String(s) => Ok(Scalar::String(s.clone())),
            serde_json::Value::Object(map) => {
                if let Some(ts) = map.get("@ts").and_then(|v| v.as_str()) {
                    let parsed = DateTime::parse_from_rfc3339(ts)
                        .map_err(|e| format!("invalid wire timestamp {ts:?}: {e}"))?;
                    Ok(Scalar::Timestamp(parsed.with_timezone(&Utc)))
                } else if let Some(date) = map.get("@date").and_then(|v| v.as_str()) {
                    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                        .map_err(|e| format!("invalid wire date {date:?}: {e}"))?;
                    Ok(Scalar::Date(parsed))
                } else {
                    Err(format!("cannot convert nested map to a scalar: {value}"))
                }
            }
            serde_json::Value::Array(_) => {
                Err(format!("cannot convert list to a scalar: {value}"))
            }
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Null => serializer.serialize_unit(),
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Int(i) => serializer.serialize_i64(*i),
            Scalar::Float(f) => serializer.serialize_f64(*f),
            Scalar::String(s) => serializer.serialize_str(s),
            Scalar::Date(d) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("@date", &d.format("%Y-%m-%d").to_string())?;
                map.end()
            }
            Scalar::Timestamp(ts) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("@ts", &ts.to_rfc3339())?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Scalar::from_wire(&value).map_err(serde::de::Error::custom)
    }
}

/// A node in the query expression tree, one variant per primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Scalar(Scalar),
    Array(Vec<Expr>),
    Object(BTreeMap<String, Expr>),
    Get(Box<Expr>),
    Map { lambda: Box<Expr>, collection: Box<Expr> },
    Filter { lambda: Box<Expr>, collection: Box<Expr> },
    Paginate(Box<Expr>),
    Match { index: Box<Expr>, terms: Vec<Expr> },
    Intersection(Vec<Expr>),
    Ref { collection: Box<Expr>, id: String },
    Collection(String),
    Collections,
    Index(String),
    Indexes,
    CreateCollection(Box<Expr>),
    CreateIndex(Box<Expr>),
    Create { collection: Box<Expr>, params: Box<Expr> },
    Update { target: Box<Expr>, params: Box<Expr> },
    Delete(Box<Expr>),
    Select { path: Vec<String>, from: Box<Expr> },
    Let { bindings: Vec<(String, Expr)>, body: Box<Expr> },
    Var(String),
    Lambda { param: String, body: Box<Expr> },
    Do(Vec<Expr>),
    Count(Box<Expr>),
    Equals(Vec<Expr>),
}

impl From<Scalar> for Expr {
    fn from(value: Scalar) -> Self {
        Expr::Scalar(value)
    }
}

pub fn get(expr: Expr) -> Expr {
    Expr::Get(Box::new(expr))
}

pub fn map_(lambda: Expr, collection: Expr) -> Expr {
    Expr::Map { lambda: Box::new(lambda), collection: Box::new(collection) }
}

pub fn filter_(lambda: Expr, collection: Expr) -> Expr {
    Expr::Filter { lambda: Box::new(lambda), collection: Box::new(collection) }
}

pub fn paginate(expr: Expr) -> Expr {
    Expr::Paginate(Box::new(expr))
}

pub fn match_(index: Expr, terms: Vec<Expr>) -> Expr {
    Expr::Match { index: Box::new(index), terms }
}

pub fn intersection(exprs: Vec<Expr>) -> Expr {
    Expr::Intersection(exprs)
}

pub fn ref_(collection: Expr, id: impl Into<String>) -> Expr {
    Expr::Ref { collection: Box::new(collection), id: id.into() }
}

pub fn collection(name: impl Into<String>) -> Expr {
    Expr::Collection(name.into())
}

pub fn collections() -> Expr {
    Expr::Collections
}

pub fn index(name: impl Into<String>) -> Expr {
    Expr::Index(name.into())
}

pub fn indexes() -> Expr {
    Expr::Indexes
}

pub fn create_collection(params: Expr) -> Expr {
    Expr::CreateCollection(Box::new(params))
}

pub fn create_index(params: Expr) -> Expr {
    Expr::CreateIndex(Box::new(params))
}

pub fn create(collection: Expr, params: Expr) -> Expr {
    Expr::Create { collection: Box::new(collection), params: Box::new(params) }
}

pub fn update(target: Expr, params: Expr) -> Expr {
    Expr::Update { target: Box::new(target), params: Box::new(params) }
}

pub fn delete(target: Expr) -> Expr {
    Expr::Delete(Box::new(target))
}

pub fn select(path: &[&str], from: Expr) -> Expr {
    Expr::Select {
        path: path.iter().map(|p| p.to_string()).collect(),
        from: Box::new(from),
    }
}

pub fn let_(bindings: Vec<(String, Expr)>, body: Expr) -> Expr {
    Expr::Let { bindings, body: Box::new(body) }
}

pub fn var(name: impl Into<String>) -> Expr {
    Expr::Var(name.into())
}

pub fn lambda(param: impl Into<String>, body: Expr) -> Expr {
    Expr::Lambda { param: param.into(), body: Box::new(body) }
}

pub fn do_(exprs: Vec<Expr>) -> Expr {
    Expr::Do(exprs)
}

pub fn count(expr: Expr) -> Expr {
    Expr::Count(Box::new(expr))
}

pub fn equals(exprs: Vec<Expr>) -> Expr {
    Expr::Equals(exprs)
}

pub fn object(entries: BTreeMap<String, Expr>) -> Expr {
    Expr::Object(entries)
}

/// Converts a plain JSON value into an equivalent expression, re-tagging
/// serialized timestamps and dates as scalars. Used when feeding serde-built
/// payloads (e.g. field metadata) into an expression tree.
pub fn value_to_expr(value: &serde_json::Value) -> Expr {
    if let Ok(scalar) = Scalar::from_wire(value) {
        return Expr::Scalar(scalar);
    }

    match value {
        serde_json::Value::Array(items) => Expr::Array(items.iter().map(value_to_expr).collect()),
        serde_json::Value::Object(map) => Expr::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), value_to_expr(v)))
                .collect(),
        ),
        // Scalar::from_wire already covered every other shape.
        _ => Expr::Scalar(Scalar::Null),
    }
}

/// Serializes object literals without the `object` wire wrapper.
struct RawObject<'a>(&'a BTreeMap<String, Expr>);

impl Serialize for RawObject<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// A single `let` binding, serialized as a one-entry map to preserve order.
struct Binding<'a>(&'a str, &'a Expr);

impl Serialize for Binding<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.0, self.1)?;
        map.end()
    }
}

/// Select paths of length one serialize as a bare string, longer paths as an
/// array, matching the wire format expected by the database.
struct Path<'a>(&'a [String]);

impl Serialize for Path<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            [single] => serializer.serialize_str(single),
            path => path.serialize(serializer),
        }
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        fn one<S: Serializer>(s: S, key: &str, value: &impl Serialize) -> Result<S::Ok, S::Error> {
            let mut map = s.serialize_map(Some(1))?;
            map.serialize_entry(key, value)?;
            map.end()
        }

        match self {
            Expr::Scalar(scalar) => scalar.serialize(serializer),
            Expr::Array(items) => items.serialize(serializer),
            Expr::Object(entries) => one(serializer, "object", &RawObject(entries)),
            Expr::Get(expr) => one(serializer, "get", expr),
            Expr::Map { lambda, collection } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("map", lambda)?;
                map.serialize_entry("collection", collection)?;
                map.end()
            }
            Expr::Filter { lambda, collection } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("filter", lambda)?;
                map.serialize_entry("collection", collection)?;
                map.end()
            }
            Expr::Paginate(expr) => one(serializer, "paginate", expr),
            Expr::Match { index, terms } => {
                if terms.is_empty() {
                    one(serializer, "match", index)
                } else {
                    let mut map = serializer.serialize_map(Some(2))?;
                    map.serialize_entry("match", index)?;
                    map.serialize_entry("terms", terms)?;
                    map.end()
                }
            }
            Expr::Intersection(exprs) => one(serializer, "intersection", exprs),
            Expr::Ref { collection, id } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("ref", collection)?;
                map.serialize_entry("id", id)?;
                map.end()
            }
            Expr::Collection(name) => one(serializer, "collection", name),
            Expr::Collections => one(serializer, "collections", &()),
            Expr::Index(name) => one(serializer, "index", name),
            Expr::Indexes => one(serializer, "indexes", &()),
            Expr::CreateCollection(params) => one(serializer, "create_collection", params),
            Expr::CreateIndex(params) => one(serializer, "create_index", params),
            Expr::Create { collection, params } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("create", collection)?;
                map.serialize_entry("params", params)?;
                map.end()
            }
            Expr::Update { target, params } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("update", target)?;
                map.serialize_entry("params", params)?;
                map.end()
            }
            Expr::Delete(target) => one(serializer, "delete", target),
            Expr::Select { path, from } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("select", &Path(path))?;
                map.serialize_entry("from", from)?;
                map.end()
            }
            Expr::Let { bindings, body } => {
                let entries: Vec<Binding<'_>> = bindings
                    .iter()
                    .map(|(name, expr)| Binding(name, expr))
                    .collect();
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("let", &entries)?;
                map.serialize_entry("in", body)?;
                map.end()
            }
            Expr::Var(name) => one(serializer, "var", name),
            Expr::Lambda { param, body } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("lambda", param)?;
                map.serialize_entry("expr", body)?;
                map.end()
            }
            Expr::Do(exprs) => one(serializer, "do", exprs),
            Expr::Count(expr) => one(serializer, "count", expr),
            Expr::Equals(exprs) => one(serializer, "equals", exprs),
        }
    }
}
