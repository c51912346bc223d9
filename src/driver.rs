// SPDX-License-Identifier: Apache-2.0

//! The driver façade: formats incoming SQL, dispatches one statement at a
//! time, executes the translated expressions and shapes the responses into
//! rows.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::client::{HttpClient, QueryRunner};
use crate::config::ConnectionConfig;
use crate::error::{DriverError, DriverResult};
use crate::fql::{Expr, Scalar};
use crate::retry;
use crate::rows::{self, Row};
use crate::token::format::format_sql;
use crate::token::lexer::parse_single_statement;
use crate::token::Group;
use crate::translate::information_schema::{self, InfoSchemaQuery};
use crate::translate::select::{DocumentSelect, SelectPlan};
use crate::translate::{insert, translate_statement, InsertPlan, Translation};

/// Collection creation sometimes races the database's own bookkeeping;
/// affected CREATE expressions are retried this many times.
const MAX_CREATE_RETRIES: u32 = 10;

const DUPLICATE_UNIQUE_VALUE: &str =
    "Tried to create a document with duplicate value for a unique field.";

/// SQL driver over a document database.
///
/// One driver owns one transport. Calls are independent; within a call the
/// emitted expressions are dispatched strictly in order.
pub struct SqlDriver<R: QueryRunner = HttpClient> {
    runner: R,
}

impl SqlDriver<HttpClient> {
    /// Builds a driver talking HTTP to the configured endpoint.
    pub fn connect(config: &ConnectionConfig) -> DriverResult<Self> {
        Ok(Self { runner: HttpClient::new(config)? })
    }
}

impl<R: QueryRunner> SqlDriver<R> {
    /// Builds a driver over a custom transport.
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    /// The transport this driver dispatches through.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Translates one SQL statement, executes it and returns the shaped
    /// result rows.
    pub async fn sql(&self, query: &str) -> DriverResult<Vec<Row>> {
        let formatted = format_sql(query);
        let statement = parse_single_statement(&formatted)?;

        let query_id = Uuid::new_v4();
        tracing::debug!(%query_id, sql = %formatted, "executing SQL statement");

        match self.execute_statement(&statement).await {
            Ok(result) => Ok(result),
            Err(err) => {
                tracing::error!(%query_id, sql = %formatted, error = %err, "SQL statement failed");
                Err(err)
            }
        }
    }

    async fn execute_statement(&self, statement: &Group) -> DriverResult<Vec<Row>> {
        match translate_statement(statement)? {
            Translation::Select(plan) => self.execute_select(plan).await,
            Translation::Create(queries) => self.execute_create(&queries).await,
            Translation::Insert(plan) => self.execute_insert(plan).await,
            Translation::Update(query) | Translation::Alter(query) => {
                let resource = self.runner.query(&query).await?;
                data_rows(&resource)
            }
            Translation::Delete(query) => {
                let resource = self.runner.query(&query).await?;
                deleted_document_row(&resource)
            }
            Translation::Drop(query) => {
                let resource = self.runner.query(&query).await?;
                let reference = resource.get("ref").ok_or_else(|| {
                    DriverError::internal(format!("Expected a ref in DROP response: {resource}"))
                })?;
                Ok(vec![rows::reference_to_row(reference)?])
            }
        }
    }

    async fn execute_select(&self, plan: SelectPlan) -> DriverResult<Vec<Row>> {
        match plan {
            SelectPlan::Documents(select) => self.execute_document_select(select).await,
            SelectPlan::Info(info) => self.execute_information_schema(info).await,
        }
    }

    async fn execute_document_select(&self, select: DocumentSelect) -> DriverResult<Vec<Row>> {
        let resource = self.runner.query(&select.query).await?;

        let aliases = select.table.column_alias_map();
        rows::unwrap_documents(&resource)
            .iter()
            .map(|document| {
                rows::document_to_row(document, &aliases)
                    .map(|row| rows::project_columns(&select.table.columns, row))
            })
            .collect()
    }

    /// CREATE dispatches its expressions one at a time: the collection must
    /// exist before the index group can reference it. Schema-not-ready
    /// failures retry with gradual backoff.
    async fn execute_create(&self, queries: &[Expr]) -> DriverResult<Vec<Row>> {
        let mut last = serde_json::Value::Null;
        for query in queries {
            last = retry::with_linear_backoff(
                MAX_CREATE_RETRIES,
                |err| err.message().contains("document data is not valid"),
                || self.runner.query(query),
            )
            .await?;
        }

        // Only the final result is reported: several expressions, one SQL
        // statement. The compound index expression ends on the collection
        // ref for exactly this reason.
        Ok(vec![rows::reference_to_row(&last)?])
    }

    async fn execute_insert(&self, plan: InsertPlan) -> DriverResult<Vec<Row>> {
        let collection = self
            .runner
            .query(&insert::metadata_query(&plan.table.name))
            .await?;
        let fields = insert::fields_from_collection(&collection)?;
        let record = insert::apply_field_defaults(&plan.record, fields.as_ref());

        let create = insert::build_create(&plan.table.name, record);
        let resource = match self.runner.query(&create).await {
            Ok(resource) => resource,
            Err(err) if err.message().contains("document is not unique") => {
                return Err(DriverError::programming(DUPLICATE_UNIQUE_VALUE));
            }
            Err(err) => return Err(err),
        };

        Ok(vec![rows::document_to_row(&resource, &BTreeMap::new())?])
    }

    async fn execute_information_schema(&self, info: InfoSchemaQuery) -> DriverResult<Vec<Row>> {
        match info {
            InfoSchemaQuery::Tables => {
                let resource = self.runner.query(&information_schema::tables_query()).await?;
                rows::unwrap_documents(&resource)
                    .iter()
                    .map(|document| {
                        let reference = document.get("ref").ok_or_else(|| {
                            DriverError::internal(format!(
                                "Expected a ref in collection document: {document}"
                            ))
                        })?;
                        rows::reference_to_row(reference)
                    })
                    .collect()
            }
            InfoSchemaQuery::Columns { table_name } => {
                let resource = self
                    .runner
                    .query(&information_schema::columns_query(&table_name))
                    .await?;
                field_metadata_rows(&resource)
            }
            InfoSchemaQuery::Constraints { table_name } => {
                let resource = self
                    .runner
                    .query(&information_schema::constraints_query(&table_name))
                    .await?;

                let mut result = Vec::new();
                for index in rows::unwrap_documents(&resource) {
                    result.push(self.index_row(&index).await?);
                }
                Ok(result)
            }
        }
    }

    /// One constraint row per index: `{name, column_names, unique}`. Indexes
    /// without terms fall back to the source collection's field names.
    async fn index_row(&self, index: &serde_json::Value) -> DriverResult<Row> {
        let name = index
            .get("name")
            .and_then(|n| n.as_str())
            .ok_or_else(|| DriverError::internal(format!("Index document has no name: {index}")))?;

        let column_names = match index.get("terms").and_then(|t| t.as_array()) {
            Some(terms) => terms
                .iter()
                .filter_map(|term| {
                    term.get("field")
                        .and_then(|f| f.as_array())
                        .and_then(|path| path.last())
                        .and_then(|leaf| leaf.as_str())
                        .map(str::to_string)
                })
                .collect::<Vec<_>>(),
            None => {
                let source = index
                    .get("source")
                    .and_then(rows::ref_id)
                    .ok_or_else(|| {
                        DriverError::internal(format!("Index document has no source: {index}"))
                    })?
                    .to_string();
                let fields = self
                    .runner
                    .query(&information_schema::columns_query(&source))
                    .await?;
                fields
                    .as_object()
                    .map(|f| f.keys().cloned().collect())
                    .unwrap_or_default()
            }
        };

        // Index responses carry no usable uniqueness flag, and the callers
        // of this pseudo-table do not need one.
        Ok(Row::from([
            ("name".to_string(), Scalar::String(name.to_string())),
            (
                "column_names".to_string(),
                Scalar::String(column_names.join(",")),
            ),
            ("unique".to_string(), Scalar::Bool(false)),
        ]))
    }
}

/// One row per field in a collection's metadata: `{name, unique, not_null,
/// default, type}`. Table references read back as regular columns, so the
/// `references` entry is stripped.
fn field_metadata_rows(resource: &serde_json::Value) -> DriverResult<Vec<Row>> {
    let Some(fields) = resource.as_object() else {
        return Ok(Vec::new());
    };

    fields
        .iter()
        .map(|(field_name, field_data)| {
            let mut row = Row::from([(
                "name".to_string(),
                Scalar::String(field_name.clone()),
            )]);
            if let Some(entries) = field_data.as_object() {
                for (key, value) in entries {
                    if key == "references" {
                        continue;
                    }
                    row.insert(key.clone(), rows::to_scalar(value)?);
                }
            }
            Ok(row)
        })
        .collect()
}

/// Rows from a `{data: [...]}` response shape.
fn data_rows(resource: &serde_json::Value) -> DriverResult<Vec<Row>> {
    rows::unwrap_documents(resource)
        .iter()
        .map(|document| rows::document_to_row(document, &BTreeMap::new()))
        .collect()
}

/// The deleted document's record map, as a single row.
fn deleted_document_row(resource: &serde_json::Value) -> DriverResult<Vec<Row>> {
    let Some(record) = resource.get("data").and_then(|d| d.as_object()) else {
        return Ok(Vec::new());
    };

    let mut row = Row::new();
    for (key, value) in record {
        row.insert(key.clone(), rows::to_scalar(value)?);
    }
    Ok(vec![row])
}
