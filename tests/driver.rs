//! End-to-end driver tests over a scripted transport.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use sql2fql::{DriverError, DriverResult, Expr, QueryRunner, Row, Scalar, SqlDriver};

/// A transport that replays canned responses and records every dispatched
/// expression as wire JSON.
struct ScriptedRunner {
    responses: Mutex<VecDeque<DriverResult<Value>>>,
    requests: Mutex<Vec<Value>>,
}

impl ScriptedRunner {
    fn new(responses: Vec<DriverResult<Value>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryRunner for ScriptedRunner {
    async fn query(&self, expr: &Expr) -> DriverResult<Value> {
        self.requests
            .lock()
            .unwrap()
            .push(serde_json::to_value(expr).unwrap());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted runner ran out of responses")
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    // try_init: only the first test to get here installs the subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env()) // <- reads RUST_LOG
        .with_test_writer() // integrates with `cargo test` output capture
        .try_init();
}

fn driver(responses: Vec<DriverResult<Value>>) -> SqlDriver<ScriptedRunner> {
    init_tracing();
    SqlDriver::with_runner(ScriptedRunner::new(responses))
}

fn user_document(id: &str, name: &str, age: i64) -> Value {
    json!({
        "ref": {"@ref": {"id": id, "collection": {"@ref": {"id": "users"}}}},
        "ts": 1625000000,
        "data": {"name": name, "age": age}
    })
}

#[tokio::test]
async fn select_without_where_paginates_the_all_index() {
    let driver = driver(vec![Ok(json!({
        "data": [user_document("101", "Alice", 30), user_document("102", "Bob", 31)]
    }))]);

    let rows = driver.sql("SELECT users.id FROM users").await.unwrap();

    let requests = driver.runner().requests();
    assert_eq!(
        requests,
        vec![json!({
            "map": {"lambda": "document", "expr": {"get": {"var": "document"}}},
            "collection": {"paginate": {"intersection": [{"match": {"index": "all_users"}}]}}
        })]
    );

    assert_eq!(
        rows,
        vec![
            Row::from([("id".to_string(), Scalar::String("101".into()))]),
            Row::from([("id".to_string(), Scalar::String("102".into()))]),
        ]
    );
}

#[tokio::test]
async fn select_by_id_shapes_aliases_and_projection() {
    let driver = driver(vec![Ok(json!({"data": [user_document("42", "Alice", 30)]}))]);

    let rows = driver
        .sql("SELECT users.id, users.name AS user_name FROM users WHERE users.id = '42'")
        .await
        .unwrap();

    let requests = driver.runner().requests();
    assert_eq!(
        requests[0]["collection"]["paginate"],
        json!({"ref": {"collection": "users"}, "id": "42"})
    );

    assert_eq!(
        rows,
        vec![Row::from([
            ("id".to_string(), Scalar::String("42".into())),
            ("user_name".to_string(), Scalar::String("Alice".into())),
        ])]
    );
}

#[tokio::test]
async fn select_wraps_a_single_document_response() {
    // An index match returning one document comes back bare instead of as a
    // one-element page.
    let driver = driver(vec![Ok(user_document("42", "Alice", 30))]);

    let rows = driver
        .sql("SELECT * FROM users WHERE users.name = 'Alice'")
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], Scalar::String("Alice".into()));
    assert_eq!(rows[0]["age"], Scalar::Int(30));
    assert_eq!(rows[0]["id"], Scalar::String("42".into()));
}

#[tokio::test]
async fn multi_statement_queries_are_rejected() {
    let driver = driver(vec![]);
    let err = driver
        .sql("SELECT * FROM users; SELECT * FROM teams")
        .await
        .unwrap_err();

    assert!(matches!(err, DriverError::NotSupported { .. }));
    assert!(err.message().contains("Only one SQL statement at a time"));
}

#[tokio::test]
async fn multi_table_selects_are_rejected() {
    let driver = driver(vec![]);
    let err = driver
        .sql("SELECT users.id, teams.id FROM users")
        .await
        .unwrap_err();

    assert!(err.message().contains("Only one table per query"));
}

#[tokio::test]
async fn create_table_dispatches_collection_then_indexes() {
    let driver = driver(vec![
        Ok(json!({"ref": {"@ref": {"id": "users", "name": "users"}}, "ts": 1})),
        Ok(json!({"@ref": {"id": "users", "name": "users"}})),
    ]);

    let rows = driver
        .sql(
            "CREATE TABLE users (id INT PRIMARY KEY, email VARCHAR UNIQUE, team_id INT, \
             FOREIGN KEY (team_id) REFERENCES teams(id))",
        )
        .await
        .unwrap();

    let requests = driver.runner().requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].get("create_collection").is_some());

    let index_group = &requests[1]["do"];
    assert_eq!(
        index_group[0]["create_index"]["object"]["name"],
        json!("all_users")
    );
    assert_eq!(
        index_group[1]["create_index"]["object"]["name"],
        json!("users_by_email")
    );
    assert_eq!(index_group[1]["create_index"]["object"]["unique"], json!(true));
    assert_eq!(
        index_group[2]["create_index"]["object"]["name"],
        json!("users_by_team_id")
    );
    assert_eq!(index_group[2]["create_index"]["object"]["unique"], json!(false));
    assert_eq!(index_group[3], json!({"collection": "users"}));

    assert_eq!(
        rows,
        vec![Row::from([
            ("id".to_string(), Scalar::String("users".into())),
            ("name".to_string(), Scalar::String("users".into())),
        ])]
    );
}

#[tokio::test]
async fn create_retries_while_document_data_is_not_valid() {
    let driver = driver(vec![
        Err(DriverError::internal("document data is not valid")),
        Ok(json!({"ref": {"@ref": {"id": "users"}}})),
        Ok(json!({"@ref": {"id": "users", "name": "users"}})),
    ]);

    let rows = driver.sql("CREATE TABLE users (name VARCHAR)").await.unwrap();

    // First expression retried once, second ran once.
    let requests = driver.runner().requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0], requests[1]);
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn create_propagates_other_database_errors() {
    let driver = driver(vec![Err(DriverError::internal("invalid expression"))]);
    let err = driver.sql("CREATE TABLE users (name VARCHAR)").await.unwrap_err();

    assert!(matches!(err, DriverError::Internal { .. }));
    assert_eq!(driver.runner().requests().len(), 1);
}

#[tokio::test]
async fn insert_merges_metadata_defaults() {
    let metadata = json!({
        "ref": {"@ref": {"id": "users"}},
        "data": {"metadata": {"fields": {
            "email": {"unique": true, "not_null": false, "default": null, "type": "String"},
            "team_id": {"unique": false, "not_null": false, "default": 7, "type": "Integer"}
        }}}
    });
    let created = json!({
        "ref": {"@ref": {"id": "200", "collection": {"@ref": {"id": "users"}}}},
        "ts": 2,
        "data": {"email": "a@b", "team_id": 7}
    });
    let driver = driver(vec![Ok(metadata), Ok(created)]);

    let rows = driver
        .sql("INSERT INTO users (email) VALUES ('a@b')")
        .await
        .unwrap();

    let requests = driver.runner().requests();
    assert_eq!(requests[0], json!({"get": {"collection": "users"}}));
    assert_eq!(
        requests[1],
        json!({
            "create": {"collection": "users"},
            "params": {"object": {"data": {"object": {"email": "a@b", "team_id": 7}}}}
        })
    );

    assert_eq!(rows[0]["email"], Scalar::String("a@b".into()));
    assert_eq!(rows[0]["team_id"], Scalar::Int(7));
    assert_eq!(rows[0]["id"], Scalar::String("200".into()));
}

#[tokio::test]
async fn insert_duplicate_unique_value_is_a_programming_error() {
    let metadata = json!({
        "ref": {"@ref": {"id": "users"}},
        "data": {"metadata": {"fields": {
            "email": {"unique": true, "not_null": false, "default": null, "type": "String"}
        }}}
    });
    let driver = driver(vec![
        Ok(metadata),
        Err(DriverError::internal("document is not unique.")),
    ]);

    let err = driver
        .sql("INSERT INTO users (email) VALUES ('a@b')")
        .await
        .unwrap_err();

    assert!(matches!(err, DriverError::Programming { .. }));
    assert!(err
        .message()
        .contains("duplicate value for a unique field"));
}

#[tokio::test]
async fn update_returns_the_matched_count_row() {
    let driver = driver(vec![Ok(json!({"data": [{"count": 1}]}))]);

    let rows = driver
        .sql("UPDATE users SET name = 'Bob' WHERE id = '42'")
        .await
        .unwrap();

    assert_eq!(rows, vec![Row::from([("count".to_string(), Scalar::Int(1))])]);

    let requests = driver.runner().requests();
    assert_eq!(
        requests[0]["let"][0]["count"]["do"][1]["count"],
        json!({"ref": {"collection": "users"}, "id": "42"})
    );
}

#[tokio::test]
async fn delete_returns_the_deleted_record() {
    let driver = driver(vec![Ok(json!({
        "ref": {"@ref": {"id": "42", "collection": {"@ref": {"id": "users"}}}},
        "ts": 3,
        "data": {"name": "Bob", "age": 30}
    }))]);

    let rows = driver.sql("DELETE FROM users WHERE id = '42'").await.unwrap();

    assert_eq!(
        rows,
        vec![Row::from([
            ("name".to_string(), Scalar::String("Bob".into())),
            ("age".to_string(), Scalar::Int(30)),
        ])]
    );
}

#[tokio::test]
async fn alter_drop_default_returns_the_collection_ref() {
    let driver = driver(vec![Ok(json!({
        "data": [{"id": {"@ref": {"id": "users", "collection": {"@ref": {"id": "collections"}}}}}]
    }))]);

    let rows = driver
        .sql("ALTER TABLE users ALTER COLUMN name DROP DEFAULT")
        .await
        .unwrap();

    assert_eq!(
        rows,
        vec![Row::from([("id".to_string(), Scalar::String("users".into()))])]
    );
}

#[tokio::test]
async fn drop_table_returns_the_flattened_ref() {
    let driver = driver(vec![Ok(json!({
        "ref": {"@ref": {
            "id": "users",
            "name": "users",
            "metadata": {"fields": {}}
        }},
        "ts": 4
    }))]);

    let rows = driver.sql("DROP TABLE users").await.unwrap();

    assert_eq!(
        rows,
        vec![Row::from([
            ("id".to_string(), Scalar::String("users".into())),
            ("name".to_string(), Scalar::String("users".into())),
        ])]
    );
}

#[tokio::test]
async fn information_schema_tables_lists_collections() {
    let driver = driver(vec![Ok(json!({"data": [
        {"ref": {"@ref": {"id": "users", "name": "users"}}, "ts": 1},
        {"ref": {"@ref": {"id": "teams", "name": "teams"}}, "ts": 2}
    ]}))]);

    let rows = driver.sql("SELECT * FROM INFORMATION_SCHEMA.TABLES").await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], Scalar::String("users".into()));
    assert_eq!(rows[1]["name"], Scalar::String("teams".into()));
}

#[tokio::test]
async fn information_schema_columns_returns_field_metadata_rows() {
    let driver = driver(vec![Ok(json!({
        "email": {"unique": true, "not_null": false, "default": null, "type": "String"},
        "team_id": {
            "unique": false, "not_null": false, "default": null, "type": "Integer",
            "references": {"teams": "id"}
        }
    }))]);

    let rows = driver
        .sql("SELECT * FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = 'users'")
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);

    let email = rows.iter().find(|r| r["name"] == Scalar::String("email".into())).unwrap();
    assert_eq!(email["unique"], Scalar::Bool(true));
    assert_eq!(email["default"], Scalar::Null);
    assert_eq!(email["type"], Scalar::String("String".into()));

    let team_id = rows
        .iter()
        .find(|r| r["name"] == Scalar::String("team_id".into()))
        .unwrap();
    assert!(!team_id.contains_key("references"));
}

#[tokio::test]
async fn information_schema_constraints_lists_indexes() {
    let driver = driver(vec![
        Ok(json!({"data": [
            {
                "name": "users_by_email",
                "source": {"@ref": {"id": "users"}},
                "terms": [{"field": ["data", "email"]}]
            },
            {
                "name": "all_users",
                "source": {"@ref": {"id": "users"}}
            }
        ]})),
        // Field names for the termless index come from the collection.
        Ok(json!({
            "email": {"unique": true, "not_null": false, "default": null, "type": "String"},
            "team_id": {"unique": false, "not_null": false, "default": null, "type": "Integer"}
        })),
    ]);

    let rows = driver
        .sql("SELECT * FROM INFORMATION_SCHEMA.CONSTRAINT_TABLE_USAGE WHERE TABLE_NAME = 'users'")
        .await
        .unwrap();

    assert_eq!(
        rows[0],
        Row::from([
            ("name".to_string(), Scalar::String("users_by_email".into())),
            ("column_names".to_string(), Scalar::String("email".into())),
            ("unique".to_string(), Scalar::Bool(false)),
        ])
    );
    assert_eq!(
        rows[1],
        Row::from([
            ("name".to_string(), Scalar::String("all_users".into())),
            ("column_names".to_string(), Scalar::String("email,team_id".into())),
            ("unique".to_string(), Scalar::Bool(false)),
        ])
    );
}

#[tokio::test]
async fn unknown_information_schema_tables_are_rejected() {
    let driver = driver(vec![]);
    let err = driver
        .sql("SELECT * FROM INFORMATION_SCHEMA.VIEWS")
        .await
        .unwrap_err();

    assert!(matches!(err, DriverError::NotSupported { .. }));
    assert_eq!(driver.runner().requests().len(), 0);
}
