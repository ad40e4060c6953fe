//! Integration tests for the adapter framework
//!
//! Exercises the contract end-to-end:
//! - Uniform lifecycle across adapter kinds behind `dyn Adapter`
//! - File-system jail against a real temp directory
//! - HTTP auth headers and rate limiting against a real local server

use adapter_core::{
    Adapter, AdapterConfig, AdapterOperation, Credentials, DatabaseAuthMethod, DatabaseConfig,
    DatabaseCredentials, DatabaseOperation, ErrorCode, FileSystemConfig, FsOperation,
    FsPermissions, HttpApiConfig, HttpCredentials, HttpOperation, RateLimitConfig,
};
use adapters::{DatabaseAdapter, FileSystemAdapter, HttpApiAdapter};
use bytes::Bytes;
use std::collections::HashMap;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http_config(base_url: String, rate_limit: Option<RateLimitConfig>) -> AdapterConfig {
    AdapterConfig::HttpApi(HttpApiConfig {
        base_url,
        rate_limit,
        ..HttpApiConfig::default()
    })
}

fn fs_config(base_path: &std::path::Path) -> AdapterConfig {
    AdapterConfig::FileSystem(FileSystemConfig {
        base_path: base_path.to_path_buf(),
        permissions: FsPermissions::all(),
        allowed_extensions: None,
        max_file_size_bytes: None,
    })
}

fn get_op(path: &str) -> AdapterOperation {
    AdapterOperation::Http(HttpOperation::Get {
        path: path.to_string(),
        query: HashMap::new(),
        headers: HashMap::new(),
    })
}

#[tokio::test]
async fn http_bearer_auth_reaches_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs"))
        .and(header("Authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"jobs": []})))
        .expect(2)
        .mount(&server)
        .await;

    let mut adapter = HttpApiAdapter::remote("http-wire").unwrap();
    adapter
        .initialize(http_config(server.uri(), None))
        .await
        .unwrap();
    let connection = adapter
        .connect(Credentials::Http(HttpCredentials::BearerToken {
            token: "abc".to_string(),
        }))
        .await;
    assert!(connection.success, "connect failed: {:?}", connection.error);

    for _ in 0..2 {
        let result = adapter.execute(get_op("/jobs")).await;
        assert!(result.success, "request failed: {:?}", result.error);
        assert_eq!(result.data.unwrap()["body"]["jobs"], serde_json::json!([]));
    }
}

#[tokio::test]
async fn http_basic_auth_encodes_user_and_password() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs"))
        .and(header("Authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut adapter = HttpApiAdapter::remote("http-basic").unwrap();
    adapter
        .initialize(http_config(server.uri(), None))
        .await
        .unwrap();
    assert!(adapter
        .connect(Credentials::Http(HttpCredentials::BasicAuth {
            username: "user".to_string(),
            password: "pass".to_string(),
        }))
        .await
        .success);

    assert!(adapter.execute(get_op("/jobs")).await.success);
}

#[tokio::test]
async fn http_rate_limit_stops_the_excess_request_before_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    // The window admits 3 requests; the 4th must never reach the server.
    Mock::given(method("GET"))
        .and(path("/jobs"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&server)
        .await;

    let mut adapter = HttpApiAdapter::remote("http-rl").unwrap();
    adapter
        .initialize(http_config(
            server.uri(),
            Some(RateLimitConfig {
                requests: 3,
                window_seconds: 300,
            }),
        ))
        .await
        .unwrap();
    assert!(adapter
        .connect(Credentials::Http(HttpCredentials::None))
        .await
        .success);

    for _ in 0..3 {
        assert!(adapter.execute(get_op("/jobs")).await.success);
    }

    let result = adapter.execute(get_op("/jobs")).await;
    assert!(!result.success);
    let err = result.error.unwrap();
    assert_eq!(err.code, ErrorCode::RateLimit);
    assert!(err.retryable);
}

#[tokio::test]
async fn http_terminal_statuses_classify_precisely() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forbidden"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let mut adapter = HttpApiAdapter::remote("http-status").unwrap();
    adapter
        .initialize(http_config(server.uri(), None))
        .await
        .unwrap();
    assert!(adapter
        .connect(Credentials::Http(HttpCredentials::None))
        .await
        .success);

    let err = adapter.execute(get_op("/missing")).await.error.unwrap();
    assert_eq!(err.code, ErrorCode::NotFound);
    assert!(!err.retryable);

    let err = adapter.execute(get_op("/forbidden")).await.error.unwrap();
    assert_eq!(err.code, ErrorCode::Forbidden);
    assert!(!err.retryable);
}

#[tokio::test]
async fn filesystem_round_trip_inside_a_real_jail() {
    let dir = tempfile::tempdir().unwrap();
    let mut adapter = FileSystemAdapter::local("fs-real");
    adapter.initialize(fs_config(dir.path())).await.unwrap();
    assert!(adapter.connect(Credentials::None).await.success);

    let result = adapter
        .execute(AdapterOperation::FileSystem(FsOperation::Mkdir {
            path: "programs".to_string(),
        }))
        .await;
    assert!(result.success, "{:?}", result.error);

    let result = adapter
        .execute(AdapterOperation::FileSystem(FsOperation::Write {
            path: "programs/part42.gcode".to_string(),
            contents: Bytes::from_static(b"G0 X0 Y0\nG1 Z-1\n"),
            overwrite: false,
        }))
        .await;
    assert!(result.success, "{:?}", result.error);

    let result = adapter
        .execute(AdapterOperation::FileSystem(FsOperation::Read {
            path: "programs/part42.gcode".to_string(),
        }))
        .await;
    let data = result.data.unwrap();
    assert_eq!(data["content"], "G0 X0 Y0\nG1 Z-1\n");
    assert_eq!(data["encoding"], "utf-8");

    let result = adapter
        .execute(AdapterOperation::FileSystem(FsOperation::List {
            path: "programs".to_string(),
        }))
        .await;
    assert_eq!(result.data.unwrap()["count"], 1);

    let result = adapter
        .execute(AdapterOperation::FileSystem(FsOperation::Copy {
            from: "programs/part42.gcode".to_string(),
            to: "programs/part42-backup.gcode".to_string(),
        }))
        .await;
    assert!(result.success);

    let result = adapter
        .execute(AdapterOperation::FileSystem(FsOperation::Move {
            from: "programs/part42-backup.gcode".to_string(),
            to: "programs/part42-v2.gcode".to_string(),
        }))
        .await;
    assert!(result.success);

    let result = adapter
        .execute(AdapterOperation::FileSystem(FsOperation::Stat {
            path: "programs/part42-v2.gcode".to_string(),
        }))
        .await;
    let data = result.data.unwrap();
    assert_eq!(data["is_file"], true);
    assert_eq!(data["size"], 16);

    let result = adapter
        .execute(AdapterOperation::FileSystem(FsOperation::Delete {
            path: "programs/part42-v2.gcode".to_string(),
        }))
        .await;
    assert!(result.success);
}

#[tokio::test]
async fn filesystem_jail_holds_against_a_real_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut adapter = FileSystemAdapter::local("fs-jail");
    adapter.initialize(fs_config(dir.path())).await.unwrap();
    assert!(adapter.connect(Credentials::None).await.success);

    let escape = format!("{}/escape.txt", dir.path().parent().unwrap().display());
    for path in ["../escape.txt", &escape, "deep/../../escape.txt"] {
        let result = adapter
            .execute(AdapterOperation::FileSystem(FsOperation::Write {
                path: path.to_string(),
                contents: Bytes::from_static(b"out"),
                overwrite: true,
            }))
            .await;
        assert!(!result.success);
        assert_eq!(result.error.unwrap().code, ErrorCode::PathViolation);
    }

    assert!(
        !dir.path().parent().unwrap().join("escape.txt").exists(),
        "no file may appear outside the jail"
    );
}

#[tokio::test]
async fn filesystem_connect_requires_an_existing_base_directory() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing");
    let mut adapter = FileSystemAdapter::local("fs-missing");
    adapter.initialize(fs_config(&missing)).await.unwrap();

    let result = adapter.connect(Credentials::None).await;
    assert!(!result.success);
    assert_eq!(result.error.unwrap().code, ErrorCode::FileNotFound);
    assert!(!adapter.is_healthy().await);
}

#[tokio::test]
async fn uniform_contract_behind_dyn_adapter() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut db: Box<dyn Adapter> = Box::new(DatabaseAdapter::in_memory("db"));
    db.initialize(AdapterConfig::Database(DatabaseConfig {
        database: "machines".to_string(),
        ..DatabaseConfig::default()
    }))
    .await
    .unwrap();

    let mut fs: Box<dyn Adapter> = Box::new(FileSystemAdapter::local("fs"));
    fs.initialize(fs_config(dir.path())).await.unwrap();

    let mut http: Box<dyn Adapter> = Box::new(HttpApiAdapter::remote("http").unwrap());
    http.initialize(http_config(server.uri(), None)).await.unwrap();

    let mut adapters: Vec<(Box<dyn Adapter>, Credentials, AdapterOperation)> = vec![
        (
            db,
            Credentials::Database(DatabaseCredentials {
                username: "cnc".to_string(),
                password: "secret".to_string(),
                auth_method: DatabaseAuthMethod::ScramSha256,
            }),
            AdapterOperation::Database(DatabaseOperation::Schema { table: None }),
        ),
        (
            fs,
            Credentials::None,
            AdapterOperation::FileSystem(FsOperation::List {
                path: String::new(),
            }),
        ),
        (
            http,
            Credentials::Http(HttpCredentials::None),
            get_op("/health"),
        ),
    ];

    for (adapter, credentials, operation) in adapters.iter_mut() {
        // Before connect: structured failure, no panic, uniform code.
        let result = adapter.execute(operation.clone()).await;
        assert!(!result.success);
        let err = result.error.unwrap();
        assert_eq!(err.code, ErrorCode::NotConnected);
        assert!(!err.retryable);

        let connection = adapter.connect(credentials.clone()).await;
        assert!(connection.success, "{:?}", connection.error);
        assert!(connection.connection_id.is_some());

        let status = adapter.status();
        assert!(status.connected);
        assert!(status.connection_count >= 1);

        let result = adapter.execute(operation.clone()).await;
        assert!(result.success, "{:?}", result.error);
        assert!(adapter.is_healthy().await);

        adapter.disconnect().await.unwrap();
        assert!(!adapter.status().connected);

        adapter.shutdown().await.unwrap();
        adapter.shutdown().await.unwrap(); // must stay safe to repeat
    }
}

#[tokio::test]
async fn database_transaction_is_all_or_nothing_end_to_end() {
    let mut adapter = DatabaseAdapter::in_memory("db-txn");
    adapter
        .initialize(AdapterConfig::Database(DatabaseConfig {
            database: "machines".to_string(),
            ..DatabaseConfig::default()
        }))
        .await
        .unwrap();
    assert!(adapter
        .connect(Credentials::Database(DatabaseCredentials {
            username: "cnc".to_string(),
            password: "secret".to_string(),
            auth_method: DatabaseAuthMethod::Password,
        }))
        .await
        .success);

    let mut values = adapters::Row::new();
    values.insert("id".to_string(), serde_json::Value::from(1));

    let result = adapter
        .execute(AdapterOperation::Database(DatabaseOperation::Transaction {
            operations: vec![
                DatabaseOperation::Insert {
                    table: "tools".to_string(),
                    values: values.clone(),
                },
                DatabaseOperation::Query {
                    statement: "TRUNCATE tools".to_string(),
                    params: vec![],
                },
                DatabaseOperation::Insert {
                    table: "tools".to_string(),
                    values,
                },
            ],
        }))
        .await;
    assert!(!result.success);

    // The failed batch must leave nothing behind.
    let result = adapter
        .execute(AdapterOperation::Database(DatabaseOperation::Schema {
            table: None,
        }))
        .await;
    assert_eq!(
        result.data.unwrap()["tables"],
        serde_json::json!([]),
        "rollback must drop the table created inside the batch"
    );
}
