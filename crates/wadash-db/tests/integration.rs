//! Offline tests for wadash-db configuration and row types.
//! These tests do not require a live database connection.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use wadash_core::{AppConfig, Environment};
use wadash_db::{DbError, Page, Pagination, PoolConfig, StatusCounts};

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        data_root: PathBuf::from("./database"),
        email_list_path: PathBuf::from("./email.csv"),
        admin_email: None,
        max_upload_bytes: 1024,
        rate_limit_per_minute: 60,
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        smtp: None,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[tokio::test]
async fn lazy_pool_does_not_connect() {
    let pool = wadash_db::connect_pool_lazy(
        "postgres://nobody@127.0.0.1:1/none",
        PoolConfig::default(),
    );
    assert!(pool.is_ok());
}

#[test]
fn not_found_has_stable_message() {
    assert_eq!(DbError::NotFound.to_string(), "record not found");
}

#[test]
fn pagination_serializes_pager_fields() {
    let value = serde_json::to_value(Pagination::new(Page::new(Some(2), Some(10)), 25)).unwrap();
    assert_eq!(
        value,
        serde_json::json!({"page": 2, "pages": 3, "per_page": 10, "total": 25})
    );
}

#[test]
fn status_counts_serialize_every_status() {
    let value = serde_json::to_value(StatusCounts::default()).unwrap();
    for key in ["total", "pending", "running", "completed", "failed", "cancelled"] {
        assert_eq!(value[key], 0, "{key}");
    }
}
