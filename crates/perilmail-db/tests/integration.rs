//! Offline unit tests for perilmail-db pool configuration and row types.
//! These tests do not require a live database connection.

use perilmail_core::{Config, Environment};
use perilmail_db::{PersonRow, PoolConfig};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[test]
fn pool_config_from_config_uses_core_values() {
    let config = Config {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        gemini_api_key: None,
        sendgrid_api_key: None,
        email_from_address: "outreach@example.com".to_string(),
        email_from_name: "Outreach".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        http_request_timeout_secs: 30,
        http_user_agent: "ua".to_string(),
        rate_limit_max_requests: 120,
        rate_limit_window_secs: 60,
    };

    let pool_config = PoolConfig::from_config(&config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: confirm that [`PersonRow`] converts into the
/// targeting candidate without losing the tri-state flags. No database
/// required.
#[test]
fn person_row_converts_to_candidate() {
    use chrono::Utc;
    use perilmail_core::Candidate;
    use uuid::Uuid;

    let row = PersonRow {
        id: Uuid::new_v4(),
        first_name: "Ada".to_string(),
        last_name: "Nguyen".to_string(),
        email: "ada.nguyen@example.com".to_string(),
        phone: Some("2135550147".to_string()),
        city: "Los Angeles".to_string(),
        state: "CA".to_string(),
        latitude: 34.05,
        longitude: -118.24,
        house_value: 750_000,
        has_insurance: false,
        homeowner: Some(true),
        do_not_call: None,
        created_at: Utc::now(),
    };

    let id = row.id;
    let candidate = Candidate::from(row);

    assert_eq!(candidate.id, id);
    assert_eq!(candidate.email, "ada.nguyen@example.com");
    assert_eq!(candidate.house_value, 750_000);
    assert_eq!(candidate.homeowner, Some(true));
    assert!(candidate.do_not_call.is_none());
}
