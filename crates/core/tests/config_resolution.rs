use std::fs;
use std::path::PathBuf;

use padawan_core::domain::model::{AppMode, ProfileKind, Secret, SqlDialect};
use padawan_core::infra::config::{ConfigResolver, EnvSnapshot, PLATFORM_BINDING_VAR};
use tempfile::TempDir;

fn write_config(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("config.json");
    fs::write(&path, body).unwrap();
    path
}

fn no_env() -> EnvSnapshot {
    EnvSnapshot::default()
}

const FILE: &str = r#"{
    "port": 8080,
    "debug": true,
    "redis": { "hostname": "file-redis", "port": 7000, "password": "file-pw" },
    "postgres": { "database": "filedb", "user": "fileuser", "password": "filepw", "host": "file-pg", "port": "6543" },
    "rabbitmq": { "hostname": "file-rabbit", "message_queue_name": "file-queue" }
}"#;

fn vcap() -> String {
    r#"{
        "redis-3": [{ "credentials": { "host": "vcap-redis", "port": "6380", "password": "vcap-pw" } }],
        "postgres": [{ "credentials": { "host": "vcap-pg", "port": 15432, "database": "vcapdb", "username": "vcapuser", "password": "vcappw" } }],
        "p-rabbitmq-35": [{ "credentials": { "amqp": { "host": "vcap-rabbit", "port": 5673 } } }]
    }"#
    .to_string()
}

#[test]
fn defaults_apply_without_file_or_env() {
    let dir = TempDir::new().unwrap();
    let resolver = ConfigResolver::new(dir.path().join("missing.json"));

    let cache = resolver.resolve(ProfileKind::Cache, AppMode::Prod, &no_env());
    assert_eq!(cache.host, "localhost");
    assert_eq!(cache.port, 6379);
    assert!(cache.credentials.is_none());

    let http = resolver.resolve(ProfileKind::Http, AppMode::Prod, &no_env());
    assert_eq!(http.bind_address(), "0.0.0.0:9099");
    assert!(!http.debug());

    let pg = resolver.resolve(ProfileKind::Relational, AppMode::Prod, &no_env());
    assert_eq!(pg.host, "127.0.0.1");
    assert_eq!(pg.port, 5432);
    assert_eq!(pg.extra("database"), Some("test"));
    assert_eq!(pg.extra("user"), Some("postgres"));
    assert_eq!(pg.dialect(), SqlDialect::Postgres);
    assert_eq!(pg.timeout().as_millis(), 2_000);

    let queue = resolver.resolve(ProfileKind::Queue, AppMode::Prod, &no_env());
    assert_eq!(queue.host, "localhost");
    assert_eq!(queue.extra("queue"), Some("pq"));
}

#[test]
fn file_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    let resolver = ConfigResolver::new(write_config(&dir, FILE));

    let cache = resolver.resolve(ProfileKind::Cache, AppMode::Prod, &no_env());
    assert_eq!(cache.host, "file-redis");
    assert_eq!(cache.port, 7000);
    assert_eq!(cache.password(), "file-pw");

    let pg = resolver.resolve(ProfileKind::Relational, AppMode::Prod, &no_env());
    assert_eq!(pg.host, "file-pg");
    assert_eq!(pg.port, 6543);
    assert_eq!(pg.extra("database"), Some("filedb"));
    assert_eq!(pg.extra("user"), Some("fileuser"));
    assert_eq!(pg.password(), "filepw");

    let http = resolver.resolve(ProfileKind::Http, AppMode::Prod, &no_env());
    assert_eq!(http.port, 8080);
    assert!(http.debug());
}

#[test]
fn platform_binding_overrides_file() {
    let dir = TempDir::new().unwrap();
    let resolver = ConfigResolver::new(write_config(&dir, FILE));
    let env = EnvSnapshot::from_pairs([(PLATFORM_BINDING_VAR, vcap())]);

    let cache = resolver.resolve(ProfileKind::Cache, AppMode::Prod, &env);
    assert_eq!(cache.host, "vcap-redis");
    assert_eq!(cache.port, 6380);
    assert_eq!(cache.password(), "vcap-pw");

    let pg = resolver.resolve(ProfileKind::Relational, AppMode::Prod, &env);
    assert_eq!(pg.host, "vcap-pg");
    assert_eq!(pg.port, 15432);
    assert_eq!(pg.extra("database"), Some("vcapdb"));
    assert_eq!(pg.extra("user"), Some("vcapuser"));

    let queue = resolver.resolve(ProfileKind::Queue, AppMode::Prod, &env);
    assert_eq!(queue.host, "vcap-rabbit");
    assert_eq!(queue.port, 5673);
    assert_eq!(queue.extra("queue"), Some("file-queue"));
}

#[test]
fn environment_overrides_platform_binding() {
    let dir = TempDir::new().unwrap();
    let resolver = ConfigResolver::new(write_config(&dir, FILE));
    let env = EnvSnapshot::from_pairs([
        (PLATFORM_BINDING_VAR.to_string(), vcap()),
        ("REDIS_HOST".to_string(), "env-redis".to_string()),
        ("REDIS_PORT".to_string(), "6390".to_string()),
        ("POSTGRES_USER".to_string(), "envuser".to_string()),
    ]);

    let cache = resolver.resolve(ProfileKind::Cache, AppMode::Prod, &env);
    assert_eq!(cache.host, "env-redis");
    assert_eq!(cache.port, 6390);
    // Not overridden in env, so the binding still wins.
    assert_eq!(cache.password(), "vcap-pw");

    let pg = resolver.resolve(ProfileKind::Relational, AppMode::Prod, &env);
    assert_eq!(pg.extra("user"), Some("envuser"));
    assert_eq!(pg.host, "vcap-pg");
}

#[test]
fn blank_redis_password_disables_auth() {
    let dir = TempDir::new().unwrap();
    let resolver = ConfigResolver::new(write_config(&dir, FILE));

    let env = EnvSnapshot::from_pairs([("REDIS_PASSWORD", "")]);
    let cache = resolver.resolve(ProfileKind::Cache, AppMode::Prod, &env);
    assert!(cache.credentials.is_none());
    assert_eq!(cache.password(), "");

    let binding = r#"{ "redis-3": [{ "credentials": { "host": "vcap-redis", "password": "" } }] }"#;
    let env = EnvSnapshot::from_pairs([(PLATFORM_BINDING_VAR, binding)]);
    let cache = resolver.resolve(ProfileKind::Cache, AppMode::Prod, &env);
    assert_eq!(cache.host, "vcap-redis");
    assert!(cache.credentials.is_none());
}

#[test]
fn each_tier_wins_on_its_own() {
    let dir = TempDir::new().unwrap();

    let path = write_config(&dir, r#"{ "redis": { "port": 7001 } }"#);
    let resolver = ConfigResolver::new(&path);
    assert_eq!(
        resolver.resolve(ProfileKind::Cache, AppMode::Prod, &no_env()).port,
        7001
    );

    let binding = EnvSnapshot::from_pairs([(
        PLATFORM_BINDING_VAR,
        r#"{ "redis-3": [{ "credentials": { "port": 7002 } }] }"#,
    )]);
    assert_eq!(
        resolver.resolve(ProfileKind::Cache, AppMode::Prod, &binding).port,
        7002
    );

    let env = EnvSnapshot::from_pairs([
        (PLATFORM_BINDING_VAR, r#"{ "redis-3": [{ "credentials": { "port": 7002 } }] }"#),
        ("REDIS_PORT", "7003"),
    ]);
    assert_eq!(
        resolver.resolve(ProfileKind::Cache, AppMode::Prod, &env).port,
        7003
    );

    fs::remove_file(&path).unwrap();
    let fresh = ConfigResolver::new(&path);
    assert_eq!(
        fresh.resolve(ProfileKind::Cache, AppMode::Prod, &no_env()).port,
        6379
    );
}

#[test]
fn malformed_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let resolver = ConfigResolver::new(write_config(&dir, "{ not json"));

    let cache = resolver.resolve(ProfileKind::Cache, AppMode::Prod, &no_env());
    assert_eq!(cache.host, "localhost");
    assert_eq!(cache.port, 6379);
}

#[test]
fn schema_violation_is_treated_as_absent() {
    let dir = TempDir::new().unwrap();
    let resolver = ConfigResolver::new(write_config(
        &dir,
        r#"{ "port": true, "redis": { "hostname": "ignored" } }"#,
    ));

    let cache = resolver.resolve(ProfileKind::Cache, AppMode::Prod, &no_env());
    assert_eq!(cache.host, "localhost");
}

#[test]
fn malformed_platform_binding_falls_through_to_file() {
    let dir = TempDir::new().unwrap();
    let resolver = ConfigResolver::new(write_config(&dir, FILE));
    let env = EnvSnapshot::from_pairs([(PLATFORM_BINDING_VAR, "[[[")]);

    let cache = resolver.resolve(ProfileKind::Cache, AppMode::Prod, &env);
    assert_eq!(cache.host, "file-redis");
}

#[test]
fn unreadable_file_keeps_last_good_values() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, FILE);
    let resolver = ConfigResolver::new(&path);

    let first = resolver.resolve(ProfileKind::Cache, AppMode::Prod, &no_env());
    assert_eq!(first.host, "file-redis");

    fs::write(&path, "garbage").unwrap();
    let second = resolver.resolve(ProfileKind::Cache, AppMode::Prod, &no_env());
    assert_eq!(second, first);

    fs::remove_file(&path).unwrap();
    let third = resolver.resolve(ProfileKind::Cache, AppMode::Prod, &no_env());
    assert_eq!(third, first);
}

#[test]
fn http_port_override_only_applies_in_prod() {
    let dir = TempDir::new().unwrap();
    let resolver = ConfigResolver::new(write_config(&dir, r#"{ "port": 8080 }"#));
    let env = EnvSnapshot::from_pairs([("PORT", "5000"), ("HOST_NAME", "127.0.0.1")]);

    let prod = resolver.resolve(ProfileKind::Http, AppMode::Prod, &env);
    assert_eq!(prod.bind_address(), "127.0.0.1:5000");
    assert!(!prod.debug());

    let dev = resolver.resolve(ProfileKind::Http, AppMode::Dev, &env);
    assert_eq!(dev.bind_address(), "0.0.0.0:8080");
    assert!(dev.debug());
}

#[test]
fn debug_flag_from_env_beats_file() {
    let dir = TempDir::new().unwrap();
    let resolver = ConfigResolver::new(write_config(&dir, r#"{ "debug": true }"#));

    let env = EnvSnapshot::from_pairs([("DEBUG", "false")]);
    assert!(!resolver.resolve(ProfileKind::Http, AppMode::Prod, &env).debug());

    let bogus = EnvSnapshot::from_pairs([("DEBUG", "maybe")]);
    assert!(resolver.resolve(ProfileKind::Http, AppMode::Prod, &bogus).debug());
}

#[test]
fn invalid_port_override_is_ignored() {
    let dir = TempDir::new().unwrap();
    let resolver = ConfigResolver::new(write_config(&dir, r#"{ "port": 8080 }"#));
    let env = EnvSnapshot::from_pairs([("PORT", "eighty")]);

    let http = resolver.resolve(ProfileKind::Http, AppMode::Prod, &env);
    assert_eq!(http.port, 8080);
}

#[test]
fn sqlite_path_is_anchored_next_to_config() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"{ "database": { "dialect": "sqlite" }, "sqlite": { "path": "demo.sqlite" } }"#,
    );
    let resolver = ConfigResolver::new(&path);

    let profile = resolver.resolve(ProfileKind::Relational, AppMode::Prod, &no_env());
    assert_eq!(profile.dialect(), SqlDialect::Sqlite);
    assert_eq!(
        profile.extra("path"),
        Some(dir.path().join("demo.sqlite").display().to_string().as_str())
    );

    let env = EnvSnapshot::from_pairs([("SQLITE_PATH", ":memory:")]);
    let memory = resolver.resolve(ProfileKind::Relational, AppMode::Prod, &env);
    assert_eq!(memory.extra("path"), Some(":memory:"));
}

#[test]
fn backend_timeout_resolves_through_tiers() {
    let dir = TempDir::new().unwrap();
    let resolver = ConfigResolver::new(write_config(&dir, r#"{ "timeout_ms": 750 }"#));

    let cache = resolver.resolve(ProfileKind::Cache, AppMode::Prod, &no_env());
    assert_eq!(cache.timeout().as_millis(), 750);

    let env = EnvSnapshot::from_pairs([("BACKEND_TIMEOUT_MS", "125")]);
    let pg = resolver.resolve(ProfileKind::Relational, AppMode::Prod, &env);
    assert_eq!(pg.timeout().as_millis(), 125);
}

#[test]
fn auth_settings_prefer_env() {
    let dir = TempDir::new().unwrap();
    let resolver = ConfigResolver::new(write_config(
        &dir,
        r#"{ "auth": { "username": "vader", "password_hash": "$argon2id$file" } }"#,
    ));

    let from_file = resolver.auth(&no_env());
    assert_eq!(from_file.username, "vader");
    assert_eq!(from_file.password_hash.as_deref(), Some("$argon2id$file"));

    let env = EnvSnapshot::from_pairs([("AUTH_USERNAME", "yoda")]);
    let mixed = resolver.auth(&env);
    assert_eq!(mixed.username, "yoda");
    assert_eq!(mixed.password_hash.as_deref(), Some("$argon2id$file"));

    let none = ConfigResolver::new(dir.path().join("absent.json")).auth(&no_env());
    assert_eq!(none.username, "admin");
    assert!(none.password_hash.is_none());
}

#[test]
fn log_level_comes_from_file() {
    let dir = TempDir::new().unwrap();
    let resolver = ConfigResolver::new(write_config(&dir, r#"{ "logging": { "level": "debug" } }"#));
    assert_eq!(resolver.log_level(), "debug");

    let none = ConfigResolver::new(dir.path().join("absent.json"));
    assert_eq!(none.log_level(), "info");
}

#[test]
fn secrets_are_redacted_in_debug_output() {
    let secret = Secret::new("hunter2");
    assert_eq!(format!("{secret:?}"), "Secret(***)");
    assert_eq!(secret.expose(), "hunter2");
}
