pub(crate) const DEFAULT_HTTP_HOST: &str =
  "0.0.0.0";
pub(crate) const DEFAULT_HTTP_PORT: u16 =
  9099;

pub(crate) const DEFAULT_REDIS_HOST: &str =
  "localhost";
pub(crate) const DEFAULT_REDIS_PORT: u16 =
  6379;

pub(crate) const DEFAULT_PG_HOST: &str =
  "127.0.0.1";
pub(crate) const DEFAULT_PG_PORT: u16 =
  5432;
pub(crate) const DEFAULT_PG_DATABASE: &str =
  "test";
pub(crate) const DEFAULT_PG_USER: &str =
  "postgres";
pub(crate) const DEFAULT_PG_PASSWORD: &str =
  "password";
pub(crate) const DEFAULT_SQLITE_PATH: &str =
  "padawan.sqlite";

pub(crate) const DEFAULT_RABBIT_HOST: &str =
  "localhost";
pub(crate) const DEFAULT_RABBIT_PORT: u16 =
  5672;
pub(crate) const DEFAULT_RABBIT_QUEUE: &str =
  "pq";

pub(crate) const DEFAULT_LOG_LEVEL: &str =
  "info";
pub(crate) const DEFAULT_AUTH_USERNAME: &str =
  "admin";

/// Service labels inside the platform
/// binding descriptor.
pub(crate) const REDIS_SERVICE: &str =
  "redis-3";
pub(crate) const POSTGRES_SERVICE: &str =
  "postgres";
pub(crate) const RABBIT_SERVICE: &str =
  "p-rabbitmq-35";
