// Library root for the shared courtside services: configuration loading, the
// SQLite durable store, and the two-tier result cache that fronts every
// derived statistic.

pub mod cache;
pub mod config;
pub mod db;
