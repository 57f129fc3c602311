//! C2 Statistics Store (spec.md §4.2).
//!
//! Grounded on `postgres_handling.py::PostgresHandler`: one `nodes_usage`
//! table holding registration metadata and abrupt-disconnect counters, plus
//! one dynamically-created `nodes_usage_details_<node>` table per node
//! holding a 7 x 8640 check-in matrix (day of week x ten-second bucket).
//! `node_name` reaches every one of these table/index identifiers by
//! string interpolation, so it is validated against
//! `fleetctl_types::validate_node_name` before it touches a query.

pub mod error;

pub use error::{StatsError, StatsResult};

use chrono::{DateTime, Utc};
use fleetctl_types::{
    buckets::{day_of_week, seconds_since_midnight, BUCKETS_PER_DAY},
    validate_node_name,
};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Connection, PgConnection, PgPool, Row};
use tracing::{info, instrument};

const DB_PORT: u16 = 5432;
const DB_NAME: &str = "node_metrics";
const NODE_DETAILS_TABLE: &str = "nodes_usage";
const NODE_USAGE_TABLE_PREFIX: &str = "nodes_usage_details";
const MIN_POOL_CONNECTIONS: u32 = 5;
const MAX_POOL_CONNECTIONS: u32 = 20;

/// One row of the check-in matrix: a bucket index and its accumulated
/// count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckInBucket {
    pub bucket: i64,
    pub count: i64,
}

#[derive(Clone)]
pub struct StatsStore {
    pool: PgPool,
}

impl StatsStore {
    /// Connects to Postgres, creating `node_metrics` and its bootstrap
    /// table if this is a first run (`_create_database_if_doesnt_exist` /
    /// `_initialize_databases` in the original). Per spec.md §7, a failure
    /// here is fatal to the process — the caller should propagate it out
    /// of `main` rather than retry indefinitely.
    #[instrument(skip(password))]
    pub async fn connect(host: &str, user: &str, password: &str) -> StatsResult<Self> {
        Self::ensure_database(host, user, password).await?;

        let opts = PgConnectOptions::new()
            .host(host)
            .port(DB_PORT)
            .username(user)
            .password(password)
            .database(DB_NAME);
        let pool = PgPoolOptions::new()
            .min_connections(MIN_POOL_CONNECTIONS)
            .max_connections(MAX_POOL_CONNECTIONS)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    async fn ensure_database(host: &str, user: &str, password: &str) -> StatsResult<()> {
        let admin_opts = PgConnectOptions::new()
            .host(host)
            .port(DB_PORT)
            .username(user)
            .password(password)
            .database("postgres");
        let mut conn = PgConnection::connect_with(&admin_opts).await?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1)")
                .bind(DB_NAME)
                .fetch_one(&mut conn)
                .await?;
        if !exists {
            info!(db = DB_NAME, "creating database");
            sqlx::query(&format!("CREATE DATABASE {DB_NAME}"))
                .execute(&mut conn)
                .await?;
        }
        Ok(())
    }

    async fn initialize(&self) -> StatsResult<()> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {NODE_DETAILS_TABLE} (
                id SERIAL PRIMARY KEY,
                name VARCHAR(100) UNIQUE,
                registration_time TIMESTAMPTZ,
                abrupt_disconnects INTEGER
            )"
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn node_registered(&self, node_name: &str) -> StatsResult<bool> {
        validate_node_name(node_name)?;
        let exists: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {NODE_DETAILS_TABLE} WHERE name = $1)"
        ))
        .bind(node_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Creates the node's detail table, its bucket index, its
    /// `nodes_usage` row, and pre-populates all 60480 check-in rows at
    /// zero, all inside one transaction (rolled back on any failure).
    /// Idempotent: returns `Ok(true)` without touching anything if the
    /// node is already registered.
    #[instrument(skip(self))]
    pub async fn register_node(
        &self,
        node_name: &str,
        registration_time: DateTime<Utc>,
    ) -> StatsResult<bool> {
        validate_node_name(node_name)?;
        if self.node_registered(node_name).await? {
            return Ok(true);
        }

        let table = usage_table(node_name);
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id SERIAL PRIMARY KEY,
                day_of_week SMALLINT,
                bucket SMALLINT,
                check_in_count INTEGER
            )"
        ))
        .execute(&mut *tx)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_bucket_{node_name}
             ON {table} (bucket)"
        ))
        .execute(&mut *tx)
        .await?;

        sqlx::query(&format!(
            "INSERT INTO {NODE_DETAILS_TABLE} (name, registration_time, abrupt_disconnects)
             VALUES ($1, $2, 0)"
        ))
        .bind(node_name)
        .bind(registration_time)
        .execute(&mut *tx)
        .await?;

        sqlx::query(&format!(
            "INSERT INTO {table} (day_of_week, bucket, check_in_count)
             SELECT d, b, 0
             FROM generate_series(0, 6) d, generate_series(0, {}) b",
            BUCKETS_PER_DAY - 1
        ))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Increments the check-in counter for the bucket `timestamp` falls
    /// into, gated upstream by C9's test-and-set so at most one increment
    /// per bucket per node survives duplicate pulses. No-op if the node
    /// isn't registered (spec.md §4.2), matching the sibling
    /// `increment_abrupt_disconnect`'s sentinel-bool shape rather than
    /// raising an error for an expected condition.
    pub async fn update_node(&self, node_name: &str, timestamp: DateTime<Utc>) -> StatsResult<bool> {
        validate_node_name(node_name)?;
        if !self.node_registered(node_name).await? {
            return Ok(false);
        }
        let table = usage_table(node_name);
        sqlx::query(&format!(
            "UPDATE {table} SET check_in_count = check_in_count + 1
             WHERE bucket = $1 AND day_of_week = $2"
        ))
        .bind(seconds_since_midnight(timestamp) as i16)
        .bind(day_of_week(timestamp) as i16)
        .execute(&self.pool)
        .await?;
        Ok(true)
    }

    /// Returns the check-in rows for a single `(day_of_week, bucket_range)`
    /// slice (spec.md §4.2, §4.6's `_buckets_for_window` — the estimator
    /// composes these per-day, per-subrange calls into the day-rollover and
    /// multi-day windows its algorithm needs).
    pub async fn get_check_ins(
        &self,
        node_name: &str,
        day: u8,
        start_bucket: i64,
        end_bucket: i64,
    ) -> StatsResult<Vec<CheckInBucket>> {
        validate_node_name(node_name)?;
        if !self.node_registered(node_name).await? {
            return Err(StatsError::NotRegistered(node_name.to_string()));
        }
        let table = usage_table(node_name);
        let rows = sqlx::query(&format!(
            "SELECT bucket, check_in_count
             FROM {table}
             WHERE day_of_week = $1
               AND bucket >= $2
               AND bucket <= $3
             ORDER BY bucket"
        ))
        .bind(day as i16)
        .bind(start_bucket as i16)
        .bind(end_bucket as i16)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CheckInBucket {
                bucket: row.get::<i16, _>("bucket") as i64,
                count: row.get::<i32, _>("check_in_count") as i64,
            })
            .collect())
    }

    pub async fn get_registration_time(&self, node_name: &str) -> StatsResult<DateTime<Utc>> {
        validate_node_name(node_name)?;
        let row = sqlx::query(&format!(
            "SELECT registration_time FROM {NODE_DETAILS_TABLE} WHERE name = $1"
        ))
        .bind(node_name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StatsError::NotRegistered(node_name.to_string()))?;
        Ok(row.get("registration_time"))
    }

    pub async fn increment_abrupt_disconnect(&self, node_name: &str) -> StatsResult<bool> {
        validate_node_name(node_name)?;
        if !self.node_registered(node_name).await? {
            return Ok(false);
        }
        sqlx::query(&format!(
            "UPDATE {NODE_DETAILS_TABLE} SET abrupt_disconnects = abrupt_disconnects + 1
             WHERE name = $1"
        ))
        .bind(node_name)
        .execute(&self.pool)
        .await?;
        Ok(true)
    }

    pub async fn get_abrupt_disconnect_count(&self, node_name: &str) -> StatsResult<i32> {
        validate_node_name(node_name)?;
        let row = sqlx::query(&format!(
            "SELECT abrupt_disconnects FROM {NODE_DETAILS_TABLE} WHERE name = $1"
        ))
        .bind(node_name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StatsError::NotRegistered(node_name.to_string()))?;
        Ok(row.get("abrupt_disconnects"))
    }
}

fn usage_table(node_name: &str) -> String {
    format!("{NODE_USAGE_TABLE_PREFIX}_{node_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_table_name_is_prefixed() {
        assert_eq!(usage_table("worker_1"), "nodes_usage_details_worker_1");
    }
}
