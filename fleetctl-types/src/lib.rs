//! Shared domain types for the fleet access control plane.
//!
//! This crate has no I/O of its own: it holds the node identity model,
//! the check-in bucket arithmetic shared by the statistics store and the
//! survival estimator, and the handful of constants that appear in more
//! than one component of `spec.md`.

pub mod buckets;
pub mod identity;

pub use buckets::{days_between, seconds_since_midnight, SECONDS_IN_DAY, SECONDS_PER_CHECK_IN};
pub use identity::{validate_node_name, NodeDetails, NodeNameError};

use std::time::Duration;

/// Short-TTL keepalive window (§4.1, §4.4). A node must be observed silent
/// in two consecutive ticks of this length before it is reaped.
pub const NODE_TIMEOUT: Duration = Duration::from_secs(3);

/// Forward window the schedulability controller asks the estimator about
/// (§4.5).
pub const NODE_MINIMAL_SURVIVABILITY_MINUTES: u32 = 3;

/// Survival probability at or below which a node is cordoned (§4.5).
pub const CORDON_THRESHOLD: f64 = 0.25;

/// Registration cooldown window for duplicate `(name, id)` requests (§4.7).
pub const REGISTRATION_COOLDOWN: Duration = Duration::from_secs(10);

/// Staleness bound for the online-node cache (§3, §4.10).
pub const ONLINE_CACHE_TTL: Duration = Duration::from_secs(5);

/// Response cache TTL for `/node_survival_chance` (§4.6, §6).
pub const SURVIVAL_CACHE_TTL: Duration = Duration::from_secs(30);

/// Response cache TTL for `/abrupt_disconnects` (§6).
pub const DISCONNECT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Upper bound (exclusive) on a valid survival query window, in minutes
/// (§4.6, §6: "400 if minutes >= 1440").
pub const MAX_SURVIVAL_RANGE_MINUTES: u32 = 1440;

/// Label that exempts a node from reaping and schedulability control
/// (§4.4, §4.5, glossary).
pub const PERSISTENT_NODE_LABEL: &str = "ciy.persistent_node";

/// Taint applied to nodes whose shutdown was not observed as graceful
/// (§4.4).
pub const OUT_OF_SERVICE_TAINT_KEY: &str = "node.kubernetes.io/out-of-service";
pub const OUT_OF_SERVICE_TAINT_VALUE: &str = "nodeshutdown";
pub const OUT_OF_SERVICE_TAINT_EFFECT: &str = "NoExecute";
