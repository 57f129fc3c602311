//! The coupled lifecycle manager: C5 (reaper), C6 (schedulability), C8
//! (registrar), C9 (keepalive intake), C10 (shutdown intake), and C11
//! (online-node cache) — spec.md §1's "CORE of this specification".

pub mod error;
pub mod keepalive;
pub mod online_cache;
pub mod reaper;
pub mod registrar;
pub mod schedulability;
pub mod shutdown;

pub use error::{CoreError, CoreResult, TransientBackendError};
pub use keepalive::KeepaliveIntake;
pub use online_cache::OnlineNodeCache;
pub use reaper::StaleNodeReaper;
pub use registrar::{Registrar, RegistrationDetails};
pub use schedulability::SchedulabilityController;
pub use shutdown::ShutdownIntake;
