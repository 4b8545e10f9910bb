//! Clinicore: practice scheduling with insurer-side billing reconciliation.
//!
//! Appointments, patients, staff, and facilities live in a local SQLite
//! database. Booking an appointment files a zero-cost charge on that day's
//! invoice for the patient's insurer; pricing and rescheduling keep the
//! invoice totals reconciled. The `reporting` module serves the read-only
//! revenue views.

pub mod billing;
pub mod config;
pub mod db;
pub mod models;
pub mod reporting;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for binaries and integration harnesses. Honors
/// RUST_LOG, falling back to the built-in filter.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
