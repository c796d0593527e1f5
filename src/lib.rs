//! Workforce rostering engine.
//!
//! Preprocesses cyclic work patterns into a minimal employee/offset
//! assignment (ICPMP), encodes the remaining coverage problem as a
//! constraint model, solves it, and assembles the roster — all behind a
//! durable job queue with a process-local ratio cache.

pub mod cache;
pub mod calendar;
pub mod config;
pub mod constraints;
pub mod demo_data;
pub mod domain;
pub mod error;
pub mod icpmp;
pub mod queue;
pub mod resolver;
pub mod roster;
pub mod slots;
pub mod solver;
pub mod worker;

/// Installs a global `tracing` subscriber for embedders that don't already
/// have one (the worker pool and solver both emit `info`/`warn` spans).
/// `verbose` widens the crate's own target to `debug`; everything else stays
/// at `info`. Safe to call more than once — later calls are no-ops.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("rostersolve=debug,info")
    } else {
        EnvFilter::new("rostersolve=info,warn")
    };

    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_tracing_is_idempotent() {
        super::init_tracing(false);
        super::init_tracing(true);
    }
}
