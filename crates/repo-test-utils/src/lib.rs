//! Shared test utilities for the agent workflow crates.
//!
//! Fixtures used by more than one crate's test suite. Dev-dependency only.
//!
//! # Modules
//!
//! - [`invoker`]: [`ScriptedInvoker`], an in-memory agent with queued replies
//! - [`agents`]: fake agent executables (shell scripts) for subprocess tests
//! - [`repo`]: [`TestRepo`] builder for sample repositories on disk

pub mod agents;
pub mod invoker;
pub mod repo;

pub use invoker::ScriptedInvoker;
pub use repo::TestRepo;

/// Route `tracing` output through the test harness so it shows up on failure.
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}
