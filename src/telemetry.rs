//! Opt-in tracing bootstrap.
//!
//! The library only emits `tracing` events; installing a subscriber is the
//! host application's job. With the `telemetry` feature enabled this module
//! wires a reasonable default for binaries and tests that do not bring
//! their own.

/// Installs a compact, `RUST_LOG`-driven subscriber (default level `info`).
///
/// Returns `true` when the subscriber was installed, `false` when a global
/// subscriber already exists.
#[cfg(feature = "telemetry")]
#[must_use]
pub fn init_default_tracing() -> bool {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .is_ok()
}

/// Without the `telemetry` feature this is a no-op returning `false`.
#[cfg(not(feature = "telemetry"))]
#[must_use]
pub fn init_default_tracing() -> bool {
    false
}
