//! Process-wide `tracing` subscriber setup, used by the `stairled`
//! binary and by every crate's integration tests via `test-log`.

use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{
    fmt::{self, format, time},
    prelude::*,
    EnvFilter,
};

struct Guard {}

impl Drop for Guard {
    fn drop(&mut self) {}
}

/// Installs a compact, uptime-stamped formatter filtered by `RUST_LOG`
/// (default `info`). Panics if a global subscriber is already set.
pub fn init() -> impl Drop {
    init_result()
        .map_err(|e| e.1)
        .expect("could not set global default tracing subscriber")
}

fn init_result() -> Result<impl Drop, (impl Drop, SetGlobalDefaultError)> {
    let evt_fmt = format().with_timer(time::Uptime::default()).compact();
    let fmt_layer = fmt::layer().event_format(evt_fmt);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(EnvFilter::from_default_env())
        .init();

    Ok::<_, (Guard, SetGlobalDefaultError)>(Guard {})
}
