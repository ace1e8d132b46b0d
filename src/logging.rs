// SPDX-License-Identifier: AGPL-3.0-or-later

use std::io::IsTerminal;
use std::sync::Once;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "SEGFILE_LOG";

/// Installs the global stderr subscriber. Repeated calls are no-ops.
pub fn init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let level = std::env::var(LOG_ENV_VAR).unwrap_or_else(|_| "info".to_string());
        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .parse_lossy(format!("segfile={level}"));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .init();
    });
}
