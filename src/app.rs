use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::catalog;
use crate::checker;
use crate::config;
use crate::ui;

pub const LOG_ENV: &str = "STREAM_TUI_LOG";

/// Installs a stderr subscriber only when `STREAM_TUI_LOG` is set, so the
/// alternate screen is never written over by default.
pub fn init_logging() {
    let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) else {
        return;
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn catalog_client(cfg: &config::Config) -> Result<catalog::Client> {
    catalog::Client::new(catalog::ClientConfig {
        url: cfg.catalog.url.clone(),
        user_agent: cfg.catalog.user_agent.clone(),
        timeout: cfg.catalog.timeout,
        http_client: None,
    })
    .context("create catalog client")
}

/// Interactive filter view.
pub fn run() -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;
    let client = catalog_client(&cfg)?;
    tracing::debug!(url = client.url(), "starting interactive view");

    let mut model = ui::Model::new(ui::Options {
        source: Arc::new(client),
        settings: ui::Settings::from(&cfg.ui),
    });
    model.run()
}

/// Link health check. `concurrent` forces the concurrent variant on top of
/// whatever the config selects.
pub fn run_check(concurrent: bool) -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;
    let client = catalog_client(&cfg)?;

    let mode = if concurrent || cfg.checker.concurrent {
        checker::Mode::Concurrent
    } else {
        checker::Mode::Sequential
    };
    let opts = checker::Options {
        http: client.http().clone(),
        mode,
        delay: cfg.checker.delay,
        show_progress: true,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    checker::run(&client, opts, &mut out)
}
