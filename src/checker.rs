use std::fmt::Write as _;
use std::io::Write;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use parking_lot::Mutex;
use reqwest::blocking::Client as HttpClient;
use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

use crate::catalog::{CatalogSource, ContentItem};

const PROGRESS_TEMPLATE: &str = "{bar:40.cyan/blue} {pos}/{len} {percent:>3}% {elapsed_precise}";
const PROGRESS_HZ: u8 = 10;

/// Why an item counts as dead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkFailure {
    #[error("invalid url: {0}")]
    Invalid(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("status {0}")]
    Status(u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadItem {
    pub item: ContentItem,
    pub reason: LinkFailure,
}

pub trait LinkProbe: Send + Sync {
    fn probe(&self, url: &str) -> Result<(), LinkFailure>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Head,
    Get,
}

/// Reachable means the request completed with exactly 200 OK.
pub struct HttpProbe {
    http: HttpClient,
    method: Method,
}

impl HttpProbe {
    pub fn new(http: HttpClient, method: Method) -> Self {
        Self { http, method }
    }
}

impl LinkProbe for HttpProbe {
    fn probe(&self, url: &str) -> Result<(), LinkFailure> {
        let parsed = Url::parse(url).map_err(|err| LinkFailure::Invalid(err.to_string()))?;
        let request = match self.method {
            Method::Head => self.http.head(parsed),
            Method::Get => self.http.get(parsed),
        };
        let response = request
            .send()
            .map_err(|err| LinkFailure::Request(err.to_string()))?;
        if response.status() != StatusCode::OK {
            return Err(LinkFailure::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Probes one item at a time, pausing `delay` after each.
pub fn check_sequential(
    items: &[ContentItem],
    probe: &dyn LinkProbe,
    delay: Duration,
    progress: &ProgressBar,
) -> Vec<DeadItem> {
    let mut dead = Vec::new();
    for item in items {
        if let Err(reason) = probe.probe(&item.url) {
            tracing::debug!(name = %item.name, url = %item.url, %reason, "dead link");
            dead.push(DeadItem {
                item: item.clone(),
                reason,
            });
        }
        progress.inc(1);
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
    dead
}

/// Probes every item on its own thread and returns the dead ones in catalog order.
pub fn check_concurrent(
    items: &[ContentItem],
    probe: &dyn LinkProbe,
    progress: &ProgressBar,
) -> Vec<DeadItem> {
    let dead: Mutex<Vec<(usize, DeadItem)>> = Mutex::new(Vec::new());

    let record = |index: usize, item: &ContentItem, reason: LinkFailure| {
        tracing::debug!(name = %item.name, url = %item.url, %reason, "dead link");
        dead.lock().push((
            index,
            DeadItem {
                item: item.clone(),
                reason,
            },
        ));
    };

    thread::scope(|scope| {
        for (index, item) in items.iter().enumerate() {
            let record = &record;
            let spawned = thread::Builder::new().spawn_scoped(scope, move || {
                if let Err(reason) = probe.probe(&item.url) {
                    record(index, item, reason);
                }
                progress.inc(1);
            });
            if let Err(err) = spawned {
                record(index, item, LinkFailure::Request(format!("spawn check: {err}")));
                progress.inc(1);
            }
        }
    });

    let mut dead = dead.into_inner();
    dead.sort_by_key(|(index, _)| *index);
    dead.into_iter().map(|(_, item)| item).collect()
}

pub fn format_report(dead: &[DeadItem]) -> String {
    if dead.is_empty() {
        return "No dead items found.\n".to_string();
    }
    let mut out = String::from("Dead items:\n");
    for entry in dead {
        let _ = writeln!(out, "{}", entry.item.name);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Sequential,
    Concurrent,
}

pub struct Options {
    pub http: HttpClient,
    pub mode: Mode,
    pub delay: Duration,
    pub show_progress: bool,
}

/// Batch entry point: load the catalog, probe every item, print the report.
/// A catalog failure is reported on `out` and is not an error.
pub fn run(source: &dyn CatalogSource, opts: Options, out: &mut dyn Write) -> Result<()> {
    let items = match source.fetch_catalog() {
        Ok(items) => items,
        Err(err) => {
            writeln!(out, "Error getting content: {err}").context("write report")?;
            return Ok(());
        }
    };

    let progress = progress_bar(items.len(), opts.show_progress)?;
    let dead = match opts.mode {
        Mode::Sequential => {
            let probe = HttpProbe::new(opts.http, Method::Head);
            check_sequential(&items, &probe, opts.delay, &progress)
        }
        Mode::Concurrent => {
            let probe = HttpProbe::new(opts.http, Method::Get);
            check_concurrent(&items, &probe, &progress)
        }
    };
    progress.finish();

    tracing::info!(checked = items.len(), dead = dead.len(), mode = ?opts.mode, "link check finished");
    out.write_all(format_report(&dead).as_bytes())
        .context("write report")?;
    out.flush().context("flush report")?;
    Ok(())
}

fn progress_bar(len: usize, visible: bool) -> Result<ProgressBar> {
    if !visible {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::with_draw_target(
        Some(len as u64),
        ProgressDrawTarget::stderr_with_hz(PROGRESS_HZ),
    );
    bar.set_style(ProgressStyle::with_template(PROGRESS_TEMPLATE).context("progress template")?);
    Ok(bar)
}
