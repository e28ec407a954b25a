//! Fetch functions backed by remote services
//!
//! The daemon core never performs I/O itself; this module supplies the
//! [`FetchFn`]s the `ddm` binary registers, built from [`DaemonSpec`]s.

pub mod http;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{parse_url, DaemonSpec};
use crate::daemon::{args_fn, DaemonConfig, DaemonType, EventTrigger, FetchFn};
use crate::errors::{AppError, AppResult};
use crate::host::BoxFuture;

pub use http::{HttpFetcher, RetryConfig};

/// A remote data source
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Retrieve the current value, passing `args` to the service
    async fn fetch(&self, args: Option<Value>) -> anyhow::Result<Value>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

/// Adapt a [`Fetcher`] to the manager's fetch function shape
pub fn into_fetch_fn(fetcher: Arc<dyn Fetcher>) -> FetchFn<Value> {
    Arc::new(move |args: Option<Value>| -> BoxFuture<'static, anyhow::Result<Value>> {
        let fetcher = Arc::clone(&fetcher);
        Box::pin(async move { fetcher.fetch(args).await })
    })
}

/// Build the manager configuration for one configured daemon.
///
/// `make_fetcher` turns an endpoint URL into a fetcher so callers can choose
/// the transport (the binary uses [`HttpFetcher`]).
pub fn daemon_from_spec<F>(spec: &DaemonSpec, mut make_fetcher: F) -> AppResult<DaemonConfig<Value>>
where
    F: FnMut(url::Url) -> Arc<dyn Fetcher>,
{
    let main_fetch = match &spec.url {
        Some(url) => Some(into_fetch_fn(make_fetcher(parse_url(&spec.name, url)?))),
        None => None,
    };

    let mut config = match (spec.daemon_type, main_fetch) {
        (DaemonType::Timer, Some(fetch)) => DaemonConfig::timer(&spec.name, &spec.status, fetch),
        (DaemonType::Timer, None) => {
            return Err(AppError::invalid_daemon(
                &spec.name,
                "timer daemons need a url",
            ))
        }
        (DaemonType::Event, fetch) => {
            let mut config = DaemonConfig::event(&spec.name).with_status(&spec.status);
            config.fetch = fetch;
            config
        }
    };

    if let Some(args) = spec.args.clone() {
        config = config.with_args(args_fn(move || args.clone()));
    }

    for (status, ms) in &spec.intervals_ms {
        config = config.with_interval(status, Duration::from_millis(*ms));
    }

    for (event, trigger_spec) in &spec.triggers {
        let fetcher = make_fetcher(parse_url(&spec.name, &trigger_spec.url)?);
        let mut trigger = EventTrigger::new(into_fetch_fn(fetcher));
        if let Some(args) = trigger_spec.args.clone() {
            trigger = trigger.with_args(args_fn(move || args.clone()));
        }
        if let Some(ms) = trigger_spec.throttle_ms {
            trigger = trigger.with_throttle(Duration::from_millis(ms));
        }
        config = config.with_trigger(event, trigger);
    }

    Ok(config)
}
