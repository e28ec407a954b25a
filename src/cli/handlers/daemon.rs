//! Daemon handler
//!
//! Builds a manager from the configuration on the tokio host and drives it
//! from the terminal.

use super::super::{CliContext, ControlLine};
use anyhow::{Context, Result};
use data_daemons::config::Config;
use data_daemons::fetch::{daemon_from_spec, Fetcher, HttpFetcher, RetryConfig};
use data_daemons::{DataDaemonManager, TokioHost};
use serde_json::Value;
use std::io::BufRead;
use std::sync::Arc;
use tracing::{debug, info, warn};

type Manager = DataDaemonManager<Value, TokioHost>;

/// Handler for commands that run daemons
pub struct DaemonHandler<'a> {
    context: &'a CliContext,
}

impl<'a> DaemonHandler<'a> {
    pub fn new(context: &'a CliContext) -> Self {
        Self { context }
    }

    /// Fetch one daemon's data once and print it
    pub async fn handle_fetch(&self, name: &str) -> Result<()> {
        let config_manager = self.context.load_config()?;
        let manager = build_manager(config_manager.config(), TokioHost::new())?;

        let value = manager.force_get_data(name)?.await?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        Ok(())
    }

    /// Start every daemon, print each broadcast and accept control lines on
    /// stdin until `quit` or Ctrl+C
    pub async fn handle_run(&self) -> Result<()> {
        let config_manager = self.context.load_config()?;
        let host = TokioHost::new();
        let mut manager = build_manager(config_manager.config(), host.clone())?;

        for name in manager.daemon_names() {
            let label = name.clone();
            manager.add_listener(&name, move |value: Value| print_broadcast(&label, &value))?;
        }

        if let Err(e) = manager.start_all_daemons() {
            warn!("{}", e);
        }
        info!(
            "Running {} daemon(s) from {:?}",
            manager.len(),
            config_manager.path()
        );

        let lines = spawn_stdin_reader();
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                line = lines.recv_async() => {
                    let line = match line {
                        Ok(line) => line,
                        Err(_) => {
                            debug!("stdin closed, waiting for Ctrl+C");
                            let _ = (&mut ctrl_c).await;
                            info!("Received Ctrl+C, shutting down");
                            break;
                        }
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match handle_control_line(&mut manager, &host, &line).await {
                        Ok(true) => break,
                        Ok(false) => {}
                        Err(e) => eprintln!("error: {:#}", e),
                    }
                }
                _ = &mut ctrl_c => {
                    info!("Received Ctrl+C, shutting down");
                    break;
                }
            }
        }

        manager.stop_all_daemons();
        info!("All daemons stopped");
        Ok(())
    }
}

/// Register every configured daemon with an HTTP fetcher
fn build_manager(config: &Config, host: TokioHost) -> Result<Manager> {
    config.validate()?;

    let client = HttpFetcher::client(&config.http)?;
    let retry = RetryConfig::exponential(config.http.max_retries, config.http.retry_delay_ms);
    let mut manager = DataDaemonManager::new(host);

    for spec in &config.daemons {
        let daemon = daemon_from_spec(spec, |url| {
            let fetcher = HttpFetcher::new(client.clone(), url, retry.clone());
            debug!("Daemon '{}' uses {}", spec.name, fetcher.describe());
            Arc::new(fetcher) as Arc<dyn Fetcher>
        })?;
        manager.add_daemon(daemon)?;
    }

    Ok(manager)
}

fn print_broadcast(name: &str, value: &Value) {
    println!(
        "{} {} {}",
        chrono::Local::now().format("%H:%M:%S%.3f"),
        name,
        value
    );
}

/// Lines from stdin, read on a plain thread so a blocked read never holds
/// up runtime shutdown
fn spawn_stdin_reader() -> flume::Receiver<String> {
    let (tx, rx) = flume::unbounded();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
    rx
}

/// Apply one control line. Returns `true` when the loop should exit.
async fn handle_control_line(manager: &mut Manager, host: &TokioHost, line: &str) -> Result<bool> {
    let command: ControlLine = line.parse()?;

    match command {
        ControlLine::Emit { event, payload } => {
            let delivered = host.publish(&event, payload);
            println!("emitted '{}' to {} subscriber(s)", event, delivered);
        }
        ControlLine::Status { daemon, status } => {
            manager.change_status(&daemon, status)?;
            println!("{} status is now '{}'", daemon, manager.status(&daemon)?);
        }
        ControlLine::Get { daemon } => match manager.get_data(&daemon)? {
            Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            None => println!("{} has no data yet", daemon),
        },
        ControlLine::Fetch { daemon } => {
            // The listener prints the new value
            manager
                .force_get_data(&daemon)?
                .await
                .with_context(|| format!("forced fetch of '{}' failed", daemon))?;
        }
        ControlLine::Start { daemon } => {
            manager.start_daemon(&daemon)?;
            println!("{} started", daemon);
        }
        ControlLine::Stop { daemon } => {
            manager.stop_daemon(&daemon)?;
            println!("{} stopped", daemon);
        }
        ControlLine::List => {
            for name in manager.daemon_names() {
                println!(
                    "{} [{}] status='{}' running={} listeners={}",
                    name,
                    manager.daemon_type(&name)?,
                    manager.status(&name)?,
                    manager.is_running(&name)?,
                    manager.listener_count(&name)?
                );
            }
        }
        ControlLine::Quit => return Ok(true),
    }

    Ok(false)
}
