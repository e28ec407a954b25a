//! Configuration management handler
//!
//! Writes the example configuration and checks an existing one.

use super::super::CliContext;
use anyhow::{bail, Result};
use data_daemons::config::{Config, ConfigManager, DaemonSpec};
use data_daemons::DaemonType;
use tracing::info;

/// Handler for configuration operations
pub struct ConfigHandler<'a> {
    context: &'a CliContext,
}

impl<'a> ConfigHandler<'a> {
    pub fn new(context: &'a CliContext) -> Self {
        Self { context }
    }

    /// Write the example configuration
    pub fn handle_init(&self, force: bool) -> Result<()> {
        let config_path = self.context.config_path();

        if config_path.exists() && !force {
            bail!(
                "Configuration already exists at {} (use --force to overwrite)",
                config_path.display()
            );
        }

        ConfigManager::new(config_path, Config::example()).save()?;
        info!("Wrote example configuration to {:?}", config_path);
        println!("Configuration initialized at: {}", config_path.display());
        Ok(())
    }

    /// Parse and validate the configuration, then list its daemons
    pub fn handle_validate(&self) -> Result<()> {
        let manager = self.context.load_config()?;
        let config = manager.config();
        config.validate()?;

        println!(
            "Configuration OK: {} ({} daemon(s))",
            manager.path().display(),
            config.daemons.len()
        );
        for spec in &config.daemons {
            println!("  {}", describe_daemon(spec));
        }
        Ok(())
    }
}

fn describe_daemon(spec: &DaemonSpec) -> String {
    match spec.daemon_type {
        DaemonType::Timer => {
            let intervals: Vec<String> = spec
                .intervals_ms
                .iter()
                .map(|(status, ms)| format!("{}={}ms", status, ms))
                .collect();
            format!(
                "{} [timer] status='{}' intervals: {}",
                spec.name,
                spec.status,
                intervals.join(", ")
            )
        }
        DaemonType::Event => {
            let triggers: Vec<String> = spec
                .triggers
                .iter()
                .map(|(event, trigger)| match trigger.throttle_ms {
                    Some(ms) => format!("{} (throttle {}ms)", event, ms),
                    None => event.clone(),
                })
                .collect();
            format!("{} [event] triggers: {}", spec.name, triggers.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_example_daemons() {
        let config = Config::example();
        assert_eq!(
            describe_daemon(&config.daemons[0]),
            "clock [timer] status='active' intervals: active=5000ms, idle=60000ms"
        );
        assert_eq!(
            describe_daemon(&config.daemons[1]),
            "uuid [event] triggers: refresh (throttle 1000ms)"
        );
    }
}
