//! Command handlers for all CLI operations
//!
//! Configuration commands live in [`config`], commands that build a daemon
//! manager live in [`daemon`].

mod config;
mod daemon;

use super::{CliContext, Commands};
use anyhow::Result;

use config::ConfigHandler;
use daemon::DaemonHandler;

/// Routes parsed commands to their handlers
pub struct CommandHandler {
    context: CliContext,
}

impl CommandHandler {
    pub fn new(context: CliContext) -> Self {
        Self { context }
    }

    /// Route commands to their appropriate handlers
    pub async fn handle_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Init { force } => ConfigHandler::new(&self.context).handle_init(force),
            Commands::Validate => ConfigHandler::new(&self.context).handle_validate(),
            Commands::Fetch { name } => DaemonHandler::new(&self.context).handle_fetch(&name).await,
            Commands::Run => DaemonHandler::new(&self.context).handle_run().await,
        }
    }
}
