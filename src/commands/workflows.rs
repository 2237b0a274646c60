use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::config::Config;
use crate::db::RecordStore;
use crate::sync::{Exporter, Importer};

#[derive(Args)]
pub struct WorkflowsCommand {
    #[command(subcommand)]
    pub command: WorkflowsSubcommand,
}

#[derive(Subcommand)]
pub enum WorkflowsSubcommand {
    /// Import workflow records from .json files
    Import {
        /// Only import the workflow with this id
        id: Option<String>,

        /// Directory holding the .json files (default: workflows_dir from config)
        #[arg(long, short = 'D')]
        directory: Option<PathBuf>,

        /// Delete workflows that have no file (ignored when an id is given)
        #[arg(long, short = 'P')]
        purge: bool,
    },

    /// Export workflow records to .json files
    Export {
        /// Only export the workflow with this id
        id: Option<String>,

        /// Directory to write the .json files to (default: workflows_dir from config)
        #[arg(long, short = 'D')]
        directory: Option<PathBuf>,
    },
}

impl WorkflowsSubcommand {
    fn directory(&self, config: &Config) -> PathBuf {
        let directory = match self {
            WorkflowsSubcommand::Import { directory, .. } => directory,
            WorkflowsSubcommand::Export { directory, .. } => directory,
        };
        directory
            .clone()
            .unwrap_or_else(|| config.workflows_dir.value.clone())
    }
}

impl WorkflowsCommand {
    pub async fn run(
        &self,
        store: &dyn RecordStore,
        config: &Config,
        verbose: bool,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let directory = self.command.directory(config);

        match &self.command {
            WorkflowsSubcommand::Import { id, purge, .. } => {
                if id.is_some() && *purge {
                    tracing::warn!("--purge is ignored when importing a single workflow");
                }

                let importer = Importer::new(store, directory).with_verbose(verbose);
                let summary = importer.run(id.as_deref(), *purge).await?;
                tracing::info!("Import finished: {}", summary);
                Ok(())
            }
            WorkflowsSubcommand::Export { id, .. } => {
                let exporter = Exporter::new(store, directory);
                let ids = exporter.run(id.as_deref()).await?;
                tracing::info!(
                    "Exported {} workflow(s) to {}",
                    ids.len(),
                    exporter.directory().display()
                );
                Ok(())
            }
        }
    }
}
