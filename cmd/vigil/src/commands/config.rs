//! Configuration commands.

use clap::{Args, Subcommand};
use vigil_engine::EngineConfig;

use super::{get_config, output_result, print_success, store_path};
use crate::Cli;
use crate::paths::Paths;

/// Show or initialise the configuration.
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Print the effective configuration
    Show,
    /// Print the resolved config and store paths
    Path,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        match &self.command {
            ConfigSubcommand::Show => {
                let cfg = get_config(cli)?;
                output_result(&cfg, cli.json)
            }
            ConfigSubcommand::Path => {
                let cfg = get_config(cli)?;
                let config = match cli.config.as_deref() {
                    Some(p) => p.into(),
                    None => Paths::new()?.config_file(),
                };
                println!("config: {}", config.display());
                println!("store:  {}", store_path(cli, &cfg)?.display());
                Ok(())
            }
            ConfigSubcommand::Init { force } => {
                let path = match cli.config.as_deref() {
                    Some(p) => p.into(),
                    None => Paths::new()?.config_file(),
                };
                if path.exists() && !force {
                    anyhow::bail!("{} already exists, use --force to overwrite", path.display());
                }
                if let Some(dir) = path.parent() {
                    std::fs::create_dir_all(dir)?;
                }
                std::fs::write(&path, EngineConfig::default().to_yaml()?)?;
                print_success(&format!("wrote {}", path.display()));
                Ok(())
            }
        }
    }
}
