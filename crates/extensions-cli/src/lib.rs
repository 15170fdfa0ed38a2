//! gardener-extension CLI library
//!
//! Every command loads the extension config, connects to the seed with the
//! ambient kubeconfig and prints its result to stdout.

pub mod commands;
pub mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use config::{ExtensionConfig, Provider};

/// Gardener provider extension tooling
#[derive(Parser, Debug)]
#[command(name = "gardener-extension")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the extension config file
    #[arg(short = 'c', long = "config", env = "GARDENER_EXTENSION_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the provider webhook on one AdmissionReview
    Mutate(commands::mutate::MutateArgs),

    /// Compute the control plane chart values of a ControlPlane
    Values(commands::values::ValuesArgs),

    /// Compute Terraform variables or status of an Infrastructure
    Terraform(commands::terraform::TerraformArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> anyhow::Result<()> {
        let config = ExtensionConfig::load(&self.config).await?;
        match self.command {
            Commands::Mutate(args) => commands::mutate::run(&config, args).await,
            Commands::Values(args) => commands::values::run(&config, args).await,
            Commands::Terraform(args) => commands::terraform::run(&config, args).await,
        }
    }
}
