pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "assetctl")]
#[command(about = "Operator CLI for the Asset Management API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Create tables and indexes in the configured Postgres database")]
    Migrate,

    #[command(about = "Mint a bearer token for an account email")]
    Token {
        #[arg(help = "Account email carried in the token")]
        email: String,
    },

    #[command(about = "Subscription package management")]
    Package {
        #[command(subcommand)]
        cmd: commands::package::PackageCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::database::migrate(output_format).await,
        Commands::Token { email } => commands::token::mint(&email, output_format),
        Commands::Package { cmd } => commands::package::handle(cmd, output_format).await,
    }
}
