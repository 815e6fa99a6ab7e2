use clap::{Parser, Subcommand};
use fortune_pricing::config::{LoggingConfig, RevealConfig, ServiceConfig};

mod admin;
pub(crate) mod logging;
mod options;
mod price;
mod terminal;

#[derive(Debug, Parser)]
#[command(
    name = "fortune-pricing",
    about = "Line-item pricing with a weighted multiplier reveal",
    long_about = None
)]
pub(crate) struct Cli {
    #[command(flatten)]
    service: ServiceConfig,

    #[command(flatten)]
    reveal: RevealConfig,

    #[command(flatten)]
    logging: LoggingConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the sales options
    Options,

    /// Price a selection and reveal the drawn multiplier
    Price(price::PriceArgs),

    /// Inspect or edit the multiplier table and the catalog
    Admin(admin::AdminCommand),
}

impl Cli {
    pub(crate) fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    pub(crate) async fn run(self) -> Result<(), String> {
        let settings = self.reveal.settings().map_err(|e| e.to_string())?;
        let service = self.service.connect().map_err(|e| e.to_string())?;

        match self.command {
            Commands::Options => options::run(service.as_ref(), settings.currency).await,
            Commands::Price(args) => price::run(&args, service, settings).await,
            Commands::Admin(command) => admin::run(command, service, settings.currency).await,
        }
    }
}
