use std::sync::Arc;

use clap::Args;
use fortune_pricing::{
    flow::{FlowSettings, PricingFlow},
    selection::RawSelection,
    service::PricingService,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::terminal::TerminalSurface;

#[derive(Debug, Args)]
pub(crate) struct PriceArgs {
    /// Sales option to buy, with an optional quantity (default 1)
    #[arg(
        short,
        long = "select",
        value_name = "NUMBER[:QUANTITY]",
        required = true,
        value_parser = parse_selection
    )]
    selections: Vec<RawSelection>,
}

fn parse_selection(value: &str) -> Result<RawSelection, String> {
    let (number, quantity) = value.split_once(':').unwrap_or((value, "1"));

    let number = number
        .trim()
        .parse::<u32>()
        .map_err(|error| format!("invalid option number {number:?}: {error}"))?;

    Ok(RawSelection::checked(number, quantity))
}

pub(crate) async fn run(
    args: &PriceArgs,
    service: Arc<dyn PricingService>,
    settings: FlowSettings,
) -> Result<(), String> {
    let flow = PricingFlow::new(service, Arc::new(TerminalSurface::stdout()), settings);

    if let Err(error) = flow.load_catalog().await {
        return Err(error.user_message());
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let complete_tx = tx.clone();

    flow.on_flow_complete(move |_outcome| {
        if complete_tx.send(Ok(())).is_err() {
            debug!("completion arrived after the command finished");
        }
    });

    flow.on_flow_error(move |error| {
        if tx.send(Err(error.to_string())).is_err() {
            debug!("error arrived after the command finished");
        }
    });

    let id = match flow.start_flow(&args.selections) {
        Ok(id) => id,
        Err(error) => return Err(error.user_message()),
    };

    info!(%id, "waiting for the reveal");

    tokio::select! {
        finished = rx.recv() => {
            finished.unwrap_or_else(|| Err("pricing flow ended without a result".to_string()))
        }
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|error| format!("failed to listen for ctrl-c: {error}"))?;

            flow.abort_flow();

            Err("price generation aborted".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_selection_arguments() {
        assert_eq!(parse_selection("3"), Ok(RawSelection::checked(3, "1")));
        assert_eq!(parse_selection("2:5"), Ok(RawSelection::checked(2, "5")));
        assert!(parse_selection("two:5").is_err());
    }

    #[test]
    fn leaves_quantity_validation_to_the_flow() {
        assert_eq!(parse_selection("2:zero"), Ok(RawSelection::checked(2, "zero")));
    }
}
