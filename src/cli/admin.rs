use std::{
    io::{self, Write},
    sync::Arc,
};

use clap::{Args, Subcommand};
use fortune_pricing::{
    admin::{AdminSession, MultiplierRow, SalesOptionRow},
    catalog::Catalog,
    multipliers::MultiplierOutcomeSet,
    presenter::multiplier_label,
    service::PricingService,
};
use rusty_money::{Money, iso::Currency};
use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};

#[derive(Debug, Args)]
pub(crate) struct AdminCommand {
    /// Admin password
    #[arg(long, env = "PRICING_ADMIN_PASSWORD", hide_env_values = true, default_value = "")]
    password: String,

    #[command(subcommand)]
    command: AdminSubcommand,
}

#[derive(Debug, Subcommand)]
enum AdminSubcommand {
    /// Show the multiplier table and the catalog
    Setup,

    /// Replace the multiplier table
    SaveMultipliers {
        /// Table row; probabilities must add up to 100
        #[arg(
            long = "entry",
            value_name = "MULTIPLIER:PROBABILITY",
            required = true,
            value_parser = parse_multiplier_row
        )]
        entries: Vec<MultiplierRow>,
    },

    /// Replace the catalog
    SaveOptions {
        /// Catalog row
        #[arg(
            long = "option",
            value_name = "NUMBER:NAME:COST:PRICE",
            required = true,
            value_parser = parse_sales_option_row
        )]
        options: Vec<SalesOptionRow>,
    },
}

fn parse_multiplier_row(value: &str) -> Result<MultiplierRow, String> {
    let (multiplier, probability) = value
        .split_once(':')
        .ok_or_else(|| format!("expected MULTIPLIER:PROBABILITY, got {value:?}"))?;

    Ok(MultiplierRow::new(multiplier, probability))
}

fn parse_sales_option_row(value: &str) -> Result<SalesOptionRow, String> {
    // Name may contain ':'; number is first, prices are last.
    let parts = value.split_once(':').and_then(|(number, rest)| {
        let (rest, selling_price) = rest.rsplit_once(':')?;
        let (name, cost) = rest.rsplit_once(':')?;

        Some((number, name, cost, selling_price))
    });

    let Some((number, name, cost, selling_price)) = parts else {
        return Err(format!("expected NUMBER:NAME:COST:PRICE, got {value:?}"));
    };

    Ok(SalesOptionRow {
        number: number.to_string(),
        name: name.to_string(),
        cost: cost.to_string(),
        selling_price: selling_price.to_string(),
    })
}

pub(crate) async fn run(
    command: AdminCommand,
    service: Arc<dyn PricingService>,
    currency: &'static Currency,
) -> Result<(), String> {
    let session = AdminSession::login(service, &command.password)
        .await
        .map_err(|e| e.to_string())?;

    let written = match command.command {
        AdminSubcommand::Setup => {
            let setup = session.full_setup().await.map_err(|e| e.to_string())?;
            let mut out = io::stdout().lock();

            write_multipliers(&mut out, &setup.multipliers)
                .and_then(|()| write_catalog(&mut out, &setup.catalog, currency))
        }
        AdminSubcommand::SaveMultipliers { entries } => {
            let set = session
                .save_multipliers(&entries)
                .await
                .map_err(|e| e.to_string())?;
            let mut out = io::stdout().lock();

            writeln!(out, "Multipliers saved successfully!")
                .and_then(|()| write_multipliers(&mut out, &set))
        }
        AdminSubcommand::SaveOptions { options } => {
            let catalog = session
                .save_sales_options(&options)
                .await
                .map_err(|e| e.to_string())?;
            let mut out = io::stdout().lock();

            writeln!(out, "Sales Options saved successfully!")
                .and_then(|()| write_catalog(&mut out, &catalog, currency))
        }
    };

    written.map_err(|error| format!("failed to write output: {error}"))
}

fn write_multipliers(out: &mut impl Write, set: &MultiplierOutcomeSet) -> io::Result<()> {
    let mut builder = Builder::default();

    builder.push_record(["Multiplier", "Probability (%)"]);

    for entry in set.entries() {
        builder.push_record([
            multiplier_label(entry.multiplier),
            entry.probability.normalize().to_string(),
        ]);
    }

    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Columns::new(1..2), Alignment::right());

    writeln!(out, "{table}")
}

fn write_catalog(out: &mut impl Write, catalog: &Catalog, currency: &'static Currency) -> io::Result<()> {
    let mut builder = Builder::default();

    builder.push_record(["#", "Name", "Cost", "Price"]);

    for option in catalog.iter() {
        builder.push_record([
            option.number.to_string(),
            option.name.clone(),
            Money::from_decimal(option.cost, currency).to_string(),
            Money::from_decimal(option.selling_price, currency).to_string(),
        ]);
    }

    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Columns::new(2..4), Alignment::right());

    writeln!(out, "{table}")
}
