use std::io;

use fortune_pricing::service::PricingService;
use rusty_money::iso::Currency;

pub(crate) async fn run(
    service: &dyn PricingService,
    currency: &'static Currency,
) -> Result<(), String> {
    let catalog = service
        .get_sales_options()
        .await
        .map_err(|error| format!("failed to load sales options: {error}"))?;

    catalog
        .write_to(io::stdout().lock(), currency)
        .map_err(|error| format!("failed to write sales options: {error}"))
}
