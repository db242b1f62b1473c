use {anyhow::Result, clap::Subcommand, salesdesk_client::SalesFilter};

use crate::{Context, print_json};

#[derive(Subcommand)]
pub enum ReportAction {
    /// Line-level sales, optionally filtered.
    Sales {
        /// Filter as key=value, e.g. --filter sales_rep=4. Repeatable.
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
    },
    /// Per-product sales analysis.
    Analysis {
        /// Serve from the local reference cache when present.
        #[arg(long)]
        cached: bool,
    },
    MonthlyByBrand,
    TopProducts,
    TopAccounts,
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    SalesFilter::parse_pair(raw).ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

pub async fn handle_report(ctx: &Context, report: ReportAction) -> Result<()> {
    let client = &ctx.client;
    match report {
        ReportAction::Sales { filters } => {
            let filter: SalesFilter = filters.into_iter().collect();
            print_json(&client.sales_report(&filter).await?)
        },
        ReportAction::Analysis { cached: true } => print_json(&client.cached_analytics().await?),
        ReportAction::Analysis { cached: false } => print_json(&client.sales_analysis().await?),
        ReportAction::MonthlyByBrand => print_json(&client.monthly_sales_by_brand().await?),
        ReportAction::TopProducts => print_json(&client.top_products().await?),
        ReportAction::TopAccounts => print_json(&client.top_accounts().await?),
    }
}
