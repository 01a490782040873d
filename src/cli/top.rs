use super::ui;
use crate::core::{HoldingsProvider, HoldingsResponse};
use anyhow::Result;
use comfy_table::Cell;
use tracing::info;

/// How the top holdings are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Single line `{"ARKK": "TSLA", ...}`
    #[default]
    Map,
    Table,
}

impl HoldingsResponse {
    pub fn display_as_map(&self) -> String {
        format!("{:?}", self.top_tickers())
    }

    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();

        table.set_header(vec![
            ui::header_cell("Fund"),
            ui::header_cell("Ticker"),
            ui::header_cell("Company"),
            ui::header_cell("Weight (%)"),
        ]);

        for (fund, holding) in self.top_holdings() {
            table.add_row(vec![
                Cell::new(fund),
                Cell::new(&holding.ticker),
                Cell::new(&holding.company),
                ui::format_percentage_cell(holding.weight, |w| format!("{w:.2}%")),
            ]);
        }

        let title = ui::style_text("Top holdings", ui::StyleType::Title);
        let range = ui::style_text(
            &format!("{} to {}", self.date_from, self.date_to),
            ui::StyleType::Subtle,
        );
        format!("{title} {range}\n{table}")
    }

    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Map => self.display_as_map(),
            OutputFormat::Table => self.display_as_table(),
        }
    }
}

/// Fetches the holdings of `funds` and prints the top holding of each.
pub async fn run(
    provider: &dyn HoldingsProvider,
    funds: &[String],
    format: OutputFormat,
) -> Result<()> {
    let holdings = provider.fetch_holdings(funds).await?;
    info!(
        "Fetched {} holdings for {}",
        holdings.holdings.len(),
        holdings.symbol
    );

    println!("{}", holdings.render(format));
    Ok(())
}
