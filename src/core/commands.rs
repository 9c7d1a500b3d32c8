use crate::core::analysis::{
    monthly_sales, product_monthly_series, reorder_alerts, top_n_products_by_revenue,
    top_n_regions_by_revenue,
};
use crate::core::charts::{generate_charts, write_charts};
use crate::core::cleaning::{apply_cleaning, check_missing_values, prepare_dataset};
use crate::core::export::{export_alerts, export_cleaned_data};
use crate::core::forecast::moving_average_forecast;
use crate::core::loader::load_data;
use crate::core::{ConfigProvider, Dataset, Storage};
use crate::domain::model::{Forecast, MissingCount, MonthlySales, RankedTotals, ReorderAlert};
use crate::utils::error::Result;

/// Result of the `clean` command.
#[derive(Debug, Clone)]
pub struct CleanOutcome {
    /// Counts taken before any cleaning step ran.
    pub missing_values: Vec<MissingCount>,
    pub cleaned: Dataset,
    /// `None` when the sheet lacks the columns the summary needs.
    pub top_products: Option<RankedTotals>,
    pub top_regions: Option<RankedTotals>,
    pub file: String,
}

#[derive(Debug, Clone)]
pub struct AlertsOutcome {
    pub alerts: Vec<ReorderAlert>,
    pub file: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SalesOutcome {
    pub monthly: Vec<MonthlySales>,
    /// Only set when a product was requested and it has history.
    pub forecast: Option<Forecast>,
}

pub async fn load_prepared<S: Storage, C: ConfigProvider>(input: &S, config: &C) -> Result<Dataset> {
    let raw = load_data(input, config.input_path(), config.delimiter()).await?;
    Ok(prepare_dataset(raw))
}

/// Missing-value report, configured cleaning, top-N summaries and the cleaned CSV.
pub async fn clean_sheet<S: Storage, C: ConfigProvider>(
    input: &S,
    output: &S,
    config: &C,
) -> Result<CleanOutcome> {
    let dataset = load_prepared(input, config).await?;
    let missing_values = check_missing_values(&dataset);
    let cleaned = apply_cleaning(dataset, &config.cleaning())?;

    let top_products = match top_n_products_by_revenue(&cleaned, config.top_n()) {
        Ok(top) => Some(top),
        Err(e) => {
            tracing::warn!("Skipping product summary: {}", e);
            None
        }
    };
    let top_regions = match top_n_regions_by_revenue(&cleaned, config.top_n()) {
        Ok(top) => Some(top),
        Err(e) => {
            tracing::warn!("Skipping region summary: {}", e);
            None
        }
    };

    let file = export_cleaned_data(output, &cleaned, config.delimiter()).await?;
    Ok(CleanOutcome {
        missing_values,
        cleaned,
        top_products,
        top_regions,
        file,
    })
}

pub async fn inventory_alerts<S: Storage, C: ConfigProvider>(
    input: &S,
    output: &S,
    config: &C,
    export: bool,
) -> Result<AlertsOutcome> {
    let dataset = load_prepared(input, config).await?;
    let alerts = reorder_alerts(&dataset)?;
    tracing::info!("{} products at or below their reorder level", alerts.len());

    let file = if export {
        Some(export_alerts(output, &alerts, config.delimiter()).await?)
    } else {
        None
    };
    Ok(AlertsOutcome { alerts, file })
}

pub async fn sales_overview<S: Storage, C: ConfigProvider>(
    input: &S,
    config: &C,
) -> Result<SalesOutcome> {
    let dataset = load_prepared(input, config).await?;
    let monthly = monthly_sales(&dataset)?;

    let Some((product, window, periods)) = config.forecast() else {
        return Ok(SalesOutcome {
            monthly,
            forecast: None,
        });
    };

    let history = product_monthly_series(&dataset, &product)?;
    if history.is_empty() {
        tracing::warn!("No time series data for product '{}'", product);
        return Ok(SalesOutcome {
            monthly,
            forecast: None,
        });
    }

    let forecast = moving_average_forecast(&history, window, periods)?;
    Ok(SalesOutcome {
        monthly,
        forecast: Some(Forecast {
            product,
            window,
            history,
            forecast,
        }),
    })
}

/// Writes every chart spec and returns their paths relative to `output`.
pub async fn render_charts<S: Storage, C: ConfigProvider>(
    input: &S,
    output: &S,
    config: &C,
) -> Result<Vec<String>> {
    let dataset = load_prepared(input, config).await?;
    let charts = generate_charts(&dataset)?;
    write_charts(output, &charts).await
}

pub async fn export_sheet<S: Storage, C: ConfigProvider>(
    input: &S,
    output: &S,
    config: &C,
) -> Result<String> {
    let dataset = load_prepared(input, config).await?;
    export_cleaned_data(output, &dataset, config.delimiter()).await
}
