use anyhow::Context;
use clap::Parser;
use hospital_etl::config::cli::{AlertArgs, CleanArgs, Command, RunArgs, SalesArgs};
use hospital_etl::core::commands;
use hospital_etl::core::loader::write_csv;
use hospital_etl::core::ConfigProvider;
use hospital_etl::domain::model::{RankedTotals, ReorderAlert};
use hospital_etl::utils::{logger, validation::Validate};
use hospital_etl::{
    AnalyticsPipeline, CliConfig, EtlEngine, EtlError, LocalStorage, Result, TomlConfig,
};

/// Rows of history shown next to a forecast.
const HISTORY_MONTHS: usize = 24;
const RAW_PREVIEW_ROWS: usize = 50;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    if config.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting hospital-etl");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if config.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let result = match &config.command {
        Command::Clean(args) => clean(&config, args).await,
        Command::Alerts(args) => alerts(&config, args).await,
        Command::Sales(args) => sales(&config, args).await,
        Command::Charts => charts(&config).await,
        Command::Export => export(&config).await,
        Command::Report(_) => {
            let output = output_storage(&config);
            let engine = EtlEngine::new_with_monitoring(
                AnalyticsPipeline::new(input_storage(), output, config.clone()),
                config.monitor,
            );
            engine.run().await.map(print_success)
        }
        Command::Run(args) => return run_from_toml(args, config.monitor).await,
    };

    if let Err(e) = result {
        exit_with(&e);
    }

    Ok(())
}

fn input_storage() -> LocalStorage {
    LocalStorage::new(".".to_string())
}

fn output_storage(config: &CliConfig) -> LocalStorage {
    LocalStorage::new(config.output_path.clone())
}

fn print_success(output_path: String) {
    tracing::info!("✅ ETL process completed successfully!");
    println!("✅ ETL process completed successfully!");
    println!("📁 Output saved to: {}", output_path);
}

fn exit_with(e: &EtlError) {
    tracing::error!(
        "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    let exit_code = e.exit_code();
    if exit_code > 0 {
        std::process::exit(exit_code);
    }
}

fn print_ranked(title: &str, totals: &RankedTotals) {
    println!("{}", title);
    for total in totals {
        println!("  {:<40} {:>14.2}", total.key, total.total);
    }
}

fn print_alerts(alerts: &[ReorderAlert]) {
    let text = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    println!(
        "  {:<10} {:<30} {:<16} {:>8} {:>8}  {}",
        "ID", "Product", "Region", "Stock", "Reorder", "Supplier"
    );
    for alert in alerts {
        println!(
            "  {:<10} {:<30} {:<16} {:>8} {:>8}  {}",
            text(&alert.product_id),
            text(&alert.product_name),
            text(&alert.region),
            alert.stock_available,
            alert.reorder_level,
            text(&alert.supplier_name)
        );
    }
}

async fn clean(config: &CliConfig, args: &CleanArgs) -> Result<()> {
    let output = output_storage(config);
    let outcome = commands::clean_sheet(&input_storage(), &output, config).await?;

    println!("🧹 Missing values");
    for count in &outcome.missing_values {
        println!("  {:<24} {}", count.column, count.missing);
    }
    println!("  Rows after cleaning: {}", outcome.cleaned.len());
    println!();

    if let Some(top) = &outcome.top_products {
        print_ranked("Top products by revenue:", top);
    }
    if let Some(top) = &outcome.top_regions {
        print_ranked("Top regions by revenue:", top);
    }

    if args.show_raw {
        println!();
        let preview = write_csv(&outcome.cleaned.head(RAW_PREVIEW_ROWS), config.delimiter())?;
        println!("{}", String::from_utf8_lossy(&preview));
    }

    println!("✅ Cleaned data written to {}", output.resolve(&outcome.file).display());
    Ok(())
}

async fn alerts(config: &CliConfig, args: &AlertArgs) -> Result<()> {
    let output = output_storage(config);
    let outcome = commands::inventory_alerts(&input_storage(), &output, config, args.export).await?;

    println!("📦 Products needing reorder: {}", outcome.alerts.len());
    print_alerts(&outcome.alerts);

    if let Some(file) = &outcome.file {
        println!("✅ Alerts exported to {}", output.resolve(file).display());
    }
    Ok(())
}

async fn sales(config: &CliConfig, args: &SalesArgs) -> Result<()> {
    let outcome = commands::sales_overview(&input_storage(), config).await?;

    println!("📈 Monthly sales overview");
    println!("  {:<8} {:>12} {:>14}", "Month", "Units", "Revenue");
    for month in &outcome.monthly {
        println!(
            "  {:<8} {:>12} {:>14.2}",
            month.month.to_string(),
            month.units_sold,
            month.sales_revenue
        );
    }

    let Some(product) = &args.product else {
        return Ok(());
    };
    let Some(forecast) = &outcome.forecast else {
        println!("⚠️ No time series data for this product.");
        return Ok(());
    };

    let history = &forecast.history;
    println!();
    println!("Historical units sold for {} (last {} months):", product, HISTORY_MONTHS);
    for point in &history[history.len().saturating_sub(HISTORY_MONTHS)..] {
        println!("  {}  {:>10}", point.month, point.value);
    }

    println!("Forecast ({}-month moving average):", forecast.window);
    for point in &forecast.forecast {
        println!("  {}  {:>10.2}", point.month, point.value);
    }
    Ok(())
}

async fn charts(config: &CliConfig) -> Result<()> {
    let output = output_storage(config);
    let paths = commands::render_charts(&input_storage(), &output, config).await?;
    println!("📊 Charts generated: {}", paths.len());
    for path in paths {
        println!("  {}", output.resolve(&path).display());
    }
    Ok(())
}

async fn export(config: &CliConfig) -> Result<()> {
    let output = output_storage(config);
    let file = commands::export_sheet(&input_storage(), &output, config).await?;
    println!("💾 Exported cleaned data to {}", output.resolve(&file).display());
    Ok(())
}

async fn run_from_toml(args: &RunArgs, monitor_flag: bool) -> anyhow::Result<()> {
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let config = TomlConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load config file '{}'", args.config))?;

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }
    tracing::info!("✅ Configuration loaded and validated successfully");

    display_config_summary(&config, args);
    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        return Ok(());
    }

    let monitor_enabled = monitor_flag || config.monitoring_enabled();
    let output = LocalStorage::new(config.output_path().to_string());
    let engine = EtlEngine::new_with_monitoring(
        AnalyticsPipeline::new(input_storage(), output, config),
        monitor_enabled,
    );

    match engine.run().await {
        Ok(path) => print_success(path),
        Err(e) => exit_with(&e),
    }
    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &RunArgs) {
    println!("📋 Configuration Summary:");
    println!(
        "  Pipeline: {} v{}",
        config.pipeline.name, config.pipeline.version
    );
    println!("  Input: {}", config.input_path());
    println!("  Output: {}", config.output_path());
    println!("  Top N: {}", config.top_n());

    let cleaning = config.cleaning();
    if let Some(value) = &cleaning.fill_missing {
        println!("  Fill missing with: {}", value);
    }
    if cleaning.drop_missing {
        println!("  Drop rows with missing values");
    }
    if let Some(subset) = &cleaning.dedupe_subset {
        if subset.is_empty() {
            println!("  Remove duplicate rows");
        } else {
            println!("  Remove duplicates by: {}", subset.join(", "));
        }
    }
    if !cleaning.clean_text_columns.is_empty() {
        println!("  Clean text: {}", cleaning.clean_text_columns.join(", "));
    }
    for (column, dtype) in &cleaning.conversions {
        println!("  Convert {} to {}", column, dtype);
    }

    if let Some((product, window, periods)) = config.forecast() {
        println!(
            "  Forecast: {} ({}-month window, {} months ahead)",
            product, window, periods
        );
    }

    if config.compress_output() {
        println!("  Bundle: {}", config.bundle_filename());
    }

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }
    println!();
}
