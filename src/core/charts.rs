use crate::core::{Dataset, Storage};
use crate::core::analysis::{
    contiguous_monthly_totals, group_totals, lowest_stock_by_product, reorder_alerts,
    unique_products,
};
use crate::domain::model::{ChartKind, ChartSpec, RankedTotals};
use crate::utils::error::Result;

pub const CHARTS_DIR: &str = "charts";

fn bar_chart(name: &str, title: &str, y_label: &str, totals: RankedTotals) -> ChartSpec {
    let (labels, values) = totals.into_iter().map(|t| (t.key, t.total)).unzip();
    ChartSpec {
        name: name.to_string(),
        kind: ChartKind::Bar,
        title: title.to_string(),
        x_label: None,
        y_label: Some(y_label.to_string()),
        labels,
        values,
    }
}

/// Builds every chart the data supports. Charts with nothing to plot are left out.
pub fn generate_charts(dataset: &Dataset) -> Result<Vec<ChartSpec>> {
    let mut charts = Vec::new();

    if dataset.has_column("units_sold") && dataset.has_column("date") {
        let monthly = contiguous_monthly_totals(&dataset.rows, "units_sold");
        if !monthly.is_empty() {
            charts.push(ChartSpec {
                name: "monthly_units_sold".to_string(),
                kind: ChartKind::Line,
                title: "Monthly Units Sold".to_string(),
                x_label: Some("Month".to_string()),
                y_label: Some("Units Sold".to_string()),
                labels: monthly.iter().map(|p| p.month.to_string()).collect(),
                values: monthly.iter().map(|p| p.value).collect(),
            });
        }
    }

    let mut top_products = group_totals(dataset, "product_name", "sales_revenue")?;
    top_products.truncate(10);
    if !top_products.is_empty() {
        charts.push(bar_chart(
            "top_products_revenue",
            "Top 10 Products by Revenue",
            "Sales Revenue",
            top_products,
        ));
    }

    let region_sales = group_totals(dataset, "region", "sales_revenue")?;
    if !region_sales.is_empty() {
        charts.push(bar_chart(
            "region_sales",
            "Sales by Region",
            "Sales Revenue",
            region_sales,
        ));
    }

    let low_stock = lowest_stock_by_product(dataset, 20)?;
    if !low_stock.is_empty() {
        charts.push(bar_chart(
            "low_stock_products",
            "Lowest Stock by Product (min across regions)",
            "Stock Available",
            low_stock,
        ));
    }

    let alerts = reorder_alerts(dataset)?.len();
    let total_products = unique_products(dataset)?;
    if total_products > 0 {
        charts.push(ChartSpec {
            name: "reorder_status".to_string(),
            kind: ChartKind::Pie,
            title: "Reorder Status".to_string(),
            x_label: None,
            y_label: None,
            labels: vec!["Need Reorder".to_string(), "OK".to_string()],
            values: vec![
                alerts as f64,
                total_products.saturating_sub(alerts) as f64,
            ],
        });
    }

    tracing::debug!("Generated {} charts", charts.len());
    Ok(charts)
}

pub fn chart_path(chart: &ChartSpec) -> String {
    format!("{}/{}.json", CHARTS_DIR, chart.name)
}

/// Writes each chart as `charts/<name>.json` and returns the written paths.
pub async fn write_charts<S: Storage>(storage: &S, charts: &[ChartSpec]) -> Result<Vec<String>> {
    let mut paths = Vec::with_capacity(charts.len());
    for chart in charts {
        let path = chart_path(chart);
        let json = serde_json::to_vec_pretty(chart)?;
        storage.write_file(&path, &json).await?;
        paths.push(path);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cleaning::prepare_dataset;
    use crate::core::loader::parse_csv;

    const SHEET: &str = "\
date,product_id,product_name,region,units_sold,sales_revenue,stock_available,reorder_level,supplier_name
2024-01-05,P1,Gloves,Pune,10,100,5,10,MedSupply
2024-03-02,P2,Masks,Mumbai,5,50,40,12,SafeCare
2024-03-09,P2,Masks,Pune,5,50,30,12,SafeCare
";

    fn chart<'a>(charts: &'a [ChartSpec], name: &str) -> &'a ChartSpec {
        charts.iter().find(|c| c.name == name).unwrap()
    }

    #[test]
    fn test_generate_all_charts() {
        let dataset = prepare_dataset(parse_csv(SHEET.as_bytes(), b',').unwrap());
        let charts = generate_charts(&dataset).unwrap();
        assert_eq!(charts.len(), 5);

        let monthly = chart(&charts, "monthly_units_sold");
        assert_eq!(monthly.kind, ChartKind::Line);
        assert_eq!(monthly.labels, vec!["2024-01", "2024-02", "2024-03"]);
        assert_eq!(monthly.values, vec![10.0, 0.0, 10.0]);

        let regions = chart(&charts, "region_sales");
        assert_eq!(regions.labels, vec!["Pune", "Mumbai"]);
        assert_eq!(regions.values, vec![150.0, 50.0]);

        let low = chart(&charts, "low_stock_products");
        assert_eq!(low.labels, vec!["Gloves", "Masks"]);
        assert_eq!(low.values, vec![5.0, 30.0]);

        let status = chart(&charts, "reorder_status");
        assert_eq!(status.kind, ChartKind::Pie);
        assert_eq!(status.values, vec![1.0, 1.0]);
    }

    #[test]
    fn test_empty_sheet_has_no_charts() {
        let dataset = prepare_dataset(
            parse_csv(
                b"date,product_id,product_name,region,units_sold,sales_revenue,stock_available,reorder_level,supplier_name\n",
                b',',
            )
            .unwrap(),
        );
        assert!(generate_charts(&dataset).unwrap().is_empty());
    }

    #[test]
    fn test_chart_path() {
        let dataset = prepare_dataset(parse_csv(SHEET.as_bytes(), b',').unwrap());
        let charts = generate_charts(&dataset).unwrap();
        assert_eq!(chart_path(&charts[0]), "charts/monthly_units_sold.json");
    }
}
