use crate::core::{Dataset, Record};
use crate::core::cleaning::parse_date;
use crate::domain::model::{
    Month, MonthlyPoint, MonthlySales, MonthlySeries, RankedTotal, RankedTotals, ReorderAlert,
    RevenueSummary,
};
use crate::utils::error::Result;
use std::collections::{BTreeMap, HashSet};

fn row_month(row: &Record) -> Option<Month> {
    match row.get("date") {
        serde_json::Value::String(s) => parse_date(s).map(Month::from_date),
        _ => None,
    }
}

/// Sums `value_column` per distinct `key_column`, largest first; ties keep key order.
pub fn group_totals(dataset: &Dataset, key_column: &str, value_column: &str) -> Result<RankedTotals> {
    dataset.require_column(key_column)?;
    dataset.require_column(value_column)?;

    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for row in &dataset.rows {
        let Some(key) = row.text(key_column) else {
            continue;
        };
        *totals.entry(key).or_insert(0.0) += row.number(value_column).unwrap_or(0.0);
    }

    let mut ranked: RankedTotals = totals
        .into_iter()
        .map(|(key, total)| RankedTotal { key, total })
        .collect();
    ranked.sort_by(|a, b| b.total.total_cmp(&a.total));
    Ok(ranked)
}

pub fn top_n_products_by_revenue(dataset: &Dataset, n: usize) -> Result<RankedTotals> {
    let mut ranked = group_totals(dataset, "product_name", "sales_revenue")?;
    ranked.truncate(n);
    Ok(ranked)
}

pub fn top_n_regions_by_revenue(dataset: &Dataset, n: usize) -> Result<RankedTotals> {
    let mut ranked = group_totals(dataset, "region", "sales_revenue")?;
    ranked.truncate(n);
    Ok(ranked)
}

pub fn monthly_sales(dataset: &Dataset) -> Result<Vec<MonthlySales>> {
    dataset.require_column("date")?;
    dataset.require_column("units_sold")?;
    dataset.require_column("sales_revenue")?;

    let mut months: BTreeMap<Month, (f64, f64)> = BTreeMap::new();
    for row in &dataset.rows {
        let Some(month) = row_month(row) else {
            continue;
        };
        let entry = months.entry(month).or_insert((0.0, 0.0));
        entry.0 += row.number("units_sold").unwrap_or(0.0);
        entry.1 += row.number("sales_revenue").unwrap_or(0.0);
    }

    Ok(months
        .into_iter()
        .map(|(month, (units_sold, sales_revenue))| MonthlySales {
            month,
            units_sold,
            sales_revenue,
        })
        .collect())
}

/// Totals of `value_column` per month, with every month between the first and last present.
pub fn contiguous_monthly_totals<'a, I>(rows: I, value_column: &str) -> MonthlySeries
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut totals: BTreeMap<Month, f64> = BTreeMap::new();
    for row in rows {
        if let Some(month) = row_month(row) {
            *totals.entry(month).or_insert(0.0) += row.number(value_column).unwrap_or(0.0);
        }
    }

    let (Some(first), Some(last)) = (
        totals.keys().next().copied(),
        totals.keys().next_back().copied(),
    ) else {
        return Vec::new();
    };

    first
        .range_inclusive(last)
        .into_iter()
        .map(|month| MonthlyPoint {
            month,
            value: totals.get(&month).copied().unwrap_or(0.0),
        })
        .collect()
}

/// Monthly units sold for the rows whose id or name equals `product`.
pub fn product_monthly_series(dataset: &Dataset, product: &str) -> Result<MonthlySeries> {
    dataset.require_column("date")?;
    dataset.require_column("units_sold")?;

    let matching = dataset.rows.iter().filter(|row| {
        row.text("product_id").as_deref() == Some(product)
            || row.text("product_name").as_deref() == Some(product)
    });
    Ok(contiguous_monthly_totals(matching, "units_sold"))
}

pub const ALERT_COLUMNS: [&str; 6] = [
    "product_id",
    "product_name",
    "region",
    "stock_available",
    "reorder_level",
    "supplier_name",
];

/// Rows whose stock is at or below their reorder level.
pub fn reorder_alerts(dataset: &Dataset) -> Result<Vec<ReorderAlert>> {
    for column in ALERT_COLUMNS {
        dataset.require_column(column)?;
    }

    Ok(dataset
        .rows
        .iter()
        .filter_map(|row| {
            let stock = row.number("stock_available")?;
            let level = row.number("reorder_level")?;
            (stock <= level).then(|| ReorderAlert {
                product_id: row.text("product_id"),
                product_name: row.text("product_name"),
                region: row.text("region"),
                stock_available: stock,
                reorder_level: level,
                supplier_name: row.text("supplier_name"),
            })
        })
        .collect())
}

pub fn revenue_summary(dataset: &Dataset) -> Result<RevenueSummary> {
    dataset.require_column("sales_revenue")?;
    let total_revenue = dataset
        .rows
        .iter()
        .filter_map(|row| row.number("sales_revenue"))
        .sum();
    let by_category = group_totals(dataset, "category", "sales_revenue")?;
    Ok(RevenueSummary {
        total_revenue,
        by_category,
    })
}

pub fn unique_products(dataset: &Dataset) -> Result<usize> {
    dataset.require_column("product_id")?;
    Ok(dataset
        .rows
        .iter()
        .filter_map(|row| row.text("product_id"))
        .collect::<HashSet<_>>()
        .len())
}

/// Lowest `stock_available` seen per product, ascending.
pub fn lowest_stock_by_product(dataset: &Dataset, n: usize) -> Result<RankedTotals> {
    dataset.require_column("product_name")?;
    dataset.require_column("stock_available")?;

    let mut minimums: BTreeMap<String, f64> = BTreeMap::new();
    for row in &dataset.rows {
        let (Some(name), Some(stock)) = (row.text("product_name"), row.number("stock_available"))
        else {
            continue;
        };
        minimums
            .entry(name)
            .and_modify(|current| *current = current.min(stock))
            .or_insert(stock);
    }

    let mut ranked: RankedTotals = minimums
        .into_iter()
        .map(|(key, total)| RankedTotal { key, total })
        .collect();
    ranked.sort_by(|a, b| a.total.total_cmp(&b.total));
    ranked.truncate(n);
    Ok(ranked)
}
