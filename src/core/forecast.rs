use crate::domain::model::{MonthlyPoint, MonthlySeries};
use crate::utils::error::Result;
use crate::utils::validation::validate_positive_number;

/// Naive forecast: the mean of the last `window` months, repeated for `periods` months.
///
/// Shorter histories average whatever is available. An empty history yields an
/// empty forecast.
pub fn moving_average_forecast(
    series: &MonthlySeries,
    window: usize,
    periods: usize,
) -> Result<MonthlySeries> {
    validate_positive_number("window", window, 1)?;
    validate_positive_number("periods", periods, 1)?;

    let Some(last) = series.last() else {
        return Ok(Vec::new());
    };

    let tail = &series[series.len().saturating_sub(window)..];
    let mean = tail.iter().map(|p| p.value).sum::<f64>() / tail.len() as f64;

    let mut month = last.month;
    Ok((0..periods)
        .map(|_| {
            month = month.succ();
            MonthlyPoint { month, value: mean }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Month;

    fn series(start: Month, values: &[f64]) -> MonthlySeries {
        let mut month = start;
        values
            .iter()
            .map(|&value| {
                let point = MonthlyPoint { month, value };
                month = month.succ();
                point
            })
            .collect()
    }

    #[test]
    fn test_forecast_uses_last_window() {
        let history = series(Month::new(2024, 1), &[10.0, 20.0, 30.0, 60.0]);
        let forecast = moving_average_forecast(&history, 3, 2).unwrap();

        assert_eq!(forecast.len(), 2);
        assert_eq!(forecast[0].month, Month::new(2024, 5));
        assert_eq!(forecast[1].month, Month::new(2024, 6));
        assert!(forecast.iter().all(|p| (p.value - 110.0 / 3.0).abs() < 1e-9));
    }

    #[test]
    fn test_forecast_with_short_history() {
        let history = series(Month::new(2023, 11), &[4.0, 8.0]);
        let forecast = moving_average_forecast(&history, 6, 3).unwrap();

        let months: Vec<String> = forecast.iter().map(|p| p.month.to_string()).collect();
        assert_eq!(months, vec!["2024-01", "2024-02", "2024-03"]);
        assert!(forecast.iter().all(|p| p.value == 6.0));
    }

    #[test]
    fn test_forecast_empty_series() {
        let forecast = moving_average_forecast(&Vec::new(), 3, 3).unwrap();
        assert!(forecast.is_empty());
    }

    #[test]
    fn test_forecast_rejects_zero_window() {
        let history = series(Month::new(2024, 1), &[1.0]);
        assert!(moving_average_forecast(&history, 0, 3).is_err());
        assert!(moving_average_forecast(&history, 3, 0).is_err());
    }
}
