use super::domain::{Metric, MonthOverMonth, SparklinePoint, TimeSeriesPoint, TrendDirection};

const TREND_WINDOW: usize = 5;
const TREND_BAND: f64 = 0.02;

/// Percentage change between the last two points of `points` for `metric`.
pub fn month_over_month(points: &[TimeSeriesPoint], metric: Metric) -> Option<MonthOverMonth> {
    let [.., previous, latest] = points else {
        return None;
    };
    let previous = previous.value(metric)?;
    let latest = latest.value(metric)?;
    if previous == 0.0 {
        return None;
    }

    let value = (latest - previous) / previous * 100.0;
    let is_positive = value >= 0.0;
    let sign = if is_positive { "+" } else { "" };
    Some(MonthOverMonth {
        value,
        is_positive,
        formatted: format!("{sign}{value:.1}%"),
    })
}

/// Per-point view of one metric. Iterating does not consume the series, so
/// the same sparkline can be walked any number of times.
#[derive(Debug, Clone, Copy)]
pub struct Sparkline<'a> {
    points: &'a [TimeSeriesPoint],
    metric: Metric,
}

impl<'a> Sparkline<'a> {
    pub fn new(points: &'a [TimeSeriesPoint], metric: Metric) -> Self {
        Self { points, metric }
    }

    pub fn iter(&self) -> impl Iterator<Item = SparklinePoint> + 'a {
        let metric = self.metric;
        self.points.iter().map(move |point| SparklinePoint {
            date: point.snapshot_date,
            value: point.value(metric).unwrap_or(0.0),
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl<'a> IntoIterator for Sparkline<'a> {
    type Item = SparklinePoint;
    type IntoIter = Box<dyn Iterator<Item = SparklinePoint> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Direction of the last five values: the mean of the final two compared to
/// the mean of the first two, with a 2% dead band.
pub fn trend_direction(values: &[f64]) -> TrendDirection {
    let window = &values[values.len().saturating_sub(TREND_WINDOW)..];
    if window.is_empty() {
        return TrendDirection::Stable;
    }

    let head = &window[..window.len().min(2)];
    let tail = &window[window.len().saturating_sub(2)..];
    let first = mean(head);
    let second = mean(tail);

    if second > first * (1.0 + TREND_BAND) {
        TrendDirection::Rising
    } else if second < first * (1.0 - TREND_BAND) {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    }
}

/// Values of `metric` in date order with gaps read as zero, as the
/// sparkline shows them.
pub fn metric_values(points: &[TimeSeriesPoint], metric: Metric) -> Vec<f64> {
    Sparkline::new(points, metric)
        .iter()
        .map(|point| point.value)
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
