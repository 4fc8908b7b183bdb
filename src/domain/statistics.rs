use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FiveNumberSummary {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Equal-width bin edges spanning every value of every series.
pub fn shared_bin_edges(series: &[&[f64]], bins: usize) -> Vec<f64> {
    let bins = bins.max(1);
    let mut values = series.iter().flat_map(|values| values.iter().copied());
    let Some(first) = values.next() else {
        return Vec::new();
    };
    let (min, max) = values.fold((first, first), |(min, max), v| (min.min(v), max.max(v)));

    if min == max {
        return vec![min, min + 1.0];
    }

    let width = (max - min) / bins as f64;
    (0..=bins)
        .map(|index| if index == bins { max } else { min + width * index as f64 })
        .collect()
}

/// Counts values into the bins described by `edges`. The last bin is closed.
pub fn histogram(values: &[f64], edges: &[f64]) -> Vec<HistogramBin> {
    if edges.len() < 2 {
        return Vec::new();
    }

    let mut bins: Vec<HistogramBin> = edges
        .windows(2)
        .map(|pair| HistogramBin {
            start: pair[0],
            end: pair[1],
            count: 0,
        })
        .collect();
    let last = bins.len() - 1;

    for &value in values {
        if value < edges[0] || value > edges[edges.len() - 1] {
            continue;
        }
        let index = edges[1..]
            .iter()
            .position(|&end| value < end)
            .unwrap_or(last);
        bins[index].count += 1;
    }

    bins
}

/// Quantile with linear interpolation between closest ranks. `sorted` must be ascending.
pub fn quantile(sorted: &[f64], probability: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let position = probability.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

pub fn five_number_summary(values: &[f64]) -> Option<FiveNumberSummary> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);

    Some(FiveNumberSummary {
        min: *sorted.first()?,
        q1: quantile(&sorted, 0.25)?,
        median: quantile(&sorted, 0.5)?,
        q3: quantile(&sorted, 0.75)?,
        max: *sorted.last()?,
    })
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Pearson correlation; `None` when either side has no variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }

    let mean_x = mean(xs)?;
    let mean_y = mean(ys)?;
    let (mut covariance, mut variance_x, mut variance_y) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        variance_x += dx * dx;
        variance_y += dy * dy;
    }

    if variance_x == 0.0 || variance_y == 0.0 {
        return None;
    }

    Some(covariance / (variance_x.sqrt() * variance_y.sqrt()))
}

/// Degree-1 least squares fit of `ys` on `xs`.
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Option<LinearFit> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }

    let mean_x = mean(xs)?;
    let mean_y = mean(ys)?;
    let (mut covariance, mut variance_x) = (0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        covariance += (x - mean_x) * (y - mean_y);
        variance_x += (x - mean_x) * (x - mean_x);
    }

    if variance_x == 0.0 {
        return None;
    }

    let slope = covariance / variance_x;
    Some(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}
