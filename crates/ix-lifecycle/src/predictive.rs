//! Task 12, predictive maintenance: "fit a simple
//! trend on historical bloat to forecast which indexes will need REINDEX
//! within the next maintenance horizon." Pure function over a caller-
//! supplied bloat history; this crate doesn't persist a bloat time series
//! itself (`bloat::find_bloated` only ever samples the current value), so
//! the caller — the `ix-daemon` heavy tick — is expected to keep a rolling
//! window of recent `bloat::find_bloated` snapshots and pass it in here.

use chrono::{
    DateTime,
    Duration,
    Utc,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloatSample {
    pub ts: DateTime<Utc>,
    pub bloat_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReindexForecast {
    pub index: String,
    pub projected_bloat_pct: f64,
    pub will_exceed_threshold: bool,
}

/// Ordinary least squares slope/intercept of `bloat_pct` against elapsed
/// hours since `history`'s earliest sample.
fn fit_trend(history: &[BloatSample]) -> Option<(f64, f64)> {
    if history.len() < 2 {
        return None;
    }
    let t0 = history[0].ts;
    let xs: Vec<f64> = history.iter().map(|s| (s.ts - t0).num_seconds() as f64 / 3_600.0).collect();
    let ys: Vec<f64> = history.iter().map(|s| s.bloat_pct).collect();
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let mut num = 0.0;
    let mut den = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        num += (x - mean_x) * (y - mean_y);
        den += (x - mean_x).powi(2);
    }
    if den == 0.0 {
        return Some((0.0, mean_y));
    }
    let slope = num / den;
    let intercept = mean_y - slope * mean_x;
    Some((slope, intercept))
}

/// Projects `history`'s trend `horizon` forward from its latest sample and
/// flags it if the projection crosses `threshold_pct`. Returns `None` when
/// fewer than two samples exist to fit a trend from.
pub fn forecast(index: &str, history: &[BloatSample], horizon: Duration, threshold_pct: f64) -> Option<ReindexForecast> {
    let (slope, intercept) = fit_trend(history)?;
    let t0 = history[0].ts;
    let latest = history.iter().map(|s| s.ts).max().unwrap_or(t0);
    let projected_x = (latest + horizon - t0).num_seconds() as f64 / 3_600.0;
    let projected_bloat_pct = (slope * projected_x + intercept).max(0.0);
    Some(ReindexForecast {
        index: index.to_owned(),
        projected_bloat_pct,
        will_exceed_threshold: projected_bloat_pct >= threshold_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(hours_ago: i64, bloat_pct: f64) -> BloatSample {
        BloatSample {
            ts: Utc::now() - Duration::hours(hours_ago),
            bloat_pct,
        }
    }

    #[test]
    fn too_little_history_yields_no_forecast() {
        assert!(forecast("ixp_t1_contacts_email", &[sample(1, 10.0)], Duration::days(7), 30.0).is_none());
    }

    #[test]
    fn a_rising_trend_is_projected_forward() {
        let history = vec![sample(72, 10.0), sample(48, 15.0), sample(24, 20.0), sample(0, 25.0)];
        let forecast = forecast("ixp_t1_contacts_email", &history, Duration::hours(48), 30.0).unwrap();
        assert!(forecast.projected_bloat_pct > 25.0, "{forecast:?}");
        assert!(forecast.will_exceed_threshold);
    }

    #[test]
    fn a_flat_trend_does_not_cross_the_threshold() {
        let history = vec![sample(48, 10.0), sample(24, 10.0), sample(0, 10.0)];
        let forecast = forecast("ixp_t1_contacts_email", &history, Duration::days(30), 30.0).unwrap();
        assert!(!forecast.will_exceed_threshold);
    }
}
