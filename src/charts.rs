use crate::infrastructure::http::TeamActivity;
use crate::types::constants::{SCORE_PROGRESSION_POINTS, SUBMISSION_TIMELINE_POINTS};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// One point in a rolling display series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub at: DateTime<Utc>,
    pub value: f64,
}

/// FIFO ring of series points; pushing past the bound evicts the oldest.
#[derive(Debug, Clone)]
struct BoundedSeries {
    cap: usize,
    points: VecDeque<SeriesPoint>,
}

impl BoundedSeries {
    fn new(cap: usize) -> Self {
        Self {
            cap,
            points: VecDeque::with_capacity(cap),
        }
    }

    fn push(&mut self, point: SeriesPoint) {
        if self.points.len() == self.cap {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    fn last_value(&self) -> Option<f64> {
        self.points.back().map(|p| p.value)
    }

    fn snapshot(&self) -> Vec<SeriesPoint> {
        self.points.iter().copied().collect()
    }
}

/// Per-category solve counts shown in the distribution chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct CategoryStats {
    #[serde(default)]
    pub web: u64,
    #[serde(default)]
    pub crypto: u64,
    #[serde(default)]
    pub forensics: u64,
    #[serde(default)]
    pub reversing: u64,
    #[serde(default)]
    pub pwn: u64,
    #[serde(default)]
    pub misc: u64,
}

struct ChartState {
    submissions: BoundedSeries,
    score: BoundedSeries,
    categories: CategoryStats,
}

/// Consumes routed events and maintains the bounded rolling series behind the
/// display charts. The charting library itself is a collaborator that only
/// reads the snapshots.
pub struct ChartFeed {
    inner: Mutex<ChartState>,
}

impl ChartFeed {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ChartState {
                submissions: BoundedSeries::new(SUBMISSION_TIMELINE_POINTS),
                score: BoundedSeries::new(SCORE_PROGRESSION_POINTS),
                categories: CategoryStats::default(),
            }),
        }
    }

    /// Appends one submission to the timeline and, when points are known,
    /// advances the cumulative score progression.
    pub fn record_submission(&self, points: Option<i64>) {
        let now = Utc::now();
        let mut state = self.lock();
        state.submissions.push(SeriesPoint { at: now, value: 1.0 });

        if let Some(points) = points {
            let total = state.score.last_value().unwrap_or(0.0) + points as f64;
            state.score.push(SeriesPoint { at: now, value: total });
        }
    }

    pub fn set_category_stats(&self, stats: CategoryStats) {
        self.lock().categories = stats;
    }

    /// Replaces the submission timeline with authoritative hourly history.
    /// The rolling bound still applies.
    pub fn apply_history(&self, activity: &TeamActivity) {
        let today = Utc::now().date_naive();
        let mut series = BoundedSeries::new(SUBMISSION_TIMELINE_POINTS);
        for entry in &activity.hourly_activity {
            let Some(at) = today.and_hms_opt(entry.hour, 0, 0) else {
                tracing::warn!(hour = entry.hour, "skipping activity entry with invalid hour");
                continue;
            };
            series.push(SeriesPoint {
                at: at.and_utc(),
                value: entry.submissions as f64,
            });
        }
        self.lock().submissions = series;
    }

    pub fn submission_timeline(&self) -> Vec<SeriesPoint> {
        self.lock().submissions.snapshot()
    }

    pub fn score_progression(&self) -> Vec<SeriesPoint> {
        self.lock().score.snapshot()
    }

    pub fn category_distribution(&self) -> CategoryStats {
        self.lock().categories
    }

    /// Latest cumulative score on the progression series.
    pub fn current_score(&self) -> f64 {
        self.lock().score.last_value().unwrap_or(0.0)
    }

    fn lock(&self) -> MutexGuard<'_, ChartState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ChartFeed {
    fn default() -> Self {
        Self::new()
    }
}
