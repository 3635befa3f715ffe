//! Dashboard snapshot and daily/weekly JSON reports under the results root.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, IsoWeek, NaiveDate, NaiveTime, Utc, Weekday};
use serde::Serialize;
use steward_core::errors::StorageError;
use steward_core::types::{SloMetric, SloSample, SubsystemHeartbeat, Violation};
use steward_storage::MetricStore;

use crate::health::HealthScore;

pub const DASHBOARD_FILE: &str = "dashboard.json";
pub const REPORTS_DIR: &str = "reports";

/// Refreshed every SLO cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub generated_at: String,
    pub health: HealthScore,
    /// Reason, while emergency mode is active.
    pub emergency: Option<String>,
    pub workers: Vec<SubsystemHeartbeat>,
    pub slo: Vec<SloSample>,
    /// kind -> severity -> count.
    pub open_violations: BTreeMap<String, BTreeMap<String, u32>>,
    pub open_violation_total: usize,
}

impl Dashboard {
    pub fn new(
        now: i64,
        health: HealthScore,
        emergency: Option<String>,
        workers: Vec<SubsystemHeartbeat>,
        slo: Vec<SloSample>,
        open: &[Violation],
    ) -> Self {
        Self {
            generated_at: rfc3339(now),
            health,
            emergency,
            workers,
            slo,
            open_violations: open_violation_counts(open),
            open_violation_total: open.len(),
        }
    }

    pub fn write(&self, results_root: &Path) -> std::io::Result<PathBuf> {
        let path = results_root.join(DASHBOARD_FILE);
        write_json(&path, self)?;
        Ok(path)
    }
}

pub fn open_violation_counts(open: &[Violation]) -> BTreeMap<String, BTreeMap<String, u32>> {
    let mut counts: BTreeMap<String, BTreeMap<String, u32>> = BTreeMap::new();
    for v in open {
        *counts
            .entry(v.kind.name().to_string())
            .or_default()
            .entry(v.severity.name().to_string())
            .or_default() += 1;
    }
    counts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    Daily,
    Weekly,
}

impl ReportPeriod {
    pub fn seconds(&self) -> i64 {
        match self {
            Self::Daily => 86_400,
            Self::Weekly => 7 * 86_400,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SloSummary {
    pub metric: SloMetric,
    pub samples: usize,
    pub mean: f64,
    pub compliant_fraction: f64,
    pub last: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GovernanceReport {
    pub period: ReportPeriod,
    pub period_start: String,
    pub period_end: String,
    pub violations_opened: BTreeMap<String, u32>,
    pub predictive_opened: u32,
    /// Of the violations opened in the period, how many are closed now.
    pub violations_closed: u32,
    pub actions: BTreeMap<String, u32>,
    pub slo: Vec<SloSummary>,
    pub health: HealthScore,
}

impl GovernanceReport {
    /// Aggregate the store over the period ending at `end`.
    pub fn build(
        store: &MetricStore,
        period: ReportPeriod,
        end: i64,
        health: HealthScore,
    ) -> Result<Self, StorageError> {
        let start = end - period.seconds();

        let opened = store.violations_opened_since(start)?;
        let mut violations_opened: BTreeMap<String, u32> = BTreeMap::new();
        for v in &opened {
            *violations_opened.entry(v.kind.name().to_string()).or_default() += 1;
        }

        let mut actions: BTreeMap<String, u32> = BTreeMap::new();
        for a in store.actions_finished_since(start)? {
            *actions.entry(a.status.name().to_string()).or_default() += 1;
        }

        let mut slo = Vec::with_capacity(SloMetric::ALL.len());
        for metric in SloMetric::ALL {
            let samples = store.recent_samples(metric, start)?;
            if samples.is_empty() {
                continue;
            }
            let n = samples.len();
            slo.push(SloSummary {
                metric,
                samples: n,
                mean: samples.iter().map(|s| s.value).sum::<f64>() / n as f64,
                compliant_fraction: samples.iter().filter(|s| s.compliant).count() as f64 / n as f64,
                last: samples.last().map(|s| s.value),
            });
        }

        Ok(Self {
            period,
            period_start: rfc3339(start),
            period_end: rfc3339(end),
            predictive_opened: opened.iter().filter(|v| v.predictive).count() as u32,
            violations_closed: opened.iter().filter(|v| v.closed_at.is_some()).count() as u32,
            violations_opened,
            actions,
            slo,
            health,
        })
    }

    /// `reports/daily-YYYY-MM-DD.json` or `reports/weekly-YYYY-Www.json`.
    pub fn file_name(&self, end: i64) -> String {
        let at = utc(end);
        match self.period {
            ReportPeriod::Daily => format!("daily-{}.json", at.format("%Y-%m-%d")),
            ReportPeriod::Weekly => {
                let week = at.iso_week();
                format!("weekly-{}-W{:02}.json", week.year(), week.week())
            }
        }
    }

    pub fn write(&self, results_root: &Path, end: i64) -> std::io::Result<PathBuf> {
        let path = results_root.join(REPORTS_DIR).join(self.file_name(end));
        write_json(&path, self)?;
        Ok(path)
    }
}

/// Tracks which daily and weekly reports have been produced.
///
/// A daily report is due once per UTC day, at or after the configured time.
/// A weekly report is due on Mondays under the same rule.
#[derive(Debug, Clone)]
pub struct ReportSchedule {
    at: NaiveTime,
    last_daily: Option<NaiveDate>,
    last_weekly: Option<IsoWeek>,
}

impl ReportSchedule {
    pub fn new((hour, minute): (u32, u32)) -> Self {
        Self {
            at: NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN),
            last_daily: None,
            last_weekly: None,
        }
    }

    /// Marks and returns the day when a daily report is due at `now`.
    pub fn daily_due(&mut self, now: i64) -> Option<NaiveDate> {
        let now = utc(now);
        let today = now.date_naive();
        if now.time() < self.at || self.last_daily == Some(today) {
            return None;
        }
        self.last_daily = Some(today);
        Some(today)
    }

    pub fn weekly_due(&mut self, now: i64) -> Option<IsoWeek> {
        let now = utc(now);
        let week = now.iso_week();
        if now.weekday() != Weekday::Mon || now.time() < self.at || self.last_weekly == Some(week) {
            return None;
        }
        self.last_weekly = Some(week);
        Some(week)
    }
}

fn utc(ts: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(ts, 0).unwrap_or_default()
}

fn rfc3339(ts: i64) -> String {
    utc(ts).to_rfc3339()
}

/// Pretty JSON, written to a sibling temp file and renamed into place.
fn write_json<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2026-10-12 is a Monday.
    const MONDAY_MIDNIGHT: i64 = 1_791_763_200;

    #[test]
    fn daily_report_once_per_day_after_the_configured_time() {
        let mut schedule = ReportSchedule::new((6, 30));
        assert_eq!(schedule.daily_due(MONDAY_MIDNIGHT + 3_600), None);
        let day = schedule.daily_due(MONDAY_MIDNIGHT + 7 * 3_600).unwrap();
        assert_eq!(day.to_string(), "2026-10-12");
        assert_eq!(schedule.daily_due(MONDAY_MIDNIGHT + 8 * 3_600), None);
        assert!(schedule.daily_due(MONDAY_MIDNIGHT + 86_400 + 7 * 3_600).is_some());
    }

    #[test]
    fn weekly_report_only_on_mondays() {
        let mut schedule = ReportSchedule::new((0, 0));
        assert!(schedule.weekly_due(MONDAY_MIDNIGHT - 3_600).is_none());
        let week = schedule.weekly_due(MONDAY_MIDNIGHT + 60).unwrap();
        assert_eq!(week.week(), 42);
        assert!(schedule.weekly_due(MONDAY_MIDNIGHT + 120).is_none());
        assert!(schedule.weekly_due(MONDAY_MIDNIGHT + 86_400).is_none());
    }

    #[test]
    fn report_file_names() {
        let store = MetricStore::open_in_memory().unwrap();
        let health = crate::health::overall_health(&[], &[], &[]);
        let daily = GovernanceReport::build(&store, ReportPeriod::Daily, MONDAY_MIDNIGHT, health).unwrap();
        assert_eq!(daily.file_name(MONDAY_MIDNIGHT), "daily-2026-10-12.json");
        let weekly = GovernanceReport::build(&store, ReportPeriod::Weekly, MONDAY_MIDNIGHT, health).unwrap();
        assert_eq!(weekly.file_name(MONDAY_MIDNIGHT), "weekly-2026-W42.json");
        assert!(weekly.slo.is_empty());
        assert!(weekly.violations_opened.is_empty());
    }
}
