//! Temporal profile of a daily series
//!
//! Day-of-week, weekly and monthly roll-ups, trend direction, peak periods and
//! the spread of daily totals within each weekday and month.

use crate::error::AnalysisError;
use crate::stats;
use crate::types::DailySeriesPoint;
use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Direction of the series from its first to its last day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
}

/// Total enrolments on one weekday across the series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayTotal {
    pub day: String,
    pub total_enrolments: u64,
}

/// Total enrolments in one calendar month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTotal {
    pub year: i32,
    pub month: u32,
    pub total_enrolments: u64,
}

/// Total enrolments in one ISO week (Monday to Sunday)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyTotal {
    pub iso_year: i32,
    pub week: u32,
    pub week_start: NaiveDate,
    pub total_enrolments: u64,
}

/// Total enrolments on one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTotal {
    pub date: NaiveDate,
    pub total_enrolments: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalProfile {
    /// Monday through Sunday, zero for weekdays absent from the series
    pub day_of_week: Vec<WeekdayTotal>,
    pub weekly: Vec<WeeklyTotal>,
    pub monthly: Vec<MonthlyTotal>,
    pub trend_direction: TrendDirection,
    /// Busiest days, largest first
    pub peak_days: Vec<DayTotal>,
    pub peak_month: MonthlyTotal,
    pub average_daily_enrolment: f64,
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Build the temporal profile of a non-empty, date-sorted series
pub fn temporal_profile(series: &[DailySeriesPoint], top_n: usize) -> Result<TemporalProfile, AnalysisError> {
    let (first, last) = match (series.first(), series.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(AnalysisError::EmptySeries),
    };

    let mut by_weekday = [0u64; 7];
    let mut by_week: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    let mut by_month: BTreeMap<(i32, u32), u64> = BTreeMap::new();
    for point in series {
        let total = point.total_enrolments;
        let weekday = &mut by_weekday[point.date.weekday().num_days_from_monday() as usize];
        *weekday = weekday.saturating_add(total);
        let week = by_week.entry(week_start(point.date)).or_default();
        *week = week.saturating_add(total);
        let month = by_month.entry((point.date.year(), point.date.month())).or_default();
        *month = month.saturating_add(total);
    }

    let day_of_week = WEEK
        .iter()
        .map(|&day| WeekdayTotal {
            day: weekday_name(day).to_string(),
            total_enrolments: by_weekday[day.num_days_from_monday() as usize],
        })
        .collect();

    let weekly = by_week
        .into_iter()
        .map(|(week_start, total_enrolments)| {
            let iso = week_start.iso_week();
            WeeklyTotal {
                iso_year: iso.year(),
                week: iso.week(),
                week_start,
                total_enrolments,
            }
        })
        .collect();

    let monthly: Vec<MonthlyTotal> = by_month
        .into_iter()
        .map(|((year, month), total_enrolments)| MonthlyTotal {
            year,
            month,
            total_enrolments,
        })
        .collect();

    // Earliest month wins ties
    let peak_month = monthly
        .iter()
        .fold(None::<&MonthlyTotal>, |best, m| match best {
            Some(b) if b.total_enrolments >= m.total_enrolments => Some(b),
            _ => Some(m),
        })
        .cloned()
        .ok_or(AnalysisError::EmptySeries)?;

    let trend_direction = if last.total_enrolments > first.total_enrolments {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    };

    let mut peak_days: Vec<DayTotal> = series
        .iter()
        .map(|p| DayTotal {
            date: p.date,
            total_enrolments: p.total_enrolments,
        })
        .collect();
    peak_days.sort_by_key(|d| (Reverse(d.total_enrolments), d.date));
    peak_days.truncate(top_n);

    let values: Vec<f64> = series.iter().map(|p| p.total_enrolments as f64).collect();

    Ok(TemporalProfile {
        day_of_week,
        weekly,
        monthly,
        trend_direction,
        peak_days,
        peak_month,
        average_daily_enrolment: stats::mean(&values).unwrap_or(0.0),
    })
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

/// Mean and sample spread of daily totals within one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    pub days: usize,
    pub mean: f64,
    /// `None` for a period with a single day
    pub std_dev: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayPattern {
    pub day: String,
    #[serde(flatten)]
    pub stats: PeriodStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthPattern {
    pub year: i32,
    pub month: u32,
    #[serde(flatten)]
    pub stats: PeriodStats,
}

/// Typical daily volume per weekday and per month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalPatterns {
    /// Weekdays present in the series, Monday first
    pub day_of_week: Vec<WeekdayPattern>,
    pub monthly: Vec<MonthPattern>,
}

fn period_stats(values: &[f64]) -> Option<PeriodStats> {
    Some(PeriodStats {
        days: values.len(),
        mean: stats::mean(values)?,
        std_dev: (values.len() >= 2).then(|| stats::sample_std_dev(values)),
    })
}

/// Mean and spread of daily totals grouped by weekday and by calendar month
pub fn temporal_patterns(series: &[DailySeriesPoint]) -> TemporalPatterns {
    let mut by_weekday: [Vec<f64>; 7] = Default::default();
    let mut by_month: BTreeMap<(i32, u32), Vec<f64>> = BTreeMap::new();
    for point in series {
        let value = point.total_enrolments as f64;
        by_weekday[point.date.weekday().num_days_from_monday() as usize].push(value);
        by_month
            .entry((point.date.year(), point.date.month()))
            .or_default()
            .push(value);
    }

    let day_of_week = WEEK
        .iter()
        .filter_map(|&day| {
            period_stats(&by_weekday[day.num_days_from_monday() as usize]).map(|stats| WeekdayPattern {
                day: weekday_name(day).to_string(),
                stats,
            })
        })
        .collect();

    let monthly = by_month
        .iter()
        .filter_map(|(&(year, month), values)| period_stats(values).map(|stats| MonthPattern { year, month, stats }))
        .collect();

    TemporalPatterns { day_of_week, monthly }
}
