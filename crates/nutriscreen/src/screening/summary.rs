//! Aggregate views over stored screenings for the dashboard.

use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::ScreeningRecord;
use super::risk::RiskLevel;

/// Screening counts per risk level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskDistribution {
    pub low: usize,
    pub moderate: usize,
    pub high: usize,
    pub severe: usize,
}

impl RiskDistribution {
    pub fn add(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Low => self.low += 1,
            RiskLevel::Moderate => self.moderate += 1,
            RiskLevel::High => self.high += 1,
            RiskLevel::Severe => self.severe += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.low + self.moderate + self.high + self.severe
    }

    /// High and severe together; the cases flagged for follow-up.
    pub fn at_risk(&self) -> usize {
        self.high + self.severe
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarangaySummary {
    pub barangay: String,
    pub total: usize,
    pub average_score: f64,
    pub distribution: RiskDistribution,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScreeningSummary {
    pub total: usize,
    pub average_score: f64,
    pub distribution: RiskDistribution,
    /// Ordered by barangay name.
    pub barangays: Vec<BarangaySummary>,
}

impl ScreeningSummary {
    /// Summarises `records`, optionally restricted to one barangay.
    pub fn from_records(records: &[ScreeningRecord], barangay: Option<&str>) -> Self {
        let mut overall = Tally::default();
        let mut per_barangay: BTreeMap<&str, Tally> = BTreeMap::new();

        for record in records
            .iter()
            .filter(|record| barangay.map_or(true, |wanted| record.barangay == wanted))
        {
            overall.add(record);
            per_barangay
                .entry(record.barangay.as_str())
                .or_default()
                .add(record);
        }

        Self {
            total: overall.distribution.total(),
            average_score: overall.average(),
            distribution: overall.distribution,
            barangays: per_barangay
                .into_iter()
                .map(|(name, tally)| BarangaySummary {
                    barangay: name.to_string(),
                    total: tally.distribution.total(),
                    average_score: tally.average(),
                    distribution: tally.distribution,
                })
                .collect(),
        }
    }
}

#[derive(Default)]
struct Tally {
    distribution: RiskDistribution,
    score_sum: u64,
}

impl Tally {
    fn add(&mut self, record: &ScreeningRecord) {
        self.distribution.add(record.assessment.level);
        self.score_sum += u64::from(record.assessment.score);
    }

    /// Mean score rounded to one decimal; zero for an empty tally.
    fn average(&self) -> f64 {
        let total = self.distribution.total();
        if total == 0 {
            return 0.0;
        }
        let mean = self.score_sum as f64 / total as f64;
        (mean * 10.0).round() / 10.0
    }
}
