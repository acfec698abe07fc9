mod rules;

use serde::{Deserialize, Serialize};

use super::domain::ScreeningSubject;

/// Stateless scorer that applies the additive point table to a subject.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskScorer;

impl RiskScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn compute(&self, subject: &ScreeningSubject) -> RiskAssessment {
        let components = rules::score_subject(subject);
        let total: u32 = components
            .iter()
            .map(|component| u32::from(component.points))
            .sum();
        let score = total.min(MAX_SCORE) as u8;

        RiskAssessment {
            score,
            level: RiskLevel::from_score(score),
            components,
        }
    }
}

const MAX_SCORE: u32 = 100;

/// Which part of the screening produced a contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    Edema,
    ImplausibleMeasurement,
    Muac,
    WeightForHeight,
    BmiForAge,
    AdultBmi,
    WeightLoss,
    FeedingBehavior,
    PhysicalSigns,
    ClinicalFlags,
    DietaryDiversity,
}

/// Discrete contribution to a score, kept so screeners can see why a subject was flagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: RiskFactor,
    pub points: u8,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Severe,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            75..=u8::MAX => RiskLevel::Severe,
            50..=74 => RiskLevel::High,
            25..=49 => RiskLevel::Moderate,
            _ => RiskLevel::Low,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
            RiskLevel::Severe => "severe",
        }
    }
}

/// Capped score, its level, and the audit trail that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u8,
    pub level: RiskLevel,
    pub components: Vec<ScoreComponent>,
}

impl RiskAssessment {
    pub fn summary(&self) -> String {
        format!("risk score {} ({})", self.score, self.level.label())
    }
}
