//! Nutrition screening: risk scoring, bulk CSV intake, and the direct-entry form path.

pub mod catalog;
pub mod domain;
pub mod import;
pub mod normalizer;
pub mod risk;
pub mod router;
pub mod service;
pub mod store;
pub mod summary;

#[cfg(test)]
mod tests;

pub use domain::{
    ClinicalFlag, FeedingBehavior, Gender, Goal, PhysicalSign, ScreeningRecord, ScreeningSubject,
    WeightLossBand,
};
pub use import::{
    CsvImportPipeline, ImportError, ImportIssue, ImportOptions, ImportReport, IntakeChannel,
};
pub use risk::{RiskAssessment, RiskFactor, RiskLevel, RiskScorer, ScoreComponent};
pub use router::screening_router;
pub use service::{ScreeningForm, ScreeningService, ScreeningServiceError};
pub use store::{ScreeningStore, StoreError};
pub use summary::{BarangaySummary, RiskDistribution, ScreeningSummary};
