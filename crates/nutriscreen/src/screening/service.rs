use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::catalog;
use super::domain::ScreeningRecord;
use super::import::template::record_fields;
use super::import::validation::{validate_fields, ValidatedRow};
use super::import::{
    export_csv, CsvImportPipeline, ImportError, ImportIssue, ImportOptions, ImportReport,
    IntakeChannel,
};
use super::normalizer::{closest_barangay, closest_income_bracket};
use super::risk::{RiskAssessment, RiskScorer};
use super::store::{ScreeningStore, StoreError};
use super::summary::ScreeningSummary;
use crate::config::ImportConfig;

/// Field map submitted by the add/edit form, keyed by the CSV column names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, Value>", into = "BTreeMap<String, String>")]
pub struct ScreeningForm(BTreeMap<String, String>);

impl ScreeningForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<String>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

impl From<BTreeMap<String, String>> for ScreeningForm {
    fn from(fields: BTreeMap<String, String>) -> Self {
        Self(fields)
    }
}

impl From<ScreeningForm> for BTreeMap<String, String> {
    fn from(form: ScreeningForm) -> Self {
        form.0
    }
}

/// Browsers post numbers, checkboxes and multi-selects; all are flattened to the CSV text form.
impl TryFrom<BTreeMap<String, Value>> for ScreeningForm {
    type Error = String;

    fn try_from(values: BTreeMap<String, Value>) -> Result<Self, Self::Error> {
        let mut fields = BTreeMap::new();
        for (field, value) in values {
            let text = match value {
                Value::Null => continue,
                Value::String(text) => text,
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                Value::Array(items) => {
                    let mut parts = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            Value::String(text) => parts.push(text),
                            other => {
                                return Err(format!(
                                    "{field} must be a list of strings (got {other})"
                                ))
                            }
                        }
                    }
                    parts.join(",")
                }
                Value::Object(_) => return Err(format!("{field} must not be an object")),
            };
            fields.insert(field, text);
        }
        Ok(Self(fields))
    }
}

/// Composes the store, scorer and import pipeline so both intake paths score identically.
pub struct ScreeningService<S> {
    store: Arc<S>,
    scorer: RiskScorer,
    pipeline: CsvImportPipeline<S>,
    import_defaults: ImportConfig,
}

impl<S> ScreeningService<S>
where
    S: ScreeningStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        let scorer = RiskScorer::new();
        let pipeline = CsvImportPipeline::new(Arc::clone(&store), scorer);
        Self {
            store,
            scorer,
            pipeline,
            import_defaults: ImportConfig::default(),
        }
    }

    /// Defaults applied to bulk imports whose caller leaves an option unset.
    pub fn with_import_defaults(mut self, defaults: ImportConfig) -> Self {
        self.import_defaults = defaults;
        self
    }

    pub fn import_defaults(&self) -> ImportConfig {
        self.import_defaults
    }

    /// Import options from the configured defaults, overridden where the caller chose.
    pub fn import_options(
        &self,
        as_of: NaiveDate,
        skip_duplicates: Option<bool>,
        channel: Option<IntakeChannel>,
    ) -> ImportOptions {
        ImportOptions::new(as_of)
            .skip_duplicates(skip_duplicates.unwrap_or(self.import_defaults.skip_duplicates))
            .channel(channel.unwrap_or(self.import_defaults.channel))
    }

    pub fn import_csv(&self, csv_text: &str, options: &ImportOptions) -> ImportReport {
        self.pipeline.import(csv_text, options)
    }

    /// Score a form without persisting it.
    pub fn assess(
        &self,
        form: &ScreeningForm,
        as_of: NaiveDate,
    ) -> Result<RiskAssessment, ScreeningServiceError> {
        let validated = validate_form(form, as_of)?;
        Ok(validated.into_record(as_of, &self.scorer).assessment)
    }

    /// Validate, score and persist a single direct-entry screening.
    pub fn register(
        &self,
        form: ScreeningForm,
        as_of: NaiveDate,
    ) -> Result<ScreeningRecord, ScreeningServiceError> {
        let validated = validate_form(&form, as_of)?;
        let email = validated.user_email().to_string();
        if self.store.exists(&email)? {
            return Err(ScreeningServiceError::Duplicate(email));
        }

        let record = validated.into_record(as_of, &self.scorer);
        match self.store.create(record.clone()) {
            Ok(()) => {}
            Err(StoreError::Conflict) => return Err(ScreeningServiceError::Duplicate(email)),
            Err(err) => return Err(err.into()),
        }

        info!(
            score = record.assessment.score,
            level = record.assessment.level.label(),
            "screening registered"
        );
        Ok(record)
    }

    /// Stored record as edit-form fields.
    ///
    /// Older records may hold barangay or income text that no longer matches the
    /// catalog; those are replaced by the closest catalog entry when one is close enough,
    /// and left as stored otherwise so validation points them out on save.
    pub fn edit_form(&self, user_email: &str) -> Result<ScreeningForm, ScreeningServiceError> {
        let record = self
            .store
            .fetch(user_email)?
            .ok_or_else(|| ScreeningServiceError::NotFound(user_email.to_string()))?;

        let mut fields = record_fields(&record);
        if !catalog::is_barangay(&record.barangay) {
            if let Some(found) = closest_barangay(&record.barangay) {
                debug!(stored = %record.barangay, matched = found.value, similarity = found.similarity, "barangay prefilled from catalog");
                fields.insert("barangay".to_string(), found.value.to_string());
            }
        }
        if !catalog::is_income_bracket(&record.income) {
            if let Some(found) = closest_income_bracket(&record.income) {
                debug!(stored = %record.income, matched = found.value, similarity = found.similarity, "income prefilled from catalog");
                fields.insert("income".to_string(), found.value.to_string());
            }
        }
        Ok(ScreeningForm(fields))
    }

    /// Revalidate, rescore and replace an existing screening. The email is the record key
    /// and cannot be changed through the form.
    pub fn update(
        &self,
        user_email: &str,
        form: ScreeningForm,
        as_of: NaiveDate,
    ) -> Result<ScreeningRecord, ScreeningServiceError> {
        if let Some(submitted) = form.get("user_email").map(str::trim) {
            if !submitted.is_empty() && submitted != user_email {
                return Err(ScreeningServiceError::Invalid(vec![ImportIssue::new(
                    None,
                    Some("user_email"),
                    format!("user_email cannot be changed from {user_email} to {submitted}"),
                )]));
            }
        }

        let form = form.with("user_email", user_email);
        let validated = validate_form(&form, as_of)?;
        let record = validated.into_record(as_of, &self.scorer);
        match self.store.update(record.clone()) {
            Ok(()) => {}
            Err(StoreError::NotFound) => {
                return Err(ScreeningServiceError::NotFound(user_email.to_string()))
            }
            Err(err) => return Err(err.into()),
        }

        info!(
            score = record.assessment.score,
            level = record.assessment.level.label(),
            "screening updated"
        );
        Ok(record)
    }

    pub fn delete(&self, user_email: &str) -> Result<(), ScreeningServiceError> {
        match self.store.delete(user_email) {
            Ok(()) => {
                info!("screening deleted");
                Ok(())
            }
            Err(StoreError::NotFound) => Err(ScreeningServiceError::NotFound(user_email.to_string())),
            Err(err) => Err(err.into()),
        }
    }

    /// Removes every screening recorded in `barangay`; returns the number removed.
    pub fn delete_by_barangay(&self, barangay: &str) -> Result<usize, ScreeningServiceError> {
        let barangay = barangay.trim();
        if barangay.is_empty() {
            return Err(ScreeningServiceError::Invalid(vec![ImportIssue::new(
                None,
                Some("barangay"),
                "barangay is required for a bulk delete",
            )]));
        }

        let deleted = self.store.delete_by_barangay(barangay)?;
        info!(barangay, deleted, "screenings deleted by barangay");
        Ok(deleted)
    }

    pub fn summary(&self, barangay: Option<&str>) -> Result<ScreeningSummary, ScreeningServiceError> {
        let records = self.store.records()?;
        Ok(ScreeningSummary::from_records(&records, barangay))
    }

    pub fn export_csv(&self) -> Result<String, ScreeningServiceError> {
        let records = self.store.records()?;
        Ok(export_csv(&records)?)
    }
}

fn validate_form(
    form: &ScreeningForm,
    as_of: NaiveDate,
) -> Result<ValidatedRow, ScreeningServiceError> {
    validate_fields(form.fields(), None, IntakeChannel::DirectEntry, as_of).map_err(|issues| {
        warn!(issues = issues.len(), "screening form rejected");
        ScreeningServiceError::Invalid(issues)
    })
}

/// Error raised by the screening service.
#[derive(Debug, thiserror::Error)]
pub enum ScreeningServiceError {
    #[error("screening form has {} invalid field(s)", .0.len())]
    Invalid(Vec<ImportIssue>),
    #[error("a screening for {0} already exists")]
    Duplicate(String),
    #[error("no screening found for {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Export(#[from] ImportError),
}
