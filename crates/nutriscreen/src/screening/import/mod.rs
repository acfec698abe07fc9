//! CSV bulk import: parse, validate, score, and persist screening rows.
//!
//! Row-level problems never abort a batch. They are collected into the
//! [`ImportReport`] keyed by the 1-based line number of the source file.

mod parser;
pub mod template;
pub(crate) mod validation;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::domain::Gender;
use super::risk::RiskScorer;
use super::store::{ScreeningStore, StoreError};

pub use parser::ImportRow;
pub use template::{export_csv, template_csv, TEMPLATE_HEADER};
pub use validation::{BASE_REQUIRED_FIELDS, SCREENING_REQUIRED_FIELDS};

/// Rule set applied to incoming rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeChannel {
    /// Files exported by the mobile data-collection client.
    #[default]
    MobileCsv,
    /// Older template files that only carry the base columns.
    LegacyTemplate,
    /// Interactive add/edit form.
    DirectEntry,
}

impl IntakeChannel {
    pub fn label(&self) -> &'static str {
        match self {
            IntakeChannel::MobileCsv => "mobile_csv",
            IntakeChannel::LegacyTemplate => "legacy_template",
            IntakeChannel::DirectEntry => "direct_entry",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mobile_csv" | "mobile" => Some(Self::MobileCsv),
            "legacy_template" | "legacy" => Some(Self::LegacyTemplate),
            "direct_entry" | "form" => Some(Self::DirectEntry),
            _ => None,
        }
    }

    pub fn required_fields(&self) -> Vec<&'static str> {
        let mut fields = BASE_REQUIRED_FIELDS.to_vec();
        if *self != IntakeChannel::LegacyTemplate {
            fields.extend(SCREENING_REQUIRED_FIELDS);
        }
        fields
    }

    pub fn accepted_genders(&self) -> &'static [Gender] {
        match self {
            IntakeChannel::MobileCsv | IntakeChannel::LegacyTemplate => &Gender::MOBILE,
            IntakeChannel::DirectEntry => &Gender::DIRECT_ENTRY,
        }
    }
}

/// Caller-controlled knobs for one import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    pub skip_duplicates: bool,
    pub channel: IntakeChannel,
    /// Evaluation date used for age derivation.
    pub as_of: NaiveDate,
}

impl ImportOptions {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            skip_duplicates: false,
            channel: IntakeChannel::default(),
            as_of,
        }
    }

    pub fn skip_duplicates(mut self, skip: bool) -> Self {
        self.skip_duplicates = skip;
        self
    }

    pub fn channel(mut self, channel: IntakeChannel) -> Self {
        self.channel = channel;
        self
    }
}

/// One problem found during an import. Batch-level problems carry no row number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportIssue {
    pub row_number: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl ImportIssue {
    pub fn new(row_number: Option<usize>, field: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            row_number,
            field: field.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn batch(message: impl Into<String>) -> Self {
        Self::new(None, None, message)
    }

    pub fn row(row_number: usize, field: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(Some(row_number), field, message)
    }
}

impl fmt::Display for ImportIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row_number {
            Some(row) => write!(f, "Row {row}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Aggregate outcome of an import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub success_count: usize,
    pub skipped_count: usize,
    pub failed_count: usize,
    pub errors: Vec<ImportIssue>,
}

impl ImportReport {
    fn rejected(issue: ImportIssue) -> Self {
        Self {
            errors: vec![issue],
            ..Self::default()
        }
    }

    fn record_failure(&mut self, issues: Vec<ImportIssue>) {
        self.failed_count += 1;
        self.errors.extend(issues);
    }

    pub fn processed(&self) -> usize {
        self.success_count + self.skipped_count + self.failed_count
    }

    pub fn is_clean(&self) -> bool {
        self.failed_count == 0 && self.errors.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} imported, {} skipped, {} failed",
            self.success_count, self.skipped_count, self.failed_count
        )
    }
}

/// Failure to obtain or produce CSV text at all.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read screening CSV: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to write screening CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("screening CSV is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Sequential import pipeline over a [`ScreeningStore`].
pub struct CsvImportPipeline<S> {
    store: Arc<S>,
    scorer: RiskScorer,
}

impl<S> CsvImportPipeline<S>
where
    S: ScreeningStore + 'static,
{
    pub fn new(store: Arc<S>, scorer: RiskScorer) -> Self {
        Self { store, scorer }
    }

    pub fn import_path<P: AsRef<Path>>(
        &self,
        path: P,
        options: &ImportOptions,
    ) -> Result<ImportReport, ImportError> {
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8(bytes)?;
        Ok(self.import(&text, options))
    }

    pub fn import(&self, csv_text: &str, options: &ImportOptions) -> ImportReport {
        let parsed = match parser::parse_rows(csv_text) {
            Ok(parsed) => parsed,
            Err(issue) => {
                warn!(error = %issue, "csv import rejected");
                return ImportReport::rejected(issue);
            }
        };

        if parsed.rows.is_empty() {
            let issue = ImportIssue::batch(
                "CSV file contains a header row but no data rows; add at least one screening below the header",
            );
            warn!(error = %issue, "csv import rejected");
            return ImportReport::rejected(issue);
        }

        if let Some(issue) = missing_columns(&parsed.headers, options.channel) {
            warn!(error = %issue, "csv import rejected");
            return ImportReport::rejected(issue);
        }

        let mut report = ImportReport::default();
        for row in parsed.rows {
            match row {
                Ok(row) => self.import_row(row, options, &mut report),
                Err(issue) => {
                    warn!(row = issue.row_number, error = %issue.message, "malformed csv row");
                    report.record_failure(vec![issue]);
                }
            }
        }

        info!(
            channel = options.channel.label(),
            success = report.success_count,
            skipped = report.skipped_count,
            failed = report.failed_count,
            "csv import finished"
        );
        report
    }

    fn import_row(&self, row: ImportRow, options: &ImportOptions, report: &mut ImportReport) {
        let row_number = row.row_number;
        let validated = match validation::validate_fields(
            &row.fields,
            Some(row_number),
            options.channel,
            options.as_of,
        ) {
            Ok(validated) => validated,
            Err(issues) => {
                for issue in &issues {
                    warn!(row = row_number, field = issue.field.as_deref(), error = %issue.message, "row failed validation");
                }
                report.record_failure(issues);
                return;
            }
        };

        let email = validated.user_email().to_string();
        match self.store.exists(&email) {
            Ok(true) => {
                self.duplicate(row_number, &email, options, report);
                return;
            }
            Ok(false) => {}
            Err(err) => {
                warn!(row = row_number, error = %err, "duplicate check failed");
                report.record_failure(vec![ImportIssue::row(
                    row_number,
                    Some("user_email"),
                    format!("could not check for an existing record: {err}"),
                )]);
                return;
            }
        }

        let record = validated.into_record(options.as_of, &self.scorer);
        let score = record.assessment.score;
        match self.store.create(record) {
            Ok(()) => {
                debug!(row = row_number, score, "row imported");
                report.success_count += 1;
            }
            Err(StoreError::Conflict) => self.duplicate(row_number, &email, options, report),
            Err(err) => {
                warn!(row = row_number, error = %err, "store rejected row");
                report.record_failure(vec![ImportIssue::row(
                    row_number,
                    None,
                    format!("could not save record: {err}"),
                )]);
            }
        }
    }

    fn duplicate(
        &self,
        row_number: usize,
        email: &str,
        options: &ImportOptions,
        report: &mut ImportReport,
    ) {
        if options.skip_duplicates {
            debug!(row = row_number, "duplicate row skipped");
            report.skipped_count += 1;
        } else {
            warn!(row = row_number, "duplicate row rejected");
            report.record_failure(vec![ImportIssue::row(
                row_number,
                Some("user_email"),
                format!("user_email {email} already exists"),
            )]);
        }
    }
}

fn missing_columns(headers: &[String], channel: IntakeChannel) -> Option<ImportIssue> {
    let missing: Vec<&str> = channel
        .required_fields()
        .into_iter()
        .filter(|field| !headers.iter().any(|header| header == field))
        .collect();
    if missing.is_empty() {
        return None;
    }

    let mut message = format!(
        "CSV header is missing required column(s): {}",
        missing.join(", ")
    );
    let base_present = BASE_REQUIRED_FIELDS
        .iter()
        .all(|field| headers.iter().any(|header| header == field));
    if base_present && channel != IntakeChannel::LegacyTemplate {
        message.push_str("; files from the older template can be imported with the legacy_template channel");
    }
    Some(ImportIssue::batch(message))
}
