use super::common::*;
use std::sync::Arc;

use crate::screening::import::{template_csv, ImportOptions, IntakeChannel};
use crate::screening::risk::RiskLevel;
use crate::screening::{CsvImportPipeline, RiskScorer, ScreeningStore};

fn pipeline<S: ScreeningStore + 'static>(store: Arc<S>) -> CsvImportPipeline<S> {
    CsvImportPipeline::new(store, RiskScorer::new())
}

#[test]
fn imports_every_valid_row_with_scores_attached() {
    let store = Arc::new(MemoryStore::default());
    let report = pipeline(store.clone()).import(&mobile_csv(), &ImportOptions::new(as_of()));

    assert_eq!(report.success_count, 3);
    assert!(report.is_clean(), "unexpected issues: {:?}", report.errors);

    let maria = store.get("maria@example.com").expect("maria stored");
    assert_eq!(maria.assessment.score, 66);
    assert_eq!(maria.assessment.level, RiskLevel::High);
    let jose = store.get("jose@example.com").expect("jose stored");
    assert_eq!(jose.assessment.score, 40);
    let lito = store.get("lito@example.com").expect("lito stored");
    assert_eq!(lito.assessment.score, 0);
    assert_eq!(lito.age_years, 35);
}

#[test]
fn wrong_case_gender_fails_only_that_row() {
    let csv = mobile_csv().replace("Jose Rizal,2019-07-01,boy", "Jose Rizal,2019-07-01,Male");
    let store = Arc::new(MemoryStore::default());
    let report = pipeline(store.clone()).import(&csv, &ImportOptions::new(as_of()));

    assert_eq!(report.success_count, 2);
    assert_eq!(report.failed_count, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(
        report.errors[0].to_string(),
        "Row 3: gender must be exactly one of: boy, girl (got 'Male')"
    );
    assert!(store.get("jose@example.com").is_none());
}

#[test]
fn importing_twice_with_skip_duplicates_skips_everything() {
    let store = Arc::new(MemoryStore::default());
    let pipeline = pipeline(store.clone());
    let options = ImportOptions::new(as_of()).skip_duplicates(true);

    let first = pipeline.import(&mobile_csv(), &options);
    assert_eq!(
        (first.success_count, first.skipped_count, first.failed_count),
        (3, 0, 0)
    );

    let second = pipeline.import(&mobile_csv(), &options);
    assert_eq!(
        (second.success_count, second.skipped_count, second.failed_count),
        (0, 3, 0)
    );
    assert!(second.errors.is_empty());
    assert_eq!(store.len(), 3);
}

#[test]
fn duplicates_fail_when_not_skipped() {
    let store = Arc::new(MemoryStore::default());
    let pipeline = pipeline(store.clone());
    let options = ImportOptions::new(as_of());
    pipeline.import(&mobile_csv(), &options);

    let report = pipeline.import(&mobile_csv(), &options);
    assert_eq!(report.failed_count, 3);
    assert_eq!(report.errors[0].field.as_deref(), Some("user_email"));
    assert_eq!(
        report.errors[0].to_string(),
        "Row 2: user_email maria@example.com already exists"
    );
    let rows: Vec<Option<usize>> = report.errors.iter().map(|issue| issue.row_number).collect();
    assert_eq!(rows, vec![Some(2), Some(3), Some(4)]);
}

#[test]
fn repeated_email_within_one_file_is_caught_by_the_store() {
    let csv = format!(
        "{}{}",
        mobile_csv(),
        "maria@example.com,Maria Again,2022-03-10,girl,11.5,88,Lamao,\"PHP 12,031–20,000/month (Low)\",11.9,no,5-10%,4,moderate appetite,thin,true\n"
    );
    let store = Arc::new(MemoryStore::default());
    let report = pipeline(store.clone()).import(&csv, &ImportOptions::new(as_of()).skip_duplicates(true));

    assert_eq!(report.success_count, 3);
    assert_eq!(report.skipped_count, 1);
    assert_eq!(
        store.get("maria@example.com").expect("stored").name,
        "Maria Santos"
    );
}

#[test]
fn header_only_file_is_a_single_batch_issue() {
    let store = Arc::new(MemoryStore::default());
    let report = pipeline(store).import(&format!("{HEADER}\n"), &ImportOptions::new(as_of()));

    assert_eq!(report.success_count, 0);
    assert_eq!(report.failed_count, 0);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].row_number.is_none());
    assert!(report.errors[0].message.contains("no data rows"));
}

#[test]
fn empty_text_is_a_single_batch_issue() {
    let report = pipeline(Arc::new(MemoryStore::default())).import("", &ImportOptions::new(as_of()));
    assert_eq!(report.processed(), 0);
    assert_eq!(report.errors.len(), 1);
}

#[test]
fn missing_columns_reject_the_batch_for_mobile_files() {
    let legacy = "user_email,name,birthday,gender,weight,height,barangay,income\n\
rosa@example.com,Rosa Diaz,2020-02-14,girl,13,92,Paco,\"PHP 20,001–40,000/month (Middle)\"\n";
    let store = Arc::new(MemoryStore::default());
    let pipeline = pipeline(store.clone());

    let report = pipeline.import(legacy, &ImportOptions::new(as_of()));
    assert_eq!(report.processed(), 0);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].message.contains("swelling"));

    let report = pipeline.import(
        legacy,
        &ImportOptions::new(as_of()).channel(IntakeChannel::LegacyTemplate),
    );
    assert_eq!(report.success_count, 1);
    let rosa = store.get("rosa@example.com").expect("rosa stored");
    assert_eq!(rosa.subject.dietary_diversity_groups, None);
}

#[test]
fn malformed_rows_fail_without_stopping_the_batch() {
    let csv = format!(
        "{HEADER}\n\
broken@example.com,Broken Row,2022-03-10,girl,11.5,88,Lamao,PHP 12,031–20,000/month (Low),11.9,no,5-10%,4,moderate appetite,thin,true\n\
{}",
        mobile_csv().lines().nth(1).expect("first data row")
    );
    let report = pipeline(Arc::new(MemoryStore::default())).import(&csv, &ImportOptions::new(as_of()));

    assert_eq!(report.failed_count, 1);
    assert_eq!(report.success_count, 1);
    assert_eq!(report.errors[0].row_number, Some(2));
    assert!(report.errors[0].message.contains("must be quoted"));
}

#[test]
fn store_failures_are_recorded_per_row() {
    let store = Arc::new(RejectingStore {
        rejected_email: "jose@example.com",
        inner: MemoryStore::default(),
    });
    let report = pipeline(store).import(&mobile_csv(), &ImportOptions::new(as_of()));

    assert_eq!(report.success_count, 2);
    assert_eq!(report.failed_count, 1);
    assert_eq!(
        report.errors[0].to_string(),
        "Row 3: could not save record: record rejected: quota exceeded"
    );

    let report = pipeline(Arc::new(UnavailableStore)).import(&mobile_csv(), &ImportOptions::new(as_of()));
    assert_eq!(report.failed_count, 3);
    assert!(report.errors[0]
        .message
        .contains("store unavailable: database offline"));
}

#[test]
fn create_conflicts_follow_the_duplicate_policy() {
    let report = pipeline(Arc::new(RacingStore))
        .import(&mobile_csv(), &ImportOptions::new(as_of()).skip_duplicates(true));
    assert_eq!(report.skipped_count, 3);
    assert_eq!(report.failed_count, 0);
}

#[test]
fn template_round_trips_without_issues() {
    let store = Arc::new(MemoryStore::default());
    let report = pipeline(store.clone()).import(&template_csv(), &ImportOptions::new(as_of()));

    assert_eq!(report.success_count, 2);
    assert!(report.is_clean(), "template issues: {:?}", report.errors);
}

#[test]
fn separator_only_row_fails_on_required_fields() {
    let csv = format!(
        "{HEADER}\n,,,,,,,,,,,,,,\n{}\n",
        mobile_csv().lines().nth(1).expect("first data row")
    );
    let report = pipeline(Arc::new(MemoryStore::default())).import(&csv, &ImportOptions::new(as_of()));

    assert_eq!(report.summary(), "1 imported, 0 skipped, 1 failed");
    assert!(report.errors.iter().all(|issue| issue.row_number == Some(2)));
    let fields: Vec<&str> = report
        .errors
        .iter()
        .filter_map(|issue| issue.field.as_deref())
        .collect();
    assert!(fields.contains(&"user_email"));
    assert!(fields.contains(&"feeding_behavior"));
    assert!(report.errors[0].message.contains("missing required field"));
}
