use crate::infra::{
    parse_date, parse_feeding, parse_flag, parse_sign, parse_weight_loss, InMemoryScreeningStore,
};
use chrono::{Local, NaiveDate};
use clap::Args;
use nutriscreen::config::AppConfig;
use nutriscreen::error::AppError;
use nutriscreen::screening::import::template_csv;
use nutriscreen::screening::{
    ClinicalFlag, CsvImportPipeline, FeedingBehavior, ImportOptions, ImportReport,
    IntakeChannel, PhysicalSign, RiskAssessment, RiskScorer, ScreeningService,
    ScreeningServiceError, ScreeningStore, ScreeningSubject, ScreeningSummary, WeightLossBand,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Birthday (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) birthday: NaiveDate,
    /// Weight in kilograms
    #[arg(long)]
    pub(crate) weight: f64,
    /// Height in centimetres
    #[arg(long)]
    pub(crate) height: f64,
    /// Mid-upper arm circumference in centimetres
    #[arg(long)]
    pub(crate) muac: Option<f64>,
    /// Use this BMI instead of deriving it from weight and height
    #[arg(long)]
    pub(crate) bmi: Option<f64>,
    /// Bilateral swelling observed
    #[arg(long)]
    pub(crate) edema: bool,
    /// Weight loss band: "<5% or none", "5-10%" or ">10%"
    #[arg(long, value_parser = parse_weight_loss)]
    pub(crate) weight_loss: Option<WeightLossBand>,
    /// Appetite: good, moderate or poor
    #[arg(long, value_parser = parse_feeding)]
    pub(crate) feeding: Option<FeedingBehavior>,
    /// Physical sign (repeatable): thin, shorter, weak
    #[arg(long = "sign", value_parser = parse_sign)]
    pub(crate) signs: Vec<PhysicalSign>,
    /// Food groups eaten in the last day (0-10)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub(crate) dietary_diversity: Option<u8>,
    /// Clinical flag (repeatable), e.g. food_insecurity
    #[arg(long = "flag", value_parser = parse_flag)]
    pub(crate) flags: Vec<ClinicalFlag>,
    /// Evaluation date (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Print the assessment as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// CSV file to import
    pub(crate) file: PathBuf,
    /// Count rows whose email already exists as skipped instead of failed
    #[arg(long)]
    pub(crate) skip_duplicates: bool,
    /// Accept files built from the older eight-column template
    #[arg(long)]
    pub(crate) legacy_template: bool,
    /// Evaluation date used for ages (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Evaluation date used for ages (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());
    let assessment = RiskScorer::new().compute(&subject_from_args(&args, as_of));

    if args.json {
        match serde_json::to_string_pretty(&assessment) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("Assessment unavailable: {err}"),
        }
    } else {
        render_assessment(&assessment);
    }
    Ok(())
}

fn subject_from_args(args: &ScoreArgs, as_of: NaiveDate) -> ScreeningSubject {
    let mut subject = ScreeningSubject::new(args.birthday, as_of, args.weight, args.height)
        .with_edema(args.edema)
        .with_weight_loss(args.weight_loss.unwrap_or_default())
        .with_feeding_behavior(args.feeding.unwrap_or_default());
    if let Some(muac) = args.muac {
        subject = subject.with_muac(muac);
    }
    if let Some(bmi) = args.bmi {
        subject = subject.with_bmi(bmi);
    }
    if let Some(groups) = args.dietary_diversity {
        subject = subject.with_dietary_diversity(groups);
    }
    for sign in &args.signs {
        subject = subject.with_physical_sign(*sign);
    }
    for flag in &args.flags {
        subject = subject.with_clinical_flag(*flag);
    }
    subject
}

fn render_assessment(assessment: &RiskAssessment) {
    println!("Nutrition risk assessment");
    println!("- {}", assessment.summary());
    println!("Score components");
    for component in &assessment.components {
        println!(
            "  - {:?}: +{} ({})",
            component.factor, component.points, component.notes
        );
    }
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let channel = if args.legacy_template {
        IntakeChannel::LegacyTemplate
    } else {
        config.import.channel
    };
    let options = ImportOptions::new(args.as_of.unwrap_or_else(|| Local::now().date_naive()))
        .skip_duplicates(args.skip_duplicates || config.import.skip_duplicates)
        .channel(channel);

    let store = Arc::new(InMemoryScreeningStore::default());
    let pipeline = CsvImportPipeline::new(store.clone(), RiskScorer::new());
    let report = pipeline.import_path(&args.file, &options)?;

    println!("Import of {} ({})", args.file.display(), channel.label());
    render_report(&report);

    let records = store.records().map_err(ScreeningServiceError::Store)?;
    if !records.is_empty() {
        println!("\nImported screenings");
        for record in &records {
            println!(
                "- {} ({}, {}): {}",
                record.name,
                record.barangay,
                record.age_years,
                record.assessment.summary()
            );
        }
        render_summary(&ScreeningSummary::from_records(&records, None));
    }
    Ok(())
}

pub(crate) fn run_template() -> Result<(), AppError> {
    print!("{}", template_csv());
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());
    let service = ScreeningService::new(Arc::new(InMemoryScreeningStore::default()));
    let options = ImportOptions::new(as_of).skip_duplicates(true);

    println!("Nutrition screening demo");
    println!("\nFirst import of the CSV template");
    let first = service.import_csv(&template_csv(), &options);
    render_report(&first);

    println!("\nSecond import of the same file (duplicates skipped)");
    let second = service.import_csv(&template_csv(), &options);
    render_report(&second);

    println!("\nWrong-case gender in a mobile file");
    let mislabelled = template_csv().replacen(",boy,", ",Male,", 1);
    let third = service.import_csv(&mislabelled, &ImportOptions::new(as_of));
    render_report(&third);

    render_summary(&service.summary(None)?);

    println!("\nStored records (CSV export)");
    print!("{}", service.export_csv()?);
    Ok(())
}

fn render_summary(summary: &ScreeningSummary) {
    let distribution = &summary.distribution;
    println!(
        "\nRisk distribution: {} screened, average score {}",
        summary.total, summary.average_score
    );
    println!(
        "- low {}, moderate {}, high {}, severe {}",
        distribution.low, distribution.moderate, distribution.high, distribution.severe
    );
    for entry in &summary.barangays {
        println!(
            "  - {}: {} screened, {} high or severe",
            entry.barangay,
            entry.total,
            entry.distribution.at_risk()
        );
    }
}

fn render_report(report: &ImportReport) {
    println!("- {}", report.summary());
    for issue in &report.errors {
        println!("  - {issue}");
    }
}
