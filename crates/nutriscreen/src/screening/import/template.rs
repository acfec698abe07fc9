use std::collections::BTreeMap;

use super::ImportError;
use crate::screening::domain::{ClinicalFlag, PhysicalSign, ScreeningRecord};

/// Documented import header: the base columns followed by every optional column.
pub const TEMPLATE_HEADER: [&str; 23] = [
    "user_email",
    "name",
    "birthday",
    "gender",
    "weight",
    "height",
    "barangay",
    "income",
    "muac",
    "goal",
    "allergies",
    "diet_prefs",
    "avoid_foods",
    "dietary_diversity",
    "swelling",
    "weight_loss",
    "feeding_behavior",
    "physical_signs",
    "has_recent_illness",
    "has_eating_difficulty",
    "has_food_insecurity",
    "has_micronutrient_deficiency",
    "has_functional_decline",
];

/// Derived columns appended to exports; ignored again on import apart from `bmi`.
pub const EXPORT_EXTRA_COLUMNS: [&str; 4] = ["bmi", "age", "risk_score", "risk_level"];

const SAMPLE_ROWS: [&str; 2] = [
    "juan.delacruz@example.com,Juan Dela Cruz,2021-06-15,boy,12.4,89.5,Lamao,\"PHP 12,031\u{2013}20,000/month (Low)\",12.1,weight_gain,peanuts;shrimp,,,4,no,5-10%,moderate appetite,thin,true,false,false,false,false",
    "ana.reyes@example.com,Ana Reyes,2015-02-03,girl,24,128,Poblacion,\"Below PHP 12,030/month (Below poverty line)\",,maintain,,vegetarian,,6,no,<5% or none,good appetite,none,false,false,false,false,false",
];

/// Header plus two sample rows that import cleanly through the mobile channel.
pub fn template_csv() -> String {
    let mut text = TEMPLATE_HEADER.join(",");
    text.push('\n');
    for row in SAMPLE_ROWS {
        text.push_str(row);
        text.push('\n');
    }
    text
}

/// Writes stored records in the template layout plus derived columns.
pub fn export_csv(records: &[ScreeningRecord]) -> Result<String, ImportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(TEMPLATE_HEADER.iter().chain(EXPORT_EXTRA_COLUMNS.iter()))?;

    for record in records {
        writer.write_record(export_row(record))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| ImportError::Io(err.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Template columns of a stored record, as the edit form expects them. Derived columns are left out.
pub(crate) fn record_fields(record: &ScreeningRecord) -> BTreeMap<String, String> {
    TEMPLATE_HEADER
        .iter()
        .zip(export_row(record))
        .filter(|(_, value)| !value.is_empty())
        .map(|(column, value)| (column.to_string(), value))
        .collect()
}

fn export_row(record: &ScreeningRecord) -> Vec<String> {
    let subject = &record.subject;
    let signs: Vec<&str> = subject.physical_signs.iter().map(PhysicalSign::label).collect();
    let flag = |flag: ClinicalFlag| subject.clinical_flags.contains(&flag).to_string();
    let bmi = if subject.bmi > 0.0 && subject.bmi <= 100.0 {
        subject.bmi.to_string()
    } else {
        String::new()
    };

    vec![
        record.user_email.clone(),
        record.name.clone(),
        subject.birthday.format("%Y-%m-%d").to_string(),
        record.gender.label().to_string(),
        subject.weight_kg.to_string(),
        subject.height_cm.to_string(),
        record.barangay.clone(),
        record.income.clone(),
        subject.muac_cm.map(|muac| muac.to_string()).unwrap_or_default(),
        record
            .goal
            .map(|goal| goal.label().to_string())
            .unwrap_or_default(),
        record.allergies.clone().unwrap_or_default(),
        record.diet_prefs.clone().unwrap_or_default(),
        record.avoid_foods.clone().unwrap_or_default(),
        subject
            .dietary_diversity_groups
            .map(|groups| groups.to_string())
            .unwrap_or_default(),
        if subject.edema { "yes" } else { "no" }.to_string(),
        subject.weight_loss.label().to_string(),
        subject.feeding_behavior.label().to_string(),
        signs.join(","),
        flag(ClinicalFlag::RecentIllness),
        flag(ClinicalFlag::EatingDifficulty),
        flag(ClinicalFlag::FoodInsecurity),
        flag(ClinicalFlag::MicronutrientDeficiency),
        flag(ClinicalFlag::FunctionalDecline),
        bmi,
        record.age_years.to_string(),
        record.assessment.score.to_string(),
        record.assessment.level.label().to_string(),
    ]
}
