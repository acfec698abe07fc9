use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{ImportIssue, IntakeChannel};
use crate::screening::catalog::{self, BARANGAYS, INCOME_BRACKETS};
use crate::screening::domain::{
    age_in_years, ClinicalFlag, FeedingBehavior, Gender, Goal, PhysicalSign, ScreeningRecord,
    ScreeningSubject, WeightLossBand,
};
use crate::screening::risk::RiskScorer;

pub const BASE_REQUIRED_FIELDS: [&str; 8] = [
    "user_email",
    "name",
    "birthday",
    "gender",
    "weight",
    "height",
    "barangay",
    "income",
];

pub const SCREENING_REQUIRED_FIELDS: [&str; 4] =
    ["swelling", "weight_loss", "dietary_diversity", "feeding_behavior"];

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("email pattern compiles")
});

/// Row whose fields all passed validation, ready for derivation and scoring.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ValidatedRow {
    user_email: String,
    name: String,
    birthday: NaiveDate,
    gender: Gender,
    weight_kg: f64,
    height_cm: f64,
    bmi: Option<f64>,
    muac_cm: Option<f64>,
    barangay: String,
    income: String,
    goal: Option<Goal>,
    allergies: Option<String>,
    diet_prefs: Option<String>,
    avoid_foods: Option<String>,
    edema: bool,
    weight_loss: WeightLossBand,
    feeding_behavior: FeedingBehavior,
    physical_signs: BTreeSet<PhysicalSign>,
    dietary_diversity: Option<u8>,
    clinical_flags: BTreeSet<ClinicalFlag>,
}

impl ValidatedRow {
    pub(crate) fn user_email(&self) -> &str {
        &self.user_email
    }

    /// Derives age and BMI as of `as_of` and attaches the risk assessment.
    pub(crate) fn into_record(self, as_of: NaiveDate, scorer: &RiskScorer) -> ScreeningRecord {
        let mut subject = ScreeningSubject::new(self.birthday, as_of, self.weight_kg, self.height_cm)
            .with_edema(self.edema)
            .with_weight_loss(self.weight_loss)
            .with_feeding_behavior(self.feeding_behavior);
        if let Some(bmi) = self.bmi {
            subject = subject.with_bmi(bmi);
        }
        subject.muac_cm = self.muac_cm;
        subject.physical_signs = self.physical_signs;
        subject.dietary_diversity_groups = self.dietary_diversity;
        subject.clinical_flags = self.clinical_flags;

        let assessment = scorer.compute(&subject);

        ScreeningRecord {
            user_email: self.user_email,
            name: self.name,
            gender: self.gender,
            barangay: self.barangay,
            income: self.income,
            age_years: age_in_years(self.birthday, as_of),
            goal: self.goal,
            allergies: self.allergies,
            diet_prefs: self.diet_prefs,
            avoid_foods: self.avoid_foods,
            subject,
            assessment,
        }
    }
}

/// Checks every field of one row, collecting all violations rather than stopping at the first.
pub(crate) fn validate_fields(
    fields: &BTreeMap<String, String>,
    row_number: Option<usize>,
    channel: IntakeChannel,
    as_of: NaiveDate,
) -> Result<ValidatedRow, Vec<ImportIssue>> {
    let mut check = FieldCheck {
        fields,
        row_number,
        issues: Vec::new(),
    };

    for field in channel.required_fields() {
        if check.value(field).is_none() {
            check.issue(field, format!("missing required field: {field}"));
        }
    }

    let user_email = check.value("user_email").map(str::to_string);
    if let Some(email) = &user_email {
        if !EMAIL_PATTERN.is_match(email) {
            check.issue(
                "user_email",
                format!("user_email must look like local@domain.tld (got '{email}')"),
            );
        }
    }
    let name = check.value("name").map(str::to_string);

    let birthday = check.birthday(as_of);
    let gender = check.gender(channel);

    let weight_kg = check.number("weight", 2.0, 300.0, "kg");
    let height_cm = check.number("height", 30.0, 250.0, "cm");
    let muac_cm = check.number("muac", 0.0, 50.0, "cm");
    let bmi = check.bmi();
    let dietary_diversity = check.dietary_diversity();

    let barangay = check.listed("barangay", &BARANGAYS, catalog::is_barangay);
    let income = check.listed("income", &INCOME_BRACKETS, catalog::is_income_bracket);

    let edema = check.labelled("swelling", &["yes", "no"], |value| match value {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    });
    let weight_loss = check.labelled(
        "weight_loss",
        &WeightLossBand::ALL.map(|band| band.label()),
        WeightLossBand::from_label,
    );
    let feeding_behavior = check.labelled(
        "feeding_behavior",
        &FeedingBehavior::ALL.map(|behavior| behavior.label()),
        FeedingBehavior::from_label,
    );
    let goal = check.labelled("goal", &Goal::ALL.map(|goal| goal.label()), Goal::from_label);

    let physical_signs = check.physical_signs();
    let clinical_flags = check.clinical_flags();

    let allergies = check.list_text("allergies");
    let diet_prefs = check.list_text("diet_prefs");
    let avoid_foods = check.list_text("avoid_foods");

    if !check.issues.is_empty() {
        return Err(check.issues);
    }

    match (
        user_email, name, birthday, gender, weight_kg, height_cm, barangay, income,
    ) {
        (
            Some(user_email),
            Some(name),
            Some(birthday),
            Some(gender),
            Some(weight_kg),
            Some(height_cm),
            Some(barangay),
            Some(income),
        ) => Ok(ValidatedRow {
            user_email,
            name,
            birthday,
            gender,
            weight_kg,
            height_cm,
            bmi,
            muac_cm,
            barangay,
            income,
            goal,
            allergies,
            diet_prefs,
            avoid_foods,
            edema: edema.unwrap_or(false),
            weight_loss: weight_loss.unwrap_or_default(),
            feeding_behavior: feeding_behavior.unwrap_or_default(),
            physical_signs,
            dietary_diversity,
            clinical_flags,
        }),
        _ => {
            // Base fields are always required, so this only guards against a
            // channel whose required set omits one of them.
            let missing = BASE_REQUIRED_FIELDS
                .iter()
                .filter(|field| check.value(field).is_none())
                .map(|field| {
                    ImportIssue::new(
                        row_number,
                        Some(*field),
                        format!("missing required field: {field}"),
                    )
                })
                .collect();
            Err(missing)
        }
    }
}

struct FieldCheck<'a> {
    fields: &'a BTreeMap<String, String>,
    row_number: Option<usize>,
    issues: Vec<ImportIssue>,
}

impl<'a> FieldCheck<'a> {
    fn value(&self, field: &str) -> Option<&'a str> {
        self.fields
            .get(field)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    fn issue(&mut self, field: &str, message: String) {
        self.issues
            .push(ImportIssue::new(self.row_number, Some(field), message));
    }

    fn birthday(&mut self, as_of: NaiveDate) -> Option<NaiveDate> {
        let raw = self.value("birthday")?;
        match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) if date > as_of => {
                self.issue(
                    "birthday",
                    format!("birthday {raw} is after the screening date {as_of}"),
                );
                None
            }
            Ok(date) => Some(date),
            Err(_) => {
                self.issue(
                    "birthday",
                    format!("birthday must be a valid date in YYYY-MM-DD format (got '{raw}')"),
                );
                None
            }
        }
    }

    fn gender(&mut self, channel: IntakeChannel) -> Option<Gender> {
        let raw = self.value("gender")?;
        let accepted = channel.accepted_genders();
        match Gender::from_label(raw).filter(|gender| accepted.contains(gender)) {
            Some(gender) => Some(gender),
            None => {
                let labels: Vec<&str> = accepted.iter().map(Gender::label).collect();
                self.issue(
                    "gender",
                    format!(
                        "gender must be exactly one of: {} (got '{raw}')",
                        labels.join(", ")
                    ),
                );
                None
            }
        }
    }

    fn number(&mut self, field: &str, min: f64, max: f64, unit: &str) -> Option<f64> {
        let raw = self.value(field)?;
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() && value >= min && value <= max => Some(value),
            _ => {
                self.issue(
                    field,
                    format!("{field} must be a number between {min} and {max} {unit} (got '{raw}')"),
                );
                None
            }
        }
    }

    fn bmi(&mut self) -> Option<f64> {
        let raw = self.value("bmi")?;
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() && value > 0.0 && value <= 100.0 => Some(value),
            _ => {
                self.issue(
                    "bmi",
                    format!("bmi must be a positive number no greater than 100 (got '{raw}')"),
                );
                None
            }
        }
    }

    fn dietary_diversity(&mut self) -> Option<u8> {
        let raw = self.value("dietary_diversity")?;
        match raw.parse::<u8>() {
            Ok(groups) if groups <= 10 => Some(groups),
            _ => {
                self.issue(
                    "dietary_diversity",
                    format!(
                        "dietary_diversity must be a whole number between 0 and 10 (got '{raw}')"
                    ),
                );
                None
            }
        }
    }

    fn listed(
        &mut self,
        field: &str,
        accepted: &[&str],
        is_listed: fn(&str) -> bool,
    ) -> Option<String> {
        let raw = self.value(field)?;
        if is_listed(raw) {
            return Some(raw.to_string());
        }

        self.issue(
            field,
            format!(
                "{field} must be exactly one of: {} (got '{raw}')",
                accepted.join(", ")
            ),
        );
        None
    }

    fn labelled<T>(
        &mut self,
        field: &str,
        accepted: &[&str],
        parse: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        let raw = self.value(field)?;
        match parse(raw) {
            Some(value) => Some(value),
            None => {
                let quoted: Vec<String> = accepted.iter().map(|label| format!("\"{label}\"")).collect();
                self.issue(
                    field,
                    format!(
                        "{field} must be exactly one of: {} (got '{raw}')",
                        quoted.join(", ")
                    ),
                );
                None
            }
        }
    }

    fn physical_signs(&mut self) -> BTreeSet<PhysicalSign> {
        let Some(raw) = self.value("physical_signs") else {
            return BTreeSet::new();
        };

        let mut signs = BTreeSet::new();
        let mut invalid = Vec::new();
        for token in raw.split([',', ';']).map(str::trim).filter(|token| !token.is_empty()) {
            match PhysicalSign::from_label(token) {
                Some(sign) => {
                    signs.insert(sign);
                }
                None => invalid.push(token),
            }
        }

        if !invalid.is_empty() {
            let accepted: Vec<&str> = PhysicalSign::ALL.iter().map(PhysicalSign::label).collect();
            self.issue(
                "physical_signs",
                format!(
                    "physical_signs has invalid value(s): {}; each must be one of: {}",
                    invalid.join(", "),
                    accepted.join(", ")
                ),
            );
        }

        signs
    }

    fn clinical_flags(&mut self) -> BTreeSet<ClinicalFlag> {
        let mut flags = BTreeSet::new();
        for flag in ClinicalFlag::ALL {
            let column = flag.column();
            match self.value(column) {
                None | Some("false") => {}
                Some("true") => {
                    flags.insert(flag);
                }
                Some(other) => self.issue(
                    column,
                    format!("{column} must be exactly \"true\" or \"false\" (got '{other}')"),
                ),
            }
        }
        flags
    }

    /// Free-text lists accept `;` as a separator and are stored comma-separated.
    fn list_text(&self, field: &str) -> Option<String> {
        self.value(field).map(|value| value.replace(';', ","))
    }
}
