use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::risk::RiskAssessment;

/// Gender answers. The mobile client only emits `boy`/`girl`; the web form also accepts adults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Boy,
    Girl,
    Male,
    Female,
}

impl Gender {
    pub const MOBILE: [Gender; 2] = [Gender::Boy, Gender::Girl];
    pub const DIRECT_ENTRY: [Gender; 4] = [Gender::Boy, Gender::Girl, Gender::Male, Gender::Female];

    pub fn label(&self) -> &'static str {
        match self {
            Gender::Boy => "boy",
            Gender::Girl => "girl",
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        Self::DIRECT_ENTRY
            .into_iter()
            .find(|gender| gender.label() == value)
    }
}

/// Self-reported weight loss over the past three months.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeightLossBand {
    #[default]
    #[serde(rename = "none_or_under_5pct")]
    NoneOrUnder5Pct,
    #[serde(rename = "pct_5_to_10")]
    Pct5To10,
    #[serde(rename = "over_10pct")]
    Over10Pct,
}

impl WeightLossBand {
    pub const ALL: [WeightLossBand; 3] = [
        WeightLossBand::NoneOrUnder5Pct,
        WeightLossBand::Pct5To10,
        WeightLossBand::Over10Pct,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            WeightLossBand::NoneOrUnder5Pct => "<5% or none",
            WeightLossBand::Pct5To10 => "5-10%",
            WeightLossBand::Over10Pct => ">10%",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|band| band.label() == value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedingBehavior {
    #[default]
    Good,
    Moderate,
    Poor,
}

impl FeedingBehavior {
    pub const ALL: [FeedingBehavior; 3] = [
        FeedingBehavior::Good,
        FeedingBehavior::Moderate,
        FeedingBehavior::Poor,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FeedingBehavior::Good => "good appetite",
            FeedingBehavior::Moderate => "moderate appetite",
            FeedingBehavior::Poor => "poor appetite",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|behavior| behavior.label() == value)
    }
}

/// Visible signs reported by the screener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicalSign {
    Thin,
    Shorter,
    Weak,
    None,
}

impl PhysicalSign {
    pub const ALL: [PhysicalSign; 4] = [
        PhysicalSign::Thin,
        PhysicalSign::Shorter,
        PhysicalSign::Weak,
        PhysicalSign::None,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PhysicalSign::Thin => "thin",
            PhysicalSign::Shorter => "shorter",
            PhysicalSign::Weak => "weak",
            PhysicalSign::None => "none",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|sign| sign.label() == value)
    }
}

/// Clinical and social risk factors captured as yes/no questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalFlag {
    RecentIllness,
    EatingDifficulty,
    FoodInsecurity,
    MicronutrientDeficiency,
    FunctionalDecline,
}

impl ClinicalFlag {
    pub const ALL: [ClinicalFlag; 5] = [
        ClinicalFlag::RecentIllness,
        ClinicalFlag::EatingDifficulty,
        ClinicalFlag::FoodInsecurity,
        ClinicalFlag::MicronutrientDeficiency,
        ClinicalFlag::FunctionalDecline,
    ];

    /// Column carrying the flag in CSV files and form payloads.
    pub fn column(&self) -> &'static str {
        match self {
            ClinicalFlag::RecentIllness => "has_recent_illness",
            ClinicalFlag::EatingDifficulty => "has_eating_difficulty",
            ClinicalFlag::FoodInsecurity => "has_food_insecurity",
            ClinicalFlag::MicronutrientDeficiency => "has_micronutrient_deficiency",
            ClinicalFlag::FunctionalDecline => "has_functional_decline",
        }
    }
}

/// Nutrition goal selected in the mobile client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    WeightGain,
    WeightLoss,
    Maintain,
    MuscleGain,
}

impl Goal {
    pub const ALL: [Goal; 4] = [Goal::WeightGain, Goal::WeightLoss, Goal::Maintain, Goal::MuscleGain];

    pub fn label(&self) -> &'static str {
        match self {
            Goal::WeightGain => "weight_gain",
            Goal::WeightLoss => "weight_loss",
            Goal::Maintain => "maintain",
            Goal::MuscleGain => "muscle_gain",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|goal| goal.label() == value)
    }
}

/// Anthropometric and clinical facts needed to compute a risk score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningSubject {
    pub birthday: NaiveDate,
    pub age_months: u32,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub bmi: f64,
    pub muac_cm: Option<f64>,
    pub edema: bool,
    pub weight_loss: WeightLossBand,
    pub feeding_behavior: FeedingBehavior,
    pub physical_signs: BTreeSet<PhysicalSign>,
    /// `None` when the screening did not collect it; contributes no points.
    pub dietary_diversity_groups: Option<u8>,
    pub clinical_flags: BTreeSet<ClinicalFlag>,
}

impl ScreeningSubject {
    /// Builds a subject with every optional factor at its zero-contribution value.
    pub fn new(birthday: NaiveDate, as_of: NaiveDate, weight_kg: f64, height_cm: f64) -> Self {
        Self {
            birthday,
            age_months: age_in_months(birthday, as_of),
            weight_kg,
            height_cm,
            bmi: body_mass_index(weight_kg, height_cm),
            muac_cm: None,
            edema: false,
            weight_loss: WeightLossBand::default(),
            feeding_behavior: FeedingBehavior::default(),
            physical_signs: BTreeSet::new(),
            dietary_diversity_groups: None,
            clinical_flags: BTreeSet::new(),
        }
    }

    pub fn with_bmi(mut self, bmi: f64) -> Self {
        self.bmi = bmi;
        self
    }

    pub fn with_muac(mut self, muac_cm: f64) -> Self {
        self.muac_cm = Some(muac_cm);
        self
    }

    pub fn with_edema(mut self, edema: bool) -> Self {
        self.edema = edema;
        self
    }

    pub fn with_weight_loss(mut self, band: WeightLossBand) -> Self {
        self.weight_loss = band;
        self
    }

    pub fn with_feeding_behavior(mut self, behavior: FeedingBehavior) -> Self {
        self.feeding_behavior = behavior;
        self
    }

    pub fn with_physical_sign(mut self, sign: PhysicalSign) -> Self {
        self.physical_signs.insert(sign);
        self
    }

    pub fn with_dietary_diversity(mut self, groups: u8) -> Self {
        self.dietary_diversity_groups = Some(groups);
        self
    }

    pub fn with_clinical_flag(mut self, flag: ClinicalFlag) -> Self {
        self.clinical_flags.insert(flag);
        self
    }
}

/// Validated screening row handed to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningRecord {
    pub user_email: String,
    pub name: String,
    pub gender: Gender,
    pub barangay: String,
    pub income: String,
    pub age_years: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<Goal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergies: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diet_prefs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avoid_foods: Option<String>,
    pub subject: ScreeningSubject,
    pub assessment: RiskAssessment,
}

/// Whole months between `birthday` and `as_of`; zero for future birthdays.
pub fn age_in_months(birthday: NaiveDate, as_of: NaiveDate) -> u32 {
    if as_of <= birthday {
        return 0;
    }

    let mut months = (as_of.year() - birthday.year()) * 12 + as_of.month() as i32
        - birthday.month() as i32;
    if as_of.day() < birthday.day() {
        months -= 1;
    }

    months.max(0) as u32
}

/// Completed years between `birthday` and `as_of`.
pub fn age_in_years(birthday: NaiveDate, as_of: NaiveDate) -> u32 {
    age_in_months(birthday, as_of) / 12
}

/// BMI rounded to one decimal, or zero when height is not positive.
pub fn body_mass_index(weight_kg: f64, height_cm: f64) -> f64 {
    let height_m = height_cm / 100.0;
    if height_m <= 0.0 {
        return 0.0;
    }

    let bmi = weight_kg / (height_m * height_m);
    (bmi * 10.0).round() / 10.0
}
