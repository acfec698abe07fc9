use super::super::domain::{
    ClinicalFlag, FeedingBehavior, PhysicalSign, ScreeningSubject, WeightLossBand,
};
use super::{RiskFactor, ScoreComponent};

const WEIGHT_RANGE_KG: (f64, f64) = (2.0, 300.0);
const HEIGHT_RANGE_CM: (f64, f64) = (30.0, 250.0);

pub(crate) fn score_subject(subject: &ScreeningSubject) -> Vec<ScoreComponent> {
    if subject.edema {
        return vec![component(
            RiskFactor::Edema,
            100,
            "bilateral edema present; urgent referral".to_string(),
        )];
    }

    if !within(subject.weight_kg, WEIGHT_RANGE_KG) || !within(subject.height_cm, HEIGHT_RANGE_CM)
    {
        return vec![component(
            RiskFactor::ImplausibleMeasurement,
            100,
            format!(
                "weight {} kg / height {} cm outside plausible range",
                subject.weight_kg, subject.height_cm
            ),
        )];
    }

    let mut components = vec![anthropometry(subject)];

    let weight_loss = match subject.weight_loss {
        WeightLossBand::Over10Pct => 20,
        WeightLossBand::Pct5To10 => 10,
        WeightLossBand::NoneOrUnder5Pct => 0,
    };
    push_nonzero(
        &mut components,
        RiskFactor::WeightLoss,
        weight_loss,
        format!("weight loss {}", subject.weight_loss.label()),
    );

    let feeding = match subject.feeding_behavior {
        FeedingBehavior::Poor | FeedingBehavior::Moderate => 8,
        FeedingBehavior::Good => 0,
    };
    push_nonzero(
        &mut components,
        RiskFactor::FeedingBehavior,
        feeding,
        subject.feeding_behavior.label().to_string(),
    );

    let signs: Vec<&str> = subject
        .physical_signs
        .iter()
        .filter(|sign| **sign != PhysicalSign::None)
        .map(PhysicalSign::label)
        .collect();
    push_nonzero(
        &mut components,
        RiskFactor::PhysicalSigns,
        8 * signs.len() as u8,
        format!("physical signs: {}", signs.join(", ")),
    );

    let flag_points: u8 = subject
        .clinical_flags
        .iter()
        .map(|flag| clinical_flag_points(*flag))
        .sum();
    let flag_columns: Vec<&str> = subject
        .clinical_flags
        .iter()
        .map(ClinicalFlag::column)
        .collect();
    push_nonzero(
        &mut components,
        RiskFactor::ClinicalFlags,
        flag_points,
        flag_columns.join(", "),
    );

    if let Some(groups) = subject.dietary_diversity_groups {
        let points = match groups {
            0..=3 => 10,
            4..=5 => 5,
            _ => 0,
        };
        push_nonzero(
            &mut components,
            RiskFactor::DietaryDiversity,
            points,
            format!("{groups} food group(s) in the last day"),
        );
    }

    components
}

/// Exactly one age band applies; infants under six months share the 5-19 year table.
fn anthropometry(subject: &ScreeningSubject) -> ScoreComponent {
    let bmi = subject.bmi;
    match subject.age_months {
        6..=59 => match subject.muac_cm.filter(|muac| *muac > 0.0) {
            Some(muac) => {
                let points = if muac < 11.5 {
                    40
                } else if muac < 12.5 {
                    25
                } else {
                    0
                };
                component(RiskFactor::Muac, points, format!("MUAC {muac} cm"))
            }
            None => {
                let ratio = subject.weight_kg / (subject.height_cm / 100.0);
                let points = if ratio < 0.8 {
                    40
                } else if ratio < 0.9 {
                    25
                } else {
                    0
                };
                component(
                    RiskFactor::WeightForHeight,
                    points,
                    format!("weight-for-height ratio {ratio:.2}"),
                )
            }
        },
        240..=u32::MAX => {
            let points = if bmi < 16.5 {
                40
            } else if bmi < 18.5 {
                25
            } else {
                0
            };
            component(RiskFactor::AdultBmi, points, format!("adult BMI {bmi:.1}"))
        }
        _ => {
            let points = if bmi < 15.0 {
                40
            } else if bmi < 17.0 {
                30
            } else if bmi < 18.5 {
                20
            } else {
                0
            };
            component(RiskFactor::BmiForAge, points, format!("BMI-for-age {bmi:.1}"))
        }
    }
}

fn clinical_flag_points(flag: ClinicalFlag) -> u8 {
    match flag {
        ClinicalFlag::RecentIllness => 8,
        ClinicalFlag::EatingDifficulty => 8,
        ClinicalFlag::FoodInsecurity => 10,
        ClinicalFlag::MicronutrientDeficiency => 6,
        ClinicalFlag::FunctionalDecline => 8,
    }
}

fn within(value: f64, (min, max): (f64, f64)) -> bool {
    value >= min && value <= max
}

fn component(factor: RiskFactor, points: u8, notes: String) -> ScoreComponent {
    ScoreComponent {
        factor,
        points,
        notes,
    }
}

fn push_nonzero(
    components: &mut Vec<ScoreComponent>,
    factor: RiskFactor,
    points: u8,
    notes: String,
) {
    if points > 0 {
        components.push(component(factor, points, notes));
    }
}
