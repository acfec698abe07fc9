//! Place names and income brackets shipped with the mobile data-collection client.
//!
//! Import validation matches these exactly (case-sensitive); see
//! [`crate::screening::normalizer`] for the read-side fuzzy lookup.

pub const BARANGAYS: [&str; 27] = [
    "Alion",
    "Bangkal",
    "Cabcaben",
    "Camacho",
    "Daan Bago",
    "Daang Bago",
    "Daang Pare",
    "Del Pilar",
    "General Lim",
    "Kalaklan",
    "Lamao",
    "Lote",
    "Luakan",
    "Malaya",
    "Mountain View",
    "Paco",
    "Pamantayan",
    "Poblacion",
    "San Antonio",
    "San Miguel",
    "San Nicolas",
    "San Pedro",
    "San Roque",
    "San Vicente",
    "Santa Rita",
    "Santo Niño",
    "Tuyo",
];

pub const INCOME_BRACKETS: [&str; 4] = [
    "Below PHP 12,030/month (Below poverty line)",
    "PHP 12,031\u{2013}20,000/month (Low)",
    "PHP 20,001\u{2013}40,000/month (Middle)",
    "Above PHP 40,000/month (High)",
];

pub fn is_barangay(value: &str) -> bool {
    BARANGAYS.contains(&value)
}

pub fn is_income_bracket(value: &str) -> bool {
    INCOME_BRACKETS.contains(&value)
}
