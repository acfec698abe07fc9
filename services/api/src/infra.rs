use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use nutriscreen::screening::{
    ClinicalFlag, FeedingBehavior, PhysicalSign, ScreeningRecord, ScreeningStore, StoreError,
    WeightLossBand,
};
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local store keyed by email; exports come back in email order.
#[derive(Default, Clone)]
pub(crate) struct InMemoryScreeningStore {
    records: Arc<Mutex<BTreeMap<String, ScreeningRecord>>>,
}

impl InMemoryScreeningStore {
    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, ScreeningRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl ScreeningStore for InMemoryScreeningStore {
    fn exists(&self, user_email: &str) -> Result<bool, StoreError> {
        Ok(self.lock()?.contains_key(user_email))
    }

    fn create(&self, record: ScreeningRecord) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&record.user_email) {
            return Err(StoreError::Conflict);
        }
        guard.insert(record.user_email.clone(), record);
        Ok(())
    }

    fn fetch(&self, user_email: &str) -> Result<Option<ScreeningRecord>, StoreError> {
        Ok(self.lock()?.get(user_email).cloned())
    }

    fn update(&self, record: ScreeningRecord) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let slot = guard.get_mut(&record.user_email).ok_or(StoreError::NotFound)?;
        *slot = record;
        Ok(())
    }

    fn delete(&self, user_email: &str) -> Result<(), StoreError> {
        self.lock()?
            .remove(user_email)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    fn delete_by_barangay(&self, barangay: &str) -> Result<usize, StoreError> {
        let mut guard = self.lock()?;
        let before = guard.len();
        guard.retain(|_, record| record.barangay != barangay);
        Ok(before - guard.len())
    }

    fn records(&self) -> Result<Vec<ScreeningRecord>, StoreError> {
        Ok(self.lock()?.values().cloned().collect())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_weight_loss(raw: &str) -> Result<WeightLossBand, String> {
    WeightLossBand::from_label(raw.trim()).ok_or_else(|| {
        let labels: Vec<&str> = WeightLossBand::ALL.iter().map(WeightLossBand::label).collect();
        format!("expected one of: {}", labels.join(", "))
    })
}

/// Accepts `poor` as well as the full `poor appetite` label.
pub(crate) fn parse_feeding(raw: &str) -> Result<FeedingBehavior, String> {
    let raw = raw.trim();
    FeedingBehavior::from_label(raw)
        .or_else(|| FeedingBehavior::from_label(&format!("{raw} appetite")))
        .ok_or_else(|| "expected good, moderate or poor".to_string())
}

pub(crate) fn parse_sign(raw: &str) -> Result<PhysicalSign, String> {
    PhysicalSign::from_label(raw.trim())
        .ok_or_else(|| "expected thin, shorter, weak or none".to_string())
}

/// Accepts the CSV column (`has_food_insecurity`) or its suffix (`food_insecurity`).
pub(crate) fn parse_flag(raw: &str) -> Result<ClinicalFlag, String> {
    let raw = raw.trim();
    ClinicalFlag::ALL
        .into_iter()
        .find(|flag| flag.column() == raw || flag.column().strip_prefix("has_") == Some(raw))
        .ok_or_else(|| {
            let columns: Vec<&str> = ClinicalFlag::ALL.iter().map(ClinicalFlag::column).collect();
            format!("expected one of: {}", columns.join(", "))
        })
}
