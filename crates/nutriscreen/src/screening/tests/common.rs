use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::body::to_bytes;
use axum::http::StatusCode;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::screening::domain::ScreeningRecord;
use crate::screening::store::{ScreeningStore, StoreError};
use crate::screening::{screening_router, ScreeningForm, ScreeningService};

pub(super) const HEADER: &str = "user_email,name,birthday,gender,weight,height,barangay,income,muac,swelling,weight_loss,dietary_diversity,feeding_behavior,physical_signs,has_food_insecurity";

pub(super) fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 1).expect("valid date")
}

/// Three well-formed mobile rows; the third is an adult with no risk factors.
pub(super) fn mobile_csv() -> String {
    format!(
        "{HEADER}\n\
maria@example.com,Maria Santos,2022-03-10,girl,11.5,88,Lamao,\"PHP 12,031–20,000/month (Low)\",11.9,no,5-10%,4,moderate appetite,thin,true\n\
jose@example.com,Jose Rizal,2019-07-01,boy,18,110,Poblacion,\"Below PHP 12,030/month (Below poverty line)\",,no,<5% or none,7,good appetite,none,false\n\
lito@example.com,Lito Lapid,1990-01-20,boy,68,170,San Roque,\"Above PHP 40,000/month (High)\",,no,<5% or none,8,good appetite,,\n"
    )
}

pub(super) fn adult_form() -> ScreeningForm {
    ScreeningForm::new()
        .with("user_email", "ana@example.com")
        .with("name", "Ana Cruz")
        .with("birthday", "1998-05-02")
        .with("gender", "female")
        .with("weight", "50")
        .with("height", "170")
        .with("barangay", "Santo Niño")
        .with("income", "PHP 20,001–40,000/month (Middle)")
        .with("swelling", "no")
        .with("weight_loss", ">10%")
        .with("dietary_diversity", "3")
        .with("feeding_behavior", "poor appetite")
        .with("physical_signs", "thin")
}

pub(super) fn build_service() -> (ScreeningService<MemoryStore>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let service = ScreeningService::new(store.clone());
    (service, store)
}

pub(super) fn router_with_service<S>(service: ScreeningService<S>) -> axum::Router
where
    S: ScreeningStore + 'static,
{
    screening_router(Arc::new(service))
}

pub(super) async fn json_body(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    let value = serde_json::from_slice(&bytes).expect("json body");
    (status, value)
}

pub(super) async fn text_body(response: Response) -> (StatusCode, String) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    (status, String::from_utf8(bytes.to_vec()).expect("utf-8 body"))
}

#[derive(Default)]
pub(super) struct MemoryStore {
    records: Mutex<BTreeMap<String, ScreeningRecord>>,
}

impl MemoryStore {
    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("store mutex poisoned").len()
    }

    pub(super) fn get(&self, email: &str) -> Option<ScreeningRecord> {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .get(email)
            .cloned()
    }

    /// Stores a record as-is, bypassing validation, to stand in for older data.
    pub(super) fn insert_raw(&self, record: ScreeningRecord) {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .insert(record.user_email.clone(), record);
    }
}

impl ScreeningStore for MemoryStore {
    fn exists(&self, user_email: &str) -> Result<bool, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.contains_key(user_email))
    }

    fn create(&self, record: ScreeningRecord) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        if guard.contains_key(&record.user_email) {
            return Err(StoreError::Conflict);
        }
        guard.insert(record.user_email.clone(), record);
        Ok(())
    }

    fn fetch(&self, user_email: &str) -> Result<Option<ScreeningRecord>, StoreError> {
        Ok(self.get(user_email))
    }

    fn update(&self, record: ScreeningRecord) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        match guard.get_mut(&record.user_email) {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn delete(&self, user_email: &str) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        guard.remove(user_email).map(|_| ()).ok_or(StoreError::NotFound)
    }

    fn delete_by_barangay(&self, barangay: &str) -> Result<usize, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let before = guard.len();
        guard.retain(|_, record| record.barangay != barangay);
        Ok(before - guard.len())
    }

    fn records(&self) -> Result<Vec<ScreeningRecord>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}

/// Answers every existence check with "absent" and rejects one email on create.
pub(super) struct RejectingStore {
    pub(super) rejected_email: &'static str,
    pub(super) inner: MemoryStore,
}

impl ScreeningStore for RejectingStore {
    fn exists(&self, user_email: &str) -> Result<bool, StoreError> {
        self.inner.exists(user_email)
    }

    fn create(&self, record: ScreeningRecord) -> Result<(), StoreError> {
        if record.user_email == self.rejected_email {
            return Err(StoreError::Rejected("quota exceeded".to_string()));
        }
        self.inner.create(record)
    }

    fn fetch(&self, user_email: &str) -> Result<Option<ScreeningRecord>, StoreError> {
        self.inner.fetch(user_email)
    }

    fn update(&self, record: ScreeningRecord) -> Result<(), StoreError> {
        if record.user_email == self.rejected_email {
            return Err(StoreError::Rejected("quota exceeded".to_string()));
        }
        self.inner.update(record)
    }

    fn delete(&self, user_email: &str) -> Result<(), StoreError> {
        self.inner.delete(user_email)
    }

    fn delete_by_barangay(&self, barangay: &str) -> Result<usize, StoreError> {
        self.inner.delete_by_barangay(barangay)
    }

    fn records(&self) -> Result<Vec<ScreeningRecord>, StoreError> {
        self.inner.records()
    }
}

pub(super) struct UnavailableStore;

impl ScreeningStore for UnavailableStore {
    fn exists(&self, _user_email: &str) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn create(&self, _record: ScreeningRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _user_email: &str) -> Result<Option<ScreeningRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: ScreeningRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _user_email: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn delete_by_barangay(&self, _barangay: &str) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn records(&self) -> Result<Vec<ScreeningRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

/// Reports nothing as existing but refuses every create as a conflict.
pub(super) struct RacingStore;

impl ScreeningStore for RacingStore {
    fn exists(&self, _user_email: &str) -> Result<bool, StoreError> {
        Ok(false)
    }

    fn create(&self, _record: ScreeningRecord) -> Result<(), StoreError> {
        Err(StoreError::Conflict)
    }

    fn fetch(&self, _user_email: &str) -> Result<Option<ScreeningRecord>, StoreError> {
        Ok(None)
    }

    fn update(&self, _record: ScreeningRecord) -> Result<(), StoreError> {
        Err(StoreError::NotFound)
    }

    fn delete(&self, _user_email: &str) -> Result<(), StoreError> {
        Err(StoreError::NotFound)
    }

    fn delete_by_barangay(&self, _barangay: &str) -> Result<usize, StoreError> {
        Ok(0)
    }

    fn records(&self) -> Result<Vec<ScreeningRecord>, StoreError> {
        Ok(Vec::new())
    }
}
