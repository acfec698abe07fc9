use super::domain::ScreeningRecord;

/// Storage abstraction for screening records keyed by `user_email`, owned by the surrounding application.
pub trait ScreeningStore: Send + Sync {
    fn exists(&self, user_email: &str) -> Result<bool, StoreError>;
    fn create(&self, record: ScreeningRecord) -> Result<(), StoreError>;
    fn fetch(&self, user_email: &str) -> Result<Option<ScreeningRecord>, StoreError>;
    /// Replaces the record stored under `record.user_email`.
    fn update(&self, record: ScreeningRecord) -> Result<(), StoreError>;
    fn delete(&self, user_email: &str) -> Result<(), StoreError>;
    /// Removes every record whose barangay matches exactly; returns how many went.
    fn delete_by_barangay(&self, barangay: &str) -> Result<usize, StoreError>;
    fn records(&self) -> Result<Vec<ScreeningRecord>, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record rejected: {0}")]
    Rejected(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
