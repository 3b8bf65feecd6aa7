use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::Duration;
use serde_json::Value;

use crate::workflows::registration::clock::{Clock, ManualClock};
use crate::workflows::registration::domain::{
    DocumentSlot, FieldEdit, Gender, QualificationStatus, Region, UploadedFile,
};
use crate::workflows::registration::rate_limit::{RateLimitPolicy, RateLimiter};
use crate::workflows::registration::store::{SecureStore, SessionStorage, StorageError};
use crate::workflows::registration::wizard::RegistrationWizard;
use crate::workflows::registration::RegistrationService;

pub(super) const EMAIL: &str = "aisyah@example.com";
pub(super) const IC_NUMBER: &str = "030512-10-5678";

#[derive(Default)]
pub(super) struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub(super) fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("storage mutex poisoned")
            .get(key)
            .cloned()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries
            .lock()
            .expect("storage mutex poisoned")
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .expect("storage mutex poisoned")
            .remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self
            .entries
            .lock()
            .expect("storage mutex poisoned")
            .keys()
            .cloned()
            .collect())
    }
}

/// Storage that refuses every write, like a browser with a full quota.
#[derive(Default)]
pub(super) struct FullStorage;

impl SessionStorage for FullStorage {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: String) -> Result<(), StorageError> {
        Err(StorageError::QuotaExceeded)
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(Vec::new())
    }
}

pub(super) struct Harness {
    pub(super) clock: Arc<ManualClock>,
    pub(super) limiter: Arc<RateLimiter>,
    pub(super) storage: Arc<MemoryStorage>,
    pub(super) store: SecureStore<MemoryStorage>,
}

impl Harness {
    pub(super) fn new() -> Self {
        Self::with_policy(RateLimitPolicy::default())
    }

    pub(super) fn with_policy(policy: RateLimitPolicy) -> Self {
        let clock = Arc::new(ManualClock::default());
        let limiter = Arc::new(RateLimiter::new(policy, clock.clone()));
        let storage = Arc::new(MemoryStorage::default());
        let store = SecureStore::new(storage.clone(), clock.clone());
        Self {
            clock,
            limiter,
            storage,
            store,
        }
    }

    pub(super) fn mount(&self) -> RegistrationWizard<MemoryStorage> {
        RegistrationWizard::mount(self.limiter.clone(), self.store.clone())
    }
}

/// Lockout policy short enough to count down in a test.
pub(super) fn short_block_policy() -> RateLimitPolicy {
    RateLimitPolicy {
        max_attempts: 1,
        window: Duration::minutes(15),
        block_duration: Duration::seconds(3),
    }
}

pub(super) fn personal_edits() -> Vec<FieldEdit> {
    vec![
        FieldEdit::FullName("Aisyah binti Ahmad".to_string()),
        FieldEdit::NationalId(IC_NUMBER.to_string()),
        FieldEdit::Email(EMAIL.to_string()),
        FieldEdit::PhoneNumber("012-345 6789".to_string()),
        FieldEdit::Age(Some(20)),
        FieldEdit::Gender(Some(Gender::Female)),
        FieldEdit::Region(Some(Region::Selangor)),
    ]
}

pub(super) fn eligibility_edits() -> Vec<FieldEdit> {
    vec![
        FieldEdit::QualificationStatus(Some(QualificationStatus::FailedSejarah)),
        FieldEdit::FullTimeTraining(true),
        FieldEdit::IndustrialTraining(true),
        FieldEdit::WorkCommitment(true),
    ]
}

pub(super) fn identity_card() -> UploadedFile {
    UploadedFile::new("mykad.pdf", 420_000, "application/pdf")
}

pub(super) fn resume() -> UploadedFile {
    UploadedFile::new(
        "resume.docx",
        88_000,
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    )
}

pub(super) fn supporting_proof() -> UploadedFile {
    UploadedFile::new("spm-slip.png", 1_200_000, "image/png")
}

pub(super) fn documents() -> Vec<(DocumentSlot, UploadedFile)> {
    vec![
        (DocumentSlot::IdentityDocument, identity_card()),
        (DocumentSlot::Resume, resume()),
        (DocumentSlot::SupportingProof, supporting_proof()),
    ]
}

/// Fill every step and stop on the declaration step, declaration unticked.
pub(super) fn walk_to_declaration<S: SessionStorage>(wizard: &mut RegistrationWizard<S>) {
    for edit in personal_edits() {
        wizard.apply(edit).expect("personal edit");
    }
    wizard.next().expect("personal info accepted");

    for edit in eligibility_edits() {
        wizard.apply(edit).expect("eligibility edit");
    }
    wizard.next().expect("eligibility accepted");

    for (slot, file) in documents() {
        wizard.select_document(slot, Some(file)).expect("document accepted");
    }
    wizard.next().expect("documents accepted");
}

pub(super) fn build_service() -> (Arc<RegistrationService<MemoryStorage>>, Arc<ManualClock>) {
    build_service_with_policy(RateLimitPolicy::default())
}

pub(super) fn build_service_with_policy(
    policy: RateLimitPolicy,
) -> (Arc<RegistrationService<MemoryStorage>>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let shared: Arc<dyn Clock> = clock.clone();
    let limiter = Arc::new(RateLimiter::new(policy, shared.clone()));
    let service = RegistrationService::new(limiter, shared, Duration::minutes(60));
    (Arc::new(service), clock)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
