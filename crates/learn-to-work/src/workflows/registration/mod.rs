//! Learn To Work applicant registration.
//!
//! A four-step wizard (personal details, eligibility, documents, declaration) backed by input
//! sanitization, field validation, a per-identifier submission throttle and a reload-surviving
//! draft store. Submissions are logged and handed back to the caller; nothing is persisted past
//! the session.

pub mod clock;
pub mod countdown;
pub mod domain;
pub mod eligibility;
pub mod housekeeping;
pub mod rate_limit;
pub mod router;
pub mod sanitizer;
pub mod service;
pub mod store;
pub mod validation;
pub mod wizard;

#[cfg(test)]
mod tests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use countdown::CountdownTimer;
pub use domain::{
    ApplicationRecord, DocumentSet, DocumentSlot, EligibilityBanner, EligibilityInfo, Field,
    FieldEdit, FieldError, Gender, PersistedDraft, PersonalInfo, QualificationStatus,
    RateLimitBanner, Region, UploadedFile, WizardStep, WizardView, TOTAL_STEPS,
};
pub use eligibility::{eligibility_banner, eligibility_gate, is_eligible};
pub use housekeeping::{Housekeeping, HousekeepingSchedule};
pub use rate_limit::{RateLimitPolicy, RateLimiter, ANONYMOUS_IDENTIFIER};
pub use router::registration_router;
pub use sanitizer::{is_clean, sanitize};
pub use service::{RegistrationService, RegistrationServiceError, SessionId};
pub use store::{SecureStore, SessionStorage, StorageError};
pub use validation::{
    format_file_size, is_valid_email, is_valid_ic_number, is_valid_phone_number, validate_file,
    validate_file_type, FileRejection, MAX_UPLOAD_BYTES,
};
pub use wizard::{RegistrationWizard, WizardError, DRAFT_STORAGE_KEY};
