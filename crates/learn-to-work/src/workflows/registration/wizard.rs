//! Four-step registration wizard.
//!
//! The wizard owns the in-progress [`ApplicationRecord`] and is its only writer. It calls down
//! into the validators, the eligibility rule, the shared [`RateLimiter`] and the tab's
//! [`SecureStore`]; none of those call back. Every refusal is reported as a [`WizardError`]
//! and mirrored into the view state, nothing here is fatal.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use super::clock::Clock;
use super::domain::{
    ApplicationRecord, DocumentSlot, FieldEdit, FieldError, PersistedDraft, RateLimitBanner,
    UploadedFile, WizardStep, WizardView, TOTAL_STEPS,
};
use super::eligibility::{eligibility_banner, eligibility_gate};
use super::rate_limit::{RateLimiter, ANONYMOUS_IDENTIFIER};
use super::store::{SecureStore, SessionStorage, StorageError};
use super::validation::{
    validate_declaration, validate_documents, validate_eligibility, validate_file,
    validate_personal_info, FileRejection, MAX_UPLOAD_BYTES,
};

/// Store key holding the reload-surviving draft.
pub const DRAFT_STORAGE_KEY: &str = "registrationFormData";

/// Interval between countdown ticks while submissions are throttled.
pub const COUNTDOWN_TICK_SECONDS: u64 = 1;

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("{} validation error(s) on step {}", .errors.len(), .step.index())]
    Validation {
        step: WizardStep,
        errors: Vec<FieldError>,
    },
    #[error("You do not meet the eligibility criteria for this program.")]
    Ineligible,
    #[error("already on the first step")]
    AtFirstStep,
    #[error("the declaration step is completed by submitting the application")]
    AtFinalStep,
    #[error("applications can only be submitted from the declaration step")]
    NotAtDeclaration,
    #[error("Too many submission attempts. Please wait {} seconds before trying again.", whole_seconds(.remaining))]
    RateLimited { remaining: Duration },
    #[error("{slot:?}: {source}")]
    FileRejected {
        slot: DocumentSlot,
        #[source]
        source: FileRejection,
    },
    #[error("registration already submitted")]
    AlreadySubmitted,
}

/// Seconds left, rounded up so a partial second still shows.
pub(crate) fn whole_seconds(remaining: &Duration) -> u64 {
    let millis = remaining.num_milliseconds().max(0) as u64;
    millis.div_ceil(1000)
}

/// Transient lockout entered when the rate limiter refuses a submission. The deadline is read
/// from the limiter's clock so the hold lapses with the block it mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RateLimitHold {
    until: DateTime<Utc>,
}

impl RateLimitHold {
    fn remaining_at(self, now: DateTime<Utc>) -> Option<Duration> {
        let remaining = self.until - now;
        (remaining > Duration::zero()).then_some(remaining)
    }
}

pub struct RegistrationWizard<S> {
    step: WizardStep,
    record: ApplicationRecord,
    errors: Vec<FieldError>,
    hold: Option<RateLimitHold>,
    limiter: Arc<RateLimiter>,
    store: SecureStore<S>,
}

impl<S> RegistrationWizard<S>
where
    S: SessionStorage,
{
    /// Start a wizard on step one, restoring any draft left in the tab's store.
    pub fn mount(limiter: Arc<RateLimiter>, store: SecureStore<S>) -> Self {
        let record = match store.get_item(DRAFT_STORAGE_KEY) {
            Some(saved) => match serde_json::from_str::<PersistedDraft>(&saved) {
                Ok(draft) => ApplicationRecord::from_draft(draft),
                Err(err) => {
                    warn!(error = %err, "suspicious activity: invalid stored draft format");
                    if let Err(err) = store.remove_item(DRAFT_STORAGE_KEY) {
                        warn!(error = %err, "failed to clear corrupted draft");
                    }
                    ApplicationRecord::default()
                }
            },
            None => ApplicationRecord::default(),
        };

        Self {
            step: WizardStep::PersonalInfo,
            record,
            errors: Vec::new(),
            hold: None,
            limiter,
            store,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn record(&self) -> &ApplicationRecord {
        &self.record
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn is_submitted(&self) -> bool {
        self.step == WizardStep::Submitted
    }

    /// Remaining lockout while the rate-limited sub-state is active.
    pub fn rate_limit_remaining(&self) -> Option<Duration> {
        let now = self.limiter.clock().now();
        self.hold.and_then(|hold| hold.remaining_at(now))
    }

    /// Whether the forward affordance should be enabled. Only the eligibility step can block it.
    pub fn can_proceed(&self) -> bool {
        match (self.step, self.record.eligibility_info.status) {
            (WizardStep::Eligibility, Some(status)) => status.is_eligible(),
            _ => true,
        }
    }

    /// Identifier the rate limiter tracks: email, else IC number, else the anonymous bucket.
    pub fn identifier(&self) -> String {
        let personal = &self.record.personal_info;
        [&personal.email, &personal.national_id]
            .into_iter()
            .map(|candidate| candidate.trim())
            .find(|candidate| !candidate.is_empty())
            .unwrap_or(ANONYMOUS_IDENTIFIER)
            .to_string()
    }

    pub fn apply(&mut self, edit: FieldEdit) -> Result<(), WizardError> {
        self.ensure_open()?;

        let personal = &mut self.record.personal_info;
        let eligibility = &mut self.record.eligibility_info;
        match edit {
            FieldEdit::FullName(value) => personal.full_name = value,
            FieldEdit::NationalId(value) => personal.national_id = value,
            FieldEdit::Email(value) => personal.email = value,
            FieldEdit::PhoneNumber(value) => personal.phone_number = value,
            FieldEdit::Age(value) => personal.age = value,
            FieldEdit::Gender(value) => personal.gender = value,
            FieldEdit::Region(value) => personal.region = value,
            FieldEdit::QualificationStatus(value) => eligibility.status = value,
            FieldEdit::FullTimeTraining(value) => eligibility.full_time_training = value,
            FieldEdit::IndustrialTraining(value) => eligibility.industrial_training = value,
            FieldEdit::WorkCommitment(value) => eligibility.work_commitment = value,
            FieldEdit::Declaration(value) => self.record.declaration = value,
        }

        self.errors.clear();
        self.persist_draft();
        Ok(())
    }

    /// Put a file into (or clear) a document slot. Files failing the upload checks are refused
    /// and the slot keeps its previous content.
    pub fn select_document(
        &mut self,
        slot: DocumentSlot,
        file: Option<UploadedFile>,
    ) -> Result<(), WizardError> {
        self.ensure_open()?;

        if let Some(candidate) = &file {
            validate_file(candidate, slot.accepted_extensions(), MAX_UPLOAD_BYTES)
                .map_err(|source| WizardError::FileRejected { slot, source })?;
        }

        *self.record.document_info.slot_mut(slot) = file;
        self.errors.clear();
        Ok(())
    }

    /// Errors for the current step, including the ineligibility gate on step two.
    pub fn validate_current_step(&self) -> Vec<FieldError> {
        match self.step {
            WizardStep::PersonalInfo => validate_personal_info(&self.record.personal_info),
            WizardStep::Eligibility => {
                let mut errors = validate_eligibility(&self.record.eligibility_info);
                if let Some(gate) = eligibility_gate(self.record.eligibility_info.status) {
                    warn!(
                        status = ?self.record.eligibility_info.status,
                        "suspicious activity: ineligible applicant attempting to proceed"
                    );
                    errors.push(gate);
                }
                errors
            }
            WizardStep::Documents => validate_documents(&self.record.document_info),
            WizardStep::Declaration => validate_declaration(self.record.declaration),
            WizardStep::Submitted => Vec::new(),
        }
    }

    pub fn next(&mut self) -> Result<WizardStep, WizardError> {
        self.ensure_open()?;

        let errors = self.validate_current_step();
        self.errors = errors.clone();

        if !self.can_proceed() {
            return Err(WizardError::Ineligible);
        }
        if !errors.is_empty() {
            return Err(WizardError::Validation {
                step: self.step,
                errors,
            });
        }

        let following = self.step.following().ok_or(WizardError::AtFinalStep)?;
        self.step = following;
        Ok(following)
    }

    pub fn previous(&mut self) -> Result<WizardStep, WizardError> {
        self.ensure_open()?;

        let preceding = self.step.preceding().ok_or(WizardError::AtFirstStep)?;
        self.step = preceding;
        self.errors.clear();
        Ok(preceding)
    }

    /// Submit from the declaration step.
    ///
    /// On success the draft is discarded and the finished record is handed back; the wizard is
    /// then terminal and a new instance is needed to register again.
    pub fn submit(&mut self) -> Result<ApplicationRecord, WizardError> {
        self.ensure_open()?;
        if self.step != WizardStep::Declaration {
            return Err(WizardError::NotAtDeclaration);
        }
        if let Some(remaining) = self.rate_limit_remaining() {
            return Err(WizardError::RateLimited { remaining });
        }
        self.hold = None;

        let identifier = self.identifier();
        if !self.limiter.is_allowed(&identifier) {
            let remaining = self.limiter.remaining_time(&identifier);
            warn!(%identifier, "rate limit violation on registration submit");
            if remaining > Duration::zero() {
                self.hold = Some(RateLimitHold {
                    until: self.limiter.clock().now() + remaining,
                });
            }
            return Err(WizardError::RateLimited { remaining });
        }

        let errors = self.validate_current_step();
        if !errors.is_empty() {
            self.errors = errors.clone();
            return Err(WizardError::Validation {
                step: self.step,
                errors,
            });
        }

        info!(
            email = %self.record.personal_info.email,
            region = ?self.record.personal_info.region,
            status = ?self.record.eligibility_info.status,
            documents = ?self.record.document_info.file_names(),
            "registration submitted"
        );

        if let Err(err) = self.store.remove_item(DRAFT_STORAGE_KEY) {
            warn!(error = %err, "failed to discard submitted draft");
        }
        self.errors.clear();
        self.step = WizardStep::Submitted;
        Ok(self.record.clone())
    }

    /// Re-check the lockout against the clock, dropping it once the deadline has passed.
    /// Returns whether the lockout is still active.
    pub fn tick_rate_limit(&mut self) -> bool {
        if self.rate_limit_remaining().is_some() {
            return true;
        }
        self.hold = None;
        false
    }

    pub fn view(&self) -> WizardView {
        let rate_limit = match self.rate_limit_remaining() {
            Some(remaining) => RateLimitBanner::Active {
                remaining_seconds: whole_seconds(&remaining),
            },
            None => RateLimitBanner::None,
        };

        WizardView {
            step: self.step.index(),
            step_label: self.step.label(),
            total_steps: TOTAL_STEPS,
            record: self.record.clone(),
            errors: self.errors.clone(),
            can_proceed: self.can_proceed(),
            eligibility: eligibility_banner(self.record.eligibility_info.status),
            rate_limit,
            submitted: self.is_submitted(),
        }
    }

    fn ensure_open(&self) -> Result<(), WizardError> {
        if self.is_submitted() {
            Err(WizardError::AlreadySubmitted)
        } else {
            Ok(())
        }
    }

    fn persist_draft(&self) {
        let draft = self.record.draft();
        let saved = serde_json::to_string(&draft)
            .map_err(StorageError::from)
            .and_then(|encoded| self.store.set_item(DRAFT_STORAGE_KEY, &encoded));
        if let Err(err) = saved {
            warn!(error = %err, "failed to persist registration draft");
        }
    }
}
