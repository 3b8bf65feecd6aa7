use chrono::Duration;
use learn_to_work::workflows::registration::{
    is_clean, is_eligible, is_valid_email, is_valid_ic_number, is_valid_phone_number, sanitize,
    Clock, DocumentSlot, FieldEdit, Gender, ManualClock, QualificationStatus, RateLimitPolicy,
    RateLimiter, Region, RegistrationWizard, SecureStore, SessionStorage, StorageError,
    UploadedFile, WizardError, WizardStep, DRAFT_STORAGE_KEY,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const EMAIL: &str = "farid.iskandar@example.com";

#[derive(Default)]
struct TabStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl SessionStorage for TabStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().expect("tab storage").get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries
            .lock()
            .expect("tab storage")
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().expect("tab storage").remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self
            .entries
            .lock()
            .expect("tab storage")
            .keys()
            .cloned()
            .collect())
    }
}

struct Tab {
    clock: Arc<ManualClock>,
    limiter: Arc<RateLimiter>,
    storage: Arc<TabStorage>,
}

impl Tab {
    fn open() -> Self {
        let clock = Arc::new(ManualClock::default());
        let shared: Arc<dyn Clock> = clock.clone();
        Self {
            limiter: Arc::new(RateLimiter::new(RateLimitPolicy::default(), shared)),
            clock,
            storage: Arc::new(TabStorage::default()),
        }
    }

    fn mount(&self) -> RegistrationWizard<TabStorage> {
        let clock: Arc<dyn Clock> = self.clock.clone();
        RegistrationWizard::mount(
            self.limiter.clone(),
            SecureStore::new(self.storage.clone(), clock),
        )
    }
}

fn complete_form(wizard: &mut RegistrationWizard<TabStorage>) {
    for edit in [
        FieldEdit::FullName("Farid bin Iskandar".to_string()),
        FieldEdit::NationalId("050203-14-1187".to_string()),
        FieldEdit::Email(EMAIL.to_string()),
        FieldEdit::PhoneNumber("013-278 4410".to_string()),
        FieldEdit::Age(Some(18)),
        FieldEdit::Gender(Some(Gender::Male)),
        FieldEdit::Region(Some(Region::Johor)),
    ] {
        wizard.apply(edit).expect("personal info edit");
    }
    assert_eq!(wizard.next().expect("to eligibility"), WizardStep::Eligibility);

    for edit in [
        FieldEdit::QualificationStatus(Some(QualificationStatus::FailedBahasaMelayu)),
        FieldEdit::FullTimeTraining(true),
        FieldEdit::IndustrialTraining(true),
        FieldEdit::WorkCommitment(true),
    ] {
        wizard.apply(edit).expect("eligibility edit");
    }
    assert_eq!(wizard.next().expect("to documents"), WizardStep::Documents);

    attach_documents(wizard);
    assert_eq!(wizard.next().expect("to declaration"), WizardStep::Declaration);
    wizard
        .apply(FieldEdit::Declaration(true))
        .expect("declaration edit");
}

fn attach_documents(wizard: &mut RegistrationWizard<TabStorage>) {
    let files = [
        (
            DocumentSlot::IdentityDocument,
            UploadedFile::new("ic-front.jpeg", 420_000, "image/jpeg"),
        ),
        (
            DocumentSlot::Resume,
            UploadedFile::new("farid-cv.pdf", 210_500, "application/pdf"),
        ),
        (
            DocumentSlot::SupportingProof,
            UploadedFile::new("spm-slip.pdf", 98_304, "application/pdf"),
        ),
    ];
    for (slot, file) in files {
        wizard.select_document(slot, Some(file)).expect("document accepted");
    }
}

#[test]
fn applicant_completes_all_four_steps() {
    let tab = Tab::open();
    let mut wizard = tab.mount();

    complete_form(&mut wizard);
    let application = wizard.submit().expect("submission accepted");

    assert_eq!(application.personal_info.email, EMAIL);
    assert_eq!(application.document_info.file_names().len(), 3);
    assert!(wizard.is_submitted());
    assert!(
        tab.storage.get(DRAFT_STORAGE_KEY).expect("read").is_none(),
        "draft is cleared after a successful submission"
    );
}

#[test]
fn passing_both_subjects_blocks_the_eligibility_step() {
    let tab = Tab::open();
    let mut wizard = tab.mount();
    complete_form(&mut wizard);

    while wizard.step() != WizardStep::Eligibility {
        wizard.previous().expect("step back");
    }
    wizard
        .apply(FieldEdit::QualificationStatus(Some(
            QualificationStatus::PassedBoth,
        )))
        .expect("status edit");

    assert!(!wizard.can_proceed());
    for _ in 0..3 {
        assert!(matches!(wizard.next(), Err(WizardError::Ineligible)));
        assert_eq!(wizard.step(), WizardStep::Eligibility);
    }
}

#[test]
fn reloading_restores_text_fields_but_not_documents() {
    let tab = Tab::open();
    let mut wizard = tab.mount();
    complete_form(&mut wizard);
    drop(wizard);

    let reloaded = tab.mount();
    assert_eq!(reloaded.step(), WizardStep::PersonalInfo);
    assert_eq!(reloaded.record().personal_info.full_name, "Farid bin Iskandar");
    assert_eq!(
        reloaded.record().eligibility_info.status,
        Some(QualificationStatus::FailedBahasaMelayu)
    );
    assert!(reloaded.record().declaration);
    assert!(reloaded.record().document_info.file_names().is_empty());
}

#[test]
fn fourth_submission_in_the_window_is_locked_out_for_thirty_minutes() {
    let tab = Tab::open();

    for attempt in 1..=3 {
        let mut wizard = tab.mount();
        complete_form(&mut wizard);
        wizard
            .submit()
            .unwrap_or_else(|err| panic!("attempt {attempt} refused: {err}"));
        tab.clock.advance(Duration::minutes(1));
    }

    let mut wizard = tab.mount();
    complete_form(&mut wizard);
    match wizard.submit() {
        Err(WizardError::RateLimited { remaining }) => {
            assert_eq!(remaining, Duration::minutes(30));
        }
        other => panic!("expected lockout, got {other:?}"),
    }
    assert_eq!(wizard.step(), WizardStep::Declaration);
    assert!(wizard.rate_limit_remaining().is_some());

    tab.clock.advance(Duration::minutes(31));
    assert!(tab.limiter.is_allowed(EMAIL));
}

#[test]
fn limiter_admits_three_attempts_then_refuses() {
    let clock = Arc::new(ManualClock::default());
    let limiter = RateLimiter::new(RateLimitPolicy::default(), clock.clone());

    let outcomes: Vec<bool> = (0..4).map(|_| limiter.is_allowed("user@x.com")).collect();
    assert_eq!(outcomes, vec![true, true, true, false]);

    let remaining = limiter.remaining_time("user@x.com");
    assert!(remaining > Duration::minutes(29) && remaining <= Duration::minutes(30));

    clock.advance(Duration::minutes(30) + Duration::seconds(1));
    assert!(limiter.is_allowed("user@x.com"));
}

#[test]
fn sanitizing_twice_changes_nothing() {
    for input in [
        "Robert'); DROP TABLE students;--",
        "<scr<script>ipt>alert(1)</script>",
        "Ahmad OR 1=1",
        "  Siti Nur {Aisyah}  ",
        "Tan Mei Ling",
    ] {
        let once = sanitize(input);
        assert_eq!(sanitize(&once), once, "input {input:?}");
    }
    assert!(is_clean("Tan Mei Ling"));
    assert!(!is_clean("<b>Tan</b>"));
}

#[test]
fn eligibility_follows_spm_outcome() {
    assert!(is_eligible("not-completed"));
    assert!(is_eligible("failed-bm"));
    assert!(is_eligible("failed-sejarah"));
    assert!(!is_eligible("passed-both"));
    assert!(!is_eligible(""));
    assert!(!is_eligible("passed"));
}

#[test]
fn identity_and_contact_formats() {
    assert!(is_valid_ic_number("901231-14-5678"));
    assert!(!is_valid_ic_number("9012311456789"));
    assert!(is_valid_email("applicant@example.com"));
    assert!(!is_valid_email("<script>@x.com"));
    assert!(is_valid_phone_number("+6012-345 6789"));
    assert!(!is_valid_phone_number("0512345678"));
}
