use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of interactive steps an applicant walks through before submitting.
pub const TOTAL_STEPS: u8 = 4;

/// Working state of a registration while the wizard is mounted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    pub personal_info: PersonalInfo,
    pub eligibility_info: EligibilityInfo,
    pub document_info: DocumentSet,
    pub declaration: bool,
}

impl ApplicationRecord {
    /// Subset of the record that survives a page reload.
    pub fn draft(&self) -> PersistedDraft {
        PersistedDraft {
            personal_info: self.personal_info.clone(),
            eligibility_info: self.eligibility_info.clone(),
            declaration: self.declaration,
        }
    }

    /// Rehydrate from a stored draft. Documents are never part of a draft and stay empty.
    pub fn from_draft(draft: PersistedDraft) -> Self {
        Self {
            personal_info: draft.personal_info,
            eligibility_info: draft.eligibility_info,
            document_info: DocumentSet::default(),
            declaration: draft.declaration,
        }
    }
}

/// Applicant contact and identity details collected on the first step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    pub full_name: String,
    #[serde(rename = "icNumber")]
    pub national_id: String,
    pub email: String,
    pub phone_number: String,
    pub age: Option<u8>,
    pub gender: Option<Gender>,
    #[serde(rename = "location")]
    pub region: Option<Region>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gender {
    Male,
    Female,
    PreferNotToSay,
}

/// Malaysian states and federal territories offered in the location picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    Johor,
    Kedah,
    Kelantan,
    Malacca,
    #[serde(rename = "Negeri Sembilan")]
    NegeriSembilan,
    Pahang,
    Penang,
    Perak,
    Perlis,
    Sabah,
    Sarawak,
    Selangor,
    Terengganu,
    #[serde(rename = "Federal Territory of Kuala Lumpur")]
    KualaLumpur,
    #[serde(rename = "Federal Territory of Labuan")]
    Labuan,
    #[serde(rename = "Federal Territory of Putrajaya")]
    Putrajaya,
}

impl Region {
    pub const ALL: [Region; 16] = [
        Region::Johor,
        Region::Kedah,
        Region::Kelantan,
        Region::Malacca,
        Region::NegeriSembilan,
        Region::Pahang,
        Region::Penang,
        Region::Perak,
        Region::Perlis,
        Region::Sabah,
        Region::Sarawak,
        Region::Selangor,
        Region::Terengganu,
        Region::KualaLumpur,
        Region::Labuan,
        Region::Putrajaya,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Region::Johor => "Johor",
            Region::Kedah => "Kedah",
            Region::Kelantan => "Kelantan",
            Region::Malacca => "Malacca",
            Region::NegeriSembilan => "Negeri Sembilan",
            Region::Pahang => "Pahang",
            Region::Penang => "Penang",
            Region::Perak => "Perak",
            Region::Perlis => "Perlis",
            Region::Sabah => "Sabah",
            Region::Sarawak => "Sarawak",
            Region::Selangor => "Selangor",
            Region::Terengganu => "Terengganu",
            Region::KualaLumpur => "Federal Territory of Kuala Lumpur",
            Region::Labuan => "Federal Territory of Labuan",
            Region::Putrajaya => "Federal Territory of Putrajaya",
        }
    }
}

/// Answers gathered on the eligibility step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EligibilityInfo {
    #[serde(rename = "spmStatus")]
    pub status: Option<QualificationStatus>,
    pub full_time_training: bool,
    pub industrial_training: bool,
    pub work_commitment: bool,
}

/// SPM (secondary school certificate) outcome declared by the applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QualificationStatus {
    NotCompleted,
    #[serde(rename = "failed-bm")]
    FailedBahasaMelayu,
    FailedSejarah,
    PassedBoth,
}

impl QualificationStatus {
    pub const fn code(self) -> &'static str {
        match self {
            QualificationStatus::NotCompleted => "not-completed",
            QualificationStatus::FailedBahasaMelayu => "failed-bm",
            QualificationStatus::FailedSejarah => "failed-sejarah",
            QualificationStatus::PassedBoth => "passed-both",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "not-completed" => Some(QualificationStatus::NotCompleted),
            "failed-bm" => Some(QualificationStatus::FailedBahasaMelayu),
            "failed-sejarah" => Some(QualificationStatus::FailedSejarah),
            "passed-both" => Some(QualificationStatus::PassedBoth),
            _ => None,
        }
    }
}

/// Metadata describing a file the applicant picked for upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    pub size: u64,
    /// MIME type declared by the client, not sniffed from content.
    #[serde(rename = "type")]
    pub content_type: String,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, size: u64, content_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            content_type: content_type.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSet {
    #[serde(rename = "icFile")]
    pub identity_document: Option<UploadedFile>,
    #[serde(rename = "resumeFile")]
    pub resume: Option<UploadedFile>,
    #[serde(rename = "supportingFile")]
    pub supporting_proof: Option<UploadedFile>,
}

impl DocumentSet {
    pub fn slot(&self, slot: DocumentSlot) -> Option<&UploadedFile> {
        match slot {
            DocumentSlot::IdentityDocument => self.identity_document.as_ref(),
            DocumentSlot::Resume => self.resume.as_ref(),
            DocumentSlot::SupportingProof => self.supporting_proof.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, slot: DocumentSlot) -> &mut Option<UploadedFile> {
        match slot {
            DocumentSlot::IdentityDocument => &mut self.identity_document,
            DocumentSlot::Resume => &mut self.resume,
            DocumentSlot::SupportingProof => &mut self.supporting_proof,
        }
    }

    pub fn file_names(&self) -> Vec<&str> {
        DocumentSlot::ALL
            .iter()
            .filter_map(|slot| self.slot(*slot).map(|file| file.name.as_str()))
            .collect()
    }
}

/// Upload slots on the document step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentSlot {
    #[serde(rename = "icFile")]
    IdentityDocument,
    #[serde(rename = "resumeFile")]
    Resume,
    #[serde(rename = "supportingFile")]
    SupportingProof,
}

impl DocumentSlot {
    pub const ALL: [DocumentSlot; 3] = [
        DocumentSlot::IdentityDocument,
        DocumentSlot::Resume,
        DocumentSlot::SupportingProof,
    ];

    /// Extensions accepted by the upload control for this slot.
    pub const fn accepted_extensions(self) -> &'static [&'static str] {
        match self {
            DocumentSlot::IdentityDocument | DocumentSlot::SupportingProof => {
                &[".pdf", ".jpg", ".jpeg", ".png"]
            }
            DocumentSlot::Resume => &[".pdf", ".doc", ".docx"],
        }
    }

    pub const fn field(self) -> Field {
        match self {
            DocumentSlot::IdentityDocument => Field::IdentityDocument,
            DocumentSlot::Resume => Field::Resume,
            DocumentSlot::SupportingProof => Field::SupportingProof,
        }
    }

    pub fn from_field_name(name: &str) -> Option<Self> {
        match name {
            "icFile" => Some(DocumentSlot::IdentityDocument),
            "resumeFile" => Some(DocumentSlot::Resume),
            "supportingFile" => Some(DocumentSlot::SupportingProof),
            _ => None,
        }
    }
}

/// The reload-surviving part of an application, stored as JSON between page loads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedDraft {
    pub personal_info: PersonalInfo,
    pub eligibility_info: EligibilityInfo,
    pub declaration: bool,
}

/// Single field edit coming from the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum FieldEdit {
    FullName(String),
    #[serde(rename = "icNumber")]
    NationalId(String),
    Email(String),
    PhoneNumber(String),
    Age(Option<u8>),
    Gender(Option<Gender>),
    #[serde(rename = "location")]
    Region(Option<Region>),
    #[serde(rename = "spmStatus")]
    QualificationStatus(Option<QualificationStatus>),
    FullTimeTraining(bool),
    IndustrialTraining(bool),
    WorkCommitment(bool),
    Declaration(bool),
}

/// Form fields that validation errors can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "fullName")]
    FullName,
    #[serde(rename = "icNumber")]
    NationalId,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "phoneNumber")]
    PhoneNumber,
    #[serde(rename = "age")]
    Age,
    #[serde(rename = "gender")]
    Gender,
    #[serde(rename = "location")]
    Region,
    #[serde(rename = "spmStatus")]
    QualificationStatus,
    #[serde(rename = "icFile")]
    IdentityDocument,
    #[serde(rename = "resumeFile")]
    Resume,
    #[serde(rename = "supportingFile")]
    SupportingProof,
    #[serde(rename = "declaration")]
    Declaration,
}

impl Field {
    pub const fn name(self) -> &'static str {
        match self {
            Field::FullName => "fullName",
            Field::NationalId => "icNumber",
            Field::Email => "email",
            Field::PhoneNumber => "phoneNumber",
            Field::Age => "age",
            Field::Gender => "gender",
            Field::Region => "location",
            Field::QualificationStatus => "spmStatus",
            Field::IdentityDocument => "icFile",
            Field::Resume => "resumeFile",
            Field::SupportingProof => "supportingFile",
            Field::Declaration => "declaration",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Validation failure tagged with the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

impl FieldError {
    pub fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Position of the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    PersonalInfo,
    Eligibility,
    Documents,
    Declaration,
    Submitted,
}

impl WizardStep {
    /// One-based index as shown on the progress bar. `Submitted` sits past the last step.
    pub const fn index(self) -> u8 {
        match self {
            WizardStep::PersonalInfo => 1,
            WizardStep::Eligibility => 2,
            WizardStep::Documents => 3,
            WizardStep::Declaration => 4,
            WizardStep::Submitted => TOTAL_STEPS + 1,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            WizardStep::PersonalInfo => "Personal Information",
            WizardStep::Eligibility => "Eligibility Check",
            WizardStep::Documents => "Document Upload",
            WizardStep::Declaration => "Declaration",
            WizardStep::Submitted => "Submitted",
        }
    }

    pub(crate) const fn following(self) -> Option<Self> {
        match self {
            WizardStep::PersonalInfo => Some(WizardStep::Eligibility),
            WizardStep::Eligibility => Some(WizardStep::Documents),
            WizardStep::Documents => Some(WizardStep::Declaration),
            WizardStep::Declaration | WizardStep::Submitted => None,
        }
    }

    pub(crate) const fn preceding(self) -> Option<Self> {
        match self {
            WizardStep::Eligibility => Some(WizardStep::PersonalInfo),
            WizardStep::Documents => Some(WizardStep::Eligibility),
            WizardStep::Declaration => Some(WizardStep::Documents),
            WizardStep::PersonalInfo | WizardStep::Submitted => None,
        }
    }
}

/// Eligibility notice shown next to the qualification question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityBanner {
    None,
    Eligible,
    Ineligible,
}

/// Lockout notice shown while submissions are throttled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RateLimitBanner {
    None,
    Active { remaining_seconds: u64 },
}

/// Everything the form needs to render the current state of the wizard.
#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub step: u8,
    pub step_label: &'static str,
    pub total_steps: u8,
    pub record: ApplicationRecord,
    pub errors: Vec<FieldError>,
    pub can_proceed: bool,
    pub eligibility: EligibilityBanner,
    pub rate_limit: RateLimitBanner,
    pub submitted: bool,
}
