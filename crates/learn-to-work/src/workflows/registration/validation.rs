use mime::Mime;
use regex::Regex;
use std::sync::LazyLock;

use super::domain::{
    DocumentSet, DocumentSlot, EligibilityInfo, Field, FieldError, PersonalInfo, UploadedFile,
};
use super::sanitizer;

/// Upload ceiling applied to every document slot.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const MIN_AGE: u8 = 18;
pub const MAX_AGE: u8 = 25;

const MSWORD: &str = "application/msword";
const OOXML_DOCUMENT: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const DANGEROUS_EMAIL_FRAGMENTS: [&str; 7] = [
    "javascript:",
    "data:",
    "vbscript:",
    "onload",
    "onerror",
    "<script",
    "eval(",
];

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern compiles")
});

static PHONE_DISALLOWED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9+\-\s()]").expect("phone filter compiles"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s").expect("whitespace pattern compiles"));

static MALAYSIAN_MOBILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+?6?01)[0-46-9]-*[0-9]{7,8}$").expect("mobile pattern compiles")
});

static IC_DISALLOWED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9\-]").expect("ic filter compiles"));

static IC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{6}-[0-9]{2}-[0-9]{4}$").expect("ic pattern compiles"));

static FULL_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z\s@/.',-]+$").expect("name pattern compiles"));

/// Email check that refuses script-ish payloads before applying the address grammar.
pub fn is_valid_email(email: &str) -> bool {
    let lowered = email.to_lowercase();
    if DANGEROUS_EMAIL_FRAGMENTS
        .iter()
        .any(|fragment| lowered.contains(fragment))
    {
        return false;
    }

    let length = email.chars().count();
    EMAIL_RE.is_match(email) && (5..=254).contains(&length)
}

/// Malaysian mobile number, tolerant of spaces and dashes.
pub fn is_valid_phone_number(phone: &str) -> bool {
    let cleaned = PHONE_DISALLOWED_RE.replace_all(phone, "");
    let compact = WHITESPACE_RE.replace_all(&cleaned, "");
    MALAYSIAN_MOBILE_RE.is_match(&compact)
}

/// NRIC in the dashed `XXXXXX-XX-XXXX` form.
pub fn is_valid_ic_number(ic: &str) -> bool {
    let cleaned = IC_DISALLOWED_RE.replace_all(ic, "");
    IC_RE.is_match(&cleaned)
}

/// Reasons an upload is refused before it reaches a document slot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileRejection {
    #[error("File size exceeds {} limit", limit_label(.limit))]
    TooLarge { size: u64, limit: u64 },
    #[error("File type not allowed. Accepted types: {accepted}")]
    TypeNotAllowed { accepted: String },
    #[error("File type mismatch detected")]
    TypeMismatch { expected: String, declared: String },
}

/// Check size, extension whitelist and declared MIME type of an upload.
///
/// The MIME cross-check only covers extensions in the known table; anything else passes it.
pub fn validate_file(
    file: &UploadedFile,
    allowed_extensions: &[&str],
    max_size: u64,
) -> Result<(), FileRejection> {
    if file.size > max_size {
        return Err(FileRejection::TooLarge {
            size: file.size,
            limit: max_size,
        });
    }

    let extension = extension_of(&file.name);
    let dotted = format!(".{extension}");
    let allowed = allowed_extensions
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(&dotted));
    if extension.is_empty() || !allowed {
        return Err(FileRejection::TypeNotAllowed {
            accepted: allowed_extensions.join(", "),
        });
    }

    if let Some(expected) = expected_mime(&extension) {
        if !validate_file_type(file) {
            return Err(FileRejection::TypeMismatch {
                expected: expected.essence_str().to_string(),
                declared: file.content_type.clone(),
            });
        }
    }

    Ok(())
}

/// Reverse check: the declared MIME type must list the file's extension. `validate_file` relies
/// on it for the MIME cross-check.
pub fn validate_file_type(file: &UploadedFile) -> bool {
    let Ok(declared) = file.content_type.parse::<Mime>() else {
        return false;
    };
    let extension = extension_of(&file.name);
    let allowed: &[&str] = match declared.essence_str() {
        "application/pdf" => &["pdf"],
        MSWORD => &["doc"],
        OOXML_DOCUMENT => &["docx"],
        "image/jpeg" => &["jpg", "jpeg"],
        "image/png" => &["png"],
        _ => &[],
    };
    allowed.contains(&extension.as_str())
}

fn limit_label(limit: &u64) -> String {
    format_file_size(*limit)
}

fn extension_of(name: &str) -> String {
    name.rsplit('.').next().unwrap_or_default().to_ascii_lowercase()
}

fn expected_mime(extension: &str) -> Option<Mime> {
    match extension {
        "pdf" => Some(mime::APPLICATION_PDF),
        "jpg" | "jpeg" => Some(mime::IMAGE_JPEG),
        "png" => Some(mime::IMAGE_PNG),
        "doc" => MSWORD.parse().ok(),
        "docx" => OOXML_DOCUMENT.parse().ok(),
        _ => None,
    }
}

/// Human readable byte count, e.g. `1.5 MB`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}

pub fn validate_personal_info(data: &PersonalInfo) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let name_length = data.full_name.chars().count();
    if data.full_name.trim().is_empty() {
        errors.push(FieldError::new(Field::FullName, "Full name is required"));
    } else if !(2..=100).contains(&name_length) {
        errors.push(FieldError::new(
            Field::FullName,
            "Full name must be between 2 and 100 characters",
        ));
    } else if !FULL_NAME_RE.is_match(&data.full_name) {
        errors.push(FieldError::new(
            Field::FullName,
            "Full name contains invalid characters",
        ));
    } else if !sanitizer::is_clean(&data.full_name) {
        errors.push(FieldError::new(
            Field::FullName,
            "Full name contains potentially harmful content",
        ));
    }

    if data.national_id.trim().is_empty() {
        errors.push(FieldError::new(Field::NationalId, "IC number is required"));
    } else if !is_valid_ic_number(&data.national_id) {
        errors.push(FieldError::new(
            Field::NationalId,
            "IC number format should be XXXXXX-XX-XXXX",
        ));
    } else if !sanitizer::is_clean(&data.national_id) {
        errors.push(FieldError::new(
            Field::NationalId,
            "IC number contains potentially harmful content",
        ));
    }

    if data.email.trim().is_empty() {
        errors.push(FieldError::new(Field::Email, "Email address is required"));
    } else if !is_valid_email(&data.email) {
        errors.push(FieldError::new(
            Field::Email,
            "Please enter a valid email address",
        ));
    } else if !sanitizer::is_clean(&data.email) {
        errors.push(FieldError::new(
            Field::Email,
            "Email contains potentially harmful content",
        ));
    }

    if data.phone_number.trim().is_empty() {
        errors.push(FieldError::new(
            Field::PhoneNumber,
            "Phone number is required",
        ));
    } else if !is_valid_phone_number(&data.phone_number) {
        errors.push(FieldError::new(
            Field::PhoneNumber,
            "Please enter a valid Malaysian phone number",
        ));
    } else if !sanitizer::is_clean(&data.phone_number) {
        errors.push(FieldError::new(
            Field::PhoneNumber,
            "Phone number contains potentially harmful content",
        ));
    }

    match data.age {
        Some(age) if (MIN_AGE..=MAX_AGE).contains(&age) => {}
        _ => errors.push(FieldError::new(
            Field::Age,
            "Age must be between 18 and 25 years old",
        )),
    }

    if data.gender.is_none() {
        errors.push(FieldError::new(
            Field::Gender,
            "Please select a valid gender option",
        ));
    }

    if data.region.is_none() {
        errors.push(FieldError::new(
            Field::Region,
            "Please select your current location",
        ));
    }

    errors
}

/// Field-level checks for the eligibility step. The eligibility gate itself lives in
/// [`super::eligibility`].
pub fn validate_eligibility(data: &EligibilityInfo) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if data.status.is_none() {
        errors.push(FieldError::new(
            Field::QualificationStatus,
            "Please select a valid SPM status",
        ));
    }
    errors
}

pub fn validate_documents(documents: &DocumentSet) -> Vec<FieldError> {
    let mut errors = Vec::new();

    for slot in DocumentSlot::ALL {
        match documents.slot(slot) {
            None => errors.push(FieldError::new(slot.field(), missing_document_message(slot))),
            Some(file) => {
                if let Err(rejection) =
                    validate_file(file, slot.accepted_extensions(), MAX_UPLOAD_BYTES)
                {
                    errors.push(FieldError::new(slot.field(), rejection.to_string()));
                }
            }
        }
    }

    errors
}

pub fn validate_declaration(accepted: bool) -> Vec<FieldError> {
    if accepted {
        Vec::new()
    } else {
        vec![FieldError::new(
            Field::Declaration,
            "You must agree to the declaration to proceed",
        )]
    }
}

fn missing_document_message(slot: DocumentSlot) -> &'static str {
    match slot {
        DocumentSlot::IdentityDocument => "IC document is required",
        DocumentSlot::Resume => "Resume is required",
        DocumentSlot::SupportingProof => "Supporting document is required",
    }
}
