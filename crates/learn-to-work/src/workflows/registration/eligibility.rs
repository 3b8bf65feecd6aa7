use super::domain::{EligibilityBanner, Field, FieldError, QualificationStatus};

impl QualificationStatus {
    /// The programme targets school leavers without a full SPM pass.
    pub const fn is_eligible(self) -> bool {
        match self {
            QualificationStatus::NotCompleted
            | QualificationStatus::FailedBahasaMelayu
            | QualificationStatus::FailedSejarah => true,
            QualificationStatus::PassedBoth => false,
        }
    }
}

/// Eligibility decision for a raw status code; unknown codes are never eligible.
pub fn is_eligible(status: &str) -> bool {
    QualificationStatus::from_code(status)
        .map(QualificationStatus::is_eligible)
        .unwrap_or(false)
}

/// Error injected into step validation when the selected status rules the applicant out.
/// An unanswered question is left to field validation.
pub fn eligibility_gate(status: Option<QualificationStatus>) -> Option<FieldError> {
    match status {
        Some(status) if !status.is_eligible() => Some(FieldError::new(
            Field::QualificationStatus,
            "You do not meet the eligibility criteria for this program.",
        )),
        _ => None,
    }
}

pub fn eligibility_banner(status: Option<QualificationStatus>) -> EligibilityBanner {
    match status {
        None => EligibilityBanner::None,
        Some(status) if status.is_eligible() => EligibilityBanner::Eligible,
        Some(_) => EligibilityBanner::Ineligible,
    }
}
