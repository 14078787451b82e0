use serde::Serialize;

use super::TemplateChoice;
use crate::error::AppError;

/// Where a submission sits in the approval lifecycle. Derived from the stored
/// record; `Approved` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ApprovalStatus {
    Submitted,
    PaymentPending,
    Approved,
}

impl ApprovalStatus {
    pub fn derive(template: TemplateChoice, is_approved: bool, has_payment_proof: bool) -> Self {
        if is_approved {
            ApprovalStatus::Approved
        } else if !template.is_free() && !has_payment_proof {
            ApprovalStatus::PaymentPending
        } else {
            ApprovalStatus::Submitted
        }
    }

    /// Free submissions skip review entirely.
    pub fn approved_on_create(template: TemplateChoice) -> bool {
        template.is_free()
    }

    /// Gate for rendering, export and link verification.
    pub fn require_approved(self) -> Result<(), AppError> {
        match self {
            ApprovalStatus::Approved => Ok(()),
            ApprovalStatus::Submitted | ApprovalStatus::PaymentPending => {
                Err(AppError::Forbidden("Biodata not approved yet".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_tier_is_approved_at_creation() {
        assert!(ApprovalStatus::approved_on_create(TemplateChoice::Free));
        assert!(!ApprovalStatus::approved_on_create(TemplateChoice::Royal));
    }

    #[test]
    fn paid_tier_waits_for_payment_then_review() {
        assert_eq!(
            ApprovalStatus::derive(TemplateChoice::Royal, false, false),
            ApprovalStatus::PaymentPending
        );
        assert_eq!(
            ApprovalStatus::derive(TemplateChoice::Royal, false, true),
            ApprovalStatus::Submitted
        );
        assert_eq!(
            ApprovalStatus::derive(TemplateChoice::Royal, true, true),
            ApprovalStatus::Approved
        );
    }

    #[test]
    fn only_approved_passes_the_gate() {
        assert!(ApprovalStatus::Approved.require_approved().is_ok());
        assert!(matches!(
            ApprovalStatus::PaymentPending.require_approved(),
            Err(AppError::Forbidden(_))
        ));
        assert!(ApprovalStatus::Submitted.require_approved().is_err());
    }
}
