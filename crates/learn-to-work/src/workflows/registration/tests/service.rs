use super::common::*;
use chrono::Duration;

use crate::workflows::registration::domain::{FieldEdit, RateLimitBanner};
use crate::workflows::registration::service::{RegistrationServiceError, SessionId};
use crate::workflows::registration::wizard::WizardError;

#[test]
fn sessions_get_distinct_ids_and_start_on_step_one() {
    let (service, _clock) = build_service();
    let (first, view) = service.open_session();
    let (second, _) = service.open_session();

    assert_ne!(first, second);
    assert!(first.0.starts_with("reg-"));
    assert_eq!(view.step, 1);
    assert_eq!(view.total_steps, 4);
    assert_eq!(service.session_count(), 2);
}

#[test]
fn unknown_sessions_are_reported() {
    let (service, _clock) = build_service();
    let missing = SessionId("reg-missing".to_string());

    assert!(matches!(
        service.view(&missing),
        Err(RegistrationServiceError::UnknownSession(_))
    ));
    assert!(matches!(
        service.reload(&missing),
        Err(RegistrationServiceError::UnknownSession(_))
    ));
    assert!(!service.close(&missing));
}

#[test]
fn reload_restores_draft_and_resets_position() {
    let (service, _clock) = build_service();
    let (id, _) = service.open_session();
    for edit in personal_edits() {
        service.apply(&id, edit).expect("edit applied");
    }
    let view = service.next(&id).expect("advanced");
    assert_eq!(view.step, 2);

    let reloaded = service.reload(&id).expect("reloaded");
    assert_eq!(reloaded.step, 1);
    assert_eq!(reloaded.record.personal_info.email, EMAIL);
    assert!(reloaded.errors.is_empty());
}

#[test]
fn sessions_do_not_share_storage() {
    let (service, _clock) = build_service();
    let (first, _) = service.open_session();
    let (second, _) = service.open_session();
    service
        .apply(&first, FieldEdit::Email(EMAIL.to_string()))
        .expect("edit applied");

    let other = service.reload(&second).expect("reloaded");
    assert!(other.record.personal_info.email.is_empty());
}

#[test]
fn rate_limiter_is_shared_across_sessions() {
    let (service, clock) = build_service();
    for _ in 0..3 {
        assert!(service.limiter().is_allowed(EMAIL));
    }

    let (id, _) = service.open_session();
    for edit in personal_edits() {
        service.apply(&id, edit).expect("edit applied");
    }
    service.next(&id).expect("personal info");
    for edit in eligibility_edits() {
        service.apply(&id, edit).expect("edit applied");
    }
    service.next(&id).expect("eligibility");
    for (slot, file) in documents() {
        service
            .select_document(&id, slot, Some(file))
            .expect("document accepted");
    }
    service.next(&id).expect("documents");
    service
        .apply(&id, FieldEdit::Declaration(true))
        .expect("edit applied");

    // no tokio runtime here, so no countdown is armed
    assert!(matches!(
        service.submit(&id),
        Err(RegistrationServiceError::Wizard(
            WizardError::RateLimited { .. }
        ))
    ));
    let view = service.view(&id).expect("view");
    assert_eq!(
        view.rate_limit,
        RateLimitBanner::Active {
            remaining_seconds: 1800
        }
    );

    clock.advance(Duration::minutes(31));
    assert_eq!(
        service.view(&id).expect("view").rate_limit,
        RateLimitBanner::None
    );
    service.submit(&id).expect("lockout has lapsed");
}

#[test]
fn successful_submission_returns_the_record() {
    let (service, _clock) = build_service();
    let (id, _) = service.open_session();
    for edit in personal_edits().into_iter().chain(eligibility_edits()) {
        service.apply(&id, edit).expect("edit applied");
    }
    service.next(&id).expect("personal info");
    service.next(&id).expect("eligibility");
    for (slot, file) in documents() {
        service
            .select_document(&id, slot, Some(file))
            .expect("document accepted");
    }
    service.next(&id).expect("documents");
    service
        .apply(&id, FieldEdit::Declaration(true))
        .expect("edit applied");

    let application = service.submit(&id).expect("submitted");
    assert!(application.declaration);
    assert!(service.view(&id).expect("view").submitted);

    let reloaded = service.reload(&id).expect("reloaded");
    assert!(!reloaded.submitted);
    assert!(reloaded.record.personal_info.email.is_empty());
}

#[test]
fn storage_sweep_removes_expired_drafts() {
    let (service, clock) = build_service();
    let (stale, _) = service.open_session();
    service
        .apply(&stale, FieldEdit::Email(EMAIL.to_string()))
        .expect("edit applied");

    clock.advance(Duration::minutes(50));
    let (fresh, _) = service.open_session();
    service
        .apply(&fresh, FieldEdit::Email(EMAIL.to_string()))
        .expect("edit applied");

    clock.advance(Duration::minutes(15));
    assert_eq!(service.cleanup_storage(), 1);
    assert_eq!(
        service.reload(&fresh).expect("reloaded").record.personal_info.email,
        EMAIL
    );
}

#[test]
fn close_tears_down_the_session() {
    let (service, _clock) = build_service();
    let (id, _) = service.open_session();
    assert!(service.close(&id));
    assert_eq!(service.session_count(), 0);
    assert!(matches!(
        service.next(&id),
        Err(RegistrationServiceError::UnknownSession(_))
    ));
}

#[test]
fn idle_and_submitted_sessions_are_expired() {
    let (service, clock) = build_service();
    let idle: Vec<SessionId> = (0..50).map(|_| service.open_session().0).collect();

    clock.advance(Duration::minutes(45));
    let (active, _) = service.open_session();
    let (finished, _) = service.open_session();
    for edit in personal_edits().into_iter().chain(eligibility_edits()) {
        service.apply(&finished, edit).expect("edit applied");
    }
    service.next(&finished).expect("personal info");
    service.next(&finished).expect("eligibility");
    for (slot, file) in documents() {
        service
            .select_document(&finished, slot, Some(file))
            .expect("document accepted");
    }
    service.next(&finished).expect("documents");
    service
        .apply(&finished, FieldEdit::Declaration(true))
        .expect("edit applied");
    service.submit(&finished).expect("submitted");

    clock.advance(Duration::minutes(30));
    service.view(&active).expect("view");
    assert_eq!(service.session_count(), 52);

    assert_eq!(service.expire_sessions(), 51);
    assert_eq!(service.session_count(), 1);
    assert!(service.view(&active).is_ok());
    assert!(matches!(
        service.view(&finished),
        Err(RegistrationServiceError::UnknownSession(_))
    ));
    assert!(matches!(
        service.view(&idle[0]),
        Err(RegistrationServiceError::UnknownSession(_))
    ));
}
