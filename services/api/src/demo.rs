use crate::infra::{uploaded_file_from_path, InMemorySessionStorage};
use clap::Args;
use learn_to_work::error::AppError;
use learn_to_work::workflows::registration::{
    format_file_size, Clock, DocumentSlot, EligibilityBanner, FieldEdit, Gender, ManualClock,
    QualificationStatus, RateLimitPolicy, RateLimiter, Region, RegistrationService,
    RegistrationServiceError, SessionId, UploadedFile, WizardError, WizardView,
};
use std::path::PathBuf;
use std::sync::Arc;

const DEMO_EMAIL: &str = "nurul.huda@example.my";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// IC scan to attach (pdf, jpg, jpeg or png). A placeholder is used when omitted.
    #[arg(long)]
    pub(crate) identity_document: Option<PathBuf>,
    /// Resume to attach (pdf, doc or docx). A placeholder is used when omitted.
    #[arg(long)]
    pub(crate) resume: Option<PathBuf>,
    /// Supporting proof to attach (pdf, jpg, jpeg or png). A placeholder is used when omitted.
    #[arg(long)]
    pub(crate) supporting_proof: Option<PathBuf>,
    /// SPM status to declare: not-completed, failed-bm, failed-sejarah (default) or passed-both.
    #[arg(long, value_parser = parse_status)]
    pub(crate) spm_status: Option<QualificationStatus>,
    /// Skip the repeated-submission portion of the demo.
    #[arg(long)]
    pub(crate) skip_burst: bool,
}

fn parse_status(raw: &str) -> Result<QualificationStatus, String> {
    QualificationStatus::from_code(raw.trim()).ok_or_else(|| {
        format!("unknown SPM status '{raw}' (expected not-completed, failed-bm, failed-sejarah or passed-both)")
    })
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let documents = demo_documents(&args)?;
    let spm_status = args
        .spm_status
        .unwrap_or(QualificationStatus::FailedSejarah);

    let clock = Arc::new(ManualClock::default());
    let shared_clock: Arc<dyn Clock> = clock.clone();
    let limiter = Arc::new(RateLimiter::new(
        RateLimitPolicy::default(),
        shared_clock.clone(),
    ));
    let service = RegistrationService::<InMemorySessionStorage>::new(
        limiter.clone(),
        shared_clock,
        chrono::Duration::minutes(60),
    );

    println!("Learn To Work registration demo");
    let (session, view) = service.open_session();
    print_view(&session, &view);

    match service.next(&session) {
        Err(RegistrationServiceError::Wizard(WizardError::Validation { errors, .. })) => {
            println!("- Empty form refused with {} field errors:", errors.len());
            for error in errors.iter().take(3) {
                println!("    {}: {}", error.field, error.message);
            }
        }
        other => println!("- Unexpected result for empty form: {other:?}"),
    }

    fill_personal_info(&service, &session)?;
    print_view(&session, &service.next(&session)?);

    fill_eligibility(&service, &session, spm_status)?;
    let view = service.view(&session)?;
    if view.eligibility == EligibilityBanner::Ineligible {
        println!(
            "- SPM status '{}' is not eligible; the wizard stays on step {}",
            spm_status.code(),
            view.step
        );
        if let Err(err) = service.next(&session) {
            println!("  Next refused: {err}");
        }
        return Ok(());
    }
    print_view(&session, &service.next(&session)?);

    attach_documents(&service, &session, &documents)?;
    print_view(&session, &service.next(&session)?);
    service.apply(&session, FieldEdit::Declaration(true))?;

    println!("\nSimulating a page reload");
    let reloaded = service.reload(&session)?;
    print_view(&session, &reloaded);
    println!(
        "  Restored {} / {} / declaration={} with {} documents attached",
        reloaded.record.personal_info.full_name,
        reloaded.record.personal_info.email,
        reloaded.record.declaration,
        reloaded.record.document_info.file_names().len()
    );

    service.next(&session)?;
    service.next(&session)?;
    attach_documents(&service, &session, &documents)?;
    service.next(&session)?;

    let application = service.submit(&session)?;
    println!("\nApplication submitted");
    println!(
        "- {} ({}) from {}",
        application.personal_info.full_name,
        application.personal_info.email,
        application
            .personal_info
            .region
            .map(Region::label)
            .unwrap_or("unknown region")
    );
    for slot in DocumentSlot::ALL {
        if let Some(file) = application.document_info.slot(slot) {
            println!(
                "  {}: {} ({}, {})",
                slot.field(),
                file.name,
                format_file_size(file.size),
                file.content_type
            );
        }
    }
    service.close(&session);

    if args.skip_burst {
        return Ok(());
    }

    println!("\nRepeated submissions for {DEMO_EMAIL}");
    for attempt in 2..=4 {
        let (session, _) = service.open_session();
        fill_personal_info(&service, &session)?;
        service.next(&session)?;
        fill_eligibility(&service, &session, spm_status)?;
        service.next(&session)?;
        attach_documents(&service, &session, &documents)?;
        service.next(&session)?;
        service.apply(&session, FieldEdit::Declaration(true))?;

        match service.submit(&session) {
            Ok(_) => println!("- Attempt {attempt}: accepted"),
            Err(err) => {
                println!("- Attempt {attempt}: {err}");
                if let Ok(view) = service.view(&session) {
                    println!("  Lockout banner: {:?}", view.rate_limit);
                }
            }
        }
        service.close(&session);
    }

    clock.advance(chrono::Duration::minutes(30));
    println!(
        "- After 30 minutes: {}s of lockout remain",
        limiter.remaining_time(DEMO_EMAIL).num_seconds()
    );

    Ok(())
}

fn demo_documents(args: &DemoArgs) -> Result<Vec<(DocumentSlot, UploadedFile)>, AppError> {
    let provided = [
        (DocumentSlot::IdentityDocument, &args.identity_document),
        (DocumentSlot::Resume, &args.resume),
        (DocumentSlot::SupportingProof, &args.supporting_proof),
    ];

    provided
        .into_iter()
        .map(|(slot, path)| {
            let file = match path {
                Some(path) => uploaded_file_from_path(path)?,
                None => placeholder_document(slot),
            };
            Ok((slot, file))
        })
        .collect()
}

fn placeholder_document(slot: DocumentSlot) -> UploadedFile {
    match slot {
        DocumentSlot::IdentityDocument => {
            UploadedFile::new("mykad-front.jpg", 845_312, "image/jpeg")
        }
        DocumentSlot::Resume => UploadedFile::new("resume.pdf", 156_004, "application/pdf"),
        DocumentSlot::SupportingProof => {
            UploadedFile::new("spm-result-slip.png", 1_482_113, "image/png")
        }
    }
}

fn fill_personal_info(
    service: &RegistrationService<InMemorySessionStorage>,
    session: &SessionId,
) -> Result<(), AppError> {
    let edits = [
        FieldEdit::FullName("Nurul Huda binti Rahman".to_string()),
        FieldEdit::NationalId("040817-08-6224".to_string()),
        FieldEdit::Email(DEMO_EMAIL.to_string()),
        FieldEdit::PhoneNumber("+6012-555 0199".to_string()),
        FieldEdit::Age(Some(19)),
        FieldEdit::Gender(Some(Gender::Female)),
        FieldEdit::Region(Some(Region::Perak)),
    ];
    for edit in edits {
        service.apply(session, edit)?;
    }
    Ok(())
}

fn fill_eligibility(
    service: &RegistrationService<InMemorySessionStorage>,
    session: &SessionId,
    status: QualificationStatus,
) -> Result<(), AppError> {
    let edits = [
        FieldEdit::QualificationStatus(Some(status)),
        FieldEdit::FullTimeTraining(true),
        FieldEdit::IndustrialTraining(true),
        FieldEdit::WorkCommitment(true),
    ];
    for edit in edits {
        service.apply(session, edit)?;
    }
    Ok(())
}

fn attach_documents(
    service: &RegistrationService<InMemorySessionStorage>,
    session: &SessionId,
    documents: &[(DocumentSlot, UploadedFile)],
) -> Result<(), AppError> {
    for (slot, file) in documents {
        service.select_document(session, *slot, Some(file.clone()))?;
    }
    Ok(())
}

fn print_view(session: &SessionId, view: &WizardView) {
    println!(
        "- [{session}] step {}/{}: {}",
        view.step, view.total_steps, view.step_label
    );
}
