use crate::infra::{InMemoryReviewNotifier, InMemoryVisaRepository};
use clap::Args;
use std::sync::Arc;
use visa_track::error::AppError;
use visa_track::workflows::visa::{
    DocumentPolicy, DocumentStep, DocumentUpload, EmployeeId, ReviewDecision, StepPermission,
    VisaDocumentService, VisaStatusView,
};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Employee identifier used for the walkthrough
    #[arg(long, default_value = "emp-0001")]
    pub(crate) employee: String,
    /// Skip the rejection/re-upload detour and approve every step directly
    #[arg(long)]
    pub(crate) happy_path_only: bool,
}

type DemoService = VisaDocumentService<InMemoryVisaRepository, InMemoryReviewNotifier>;

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let repository = Arc::new(InMemoryVisaRepository::default());
    let notifier = Arc::new(InMemoryReviewNotifier::default());
    let service = VisaDocumentService::new(
        repository,
        notifier.clone(),
        DocumentPolicy::default(),
    );

    let employee = EmployeeId(args.employee.clone());

    println!("Visa onboarding demo");
    println!("Employee: {}", employee.0);
    println!(
        "Generated: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M")
    );

    let view = service.status(&employee).map_err(AppError::Workflow)?;
    println!("\nBefore any upload");
    render_permissions(&view.steps);

    for (index, step) in DocumentStep::SEQUENCE.into_iter().enumerate() {
        println!("\n== Step {}: {} ==", index + 1, step.label());

        if !args.happy_path_only && step == DocumentStep::OptEad {
            submit(&service, &employee, step, "opt-ead-blurry.pdf")?;
            let view = service
                .review(
                    employee.clone(),
                    step,
                    ReviewDecision::Rejected,
                    Some("Scan is unreadable, please re-export the PDF.".to_string()),
                )
                .map_err(AppError::Workflow)?;
            println!("HR rejected the submission:");
            render_permissions(&view.steps);
        }

        submit(&service, &employee, step, &format!("{}.pdf", step.key()))?;
        let view = service
            .review(employee.clone(), step, ReviewDecision::Approved, None)
            .map_err(AppError::Workflow)?;
        println!("HR approved. Next action: {}", view.next_action);
    }

    let view = service.status(&employee).map_err(AppError::Workflow)?;
    render_summary(&view);

    println!("\nNotifications sent");
    for notice in notifier.notices() {
        println!(
            "- to {} from {}: {} {} ({})",
            notice.employee_id.0,
            notice.sender,
            notice.step.label(),
            notice.decision.label(),
            notice.next_action
        );
    }

    let roster = service.roster().map_err(AppError::Workflow)?;
    println!(
        "\nRoster: {} in progress, {} complete",
        roster.in_progress.len(),
        roster.complete.len()
    );

    Ok(())
}

fn submit(
    service: &DemoService,
    employee: &EmployeeId,
    step: DocumentStep,
    file_name: &str,
) -> Result<(), AppError> {
    let content_type = mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    let view = service
        .upload(
            employee.clone(),
            step,
            DocumentUpload {
                file_name: file_name.to_string(),
                content_type,
                size_bytes: 256 * 1024,
                url: format!("s3://onboarding-docs/{}/{file_name}", employee.0),
            },
        )
        .map_err(AppError::Workflow)?;

    println!("Uploaded {file_name}. Next action: {}", view.next_action);
    Ok(())
}

fn render_permissions(steps: &[StepPermission]) {
    for permission in steps {
        let verdict = if permission.can_upload {
            "upload open"
        } else {
            "blocked"
        };
        println!(
            "- {} [{}]: {} ({})",
            permission.step.label(),
            permission.status,
            verdict,
            permission.reason
        );
        if let Some(document) = &permission.document {
            println!(
                "  document: {} (uploaded {})",
                document.url,
                document.uploaded_at.format("%Y-%m-%d %H:%M UTC")
            );
        }
        if let Some(feedback) = &permission.feedback {
            println!("  feedback: {feedback}");
        }
    }
}

fn render_summary(view: &VisaStatusView) {
    println!("\nFinal state");
    match &view.current_step {
        Some(step) => println!("Current step: {}", step.label()),
        None => println!("All documents approved"),
    }
    println!("Next action: {}", view.next_action);
    render_permissions(&view.steps);
}
