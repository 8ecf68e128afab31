//! One-shot administrative commands

use crate::cli::{CreateStaffArgs, ImportStudentsArgs};
use anyhow::{Context, Result};
use school_service::contract::{IssuedCredential, NewUser};
use school_service::{AttendanceCheck, Role, SchoolServiceModule, StudentRoster};
use std::path::Path;
use std::sync::Arc;

pub async fn create_staff(module: &SchoolServiceModule, args: CreateStaffArgs) -> Result<()> {
    let service = module.service()?;
    let user = service
        .bootstrap_staff(NewUser {
            username: args.username,
            email: args.email,
            password: args.password,
            first_name: args.first_name,
            last_name: args.last_name,
            role: Role::Teacher,
            school_id: None,
            is_staff: true,
        })
        .await
        .context("failed to create staff account")?;

    println!("Created staff account `{}` (id {})", user.username, user.id);
    Ok(())
}

pub async fn import_students(module: &SchoolServiceModule, args: ImportStudentsArgs) -> Result<()> {
    let service = module.service()?;
    let text = tokio::fs::read_to_string(&args.roster)
        .await
        .with_context(|| format!("failed to read roster {}", args.roster.display()))?;

    let roster = StudentRoster {
        school_name: args.school,
        class_name: args.class,
        full_names: parse_roster(&text),
        email_domain: args.email_domain,
    };
    let issued = service
        .import_students(roster)
        .await
        .context("student import failed")?;

    write_credentials(&args.output, &issued).await?;
    println!(
        "Imported {} students, credentials written to {}",
        issued.len(),
        args.output.display()
    );
    Ok(())
}

pub async fn check_attendance(module: &SchoolServiceModule, force: bool) -> Result<()> {
    let service = module.service()?;
    let check = AttendanceCheck::new(
        service,
        Arc::new(school_service::domain::NoLiveLocation),
    );
    let report = check
        .run_once(force)
        .await
        .context("attendance check failed")?;

    if !report.in_window {
        println!("Outside the attendance window, nothing done (use --force)");
        return Ok(());
    }
    println!(
        "checked {}, present {}, absent {}, skipped {}, failed {}",
        report.checked, report.present, report.absent, report.skipped, report.failed
    );
    Ok(())
}

/// Non-blank lines with inner whitespace collapsed
fn parse_roster(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect()
}

fn credentials_tsv(issued: &[IssuedCredential]) -> String {
    let mut out = String::from("full_name\tclass\tusername\tpassword\n");
    for credential in issued {
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\n",
            credential.full_name, credential.class_name, credential.username, credential.password
        ));
    }
    out
}

async fn write_credentials(path: &Path, issued: &[IssuedCredential]) -> Result<()> {
    tokio::fs::write(path, credentials_tsv(issued))
        .await
        .with_context(|| format!("failed to write credentials to {}", path.display()))
}
