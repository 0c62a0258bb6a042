use chrono::{DateTime, Utc};
use cohort_core::{GroupingOutcome, Provisioned};
use cohort_storage::Store;

use super::App;

fn print_outcome(outcome: &GroupingOutcome) {
    println!("Group:    {}", outcome.group.name);
    println!("Grouping: {}", outcome.grouping.id);
    match &outcome.repository {
        Some(Provisioned::Created) => println!("Repository created: {}", outcome.group.repository_name),
        Some(Provisioned::Collision(message)) => println!("⚠️  Repository not created: {}", message),
        Some(Provisioned::Skipped) | None => {}
    }
}

pub async fn cmd_solo(
    app: &App,
    user_name: &str,
    assessment: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let student = app.store.get_student_by_user_name(user_name).await?;
    let assessment = app
        .store
        .get_assessment_by_short_identifier(assessment)
        .await?;
    let outcome = app
        .orchestrator
        .create_solo_group(&student.id, &assessment.id)
        .await?;
    print_outcome(&outcome);
    Ok(())
}

pub async fn cmd_autogen(
    app: &App,
    user_name: &str,
    assessment: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let student = app.store.get_student_by_user_name(user_name).await?;
    let assessment = app
        .store
        .get_assessment_by_short_identifier(assessment)
        .await?;
    let outcome = app
        .orchestrator
        .create_autogenerated_group(&student.id, &assessment.id)
        .await?;
    print_outcome(&outcome);
    Ok(())
}

pub async fn cmd_invite(
    app: &App,
    user_name: &str,
    assessment: &str,
    group: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let student = app.store.get_student_by_user_name(user_name).await?;
    let grouping = app.grouping(assessment, group).await?;
    match app.memberships.invite(&student.id, &grouping.id).await? {
        Some(_) => println!("Invited {} to {}", user_name, group),
        None => println!("{} is hidden and was not invited", user_name),
    }
    Ok(())
}

pub async fn cmd_join(
    app: &App,
    user_name: &str,
    assessment: &str,
    group: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let student = app.store.get_student_by_user_name(user_name).await?;
    let grouping = app.grouping(assessment, group).await?;
    app.memberships.join(&student.id, &grouping.id).await?;
    println!("{} joined {}", user_name, group);
    Ok(())
}

pub async fn cmd_penalty(
    app: &App,
    assessment: &str,
    group: &str,
    submitted_at: Option<DateTime<Utc>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let grouping = app.grouping(assessment, group).await?;
    let submission = app
        .store
        .create_submission(&grouping.id, submitted_at.unwrap_or_else(Utc::now))
        .await?;
    app.store.create_result(&submission.id).await?;

    match app.penalties.apply_submission_rule(&submission).await? {
        Some(mark) => println!("{}", mark.description),
        None => println!("Submission {} is on time", submission.id.0),
    }
    Ok(())
}

pub async fn cmd_sync_permissions(
    app: &App,
    group: &str,
    admins: &[String],
    graders: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let group = app.store.get_group_by_name(group).await?;
    app.provisioner
        .sync_permissions(&group, admins, graders)
        .await?;
    println!(
        "Granted read-write on {} to {} identities",
        group.repository_name,
        admins.len() + graders.len()
    );
    Ok(())
}

pub async fn cmd_repository(app: &App, group: &str) -> Result<(), Box<dyn std::error::Error>> {
    let group = app.store.get_group_by_name(group).await?;
    let handle = app.provisioner.open_repository(&group).await?;
    println!("Location: {}", handle.location.display());
    if let Some(url) = app.provisioner.external_access_url(&group) {
        println!("URL:      {}", url);
    }
    for (identity, permission) in &handle.permissions {
        println!("  {} {:?}", identity, permission);
    }
    if let Some(error) = &group.repository_error {
        println!("⚠️  {}", error);
    }
    Ok(())
}
