use chrono::{DateTime, Utc};
use cohort_core::GracePeriodRule;
use cohort_storage::{CreateAssessmentParams, DeductionPeriod, Store};

use super::App;

pub async fn cmd_assessment_add(
    app: &App,
    short_identifier: &str,
    due: DateTime<Utc>,
    timed: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let assessment = app
        .store
        .create_assessment(&CreateAssessmentParams {
            short_identifier: short_identifier.to_string(),
            is_timed: timed,
            due_date: due,
        })
        .await?;
    println!(
        "Assessment added: {} (due {}{})",
        assessment.short_identifier,
        assessment.due_date,
        if assessment.is_timed { ", timed" } else { "" }
    );
    Ok(())
}

pub async fn cmd_assessment_periods(
    app: &App,
    short_identifier: &str,
    periods: Vec<DeductionPeriod>,
) -> Result<(), Box<dyn std::error::Error>> {
    let assessment = app
        .store
        .get_assessment_by_short_identifier(short_identifier)
        .await?;
    let rule = GracePeriodRule::new(periods)?;
    app.penalties.configure(&assessment.id, &rule).await?;
    println!(
        "{}: {} period(s) over {} hours, up to {}% deducted",
        assessment.short_identifier,
        rule.periods().len(),
        rule.hours_sum(),
        rule.maximum_penalty()
    );
    Ok(())
}

pub async fn cmd_assessment_overtime(
    app: &App,
    short_identifier: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let assessment = app
        .store
        .get_assessment_by_short_identifier(short_identifier)
        .await?;
    let message = app
        .penalties
        .overtime_message(&assessment.id, Utc::now())
        .await?;
    println!("{}", message);
    Ok(())
}
