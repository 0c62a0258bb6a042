use clap::Parser;
use cohort_activity::TracingActivityLog;
use cohort_config::Settings;
use cohort_store_sqlite::SqliteStore;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{AssessmentCommand, Cli, Command, StudentCommand};
use commands::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::from_env()?,
    };
    tracing::debug!(
        database = %settings.database_url,
        backend = ?settings.repository.backend,
        repository_admin = settings.repository.is_repository_admin,
        "Loaded settings"
    );
    let store = SqliteStore::open(&settings.database_url).await?;
    let app = App::new(store, &settings, TracingActivityLog::new());

    match cli.command {
        Command::Student { student_cmd } => match student_cmd {
            StudentCommand::Add {
                user_name,
                grace_credits,
            } => cmd_student_add(&app, &user_name, grace_credits).await?,
            StudentCommand::Hide { user_names } => {
                cmd_student_hide(&app, &user_names, true).await?
            }
            StudentCommand::Unhide { user_names } => {
                cmd_student_hide(&app, &user_names, false).await?
            }
            StudentCommand::Grace { amount, user_names } => {
                cmd_student_grace(&app, &user_names, amount).await?
            }
            StudentCommand::Credits { user_name } => cmd_student_credits(&app, &user_name).await?,
        },
        Command::Assessment { assessment_cmd } => match assessment_cmd {
            AssessmentCommand::Add {
                short_identifier,
                due,
                timed,
            } => cmd_assessment_add(&app, &short_identifier, due, timed).await?,
            AssessmentCommand::Periods {
                short_identifier,
                periods,
            } => cmd_assessment_periods(&app, &short_identifier, periods).await?,
            AssessmentCommand::Overtime { short_identifier } => {
                cmd_assessment_overtime(&app, &short_identifier).await?
            }
        },
        Command::Solo {
            user_name,
            assessment,
        } => cmd_solo(&app, &user_name, &assessment).await?,
        Command::Autogen {
            user_name,
            assessment,
        } => cmd_autogen(&app, &user_name, &assessment).await?,
        Command::Invite {
            user_name,
            assessment,
            group,
        } => cmd_invite(&app, &user_name, &assessment, &group).await?,
        Command::Join {
            user_name,
            assessment,
            group,
        } => cmd_join(&app, &user_name, &assessment, &group).await?,
        Command::Penalty {
            assessment,
            group,
            submitted_at,
        } => cmd_penalty(&app, &assessment, &group, submitted_at).await?,
        Command::SyncPermissions {
            group,
            admins,
            graders,
        } => cmd_sync_permissions(&app, &group, &admins, &graders).await?,
        Command::Repository { group } => cmd_repository(&app, &group).await?,
    }

    Ok(())
}
