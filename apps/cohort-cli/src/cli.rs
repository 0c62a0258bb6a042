use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use cohort_storage::DeductionPeriod;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cohort")]
#[command(about = "Student group and late penalty management")]
pub struct Cli {
    /// Settings file (JSON). Without it settings come from COHORT_* environment variables.
    #[arg(long, env = "COHORT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Student commands
    Student {
        #[command(subcommand)]
        student_cmd: StudentCommand,
    },
    /// Assessment commands
    Assessment {
        #[command(subcommand)]
        assessment_cmd: AssessmentCommand,
    },
    /// Put a student in a group of their own
    Solo {
        /// Student user name
        user_name: String,
        /// Assessment short identifier
        assessment: String,
    },
    /// Found a new anonymous group for a student
    Autogen {
        /// Student user name
        user_name: String,
        /// Assessment short identifier
        assessment: String,
    },
    /// Invite a student into a group for an assessment
    Invite {
        user_name: String,
        assessment: String,
        /// Group name
        group: String,
    },
    /// Accept an invitation
    Join {
        user_name: String,
        assessment: String,
        /// Group name
        group: String,
    },
    /// Record a submission and apply the assessment's late penalty
    Penalty {
        assessment: String,
        /// Group name
        group: String,
        /// Submission time (RFC 3339). Defaults to now.
        #[arg(long)]
        submitted_at: Option<DateTime<Utc>>,
    },
    /// Grant admins and graders read-write access to a group's repository
    SyncPermissions {
        /// Group name
        group: String,
        #[arg(long = "admin")]
        admins: Vec<String>,
        #[arg(long = "grader")]
        graders: Vec<String>,
    },
    /// Show where a group's repository lives
    Repository {
        /// Group name
        group: String,
    },
}

#[derive(Subcommand)]
pub enum StudentCommand {
    /// Add a student
    Add {
        user_name: String,
        #[arg(long, default_value_t = 0)]
        grace_credits: i32,
    },
    /// Hide students
    Hide { user_names: Vec<String> },
    /// Unhide students
    Unhide { user_names: Vec<String> },
    /// Give (or with a negative amount, take) grace credits
    Grace {
        #[arg(allow_hyphen_values = true)]
        amount: i32,
        user_names: Vec<String>,
    },
    /// Show remaining grace credits
    Credits { user_name: String },
}

#[derive(Subcommand)]
pub enum AssessmentCommand {
    /// Add an assessment
    Add {
        short_identifier: String,
        /// Due date (RFC 3339)
        #[arg(long)]
        due: DateTime<Utc>,
        #[arg(long)]
        timed: bool,
    },
    /// Replace the assessment's penalty periods
    Periods {
        short_identifier: String,
        /// HOURS:DEDUCTION, in order (e.g. --period 24:10 --period 24:20)
        #[arg(long = "period", value_parser = parse_period)]
        periods: Vec<DeductionPeriod>,
    },
    /// Show the penalty a submission made now would receive
    Overtime { short_identifier: String },
}

fn parse_period(s: &str) -> Result<DeductionPeriod, String> {
    let (hours, deduction) = s
        .split_once(':')
        .ok_or_else(|| format!("expected HOURS:DEDUCTION, got '{}'", s))?;
    let hours = hours
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid hours '{}': {}", hours, e))?;
    let deduction = deduction
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid deduction '{}': {}", deduction, e))?;
    Ok(DeductionPeriod::new(hours, deduction))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_periods() {
        assert_eq!(parse_period("24:10").unwrap(), DeductionPeriod::new(24.0, 10.0));
        assert_eq!(parse_period(" 1.5 : 5 ").unwrap(), DeductionPeriod::new(1.5, 5.0));
        assert!(parse_period("24").is_err());
        assert!(parse_period("x:10").is_err());
    }

    #[test]
    fn parses_a_full_command_line() {
        let cli = Cli::try_parse_from([
            "cohort",
            "assessment",
            "periods",
            "A1",
            "--period",
            "1:10",
            "--period",
            "2:20",
        ])
        .unwrap();
        match cli.command {
            Command::Assessment {
                assessment_cmd: AssessmentCommand::Periods { periods, .. },
            } => assert_eq!(periods.len(), 2),
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn clap_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
