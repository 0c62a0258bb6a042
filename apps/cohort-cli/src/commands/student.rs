use cohort_core::BulkOutcome;
use cohort_storage::{CreateStudentParams, Store};

use super::App;

pub async fn cmd_student_add(
    app: &App,
    user_name: &str,
    grace_credits: i32,
) -> Result<(), Box<dyn std::error::Error>> {
    let student = app
        .store
        .create_student(&CreateStudentParams {
            user_name: user_name.to_string(),
            grace_credits,
        })
        .await?;
    println!("Student added: {} (id {})", student.user_name, student.id);
    Ok(())
}

pub async fn cmd_student_hide(
    app: &App,
    user_names: &[String],
    hidden: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let ids = app.student_ids(user_names).await?;
    let outcome = if hidden {
        app.roster.hide_students(&ids).await
    } else {
        app.roster.unhide_students(&ids).await
    };
    print_outcome(if hidden { "Hidden" } else { "Unhidden" }, &outcome);
    Ok(())
}

pub async fn cmd_student_grace(
    app: &App,
    user_names: &[String],
    amount: i32,
) -> Result<(), Box<dyn std::error::Error>> {
    let ids = app.student_ids(user_names).await?;
    let outcome = app.roster.give_grace_credits(&ids, amount).await;
    print_outcome("Grace credits updated", &outcome);
    Ok(())
}

pub async fn cmd_student_credits(
    app: &App,
    user_name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let student = app.store.get_student_by_user_name(user_name).await?;
    let remaining = app.roster.remaining_grace_credits(&student.id).await?;
    println!(
        "{}: {} of {} grace credits remaining",
        student.user_name, remaining, student.grace_credits
    );
    Ok(())
}

fn print_outcome(action: &str, outcome: &BulkOutcome) {
    println!("{}: {} student(s)", action, outcome.updated.len());
    for (id, error) in &outcome.failed {
        println!("  failed for student {}: {}", id, error);
    }
}
