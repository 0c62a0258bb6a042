use chrono::{DateTime, Utc};
use cohort_storage::{
    Assessment, AssessmentId, CreateAssessmentParams, CreateExtraMarkParams, CreateStudentParams,
    DeductionPeriod, ExtraMark, ExtraMarkId, GraceDeduction, Group, GroupId, Grouping, GroupingId,
    MarkUnit, MarkingResult, Membership, MembershipId, MembershipStatus, NewGroup, ResultId,
    Store, StoreError, Student, StudentId, Submission, SubmissionId, Transaction,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool};
use std::str::FromStr;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

type StudentRow = (i64, String, bool, i32, i64);
type AssessmentRow = (i64, String, bool, i64, i64);
type GroupRow = (i64, String, String, Option<String>, i64);
type GroupingRow = (i64, i64, i64, i64);
type MembershipRow = (i64, i64, i64, String, i64);
type SubmissionRow = (i64, i64, i64, i64);
type ResultRow = (i64, i64, i64);
type ExtraMarkRow = (i64, i64, f64, String, String, i64);

const STUDENT_COLUMNS: &str = "id, user_name, hidden, grace_credits, created_at";
const ASSESSMENT_COLUMNS: &str = "id, short_identifier, is_timed, due_date, created_at";
const GROUP_COLUMNS: &str = "id, name, repository_name, repository_error, created_at";
const GROUPING_COLUMNS: &str = "id, group_id, assessment_id, created_at";
const MEMBERSHIP_COLUMNS: &str = "id, student_id, grouping_id, status, created_at";

pub struct SqliteStore {
    pool: SqlitePool,
}

/// Transaction over a single pooled connection. Uncommitted writes are rolled back on drop.
pub struct SqliteTxn {
    tx: sqlx::Transaction<'static, Sqlite>,
}

impl SqliteStore {
    /// `~/.cohort/store.db` (creates dir with 0700 perms on unix)
    pub async fn open_default() -> Result<Self, StoreError> {
        let dir = dirs::home_dir()
            .ok_or_else(|| StoreError::Backend("no home dir".into()))?
            .join(".cohort");
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::Backend(e.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        let path = dir.join("store.db");
        let url = format!("sqlite://{}", path.to_string_lossy());
        Self::open(&url).await
    }

    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(backend)?
            .create_if_missing(true)
            .foreign_keys(true);

        // A single connection keeps `sqlite::memory:` databases alive and shared.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(backend)?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Underlying pool, for maintenance queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// ───────────────────────────── Helpers ─────────────────────────────

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn unique_or_backend(e: sqlx::Error) -> StoreError {
    let s = e.to_string();
    if s.contains("UNIQUE") {
        StoreError::AlreadyExists
    } else {
        StoreError::Backend(s)
    }
}

fn now() -> i64 {
    Utc::now().timestamp_millis()
}

/// Timestamps are stored as milliseconds since the Unix epoch.
fn timestamp(millis: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| StoreError::Backend(format!("invalid timestamp: {}", millis)))
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}

fn student_from_row(row: StudentRow) -> Result<Student, StoreError> {
    let (id, user_name, hidden, grace_credits, created_at) = row;
    Ok(Student {
        id: StudentId(id),
        user_name,
        hidden,
        grace_credits,
        created_at: timestamp(created_at)?,
    })
}

fn assessment_from_row(row: AssessmentRow) -> Result<Assessment, StoreError> {
    let (id, short_identifier, is_timed, due_date, created_at) = row;
    Ok(Assessment {
        id: AssessmentId(id),
        short_identifier,
        is_timed,
        due_date: timestamp(due_date)?,
        created_at: timestamp(created_at)?,
    })
}

fn group_from_row(row: GroupRow) -> Result<Group, StoreError> {
    let (id, name, repository_name, repository_error, created_at) = row;
    Ok(Group {
        id: GroupId(id),
        name,
        repository_name,
        repository_error,
        created_at: timestamp(created_at)?,
    })
}

fn grouping_from_row(row: GroupingRow) -> Result<Grouping, StoreError> {
    let (id, group_id, assessment_id, created_at) = row;
    Ok(Grouping {
        id: GroupingId(id),
        group_id: GroupId(group_id),
        assessment_id: AssessmentId(assessment_id),
        created_at: timestamp(created_at)?,
    })
}

fn membership_from_row(row: MembershipRow) -> Result<Membership, StoreError> {
    let (id, student_id, grouping_id, status, created_at) = row;
    Ok(Membership {
        id: MembershipId(id),
        student_id: StudentId(student_id),
        grouping_id: GroupingId(grouping_id),
        status: MembershipStatus::from_str(&status).map_err(StoreError::Backend)?,
        created_at: timestamp(created_at)?,
    })
}

fn submission_from_row(row: SubmissionRow) -> Result<Submission, StoreError> {
    let (id, grouping_id, revision_timestamp, created_at) = row;
    Ok(Submission {
        id: SubmissionId(id),
        grouping_id: GroupingId(grouping_id),
        revision_timestamp: timestamp(revision_timestamp)?,
        created_at: timestamp(created_at)?,
    })
}

fn result_from_row(row: ResultRow) -> Result<MarkingResult, StoreError> {
    let (id, submission_id, created_at) = row;
    Ok(MarkingResult {
        id: ResultId(id),
        submission_id: SubmissionId(submission_id),
        created_at: timestamp(created_at)?,
    })
}

fn extra_mark_from_row(row: ExtraMarkRow) -> Result<ExtraMark, StoreError> {
    let (id, result_id, amount, unit, description, created_at) = row;
    Ok(ExtraMark {
        id: ExtraMarkId(id),
        result_id: ResultId(result_id),
        amount,
        unit: MarkUnit::from_str(&unit).map_err(StoreError::Backend)?,
        description,
        created_at: timestamp(created_at)?,
    })
}

// Queries shared between the pool and open transactions.

async fn fetch_group<'e, E>(ex: E, filter: &str, value: &str) -> Result<Option<Group>, StoreError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM student_groups WHERE {} = ?", GROUP_COLUMNS, filter);
    sqlx::query_as::<_, GroupRow>(&sql)
        .bind(value)
        .fetch_optional(ex)
        .await
        .map_err(backend)?
        .map(group_from_row)
        .transpose()
}

async fn fetch_grouping<'e, E>(ex: E, grouping_id: &GroupingId) -> Result<Grouping, StoreError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM groupings WHERE id = ?", GROUPING_COLUMNS);
    let row = sqlx::query_as::<_, GroupingRow>(&sql)
        .bind(grouping_id.0)
        .fetch_optional(ex)
        .await
        .map_err(backend)?
        .ok_or(StoreError::NotFound)?;
    grouping_from_row(row)
}

async fn insert_membership_row<'e, E>(
    ex: E,
    student_id: &StudentId,
    grouping_id: &GroupingId,
    status: MembershipStatus,
) -> Result<Membership, StoreError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let created_at = now();
    let id = sqlx::query(
        "INSERT INTO memberships(student_id, grouping_id, status, created_at) VALUES(?, ?, ?, ?)",
    )
    .bind(student_id.0)
    .bind(grouping_id.0)
    .bind(status.as_str())
    .bind(created_at)
    .execute(ex)
    .await
    .map_err(unique_or_backend)?
    .last_insert_rowid();

    Ok(Membership {
        id: MembershipId(id),
        student_id: *student_id,
        grouping_id: *grouping_id,
        status,
        created_at: timestamp(created_at)?,
    })
}

async fn memberships_with_status<'e, E>(
    ex: E,
    student_id: &StudentId,
    assessment_id: &AssessmentId,
    statuses: &[MembershipStatus],
) -> Result<Vec<Membership>, StoreError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    if statuses.is_empty() {
        return Ok(vec![]);
    }
    let sql = format!(
        "SELECT m.id, m.student_id, m.grouping_id, m.status, m.created_at
         FROM memberships m
         INNER JOIN groupings g ON g.id = m.grouping_id
         WHERE m.student_id = ? AND g.assessment_id = ? AND m.status IN ({})
         ORDER BY m.id",
        placeholders(statuses.len())
    );
    let mut query = sqlx::query_as::<_, MembershipRow>(&sql)
        .bind(student_id.0)
        .bind(assessment_id.0);
    for status in statuses {
        query = query.bind(status.as_str());
    }
    let rows = query.fetch_all(ex).await.map_err(backend)?;
    rows.into_iter().map(membership_from_row).collect()
}

// ───────────────────────────── Transaction ─────────────────────────────

#[async_trait::async_trait]
impl Transaction for SqliteTxn {
    async fn insert_group(&mut self, group: &NewGroup) -> Result<Group, StoreError> {
        let created_at = now();
        sqlx::query(
            "INSERT INTO student_groups(id, name, repository_name, created_at) VALUES(?, ?, ?, ?)",
        )
        .bind(group.id.0)
        .bind(&group.name)
        .bind(&group.repository_name)
        .bind(created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(unique_or_backend)?;

        Ok(Group {
            id: group.id,
            name: group.name.clone(),
            repository_name: group.repository_name.clone(),
            repository_error: None,
            created_at: timestamp(created_at)?,
        })
    }

    async fn find_group_by_name(&mut self, name: &str) -> Result<Option<Group>, StoreError> {
        fetch_group(&mut *self.tx, "name", name).await
    }

    async fn annotate_repository_error(
        &mut self,
        group_id: &GroupId,
        message: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE student_groups SET repository_error = ? WHERE id = ?")
            .bind(message)
            .bind(group_id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn find_grouping(
        &mut self,
        assessment_id: &AssessmentId,
        group_id: &GroupId,
    ) -> Result<Option<Grouping>, StoreError> {
        let sql = format!(
            "SELECT {} FROM groupings WHERE assessment_id = ? AND group_id = ?",
            GROUPING_COLUMNS
        );
        sqlx::query_as::<_, GroupingRow>(&sql)
            .bind(assessment_id.0)
            .bind(group_id.0)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(backend)?
            .map(grouping_from_row)
            .transpose()
    }

    async fn insert_grouping(
        &mut self,
        assessment_id: &AssessmentId,
        group_id: &GroupId,
    ) -> Result<Grouping, StoreError> {
        let created_at = now();
        let id = sqlx::query(
            "INSERT INTO groupings(group_id, assessment_id, created_at) VALUES(?, ?, ?)",
        )
        .bind(group_id.0)
        .bind(assessment_id.0)
        .bind(created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(unique_or_backend)?
        .last_insert_rowid();

        Ok(Grouping {
            id: GroupingId(id),
            group_id: *group_id,
            assessment_id: *assessment_id,
            created_at: timestamp(created_at)?,
        })
    }

    async fn get_grouping(&mut self, grouping_id: &GroupingId) -> Result<Grouping, StoreError> {
        fetch_grouping(&mut *self.tx, grouping_id).await
    }

    async fn find_membership(
        &mut self,
        student_id: &StudentId,
        grouping_id: &GroupingId,
        statuses: &[MembershipStatus],
    ) -> Result<Option<Membership>, StoreError> {
        if statuses.is_empty() {
            return Ok(None);
        }
        let sql = format!(
            "SELECT {} FROM memberships WHERE student_id = ? AND grouping_id = ? AND status IN ({})",
            MEMBERSHIP_COLUMNS,
            placeholders(statuses.len())
        );
        let mut query = sqlx::query_as::<_, MembershipRow>(&sql)
            .bind(student_id.0)
            .bind(grouping_id.0);
        for status in statuses {
            query = query.bind(status.as_str());
        }
        query
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(backend)?
            .map(membership_from_row)
            .transpose()
    }

    async fn insert_membership(
        &mut self,
        student_id: &StudentId,
        grouping_id: &GroupingId,
        status: MembershipStatus,
    ) -> Result<Membership, StoreError> {
        insert_membership_row(&mut *self.tx, student_id, grouping_id, status).await
    }

    async fn update_membership_status(
        &mut self,
        membership_id: &MembershipId,
        status: MembershipStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE memberships SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(membership_id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(unique_or_backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn student_memberships(
        &mut self,
        student_id: &StudentId,
        assessment_id: &AssessmentId,
        statuses: &[MembershipStatus],
    ) -> Result<Vec<Membership>, StoreError> {
        memberships_with_status(&mut *self.tx, student_id, assessment_id, statuses).await
    }

    async fn reject_pending_memberships(
        &mut self,
        student_id: &StudentId,
        assessment_id: &AssessmentId,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE memberships SET status = 'rejected'
             WHERE student_id = ? AND status = 'pending'
               AND grouping_id IN (SELECT id FROM groupings WHERE assessment_id = ?)",
        )
        .bind(student_id.0)
        .bind(assessment_id.0)
        .execute(&mut *self.tx)
        .await
        .map_err(backend)?;
        Ok(result.rows_affected())
    }

    async fn delete_pending_memberships(
        &mut self,
        student_id: &StudentId,
        assessment_id: &AssessmentId,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "DELETE FROM memberships
             WHERE student_id = ? AND status = 'pending'
               AND grouping_id IN (SELECT id FROM groupings WHERE assessment_id = ?)",
        )
        .bind(student_id.0)
        .bind(assessment_id.0)
        .execute(&mut *self.tx)
        .await
        .map_err(backend)?;
        Ok(result.rows_affected())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(backend)
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(backend)
    }
}

// ───────────────────────────── Store ─────────────────────────────

#[async_trait::async_trait]
impl Store for SqliteStore {
    type Txn = SqliteTxn;

    async fn begin_txn(&self) -> Result<Self::Txn, StoreError> {
        let tx = self.pool.begin().await.map_err(backend)?;
        Ok(SqliteTxn { tx })
    }

    // ───────────────────────────── Students ─────────────────────────────

    async fn create_student(&self, params: &CreateStudentParams) -> Result<Student, StoreError> {
        let created_at = now();
        let id = sqlx::query(
            "INSERT INTO students(user_name, hidden, grace_credits, created_at) VALUES(?, 0, ?, ?)",
        )
        .bind(&params.user_name)
        .bind(params.grace_credits)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(unique_or_backend)?
        .last_insert_rowid();

        Ok(Student {
            id: StudentId(id),
            user_name: params.user_name.clone(),
            hidden: false,
            grace_credits: params.grace_credits,
            created_at: timestamp(created_at)?,
        })
    }

    async fn get_student(&self, student_id: &StudentId) -> Result<Student, StoreError> {
        let sql = format!("SELECT {} FROM students WHERE id = ?", STUDENT_COLUMNS);
        let row = sqlx::query_as::<_, StudentRow>(&sql)
            .bind(student_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound)?;
        student_from_row(row)
    }

    async fn get_student_by_user_name(&self, user_name: &str) -> Result<Student, StoreError> {
        let sql = format!("SELECT {} FROM students WHERE user_name = ?", STUDENT_COLUMNS);
        let row = sqlx::query_as::<_, StudentRow>(&sql)
            .bind(user_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound)?;
        student_from_row(row)
    }

    async fn set_student_hidden(
        &self,
        student_id: &StudentId,
        hidden: bool,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE students SET hidden = ? WHERE id = ?")
            .bind(hidden)
            .bind(student_id.0)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn set_grace_credits(
        &self,
        student_id: &StudentId,
        grace_credits: i32,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE students SET grace_credits = ? WHERE id = ?")
            .bind(grace_credits)
            .bind(student_id.0)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn create_grace_deduction(
        &self,
        membership_id: &MembershipId,
        deduction: i32,
    ) -> Result<GraceDeduction, StoreError> {
        let created_at = now();
        sqlx::query(
            "INSERT INTO grace_period_deductions(membership_id, deduction, created_at) VALUES(?, ?, ?)",
        )
        .bind(membership_id.0)
        .bind(deduction)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(GraceDeduction {
            membership_id: *membership_id,
            deduction,
            created_at: timestamp(created_at)?,
        })
    }

    async fn list_grace_deductions(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<GraceDeduction>, StoreError> {
        let rows = sqlx::query_as::<_, (i64, i32, i64)>(
            "SELECT d.membership_id, d.deduction, d.created_at
             FROM grace_period_deductions d
             INNER JOIN memberships m ON m.id = d.membership_id
             WHERE m.student_id = ?
             ORDER BY d.id",
        )
        .bind(student_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter()
            .map(|(membership_id, deduction, created_at)| {
                Ok(GraceDeduction {
                    membership_id: MembershipId(membership_id),
                    deduction,
                    created_at: timestamp(created_at)?,
                })
            })
            .collect()
    }

    // ───────────────────────────── Assessments ─────────────────────────────

    async fn create_assessment(
        &self,
        params: &CreateAssessmentParams,
    ) -> Result<Assessment, StoreError> {
        let created_at = now();
        let id = sqlx::query(
            "INSERT INTO assessments(short_identifier, is_timed, due_date, created_at) VALUES(?, ?, ?, ?)",
        )
        .bind(&params.short_identifier)
        .bind(params.is_timed)
        .bind(params.due_date.timestamp_millis())
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(unique_or_backend)?
        .last_insert_rowid();

        Ok(Assessment {
            id: AssessmentId(id),
            short_identifier: params.short_identifier.clone(),
            is_timed: params.is_timed,
            due_date: timestamp(params.due_date.timestamp_millis())?,
            created_at: timestamp(created_at)?,
        })
    }

    async fn get_assessment(&self, assessment_id: &AssessmentId) -> Result<Assessment, StoreError> {
        let sql = format!("SELECT {} FROM assessments WHERE id = ?", ASSESSMENT_COLUMNS);
        let row = sqlx::query_as::<_, AssessmentRow>(&sql)
            .bind(assessment_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound)?;
        assessment_from_row(row)
    }

    async fn get_assessment_by_short_identifier(
        &self,
        short_identifier: &str,
    ) -> Result<Assessment, StoreError> {
        let sql = format!(
            "SELECT {} FROM assessments WHERE short_identifier = ?",
            ASSESSMENT_COLUMNS
        );
        let row = sqlx::query_as::<_, AssessmentRow>(&sql)
            .bind(short_identifier)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound)?;
        assessment_from_row(row)
    }

    async fn set_penalty_periods(
        &self,
        assessment_id: &AssessmentId,
        periods: &[DeductionPeriod],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query("DELETE FROM penalty_periods WHERE assessment_id = ?")
            .bind(assessment_id.0)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        for (position, period) in periods.iter().enumerate() {
            sqlx::query(
                "INSERT INTO penalty_periods(assessment_id, position, hours, deduction) VALUES(?, ?, ?, ?)",
            )
            .bind(assessment_id.0)
            .bind(position as i64)
            .bind(period.hours)
            .bind(period.deduction)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn list_penalty_periods(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<Vec<DeductionPeriod>, StoreError> {
        let rows = sqlx::query_as::<_, (f64, f64)>(
            "SELECT hours, deduction FROM penalty_periods WHERE assessment_id = ? ORDER BY position",
        )
        .bind(assessment_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows
            .into_iter()
            .map(|(hours, deduction)| DeductionPeriod { hours, deduction })
            .collect())
    }

    // ───────────────────────────── Groups ─────────────────────────────

    async fn reserve_group_id(&self) -> Result<GroupId, StoreError> {
        // Autocommitted on the pool; AUTOINCREMENT never reuses a committed id
        let id = sqlx::query("INSERT INTO group_id_sequence DEFAULT VALUES")
            .execute(&self.pool)
            .await
            .map_err(backend)?
            .last_insert_rowid();
        Ok(GroupId(id))
    }

    async fn get_group(&self, group_id: &GroupId) -> Result<Group, StoreError> {
        let sql = format!("SELECT {} FROM student_groups WHERE id = ?", GROUP_COLUMNS);
        let row = sqlx::query_as::<_, GroupRow>(&sql)
            .bind(group_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound)?;
        group_from_row(row)
    }

    async fn get_group_by_name(&self, name: &str) -> Result<Group, StoreError> {
        fetch_group(&self.pool, "name", name)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        let sql = format!("SELECT {} FROM student_groups ORDER BY id", GROUP_COLUMNS);
        let rows = sqlx::query_as::<_, GroupRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.into_iter().map(group_from_row).collect()
    }

    // ───────────────────────────── Groupings ─────────────────────────────

    async fn get_grouping(&self, grouping_id: &GroupingId) -> Result<Grouping, StoreError> {
        fetch_grouping(&self.pool, grouping_id).await
    }

    async fn list_groupings(&self, assessment_id: &AssessmentId) -> Result<Vec<Grouping>, StoreError> {
        let sql = format!(
            "SELECT {} FROM groupings WHERE assessment_id = ? ORDER BY id",
            GROUPING_COLUMNS
        );
        let rows = sqlx::query_as::<_, GroupingRow>(&sql)
            .bind(assessment_id.0)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.into_iter().map(grouping_from_row).collect()
    }

    async fn student_groupings(
        &self,
        student_id: &StudentId,
        assessment_id: &AssessmentId,
        statuses: &[MembershipStatus],
    ) -> Result<Vec<Grouping>, StoreError> {
        if statuses.is_empty() {
            return Ok(vec![]);
        }
        let sql = format!(
            "SELECT g.id, g.group_id, g.assessment_id, g.created_at
             FROM groupings g
             INNER JOIN memberships m ON m.grouping_id = g.id
             WHERE m.student_id = ? AND g.assessment_id = ? AND m.status IN ({})
             ORDER BY g.id",
            placeholders(statuses.len())
        );
        let mut query = sqlx::query_as::<_, GroupingRow>(&sql)
            .bind(student_id.0)
            .bind(assessment_id.0);
        for status in statuses {
            query = query.bind(status.as_str());
        }
        let rows = query.fetch_all(&self.pool).await.map_err(backend)?;
        rows.into_iter().map(grouping_from_row).collect()
    }

    // ───────────────────────────── Memberships ─────────────────────────────

    async fn create_membership(
        &self,
        student_id: &StudentId,
        grouping_id: &GroupingId,
        status: MembershipStatus,
    ) -> Result<Membership, StoreError> {
        insert_membership_row(&self.pool, student_id, grouping_id, status).await
    }

    async fn list_memberships(&self, grouping_id: &GroupingId) -> Result<Vec<Membership>, StoreError> {
        let sql = format!(
            "SELECT {} FROM memberships WHERE grouping_id = ? ORDER BY id",
            MEMBERSHIP_COLUMNS
        );
        let rows = sqlx::query_as::<_, MembershipRow>(&sql)
            .bind(grouping_id.0)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.into_iter().map(membership_from_row).collect()
    }

    async fn list_student_memberships(
        &self,
        student_id: &StudentId,
        assessment_id: &AssessmentId,
    ) -> Result<Vec<Membership>, StoreError> {
        memberships_with_status(
            &self.pool,
            student_id,
            assessment_id,
            &[
                MembershipStatus::Pending,
                MembershipStatus::Accepted,
                MembershipStatus::Inviter,
                MembershipStatus::Rejected,
            ],
        )
        .await
    }

    // ───────────────────────────── Submissions ─────────────────────────────

    async fn create_submission(
        &self,
        grouping_id: &GroupingId,
        revision_timestamp: DateTime<Utc>,
    ) -> Result<Submission, StoreError> {
        let created_at = now();
        let id = sqlx::query(
            "INSERT INTO submissions(grouping_id, revision_timestamp, created_at) VALUES(?, ?, ?)",
        )
        .bind(grouping_id.0)
        .bind(revision_timestamp.timestamp_millis())
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?
        .last_insert_rowid();

        Ok(Submission {
            id: SubmissionId(id),
            grouping_id: *grouping_id,
            revision_timestamp: timestamp(revision_timestamp.timestamp_millis())?,
            created_at: timestamp(created_at)?,
        })
    }

    async fn get_submission(&self, submission_id: &SubmissionId) -> Result<Submission, StoreError> {
        let row = sqlx::query_as::<_, SubmissionRow>(
            "SELECT id, grouping_id, revision_timestamp, created_at FROM submissions WHERE id = ?",
        )
        .bind(submission_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .ok_or(StoreError::NotFound)?;
        submission_from_row(row)
    }

    async fn create_result(&self, submission_id: &SubmissionId) -> Result<MarkingResult, StoreError> {
        let created_at = now();
        let id = sqlx::query("INSERT INTO results(submission_id, created_at) VALUES(?, ?)")
            .bind(submission_id.0)
            .bind(created_at)
            .execute(&self.pool)
            .await
            .map_err(backend)?
            .last_insert_rowid();

        Ok(MarkingResult {
            id: ResultId(id),
            submission_id: *submission_id,
            created_at: timestamp(created_at)?,
        })
    }

    async fn original_result(
        &self,
        submission_id: &SubmissionId,
    ) -> Result<MarkingResult, StoreError> {
        let row = sqlx::query_as::<_, ResultRow>(
            "SELECT id, submission_id, created_at FROM results
             WHERE submission_id = ? ORDER BY created_at, id LIMIT 1",
        )
        .bind(submission_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .ok_or(StoreError::NotFound)?;
        result_from_row(row)
    }

    async fn create_extra_mark(
        &self,
        params: &CreateExtraMarkParams,
    ) -> Result<ExtraMark, StoreError> {
        let created_at = now();
        let id = sqlx::query(
            "INSERT INTO extra_marks(result_id, amount, unit, description, created_at) VALUES(?, ?, ?, ?, ?)",
        )
        .bind(params.result_id.0)
        .bind(params.amount)
        .bind(params.unit.as_str())
        .bind(&params.description)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?
        .last_insert_rowid();

        Ok(ExtraMark {
            id: ExtraMarkId(id),
            result_id: params.result_id,
            amount: params.amount,
            unit: params.unit,
            description: params.description.clone(),
            created_at: timestamp(created_at)?,
        })
    }

    async fn list_extra_marks(&self, result_id: &ResultId) -> Result<Vec<ExtraMark>, StoreError> {
        let rows = sqlx::query_as::<_, ExtraMarkRow>(
            "SELECT id, result_id, amount, unit, description, created_at
             FROM extra_marks WHERE result_id = ? ORDER BY id",
        )
        .bind(result_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.into_iter().map(extra_mark_from_row).collect()
    }
}
