use chrono::{Duration, TimeZone, Utc};
use cohort_storage::{
    AssessmentId, CreateAssessmentParams, CreateExtraMarkParams, CreateStudentParams,
    DeductionPeriod, GroupId, MarkUnit, MembershipStatus, NewGroup, Store, StoreError, StudentId,
    Transaction,
};
use cohort_store_sqlite::SqliteStore;

async fn student(s: &SqliteStore, user_name: &str) -> StudentId {
    s.create_student(&CreateStudentParams {
        user_name: user_name.to_string(),
        grace_credits: 2,
    })
    .await
    .unwrap()
    .id
}

async fn assessment(s: &SqliteStore, short_identifier: &str) -> AssessmentId {
    s.create_assessment(&CreateAssessmentParams {
        short_identifier: short_identifier.to_string(),
        is_timed: false,
        due_date: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
    })
    .await
    .unwrap()
    .id
}

async fn group(s: &SqliteStore, name: &str) -> GroupId {
    let id = s.reserve_group_id().await.unwrap();
    let mut txn = s.begin_txn().await.unwrap();
    txn.insert_group(&NewGroup {
        id,
        name: name.to_string(),
        repository_name: name.to_string(),
    })
    .await
    .unwrap();
    txn.commit().await.unwrap();
    id
}

#[tokio::test]
async fn student_crud_and_uniqueness() {
    let s = SqliteStore::open_in_memory().await.unwrap();

    let id = student(&s, "c5alice").await;
    let got = s.get_student(&id).await.unwrap();
    assert_eq!(got.user_name, "c5alice");
    assert!(!got.hidden);
    assert_eq!(got.grace_credits, 2);

    let by_name = s.get_student_by_user_name("c5alice").await.unwrap();
    assert_eq!(by_name.id, id);

    // Duplicate user name
    let dup = s
        .create_student(&CreateStudentParams {
            user_name: "c5alice".to_string(),
            grace_credits: 0,
        })
        .await;
    assert!(matches!(dup, Err(StoreError::AlreadyExists)));

    s.set_student_hidden(&id, true).await.unwrap();
    s.set_grace_credits(&id, 5).await.unwrap();
    let got = s.get_student(&id).await.unwrap();
    assert!(got.hidden);
    assert_eq!(got.grace_credits, 5);

    // Unknown ids
    assert!(matches!(
        s.get_student(&StudentId(999)).await,
        Err(StoreError::NotFound)
    ));
    assert!(matches!(
        s.set_student_hidden(&StudentId(999), true).await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test]
async fn reserved_group_ids_are_unique_and_rollback_hides_rows() {
    let s = SqliteStore::open_in_memory().await.unwrap();

    let first = s.reserve_group_id().await.unwrap();
    let second = s.reserve_group_id().await.unwrap();
    assert_ne!(first, second);
    let mut txn = s.begin_txn().await.unwrap();
    txn.insert_group(&NewGroup {
        id: first,
        name: "doomed".to_string(),
        repository_name: "doomed".to_string(),
    })
    .await
    .unwrap();
    assert!(txn.find_group_by_name("doomed").await.unwrap().is_some());
    txn.rollback().await.unwrap();

    assert!(matches!(
        s.get_group_by_name("doomed").await,
        Err(StoreError::NotFound)
    ));
    assert!(s.list_groups().await.unwrap().is_empty());

    // The rolled-back group's id stays consumed
    let third = s.reserve_group_id().await.unwrap();
    assert!(third.0 > second.0);

    // Duplicate names are rejected
    group(&s, "team").await;
    let id = s.reserve_group_id().await.unwrap();
    let mut txn = s.begin_txn().await.unwrap();
    let dup = txn
        .insert_group(&NewGroup {
            id,
            name: "team".to_string(),
            repository_name: "other".to_string(),
        })
        .await;
    assert!(matches!(dup, Err(StoreError::AlreadyExists)));
    txn.rollback().await.unwrap();
}

#[tokio::test]
async fn repository_error_annotation_is_persisted() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let id = group(&s, "annotated").await;

    let mut txn = s.begin_txn().await.unwrap();
    txn.annotate_repository_error(&id, "collision at annotated")
        .await
        .unwrap();
    txn.commit().await.unwrap();

    let g = s.get_group(&id).await.unwrap();
    assert_eq!(g.repository_error.as_deref(), Some("collision at annotated"));
}

#[tokio::test]
async fn grouping_is_unique_per_group_and_assessment() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let a1 = assessment(&s, "a1").await;
    let g = group(&s, "pair").await;

    let mut txn = s.begin_txn().await.unwrap();
    assert!(txn.find_grouping(&a1, &g).await.unwrap().is_none());
    let grouping = txn.insert_grouping(&a1, &g).await.unwrap();
    let found = txn.find_grouping(&a1, &g).await.unwrap().unwrap();
    assert_eq!(found.id, grouping.id);
    assert!(matches!(
        txn.insert_grouping(&a1, &g).await,
        Err(StoreError::AlreadyExists)
    ));
    txn.commit().await.unwrap();

    let listed = s.list_groupings(&a1).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(s.get_grouping(&grouping.id).await.unwrap(), grouping);
}

#[tokio::test]
async fn membership_bulk_transitions_are_scoped_to_assessment() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let alice = student(&s, "alice").await;
    let a1 = assessment(&s, "a1").await;
    let a2 = assessment(&s, "a2").await;
    let g1 = group(&s, "g1").await;
    let g2 = group(&s, "g2").await;

    let mut txn = s.begin_txn().await.unwrap();
    let a1_g1 = txn.insert_grouping(&a1, &g1).await.unwrap();
    let a1_g2 = txn.insert_grouping(&a1, &g2).await.unwrap();
    let a2_g1 = txn.insert_grouping(&a2, &g1).await.unwrap();
    txn.commit().await.unwrap();

    for grouping in [&a1_g1, &a1_g2, &a2_g1] {
        s.create_membership(&alice, &grouping.id, MembershipStatus::Pending)
            .await
            .unwrap();
    }

    // Same student twice in a grouping
    assert!(matches!(
        s.create_membership(&alice, &a1_g1.id, MembershipStatus::Pending)
            .await,
        Err(StoreError::AlreadyExists)
    ));

    let mut txn = s.begin_txn().await.unwrap();
    let rejected = txn.reject_pending_memberships(&alice, &a1).await.unwrap();
    assert_eq!(rejected, 2);
    txn.commit().await.unwrap();

    let a1_rejected = s
        .student_groupings(&alice, &a1, &[MembershipStatus::Rejected])
        .await
        .unwrap();
    assert_eq!(a1_rejected.len(), 2);
    let a2_pending = s
        .student_groupings(&alice, &a2, &[MembershipStatus::Pending])
        .await
        .unwrap();
    assert_eq!(a2_pending.len(), 1);

    let mut txn = s.begin_txn().await.unwrap();
    let deleted = txn.delete_pending_memberships(&alice, &a2).await.unwrap();
    assert_eq!(deleted, 1);
    txn.commit().await.unwrap();

    assert!(s
        .list_student_memberships(&alice, &a2)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(s.list_student_memberships(&alice, &a1).await.unwrap().len(), 2);
}

#[tokio::test]
async fn find_and_update_membership_status() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let bob = student(&s, "bob").await;
    let a1 = assessment(&s, "a1").await;
    let g = group(&s, "g").await;

    let mut txn = s.begin_txn().await.unwrap();
    let grouping = txn.insert_grouping(&a1, &g).await.unwrap();
    let m = txn
        .insert_membership(&bob, &grouping.id, MembershipStatus::Pending)
        .await
        .unwrap();

    let joinable = txn
        .find_membership(&bob, &grouping.id, &MembershipStatus::JOINABLE)
        .await
        .unwrap();
    assert_eq!(joinable.map(|m| m.id), Some(m.id));

    txn.update_membership_status(&m.id, MembershipStatus::Accepted)
        .await
        .unwrap();
    assert!(txn
        .find_membership(&bob, &grouping.id, &MembershipStatus::JOINABLE)
        .await
        .unwrap()
        .is_none());
    let active = txn
        .student_memberships(&bob, &a1, &MembershipStatus::ACTIVE)
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].status, MembershipStatus::Accepted);
    txn.commit().await.unwrap();
}

#[tokio::test]
async fn single_inviter_per_grouping() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let alice = student(&s, "alice").await;
    let bob = student(&s, "bob").await;
    let a1 = assessment(&s, "a1").await;
    let g = group(&s, "g").await;

    let mut txn = s.begin_txn().await.unwrap();
    let grouping = txn.insert_grouping(&a1, &g).await.unwrap();
    txn.insert_membership(&alice, &grouping.id, MembershipStatus::Inviter)
        .await
        .unwrap();
    let second = txn
        .insert_membership(&bob, &grouping.id, MembershipStatus::Inviter)
        .await;
    assert!(matches!(second, Err(StoreError::AlreadyExists)));
    txn.rollback().await.unwrap();
}

#[tokio::test]
async fn penalty_periods_keep_their_order() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let a1 = assessment(&s, "a1").await;

    let periods = vec![
        DeductionPeriod::new(24.0, 10.0),
        DeductionPeriod::new(1.0, 50.0),
        DeductionPeriod::new(12.0, 5.0),
    ];
    s.set_penalty_periods(&a1, &periods).await.unwrap();
    assert_eq!(s.list_penalty_periods(&a1).await.unwrap(), periods);

    // Replacing drops old tiers
    s.set_penalty_periods(&a1, &[DeductionPeriod::new(2.0, 20.0)])
        .await
        .unwrap();
    assert_eq!(
        s.list_penalty_periods(&a1).await.unwrap(),
        vec![DeductionPeriod::new(2.0, 20.0)]
    );
}

#[tokio::test]
async fn extra_marks_attach_to_original_result() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let a1 = assessment(&s, "a1").await;
    let g = group(&s, "g").await;
    let mut txn = s.begin_txn().await.unwrap();
    let grouping = txn.insert_grouping(&a1, &g).await.unwrap();
    txn.commit().await.unwrap();

    let revision = Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap();
    let submission = s.create_submission(&grouping.id, revision).await.unwrap();
    assert_eq!(submission.revision_timestamp, revision);

    assert!(matches!(
        s.original_result(&submission.id).await,
        Err(StoreError::NotFound)
    ));

    let original = s.create_result(&submission.id).await.unwrap();
    let _remark = s.create_result(&submission.id).await.unwrap();
    assert_eq!(s.original_result(&submission.id).await.unwrap().id, original.id);

    let mark = s
        .create_extra_mark(&CreateExtraMarkParams {
            result_id: original.id,
            amount: -30.0,
            unit: MarkUnit::Percentage,
            description: "late".to_string(),
        })
        .await
        .unwrap();
    let marks = s.list_extra_marks(&original.id).await.unwrap();
    assert_eq!(marks.len(), 1);
    assert_eq!(marks[0].id, mark.id);
    assert_eq!(marks[0].amount, -30.0);
    assert_eq!(marks[0].unit, MarkUnit::Percentage);
}

#[tokio::test]
async fn grace_deductions_sum_across_memberships() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let alice = student(&s, "alice").await;
    let a1 = assessment(&s, "a1").await;
    let g = group(&s, "g").await;

    let mut txn = s.begin_txn().await.unwrap();
    let grouping = txn.insert_grouping(&a1, &g).await.unwrap();
    let m = txn
        .insert_membership(&alice, &grouping.id, MembershipStatus::Inviter)
        .await
        .unwrap();
    txn.commit().await.unwrap();

    s.create_grace_deduction(&m.id, 1).await.unwrap();
    s.create_grace_deduction(&m.id, 2).await.unwrap();
    let deductions = s.list_grace_deductions(&alice).await.unwrap();
    assert_eq!(deductions.iter().map(|d| d.deduction).sum::<i32>(), 3);

    // Due dates survive the round trip at second precision
    let a = s.get_assessment(&a1).await.unwrap();
    assert_eq!(a.due_date + Duration::hours(2), Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap());
}

#[tokio::test]
async fn submission_times_keep_millisecond_precision() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let a1 = assessment(&s, "a1").await;
    let g = group(&s, "g").await;
    let mut txn = s.begin_txn().await.unwrap();
    let grouping = txn.insert_grouping(&a1, &g).await.unwrap();
    txn.commit().await.unwrap();

    let revision = Utc.with_ymd_and_hms(2024, 3, 1, 13, 0, 0).unwrap() + Duration::milliseconds(500);
    let submission = s.create_submission(&grouping.id, revision).await.unwrap();

    let stored = s.get_submission(&submission.id).await.unwrap();
    assert_eq!(stored.revision_timestamp, revision);
}
