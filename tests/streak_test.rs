mod common;

use chrono::{NaiveDate, TimeZone, Utc};
use common::{create_test_db, make_content};
use logotask::db::Db;
use logotask::models::{Difficulty, SubmittedPairing, SubmittedQuestion, TaskKind};
use logotask::services::generator::TaskGenerator;
use logotask::services::recorder::ResultRecorder;
use logotask::services::streak::StreakSweep;

async fn setup() -> (Db, i64, i64) {
    let db = create_test_db().await;
    let owner = db
        .create_therapist("catalogue@test.dev", "Catalogue")
        .await
        .unwrap();
    let patient = db
        .create_patient("patient@test.dev", "Patient")
        .await
        .unwrap();
    db.import_content(owner.id, &make_content(30)).await.unwrap();

    let generator = TaskGenerator::new(db.clone(), owner.id);
    let task_id = generator
        .generate(
            "Task",
            TaskKind::ConnectPairsTextImage,
            Difficulty::Easy,
            owner.id,
            Some(1),
        )
        .await
        .unwrap();

    (db, task_id, patient.id)
}

async fn submit_all_correct(db: &Db, task_id: i64, patient: i64, now: chrono::DateTime<Utc>) -> i64 {
    let detail = db.get_task_detail(task_id).await.unwrap();
    let submission: Vec<SubmittedQuestion> = detail
        .questions
        .iter()
        .map(|q| SubmittedQuestion {
            pairings: q
                .pair_choices
                .iter()
                .map(|c| SubmittedPairing {
                    data1: c.data1.clone(),
                    data2: c.data2.clone(),
                })
                .collect(),
            four_choice: None,
        })
        .collect();

    ResultRecorder::new(db.clone())
        .record(task_id, patient, submission, now)
        .await
        .unwrap()
        .day_streak
}

#[tokio::test]
async fn test_streak_sequence_across_days() {
    let (db, task_id, patient) = setup().await;

    // First ever submission starts at 1
    let day1 = Utc.with_ymd_and_hms(2026, 3, 2, 18, 0, 0).unwrap();
    assert_eq!(submit_all_correct(&db, task_id, patient, day1).await, 1);

    // Consecutive day increments
    let day2 = Utc.with_ymd_and_hms(2026, 3, 3, 7, 0, 0).unwrap();
    assert_eq!(submit_all_correct(&db, task_id, patient, day2).await, 2);

    // Second submission the same day leaves it unchanged
    let day2_later = Utc.with_ymd_and_hms(2026, 3, 3, 21, 0, 0).unwrap();
    assert_eq!(submit_all_correct(&db, task_id, patient, day2_later).await, 2);

    // A missed day restarts at 1
    let day5 = Utc.with_ymd_and_hms(2026, 3, 6, 12, 0, 0).unwrap();
    assert_eq!(submit_all_correct(&db, task_id, patient, day5).await, 1);

    let user = db.get_user(patient).await.unwrap();
    assert_eq!(user.day_streak, 1);
    assert_eq!(user.last_result_posted, Some(day5));
}

#[tokio::test]
async fn test_sweep_zeroes_stale_streaks() {
    let db = create_test_db().await;
    let stale = db.create_patient("stale@test.dev", "Stale").await.unwrap();
    let fresh = db.create_patient("fresh@test.dev", "Fresh").await.unwrap();
    let idle = db.create_patient("idle@test.dev", "Idle").await.unwrap();

    let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
    let three_days_ago = Utc.with_ymd_and_hms(2026, 3, 7, 12, 0, 0).unwrap();
    let yesterday = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();

    db.apply_streak(stale.id, 5, three_days_ago).await.unwrap();
    db.apply_streak(fresh.id, 2, yesterday).await.unwrap();
    // idle has never posted and sits at 0 already

    let outcome = StreakSweep::new(db.clone()).run(today).await.unwrap();
    assert_eq!(outcome.checked, 3);
    assert_eq!(outcome.zeroed, 1);
    assert_eq!(outcome.failed, 0);

    assert_eq!(db.get_user(stale.id).await.unwrap().day_streak, 0);
    assert_eq!(db.get_user(fresh.id).await.unwrap().day_streak, 2);
    assert_eq!(db.get_user(idle.id).await.unwrap().day_streak, 0);

    // The stamp survives the reset
    assert_eq!(
        db.get_user(stale.id).await.unwrap().last_result_posted,
        Some(three_days_ago)
    );
}

#[tokio::test]
async fn test_sweep_is_idempotent() {
    let db = create_test_db().await;
    let patient = db.create_patient("p@test.dev", "P").await.unwrap();
    let posted = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
    db.apply_streak(patient.id, 7, posted).await.unwrap();

    let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
    let sweep = StreakSweep::new(db.clone());

    let first = sweep.run(today).await.unwrap();
    assert_eq!(first.zeroed, 1);

    // Already at zero, nothing left to do
    let second = sweep.run(today).await.unwrap();
    assert_eq!(second.zeroed, 0);
    assert_eq!(second.checked, 1);
}
