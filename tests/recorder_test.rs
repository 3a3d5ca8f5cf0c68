mod common;

use chrono::{TimeZone, Utc};
use common::{create_test_db, make_content};
use logotask::db::{Db, TaskDetail};
use logotask::errors::AppError;
use logotask::models::{
    Difficulty, SubmittedFourChoice, SubmittedPairing, SubmittedQuestion, TaskKind,
};
use logotask::services::generator::TaskGenerator;
use logotask::services::recorder::ResultRecorder;

async fn setup(kind: TaskKind) -> (Db, i64, i64) {
    let db = create_test_db().await;
    let owner = db
        .create_therapist("catalogue@test.dev", "Catalogue")
        .await
        .unwrap();
    let patient = db
        .create_patient("patient@test.dev", "Patient")
        .await
        .unwrap();
    db.import_content(owner.id, &make_content(40)).await.unwrap();

    let generator = TaskGenerator::new(db.clone(), owner.id);
    let task_id = generator
        .generate("Task", kind, Difficulty::Easy, owner.id, Some(42))
        .await
        .unwrap();

    (db, task_id, patient.id)
}

/// A submission answering every question correctly, built from the stored
/// choices.
fn full_marks(detail: &TaskDetail) -> Vec<SubmittedQuestion> {
    detail
        .questions
        .iter()
        .map(|question| {
            if let Some(fc) = &question.four_choice {
                SubmittedQuestion {
                    pairings: vec![],
                    four_choice: Some(SubmittedFourChoice {
                        chosen_option: fc.correct_option.clone(),
                    }),
                }
            } else {
                SubmittedQuestion {
                    pairings: question
                        .pair_choices
                        .iter()
                        .map(|c| SubmittedPairing {
                            data1: c.data1.clone(),
                            data2: c.data2.clone(),
                        })
                        .collect(),
                    four_choice: None,
                }
            }
        })
        .collect()
}

#[tokio::test]
async fn test_result_replaced_on_resubmission() {
    let (db, task_id, patient) = setup(TaskKind::ConnectPairsTextImage).await;
    let recorder = ResultRecorder::new(db.clone());
    let detail = db.get_task_detail(task_id).await.unwrap();

    let day1 = Utc.with_ymd_and_hms(2026, 3, 5, 9, 0, 0).unwrap();
    let first = recorder
        .record(task_id, patient, full_marks(&detail), day1)
        .await
        .unwrap();
    assert_eq!(first.correct, 10);
    assert_eq!(first.total, 10);

    // Resubmit with one mispairing in the first question
    let mut submission = full_marks(&detail);
    let q0 = &detail.questions[0].pair_choices;
    submission[0].pairings[0] = SubmittedPairing {
        data1: q0[0].data1.clone(),
        data2: q0[2].data2.clone(),
    };
    let day2 = Utc.with_ymd_and_hms(2026, 3, 5, 15, 0, 0).unwrap();
    let second = recorder
        .record(task_id, patient, submission, day2)
        .await
        .unwrap();
    assert_eq!(second.correct, 9);

    // Only the second result remains
    let results = db.list_results_for_task(task_id).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].date_created, day2);

    let stored = db.get_result_detail(results[0].id).await.unwrap();
    assert_eq!(stored.questions.len(), 10);
    assert!(!stored.questions[0].pair_answers[0].is_correct);
    assert!(stored.questions[0].pair_answers[1..]
        .iter()
        .all(|a| a.is_correct));
}

#[tokio::test]
async fn test_correctness_recomputed_from_stored_options() {
    let (db, task_id, patient) = setup(TaskKind::FourChoicesImageTexts).await;
    let recorder = ResultRecorder::new(db.clone());
    let detail = db.get_task_detail(task_id).await.unwrap();

    let mut submission = full_marks(&detail);
    let stored_fc = detail.questions[0].four_choice.as_ref().unwrap();
    submission[0].four_choice = Some(SubmittedFourChoice {
        chosen_option: stored_fc.incorrect1.clone(),
    });

    let now = Utc.with_ymd_and_hms(2026, 3, 5, 9, 0, 0).unwrap();
    let recorded = recorder
        .record(task_id, patient, submission, now)
        .await
        .unwrap();
    assert_eq!(recorded.correct, 9);
    assert_eq!(recorded.total, 10);

    let stored = db.get_result_detail(recorded.result_id).await.unwrap();
    let answer = stored.questions[0].four_choice.as_ref().unwrap();
    // The stored question supplies everything but the choice itself
    assert_eq!(answer.prompt, stored_fc.prompt);
    assert_eq!(answer.correct_option, stored_fc.correct_option);
    assert_eq!(answer.chosen_option, stored_fc.incorrect1);
    assert!(!answer.is_correct);
}

#[tokio::test]
async fn test_submission_must_cover_every_question() {
    let (db, task_id, patient) = setup(TaskKind::ConnectPairsTextText).await;
    let recorder = ResultRecorder::new(db.clone());
    let detail = db.get_task_detail(task_id).await.unwrap();

    let mut submission = full_marks(&detail);
    submission.pop();

    let now = Utc.with_ymd_and_hms(2026, 3, 5, 9, 0, 0).unwrap();
    let err = recorder
        .record(task_id, patient, submission, now)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Nothing was written
    assert!(db.find_result(task_id, patient).await.unwrap().is_none());
}

#[tokio::test]
async fn test_empty_pairings_rejected() {
    let (db, task_id, patient) = setup(TaskKind::ConnectPairsTextText).await;
    let recorder = ResultRecorder::new(db.clone());
    let detail = db.get_task_detail(task_id).await.unwrap();

    let mut submission = full_marks(&detail);
    submission[3].pairings.clear();

    let now = Utc.with_ymd_and_hms(2026, 3, 5, 9, 0, 0).unwrap();
    let err = recorder
        .record(task_id, patient, submission, now)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(db.find_result(task_id, patient).await.unwrap().is_none());
}

#[tokio::test]
async fn test_recording_stamps_the_streak() {
    let (db, task_id, patient) = setup(TaskKind::ConnectPairsTextImage).await;
    let recorder = ResultRecorder::new(db.clone());
    let detail = db.get_task_detail(task_id).await.unwrap();

    let now = Utc.with_ymd_and_hms(2026, 3, 5, 9, 0, 0).unwrap();
    let recorded = recorder
        .record(task_id, patient, full_marks(&detail), now)
        .await
        .unwrap();
    assert_eq!(recorded.day_streak, 1);

    let user = db.get_user(patient).await.unwrap();
    assert_eq!(user.day_streak, 1);
    assert_eq!(user.last_result_posted, Some(now));
}

#[tokio::test]
async fn test_editing_locked_once_results_exist() {
    let (db, task_id, patient) = setup(TaskKind::ConnectPairsTextImage).await;
    let recorder = ResultRecorder::new(db.clone());
    let detail = db.get_task_detail(task_id).await.unwrap();

    let now = Utc.with_ymd_and_hms(2026, 3, 5, 9, 0, 0).unwrap();
    recorder
        .record(task_id, patient, full_marks(&detail), now)
        .await
        .unwrap();

    let owner = detail.task.created_by;
    let generator = TaskGenerator::new(db.clone(), owner);
    let err = generator.regenerate(task_id, None).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}
