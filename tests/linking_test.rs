mod common;

use chrono::{TimeZone, Utc};
use common::{create_test_db, make_content};
use logotask::db::Db;
use logotask::errors::AppError;
use logotask::models::{Difficulty, TaskKind};
use logotask::services::generator::TaskGenerator;
use logotask::services::linking::LinkingManager;

async fn setup() -> (Db, i64, i64, i64) {
    let db = create_test_db().await;
    let catalogue = db
        .create_therapist("catalogue@test.dev", "Catalogue")
        .await
        .unwrap();
    let therapist = db
        .create_therapist("therapist@test.dev", "Therapist")
        .await
        .unwrap();
    let patient = db
        .create_patient("patient@test.dev", "Patient")
        .await
        .unwrap();
    (db, catalogue.id, therapist.id, patient.id)
}

#[tokio::test]
async fn test_link_flow_pending_then_active() {
    let (db, catalogue, therapist_id, patient_id) = setup().await;
    let manager = LinkingManager::new(db.clone(), catalogue);

    let code = db
        .get_user(therapist_id)
        .await
        .unwrap()
        .therapist_code
        .unwrap();
    let linked_to = manager.request_link(patient_id, &code).await.unwrap();
    assert_eq!(linked_to, therapist_id);

    // Pending: assigned but not active
    let patient = db.get_user(patient_id).await.unwrap();
    assert_eq!(patient.assigned_to, Some(therapist_id));
    assert!(!patient.assignment_active);

    let roster = db.list_patients(therapist_id).await.unwrap();
    assert_eq!(roster.len(), 1);
    assert!(!roster[0].assignment_active);

    manager.accept_link(therapist_id, patient_id).await.unwrap();
    let patient = db.get_user(patient_id).await.unwrap();
    assert!(patient.assignment_active);
}

#[tokio::test]
async fn test_unknown_code_rejected() {
    let (db, catalogue, _, patient_id) = setup().await;
    let manager = LinkingManager::new(db.clone(), catalogue);

    let err = manager
        .request_link(patient_id, "0000000000")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::LinkCodeInvalid));

    let patient = db.get_user(patient_id).await.unwrap();
    assert_eq!(patient.assigned_to, None);
}

#[tokio::test]
async fn test_assignment_requires_active_link() {
    let (db, catalogue, therapist_id, patient_id) = setup().await;
    db.import_content(catalogue, &make_content(30)).await.unwrap();
    let generator = TaskGenerator::new(db.clone(), catalogue);
    let task_id = generator
        .generate(
            "Task",
            TaskKind::ConnectPairsTextText,
            Difficulty::Easy,
            catalogue,
            Some(5),
        )
        .await
        .unwrap();

    let manager = LinkingManager::new(db.clone(), catalogue);
    let code = db
        .get_user(therapist_id)
        .await
        .unwrap()
        .therapist_code
        .unwrap();
    manager.request_link(patient_id, &code).await.unwrap();

    // Still pending
    let err = manager
        .assign_task(therapist_id, patient_id, task_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    manager.accept_link(therapist_id, patient_id).await.unwrap();
    manager
        .assign_task(therapist_id, patient_id, task_id)
        .await
        .unwrap();

    let assigned = db.list_assigned_tasks(patient_id).await.unwrap();
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].id, task_id);
}

#[tokio::test]
async fn test_unlink_cascades() {
    let (db, catalogue, therapist_id, patient_id) = setup().await;
    db.import_content(catalogue, &make_content(30)).await.unwrap();
    let generator = TaskGenerator::new(db.clone(), catalogue);
    let task_id = generator
        .generate(
            "Task",
            TaskKind::ConnectPairsTextText,
            Difficulty::Easy,
            catalogue,
            Some(5),
        )
        .await
        .unwrap();

    let manager = LinkingManager::new(db.clone(), catalogue);
    let code = db
        .get_user(therapist_id)
        .await
        .unwrap()
        .therapist_code
        .unwrap();
    manager.request_link(patient_id, &code).await.unwrap();
    manager.accept_link(therapist_id, patient_id).await.unwrap();
    manager
        .assign_task(therapist_id, patient_id, task_id)
        .await
        .unwrap();

    let start = Utc.with_ymd_and_hms(2026, 4, 1, 10, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2026, 4, 1, 11, 0, 0).unwrap();
    manager
        .schedule_meeting(therapist_id, patient_id, "Check-in", start, end)
        .await
        .unwrap();

    manager.unlink(patient_id).await.unwrap();

    let patient = db.get_user(patient_id).await.unwrap();
    assert_eq!(patient.assigned_to, None);
    assert!(!patient.assignment_active);
    assert!(db.list_assigned_tasks(patient_id).await.unwrap().is_empty());
    assert!(db
        .list_meetings_for_patient(patient_id)
        .await
        .unwrap()
        .is_empty());

    // The task itself survives the unlink
    assert_eq!(db.get_task(task_id).await.unwrap().id, task_id);
}

#[tokio::test]
async fn test_therapist_cannot_request_a_link() {
    let (db, catalogue, therapist_id, _) = setup().await;
    let manager = LinkingManager::new(db.clone(), catalogue);

    let code = db
        .get_user(catalogue)
        .await
        .unwrap()
        .therapist_code
        .unwrap();
    let err = manager.request_link(therapist_id, &code).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_meeting_visible_to_both_sides_until_cancelled() {
    let (db, catalogue, therapist_id, patient_id) = setup().await;
    let manager = LinkingManager::new(db.clone(), catalogue);

    let code = db
        .get_user(therapist_id)
        .await
        .unwrap()
        .therapist_code
        .unwrap();
    manager.request_link(patient_id, &code).await.unwrap();
    manager.accept_link(therapist_id, patient_id).await.unwrap();

    let start = Utc.with_ymd_and_hms(2026, 4, 1, 10, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2026, 4, 1, 11, 0, 0).unwrap();
    let meeting_id = manager
        .schedule_meeting(therapist_id, patient_id, "Check-in", start, end)
        .await
        .unwrap();

    assert_eq!(
        db.list_meetings_for_therapist(therapist_id).await.unwrap()[0].id,
        meeting_id
    );
    assert_eq!(
        db.list_meetings_for_patient(patient_id).await.unwrap()[0].id,
        meeting_id
    );

    // The patient may cancel too
    manager.cancel_meeting(patient_id, meeting_id).await.unwrap();
    assert!(matches!(
        db.get_meeting(meeting_id).await.unwrap_err(),
        AppError::NotFound(_)
    ));
}
