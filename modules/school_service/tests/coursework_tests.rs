//! Homework, submissions, schedules and the bulk student import

use chrono::{Duration, NaiveTime};
use school_service::contract::*;

mod common;
use common::{Classroom, TestEnv};

async fn homework(env: &TestEnv, room: &Classroom) -> Homework {
    env.service
        .create_homework(
            &room.teacher,
            NewHomework {
                subject_id: room.subject.id,
                class_id: room.class.id,
                description: "Exercises 1-10".to_string(),
                due_date: env.service.now() + Duration::days(3),
            },
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn submission_lifecycle() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let hw = homework(&env, &room).await;

    let submission = env
        .service
        .submit_homework(
            &room.alice,
            NewSubmission {
                homework_id: hw.id,
                submission_file: "uploads/alice-hw1.pdf".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(submission.status, SubmissionStatus::Submitted);
    assert_eq!(submission.student_id, room.alice.id);

    let graded = env
        .service
        .review_submission(
            &room.teacher,
            submission.id,
            SubmissionReview {
                grade: 95.0,
                feedback: Some("Well done".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(graded.status, SubmissionStatus::Graded);
    assert_eq!(graded.grade, Some(95.0));

    // graded work is frozen for the student
    let err = env
        .service
        .update_submission(
            &room.alice,
            submission.id,
            SubmissionPatch {
                submission_file: Some("uploads/v2.pdf".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SchoolError::Validation { .. }));
}

#[tokio::test]
async fn homework_is_submitted_once() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let hw = homework(&env, &room).await;
    let input = NewSubmission {
        homework_id: hw.id,
        submission_file: "uploads/bob.pdf".to_string(),
    };

    env.service
        .submit_homework(&room.bob, input.clone())
        .await
        .unwrap();
    let err = env
        .service
        .submit_homework(&room.bob, input)
        .await
        .unwrap_err();
    assert!(matches!(err, SchoolError::Validation { .. }));
}

#[tokio::test]
async fn classmates_do_not_see_each_others_submissions() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let hw = homework(&env, &room).await;

    let bobs = env
        .service
        .submit_homework(
            &room.bob,
            NewSubmission {
                homework_id: hw.id,
                submission_file: "uploads/bob.pdf".to_string(),
            },
        )
        .await
        .unwrap();

    let err = env
        .service
        .get_submission(&room.alice, bobs.id)
        .await
        .unwrap_err();
    assert!(matches!(err, SchoolError::NotFound { .. }));

    let page = env
        .service
        .list_submissions(&room.teacher, &ListQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn homework_is_set_by_the_class_teacher() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let outsider = env
        .user("outsider", Role::Teacher, Some(room.school.id))
        .await;

    let err = env
        .service
        .create_homework(
            &outsider,
            NewHomework {
                subject_id: room.subject.id,
                class_id: room.class.id,
                description: "Read chapter 2".to_string(),
                due_date: env.service.now(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SchoolError::Forbidden { .. }));

    let err = env
        .service
        .create_homework(
            &room.alice,
            NewHomework {
                subject_id: room.subject.id,
                class_id: room.class.id,
                description: "No homework today".to_string(),
                due_date: env.service.now(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SchoolError::Forbidden { .. }));
}

#[tokio::test]
async fn schedule_slots_are_validated() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let at = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
    let lesson = NewSchedule {
        class_id: Some(room.class.id),
        subject_id: room.subject.id,
        teacher_id: room.teacher.id,
        weekday: 1,
        start_time: at(9),
        end_time: at(10),
    };

    env.service
        .create_schedule(&room.teacher, lesson.clone())
        .await
        .unwrap();
    let err = env
        .service
        .create_schedule(&room.teacher, lesson.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, SchoolError::Validation { .. }));

    let backwards = NewSchedule {
        start_time: at(11),
        end_time: at(10),
        ..lesson.clone()
    };
    assert!(env
        .service
        .create_schedule(&room.teacher, backwards)
        .await
        .is_err());

    let sunday_plus_one = NewSchedule {
        weekday: 8,
        start_time: at(12),
        end_time: at(13),
        ..lesson
    };
    assert!(env
        .service
        .create_schedule(&room.teacher, sunday_plus_one)
        .await
        .is_err());
}

// ===== Bulk import =====

fn roster(names: &[&str]) -> StudentRoster {
    StudentRoster {
        school_name: "School 12".to_string(),
        class_name: "5B".to_string(),
        full_names: names.iter().map(|n| n.to_string()).collect(),
        email_domain: "school12.test".to_string(),
    }
}

#[tokio::test]
async fn import_creates_school_class_and_accounts() {
    let env = TestEnv::new();
    let staff = env.staff("admin").await;

    let issued = env
        .service
        .import_students(roster(&["Ivanov Ivan", "Petrova Anna Sergeevna"]))
        .await
        .unwrap();

    assert_eq!(issued.len(), 2);
    assert_eq!(issued[0].username, "ivanov.ivan");
    assert_eq!(issued[1].username, "petrova.anna.sergeevna");
    assert_eq!(issued[0].class_name, "5B");
    assert!(issued.iter().all(|c| c.password.len() == 12));

    let classes = env
        .service
        .list_classes(&staff, &ListQuery::default())
        .await
        .unwrap();
    assert_eq!(classes.total, 1);
    assert_eq!(classes.items[0].student_ids.len(), 2);

    let token = env
        .service
        .login(&issued[0].username, &issued[0].password)
        .await;
    assert!(token.is_ok());
}

#[tokio::test]
async fn reimport_skips_enrolled_students_and_dedups_usernames() {
    let env = TestEnv::new();

    env.service
        .import_students(roster(&["Ivanov Ivan"]))
        .await
        .unwrap();
    let again = env
        .service
        .import_students(roster(&["Ivanov Ivan", "Ivanov  Ivan Petrovich"]))
        .await
        .unwrap();

    // same first and last name counts as already enrolled
    assert!(again.is_empty());

    let mut other_class = roster(&["Ivanov Ivan"]);
    other_class.class_name = "6A".to_string();
    let issued = env.service.import_students(other_class).await.unwrap();
    assert_eq!(issued.len(), 1);
    assert_eq!(issued[0].username, "ivanov.ivan1");
}
