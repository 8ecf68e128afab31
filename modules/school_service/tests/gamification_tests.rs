//! Achievements, XP and the cached leaderboard

use school_service::contract::*;

mod common;
use common::{Classroom, TestEnv};

async fn achievement(env: &TestEnv, staff: &User, name: &str, xp: u32) -> Achievement {
    env.service
        .create_achievement(
            staff,
            NewAchievement {
                name: name.to_string(),
                description: format!("{name} badge"),
                icon: None,
                xp_reward: xp,
            },
        )
        .await
        .unwrap()
}

fn profile_id(env: &TestEnv, user: &User) -> i64 {
    env.store.profile_of(user.id).unwrap().id
}

#[tokio::test]
async fn award_adds_xp_and_recomputes_level() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let star = achievement(&env, &room.staff, "Star", 150).await;

    env.service
        .award_achievement(&room.teacher, profile_id(&env, &room.alice), star.id)
        .await
        .unwrap();

    let profile = env.store.profile_of(room.alice.id).unwrap();
    assert_eq!(profile.xp, 150);
    assert_eq!(profile.level, 2);
}

#[tokio::test]
async fn duplicate_award_is_rejected() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let star = achievement(&env, &room.staff, "Star", 10).await;
    let pid = profile_id(&env, &room.alice);

    env.service
        .award_achievement(&room.teacher, pid, star.id)
        .await
        .unwrap();
    let err = env
        .service
        .award_achievement(&room.teacher, pid, star.id)
        .await
        .unwrap_err();
    assert!(matches!(err, SchoolError::Validation { .. }));
    assert_eq!(env.store.profile_of(room.alice.id).unwrap().xp, 10);
}

#[tokio::test]
async fn students_cannot_award() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let star = achievement(&env, &room.staff, "Star", 10).await;

    let err = env
        .service
        .award_achievement(&room.bob, profile_id(&env, &room.bob), star.id)
        .await
        .unwrap_err();
    assert!(matches!(err, SchoolError::Forbidden { .. }));
}

#[tokio::test]
async fn revoking_subtracts_xp() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let star = achievement(&env, &room.staff, "Star", 120).await;

    let award = env
        .service
        .award_achievement(&room.teacher, profile_id(&env, &room.alice), star.id)
        .await
        .unwrap();
    env.service
        .revoke_award(&room.teacher, award.id)
        .await
        .unwrap();

    let profile = env.store.profile_of(room.alice.id).unwrap();
    assert_eq!(profile.xp, 0);
    assert_eq!(profile.level, 1);
}

#[tokio::test]
async fn leaderboard_ranks_students_by_xp() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let star = achievement(&env, &room.staff, "Star", 50).await;
    let comet = achievement(&env, &room.staff, "Comet", 30).await;

    let bob_profile = profile_id(&env, &room.bob);
    env.service
        .award_achievement(&room.teacher, bob_profile, star.id)
        .await
        .unwrap();
    env.service
        .award_achievement(&room.teacher, bob_profile, comet.id)
        .await
        .unwrap();
    env.service
        .award_achievement(&room.teacher, profile_id(&env, &room.alice), comet.id)
        .await
        .unwrap();

    let board = env
        .service
        .leaderboard(&room.parent, LeaderboardMetric::Xp)
        .await
        .unwrap();

    // teachers, parents and staff are not ranked
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].username, "bob");
    assert_eq!(board[0].score, 80.0);
    assert_eq!(board[0].rank, 1);
    assert_eq!(board[1].username, "alice");
    assert_eq!(board[1].rank, 2);
}

#[tokio::test]
async fn ties_break_by_username() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;

    let board = env
        .service
        .leaderboard(&room.alice, LeaderboardMetric::Xp)
        .await
        .unwrap();
    let names: Vec<&str> = board.iter().map(|e| e.username.as_str()).collect();
    assert_eq!(names, vec!["alice", "bob"]);
}

#[tokio::test]
async fn award_invalidates_the_cached_board() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let star = achievement(&env, &room.staff, "Star", 40).await;

    let before = env
        .service
        .leaderboard(&room.alice, LeaderboardMetric::Xp)
        .await
        .unwrap();
    assert!(before.iter().all(|e| e.score == 0.0));
    assert!(env
        .service
        .leaderboard_cache()
        .is_cached(LeaderboardMetric::Xp, env.service.now()));

    env.service
        .award_achievement(&room.teacher, profile_id(&env, &room.bob), star.id)
        .await
        .unwrap();
    assert!(!env
        .service
        .leaderboard_cache()
        .is_cached(LeaderboardMetric::Xp, env.service.now()));

    let after = env
        .service
        .leaderboard(&room.alice, LeaderboardMetric::Xp)
        .await
        .unwrap();
    assert_eq!(after[0].username, "bob");
    assert_eq!(after[0].score, 40.0);
    assert!(env.events.names().contains(&"achievement_awarded"));
}

#[tokio::test]
async fn award_during_a_refresh_is_not_lost() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let star = achievement(&env, &room.staff, "Star", 40).await;
    let bob_profile = profile_id(&env, &room.bob);
    let service = env.service.clone();
    let store = env.store.clone();
    let now = env.service.now();
    // the award lands after the scores were read but before the board is stored
    env.store.after_next_award_scan(move || {
        store.grant(bob_profile, star.id, now);
        service
            .leaderboard_cache()
            .invalidate(LeaderboardMetric::Xp);
    });

    let first = env
        .service
        .leaderboard(&room.alice, LeaderboardMetric::Xp)
        .await
        .unwrap();
    assert!(first.iter().all(|e| e.score == 0.0));
    assert!(!env
        .service
        .leaderboard_cache()
        .is_cached(LeaderboardMetric::Xp, env.service.now()));

    let second = env
        .service
        .leaderboard(&room.alice, LeaderboardMetric::Xp)
        .await
        .unwrap();
    assert_eq!(second[0].username, "bob");
    assert_eq!(second[0].score, 40.0);
}

#[tokio::test]
async fn other_boards_survive_an_award() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let star = achievement(&env, &room.staff, "Star", 40).await;
    let now = env.service.now();

    env.service
        .leaderboard(&room.alice, LeaderboardMetric::Grades)
        .await
        .unwrap();
    env.service
        .award_achievement(&room.teacher, profile_id(&env, &room.bob), star.id)
        .await
        .unwrap();

    assert!(env
        .service
        .leaderboard_cache()
        .is_cached(LeaderboardMetric::Grades, now));
}

#[tokio::test]
async fn cached_board_expires_after_ttl() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;

    env.service
        .leaderboard(&room.alice, LeaderboardMetric::Attendance)
        .await
        .unwrap();
    env.clock.advance(chrono::Duration::seconds(301));

    assert!(!env
        .service
        .leaderboard_cache()
        .is_cached(LeaderboardMetric::Attendance, env.service.now()));
}

#[tokio::test]
async fn attendance_and_grade_boards_use_their_own_scores() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let svc = &env.service;

    for (student, value) in [(&room.alice, 60.0), (&room.alice, 80.0), (&room.bob, 90.0)] {
        svc.create_grade(
            &room.teacher,
            NewGrade {
                student_id: student.id,
                subject_id: room.subject.id,
                value,
                date: None,
                comments: None,
            },
        )
        .await
        .unwrap();
    }
    let grades = svc
        .leaderboard(&room.alice, LeaderboardMetric::Grades)
        .await
        .unwrap();
    assert_eq!(grades[0].username, "bob");
    assert_eq!(grades[1].score, 70.0);

    svc.mark_attendance(
        &room.alice,
        GeoPoint::new(common::SCHOOL_LAT, common::SCHOOL_LON),
    )
    .await
    .unwrap();
    let attendance = svc
        .leaderboard(&room.bob, LeaderboardMetric::Attendance)
        .await
        .unwrap();
    assert_eq!(attendance[0].username, "alice");
    assert_eq!(attendance[0].score, 1.0);
}

#[tokio::test]
async fn profile_rank_is_persisted() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;
    let star = achievement(&env, &room.staff, "Star", 40).await;
    let bob_profile = profile_id(&env, &room.bob);

    env.service
        .award_achievement(&room.teacher, bob_profile, star.id)
        .await
        .unwrap();
    let rank = env
        .service
        .leaderboard_rank(&room.alice, bob_profile)
        .await
        .unwrap();

    assert_eq!(rank.rank, 1);
    assert_eq!(env.store.stored_ranks().len(), 2);

    let err = env
        .service
        .leaderboard_rank(&room.alice, profile_id(&env, &room.teacher))
        .await
        .unwrap_err();
    assert!(matches!(err, SchoolError::NotFound { .. }));
}

#[tokio::test]
async fn profiles_are_private_to_their_owner() {
    let env = TestEnv::new();
    let room = Classroom::build(&env).await;

    let page = env
        .service
        .list_profiles(&room.alice, &ListQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].user_id, room.alice.id);

    let err = env
        .service
        .get_profile(&room.alice, profile_id(&env, &room.bob))
        .await
        .unwrap_err();
    assert!(matches!(err, SchoolError::NotFound { .. }));

    let err = env
        .service
        .update_profile(
            &room.teacher,
            profile_id(&env, &room.bob),
            ProfilePatch {
                xp: Some(1_000),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SchoolError::Forbidden { .. }));
}
