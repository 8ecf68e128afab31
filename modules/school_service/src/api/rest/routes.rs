//! Route registration

use super::handlers;
use crate::domain::Service;
use axum::{
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;

/// Register all REST routes under `/api`
pub fn register_routes(router: Router, service: Arc<Service>) -> Router {
    let api = Router::new()
        // Authentication
        .route("/users/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/me", get(handlers::me))
        // Accounts
        .route("/users", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route(
            "/parent-links",
            get(handlers::list_parent_links).post(handlers::create_parent_link),
        )
        .route(
            "/parent-links/{id}",
            get(handlers::get_parent_link).delete(handlers::delete_parent_link),
        )
        // School structure
        .route(
            "/schools",
            get(handlers::list_schools).post(handlers::create_school),
        )
        .route(
            "/schools/{id}",
            get(handlers::get_school)
                .put(handlers::update_school)
                .patch(handlers::update_school)
                .delete(handlers::delete_school),
        )
        .route(
            "/classes",
            get(handlers::list_classes).post(handlers::create_class),
        )
        .route(
            "/classes/{id}",
            get(handlers::get_class)
                .put(handlers::update_class)
                .patch(handlers::update_class)
                .delete(handlers::delete_class),
        )
        .route(
            "/subjects",
            get(handlers::list_subjects).post(handlers::create_subject),
        )
        .route(
            "/subjects/{id}",
            get(handlers::get_subject)
                .put(handlers::update_subject)
                .patch(handlers::update_subject)
                .delete(handlers::delete_subject),
        )
        .route(
            "/schedules",
            get(handlers::list_schedules).post(handlers::create_schedule),
        )
        .route(
            "/schedules/{id}",
            get(handlers::get_schedule)
                .put(handlers::update_schedule)
                .patch(handlers::update_schedule)
                .delete(handlers::delete_schedule),
        )
        // Coursework
        .route(
            "/homeworks",
            get(handlers::list_homework).post(handlers::create_homework),
        )
        .route(
            "/homeworks/{id}",
            get(handlers::get_homework)
                .put(handlers::update_homework)
                .patch(handlers::update_homework)
                .delete(handlers::delete_homework),
        )
        .route(
            "/submitted-homeworks",
            get(handlers::list_submissions).post(handlers::submit_homework),
        )
        .route(
            "/submitted-homeworks/{id}",
            get(handlers::get_submission)
                .put(handlers::update_submission)
                .patch(handlers::update_submission)
                .delete(handlers::delete_submission),
        )
        .route(
            "/submitted-homeworks/{id}/grade",
            post(handlers::grade_submission),
        )
        .route(
            "/grades",
            get(handlers::list_grades).post(handlers::create_grade),
        )
        .route(
            "/grades/{id}",
            get(handlers::get_grade)
                .put(handlers::update_grade)
                .patch(handlers::update_grade)
                .delete(handlers::delete_grade),
        )
        // Attendance
        .route(
            "/attendances",
            get(handlers::list_attendance).post(handlers::create_attendance),
        )
        .route(
            "/attendances/mark_attendance",
            post(handlers::mark_attendance),
        )
        .route("/attendances/today", get(handlers::attendance_today))
        .route(
            "/attendances/{id}",
            get(handlers::get_attendance)
                .put(handlers::update_attendance)
                .patch(handlers::update_attendance)
                .delete(handlers::delete_attendance),
        )
        // Gamification
        .route(
            "/achievements",
            get(handlers::list_achievements).post(handlers::create_achievement),
        )
        .route(
            "/achievements/{id}",
            get(handlers::get_achievement)
                .put(handlers::update_achievement)
                .patch(handlers::update_achievement)
                .delete(handlers::delete_achievement),
        )
        .route(
            "/user-achievements",
            get(handlers::list_awards).post(handlers::award_achievement),
        )
        .route(
            "/user-achievements/{id}",
            get(handlers::get_award).delete(handlers::revoke_award),
        )
        .route("/user-profiles", get(handlers::list_profiles))
        .route(
            "/user-profiles/{id}",
            get(handlers::get_profile)
                .put(handlers::update_profile)
                .patch(handlers::update_profile)
                .delete(handlers::delete_profile),
        )
        .route("/leaderboard", get(handlers::leaderboard))
        .route("/leaderboard/{profile_id}", get(handlers::leaderboard_rank))
        // Notifications
        .route(
            "/notifications",
            get(handlers::list_notifications).post(handlers::create_notification),
        )
        .route(
            "/notifications/{id}",
            get(handlers::get_notification)
                .put(handlers::update_notification)
                .patch(handlers::update_notification)
                .delete(handlers::delete_notification),
        )
        .layer(Extension(service));

    router.nest("/api", api)
}
