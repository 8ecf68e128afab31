//! HTTP request handlers - thin layer that delegates to domain service

use super::auth::CurrentUser;
use super::dto::*;
use super::error::{map_domain_error, Problem};
use super::extract::{ValidJson, ValidPath, ValidQuery};
use crate::contract::{LeaderboardMetric, NewSchool, Role, SchoolError, SchoolPatch};
use crate::domain::access::require_role;
use crate::domain::validation::parse_point;
use crate::domain::Service;
use axum::{http::StatusCode, Extension, Json};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

type Svc = Extension<Arc<Service>>;

// ===== Authentication =====

/// Public sign-up; returns the new account and its token
pub async fn register(
    Extension(service): Svc,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), Problem> {
    let (user, token) = service.register(req.into()).await.map_err(map_domain_error)?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            token: token.key,
            user: user.into(),
        }),
    ))
}

pub async fn login(
    Extension(service): Svc,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<Json<TokenDto>, Problem> {
    let token = service
        .login(&req.username, &req.password)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(TokenDto { token: token.key }))
}

pub async fn logout(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
) -> Result<StatusCode, Problem> {
    service.logout(&actor).await.map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
) -> Result<Json<MeDto>, Problem> {
    let overview = service.me(&actor).await.map_err(map_domain_error)?;
    Ok(Json(overview.into()))
}

// ===== Users =====

pub async fn list_users(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidQuery(params): ValidQuery<ListParams>,
) -> Result<Json<PageDto<UserDto>>, Problem> {
    let page = service
        .list_users(&actor, &params.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(PageDto::from_page(page)))
}

pub async fn get_user(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<UserDto>, Problem> {
    let user = service.get_user(&actor, id).await.map_err(map_domain_error)?;
    Ok(Json(user.into()))
}

pub async fn create_user(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidJson(req): ValidJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserDto>), Problem> {
    let user = service
        .create_user(&actor, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn update_user(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
    ValidJson(req): ValidJson<UpdateUserRequest>,
) -> Result<Json<UserDto>, Problem> {
    let user = service
        .update_user(&actor, id, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(user.into()))
}

pub async fn delete_user(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, Problem> {
    service.delete_user(&actor, id).await.map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Parent links =====

pub async fn list_parent_links(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidQuery(params): ValidQuery<ListParams>,
) -> Result<Json<PageDto<ParentLinkDto>>, Problem> {
    let page = service
        .list_parent_links(&actor, &params.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(PageDto::from_page(page)))
}

pub async fn get_parent_link(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<ParentLinkDto>, Problem> {
    let link = service
        .get_parent_link(&actor, id)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(link.into()))
}

pub async fn create_parent_link(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidJson(req): ValidJson<CreateParentLinkRequest>,
) -> Result<(StatusCode, Json<ParentLinkDto>), Problem> {
    let link = service
        .create_parent_link(&actor, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok((StatusCode::CREATED, Json(link.into())))
}

pub async fn delete_parent_link(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, Problem> {
    service
        .delete_parent_link(&actor, id)
        .await
        .map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Schools =====

pub async fn list_schools(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidQuery(params): ValidQuery<ListParams>,
) -> Result<Json<PageDto<SchoolDto>>, Problem> {
    let page = service
        .list_schools(&actor, &params.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(PageDto::from_page(page)))
}

pub async fn get_school(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<SchoolDto>, Problem> {
    let school = service.get_school(&actor, id).await.map_err(map_domain_error)?;
    Ok(Json(school.into()))
}

pub async fn create_school(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidJson(req): ValidJson<CreateSchoolRequest>,
) -> Result<(StatusCode, Json<SchoolDto>), Problem> {
    let input: NewSchool = req.try_into().map_err(map_domain_error)?;
    let school = service
        .create_school(&actor, input)
        .await
        .map_err(map_domain_error)?;
    Ok((StatusCode::CREATED, Json(school.into())))
}

pub async fn update_school(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
    ValidJson(req): ValidJson<UpdateSchoolRequest>,
) -> Result<Json<SchoolDto>, Problem> {
    let patch: SchoolPatch = req.try_into().map_err(map_domain_error)?;
    let school = service
        .update_school(&actor, id, patch)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(school.into()))
}

pub async fn delete_school(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, Problem> {
    service.delete_school(&actor, id).await.map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Classes =====

pub async fn list_classes(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidQuery(params): ValidQuery<ListParams>,
) -> Result<Json<PageDto<ClassDto>>, Problem> {
    let page = service
        .list_classes(&actor, &params.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(PageDto::from_page(page)))
}

pub async fn get_class(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<ClassDto>, Problem> {
    let class = service.get_class(&actor, id).await.map_err(map_domain_error)?;
    Ok(Json(class.into()))
}

pub async fn create_class(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidJson(req): ValidJson<CreateClassRequest>,
) -> Result<(StatusCode, Json<ClassDto>), Problem> {
    let class = service
        .create_class(&actor, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok((StatusCode::CREATED, Json(class.into())))
}

pub async fn update_class(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
    ValidJson(req): ValidJson<UpdateClassRequest>,
) -> Result<Json<ClassDto>, Problem> {
    let class = service
        .update_class(&actor, id, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(class.into()))
}

pub async fn delete_class(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, Problem> {
    service.delete_class(&actor, id).await.map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Subjects =====

pub async fn list_subjects(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidQuery(params): ValidQuery<ListParams>,
) -> Result<Json<PageDto<SubjectDto>>, Problem> {
    let page = service
        .list_subjects(&actor, &params.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(PageDto::from_page(page)))
}

pub async fn get_subject(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<SubjectDto>, Problem> {
    let subject = service.get_subject(&actor, id).await.map_err(map_domain_error)?;
    Ok(Json(subject.into()))
}

pub async fn create_subject(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidJson(req): ValidJson<CreateSubjectRequest>,
) -> Result<(StatusCode, Json<SubjectDto>), Problem> {
    let subject = service
        .create_subject(&actor, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok((StatusCode::CREATED, Json(subject.into())))
}

pub async fn update_subject(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
    ValidJson(req): ValidJson<UpdateSubjectRequest>,
) -> Result<Json<SubjectDto>, Problem> {
    let subject = service
        .update_subject(&actor, id, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(subject.into()))
}

pub async fn delete_subject(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, Problem> {
    service.delete_subject(&actor, id).await.map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Schedules =====

pub async fn list_schedules(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidQuery(params): ValidQuery<ListParams>,
) -> Result<Json<PageDto<ScheduleDto>>, Problem> {
    let page = service
        .list_schedules(&actor, &params.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(PageDto::from_page(page)))
}

pub async fn get_schedule(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<ScheduleDto>, Problem> {
    let lesson = service.get_schedule(&actor, id).await.map_err(map_domain_error)?;
    Ok(Json(lesson.into()))
}

pub async fn create_schedule(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidJson(req): ValidJson<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<ScheduleDto>), Problem> {
    let lesson = service
        .create_schedule(&actor, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok((StatusCode::CREATED, Json(lesson.into())))
}

pub async fn update_schedule(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
    ValidJson(req): ValidJson<UpdateScheduleRequest>,
) -> Result<Json<ScheduleDto>, Problem> {
    let lesson = service
        .update_schedule(&actor, id, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(lesson.into()))
}

pub async fn delete_schedule(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, Problem> {
    service.delete_schedule(&actor, id).await.map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Homework =====

pub async fn list_homework(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidQuery(params): ValidQuery<ListParams>,
) -> Result<Json<PageDto<HomeworkDto>>, Problem> {
    let page = service
        .list_homework(&actor, &params.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(PageDto::from_page(page)))
}

pub async fn get_homework(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<HomeworkDto>, Problem> {
    let homework = service.get_homework(&actor, id).await.map_err(map_domain_error)?;
    Ok(Json(homework.into()))
}

pub async fn create_homework(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidJson(req): ValidJson<CreateHomeworkRequest>,
) -> Result<(StatusCode, Json<HomeworkDto>), Problem> {
    let homework = service
        .create_homework(&actor, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok((StatusCode::CREATED, Json(homework.into())))
}

pub async fn update_homework(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<UpdateHomeworkRequest>,
) -> Result<Json<HomeworkDto>, Problem> {
    let homework = service
        .update_homework(&actor, id, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(homework.into()))
}

pub async fn delete_homework(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<StatusCode, Problem> {
    service.delete_homework(&actor, id).await.map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Submissions =====

pub async fn list_submissions(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidQuery(params): ValidQuery<ListParams>,
) -> Result<Json<PageDto<SubmissionDto>>, Problem> {
    let page = service
        .list_submissions(&actor, &params.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(PageDto::from_page(page)))
}

pub async fn get_submission(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<SubmissionDto>, Problem> {
    let submission = service
        .get_submission(&actor, id)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(submission.into()))
}

pub async fn submit_homework(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidJson(req): ValidJson<CreateSubmissionRequest>,
) -> Result<(StatusCode, Json<SubmissionDto>), Problem> {
    let submission = service
        .submit_homework(&actor, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok((StatusCode::CREATED, Json(submission.into())))
}

pub async fn update_submission(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
    ValidJson(req): ValidJson<UpdateSubmissionRequest>,
) -> Result<Json<SubmissionDto>, Problem> {
    let submission = service
        .update_submission(&actor, id, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(submission.into()))
}

pub async fn delete_submission(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, Problem> {
    service
        .delete_submission(&actor, id)
        .await
        .map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Teacher verdict on a submission
pub async fn grade_submission(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
    ValidJson(req): ValidJson<GradeSubmissionRequest>,
) -> Result<Json<SubmissionDto>, Problem> {
    let submission = service
        .review_submission(&actor, id, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(submission.into()))
}

// ===== Grades =====

pub async fn list_grades(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidQuery(params): ValidQuery<ListParams>,
) -> Result<Json<PageDto<GradeDto>>, Problem> {
    let page = service
        .list_grades(&actor, &params.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(PageDto::from_page(page)))
}

pub async fn get_grade(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<GradeDto>, Problem> {
    let grade = service.get_grade(&actor, id).await.map_err(map_domain_error)?;
    Ok(Json(grade.into()))
}

pub async fn create_grade(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidJson(req): ValidJson<CreateGradeRequest>,
) -> Result<(StatusCode, Json<GradeDto>), Problem> {
    let grade = service
        .create_grade(&actor, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok((StatusCode::CREATED, Json(grade.into())))
}

pub async fn update_grade(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
    ValidJson(req): ValidJson<UpdateGradeRequest>,
) -> Result<Json<GradeDto>, Problem> {
    let grade = service
        .update_grade(&actor, id, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(grade.into()))
}

pub async fn delete_grade(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, Problem> {
    service.delete_grade(&actor, id).await.map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Attendance =====

pub async fn list_attendance(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidQuery(params): ValidQuery<ListParams>,
) -> Result<Json<PageDto<AttendanceDto>>, Problem> {
    let page = service
        .list_attendance(&actor, &params.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(PageDto::from_page(page)))
}

pub async fn attendance_today(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
) -> Result<Json<Vec<AttendanceDto>>, Problem> {
    let rows = service
        .attendance_today(&actor)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

pub async fn get_attendance(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<AttendanceDto>, Problem> {
    let row = service
        .get_attendance(&actor, id)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(row.into()))
}

pub async fn create_attendance(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidJson(req): ValidJson<CreateAttendanceRequest>,
) -> Result<(StatusCode, Json<AttendanceDto>), Problem> {
    let input = req.into_input(service.today());
    let row = service
        .create_attendance(&actor, input)
        .await
        .map_err(map_domain_error)?;
    Ok((StatusCode::CREATED, Json(row.into())))
}

pub async fn update_attendance(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
    ValidJson(req): ValidJson<UpdateAttendanceRequest>,
) -> Result<Json<AttendanceDto>, Problem> {
    let row = service
        .update_attendance(&actor, id, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(row.into()))
}

pub async fn delete_attendance(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, Problem> {
    service
        .delete_attendance(&actor, id)
        .await
        .map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GPS check-in: 201 for a new row, 200 when today's row was overwritten
pub async fn mark_attendance(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidJson(body): ValidJson<Value>,
) -> Result<(StatusCode, Json<CheckInDto>), Problem> {
    // non-students get a 403 whatever the body holds
    require_role(&actor, Role::Student).map_err(map_domain_error)?;
    let position =
        parse_point(body.get("latitude"), body.get("longitude")).map_err(map_domain_error)?;
    let check_in = service
        .mark_attendance(&actor, position)
        .await
        .map_err(map_domain_error)?;
    let status = if check_in.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(check_in.into())))
}

// ===== Achievements =====

pub async fn list_achievements(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidQuery(params): ValidQuery<ListParams>,
) -> Result<Json<PageDto<AchievementDto>>, Problem> {
    let page = service
        .list_achievements(&actor, &params.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(PageDto::from_page(page)))
}

pub async fn get_achievement(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<AchievementDto>, Problem> {
    let achievement = service
        .get_achievement(&actor, id)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(achievement.into()))
}

pub async fn create_achievement(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidJson(req): ValidJson<CreateAchievementRequest>,
) -> Result<(StatusCode, Json<AchievementDto>), Problem> {
    let achievement = service
        .create_achievement(&actor, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok((StatusCode::CREATED, Json(achievement.into())))
}

pub async fn update_achievement(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
    ValidJson(req): ValidJson<UpdateAchievementRequest>,
) -> Result<Json<AchievementDto>, Problem> {
    let achievement = service
        .update_achievement(&actor, id, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(achievement.into()))
}

pub async fn delete_achievement(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, Problem> {
    service
        .delete_achievement(&actor, id)
        .await
        .map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Awards =====

pub async fn list_awards(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidQuery(params): ValidQuery<ListParams>,
) -> Result<Json<PageDto<AwardDto>>, Problem> {
    let page = service
        .list_awards(&actor, &params.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(PageDto::from_page(page)))
}

pub async fn get_award(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<AwardDto>, Problem> {
    let award = service.get_award(&actor, id).await.map_err(map_domain_error)?;
    Ok(Json(award.into()))
}

pub async fn award_achievement(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidJson(req): ValidJson<CreateAwardRequest>,
) -> Result<(StatusCode, Json<AwardDto>), Problem> {
    let award = service
        .award_achievement(&actor, req.profile_id, req.achievement_id)
        .await
        .map_err(map_domain_error)?;
    Ok((StatusCode::CREATED, Json(award.into())))
}

pub async fn revoke_award(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, Problem> {
    service.revoke_award(&actor, id).await.map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Profiles and leaderboard =====

pub async fn list_profiles(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidQuery(params): ValidQuery<ListParams>,
) -> Result<Json<PageDto<ProfileDto>>, Problem> {
    let page = service
        .list_profiles(&actor, &params.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(PageDto::from_page(page)))
}

pub async fn get_profile(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<ProfileDto>, Problem> {
    let profile = service.get_profile(&actor, id).await.map_err(map_domain_error)?;
    Ok(Json(profile.into()))
}

pub async fn update_profile(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
    ValidJson(req): ValidJson<UpdateProfileRequest>,
) -> Result<Json<ProfileDto>, Problem> {
    let profile = service
        .update_profile(&actor, id, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(profile.into()))
}

pub async fn delete_profile(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, Problem> {
    service.delete_profile(&actor, id).await.map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn leaderboard(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidQuery(params): ValidQuery<LeaderboardParams>,
) -> Result<Json<LeaderboardDto>, Problem> {
    let metric = match params.metric.as_deref() {
        None => LeaderboardMetric::Xp,
        Some(name) => LeaderboardMetric::parse(name).ok_or_else(|| {
            map_domain_error(SchoolError::validation(format!(
                "unknown leaderboard metric '{name}', expected xp, attendance or grades"
            )))
        })?,
    };
    let page = service
        .leaderboard_page(&actor, metric, &(&params).into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(LeaderboardDto {
        metric: metric.as_str().to_string(),
        entries: page.items.iter().map(Into::into).collect(),
        total: page.total,
        page: page.page,
        page_size: page.page_size,
    }))
}

pub async fn leaderboard_rank(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(profile_id): ValidPath<i64>,
) -> Result<Json<LeaderboardRankDto>, Problem> {
    let rank = service
        .leaderboard_rank(&actor, profile_id)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(rank.into()))
}

// ===== Notifications =====

pub async fn list_notifications(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidQuery(params): ValidQuery<ListParams>,
) -> Result<Json<PageDto<NotificationDto>>, Problem> {
    let page = service
        .list_notifications(&actor, &params.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(PageDto::from_page(page)))
}

pub async fn get_notification(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<NotificationDto>, Problem> {
    let notification = service
        .get_notification(&actor, id)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(notification.into()))
}

pub async fn create_notification(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidJson(req): ValidJson<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<NotificationDto>), Problem> {
    let notification = service
        .create_notification(&actor, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok((StatusCode::CREATED, Json(notification.into())))
}

pub async fn update_notification(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
    ValidJson(req): ValidJson<UpdateNotificationRequest>,
) -> Result<Json<NotificationDto>, Problem> {
    let notification = service
        .update_notification(&actor, id, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(notification.into()))
}

pub async fn delete_notification(
    Extension(service): Svc,
    CurrentUser(actor): CurrentUser,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, Problem> {
    service
        .delete_notification(&actor, id)
        .await
        .map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}
