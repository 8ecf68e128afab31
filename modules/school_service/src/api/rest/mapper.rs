//! Mapper implementations for converting between DTOs and contract models
//!
//! This module contains all From/Into implementations for bidirectional
//! conversion between REST DTOs and transport-agnostic contract models.

use super::dto::*;
use crate::contract::{self, GeoPoint, SchoolError};

// ===== Listing =====

impl From<ListParams> for contract::ListQuery {
    fn from(params: ListParams) -> Self {
        let defaults = contract::ListQuery::default();
        Self {
            search: params.search.filter(|s| !s.trim().is_empty()),
            ordering: params.ordering.filter(|s| !s.trim().is_empty()),
            page: params.page.unwrap_or(defaults.page),
            page_size: params.page_size.unwrap_or(defaults.page_size),
        }
    }
}

impl From<&LeaderboardParams> for contract::ListQuery {
    fn from(params: &LeaderboardParams) -> Self {
        ListParams {
            search: params.search.clone(),
            ordering: params.ordering.clone(),
            page: params.page,
            page_size: params.page_size,
        }
        .into()
    }
}

impl<T> PageDto<T> {
    pub fn from_page<M>(page: contract::Page<M>) -> Self
    where
        T: From<M>,
    {
        Self {
            items: page.items.into_iter().map(T::from).collect(),
            total: page.total,
            page: page.page,
            page_size: page.page_size,
        }
    }
}

// ===== Enums =====

impl From<contract::Role> for RoleDto {
    fn from(role: contract::Role) -> Self {
        match role {
            contract::Role::Student => RoleDto::Student,
            contract::Role::Teacher => RoleDto::Teacher,
            contract::Role::Parent => RoleDto::Parent,
        }
    }
}

impl From<RoleDto> for contract::Role {
    fn from(role: RoleDto) -> Self {
        match role {
            RoleDto::Student => contract::Role::Student,
            RoleDto::Teacher => contract::Role::Teacher,
            RoleDto::Parent => contract::Role::Parent,
        }
    }
}

impl From<contract::AttendanceStatus> for AttendanceStatusDto {
    fn from(status: contract::AttendanceStatus) -> Self {
        match status {
            contract::AttendanceStatus::Present => AttendanceStatusDto::Present,
            contract::AttendanceStatus::Absent => AttendanceStatusDto::Absent,
            contract::AttendanceStatus::Excused => AttendanceStatusDto::Excused,
        }
    }
}

impl From<AttendanceStatusDto> for contract::AttendanceStatus {
    fn from(status: AttendanceStatusDto) -> Self {
        match status {
            AttendanceStatusDto::Present => contract::AttendanceStatus::Present,
            AttendanceStatusDto::Absent => contract::AttendanceStatus::Absent,
            AttendanceStatusDto::Excused => contract::AttendanceStatus::Excused,
        }
    }
}

impl From<contract::SubmissionStatus> for SubmissionStatusDto {
    fn from(status: contract::SubmissionStatus) -> Self {
        match status {
            contract::SubmissionStatus::Submitted => SubmissionStatusDto::Submitted,
            contract::SubmissionStatus::Graded => SubmissionStatusDto::Graded,
        }
    }
}

// ===== Accounts =====

impl From<contract::User> for UserDto {
    fn from(user: contract::User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role.into(),
            school_id: user.school_id,
            is_staff: user.is_staff,
            is_active: user.is_active,
            date_joined: user.date_joined,
        }
    }
}

impl From<RegisterRequest> for contract::NewUser {
    fn from(req: RegisterRequest) -> Self {
        Self {
            username: req.username,
            email: req.email,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
            role: req.role.into(),
            school_id: req.school_id,
            is_staff: false,
        }
    }
}

impl From<CreateUserRequest> for contract::NewUser {
    fn from(req: CreateUserRequest) -> Self {
        Self {
            username: req.username,
            email: req.email,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
            role: req.role.into(),
            school_id: req.school_id,
            is_staff: req.is_staff,
        }
    }
}

impl From<UpdateUserRequest> for contract::UserPatch {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            role: req.role.map(Into::into),
            school_id: req.school_id,
            is_staff: req.is_staff,
            is_active: req.is_active,
            password: req.password,
        }
    }
}

impl From<contract::UserOverview> for MeDto {
    fn from(overview: contract::UserOverview) -> Self {
        Self {
            user: overview.user.into(),
            profile: overview.profile.map(Into::into),
        }
    }
}

impl From<contract::ParentChild> for ParentLinkDto {
    fn from(link: contract::ParentChild) -> Self {
        Self {
            id: link.id,
            parent_id: link.parent_id,
            child_id: link.child_id,
            class_id: link.class_id,
        }
    }
}

impl From<CreateParentLinkRequest> for contract::NewParentChild {
    fn from(req: CreateParentLinkRequest) -> Self {
        Self {
            parent_id: req.parent_id,
            child_id: req.child_id,
            class_id: req.class_id,
        }
    }
}

// ===== Schools =====

fn location(latitude: Option<f64>, longitude: Option<f64>) -> Result<Option<GeoPoint>, SchoolError> {
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Ok(Some(GeoPoint::new(latitude, longitude))),
        (None, None) => Ok(None),
        _ => Err(SchoolError::validation(
            "latitude and longitude must be provided together",
        )),
    }
}

impl From<contract::School> for SchoolDto {
    fn from(school: contract::School) -> Self {
        Self {
            id: school.id,
            name: school.name,
            address: school.address,
            phone: school.phone,
            email: school.email,
            website: school.website,
            established_date: school.established_date,
            latitude: school.location.map(|p| p.latitude),
            longitude: school.location.map(|p| p.longitude),
        }
    }
}

impl TryFrom<CreateSchoolRequest> for contract::NewSchool {
    type Error = SchoolError;

    fn try_from(req: CreateSchoolRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            location: location(req.latitude, req.longitude)?,
            name: req.name,
            address: req.address,
            phone: req.phone,
            email: req.email,
            website: req.website,
            established_date: req.established_date,
        })
    }
}

impl TryFrom<UpdateSchoolRequest> for contract::SchoolPatch {
    type Error = SchoolError;

    fn try_from(req: UpdateSchoolRequest) -> Result<Self, Self::Error> {
        let location = match (req.latitude, req.longitude) {
            (None, None) => None,
            (Some(latitude), Some(longitude)) => Some(location(latitude, longitude)?),
            _ => {
                return Err(SchoolError::validation(
                    "latitude and longitude must be updated together",
                ))
            }
        };
        Ok(Self {
            name: req.name,
            address: req.address,
            phone: req.phone,
            email: req.email,
            website: req.website,
            established_date: req.established_date,
            location,
        })
    }
}

// ===== Classes, subjects, schedules =====

impl From<contract::SchoolClass> for ClassDto {
    fn from(class: contract::SchoolClass) -> Self {
        Self {
            id: class.id,
            name: class.name,
            school_id: class.school_id,
            students: class.student_ids,
            teachers: class.teacher_ids,
            subjects: class.subject_ids,
        }
    }
}

impl From<CreateClassRequest> for contract::NewClass {
    fn from(req: CreateClassRequest) -> Self {
        Self {
            name: req.name,
            school_id: req.school_id,
            student_ids: req.students,
            teacher_ids: req.teachers,
            subject_ids: req.subjects,
        }
    }
}

impl From<UpdateClassRequest> for contract::ClassPatch {
    fn from(req: UpdateClassRequest) -> Self {
        Self {
            name: req.name,
            school_id: req.school_id,
            student_ids: req.students,
            teacher_ids: req.teachers,
            subject_ids: req.subjects,
        }
    }
}

impl From<contract::Subject> for SubjectDto {
    fn from(subject: contract::Subject) -> Self {
        Self {
            id: subject.id,
            name: subject.name,
        }
    }
}

impl From<CreateSubjectRequest> for contract::NewSubject {
    fn from(req: CreateSubjectRequest) -> Self {
        Self { name: req.name }
    }
}

impl From<UpdateSubjectRequest> for contract::SubjectPatch {
    fn from(req: UpdateSubjectRequest) -> Self {
        Self { name: req.name }
    }
}

impl From<contract::Schedule> for ScheduleDto {
    fn from(lesson: contract::Schedule) -> Self {
        Self {
            id: lesson.id,
            class_id: lesson.class_id,
            subject_id: lesson.subject_id,
            teacher_id: lesson.teacher_id,
            weekday: lesson.weekday,
            start_time: lesson.start_time,
            end_time: lesson.end_time,
        }
    }
}

impl From<CreateScheduleRequest> for contract::NewSchedule {
    fn from(req: CreateScheduleRequest) -> Self {
        Self {
            class_id: req.class_id,
            subject_id: req.subject_id,
            teacher_id: req.teacher_id,
            weekday: req.weekday,
            start_time: req.start_time,
            end_time: req.end_time,
        }
    }
}

impl From<UpdateScheduleRequest> for contract::SchedulePatch {
    fn from(req: UpdateScheduleRequest) -> Self {
        Self {
            class_id: req.class_id,
            subject_id: req.subject_id,
            teacher_id: req.teacher_id,
            weekday: req.weekday,
            start_time: req.start_time,
            end_time: req.end_time,
        }
    }
}

// ===== Coursework =====

impl From<contract::Homework> for HomeworkDto {
    fn from(homework: contract::Homework) -> Self {
        Self {
            id: homework.id,
            subject_id: homework.subject_id,
            class_id: homework.class_id,
            description: homework.description,
            due_date: homework.due_date,
            created_at: homework.created_at,
        }
    }
}

impl From<CreateHomeworkRequest> for contract::NewHomework {
    fn from(req: CreateHomeworkRequest) -> Self {
        Self {
            subject_id: req.subject_id,
            class_id: req.class_id,
            description: req.description,
            due_date: req.due_date,
        }
    }
}

impl From<UpdateHomeworkRequest> for contract::HomeworkPatch {
    fn from(req: UpdateHomeworkRequest) -> Self {
        Self {
            subject_id: req.subject_id,
            class_id: req.class_id,
            description: req.description,
            due_date: req.due_date,
        }
    }
}

impl From<contract::SubmittedHomework> for SubmissionDto {
    fn from(submission: contract::SubmittedHomework) -> Self {
        Self {
            id: submission.id,
            homework_id: submission.homework_id,
            student_id: submission.student_id,
            submission_file: submission.submission_file,
            submitted_at: submission.submitted_at,
            status: submission.status.into(),
            grade: submission.grade,
            feedback: submission.feedback,
        }
    }
}

impl From<CreateSubmissionRequest> for contract::NewSubmission {
    fn from(req: CreateSubmissionRequest) -> Self {
        Self {
            homework_id: req.homework_id,
            submission_file: req.submission_file,
        }
    }
}

impl From<UpdateSubmissionRequest> for contract::SubmissionPatch {
    fn from(req: UpdateSubmissionRequest) -> Self {
        Self {
            submission_file: req.submission_file,
        }
    }
}

impl From<GradeSubmissionRequest> for contract::SubmissionReview {
    fn from(req: GradeSubmissionRequest) -> Self {
        Self {
            grade: req.grade,
            feedback: req.feedback,
        }
    }
}

impl From<contract::Grade> for GradeDto {
    fn from(grade: contract::Grade) -> Self {
        Self {
            id: grade.id,
            student_id: grade.student_id,
            subject_id: grade.subject_id,
            grade: grade.value,
            date: grade.date,
            teacher_id: grade.teacher_id,
            comments: grade.comments,
        }
    }
}

impl From<CreateGradeRequest> for contract::NewGrade {
    fn from(req: CreateGradeRequest) -> Self {
        Self {
            student_id: req.student_id,
            subject_id: req.subject_id,
            value: req.grade,
            date: req.date,
            comments: req.comments,
        }
    }
}

impl From<UpdateGradeRequest> for contract::GradePatch {
    fn from(req: UpdateGradeRequest) -> Self {
        Self {
            subject_id: req.subject_id,
            value: req.grade,
            date: req.date,
            comments: req.comments,
        }
    }
}

// ===== Attendance =====

impl From<contract::Attendance> for AttendanceDto {
    fn from(row: contract::Attendance) -> Self {
        Self {
            id: row.id,
            student_id: row.student_id,
            class_id: row.class_id,
            school_id: row.school_id,
            date: row.date,
            status: row.status.into(),
            notes: row.notes,
            latitude: row.location.map(|p| p.latitude),
            longitude: row.location.map(|p| p.longitude),
        }
    }
}

impl CreateAttendanceRequest {
    /// Missing `date` resolves to `today`
    pub fn into_input(self, today: chrono::NaiveDate) -> contract::NewAttendance {
        contract::NewAttendance {
            student_id: self.student_id,
            class_id: self.class_id,
            school_id: self.school_id,
            date: self.date.unwrap_or(today),
            status: self.status.into(),
            notes: self.notes,
            location: None,
        }
    }
}

impl From<UpdateAttendanceRequest> for contract::AttendancePatch {
    fn from(req: UpdateAttendanceRequest) -> Self {
        Self {
            status: req.status.map(Into::into),
            notes: req.notes,
        }
    }
}

impl From<contract::CheckIn> for CheckInDto {
    fn from(check_in: contract::CheckIn) -> Self {
        Self {
            attendance: check_in.attendance.into(),
            distance_km: check_in.distance_km,
        }
    }
}

// ===== Gamification =====

impl From<contract::Achievement> for AchievementDto {
    fn from(achievement: contract::Achievement) -> Self {
        Self {
            id: achievement.id,
            name: achievement.name,
            description: achievement.description,
            icon: achievement.icon,
            xp_reward: achievement.xp_reward,
        }
    }
}

impl From<CreateAchievementRequest> for contract::NewAchievement {
    fn from(req: CreateAchievementRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            icon: req.icon,
            xp_reward: req.xp_reward,
        }
    }
}

impl From<UpdateAchievementRequest> for contract::AchievementPatch {
    fn from(req: UpdateAchievementRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            icon: req.icon,
            xp_reward: req.xp_reward,
        }
    }
}

impl From<contract::UserAchievement> for AwardDto {
    fn from(award: contract::UserAchievement) -> Self {
        Self {
            id: award.id,
            profile_id: award.profile_id,
            achievement_id: award.achievement_id,
            achieved_at: award.achieved_at,
        }
    }
}

impl From<contract::UserProfile> for ProfileDto {
    fn from(profile: contract::UserProfile) -> Self {
        Self {
            id: profile.id,
            user_id: profile.user_id,
            xp: profile.xp,
            level: profile.level,
            class_id: profile.class_id,
        }
    }
}

impl From<UpdateProfileRequest> for contract::ProfilePatch {
    fn from(req: UpdateProfileRequest) -> Self {
        Self {
            xp: req.xp,
            level: req.level,
            class_id: req.class_id,
        }
    }
}

impl From<&contract::LeaderboardEntry> for LeaderboardEntryDto {
    fn from(entry: &contract::LeaderboardEntry) -> Self {
        Self {
            rank: entry.rank,
            profile_id: entry.profile_id,
            user_id: entry.user_id,
            username: entry.username.clone(),
            score: entry.score,
        }
    }
}

impl From<contract::LeaderboardRank> for LeaderboardRankDto {
    fn from(rank: contract::LeaderboardRank) -> Self {
        Self {
            profile_id: rank.profile_id,
            rank: rank.rank,
        }
    }
}

// ===== Notifications =====

impl From<contract::Notification> for NotificationDto {
    fn from(notification: contract::Notification) -> Self {
        Self {
            id: notification.id,
            user_id: notification.user_id,
            message: notification.message,
            created_at: notification.created_at,
            is_read: notification.is_read,
        }
    }
}

impl From<CreateNotificationRequest> for contract::NewNotification {
    fn from(req: CreateNotificationRequest) -> Self {
        Self {
            message: req.message,
        }
    }
}

impl From<UpdateNotificationRequest> for contract::NotificationPatch {
    fn from(req: UpdateNotificationRequest) -> Self {
        Self {
            message: req.message,
            is_read: req.is_read,
        }
    }
}
