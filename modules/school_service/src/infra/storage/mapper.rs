//! Entity to model mappers
//!
//! Conversions between SeaORM entities and contract models. Active models
//! built from a contract model leave `id` unset when it is 0 so the
//! database assigns it.

use super::entity::attendance as attendance_entity;
use super::entity::coursework::{grade, homework, submitted_homework};
use super::entity::gamification::{achievement, user_achievement, user_profile};
use super::entity::identity::{auth_token, parent_child, user};
use super::entity::notification as notification_entity;
use super::entity::school::{schedule, school, school_class, subject};
use crate::contract::{
    Achievement, Attendance, AttendanceStatus, AuthToken, GeoPoint, Grade, Homework,
    Notification, ParentChild, Role, Schedule, School, SchoolClass, Subject, SubmissionStatus,
    SubmittedHomework, User, UserAchievement, UserProfile,
};
use anyhow::{anyhow, Context};
use sea_orm::ActiveValue::{self, NotSet, Set};

fn key(id: i64) -> ActiveValue<i64> {
    if id == 0 {
        NotSet
    } else {
        Set(id)
    }
}

fn point(latitude: Option<f64>, longitude: Option<f64>) -> Option<GeoPoint> {
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint::new(latitude, longitude)),
        _ => None,
    }
}

fn counter(value: i64, column: &str) -> anyhow::Result<u32> {
    u32::try_from(value).with_context(|| format!("{column} out of range: {value}"))
}

// ===== Identity =====

impl TryFrom<user::Model> for User {
    type Error = anyhow::Error;

    fn try_from(entity: user::Model) -> Result<Self, Self::Error> {
        let role = Role::parse(&entity.role)
            .ok_or_else(|| anyhow!("unknown role '{}' for user {}", entity.role, entity.id))?;
        Ok(Self {
            id: entity.id,
            username: entity.username,
            email: entity.email,
            first_name: entity.first_name,
            last_name: entity.last_name,
            role,
            school_id: entity.school_id,
            is_staff: entity.is_staff,
            is_active: entity.is_active,
            date_joined: entity.date_joined,
        })
    }
}

/// Leaves `password_hash` untouched
impl From<&User> for user::ActiveModel {
    fn from(model: &User) -> Self {
        Self {
            id: key(model.id),
            username: Set(model.username.clone()),
            email: Set(model.email.clone()),
            first_name: Set(model.first_name.clone()),
            last_name: Set(model.last_name.clone()),
            role: Set(model.role.as_str().to_string()),
            school_id: Set(model.school_id),
            is_staff: Set(model.is_staff),
            is_active: Set(model.is_active),
            date_joined: Set(model.date_joined),
            password_hash: NotSet,
        }
    }
}

impl From<auth_token::Model> for AuthToken {
    fn from(entity: auth_token::Model) -> Self {
        Self {
            key: entity.key,
            user_id: entity.user_id,
            created: entity.created,
        }
    }
}

impl From<&AuthToken> for auth_token::ActiveModel {
    fn from(model: &AuthToken) -> Self {
        Self {
            key: Set(model.key.clone()),
            user_id: Set(model.user_id),
            created: Set(model.created),
        }
    }
}

impl From<parent_child::Model> for ParentChild {
    fn from(entity: parent_child::Model) -> Self {
        Self {
            id: entity.id,
            parent_id: entity.parent_id,
            child_id: entity.child_id,
            class_id: entity.class_id,
        }
    }
}

impl From<&ParentChild> for parent_child::ActiveModel {
    fn from(model: &ParentChild) -> Self {
        Self {
            id: key(model.id),
            parent_id: Set(model.parent_id),
            child_id: Set(model.child_id),
            class_id: Set(model.class_id),
        }
    }
}

// ===== School structure =====

impl From<school::Model> for School {
    fn from(entity: school::Model) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            address: entity.address,
            phone: entity.phone,
            email: entity.email,
            website: entity.website,
            established_date: entity.established_date,
            location: point(entity.latitude, entity.longitude),
        }
    }
}

impl From<&School> for school::ActiveModel {
    fn from(model: &School) -> Self {
        Self {
            id: key(model.id),
            name: Set(model.name.clone()),
            address: Set(model.address.clone()),
            phone: Set(model.phone.clone()),
            email: Set(model.email.clone()),
            website: Set(model.website.clone()),
            established_date: Set(model.established_date),
            latitude: Set(model.location.map(|p| p.latitude)),
            longitude: Set(model.location.map(|p| p.longitude)),
        }
    }
}

/// Class row plus its membership ids
pub(crate) fn class_from_parts(
    entity: school_class::Model,
    student_ids: Vec<i64>,
    teacher_ids: Vec<i64>,
    subject_ids: Vec<i64>,
) -> SchoolClass {
    SchoolClass {
        id: entity.id,
        name: entity.name,
        school_id: entity.school_id,
        student_ids,
        teacher_ids,
        subject_ids,
    }
}

impl From<&SchoolClass> for school_class::ActiveModel {
    fn from(model: &SchoolClass) -> Self {
        Self {
            id: key(model.id),
            name: Set(model.name.clone()),
            school_id: Set(model.school_id),
        }
    }
}

impl From<subject::Model> for Subject {
    fn from(entity: subject::Model) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
        }
    }
}

impl From<&Subject> for subject::ActiveModel {
    fn from(model: &Subject) -> Self {
        Self {
            id: key(model.id),
            name: Set(model.name.clone()),
        }
    }
}

impl TryFrom<schedule::Model> for Schedule {
    type Error = anyhow::Error;

    fn try_from(entity: schedule::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entity.id,
            class_id: entity.class_id,
            subject_id: entity.subject_id,
            teacher_id: entity.teacher_id,
            weekday: u8::try_from(entity.weekday)
                .with_context(|| format!("weekday out of range: {}", entity.weekday))?,
            start_time: entity.start_time,
            end_time: entity.end_time,
        })
    }
}

impl From<&Schedule> for schedule::ActiveModel {
    fn from(model: &Schedule) -> Self {
        Self {
            id: key(model.id),
            class_id: Set(model.class_id),
            subject_id: Set(model.subject_id),
            teacher_id: Set(model.teacher_id),
            weekday: Set(i16::from(model.weekday)),
            start_time: Set(model.start_time),
            end_time: Set(model.end_time),
        }
    }
}

// ===== Coursework =====

impl From<homework::Model> for Homework {
    fn from(entity: homework::Model) -> Self {
        Self {
            id: entity.id,
            subject_id: entity.subject_id,
            class_id: entity.class_id,
            description: entity.description,
            due_date: entity.due_date,
            created_at: entity.created_at,
        }
    }
}

impl From<&Homework> for homework::ActiveModel {
    fn from(model: &Homework) -> Self {
        Self {
            id: Set(model.id),
            subject_id: Set(model.subject_id),
            class_id: Set(model.class_id),
            description: Set(model.description.clone()),
            due_date: Set(model.due_date),
            created_at: Set(model.created_at),
        }
    }
}

impl TryFrom<submitted_homework::Model> for SubmittedHomework {
    type Error = anyhow::Error;

    fn try_from(entity: submitted_homework::Model) -> Result<Self, Self::Error> {
        let status = SubmissionStatus::parse(&entity.status)
            .ok_or_else(|| anyhow!("unknown submission status '{}'", entity.status))?;
        Ok(Self {
            id: entity.id,
            homework_id: entity.homework_id,
            student_id: entity.student_id,
            submission_file: entity.submission_file,
            submitted_at: entity.submitted_at,
            status,
            grade: entity.grade,
            feedback: entity.feedback,
        })
    }
}

impl From<&SubmittedHomework> for submitted_homework::ActiveModel {
    fn from(model: &SubmittedHomework) -> Self {
        Self {
            id: key(model.id),
            homework_id: Set(model.homework_id),
            student_id: Set(model.student_id),
            submission_file: Set(model.submission_file.clone()),
            submitted_at: Set(model.submitted_at),
            status: Set(model.status.as_str().to_string()),
            grade: Set(model.grade),
            feedback: Set(model.feedback.clone()),
        }
    }
}

impl From<grade::Model> for Grade {
    fn from(entity: grade::Model) -> Self {
        Self {
            id: entity.id,
            student_id: entity.student_id,
            subject_id: entity.subject_id,
            value: entity.value,
            date: entity.date,
            teacher_id: entity.teacher_id,
            comments: entity.comments,
        }
    }
}

impl From<&Grade> for grade::ActiveModel {
    fn from(model: &Grade) -> Self {
        Self {
            id: key(model.id),
            student_id: Set(model.student_id),
            subject_id: Set(model.subject_id),
            value: Set(model.value),
            date: Set(model.date),
            teacher_id: Set(model.teacher_id),
            comments: Set(model.comments.clone()),
        }
    }
}

// ===== Attendance =====

impl TryFrom<attendance_entity::Model> for Attendance {
    type Error = anyhow::Error;

    fn try_from(entity: attendance_entity::Model) -> Result<Self, Self::Error> {
        let status = AttendanceStatus::parse(&entity.status)
            .ok_or_else(|| anyhow!("unknown attendance status '{}'", entity.status))?;
        Ok(Self {
            id: entity.id,
            student_id: entity.student_id,
            class_id: entity.class_id,
            school_id: entity.school_id,
            date: entity.date,
            status,
            notes: entity.notes,
            location: point(entity.latitude, entity.longitude),
        })
    }
}

impl From<&Attendance> for attendance_entity::ActiveModel {
    fn from(model: &Attendance) -> Self {
        Self {
            id: key(model.id),
            student_id: Set(model.student_id),
            class_id: Set(model.class_id),
            school_id: Set(model.school_id),
            date: Set(model.date),
            status: Set(model.status.as_str().to_string()),
            notes: Set(model.notes.clone()),
            latitude: Set(model.location.map(|p| p.latitude)),
            longitude: Set(model.location.map(|p| p.longitude)),
        }
    }
}

// ===== Gamification =====

impl TryFrom<achievement::Model> for Achievement {
    type Error = anyhow::Error;

    fn try_from(entity: achievement::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entity.id,
            name: entity.name,
            description: entity.description,
            icon: entity.icon,
            xp_reward: counter(entity.xp_reward, "xp_reward")?,
        })
    }
}

impl From<&Achievement> for achievement::ActiveModel {
    fn from(model: &Achievement) -> Self {
        Self {
            id: key(model.id),
            name: Set(model.name.clone()),
            description: Set(model.description.clone()),
            icon: Set(model.icon.clone()),
            xp_reward: Set(i64::from(model.xp_reward)),
        }
    }
}

impl From<user_achievement::Model> for UserAchievement {
    fn from(entity: user_achievement::Model) -> Self {
        Self {
            id: entity.id,
            profile_id: entity.profile_id,
            achievement_id: entity.achievement_id,
            achieved_at: entity.achieved_at,
        }
    }
}

impl From<&UserAchievement> for user_achievement::ActiveModel {
    fn from(model: &UserAchievement) -> Self {
        Self {
            id: key(model.id),
            profile_id: Set(model.profile_id),
            achievement_id: Set(model.achievement_id),
            achieved_at: Set(model.achieved_at),
        }
    }
}

impl TryFrom<user_profile::Model> for UserProfile {
    type Error = anyhow::Error;

    fn try_from(entity: user_profile::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: entity.id,
            user_id: entity.user_id,
            xp: counter(entity.xp, "xp")?,
            level: counter(entity.level, "level")?,
            class_id: entity.class_id,
        })
    }
}

impl From<&UserProfile> for user_profile::ActiveModel {
    fn from(model: &UserProfile) -> Self {
        Self {
            id: key(model.id),
            user_id: Set(model.user_id),
            xp: Set(i64::from(model.xp)),
            level: Set(i64::from(model.level)),
            class_id: Set(model.class_id),
        }
    }
}

// ===== Notifications =====

impl From<notification_entity::Model> for Notification {
    fn from(entity: notification_entity::Model) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            message: entity.message,
            created_at: entity.created_at,
            is_read: entity.is_read,
        }
    }
}

impl From<&Notification> for notification_entity::ActiveModel {
    fn from(model: &Notification) -> Self {
        Self {
            id: key(model.id),
            user_id: Set(model.user_id),
            message: Set(model.message.clone()),
            created_at: Set(model.created_at),
            is_read: Set(model.is_read),
        }
    }
}
