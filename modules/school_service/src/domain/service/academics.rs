//! Classes, subjects and weekly schedules

use super::{internal, normalized, Service};
use crate::contract::{
    ClassPatch, ListQuery, NewClass, NewSchedule, NewSubject, Page, Role, Schedule,
    SchedulePatch, SchoolClass, SchoolError, Subject, SubjectPatch, User,
};
use crate::domain::access::{require_teacher_or_staff, Scope};
use crate::domain::repository::{ClassFilter, ScheduleFilter, SubjectFilter, UserFilter};
use crate::domain::validation::{validate_lesson_slot, validate_text};

const CLASS_NAME_MAX_LEN: usize = 50;
const SUBJECT_NAME_MAX_LEN: usize = 100;

impl Service {
    // ===== Classes =====

    pub async fn list_classes(
        &self,
        actor: &User,
        query: &ListQuery,
    ) -> Result<Page<SchoolClass>, SchoolError> {
        let scope = self.scope_for(actor).await?;
        let filter = ClassFilter {
            ids: scope.class_ids().map(<[i64]>::to_vec),
            ..Default::default()
        };
        let classes = self.repos.classes.list(&filter).await.map_err(internal)?;
        self.page(classes, query)
    }

    pub async fn get_class(&self, actor: &User, id: i64) -> Result<SchoolClass, SchoolError> {
        let scope = self.scope_for(actor).await?;
        let class = self.class_or_404(id).await?;
        if !scope.sees_class(class.id) {
            return Err(SchoolError::not_found("class", id));
        }
        Ok(class)
    }

    /// A teacher creating a class becomes one of its teachers
    pub async fn create_class(
        &self,
        actor: &User,
        input: NewClass,
    ) -> Result<SchoolClass, SchoolError> {
        require_teacher_or_staff(actor)?;

        let mut teacher_ids = input.teacher_ids;
        if !actor.is_staff {
            teacher_ids.push(actor.id);
        }
        let class = SchoolClass {
            id: 0,
            name: input.name.trim().to_string(),
            school_id: input.school_id,
            student_ids: normalized(input.student_ids),
            teacher_ids: normalized(teacher_ids),
            subject_ids: normalized(input.subject_ids),
        };
        self.check_class(&class).await?;

        let class = self.repos.classes.create(&class).await.map_err(internal)?;
        tracing::info!(class_id = class.id, name = %class.name, "class created");
        Ok(class)
    }

    pub async fn update_class(
        &self,
        actor: &User,
        id: i64,
        patch: ClassPatch,
    ) -> Result<SchoolClass, SchoolError> {
        let mut class = self.editable_class(actor, id).await?;

        if let Some(name) = patch.name {
            class.name = name.trim().to_string();
        }
        if let Some(school_id) = patch.school_id {
            class.school_id = school_id;
        }
        if let Some(student_ids) = patch.student_ids {
            class.student_ids = normalized(student_ids);
        }
        if let Some(teacher_ids) = patch.teacher_ids {
            class.teacher_ids = normalized(teacher_ids);
        }
        if let Some(subject_ids) = patch.subject_ids {
            class.subject_ids = normalized(subject_ids);
        }
        self.check_class(&class).await?;

        self.repos.classes.update(&class).await.map_err(internal)
    }

    pub async fn delete_class(&self, actor: &User, id: i64) -> Result<(), SchoolError> {
        let class = self.editable_class(actor, id).await?;
        self.repos
            .classes
            .delete(class.id)
            .await
            .map_err(internal)?;
        tracing::info!(class_id = id, by = actor.id, "class deleted");
        Ok(())
    }

    /// Staff, or a teacher of the class
    async fn editable_class(&self, actor: &User, id: i64) -> Result<SchoolClass, SchoolError> {
        require_teacher_or_staff(actor)?;
        let class = self.get_class(actor, id).await?;
        if !actor.is_staff && !class.teacher_ids.contains(&actor.id) {
            return Err(SchoolError::forbidden("only teachers of this class can change it"));
        }
        Ok(class)
    }

    async fn check_class(&self, class: &SchoolClass) -> Result<(), SchoolError> {
        validate_text("name", &class.name, CLASS_NAME_MAX_LEN)?;
        self.referenced_school(class.school_id).await?;

        let clash = self
            .repos
            .classes
            .find_by_name(&class.name)
            .await
            .map_err(internal)?;
        if clash.is_some_and(|other| other.id != class.id) {
            return Err(SchoolError::validation(format!(
                "A class named '{}' already exists",
                class.name
            )));
        }

        self.check_members(&class.student_ids, Role::Student, "students")
            .await?;
        self.check_members(&class.teacher_ids, Role::Teacher, "teachers")
            .await?;

        if !class.subject_ids.is_empty() {
            let found = self
                .repos
                .subjects
                .list(&SubjectFilter {
                    ids: Some(class.subject_ids.clone()),
                })
                .await
                .map_err(internal)?;
            if found.len() != class.subject_ids.len() {
                return Err(SchoolError::validation("subjects: unknown subject id"));
            }
        }
        Ok(())
    }

    async fn check_members(
        &self,
        ids: &[i64],
        role: Role,
        field: &str,
    ) -> Result<(), SchoolError> {
        if ids.is_empty() {
            return Ok(());
        }
        let users = self
            .repos
            .users
            .list(&UserFilter {
                ids: Some(ids.to_vec()),
                ..Default::default()
            })
            .await
            .map_err(internal)?;
        if users.len() != ids.len() {
            return Err(SchoolError::validation(format!("{field}: unknown user id")));
        }
        if let Some(wrong) = users.iter().find(|user| user.role != role) {
            return Err(SchoolError::validation(format!(
                "{field}: user {} is not a {}",
                wrong.id,
                role.as_str()
            )));
        }
        Ok(())
    }

    async fn class_or_404(&self, id: i64) -> Result<SchoolClass, SchoolError> {
        self.repos
            .classes
            .find_by_id(id)
            .await
            .map_err(internal)?
            .ok_or_else(|| SchoolError::not_found("class", id))
    }

    /// Look up a class referenced by an input field
    pub(super) async fn referenced_class(&self, id: i64) -> Result<SchoolClass, SchoolError> {
        self.repos
            .classes
            .find_by_id(id)
            .await
            .map_err(internal)?
            .ok_or_else(|| SchoolError::validation(format!("class: unknown class {id}")))
    }

    // ===== Subjects =====

    pub async fn list_subjects(
        &self,
        actor: &User,
        query: &ListQuery,
    ) -> Result<Page<Subject>, SchoolError> {
        let scope = self.scope_for(actor).await?;
        let filter = SubjectFilter {
            ids: self.visible_subject_ids(&scope).await?,
        };
        let subjects = self.repos.subjects.list(&filter).await.map_err(internal)?;
        self.page(subjects, query)
    }

    pub async fn get_subject(&self, actor: &User, id: i64) -> Result<Subject, SchoolError> {
        let scope = self.scope_for(actor).await?;
        let subject = self.subject_or_404(id).await?;
        let visible = self
            .visible_subject_ids(&scope)
            .await?
            .map_or(true, |ids| ids.contains(&subject.id));
        if !visible {
            return Err(SchoolError::not_found("subject", id));
        }
        Ok(subject)
    }

    pub async fn create_subject(
        &self,
        actor: &User,
        input: NewSubject,
    ) -> Result<Subject, SchoolError> {
        require_teacher_or_staff(actor)?;
        let subject = Subject {
            id: 0,
            name: input.name.trim().to_string(),
        };
        self.check_subject(&subject).await?;

        let subject = self.repos.subjects.create(&subject).await.map_err(internal)?;
        tracing::info!(subject_id = subject.id, name = %subject.name, "subject created");
        Ok(subject)
    }

    pub async fn update_subject(
        &self,
        actor: &User,
        id: i64,
        patch: SubjectPatch,
    ) -> Result<Subject, SchoolError> {
        require_teacher_or_staff(actor)?;
        let mut subject = self.get_subject(actor, id).await?;
        if let Some(name) = patch.name {
            subject.name = name.trim().to_string();
        }
        self.check_subject(&subject).await?;
        self.repos.subjects.update(&subject).await.map_err(internal)
    }

    pub async fn delete_subject(&self, actor: &User, id: i64) -> Result<(), SchoolError> {
        require_teacher_or_staff(actor)?;
        let subject = self.get_subject(actor, id).await?;
        self.repos
            .subjects
            .delete(subject.id)
            .await
            .map_err(internal)?;
        tracing::info!(subject_id = id, by = actor.id, "subject deleted");
        Ok(())
    }

    /// Subjects of visible classes; teachers also see subjects they hold
    /// lessons in. `None` means every subject.
    async fn visible_subject_ids(
        &self,
        scope: &Scope,
    ) -> Result<Option<Vec<i64>>, SchoolError> {
        let Some(class_ids) = scope.class_ids() else {
            return Ok(None);
        };

        let mut ids: Vec<i64> = if class_ids.is_empty() {
            Vec::new()
        } else {
            self.repos
                .classes
                .list(&ClassFilter {
                    ids: Some(class_ids.to_vec()),
                    ..Default::default()
                })
                .await
                .map_err(internal)?
                .into_iter()
                .flat_map(|class| class.subject_ids)
                .collect()
        };

        if let Scope::Teacher { user_id, .. } = scope {
            let lessons = self
                .repos
                .schedules
                .list(&ScheduleFilter {
                    teacher_id: Some(*user_id),
                    ..Default::default()
                })
                .await
                .map_err(internal)?;
            ids.extend(lessons.into_iter().map(|lesson| lesson.subject_id));
        }
        Ok(Some(normalized(ids)))
    }

    async fn check_subject(&self, subject: &Subject) -> Result<(), SchoolError> {
        validate_text("name", &subject.name, SUBJECT_NAME_MAX_LEN)?;
        let clash = self
            .repos
            .subjects
            .find_by_name(&subject.name)
            .await
            .map_err(internal)?;
        if clash.is_some_and(|other| other.id != subject.id) {
            return Err(SchoolError::validation(format!(
                "A subject named '{}' already exists",
                subject.name
            )));
        }
        Ok(())
    }

    async fn subject_or_404(&self, id: i64) -> Result<Subject, SchoolError> {
        self.repos
            .subjects
            .find_by_id(id)
            .await
            .map_err(internal)?
            .ok_or_else(|| SchoolError::not_found("subject", id))
    }

    /// Look up a subject referenced by an input field
    pub(super) async fn referenced_subject(&self, id: i64) -> Result<Subject, SchoolError> {
        self.repos
            .subjects
            .find_by_id(id)
            .await
            .map_err(internal)?
            .ok_or_else(|| SchoolError::validation(format!("subject: unknown subject {id}")))
    }

    // ===== Schedules =====

    pub async fn list_schedules(
        &self,
        actor: &User,
        query: &ListQuery,
    ) -> Result<Page<Schedule>, SchoolError> {
        let filter = match self.scope_for(actor).await? {
            Scope::All => ScheduleFilter::default(),
            Scope::Teacher { user_id, .. } => ScheduleFilter {
                teacher_id: Some(user_id),
                ..Default::default()
            },
            scope => ScheduleFilter {
                class_ids: scope.class_ids().map(<[i64]>::to_vec),
                ..Default::default()
            },
        };
        let lessons = self.repos.schedules.list(&filter).await.map_err(internal)?;
        self.page(lessons, query)
    }

    pub async fn get_schedule(&self, actor: &User, id: i64) -> Result<Schedule, SchoolError> {
        let lesson = self
            .repos
            .schedules
            .find_by_id(id)
            .await
            .map_err(internal)?
            .ok_or_else(|| SchoolError::not_found("schedule", id))?;

        let visible = match self.scope_for(actor).await? {
            Scope::All => true,
            Scope::Teacher { user_id, .. } => lesson.teacher_id == user_id,
            scope => lesson.class_id.is_some_and(|class_id| scope.sees_class(class_id)),
        };
        if !visible {
            return Err(SchoolError::not_found("schedule", id));
        }
        Ok(lesson)
    }

    /// Teachers can only schedule their own lessons
    pub async fn create_schedule(
        &self,
        actor: &User,
        input: NewSchedule,
    ) -> Result<Schedule, SchoolError> {
        require_teacher_or_staff(actor)?;
        if !actor.is_staff && input.teacher_id != actor.id {
            return Err(SchoolError::forbidden(
                "teachers can only create their own lessons",
            ));
        }
        let lesson = Schedule {
            id: 0,
            class_id: input.class_id,
            subject_id: input.subject_id,
            teacher_id: input.teacher_id,
            weekday: input.weekday,
            start_time: input.start_time,
            end_time: input.end_time,
        };
        self.check_schedule(&lesson).await?;

        let lesson = self.repos.schedules.create(&lesson).await.map_err(internal)?;
        tracing::info!(
            schedule_id = lesson.id,
            teacher_id = lesson.teacher_id,
            "lesson scheduled"
        );
        Ok(lesson)
    }

    pub async fn update_schedule(
        &self,
        actor: &User,
        id: i64,
        patch: SchedulePatch,
    ) -> Result<Schedule, SchoolError> {
        let mut lesson = self.editable_schedule(actor, id).await?;

        if let Some(class_id) = patch.class_id {
            lesson.class_id = class_id;
        }
        if let Some(subject_id) = patch.subject_id {
            lesson.subject_id = subject_id;
        }
        if let Some(teacher_id) = patch.teacher_id {
            if !actor.is_staff && teacher_id != actor.id {
                return Err(SchoolError::forbidden(
                    "teachers cannot hand lessons to other teachers",
                ));
            }
            lesson.teacher_id = teacher_id;
        }
        if let Some(weekday) = patch.weekday {
            lesson.weekday = weekday;
        }
        if let Some(start_time) = patch.start_time {
            lesson.start_time = start_time;
        }
        if let Some(end_time) = patch.end_time {
            lesson.end_time = end_time;
        }
        self.check_schedule(&lesson).await?;

        self.repos.schedules.update(&lesson).await.map_err(internal)
    }

    pub async fn delete_schedule(&self, actor: &User, id: i64) -> Result<(), SchoolError> {
        let lesson = self.editable_schedule(actor, id).await?;
        self.repos
            .schedules
            .delete(lesson.id)
            .await
            .map_err(internal)?;
        Ok(())
    }

    /// Staff, or the teacher holding the lesson
    async fn editable_schedule(&self, actor: &User, id: i64) -> Result<Schedule, SchoolError> {
        require_teacher_or_staff(actor)?;
        let lesson = self.get_schedule(actor, id).await?;
        if !actor.is_staff && lesson.teacher_id != actor.id {
            return Err(SchoolError::forbidden("only the lesson's teacher can change it"));
        }
        Ok(lesson)
    }

    async fn check_schedule(&self, lesson: &Schedule) -> Result<(), SchoolError> {
        validate_lesson_slot(lesson.weekday, lesson.start_time, lesson.end_time)?;
        self.referenced_subject(lesson.subject_id).await?;
        self.referenced_user(lesson.teacher_id, Role::Teacher, "teacher")
            .await?;
        if let Some(class_id) = lesson.class_id {
            self.referenced_class(class_id).await?;
        }

        let clash = self
            .repos
            .schedules
            .find_slot(
                lesson.class_id,
                lesson.subject_id,
                lesson.weekday,
                lesson.start_time,
            )
            .await
            .map_err(internal)?;
        if clash.is_some_and(|other| other.id != lesson.id) {
            return Err(SchoolError::validation(
                "This lesson slot is already scheduled",
            ));
        }
        Ok(())
    }
}
