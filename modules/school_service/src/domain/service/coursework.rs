//! Homework, submissions and grades

use super::{internal, Service};
use crate::contract::{
    Grade, GradePatch, Homework, HomeworkPatch, ListQuery, NewGrade, NewHomework, NewSubmission,
    Page, Role, SchoolError, SubmissionPatch, SubmissionReview, SubmissionStatus,
    SubmittedHomework, User,
};
use crate::domain::access::{require_role, require_teacher_or_staff, Scope};
use crate::domain::events::SchoolEvent;
use crate::domain::repository::{ClassFilter, GradeFilter, HomeworkFilter, SubmissionFilter};
use crate::domain::validation::{validate_grade, validate_text};
use uuid::Uuid;

const DESCRIPTION_MAX_LEN: usize = 10_000;
const FILE_REF_MAX_LEN: usize = 500;

impl Service {
    // ===== Homework =====

    pub async fn list_homework(
        &self,
        actor: &User,
        query: &ListQuery,
    ) -> Result<Page<Homework>, SchoolError> {
        let scope = self.scope_for(actor).await?;
        let filter = HomeworkFilter {
            class_ids: scope.class_ids().map(<[i64]>::to_vec),
        };
        let homework = self.repos.homework.list(&filter).await.map_err(internal)?;
        self.page(homework, query)
    }

    pub async fn get_homework(&self, actor: &User, id: Uuid) -> Result<Homework, SchoolError> {
        let scope = self.scope_for(actor).await?;
        let homework = self.homework_or_404(id).await?;
        if !scope.sees_class(homework.class_id) {
            return Err(SchoolError::not_found("homework", id));
        }
        Ok(homework)
    }

    /// Teachers set homework for classes they teach
    pub async fn create_homework(
        &self,
        actor: &User,
        input: NewHomework,
    ) -> Result<Homework, SchoolError> {
        require_teacher_or_staff(actor)?;
        let homework = Homework {
            id: Uuid::new_v4(),
            subject_id: input.subject_id,
            class_id: input.class_id,
            description: input.description,
            due_date: input.due_date,
            created_at: self.now(),
        };
        self.check_homework(actor, &homework).await?;

        let homework = self.repos.homework.create(&homework).await.map_err(internal)?;
        tracing::info!(homework_id = %homework.id, class_id = homework.class_id, "homework set");
        Ok(homework)
    }

    pub async fn update_homework(
        &self,
        actor: &User,
        id: Uuid,
        patch: HomeworkPatch,
    ) -> Result<Homework, SchoolError> {
        let mut homework = self.editable_homework(actor, id).await?;

        if let Some(subject_id) = patch.subject_id {
            homework.subject_id = subject_id;
        }
        if let Some(class_id) = patch.class_id {
            homework.class_id = class_id;
        }
        if let Some(description) = patch.description {
            homework.description = description;
        }
        if let Some(due_date) = patch.due_date {
            homework.due_date = due_date;
        }
        self.check_homework(actor, &homework).await?;

        self.repos.homework.update(&homework).await.map_err(internal)
    }

    pub async fn delete_homework(&self, actor: &User, id: Uuid) -> Result<(), SchoolError> {
        let homework = self.editable_homework(actor, id).await?;
        self.repos
            .homework
            .delete(homework.id)
            .await
            .map_err(internal)?;
        tracing::info!(homework_id = %id, by = actor.id, "homework deleted");
        Ok(())
    }

    async fn editable_homework(&self, actor: &User, id: Uuid) -> Result<Homework, SchoolError> {
        require_teacher_or_staff(actor)?;
        self.get_homework(actor, id).await
    }

    async fn check_homework(&self, actor: &User, homework: &Homework) -> Result<(), SchoolError> {
        validate_text("description", &homework.description, DESCRIPTION_MAX_LEN)?;
        self.referenced_subject(homework.subject_id).await?;
        let class = self.referenced_class(homework.class_id).await?;
        if !actor.is_staff && !class.teacher_ids.contains(&actor.id) {
            return Err(SchoolError::forbidden(
                "teachers can only set homework for classes they teach",
            ));
        }
        Ok(())
    }

    async fn homework_or_404(&self, id: Uuid) -> Result<Homework, SchoolError> {
        self.repos
            .homework
            .find_by_id(id)
            .await
            .map_err(internal)?
            .ok_or_else(|| SchoolError::not_found("homework", id))
    }

    // ===== Submissions =====

    pub async fn list_submissions(
        &self,
        actor: &User,
        query: &ListQuery,
    ) -> Result<Page<SubmittedHomework>, SchoolError> {
        let scope = self.scope_for(actor).await?;
        let filter = match &scope {
            Scope::All => SubmissionFilter::default(),
            Scope::Teacher { class_ids, .. } => SubmissionFilter {
                homework_ids: Some(self.homework_ids_of(class_ids).await?),
                ..Default::default()
            },
            Scope::Student { .. } | Scope::Parent { .. } => SubmissionFilter {
                student_ids: scope.family_student_ids(),
                ..Default::default()
            },
        };
        let submissions = self
            .repos
            .submissions
            .list(&filter)
            .await
            .map_err(internal)?;
        self.page(submissions, query)
    }

    pub async fn get_submission(
        &self,
        actor: &User,
        id: i64,
    ) -> Result<SubmittedHomework, SchoolError> {
        let submission = self
            .repos
            .submissions
            .find_by_id(id)
            .await
            .map_err(internal)?
            .ok_or_else(|| SchoolError::not_found("submission", id))?;

        let scope = self.scope_for(actor).await?;
        let visible = match &scope {
            Scope::All => true,
            Scope::Teacher { class_ids, .. } => {
                let homework = self.homework_or_404(submission.homework_id).await?;
                class_ids.contains(&homework.class_id)
            }
            Scope::Student { .. } | Scope::Parent { .. } => scope
                .family_student_ids()
                .is_some_and(|ids| ids.contains(&submission.student_id)),
        };
        if !visible {
            return Err(SchoolError::not_found("submission", id));
        }
        Ok(submission)
    }

    /// Students hand in homework of their own classes, once per homework
    pub async fn submit_homework(
        &self,
        actor: &User,
        input: NewSubmission,
    ) -> Result<SubmittedHomework, SchoolError> {
        require_role(actor, Role::Student)?;
        validate_text("submission_file", &input.submission_file, FILE_REF_MAX_LEN)?;
        let homework = self.get_homework(actor, input.homework_id).await?;

        let existing = self
            .repos
            .submissions
            .find_for(homework.id, actor.id)
            .await
            .map_err(internal)?;
        if existing.is_some() {
            return Err(SchoolError::validation(
                "This homework has already been submitted",
            ));
        }

        let submission = SubmittedHomework {
            id: 0,
            homework_id: homework.id,
            student_id: actor.id,
            submission_file: input.submission_file,
            submitted_at: self.now(),
            status: SubmissionStatus::Submitted,
            grade: None,
            feedback: None,
        };
        let submission = self
            .repos
            .submissions
            .create(&submission)
            .await
            .map_err(internal)?;
        tracing::info!(
            submission_id = submission.id,
            homework_id = %homework.id,
            "homework submitted"
        );
        Ok(submission)
    }

    /// Owners may replace the file until the submission is graded
    pub async fn update_submission(
        &self,
        actor: &User,
        id: i64,
        patch: SubmissionPatch,
    ) -> Result<SubmittedHomework, SchoolError> {
        let mut submission = self.owned_submission(actor, id).await?;
        if let Some(file) = patch.submission_file {
            validate_text("submission_file", &file, FILE_REF_MAX_LEN)?;
            submission.submission_file = file;
            submission.submitted_at = self.now();
        }
        self.repos
            .submissions
            .update(&submission)
            .await
            .map_err(internal)
    }

    pub async fn delete_submission(&self, actor: &User, id: i64) -> Result<(), SchoolError> {
        let submission = self.owned_submission(actor, id).await?;
        self.repos
            .submissions
            .delete(submission.id)
            .await
            .map_err(internal)?;
        Ok(())
    }

    async fn owned_submission(
        &self,
        actor: &User,
        id: i64,
    ) -> Result<SubmittedHomework, SchoolError> {
        let submission = self.get_submission(actor, id).await?;
        if actor.is_staff {
            return Ok(submission);
        }
        if submission.student_id != actor.id {
            return Err(SchoolError::forbidden(
                "only the submitting student can change a submission",
            ));
        }
        if submission.status == SubmissionStatus::Graded {
            return Err(SchoolError::validation(
                "A graded submission can no longer be changed",
            ));
        }
        Ok(submission)
    }

    /// Grade a submission; teacher of the homework's class or staff
    pub async fn review_submission(
        &self,
        actor: &User,
        id: i64,
        review: SubmissionReview,
    ) -> Result<SubmittedHomework, SchoolError> {
        require_teacher_or_staff(actor)?;
        validate_grade(review.grade)?;
        let mut submission = self.get_submission(actor, id).await?;

        submission.status = SubmissionStatus::Graded;
        submission.grade = Some(review.grade);
        submission.feedback = review.feedback;
        let submission = self
            .repos
            .submissions
            .update(&submission)
            .await
            .map_err(internal)?;

        self.emit(SchoolEvent::SubmissionGraded {
            submission_id: submission.id,
            student_id: submission.student_id,
        })
        .await;
        Ok(submission)
    }

    async fn homework_ids_of(&self, class_ids: &[i64]) -> Result<Vec<Uuid>, SchoolError> {
        if class_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .repos
            .homework
            .list(&HomeworkFilter {
                class_ids: Some(class_ids.to_vec()),
            })
            .await
            .map_err(internal)?
            .into_iter()
            .map(|homework| homework.id)
            .collect())
    }

    // ===== Grades =====

    pub async fn list_grades(
        &self,
        actor: &User,
        query: &ListQuery,
    ) -> Result<Page<Grade>, SchoolError> {
        let scope = self.scope_for(actor).await?;
        let filter = match &scope {
            Scope::All => GradeFilter::default(),
            Scope::Teacher { user_id, .. } => GradeFilter {
                teacher_id: Some(*user_id),
                ..Default::default()
            },
            Scope::Student { .. } | Scope::Parent { .. } => GradeFilter {
                student_ids: scope.family_student_ids(),
                ..Default::default()
            },
        };
        let grades = self.repos.grades.list(&filter).await.map_err(internal)?;
        self.page(grades, query)
    }

    pub async fn get_grade(&self, actor: &User, id: i64) -> Result<Grade, SchoolError> {
        let grade = self
            .repos
            .grades
            .find_by_id(id)
            .await
            .map_err(internal)?
            .ok_or_else(|| SchoolError::not_found("grade", id))?;

        let scope = self.scope_for(actor).await?;
        let visible = match &scope {
            Scope::All => true,
            Scope::Teacher { user_id, .. } => grade.teacher_id == Some(*user_id),
            Scope::Student { .. } | Scope::Parent { .. } => scope
                .family_student_ids()
                .is_some_and(|ids| ids.contains(&grade.student_id)),
        };
        if !visible {
            return Err(SchoolError::not_found("grade", id));
        }
        Ok(grade)
    }

    /// The caller is recorded as grader; teachers grade their own students
    pub async fn create_grade(&self, actor: &User, input: NewGrade) -> Result<Grade, SchoolError> {
        require_teacher_or_staff(actor)?;
        validate_grade(input.value)?;
        self.referenced_user(input.student_id, Role::Student, "student")
            .await?;
        self.referenced_subject(input.subject_id).await?;

        if !actor.is_staff {
            let teaches_student = !self
                .repos
                .classes
                .list(&ClassFilter {
                    student_ids: Some(vec![input.student_id]),
                    teacher_id: Some(actor.id),
                    ..Default::default()
                })
                .await
                .map_err(internal)?
                .is_empty();
            if !teaches_student {
                return Err(SchoolError::forbidden(
                    "teachers can only grade students of their classes",
                ));
            }
        }

        let grade = Grade {
            id: 0,
            student_id: input.student_id,
            subject_id: input.subject_id,
            value: input.value,
            date: input.date.unwrap_or_else(|| self.today()),
            teacher_id: Some(actor.id),
            comments: input.comments,
        };
        let grade = self.repos.grades.create(&grade).await.map_err(internal)?;

        tracing::info!(grade_id = grade.id, student_id = grade.student_id, "grade recorded");
        self.emit(SchoolEvent::GradeRecorded {
            grade_id: grade.id,
            student_id: grade.student_id,
        })
        .await;
        Ok(grade)
    }

    pub async fn update_grade(
        &self,
        actor: &User,
        id: i64,
        patch: GradePatch,
    ) -> Result<Grade, SchoolError> {
        let mut grade = self.editable_grade(actor, id).await?;

        if let Some(subject_id) = patch.subject_id {
            self.referenced_subject(subject_id).await?;
            grade.subject_id = subject_id;
        }
        if let Some(value) = patch.value {
            validate_grade(value)?;
            grade.value = value;
        }
        if let Some(date) = patch.date {
            grade.date = date;
        }
        if let Some(comments) = patch.comments {
            grade.comments = comments;
        }

        let grade = self.repos.grades.update(&grade).await.map_err(internal)?;
        self.emit(SchoolEvent::GradeRecorded {
            grade_id: grade.id,
            student_id: grade.student_id,
        })
        .await;
        Ok(grade)
    }

    pub async fn delete_grade(&self, actor: &User, id: i64) -> Result<(), SchoolError> {
        let grade = self.editable_grade(actor, id).await?;
        self.repos.grades.delete(grade.id).await.map_err(internal)?;
        self.emit(SchoolEvent::GradeDeleted { grade_id: id }).await;
        Ok(())
    }

    /// Staff, or the teacher who assigned the grade
    async fn editable_grade(&self, actor: &User, id: i64) -> Result<Grade, SchoolError> {
        let grade = self.get_grade(actor, id).await?;
        if !actor.is_staff && grade.teacher_id != Some(actor.id) {
            return Err(SchoolError::forbidden("only the grader can change a grade"));
        }
        Ok(grade)
    }
}
