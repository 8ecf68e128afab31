//! Attendance records and proximity check-in

use super::{internal, Service};
use crate::contract::{
    Attendance, AttendancePatch, CheckIn, GeoPoint, ListQuery, NewAttendance, Page, Role,
    SchoolClass, SchoolError, User,
};
use crate::domain::access::{require_role, require_teacher_or_staff, Scope};
use crate::domain::events::SchoolEvent;
use crate::domain::geo::{distance_km, proximity_status};
use crate::domain::repository::{AttendanceFilter, ClassFilter, UserFilter};
use crate::domain::validation::validate_point;

impl Service {
    pub async fn list_attendance(
        &self,
        actor: &User,
        query: &ListQuery,
    ) -> Result<Page<Attendance>, SchoolError> {
        let scope = self.scope_for(actor).await?;
        let rows = self
            .repos
            .attendance
            .list(&attendance_filter(&scope))
            .await
            .map_err(internal)?;
        self.page(rows, query)
    }

    /// Today's rows in the caller's scope, unpaginated
    pub async fn attendance_today(&self, actor: &User) -> Result<Vec<Attendance>, SchoolError> {
        let scope = self.scope_for(actor).await?;
        let filter = AttendanceFilter {
            date: Some(self.today()),
            ..attendance_filter(&scope)
        };
        self.repos.attendance.list(&filter).await.map_err(internal)
    }

    pub async fn get_attendance(&self, actor: &User, id: i64) -> Result<Attendance, SchoolError> {
        let row = self
            .repos
            .attendance
            .find_by_id(id)
            .await
            .map_err(internal)?
            .ok_or_else(|| SchoolError::not_found("attendance", id))?;

        let scope = self.scope_for(actor).await?;
        let visible = match &scope {
            Scope::All => true,
            Scope::Teacher { class_ids, .. } => class_ids.contains(&row.class_id),
            Scope::Student { .. } | Scope::Parent { .. } => scope
                .family_student_ids()
                .is_some_and(|ids| ids.contains(&row.student_id)),
        };
        if !visible {
            return Err(SchoolError::not_found("attendance", id));
        }
        Ok(row)
    }

    /// Manual entry by a teacher of the class or staff
    pub async fn create_attendance(
        &self,
        actor: &User,
        input: NewAttendance,
    ) -> Result<Attendance, SchoolError> {
        require_teacher_or_staff(actor)?;
        self.referenced_user(input.student_id, Role::Student, "student")
            .await?;
        let class = self.referenced_class(input.class_id).await?;
        if !actor.is_staff && !class.teacher_ids.contains(&actor.id) {
            return Err(SchoolError::forbidden(
                "teachers can only record attendance for classes they teach",
            ));
        }
        if !class.student_ids.contains(&input.student_id) {
            return Err(SchoolError::validation(format!(
                "student {} is not in class '{}'",
                input.student_id, class.name
            )));
        }
        if let Some(school_id) = input.school_id {
            self.referenced_school(school_id).await?;
        }
        if let Some(location) = input.location {
            validate_point(location)?;
        }

        let existing = self
            .repos
            .attendance
            .find_for_day(input.student_id, input.date)
            .await
            .map_err(internal)?;
        if existing.is_some() {
            return Err(SchoolError::validation(
                "Attendance for this student and date already exists",
            ));
        }

        let row = Attendance {
            id: 0,
            student_id: input.student_id,
            class_id: input.class_id,
            school_id: input.school_id.or(Some(class.school_id)),
            date: input.date,
            status: input.status,
            notes: input.notes,
            location: input.location,
        };
        let row = self.repos.attendance.create(&row).await.map_err(internal)?;
        self.attendance_recorded(&row).await;
        Ok(row)
    }

    pub async fn update_attendance(
        &self,
        actor: &User,
        id: i64,
        patch: AttendancePatch,
    ) -> Result<Attendance, SchoolError> {
        let mut row = self.editable_attendance(actor, id).await?;
        if let Some(status) = patch.status {
            row.status = status;
        }
        if let Some(notes) = patch.notes {
            row.notes = notes;
        }
        let row = self.repos.attendance.update(&row).await.map_err(internal)?;
        self.attendance_recorded(&row).await;
        Ok(row)
    }

    pub async fn delete_attendance(&self, actor: &User, id: i64) -> Result<(), SchoolError> {
        let row = self.editable_attendance(actor, id).await?;
        self.repos
            .attendance
            .delete(row.id)
            .await
            .map_err(internal)?;
        self.emit(SchoolEvent::AttendanceDeleted { attendance_id: id })
            .await;
        Ok(())
    }

    async fn editable_attendance(&self, actor: &User, id: i64) -> Result<Attendance, SchoolError> {
        require_teacher_or_staff(actor)?;
        self.get_attendance(actor, id).await
    }

    // ===== Proximity check-in =====

    /// GPS check-in of the calling student for today
    pub async fn mark_attendance(
        &self,
        actor: &User,
        position: GeoPoint,
    ) -> Result<CheckIn, SchoolError> {
        require_role(actor, Role::Student)?;
        validate_point(position)?;
        self.check_in(actor, position).await
    }

    /// Compare a student's position with their school and upsert today's row.
    /// Validation errors describe why the student cannot be checked in.
    pub(crate) async fn check_in(
        &self,
        student: &User,
        position: GeoPoint,
    ) -> Result<CheckIn, SchoolError> {
        let school_id = student
            .school_id
            .ok_or_else(|| SchoolError::validation("User has no school assigned"))?;
        let school = self
            .repos
            .schools
            .find_by_id(school_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| SchoolError::validation("User has no school assigned"))?;
        let school_location = school
            .location
            .ok_or_else(|| SchoolError::validation("School has no coordinates"))?;
        let class = self
            .home_class(student.id)
            .await?
            .ok_or_else(|| SchoolError::validation("Student is not assigned to a class"))?;

        let distance = distance_km(position, school_location);
        let status = proximity_status(distance, self.config.proximity_radius_km);

        let (attendance, created) = self
            .repos
            .attendance
            .upsert(&NewAttendance {
                student_id: student.id,
                class_id: class.id,
                school_id: Some(school.id),
                date: self.today(),
                status,
                notes: None,
                location: Some(position),
            })
            .await
            .map_err(internal)?;

        tracing::info!(
            student_id = student.id,
            distance_km = distance,
            status = status.as_str(),
            created,
            "attendance checked in"
        );
        self.attendance_recorded(&attendance).await;
        Ok(CheckIn {
            attendance,
            created,
            distance_km: distance,
        })
    }

    /// Active students, in id order
    pub(crate) async fn active_students(&self) -> Result<Vec<User>, SchoolError> {
        let students = self
            .repos
            .users
            .list(&UserFilter {
                role: Some(Role::Student),
                ..Default::default()
            })
            .await
            .map_err(internal)?;
        Ok(students.into_iter().filter(|user| user.is_active).collect())
    }

    /// First class (lowest id) the student belongs to
    async fn home_class(&self, student_id: i64) -> Result<Option<SchoolClass>, SchoolError> {
        let classes = self
            .repos
            .classes
            .list(&ClassFilter {
                student_ids: Some(vec![student_id]),
                ..Default::default()
            })
            .await
            .map_err(internal)?;
        Ok(classes.into_iter().min_by_key(|class| class.id))
    }

    async fn attendance_recorded(&self, row: &Attendance) {
        self.emit(SchoolEvent::AttendanceRecorded {
            student_id: row.student_id,
            date: row.date,
            status: row.status,
        })
        .await;
    }
}

fn attendance_filter(scope: &Scope) -> AttendanceFilter {
    match scope {
        Scope::All => AttendanceFilter::default(),
        Scope::Teacher { class_ids, .. } => AttendanceFilter {
            class_ids: Some(class_ids.clone()),
            ..Default::default()
        },
        Scope::Student { .. } | Scope::Parent { .. } => AttendanceFilter {
            student_ids: scope.family_student_ids(),
            ..Default::default()
        },
    }
}
