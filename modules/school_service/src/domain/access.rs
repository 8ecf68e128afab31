//! Caller scope and permission checks

use crate::contract::{Role, SchoolError, User};

/// Ids a caller may see, resolved once per request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Staff: unrestricted
    All,
    Teacher {
        user_id: i64,
        /// Classes the teacher is assigned to
        class_ids: Vec<i64>,
    },
    Student {
        user_id: i64,
        /// Classes the student belongs to
        class_ids: Vec<i64>,
    },
    Parent {
        user_id: i64,
        child_ids: Vec<i64>,
        /// Classes any child belongs to
        class_ids: Vec<i64>,
    },
}

impl Scope {
    pub fn is_all(&self) -> bool {
        matches!(self, Scope::All)
    }

    /// Visible classes; `None` means every class
    pub fn class_ids(&self) -> Option<&[i64]> {
        match self {
            Scope::All => None,
            Scope::Teacher { class_ids, .. }
            | Scope::Student { class_ids, .. }
            | Scope::Parent { class_ids, .. } => Some(class_ids),
        }
    }

    pub fn sees_class(&self, class_id: i64) -> bool {
        self.class_ids()
            .map_or(true, |ids| ids.contains(&class_id))
    }

    /// Students whose own records (grades, submissions, attendance) are
    /// visible through the family relation: the student, or a parent's
    /// children. `None` for staff and teachers, whose rules differ per
    /// resource.
    pub fn family_student_ids(&self) -> Option<Vec<i64>> {
        match self {
            Scope::Student { user_id, .. } => Some(vec![*user_id]),
            Scope::Parent { child_ids, .. } => Some(child_ids.clone()),
            Scope::All | Scope::Teacher { .. } => None,
        }
    }
}

pub fn require_staff(actor: &User) -> Result<(), SchoolError> {
    if actor.is_staff {
        Ok(())
    } else {
        Err(SchoolError::forbidden("staff privileges required"))
    }
}

/// Exact role match; staff flag does not substitute for a role
pub fn require_role(actor: &User, role: Role) -> Result<(), SchoolError> {
    if actor.role == role {
        Ok(())
    } else {
        Err(SchoolError::forbidden(format!(
            "only a {} can perform this action",
            role.as_str()
        )))
    }
}

pub fn require_teacher_or_staff(actor: &User) -> Result<(), SchoolError> {
    if actor.is_staff || actor.role == Role::Teacher {
        Ok(())
    } else {
        Err(SchoolError::forbidden("teacher or staff privileges required"))
    }
}
