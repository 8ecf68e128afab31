//! Account administration and parent links

use super::{internal, Service};
use crate::contract::{
    ListQuery, NewParentChild, NewUser, Page, ParentChild, Role, SchoolError, User, UserPatch,
};
use crate::domain::access::{require_staff, Scope};
use crate::domain::credentials::hash_password;
use crate::domain::events::SchoolEvent;
use crate::domain::repository::{ParentChildFilter, UserFilter};
use crate::domain::validation::{validate_email, validate_password, validate_text, NAME_MAX_LEN};

impl Service {
    // ===== Users (staff only) =====

    pub async fn list_users(
        &self,
        actor: &User,
        query: &ListQuery,
    ) -> Result<Page<User>, SchoolError> {
        require_staff(actor)?;
        let users = self
            .repos
            .users
            .list(&UserFilter::default())
            .await
            .map_err(internal)?;
        self.page(users, query)
    }

    pub async fn get_user(&self, actor: &User, id: i64) -> Result<User, SchoolError> {
        require_staff(actor)?;
        self.user_or_404(id).await
    }

    /// Staff-created account; may carry the staff flag
    pub async fn create_user(&self, actor: &User, input: NewUser) -> Result<User, SchoolError> {
        require_staff(actor)?;
        let user = self.create_account(input).await?;
        tracing::info!(user_id = user.id, by = actor.id, "user created");
        Ok(user)
    }

    /// Create a staff account without a caller (first-run bootstrap)
    pub async fn bootstrap_staff(&self, input: NewUser) -> Result<User, SchoolError> {
        let user = self
            .create_account(NewUser {
                is_staff: true,
                ..input
            })
            .await?;
        tracing::info!(user_id = user.id, username = %user.username, "staff account created");
        Ok(user)
    }

    pub async fn update_user(
        &self,
        actor: &User,
        id: i64,
        patch: UserPatch,
    ) -> Result<User, SchoolError> {
        require_staff(actor)?;
        let mut user = self.user_or_404(id).await?;

        if let Some(email) = patch.email {
            validate_email(&email)?;
            user.email = email;
        }
        if let Some(first_name) = patch.first_name {
            validate_text("first_name", &first_name, NAME_MAX_LEN)?;
            user.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = patch.last_name {
            validate_text("last_name", &last_name, NAME_MAX_LEN)?;
            user.last_name = last_name.trim().to_string();
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        if let Some(school_id) = patch.school_id {
            if let Some(school_id) = school_id {
                self.referenced_school(school_id).await?;
            }
            user.school_id = school_id;
        }
        if let Some(is_staff) = patch.is_staff {
            user.is_staff = is_staff;
        }
        if let Some(is_active) = patch.is_active {
            user.is_active = is_active;
        }
        if let Some(password) = patch.password {
            validate_password(&password)?;
            let hash = tokio::task::spawn_blocking(move || hash_password(&password))
                .await
                .map_err(|e| internal(e.into()))?
                .map_err(internal)?;
            self.repos
                .users
                .set_password_hash(user.id, &hash)
                .await
                .map_err(internal)?;
        }

        let user = self.repos.users.update(&user).await.map_err(internal)?;
        self.emit(SchoolEvent::UserUpdated { user_id: user.id }).await;
        Ok(user)
    }

    /// Remove an account; profile, token, awards and notifications go with it
    pub async fn delete_user(&self, actor: &User, id: i64) -> Result<(), SchoolError> {
        require_staff(actor)?;
        if !self.repos.users.delete(id).await.map_err(internal)? {
            return Err(SchoolError::not_found("user", id));
        }
        tracing::info!(user_id = id, by = actor.id, "user deleted");
        self.emit(SchoolEvent::UserDeleted { user_id: id }).await;
        Ok(())
    }

    async fn user_or_404(&self, id: i64) -> Result<User, SchoolError> {
        self.repos
            .users
            .find_by_id(id)
            .await
            .map_err(internal)?
            .ok_or_else(|| SchoolError::not_found("user", id))
    }

    // ===== Parent links =====

    pub async fn list_parent_links(
        &self,
        actor: &User,
        query: &ListQuery,
    ) -> Result<Page<ParentChild>, SchoolError> {
        let filter = match self.scope_for(actor).await? {
            Scope::All => ParentChildFilter::default(),
            Scope::Parent { user_id, .. } => ParentChildFilter {
                parent_id: Some(user_id),
                ..Default::default()
            },
            Scope::Student { user_id, .. } => ParentChildFilter {
                child_id: Some(user_id),
                ..Default::default()
            },
            Scope::Teacher { .. } => return self.page(Vec::new(), query),
        };
        let links = self.repos.families.list(&filter).await.map_err(internal)?;
        self.page(links, query)
    }

    pub async fn get_parent_link(&self, actor: &User, id: i64) -> Result<ParentChild, SchoolError> {
        let link = self
            .repos
            .families
            .find_by_id(id)
            .await
            .map_err(internal)?
            .ok_or_else(|| SchoolError::not_found("parent link", id))?;
        let visible = actor.is_staff || link.parent_id == actor.id || link.child_id == actor.id;
        if !visible {
            return Err(SchoolError::not_found("parent link", id));
        }
        Ok(link)
    }

    pub async fn create_parent_link(
        &self,
        actor: &User,
        input: NewParentChild,
    ) -> Result<ParentChild, SchoolError> {
        require_staff(actor)?;
        self.referenced_user(input.parent_id, Role::Parent, "parent").await?;
        self.referenced_user(input.child_id, Role::Student, "child").await?;
        let class = self.referenced_class(input.class_id).await?;
        if !class.student_ids.contains(&input.child_id) {
            return Err(SchoolError::validation(format!(
                "child {} is not a student of class '{}'",
                input.child_id, class.name
            )));
        }

        let duplicate = self
            .repos
            .families
            .list(&ParentChildFilter {
                parent_id: Some(input.parent_id),
                child_id: Some(input.child_id),
            })
            .await
            .map_err(internal)?
            .iter()
            .any(|link| link.class_id == input.class_id);
        if duplicate {
            return Err(SchoolError::validation("This parent link already exists"));
        }

        let link = self
            .repos
            .families
            .create(&ParentChild {
                id: 0,
                parent_id: input.parent_id,
                child_id: input.child_id,
                class_id: input.class_id,
            })
            .await
            .map_err(internal)?;
        tracing::info!(
            link_id = link.id,
            parent_id = link.parent_id,
            child_id = link.child_id,
            "parent link created"
        );
        Ok(link)
    }

    pub async fn delete_parent_link(&self, actor: &User, id: i64) -> Result<(), SchoolError> {
        require_staff(actor)?;
        if !self.repos.families.delete(id).await.map_err(internal)? {
            return Err(SchoolError::not_found("parent link", id));
        }
        Ok(())
    }
}
