//! Bulk student import with generated credentials

use super::{internal, Service};
use crate::contract::{
    IssuedCredential, NewUser, Role, School, SchoolClass, SchoolError, StudentRoster,
};
use crate::domain::credentials::{generate_password, username_stem, GENERATED_PASSWORD_LEN};
use crate::domain::repository::UserFilter;
use crate::domain::validation::validate_text;
use std::collections::HashSet;

const DEFAULT_ADDRESS: &str = "No address provided";

impl Service {
    /// Enrol every listed student that is not already in the class.
    /// School and class are created on first use.
    pub async fn import_students(
        &self,
        roster: StudentRoster,
    ) -> Result<Vec<IssuedCredential>, SchoolError> {
        validate_text("school_name", &roster.school_name, 150)?;
        validate_text("class_name", &roster.class_name, 50)?;

        let school = self.school_named(&roster).await?;
        let mut class = self.class_named(&roster, &school).await?;

        let mut enrolled: HashSet<String> = self
            .repos
            .users
            .list(&UserFilter {
                ids: Some(class.student_ids.clone()),
                ..Default::default()
            })
            .await
            .map_err(internal)?
            .iter()
            .map(|user| user.full_name())
            .collect();

        let mut issued = Vec::new();
        for full_name in roster.full_names.iter().map(|name| name.trim()) {
            if full_name.is_empty() {
                continue;
            }
            let (first_name, last_name) = split_full_name(full_name);
            let display_name = format!("{first_name} {last_name}");
            if !enrolled.insert(display_name) {
                tracing::info!(full_name, "student already enrolled, skipped");
                continue;
            }

            let username = self.unique_username(&username_stem(full_name)).await?;
            let password = generate_password(GENERATED_PASSWORD_LEN);
            let student = self
                .create_account(NewUser {
                    email: format!("{username}@{}", roster.email_domain),
                    username: username.clone(),
                    password: password.clone(),
                    first_name,
                    last_name,
                    role: Role::Student,
                    school_id: Some(school.id),
                    is_staff: false,
                })
                .await?;
            class.student_ids.push(student.id);

            if let Some(mut profile) = self
                .repos
                .profiles
                .find_by_user(student.id)
                .await
                .map_err(internal)?
            {
                profile.class_id = Some(class.id);
                self.repos
                    .profiles
                    .update(&profile)
                    .await
                    .map_err(internal)?;
            }

            issued.push(IssuedCredential {
                username,
                password,
                full_name: full_name.to_string(),
                class_name: class.name.clone(),
            });
        }

        if !issued.is_empty() {
            class.student_ids.sort_unstable();
            class.student_ids.dedup();
            self.repos.classes.update(&class).await.map_err(internal)?;
        }
        tracing::info!(
            class = %class.name,
            imported = issued.len(),
            "student import finished"
        );
        Ok(issued)
    }

    async fn school_named(&self, roster: &StudentRoster) -> Result<School, SchoolError> {
        let name = roster.school_name.trim();
        if let Some(school) = self
            .repos
            .schools
            .find_by_name(name)
            .await
            .map_err(internal)?
        {
            return Ok(school);
        }
        let school = self
            .repos
            .schools
            .create(&School {
                id: 0,
                name: name.to_string(),
                address: DEFAULT_ADDRESS.to_string(),
                phone: None,
                email: format!("admin@{}", roster.email_domain),
                website: None,
                established_date: None,
                location: None,
            })
            .await
            .map_err(internal)?;
        tracing::info!(school_id = school.id, name, "school created by import");
        Ok(school)
    }

    async fn class_named(
        &self,
        roster: &StudentRoster,
        school: &School,
    ) -> Result<SchoolClass, SchoolError> {
        let name = roster.class_name.trim();
        if let Some(class) = self
            .repos
            .classes
            .find_by_name(name)
            .await
            .map_err(internal)?
        {
            return Ok(class);
        }
        let class = self
            .repos
            .classes
            .create(&SchoolClass {
                id: 0,
                name: name.to_string(),
                school_id: school.id,
                student_ids: Vec::new(),
                teacher_ids: Vec::new(),
                subject_ids: Vec::new(),
            })
            .await
            .map_err(internal)?;
        tracing::info!(class_id = class.id, name, "class created by import");
        Ok(class)
    }

    /// `stem`, or `stem` followed by the first free counter
    async fn unique_username(&self, stem: &str) -> Result<String, SchoolError> {
        let mut candidate = stem.to_string();
        let mut counter = 1u32;
        while self
            .repos
            .users
            .find_by_username(&candidate)
            .await
            .map_err(internal)?
            .is_some()
        {
            candidate = format!("{stem}{counter}");
            counter += 1;
        }
        Ok(candidate)
    }
}

/// "LastName FirstName Patronymic" into (first, last); a single word is
/// used for both
fn split_full_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split_whitespace();
    let last = parts.next().unwrap_or_default().to_string();
    let first = parts.next().map_or_else(|| last.clone(), str::to_string);
    (first, last)
}
