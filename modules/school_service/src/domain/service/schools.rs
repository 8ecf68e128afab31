//! Schools

use super::{internal, Service};
use crate::contract::{ListQuery, NewSchool, Page, School, SchoolError, SchoolPatch, User};
use crate::domain::access::require_staff;
use crate::domain::validation::{validate_email, validate_point, validate_text, NAME_MAX_LEN};

const ADDRESS_MAX_LEN: usize = 500;

impl Service {
    /// Every authenticated user may browse schools
    pub async fn list_schools(
        &self,
        _actor: &User,
        query: &ListQuery,
    ) -> Result<Page<School>, SchoolError> {
        let schools = self.repos.schools.list().await.map_err(internal)?;
        self.page(schools, query)
    }

    pub async fn get_school(&self, _actor: &User, id: i64) -> Result<School, SchoolError> {
        self.repos
            .schools
            .find_by_id(id)
            .await
            .map_err(internal)?
            .ok_or_else(|| SchoolError::not_found("school", id))
    }

    pub async fn create_school(&self, actor: &User, input: NewSchool) -> Result<School, SchoolError> {
        require_staff(actor)?;
        let school = School {
            id: 0,
            name: input.name.trim().to_string(),
            address: input.address,
            phone: input.phone,
            email: input.email,
            website: input.website,
            established_date: input.established_date,
            location: input.location,
        };
        self.check_school(&school).await?;

        let school = self.repos.schools.create(&school).await.map_err(internal)?;
        tracing::info!(school_id = school.id, name = %school.name, "school created");
        Ok(school)
    }

    pub async fn update_school(
        &self,
        actor: &User,
        id: i64,
        patch: SchoolPatch,
    ) -> Result<School, SchoolError> {
        require_staff(actor)?;
        let mut school = self.get_school(actor, id).await?;

        if let Some(name) = patch.name {
            school.name = name.trim().to_string();
        }
        if let Some(address) = patch.address {
            school.address = address;
        }
        if let Some(phone) = patch.phone {
            school.phone = phone;
        }
        if let Some(email) = patch.email {
            school.email = email;
        }
        if let Some(website) = patch.website {
            school.website = website;
        }
        if let Some(established_date) = patch.established_date {
            school.established_date = established_date;
        }
        if let Some(location) = patch.location {
            school.location = location;
        }
        self.check_school(&school).await?;

        self.repos.schools.update(&school).await.map_err(internal)
    }

    pub async fn delete_school(&self, actor: &User, id: i64) -> Result<(), SchoolError> {
        require_staff(actor)?;
        if !self.repos.schools.delete(id).await.map_err(internal)? {
            return Err(SchoolError::not_found("school", id));
        }
        tracing::info!(school_id = id, "school deleted");
        Ok(())
    }

    async fn check_school(&self, school: &School) -> Result<(), SchoolError> {
        validate_text("name", &school.name, NAME_MAX_LEN)?;
        validate_text("address", &school.address, ADDRESS_MAX_LEN)?;
        validate_email(&school.email)?;
        if let Some(location) = school.location {
            validate_point(location)?;
        }

        let clash = self
            .repos
            .schools
            .find_by_name(&school.name)
            .await
            .map_err(internal)?;
        if clash.is_some_and(|other| other.id != school.id) {
            return Err(SchoolError::validation(format!(
                "A school named '{}' already exists",
                school.name
            )));
        }
        Ok(())
    }

    /// Look up a school referenced by an input field
    pub(super) async fn referenced_school(&self, id: i64) -> Result<School, SchoolError> {
        self.repos
            .schools
            .find_by_id(id)
            .await
            .map_err(internal)?
            .ok_or_else(|| SchoolError::validation(format!("school: unknown school {id}")))
    }
}
