use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SystemAdmin,
    InstitutionAdmin,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SystemAdmin => "SYSTEM_ADMIN",
            Role::InstitutionAdmin => "INSTITUTION_ADMIN",
            Role::Student => "STUDENT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SYSTEM_ADMIN" => Some(Role::SystemAdmin),
            "INSTITUTION_ADMIN" => Some(Role::InstitutionAdmin),
            "STUDENT" => Some(Role::Student),
            _ => None,
        }
    }
}

/// Verified identity handed over by the authentication layer.
///
/// `id` is the system admin id, the institution admin's account id, or the
/// student id depending on `role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub role: Role,
    pub id: Uuid,
}

/// Per-request authorization context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActorScope {
    pub role: Role,
    pub system_admin_id: Option<Uuid>,
    pub institution_id: Option<Uuid>,
}

impl ActorScope {
    pub fn system_admin(system_admin_id: Uuid) -> Self {
        Self {
            role: Role::SystemAdmin,
            system_admin_id: Some(system_admin_id),
            institution_id: None,
        }
    }

    /// An institution admin whose institution lookup may have come back empty.
    /// Such a scope is kept so the caller can fail closed on it.
    pub fn institution_admin(institution_id: Option<Uuid>) -> Self {
        Self {
            role: Role::InstitutionAdmin,
            system_admin_id: None,
            institution_id,
        }
    }

    pub fn student() -> Self {
        Self {
            role: Role::Student,
            system_admin_id: None,
            institution_id: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        match self.role {
            Role::SystemAdmin => self.system_admin_id.is_some() && self.institution_id.is_none(),
            Role::InstitutionAdmin => {
                self.institution_id.is_some() && self.system_admin_id.is_none()
            }
            Role::Student => self.system_admin_id.is_none() && self.institution_id.is_none(),
        }
    }

    pub fn ensure_valid(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn require_system_admin(&self) -> Result<Uuid> {
        match (self.role, self.system_admin_id) {
            (Role::SystemAdmin, Some(id)) if self.is_valid() => Ok(id),
            _ => Err(AppError::Forbidden),
        }
    }

    pub fn require_institution(&self) -> Result<Uuid> {
        match (self.role, self.institution_id) {
            (Role::InstitutionAdmin, Some(id)) if self.is_valid() => Ok(id),
            _ => Err(AppError::Forbidden),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_validity() {
        assert!(ActorScope::system_admin(Uuid::new_v4()).is_valid());
        assert!(ActorScope::institution_admin(Some(Uuid::new_v4())).is_valid());
        assert!(!ActorScope::institution_admin(None).is_valid());
        assert!(ActorScope::student().is_valid());

        let mixed = ActorScope {
            role: Role::SystemAdmin,
            system_admin_id: Some(Uuid::new_v4()),
            institution_id: Some(Uuid::new_v4()),
        };
        assert!(!mixed.is_valid());
    }

    #[test]
    fn test_role_requirements() {
        let admin = Uuid::new_v4();
        let scope = ActorScope::system_admin(admin);
        assert_eq!(scope.require_system_admin().unwrap(), admin);
        assert!(matches!(scope.require_institution(), Err(AppError::Forbidden)));

        let orphan = ActorScope::institution_admin(None);
        assert!(matches!(orphan.require_institution(), Err(AppError::Forbidden)));
        assert!(matches!(ActorScope::student().require_system_admin(), Err(AppError::Forbidden)));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!(Role::from_str("system_admin"), Some(Role::SystemAdmin));
        assert_eq!(Role::from_str("INSTITUTION_ADMIN"), Some(Role::InstitutionAdmin));
        assert_eq!(Role::from_str("Student"), Some(Role::Student));
        assert_eq!(Role::from_str("teacher"), None);
    }
}
