use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub audience: Audience,
    pub category: Category,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub provenance: Provenance,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notice {
    pub fn is_system(&self) -> bool {
        matches!(self.provenance, Provenance::System(_))
    }

    pub fn is_institutional(&self) -> bool {
        matches!(self.provenance, Provenance::Institution(_))
    }
}

/// Declared readership of a system notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Audience {
    Student,
    Institution,
    Both,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::Student => "STUDENT",
            Audience::Institution => "INSTITUTION",
            Audience::Both => "BOTH",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "STUDENT" => Some(Audience::Student),
            "INSTITUTION" => Some(Audience::Institution),
            "BOTH" => Some(Audience::Both),
            _ => None,
        }
    }

    pub fn reaches_students(&self) -> bool {
        matches!(self, Audience::Student | Audience::Both)
    }

    pub fn reaches_institutions(&self) -> bool {
        matches!(self, Audience::Institution | Audience::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    General,
    Academic,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "GENERAL",
            Category::Academic => "ACADEMIC",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GENERAL" => Some(Category::General),
            "ACADEMIC" => Some(Category::Academic),
            _ => None,
        }
    }
}

/// Who created a notice. Fixed at creation; exactly one owner kind exists,
/// so a notice with both or neither owner cannot be constructed.
///
/// Serialized as the two flat columns `created_by_system_admin_id` and
/// `institution_id`, one of which is always null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ProvenanceColumns", into = "ProvenanceColumns")]
pub enum Provenance {
    System(Uuid),
    Institution(Uuid),
}

impl Provenance {
    pub fn system_admin_id(&self) -> Option<Uuid> {
        match self {
            Provenance::System(id) => Some(*id),
            Provenance::Institution(_) => None,
        }
    }

    pub fn institution_id(&self) -> Option<Uuid> {
        match self {
            Provenance::Institution(id) => Some(*id),
            Provenance::System(_) => None,
        }
    }

    pub fn from_columns(
        created_by_system_admin_id: Option<Uuid>,
        institution_id: Option<Uuid>,
    ) -> Result<Self, ProvenanceError> {
        match (created_by_system_admin_id, institution_id) {
            (Some(admin), None) => Ok(Provenance::System(admin)),
            (None, Some(institution)) => Ok(Provenance::Institution(institution)),
            (Some(_), Some(_)) => Err(ProvenanceError::BothOwners),
            (None, None) => Err(ProvenanceError::NoOwner),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvenanceError {
    BothOwners,
    NoOwner,
}

impl fmt::Display for ProvenanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvenanceError::BothOwners => {
                write!(f, "notice has both a system admin and an institution owner")
            }
            ProvenanceError::NoOwner => write!(f, "notice has no owner"),
        }
    }
}

impl std::error::Error for ProvenanceError {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenanceColumns {
    pub created_by_system_admin_id: Option<Uuid>,
    pub institution_id: Option<Uuid>,
}

impl From<Provenance> for ProvenanceColumns {
    fn from(provenance: Provenance) -> Self {
        Self {
            created_by_system_admin_id: provenance.system_admin_id(),
            institution_id: provenance.institution_id(),
        }
    }
}

impl TryFrom<ProvenanceColumns> for Provenance {
    type Error = ProvenanceError;

    fn try_from(columns: ProvenanceColumns) -> Result<Self, Self::Error> {
        Provenance::from_columns(columns.created_by_system_admin_id, columns.institution_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSystemNoticeRequest {
    #[validate(length(min = 3, max = 255, message = "must be between 3 and 255 characters"))]
    pub title: String,
    #[validate(length(min = 10, message = "must be at least 10 characters"))]
    pub content: String,
    pub audience: Audience,
    pub category: Option<Category>,
}

impl CreateSystemNoticeRequest {
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.content = self.content.trim().to_string();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateInstitutionNoticeRequest {
    #[validate(length(min = 3, max = 255, message = "must be between 3 and 255 characters"))]
    pub title: String,
    #[validate(length(min = 10, message = "must be at least 10 characters"))]
    pub content: String,
}

impl CreateInstitutionNoticeRequest {
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.content = self.content.trim().to_string();
        self
    }
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct UpdateNoticeRequest {
    #[validate(length(min = 3, max = 255, message = "must be between 3 and 255 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 10, message = "must be at least 10 characters"))]
    pub content: Option<String>,
    pub audience: Option<Audience>,
    pub category: Option<Category>,
    pub published: Option<bool>,
}

impl UpdateNoticeRequest {
    pub fn normalized(mut self) -> Self {
        self.title = self.title.map(|t| t.trim().to_string());
        self.content = self.content.map(|c| c.trim().to_string());
        self
    }
}

/// Optional narrowing applied to "my notices" listings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NoticeSearch {
    pub audience: Option<Audience>,
    pub category: Option<Category>,
    pub search: Option<String>,
}
