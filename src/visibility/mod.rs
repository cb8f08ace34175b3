//! Who may touch which notice.
//!
//! Every rule is a pure function of `(scope, notice)`. The service calls these
//! after fetching a record, and the query composer builds storage filters that
//! select exactly the notices `in_feed` accepts.

use crate::domain::{ActorScope, Notice, Provenance, Role};

pub const DEFAULT_FEED_LIMIT: u32 = 50;

/// Read-side knobs shared by the predicates and the query composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoticePolicy {
    pub feed_limit: u32,
    /// Hide `published == false` notices from everyone except their owner.
    pub hide_unpublished: bool,
}

impl Default for NoticePolicy {
    fn default() -> Self {
        Self {
            feed_limit: DEFAULT_FEED_LIMIT,
            hide_unpublished: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    Denied(DenyReason),
}

impl Access {
    pub fn is_granted(&self) -> bool {
        matches!(self, Access::Granted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    InvalidScope,
    ReadOnlyRole,
    NotOwner,
    AudienceMismatch,
    Unpublished,
}

/// True when the scope created the notice.
pub fn owns(scope: &ActorScope, notice: &Notice) -> bool {
    if !scope.is_valid() {
        return false;
    }
    match (scope.role, notice.provenance) {
        (Role::SystemAdmin, Provenance::System(owner)) => scope.system_admin_id == Some(owner),
        (Role::InstitutionAdmin, Provenance::Institution(owner)) => {
            scope.institution_id == Some(owner)
        }
        _ => false,
    }
}

/// Update and delete gate. Only the creator may write.
pub fn can_write(scope: &ActorScope, notice: &Notice) -> Access {
    if !scope.is_valid() {
        return Access::Denied(DenyReason::InvalidScope);
    }
    if scope.role == Role::Student {
        return Access::Denied(DenyReason::ReadOnlyRole);
    }
    if owns(scope, notice) {
        Access::Granted
    } else {
        Access::Denied(DenyReason::NotOwner)
    }
}

/// Single-record read gate.
pub fn can_read(scope: &ActorScope, notice: &Notice, policy: &NoticePolicy) -> Access {
    if !scope.is_valid() {
        return Access::Denied(DenyReason::InvalidScope);
    }
    if owns(scope, notice) {
        return Access::Granted;
    }
    if scope.role == Role::SystemAdmin {
        // System admins read only what they wrote.
        return Access::Denied(DenyReason::NotOwner);
    }
    if !targets(scope, notice) {
        return Access::Denied(DenyReason::AudienceMismatch);
    }
    if policy.hide_unpublished && !notice.published {
        return Access::Denied(DenyReason::Unpublished);
    }
    Access::Granted
}

/// Membership in the scope's aggregate feed, before the feed limit is applied.
pub fn in_feed(scope: &ActorScope, notice: &Notice, policy: &NoticePolicy) -> bool {
    if !scope.is_valid() {
        return false;
    }
    if policy.hide_unpublished && !notice.published {
        return false;
    }
    match scope.role {
        // Cross-institution oversight.
        Role::SystemAdmin => notice.is_institutional(),
        Role::InstitutionAdmin => owns(scope, notice) || targets(scope, notice),
        Role::Student => targets(scope, notice),
    }
}

/// Notices addressed to the scope's role that it did not write itself.
fn targets(scope: &ActorScope, notice: &Notice) -> bool {
    match (scope.role, notice.provenance) {
        (Role::InstitutionAdmin, Provenance::System(_)) => notice.audience.reaches_institutions(),
        (Role::Student, Provenance::System(_)) => notice.audience.reaches_students(),
        (Role::Student, Provenance::Institution(_)) => {
            notice.category == crate::domain::Category::Academic
        }
        _ => false,
    }
}
