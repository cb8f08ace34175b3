//! Storage-neutral filter expressions for notice queries.
//!
//! The composer turns `(scope, intent)` into a [`NoticeQuery`]; the SQLite
//! repository renders it to SQL, and [`Filter::matches`] evaluates the same
//! expression in memory.

use uuid::Uuid;

use crate::{
    domain::{ActorScope, Audience, Category, Notice, NoticeSearch, Role},
    error::Result,
    visibility::NoticePolicy,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    CreatedBySystemAdminId,
    InstitutionId,
    Audience,
    Category,
    Published,
    Title,
    Content,
}

impl Field {
    pub fn column(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::CreatedBySystemAdminId => "created_by_system_admin_id",
            Field::InstitutionId => "institution_id",
            Field::Audience => "audience",
            Field::Category => "category",
            Field::Published => "published",
            Field::Title => "title",
            Field::Content => "content",
        }
    }

    /// Column holding the case-folded copy of a text field.
    pub fn folded_column(&self) -> Option<&'static str> {
        match self {
            Field::Title => Some("title_folded"),
            Field::Content => Some("content_folded"),
            _ => None,
        }
    }
}

/// Unicode case folding shared by search matching and the stored folded
/// columns. SQLite's `lower()` only folds ASCII, so folding happens here.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Uuid(Uuid),
    Audience(Audience),
    Category(Category),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Equals(Field, Value),
    NotNull(Field),
    OneOf(Field, Vec<Value>),
    /// Case-insensitive substring match on either field.
    SubstringOr(Field, Field, String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or(filters)
    }

    pub fn matches(&self, notice: &Notice) -> bool {
        match self {
            Filter::Equals(field, value) => field_value(notice, *field)
                .map(|v| &v == value)
                .unwrap_or(false),
            Filter::NotNull(field) => match field {
                Field::Title | Field::Content => true,
                _ => field_value(notice, *field).is_some(),
            },
            Filter::OneOf(field, values) => field_value(notice, *field)
                .map(|v| values.contains(&v))
                .unwrap_or(false),
            Filter::SubstringOr(a, b, needle) => {
                let needle = fold_case(needle);
                [a, b].iter().any(|field| {
                    text_value(notice, **field)
                        .map(|text| fold_case(text).contains(&needle))
                        .unwrap_or(false)
                })
            }
            Filter::And(filters) => filters.iter().all(|f| f.matches(notice)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(notice)),
        }
    }
}

fn field_value(notice: &Notice, field: Field) -> Option<Value> {
    match field {
        Field::Id => Some(Value::Uuid(notice.id)),
        Field::CreatedBySystemAdminId => notice.provenance.system_admin_id().map(Value::Uuid),
        Field::InstitutionId => notice.provenance.institution_id().map(Value::Uuid),
        Field::Audience => Some(Value::Audience(notice.audience)),
        Field::Category => Some(Value::Category(notice.category)),
        Field::Published => Some(Value::Bool(notice.published)),
        Field::Title | Field::Content => None,
    }
}

fn text_value(notice: &Notice, field: Field) -> Option<&str> {
    match field {
        Field::Title => Some(notice.title.as_str()),
        Field::Content => Some(notice.content.as_str()),
        _ => None,
    }
}

/// Ordering is always `published_at DESC`, ties broken by `id DESC` so a
/// given data set always comes back in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeQuery {
    pub filter: Filter,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone)]
pub enum Intent {
    Mine(NoticeSearch),
    Feed,
}

pub fn compose(scope: &ActorScope, intent: &Intent, policy: &NoticePolicy) -> Result<NoticeQuery> {
    scope.ensure_valid()?;

    match intent {
        Intent::Mine(search) => {
            let mut clauses = vec![ownership_guard(scope)?];
            clauses.extend(search_clauses(search));
            Ok(NoticeQuery {
                filter: Filter::and(clauses),
                limit: None,
            })
        }
        Intent::Feed => {
            let audience = feed_filter(scope)?;
            let filter = if policy.hide_unpublished {
                Filter::and(vec![Filter::Equals(Field::Published, Value::Bool(true)), audience])
            } else {
                audience
            };
            Ok(NoticeQuery {
                filter,
                limit: Some(policy.feed_limit),
            })
        }
    }
}

/// Filter selecting exactly the notices the scope may update or delete.
/// Students own nothing, so their guard matches no row.
pub fn ownership_guard(scope: &ActorScope) -> Result<Filter> {
    match scope.role {
        Role::SystemAdmin => {
            let admin = scope.require_system_admin()?;
            Ok(Filter::and(vec![
                Filter::NotNull(Field::CreatedBySystemAdminId),
                Filter::Equals(Field::CreatedBySystemAdminId, Value::Uuid(admin)),
            ]))
        }
        Role::InstitutionAdmin => {
            let institution = scope.require_institution()?;
            Ok(Filter::Equals(Field::InstitutionId, Value::Uuid(institution)))
        }
        Role::Student => Ok(Filter::Or(Vec::new())),
    }
}

fn feed_filter(scope: &ActorScope) -> Result<Filter> {
    match scope.role {
        Role::SystemAdmin => Ok(Filter::NotNull(Field::InstitutionId)),
        Role::InstitutionAdmin => {
            let institution = scope.require_institution()?;
            Ok(Filter::or(vec![
                system_audience(&[Audience::Institution, Audience::Both]),
                Filter::Equals(Field::InstitutionId, Value::Uuid(institution)),
            ]))
        }
        Role::Student => Ok(Filter::or(vec![
            system_audience(&[Audience::Student, Audience::Both]),
            Filter::and(vec![
                Filter::NotNull(Field::InstitutionId),
                Filter::Equals(Field::Category, Value::Category(Category::Academic)),
            ]),
        ])),
    }
}

fn system_audience(audiences: &[Audience]) -> Filter {
    Filter::and(vec![
        Filter::NotNull(Field::CreatedBySystemAdminId),
        Filter::OneOf(
            Field::Audience,
            audiences.iter().copied().map(Value::Audience).collect(),
        ),
    ])
}

fn search_clauses(search: &NoticeSearch) -> Vec<Filter> {
    let mut clauses = Vec::new();
    if let Some(audience) = search.audience {
        clauses.push(Filter::Equals(Field::Audience, Value::Audience(audience)));
    }
    if let Some(category) = search.category {
        clauses.push(Filter::Equals(Field::Category, Value::Category(category)));
    }
    if let Some(term) = search.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        clauses.push(Filter::SubstringOr(Field::Title, Field::Content, term.to_string()));
    }
    clauses
}
