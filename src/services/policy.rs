//! Capability checks for the signed-in user
//!
//! These decide which actions the client offers. The server remains the
//! authority; a `false` here only stops the client from sending the request.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::{HerdbookError, Result, Role, User};

/// What an action touches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    MilkingSession,
    Cow,
    Blog,
    Category,
    /// A user account, by id
    User(u64),
    /// A user's password, by account id
    Password(u64),
    Export,
}

impl Resource {
    fn describe(self) -> String {
        match self {
            Self::MilkingSession => "milking sessions".to_string(),
            Self::Cow => "cattle".to_string(),
            Self::Blog => "blog posts".to_string(),
            Self::Category => "categories".to_string(),
            Self::User(id) => format!("user {}", id),
            Self::Password(id) => format!("the password of user {}", id),
            Self::Export => "exports".to_string(),
        }
    }
}

/// Whether `user` may create, change or delete `resource`
pub fn can_edit(user: Option<&User>, resource: Resource) -> bool {
    let Some(user) = user else {
        return false;
    };

    match user.role {
        Role::Admin => true,
        Role::Supervisor | Role::Unknown(_) => false,
        Role::Farmer => match resource {
            Resource::MilkingSession | Resource::Cow => true,
            Resource::User(id) | Resource::Password(id) => id == user.id,
            Resource::Blog | Resource::Category | Resource::Export => false,
        },
    }
}

/// Whether `user` may read `resource`
pub fn can_view(user: Option<&User>, resource: Resource) -> bool {
    match user.map(|u| u.role) {
        None | Some(Role::Unknown(_)) => false,
        Some(Role::Farmer) => match resource {
            Resource::User(id) => user.is_some_and(|u| u.id == id),
            Resource::Export => false,
            _ => true,
        },
        Some(Role::Admin) | Some(Role::Supervisor) => true,
    }
}

/// `can_edit` as a `Result`, for use with `?`
pub fn require_edit(user: Option<&User>, resource: Resource) -> Result<()> {
    if can_edit(user, resource) {
        return Ok(());
    }
    let who = user
        .map(|u| format!("{} ({})", u.username, u.role))
        .unwrap_or_else(|| "nobody is signed in".to_string());
    Err(HerdbookError::Forbidden(format!(
        "{} cannot modify {}",
        who,
        resource.describe()
    )))
}

/// `can_view` as a `Result`, for use with `?`
pub fn require_view(user: Option<&User>, resource: Resource) -> Result<()> {
    if can_view(user, resource) {
        return Ok(());
    }
    Err(HerdbookError::Forbidden(format!(
        "{} is not visible to the signed-in user",
        resource.describe()
    )))
}

/// Minimum length for a new password
pub const MIN_PASSWORD_LEN: usize = 8;

fn letter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z]").expect("valid regex"))
}

fn digit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]").expect("valid regex"))
}

/// Client-side strength rules for a new password
pub fn validate_new_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(HerdbookError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if !letter_re().is_match(password) || !digit_re().is_match(password) {
        return Err(HerdbookError::Validation(
            "password must contain a letter and a digit".into(),
        ));
    }
    Ok(())
}
