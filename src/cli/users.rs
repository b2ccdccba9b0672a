//! `herdbook users`, `login`, `whoami` and `logout`

use clap::{Args, Subcommand};

use super::output::{page_footer, print_ok, print_table};
use super::sessions::acknowledge;
use super::App;
use crate::services::policy::{self, Resource};
use crate::services::query::{filter_items, page_count, paginate, Page, UserSort};
use crate::types::{HerdbookError, PasswordChange, Result, Role, User, UserUpdate};

#[derive(Args, Debug)]
pub struct UsersArgs {
    #[command(subcommand)]
    command: UsersCommand,
}

#[derive(Subcommand, Debug)]
enum UsersCommand {
    /// List accounts visible to the signed-in user
    List {
        #[arg(short = 'q', long, default_value = "")]
        search: String,

        #[arg(long, value_enum, default_value_t = UserSort::Name)]
        sort: UserSort,

        #[arg(long, default_value_t = 1)]
        page: usize,
    },

    /// Show one account
    Show {
        #[arg(value_name = "ID")]
        id: u64,
    },

    /// Change account fields
    Edit {
        #[arg(value_name = "ID")]
        id: u64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// 1 admin, 2 supervisor, 3 farmer
        #[arg(long, value_name = "ROLE_ID")]
        role: Option<u64>,
    },

    /// Delete an account
    Delete {
        #[arg(value_name = "ID")]
        id: u64,
    },

    /// Ask the server to reset an account's password
    ResetPassword {
        #[arg(value_name = "ID")]
        id: u64,
    },

    /// Change a password (default: your own)
    ChangePassword {
        #[arg(value_name = "ID")]
        id: Option<u64>,
        #[arg(long)]
        current: String,
        #[arg(long = "new")]
        new_password: String,
    },
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account to act as
    #[arg(long = "user", value_name = "ID")]
    user_id: u64,
}

fn user_row(user: &User) -> Vec<String> {
    vec![
        user.id.to_string(),
        user.name.clone(),
        user.username.clone(),
        user.role.label().to_string(),
        user.email.clone().unwrap_or_else(|| "-".into()),
    ]
}

const USER_HEADERS: [&str; 5] = ["ID", "Name", "Username", "Role", "Email"];

fn build_update(
    name: Option<String>,
    username: Option<String>,
    email: Option<String>,
    role: Option<u64>,
) -> Result<UserUpdate> {
    let role = match role.map(Role::from_id) {
        Some(Role::Unknown(id)) => {
            return Err(HerdbookError::Validation(format!("unknown role id {}", id)))
        }
        other => other,
    };
    let update = UserUpdate {
        name,
        username,
        email,
        role,
    };
    if update.is_empty() {
        return Err(HerdbookError::Validation(
            "nothing to change; pass --name, --username, --email or --role".into(),
        ));
    }
    Ok(update)
}

/// Only an administrator may hand out roles
fn require_role_change(app: &App, update: &UserUpdate) -> Result<()> {
    if update.role.is_none() || app.ctx.user().is_some_and(|u| u.role == Role::Admin) {
        return Ok(());
    }
    Err(HerdbookError::Forbidden(
        "only an administrator can change roles".into(),
    ))
}

impl UsersArgs {
    pub async fn run(self, app: &App) -> Result<()> {
        match self.command {
            UsersCommand::List { search, sort, page } => {
                let users = app.api.list_users().await?;
                let mut matched =
                    filter_items(&users, &search, |u| app.ctx.can_view(Resource::User(u.id)));
                sort.sort(&mut matched);

                let page_size = app.config.page_size;
                if app.json {
                    return print_ok(Page::of(&matched, page, page_size));
                }
                let rows: Vec<Vec<String>> = paginate(&matched, page, page_size)
                    .iter()
                    .map(|u| user_row(u))
                    .collect();
                print_table(&USER_HEADERS, &rows);
                println!(
                    "{}",
                    page_footer(page, page_count(matched.len(), page_size), matched.len())
                );
                Ok(())
            }
            UsersCommand::Show { id } => {
                app.ctx.require_view(Resource::User(id))?;
                let user = app.api.get_user(id).await?;
                if app.json {
                    return print_ok(user);
                }
                print_table(&USER_HEADERS, &[user_row(&user)]);
                Ok(())
            }
            UsersCommand::Edit {
                id,
                name,
                username,
                email,
                role,
            } => {
                app.ctx.require_edit(Resource::User(id))?;
                let update = build_update(name, username, email, role)?;
                require_role_change(app, &update)?;
                let message = app.api.edit_user(id, &update).await?;
                acknowledge(app, message)
            }
            UsersCommand::Delete { id } => {
                app.ctx.require_edit(Resource::User(id))?;
                let message = app.api.delete_user(id).await?;
                acknowledge(app, message)
            }
            UsersCommand::ResetPassword { id } => {
                app.ctx.require_edit(Resource::Password(id))?;
                let message = app.api.reset_password(id).await?;
                acknowledge(app, message)
            }
            UsersCommand::ChangePassword {
                id,
                current,
                new_password,
            } => {
                let id = match id {
                    Some(id) => id,
                    None => app.current_user_id()?,
                };
                app.ctx.require_edit(Resource::Password(id))?;
                policy::validate_new_password(&new_password)?;
                if new_password == current {
                    return Err(HerdbookError::Validation(
                        "new password must differ from the current one".into(),
                    ));
                }
                let change = PasswordChange {
                    current_password: current,
                    new_password,
                };
                let message = app.api.change_password(id, &change).await?;
                acknowledge(app, message)
            }
        }
    }
}

impl LoginArgs {
    pub async fn run(self, app: &App) -> Result<()> {
        let user = app.api.get_user(self.user_id).await?;
        if let Role::Unknown(id) = user.role {
            log::warn!("user {} has unrecognized role id {}", user.id, id);
        }
        let stored = app.store.save(&user)?;
        log::info!("signed in as {} at {}", user.username, stored.signed_in_at);
        if app.json {
            return print_ok(stored);
        }
        println!("Signed in as {} ({})", user.name, user.role);
        Ok(())
    }
}

pub fn whoami(app: &App) -> Result<()> {
    let stored = app.store.load()?;
    if app.json {
        return print_ok(stored);
    }
    match stored {
        Some(s) => println!(
            "{} ({}, {}) signed in {}",
            s.user.name,
            s.user.username,
            s.user.role,
            s.signed_in_at.format("%Y-%m-%d %H:%M UTC")
        ),
        None => println!("Not signed in"),
    }
    Ok(())
}

pub fn logout(app: &App) -> Result<()> {
    let was_signed_in = app.store.clear()?;
    if app.json {
        return print_ok(was_signed_in);
    }
    if was_signed_in {
        println!("Signed out");
    } else {
        println!("Nobody was signed in");
    }
    Ok(())
}
