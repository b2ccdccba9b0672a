//! `herdbook sessions` subcommands

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand};

use super::output::{clip, local_time, page_footer, print_json, print_ok, print_table, volume};
use super::App;
use crate::services::dates::{self, WALL_CLOCK_FORMAT};
use crate::services::policy::Resource;
use crate::services::query::{filter_items, paginate, Page, SessionRow, SessionSort};
use crate::services::{Aggregator, SessionFilter};
use crate::types::{HerdbookError, MilkingSession, NewMilkingSession, Result, User};

#[derive(Args, Debug)]
pub struct SessionsArgs {
    #[command(subcommand)]
    command: SessionsCommand,
}

#[derive(Subcommand, Debug)]
enum SessionsCommand {
    /// List sessions with search, filters and paging
    List(ListArgs),

    /// Record a new session
    Add(AddArgs),

    /// Change fields of an existing session
    Edit(EditArgs),

    /// Delete a session
    Delete {
        #[arg(value_name = "ID")]
        id: u64,
    },

    /// Server-side daily summaries, passed through as JSON
    Summary {
        #[arg(long)]
        cow: Option<u64>,
        #[arg(long, value_name = "YYYY-MM-DD", value_parser = dates::parse_date)]
        start: Option<NaiveDate>,
        #[arg(long, value_name = "YYYY-MM-DD", value_parser = dates::parse_date)]
        end: Option<NaiveDate>,
    },
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Free-text search over names, dates, times and volumes
    #[arg(short = 'q', long, default_value = "")]
    search: String,

    /// Only these cows (repeatable)
    #[arg(long = "cow", value_name = "ID")]
    cows: Vec<u64>,

    /// Only this local day
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = dates::parse_date)]
    date: Option<NaiveDate>,

    #[arg(long, value_name = "YYYY-MM-DD", value_parser = dates::parse_date)]
    start: Option<NaiveDate>,

    #[arg(long, value_name = "YYYY-MM-DD", value_parser = dates::parse_date)]
    end: Option<NaiveDate>,

    #[arg(long, value_enum, default_value_t = SessionSort::DateDesc)]
    sort: SessionSort,

    /// 1-indexed page number
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Read sessions from a saved JSON snapshot instead of the server
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct AddArgs {
    #[arg(long)]
    cow: u64,

    /// Liters
    #[arg(long)]
    volume: f64,

    /// Local time `YYYY-MM-DDTHH:MM[:SS]` (default: now)
    #[arg(long)]
    time: Option<String>,

    /// Milker user id (default: the signed-in user)
    #[arg(long)]
    milker: Option<u64>,

    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args, Debug)]
struct EditArgs {
    #[arg(value_name = "ID")]
    id: u64,

    #[arg(long)]
    cow: Option<u64>,

    #[arg(long)]
    volume: Option<f64>,

    #[arg(long)]
    time: Option<String>,

    #[arg(long)]
    milker: Option<u64>,

    #[arg(long)]
    notes: Option<String>,
}

fn validate_volume(v: f64) -> Result<f64> {
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err(HerdbookError::Validation(format!(
            "volume must be a positive number of liters, got {}",
            v
        )))
    }
}

fn wall_clock_now() -> String {
    Local::now().naive_local().format(WALL_CLOCK_FORMAT).to_string()
}

impl AddArgs {
    fn into_body(self, user: Option<&User>) -> Result<NewMilkingSession> {
        let milking_time = match self.time {
            Some(raw) => dates::parse_wall_clock(&raw)?,
            None => wall_clock_now(),
        };
        Ok(NewMilkingSession {
            cow_id: self.cow,
            milker_id: self.milker.or(user.map(|u| u.id)),
            volume: validate_volume(self.volume)?,
            milking_time,
            notes: self.notes.filter(|n| !n.trim().is_empty()),
        })
    }
}

impl EditArgs {
    /// Full replacement body: the existing session overlaid with given fields
    fn merge(self, existing: &MilkingSession) -> Result<NewMilkingSession> {
        let cow_id = self.cow.or(existing.cow_id).ok_or_else(|| {
            HerdbookError::Validation(format!("session {} has no cow; pass --cow", self.id))
        })?;
        let milking_time = match self.time {
            Some(raw) => dates::parse_wall_clock(&raw)?,
            None => existing
                .local_time()
                .map(|t| t.naive_local().format(WALL_CLOCK_FORMAT).to_string())
                .ok_or_else(|| {
                    HerdbookError::Validation(format!(
                        "session {} has no valid time; pass --time",
                        self.id
                    ))
                })?,
        };
        Ok(NewMilkingSession {
            cow_id,
            milker_id: self.milker.or(existing.milker_id),
            volume: validate_volume(self.volume.unwrap_or(existing.volume))?,
            milking_time,
            notes: self.notes.or_else(|| existing.notes.clone()),
        })
    }
}

impl SessionsArgs {
    pub async fn run(self, app: &App) -> Result<()> {
        match self.command {
            SessionsCommand::List(args) => list(args, app).await,
            SessionsCommand::Add(args) => {
                app.ctx.require_edit(Resource::MilkingSession)?;
                let body = args.into_body(app.ctx.user())?;
                let created = app.api.create_session(&body).await?;
                if app.json {
                    return print_ok(created);
                }
                match created.id {
                    Some(id) => println!("Recorded session {} ({})", id, volume(body.volume)),
                    None => println!(
                        "{}",
                        created.message.unwrap_or_else(|| "Session recorded".into())
                    ),
                }
                Ok(())
            }
            SessionsCommand::Edit(args) => {
                app.ctx.require_edit(Resource::MilkingSession)?;
                let id = args.id;
                let sessions = app.api.list_sessions().await?;
                let existing = sessions
                    .iter()
                    .find(|s| s.id == id)
                    .ok_or_else(|| HerdbookError::Validation(format!("no session with id {}", id)))?;
                let body = args.merge(existing)?;
                let message = app.api.update_session(id, &body).await?;
                acknowledge(app, message)
            }
            SessionsCommand::Delete { id } => {
                app.ctx.require_edit(Resource::MilkingSession)?;
                let message = app.api.delete_session(id).await?;
                acknowledge(app, message)
            }
            SessionsCommand::Summary { cow, start, end } => {
                app.ctx.require_view(Resource::MilkingSession)?;
                let summaries = app.api.daily_summaries(cow, start, end).await?;
                print_json(&summaries)
            }
        }
    }
}

pub(super) fn acknowledge(app: &App, message: String) -> Result<()> {
    if app.json {
        return print_ok(message);
    }
    println!("{}", message);
    Ok(())
}

/// Combine `--cow` with a farmer's own herd; both restrict
pub(super) fn cow_scope(requested: &[u64], farmer: Option<HashSet<u64>>) -> Option<HashSet<u64>> {
    let requested: Option<HashSet<u64>> =
        (!requested.is_empty()).then(|| requested.iter().copied().collect());
    match (requested, farmer) {
        (Some(r), Some(f)) => Some(r.intersection(&f).copied().collect()),
        (r, f) => r.or(f),
    }
}

async fn list(args: ListArgs, app: &App) -> Result<()> {
    app.ctx.require_view(Resource::MilkingSession)?;
    let sessions = app.sessions(args.input.as_deref()).await?;
    let filter = SessionFilter {
        cow_ids: cow_scope(&args.cows, app.farmer_scope(args.input.is_some()).await?),
        date: args.date,
        start: args.start,
        end: args.end,
    };
    let kept = Aggregator::filter(&sessions, &filter);
    let (cows, users) = app.name_tables().await;

    let rows: Vec<SessionRow> = kept
        .iter()
        .map(|s| SessionRow::with_names(s, &cows, &users))
        .collect();
    let mut matched = filter_items(&rows, &args.search, |_| true);
    args.sort.sort_by(&mut matched, |r| r.session);

    let page_size = app.config.page_size;
    if app.json {
        let found: Vec<&MilkingSession> = matched.iter().map(|r| r.session).collect();
        return print_ok(Page::of(&found, args.page, page_size));
    }

    let table: Vec<Vec<String>> = paginate(&matched, args.page, page_size)
        .iter()
        .map(|r| {
            vec![
                r.session.id.to_string(),
                local_time(r.session.milking_time),
                r.cow_name
                    .map(String::from)
                    .or_else(|| r.session.cow_id.map(|id| format!("#{}", id)))
                    .unwrap_or_else(|| "-".into()),
                r.milker_name.unwrap_or("-").to_string(),
                volume(r.session.volume),
                clip(r.session.notes.as_deref().unwrap_or(""), 30),
            ]
        })
        .collect();

    print_table(&["ID", "Time", "Cow", "Milker", "Volume", "Notes"], &table);
    let pages = crate::services::query::page_count(matched.len(), page_size);
    println!("{}", page_footer(args.page, pages, matched.len()));
    Ok(())
}
