//! `herdbook daily`, `today` and `cows` reports

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;

use super::output::{print_ok, print_table, volume};
use super::sessions::cow_scope;
use super::App;
use crate::services::dates;
use crate::services::loader::load_snapshot;
use crate::services::policy::Resource;
use crate::services::query::filter_items;
use crate::services::{Aggregator, LactationPolicy, SessionFilter};
use crate::types::{
    Cow, CowProduction, DailyAggregate, LactationPhase, MilkingSession, ProductionStats, Result,
};

#[derive(Args, Debug)]
pub struct DailyArgs {
    /// Only these cows (repeatable)
    #[arg(long = "cow", value_name = "ID")]
    cows: Vec<u64>,

    /// First day of the range (needs --end)
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = dates::parse_date, requires = "end")]
    start: Option<NaiveDate>,

    /// Last day of the range (needs --start)
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = dates::parse_date, requires = "start")]
    end: Option<NaiveDate>,

    /// Trailing window ending today (default from config)
    #[arg(long, value_parser = dates::parse_window_days, conflicts_with_all = ["start", "end"])]
    days: Option<u32>,

    /// Read sessions from a saved JSON snapshot instead of the server
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct TodayArgs {
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CowsArgs {
    /// Free-text search over cow names, breeds and phases
    #[arg(short = 'q', long, default_value = "")]
    search: String,

    /// Only cows whose suggested phase differs from the recorded one
    #[arg(long)]
    mismatched: bool,

    /// Read sessions from a saved JSON snapshot instead of the server
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Read cattle from a saved JSON snapshot instead of the server
    #[arg(long, value_name = "FILE")]
    cattle: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct DailyReport {
    start: NaiveDate,
    end: NaiveDate,
    series: Vec<DailyAggregate>,
    stats: ProductionStats,
}

#[derive(Debug, Serialize)]
struct CowReport {
    name: String,
    recorded_phase: Option<LactationPhase>,
    suggested_phase: LactationPhase,
    #[serde(flatten)]
    production: CowProduction,
}

impl DailyArgs {
    pub async fn run(self, app: &App) -> Result<()> {
        app.ctx.require_view(Resource::MilkingSession)?;
        let sessions = app.sessions(self.input.as_deref()).await?;
        let filter = SessionFilter {
            cow_ids: cow_scope(&self.cows, app.farmer_scope(self.input.is_some()).await?),
            ..Default::default()
        };
        let sessions = Aggregator::filtered(&sessions, &filter);

        let (start, end) = match (self.start, self.end) {
            (Some(start), Some(end)) => (start, end),
            _ => dates::window_ending(
                dates::today(),
                self.days.unwrap_or(app.config.trend_days),
            ),
        };
        let series = Aggregator::daily_series(&sessions, start, end);
        let stats = ProductionStats::from_daily(&series);

        if app.json {
            return print_ok(DailyReport {
                start,
                end,
                series,
                stats,
            });
        }

        let rows: Vec<Vec<String>> = series
            .iter()
            .map(|d| {
                vec![
                    d.date.format("%Y-%m-%d").to_string(),
                    d.session_count.to_string(),
                    volume(d.total_volume),
                ]
            })
            .collect();
        print_table(&["Date", "Sessions", "Volume"], &rows);
        println!();
        println!("Total:       {}", volume(stats.total_volume));
        println!("Active days: {}", stats.active_days);
        println!("Daily avg:   {}", volume(stats.daily_avg_volume));
        if let Some((day, peak)) = stats.peak_day {
            println!("Peak:        {} on {}", volume(peak), day);
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct TodayReport {
    date: NaiveDate,
    total_volume: f64,
    session_count: u64,
}

impl TodayArgs {
    pub async fn run(self, app: &App) -> Result<()> {
        app.ctx.require_view(Resource::MilkingSession)?;
        let sessions = app.sessions(self.input.as_deref()).await?;
        let sessions = match app.farmer_scope(self.input.is_some()).await? {
            Some(ids) => Aggregator::filtered(&sessions, &SessionFilter::for_cows(ids)),
            None => sessions,
        };

        let date = dates::today();
        let total_volume = Aggregator::today_total(&sessions, date);
        let session_count = Aggregator::daily_series(&sessions, date, date)
            .first()
            .map(|d| d.session_count)
            .unwrap_or(0);

        if app.json {
            return print_ok(TodayReport {
                date,
                total_volume,
                session_count,
            });
        }
        println!(
            "{}: {} from {} sessions",
            date,
            volume(total_volume),
            session_count
        );
        Ok(())
    }
}

impl CowsArgs {
    pub async fn run(self, app: &App) -> Result<()> {
        app.ctx.require_view(Resource::Cow)?;
        app.ctx.require_view(Resource::MilkingSession)?;
        let (sessions, cattle) = match (&self.input, &self.cattle) {
            (None, None) => app.api.herd_snapshot().await?,
            (input, cattle) => {
                let sessions = app.sessions(input.as_deref()).await?;
                let cattle = match cattle {
                    Some(path) => load_snapshot::<Cow>(path)?,
                    None => app.api.list_cattle().await?,
                };
                (sessions, cattle)
            }
        };

        let offline = self.input.is_some() || self.cattle.is_some();
        let cattle: Vec<Cow> = match app.farmer_scope(offline).await? {
            Some(ids) => cattle.into_iter().filter(|c| ids.contains(&c.id)).collect(),
            None => cattle,
        };
        let shown = filter_items(&cattle, &self.search, |_| true);

        let reports = cow_reports(&shown, &sessions, &app.config.lactation, dates::today());
        let reports: Vec<CowReport> = reports
            .into_iter()
            .filter(|r| !self.mismatched || r.recorded_phase != Some(r.suggested_phase))
            .collect();

        if app.json {
            return print_ok(reports);
        }

        let rows: Vec<Vec<String>> = reports
            .iter()
            .map(|r| {
                vec![
                    r.production.cow_id.to_string(),
                    r.name.clone(),
                    r.production.sessions_count.to_string(),
                    volume(r.production.total_volume),
                    volume(r.production.avg_per_session),
                    volume(r.production.today_volume),
                    r.recorded_phase
                        .map(|p| p.label().to_string())
                        .unwrap_or_else(|| "-".into()),
                    r.suggested_phase.label().to_string(),
                ]
            })
            .collect();
        print_table(
            &["ID", "Name", "Sessions", "Total", "Avg", "Today", "Phase", "Suggested"],
            &rows,
        );
        Ok(())
    }
}

/// Production totals and a phase suggestion for each listed cow, in list order
fn cow_reports(
    cattle: &[&Cow],
    sessions: &[MilkingSession],
    policy: &LactationPolicy,
    reference: NaiveDate,
) -> Vec<CowReport> {
    let ids: Vec<u64> = cattle.iter().map(|c| c.id).collect();
    let scoped = Aggregator::filtered(sessions, &SessionFilter::for_cows(ids.iter().copied()));
    let mut totals: HashMap<u64, CowProduction> = Aggregator::per_cow_totals(&scoped, &ids, reference)
        .into_iter()
        .collect();

    cattle
        .iter()
        .map(|cow| CowReport {
            name: cow.name.clone(),
            recorded_phase: cow.lactation_phase,
            suggested_phase: policy.classify(cow, &scoped, reference),
            production: totals
                .remove(&cow.id)
                .unwrap_or_else(|| CowProduction::empty(cow.id)),
        })
        .collect()
}
