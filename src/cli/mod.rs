mod content;
mod export;
pub mod output;
mod report;
mod sessions;
mod users;

use std::collections::{HashMap, HashSet};
use std::path::Path;

use clap::{Parser, Subcommand};

use crate::services::loader::load_snapshot;
use crate::services::{ApiClient, Config, UserContext, UserStore};
use crate::types::{HerdbookError, MilkingSession, Notice, Result, Role};

use content::{BlogsArgs, CategoriesArgs};
use export::ExportArgs;
use report::{CowsArgs, DailyArgs, TodayArgs};
use sessions::SessionsArgs;
use users::{LoginArgs, UsersArgs};

/// Milk production records for the farm, from the command line
#[derive(Parser)]
#[command(name = "herdbook")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Farm API base URL (overrides config and HERDBOOK_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    /// Rows per page in list views
    #[arg(long, global = true, value_name = "N")]
    page_size: Option<usize>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List, record and change milking sessions
    Sessions(SessionsArgs),

    /// Daily production series with zero-filled gaps
    Daily(DailyArgs),

    /// Today's total across the herd
    Today(TodayArgs),

    /// Per-cow production and lactation phase suggestions
    Cows(CowsArgs),

    /// Manage blog posts
    Blogs(BlogsArgs),

    /// Manage blog categories
    Categories(CategoriesArgs),

    /// Manage user accounts
    Users(UsersArgs),

    /// Download a production report
    Export(ExportArgs),

    /// Sign in as an existing user
    Login(LoginArgs),

    /// Show the signed-in user
    Whoami,

    /// Forget the signed-in user
    Logout,
}

/// Everything a command needs, built once per invocation
pub(crate) struct App {
    pub config: Config,
    pub store: UserStore,
    pub ctx: UserContext,
    pub api: ApiClient,
    pub json: bool,
}

impl App {
    /// Sessions from a saved snapshot when given, else from the server
    async fn sessions(&self, input: Option<&Path>) -> Result<Vec<MilkingSession>> {
        match input {
            Some(path) => load_snapshot(path),
            None => self.api.list_sessions().await,
        }
    }

    /// Cow ids a farmer is responsible for; `None` means no restriction
    ///
    /// With `offline` set the data came from a snapshot, so an unreachable
    /// server leaves the snapshot unscoped instead of failing the command.
    async fn farmer_scope(&self, offline: bool) -> Result<Option<HashSet<u64>>> {
        let Some(user) = self.ctx.user().filter(|u| u.role == Role::Farmer) else {
            return Ok(None);
        };
        match self.api.farmer_cattle(user.id).await {
            Ok(cattle) => Ok(Some(cattle.into_iter().map(|c| c.id).collect())),
            Err(err) if offline && !err.is_server_reported() => {
                log::warn!("herd assignments unavailable, showing the whole snapshot: {}", err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Cow and user display names; missing tables only cost the names
    async fn name_tables(&self) -> (HashMap<u64, String>, HashMap<u64, String>) {
        let (cattle, users) = tokio::join!(self.api.list_cattle(), self.api.list_users());

        let cows = cattle
            .map(|list| list.into_iter().map(|c| (c.id, c.name)).collect())
            .unwrap_or_else(|e| {
                log::warn!("cow names unavailable: {}", e);
                HashMap::new()
            });
        let users = users
            .map(|list| list.into_iter().map(|u| (u.id, u.name)).collect())
            .unwrap_or_else(|e| {
                log::warn!("user names unavailable: {}", e);
                HashMap::new()
            });
        (cows, users)
    }

    /// Id of the signed-in user, or a context error
    fn current_user_id(&self) -> Result<u64> {
        self.ctx
            .user()
            .map(|u| u.id)
            .ok_or_else(|| HerdbookError::Context("nobody is signed in; run `herdbook login`".into()))
    }
}

impl Cli {
    /// Default log filter for the `-v` count
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    pub fn run(self) -> anyhow::Result<()> {
        let Cli {
            command,
            api_url,
            page_size,
            json,
            ..
        } = self;

        let config = Config::load()?.with_overrides(api_url, page_size);
        config.validate()?;
        let store = UserStore::new()?;
        let ctx = store.context();
        let api = ApiClient::from_config(&config)?;
        log::debug!("using farm API at {}", api.base_url());

        let app = App {
            config,
            store,
            ctx,
            api,
            json,
        };

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        match runtime.block_on(command.run(&app)) {
            Ok(()) => Ok(()),
            Err(err) => {
                if json {
                    output::print_json(&Notice::<()>::failed(&err))?;
                }
                log::debug!("command failed: {:?}", err);
                Err(anyhow::anyhow!(err.user_message()))
            }
        }
    }
}

impl Commands {
    async fn run(self, app: &App) -> Result<()> {
        match self {
            Commands::Sessions(args) => args.run(app).await,
            Commands::Daily(args) => args.run(app).await,
            Commands::Today(args) => args.run(app).await,
            Commands::Cows(args) => args.run(app).await,
            Commands::Blogs(args) => args.run(app).await,
            Commands::Categories(args) => args.run(app).await,
            Commands::Users(args) => args.run(app).await,
            Commands::Export(args) => args.run(app).await,
            Commands::Login(args) => args.run(app).await,
            Commands::Whoami => users::whoami(app),
            Commands::Logout => users::logout(app),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tempfile::TempDir;

    use crate::types::User;

    fn fixture(name: &str) -> String {
        format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    fn farmer() -> User {
        User {
            id: 3,
            role: Role::Farmer,
            name: "Kim".into(),
            username: "kim".into(),
            email: None,
        }
    }

    /// An app whose server is unreachable (nothing listens on port 1)
    fn unreachable_app(ctx: UserContext, tmp: &TempDir) -> App {
        App {
            config: Config::default(),
            store: UserStore::with_path(tmp.path().join("user.json")),
            ctx,
            api: ApiClient::new("http://127.0.0.1:1/api", Duration::from_millis(500)).unwrap(),
            json: true,
        }
    }

    async fn run_args(app: &App, args: &[&str]) -> Result<()> {
        let cli = Cli::try_parse_from(args).unwrap();
        cli.command.run(app).await
    }

    #[test]
    fn test_cli_parse_daily() {
        let cli = Cli::try_parse_from(["herdbook", "daily"]).unwrap();
        assert!(matches!(cli.command, Commands::Daily(_)));
        assert!(!cli.json);
    }

    #[test]
    fn test_cli_parse_global_json_after_subcommand() {
        let cli = Cli::try_parse_from(["herdbook", "today", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Today(_)));
        assert!(cli.json);
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["herdbook"]).is_err());
    }

    #[test]
    fn test_cli_verbosity_levels() {
        let quiet = Cli::try_parse_from(["herdbook", "whoami"]).unwrap();
        assert_eq!(quiet.log_level(), "warn");
        let info = Cli::try_parse_from(["herdbook", "-v", "whoami"]).unwrap();
        assert_eq!(info.log_level(), "info");
        let debug = Cli::try_parse_from(["herdbook", "whoami", "-vv"]).unwrap();
        assert_eq!(debug.log_level(), "debug");
    }

    #[test]
    fn test_cli_parse_overrides() {
        let cli = Cli::try_parse_from([
            "herdbook",
            "--api-url",
            "http://farm.test/api",
            "--page-size",
            "20",
            "logout",
        ])
        .unwrap();
        assert_eq!(cli.api_url.as_deref(), Some("http://farm.test/api"));
        assert_eq!(cli.page_size, Some(20));
        assert!(matches!(cli.command, Commands::Logout));
    }

    #[test]
    fn test_cli_rejects_out_of_range_days() {
        assert!(Cli::try_parse_from(["herdbook", "daily", "--days", "4294967295"]).is_err());
        assert!(Cli::try_parse_from(["herdbook", "daily", "--days", "0"]).is_err());
        assert!(Cli::try_parse_from(["herdbook", "daily", "--days", "30"]).is_ok());
    }

    // ========== offline snapshots ==========

    #[tokio::test]
    async fn test_farmer_scope_offline_falls_back_to_whole_snapshot() {
        let tmp = TempDir::new().unwrap();
        let app = unreachable_app(UserContext::signed_in(farmer()), &tmp);

        assert_eq!(app.farmer_scope(true).await.unwrap(), None);
        let err = app.farmer_scope(false).await.unwrap_err();
        assert!(matches!(err, HerdbookError::Network(_)));
    }

    #[tokio::test]
    async fn test_farmer_reports_from_snapshot_without_server() {
        let tmp = TempDir::new().unwrap();
        let app = unreachable_app(UserContext::signed_in(farmer()), &tmp);
        let (sessions, cattle) = (fixture("sessions.json"), fixture("cattle.json"));
        let (sessions, cattle) = (sessions.as_str(), cattle.as_str());

        run_args(&app, &["herdbook", "daily", "--input", sessions, "--days", "30"])
            .await
            .unwrap();
        run_args(&app, &["herdbook", "today", "--input", sessions])
            .await
            .unwrap();
        run_args(
            &app,
            &["herdbook", "cows", "--input", sessions, "--cattle", cattle],
        )
        .await
        .unwrap();
        run_args(&app, &["herdbook", "sessions", "list", "--input", sessions])
            .await
            .unwrap();
    }

    // ========== view checks ==========

    #[tokio::test]
    async fn test_read_commands_need_a_signed_in_user() {
        let tmp = TempDir::new().unwrap();
        let app = unreachable_app(UserContext::anonymous(), &tmp);
        let (sessions, cattle) = (fixture("sessions.json"), fixture("cattle.json"));
        let (sessions, cattle) = (sessions.as_str(), cattle.as_str());

        let commands: [Vec<&str>; 6] = [
            vec!["herdbook", "daily", "--input", sessions],
            vec!["herdbook", "today", "--input", sessions],
            vec!["herdbook", "cows", "--input", sessions, "--cattle", cattle],
            vec!["herdbook", "sessions", "list", "--input", sessions],
            vec!["herdbook", "blogs", "list"],
            vec!["herdbook", "categories", "list"],
        ];
        for args in commands {
            let err = run_args(&app, &args).await.unwrap_err();
            assert!(matches!(err, HerdbookError::Forbidden(_)), "{:?}: {:?}", args, err);
        }
    }
}
