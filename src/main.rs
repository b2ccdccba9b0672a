use clap::Parser;
use herdbook::cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Reads RUST_LOG; -v / -vv raise the default level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .format_timestamp(None)
        .init();

    cli.run()
}
