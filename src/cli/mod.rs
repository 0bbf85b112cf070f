use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::{AppContext, StubAuthProvider, Workspace};
use crate::config::{ConfigLoader, CONFIG_ENV, DATA_ENV};
use crate::model::{Clock, FixedClock, SystemClock};

pub mod commands;

use self::commands::{
    BackupArgs, CategoriesArgs, DeleteArgs, ListArgs, OutputStyle, SummaryArgs, ToggleArgs,
    VisitArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "daybook",
    version,
    about = "Diaries, todos, plans, reminders, websites and backups from the command line"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over DAYBOOK_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over DAYBOOK_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Load records from this JSON dataset instead of the configured one
    #[arg(long)]
    pub dataset: Option<PathBuf>,

    /// Evaluate time windows at this instant (YYYY-MM-DD[THH:MM[:SS]])
    #[arg(long, global = true)]
    pub now: Option<String>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dashboard summary (default)
    Summary(SummaryArgs),
    /// Search, filter, sort and group one record kind
    List(ListArgs),
    /// Category counts for a record kind
    Categories(CategoriesArgs),
    /// Toggle a todo, reminder, favorite website or plan milestone
    Toggle(ToggleArgs),
    /// Record a visit to a website
    Visit(VisitArgs),
    /// Delete a record after confirmation
    Delete(DeleteArgs),
    /// Create or restore backups
    Backup(BackupArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    let loader = ConfigLoader::discover()?;
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;

    let dataset = cli.dataset.clone().or_else(|| config.dataset.clone());
    let mut workspace = Workspace::load(dataset.as_deref(), config.backup.timeout())?;
    let ctx = AppContext::new(
        Box::<StubAuthProvider>::default(),
        config.theme_name(),
        clock_from(cli.now.as_deref())?,
    );
    let style = OutputStyle::detect(&config);

    let command = cli
        .command
        .unwrap_or(Commands::Summary(SummaryArgs { json: false }));
    let output = match command {
        Commands::Summary(args) => commands::run_summary(&workspace, &ctx, style, &args)?,
        Commands::List(args) => commands::run_list(&workspace, &ctx, &config, style, &args)?,
        Commands::Categories(args) => commands::run_categories(&workspace, &args)?,
        Commands::Toggle(args) => commands::run_toggle(&mut workspace, &ctx, &args)?,
        Commands::Visit(args) => commands::run_visit(&mut workspace, &ctx, &args)?,
        Commands::Delete(args) => {
            let confirmation = commands::delete_confirmation(&args)?;
            commands::run_delete(&mut workspace, &ctx, &args, confirmation)?
        }
        Commands::Backup(args) => commands::run_backup(&mut workspace, &ctx, &args)?,
    };
    print!("{output}");
    Ok(())
}

fn clock_from(now: Option<&str>) -> Result<Box<dyn Clock>> {
    match now {
        Some(raw) => {
            let clock = FixedClock::parse(raw).with_context(|| format!("parsing --now {raw:?}"))?;
            Ok(Box::new(clock))
        }
        None => Ok(Box::new(SystemClock)),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
