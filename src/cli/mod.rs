pub mod command;
pub mod input;
pub mod output;
pub mod session;
pub mod shutdown;

use std::path::PathBuf;

use anyhow::Result;
use chrono::Duration;
use clap::{Args as ClapArgs, Parser, Subcommand};
use session::{create_ticker, run_session, Session, SessionOptions};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};

use crate::{
    tracker::{
        refresh::Tick,
        store::{NewProject, TimeTrackingStore},
    },
    utils::{
        clock::DefaultClock,
        dir::create_application_default_path,
        logging::{enable_logging, SESSION_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "timekeep", version, long_about = None)]
#[command(about = "Track time spent on projects, one running timer at a time", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, global = true, help = "Enable trace logging")]
    log: bool,
    #[arg(long = "log-filter", global = true, help = "Log level, overrides --log and RUST_LOG")]
    log_filter: Option<LevelFilter>,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console", global = true)]
    log_console: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory used for logs. By default $XDG_STATE_HOME/timekeep or $HOME/.local/state/timekeep"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Start an interactive tracking session. Type `help` inside for commands")]
    Session {
        #[command(flatten)]
        args: SessionArgs,
    },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SessionArgs {
    #[arg(
        long = "refresh-ms",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(100..),
        help = "How often the running timer is redrawn"
    )]
    refresh_ms: u64,
    #[arg(long, help = "Start with a few sample projects")]
    demo: bool,
    #[arg(long = "no-live", help = "Don't redraw the running timer")]
    no_live: bool,
    #[arg(long = "no-color", help = "Disable colored output")]
    no_color: bool,
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = args
        .log_filter
        .or_else(|| args.log.then_some(LevelFilter::TRACE));
    let app_dir = args.dir.map_or_else(create_application_default_path, Ok)?;
    enable_logging(
        SESSION_PREFIX,
        &app_dir.join("logs"),
        logging_level,
        args.log_console,
    )?;

    match args.commands {
        Commands::Session { args } => start_session(args).await,
    }
}

async fn start_session(args: SessionArgs) -> Result<()> {
    let mut store = TimeTrackingStore::new(Box::new(DefaultClock));
    if args.demo {
        seed_demo(&mut store)?;
    }
    let session = Session::new(
        store,
        SessionOptions {
            live: !args.no_live,
            color: !args.no_color,
        },
    );

    let shutdown_token = CancellationToken::new();
    let (sender, receiver) = mpsc::channel::<Tick>(1);
    let ticker = create_ticker(
        sender,
        &shutdown_token,
        std::time::Duration::from_millis(args.refresh_ms),
        DefaultClock,
    );

    println!("timekeep session. Type `help` for commands, `quit` to leave.");
    let (_, session) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        run_session(
            session,
            tokio::io::stdin(),
            tokio::io::stdout(),
            ticker,
            receiver,
            shutdown_token.clone(),
        ),
    );
    let session = session?;
    info!(
        "Session ended with {} projects and {} entries",
        session.store().projects().len(),
        session.store().entries().len()
    );
    Ok(())
}

/// Sample projects with some time already spent, handy for trying the commands out.
pub fn seed_demo(store: &mut TimeTrackingStore) -> Result<()> {
    let samples = [
        ("Web development", "Building a new site for a client", 8, 4),
        ("Design project", "Mockups for a mobile app", 6, 2),
        ("Learning React", "Course on modern frontend development", 5, 1),
    ];
    for (name, description, goal_hours, spent_hours) in samples {
        store.seed_project(
            NewProject::new(name, description, goal_hours),
            Duration::hours(spent_hours),
        )?;
    }
    Ok(())
}
