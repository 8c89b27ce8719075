use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};
use tokio_util::{codec::FramedRead, sync::CancellationToken};
use tracing::{debug, error, info};

use crate::{
    tracker::{
        entities::{ProjectId, ProjectView},
        refresh::{Tick, Ticker},
        store::{NewProject, Rejected, TimeTrackingStore},
    },
    utils::clock::Clock,
};

use super::{
    command::{split_words, CommandLine, SessionCommand},
    input::{InputLine, SessionCodec},
    output::Painter,
};

pub struct SessionOptions {
    /// Redraw the running timer on every tick.
    pub live: bool,
    pub color: bool,
}

/// What the loop should do after a line was handled.
#[derive(Debug, PartialEq, Eq)]
pub enum Reply {
    Print(String),
    Quit,
}

/// Presentation side of the tracker: turns typed commands into store operations and store state
/// into text. Holds the only reference to the store, so every command runs to completion before
/// the next tick reads anything.
pub struct Session {
    store: TimeTrackingStore,
    painter: Painter,
    live: bool,
}

impl Session {
    pub fn new(store: TimeTrackingStore, options: SessionOptions) -> Self {
        Self {
            store,
            painter: Painter {
                color: options.color,
            },
            live: options.live,
        }
    }

    pub fn store(&self) -> &TimeTrackingStore {
        &self.store
    }

    pub fn handle_line(&mut self, line: &str) -> Reply {
        let words = match split_words(line) {
            Ok(words) if words.is_empty() => return Reply::Print(String::new()),
            Ok(words) => words,
            Err(e) => return Reply::Print(format!("{e}\n")),
        };
        let command = match CommandLine::try_parse_from(words) {
            Ok(v) => v.command,
            Err(e) => return Reply::Print(e.render().to_string()),
        };
        debug!("Executing {:?}", command);
        if command == SessionCommand::Quit {
            return Reply::Quit;
        }
        match self.execute(command) {
            Ok(text) => Reply::Print(text),
            Err(e) => {
                error!("Command failed {e:?}");
                Reply::Print(format!("Error: {e}\n"))
            }
        }
    }

    fn execute(&mut self, command: SessionCommand) -> Result<String> {
        let painter = self.painter;
        let store = &mut self.store;
        let text = match command {
            SessionCommand::Add {
                name,
                description,
                goal,
            } => match store.add_project(NewProject::new(name, description, goal)) {
                Ok(id) => match store.project(&id) {
                    Some(project) => format!("Created {}\n", painter.name(project)),
                    None => String::new(),
                },
                Err(e) => ignored(e),
            },
            SessionCommand::Edit {
                id,
                name,
                description,
                goal,
            } => {
                let id = ProjectId::from(id);
                // Omitted fields keep what the project has, like a prefilled edit form.
                let fields = store.project(&id).map(|project| NewProject {
                    name: name.unwrap_or_else(|| project.name.clone()),
                    description: description.unwrap_or_else(|| project.description.clone()),
                    goal_hours: goal.unwrap_or_else(|| project.goal_time.num_hours() as u32),
                });
                let result = match fields {
                    Some(fields) => store.update_project(&id, fields),
                    None => Err(Rejected::UnknownProject(id.clone())),
                };
                match result {
                    Ok(project) => format!("Updated {}\n", painter.name(project)),
                    Err(e) => ignored(e),
                }
            }
            SessionCommand::Delete { id } => match store.delete_project(&id.into()) {
                Ok(removal) => painter.removal(&removal),
                Err(e) => ignored(e),
            },
            SessionCommand::Toggle { id } => match store.toggle_timer(&id.into()) {
                Ok(toggle) => painter.toggle(&toggle, store),
                Err(e) => ignored(e),
            },
            SessionCommand::Stop => match store.active_project().map(|p| p.id.clone()) {
                Some(id) => match store.toggle_timer(&id) {
                    Ok(toggle) => painter.toggle(&toggle, store),
                    Err(e) => ignored(e),
                },
                None => "No timer is running\n".into(),
            },
            SessionCommand::List { json: true } => {
                let views = store
                    .projects()
                    .iter()
                    .map(|project| ProjectView {
                        project,
                        is_active: project.is_active(),
                        current_time: store.current_time(project),
                    })
                    .collect::<Vec<_>>();
                serde_json::to_string_pretty(&views)? + "\n"
            }
            SessionCommand::List { json: false } => painter.projects(store),
            SessionCommand::Today => painter.today(store),
            SessionCommand::History { limit, json } => {
                let sessions = match limit {
                    Some(n) => store.recent_sessions(n),
                    None => store.sessions_today(),
                };
                if json {
                    serde_json::to_string_pretty(&sessions)? + "\n"
                } else {
                    painter.sessions(&sessions)
                }
            }
            SessionCommand::Quit => String::new(),
        };
        Ok(text)
    }

    /// Redraw for a refresh tick. Only reads the store.
    pub fn render_tick(&self, tick: &Tick) -> Option<String> {
        if !self.live {
            return None;
        }
        let project = self.store.active_project()?;
        Some(self.painter.live(project, project.time_at(tick.at)))
    }
}

fn ignored(e: impl std::fmt::Display) -> String {
    format!("Ignored: {e}\n")
}

pub fn create_ticker(
    sender: mpsc::Sender<Tick>,
    shutdown_token: &CancellationToken,
    period: Duration,
    clock: impl Clock,
) -> Ticker {
    Ticker::new(sender, shutdown_token.clone(), period, Box::new(clock))
}

/// Runs the interactive loop until `quit`, end of input or cancellation. Commands and ticks are
/// handled one at a time on the current task.
pub async fn run_session(
    mut session: Session,
    input: impl AsyncRead + Unpin,
    mut output: impl AsyncWrite + Unpin,
    ticker: Ticker,
    mut ticks: mpsc::Receiver<Tick>,
    shutdown: CancellationToken,
) -> Result<Session> {
    let interaction = async {
        let result = interact(&mut session, input, &mut output, &mut ticks, &shutdown).await;
        // Stops the ticker as well as the signal listener.
        shutdown.cancel();
        result
    };

    let (ticker_result, interaction_result) = tokio::join!(ticker.run(), interaction);

    if let Err(e) = &ticker_result {
        error!("Ticker got an error {e:?}");
    }
    interaction_result?;
    Ok(session)
}

async fn interact(
    session: &mut Session,
    input: impl AsyncRead + Unpin,
    output: &mut (impl AsyncWrite + Unpin),
    ticks: &mut mpsc::Receiver<Tick>,
    shutdown: &CancellationToken,
) -> Result<()> {
    let mut lines = FramedRead::new(input, SessionCodec::new());
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Session cancelled");
                return Ok(());
            }
            line = lines.next() => {
                let Some(line) = line else {
                    info!("Input closed");
                    return Ok(());
                };
                let reply = match line? {
                    InputLine::Line(line) => session.handle_line(&line),
                    InputLine::Unreadable(reason) => {
                        debug!("Skipping unreadable input: {reason}");
                        Reply::Print(ignored(reason))
                    }
                };
                match reply {
                    Reply::Print(text) if text.is_empty() => (),
                    Reply::Print(text) => write_flush(output, &text).await?,
                    Reply::Quit => return Ok(()),
                }
            }
            Some(tick) = ticks.recv() => {
                if let Some(text) = session.render_tick(&tick) {
                    write_flush(output, &text).await?;
                }
            }
        }
    }
}

async fn write_flush(output: &mut (impl AsyncWrite + Unpin), text: &str) -> Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.flush().await?;
    Ok(())
}
