use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

pub const DEFAULT_GOAL_HOURS: u32 = 8;
pub const MIN_GOAL_HOURS: i64 = 1;
pub const MAX_GOAL_HOURS: i64 = 24;

/// One line typed into the interactive session.
#[derive(Parser, Debug, PartialEq, Eq)]
#[command(
    name = "timekeep",
    no_binary_name = true,
    disable_version_flag = true,
    override_usage = "<COMMAND> [ARGS]"
)]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum SessionCommand {
    #[command(about = "Create a project")]
    Add {
        name: String,
        #[arg(short, long, default_value = "", help = "Short description of the project")]
        description: String,
        #[arg(
            short,
            long,
            default_value_t = DEFAULT_GOAL_HOURS,
            value_parser = parse_goal_hours,
            help = "Daily goal in hours. Values outside 1-24 are clamped"
        )]
        goal: u32,
    },
    #[command(about = "Change name, description or goal of a project")]
    Edit {
        id: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long, value_parser = parse_goal_hours, help = "Daily goal in hours. Values outside 1-24 are clamped")]
        goal: Option<u32>,
    },
    #[command(about = "Delete a project together with its history")]
    Delete { id: String },
    #[command(about = "Start or stop the timer of a project. Starting stops any other timer")]
    Toggle { id: String },
    #[command(about = "Stop the running timer")]
    Stop,
    #[command(about = "List projects")]
    List {
        #[arg(long, help = "Print as JSON")]
        json: bool,
    },
    #[command(about = "Statistics for today")]
    Today,
    #[command(about = "Sessions of today, newest first")]
    History {
        #[arg(
            short = 'n',
            long,
            help = "Show the n most recent sessions of any day instead"
        )]
        limit: Option<usize>,
        #[arg(long, help = "Print as JSON")]
        json: bool,
    },
    #[command(about = "End the session", alias = "exit")]
    Quit,
}

/// Goal hours are bounded where the user types them; the store itself accepts any value.
fn parse_goal_hours(value: &str) -> Result<u32> {
    let hours = value.trim().parse::<i64>()?;
    Ok(hours.clamp(MIN_GOAL_HOURS, MAX_GOAL_HOURS) as u32)
}

/// Splits a line into words. Double quotes group words and are removed.
pub fn split_words(line: &str) -> Result<Vec<String>> {
    let mut words = vec![];
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if quoted {
        bail!("Unclosed quote");
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
