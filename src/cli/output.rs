use std::fmt::Write;

use ansi_term::{Colour, Style};
use chrono::{Duration, Local};

use crate::tracker::{
    entities::{Project, ProjectColor, TimeEntry},
    stats::ProjectTotal,
    store::{Removal, TimeTrackingStore, Toggle},
};

/// `HH:MM:SS`. Hours keep growing past 99 instead of wrapping.
pub fn format_time(v: Duration) -> String {
    let seconds = v.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Short human readable duration, `"1ч 5м"` or `"5м"` below an hour.
pub fn format_duration(v: Duration) -> String {
    let seconds = v.num_seconds().max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{hours}ч {minutes}м")
    } else {
        format!("{minutes}м")
    }
}

impl From<ProjectColor> for Colour {
    fn from(value: ProjectColor) -> Self {
        match value {
            ProjectColor::Blue => Colour::Blue,
            ProjectColor::Purple => Colour::Purple,
            ProjectColor::Green => Colour::Green,
            ProjectColor::Orange => Colour::Fixed(208),
            ProjectColor::Red => Colour::Red,
            ProjectColor::Indigo => Colour::Fixed(63),
        }
    }
}

/// Renders text for the terminal. Colours can be turned off for pipes and tests.
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    pub color: bool,
}

impl Painter {
    fn paint(&self, style: Style, text: &str) -> String {
        if self.color {
            style.paint(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn dot(&self, color: ProjectColor) -> String {
        self.paint(Colour::from(color).normal(), "●")
    }

    pub fn projects(&self, store: &TimeTrackingStore) -> String {
        if store.projects().is_empty() {
            return "No projects yet. Create one with `add <name>`.\n".into();
        }
        let mut out = String::new();
        for project in store.projects() {
            let current = store.current_time(project);
            let progress = store
                .goal_progress(project)
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".into());
            let marker = if project.is_active() {
                self.paint(Colour::Green.bold(), "▶")
            } else {
                " ".into()
            };
            let _ = writeln!(
                out,
                "{marker} {} [{}] {}\t{}\t{} / {}\t{progress}",
                self.dot(project.color),
                project.id,
                project.name,
                format_time(current),
                format_duration(current),
                format_duration(project.goal_time),
            );
            if !project.description.is_empty() {
                let _ = writeln!(out, "      {}", project.description);
            }
        }
        out
    }

    pub fn today(&self, store: &TimeTrackingStore) -> String {
        let sessions = store.sessions_today();
        let mut out = String::new();
        let _ = writeln!(out, "Today: {}", format_duration(store.total_time_today()));
        let _ = writeln!(out, "Sessions: {}", sessions.len());
        let _ = writeln!(
            out,
            "Average session: {}",
            format_duration(store.average_session_today())
        );
        let top = store.top_projects_today(5);
        if !top.is_empty() {
            let _ = writeln!(out, "Top projects:");
            for (place, total) in top.iter().enumerate() {
                out.push_str(&self.project_total(place + 1, total));
            }
        }
        out
    }

    fn project_total(&self, place: usize, total: &ProjectTotal) -> String {
        let sessions = if total.sessions == 1 { "session" } else { "sessions" };
        format!(
            "  {place}. {}\t{}\t{} {sessions}\n",
            total.project_name,
            format_duration(total.duration),
            total.sessions
        )
    }

    pub fn sessions(&self, entries: &[&TimeEntry]) -> String {
        if entries.is_empty() {
            return "No sessions recorded.\n".into();
        }
        let mut out = String::new();
        for entry in entries {
            let _ = writeln!(
                out,
                "{} - {}\t{}\t{}",
                entry.start_time.with_timezone(&Local).format("%H:%M"),
                entry.end_time.with_timezone(&Local).format("%H:%M"),
                format_duration(entry.duration),
                entry.project_name
            );
        }
        out
    }

    pub fn toggle(&self, toggle: &Toggle, store: &TimeTrackingStore) -> String {
        let mut out = String::new();
        match toggle {
            Toggle::Started { project, previous } => {
                if let Some(previous) = previous {
                    out.push_str(&self.stopped(previous));
                }
                if let Some(project) = store.project(project) {
                    let _ = writeln!(out, "Started {}", self.name(project));
                }
            }
            Toggle::Stopped { entry } => out.push_str(&self.stopped(entry)),
        }
        out
    }

    fn stopped(&self, entry: &TimeEntry) -> String {
        format!(
            "Stopped {} after {}\n",
            entry.project_name,
            format_time(entry.duration)
        )
    }

    pub fn name(&self, project: &Project) -> String {
        format!("{} {} [{}]", self.dot(project.color), project.name, project.id)
    }

    pub fn removal(&self, removal: &Removal) -> String {
        let mut out = format!(
            "Deleted {} and {} session(s)\n",
            removal.project.name, removal.entries_removed
        );
        if let Some(forfeited) = removal.forfeited {
            let _ = writeln!(
                out,
                "The running timer was discarded ({} not recorded)",
                format_time(forfeited)
            );
        }
        out
    }

    /// Single status line for the running timer, meant to be redrawn in place.
    pub fn live(&self, project: &Project, current: Duration) -> String {
        format!(
            "\r\x1b[2K{} {} {}",
            self.paint(Colour::Green.bold(), "▶"),
            project.name,
            self.paint(Style::new().bold(), &format_time(current))
        )
    }
}
