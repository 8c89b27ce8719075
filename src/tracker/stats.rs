use std::collections::HashMap;

use chrono::{Duration, NaiveDate};

use crate::utils::{
    percentage::{duration_percentage, Percentage},
    time::local_date,
};

use super::entities::TimeEntry;

/// Time recorded for one project name on a day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectTotal {
    pub project_name: String,
    pub duration: Duration,
    pub sessions: usize,
}

impl ProjectTotal {
    fn new(project_name: String) -> Self {
        Self {
            project_name,
            duration: Duration::zero(),
            sessions: 0,
        }
    }
}

fn started_on(day: NaiveDate) -> impl Fn(&&TimeEntry) -> bool {
    move |entry: &&TimeEntry| local_date(entry.start_time) == day
}

fn newest_first(entries: &mut [&TimeEntry]) {
    entries.sort_by(|a, b| b.start_time.cmp(&a.start_time));
}

/// Sum of entries that started on `day`. An entry belongs to the day it started on, even if it
/// ran past midnight.
pub fn total_on(entries: &[TimeEntry], day: NaiveDate) -> Duration {
    entries
        .iter()
        .filter(started_on(day))
        .fold(Duration::zero(), |sum, e| sum + e.duration)
}

/// Entries that started on `day`, newest first.
pub fn sessions_on(entries: &[TimeEntry], day: NaiveDate) -> Vec<&TimeEntry> {
    let mut sessions = entries.iter().filter(started_on(day)).collect::<Vec<_>>();
    newest_first(&mut sessions);
    sessions
}

pub fn average_session_on(entries: &[TimeEntry], day: NaiveDate) -> Duration {
    let sessions = entries.iter().filter(started_on(day)).count();
    if sessions == 0 {
        return Duration::zero();
    }
    Duration::seconds(total_on(entries, day).num_seconds() / sessions as i64)
}

/// Groups entries of `day` by their recorded project name and returns the `limit` largest.
pub fn top_projects_on(entries: &[TimeEntry], day: NaiveDate, limit: usize) -> Vec<ProjectTotal> {
    let mut map = HashMap::<&str, ProjectTotal>::new();
    for entry in entries.iter().filter(started_on(day)) {
        let total = map
            .entry(&entry.project_name)
            .or_insert_with(|| ProjectTotal::new(entry.project_name.clone()));
        total.duration += entry.duration;
        total.sessions += 1;
    }

    let mut totals = map.into_values().collect::<Vec<_>>();
    totals.sort_by(|a, b| {
        b.duration
            .cmp(&a.duration)
            .then_with(|| a.project_name.cmp(&b.project_name))
    });
    totals.truncate(limit);
    totals
}

/// The `n` most recently started entries regardless of day.
pub fn recent_sessions(entries: &[TimeEntry], n: usize) -> Vec<&TimeEntry> {
    let mut sessions = entries.iter().collect::<Vec<_>>();
    newest_first(&mut sessions);
    sessions.truncate(n);
    sessions
}

pub fn goal_progress(current: Duration, goal: Duration) -> Option<Percentage> {
    duration_percentage(current, goal).map(Percentage::capped)
}
