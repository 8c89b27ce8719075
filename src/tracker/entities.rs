use std::{fmt::Display, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::utils::time::whole_seconds_between;

/// Opaque project identifier handed out by the store.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct ProjectId(Arc<str>);

/// Opaque time entry identifier handed out by the store.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct EntryId(Arc<str>);

macro_rules! string_id {
    ($name:ident) => {
        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.into())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value.into())
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(ProjectId);
string_id!(EntryId);

/// Display tag of a project. Carries no meaning for the timer logic.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectColor {
    Blue,
    Purple,
    Green,
    Orange,
    Red,
    Indigo,
}

impl ProjectColor {
    pub const PALETTE: [ProjectColor; 6] = [
        ProjectColor::Blue,
        ProjectColor::Purple,
        ProjectColor::Green,
        ProjectColor::Orange,
        ProjectColor::Red,
        ProjectColor::Indigo,
    ];
}

/// A named work bucket with a daily goal and an idle or running timer.
///
/// The running state is held only in `started_at`: a project is active exactly when it knows when
/// its current interval began.
#[derive(PartialEq, Eq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: String,
    pub color: ProjectColor,
    /// Whole seconds of completed work. Excludes the running interval.
    #[serde(with = "duration_ser")]
    pub time_spent: Duration,
    #[serde(with = "duration_ser")]
    pub goal_time: Duration,
    #[serde(rename = "startTime", with = "chrono::serde::ts_milliseconds_option")]
    pub(crate) started_at: Option<DateTime<Utc>>,
}

impl Project {
    pub fn is_active(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Time spent including the running interval, if any, as of `now`.
    pub fn time_at(&self, now: DateTime<Utc>) -> Duration {
        match self.started_at {
            Some(start) => self.time_spent + whole_seconds_between(start, now),
            None => self.time_spent,
        }
    }
}

// `isActive` is derived, but callers reading JSON expect it next to `startTime`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView<'a> {
    #[serde(flatten)]
    pub project: &'a Project,
    pub is_active: bool,
    #[serde(with = "duration_ser")]
    pub current_time: Duration,
}

/// Immutable record of one completed work interval. The project name is a snapshot taken when
/// the interval was stopped, so later renames don't rewrite history.
#[derive(PartialEq, Eq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: EntryId,
    pub project_id: ProjectId,
    pub project_name: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
    #[serde(with = "duration_ser")]
    pub duration: Duration,
}

impl TimeEntry {
    /// Closes the running interval of `project` at `end`.
    pub(crate) fn closing(
        id: EntryId,
        project: &Project,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        TimeEntry {
            id,
            project_id: project.id.clone(),
            project_name: project.name.clone(),
            start_time: start,
            end_time: end,
            duration: whole_seconds_between(start, end),
        }
    }
}

mod duration_ser {
    use chrono::Duration;
    use serde::Serializer;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_seconds())
    }
}
