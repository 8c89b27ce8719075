use chrono::{DateTime, Duration, NaiveDate, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::utils::{clock::Clock, percentage::Percentage, time::local_date};

use super::{
    entities::{EntryId, Project, ProjectColor, ProjectId, TimeEntry},
    stats::{self, ProjectTotal},
};

/// Why the store refused an operation. A rejected operation never changes the store.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Rejected {
    #[error("no project with id {0}")]
    UnknownProject(ProjectId),
    #[error("project name can't be empty")]
    EmptyName,
}

/// User supplied fields of a project. The goal is given in hours and stored in seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub goal_hours: u32,
}

pub type ProjectFields = NewProject;

impl NewProject {
    pub fn new(name: impl Into<String>, description: impl Into<String>, goal_hours: u32) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            goal_hours,
        }
    }

    fn validate(&self) -> Result<(), Rejected> {
        if self.name.trim().is_empty() {
            Err(Rejected::EmptyName)
        } else {
            Ok(())
        }
    }

    fn goal(&self) -> Duration {
        Duration::hours(self.goal_hours.into())
    }
}

/// Result of [TimeTrackingStore::toggle_timer].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    /// The project started. If another project was running it was stopped first and `previous`
    /// holds the entry it produced.
    Started {
        project: ProjectId,
        previous: Option<TimeEntry>,
    },
    Stopped { entry: TimeEntry },
}

impl Toggle {
    /// The entry appended by this toggle, if any.
    pub fn entry(&self) -> Option<&TimeEntry> {
        match self {
            Toggle::Started { previous, .. } => previous.as_ref(),
            Toggle::Stopped { entry } => Some(entry),
        }
    }
}

/// Result of [TimeTrackingStore::delete_project].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub project: Project,
    pub entries_removed: usize,
    /// Elapsed time of the running interval that was dropped together with the project.
    pub forfeited: Option<Duration>,
}

/// Owns every project and time entry of a session and keeps the single running timer invariant.
///
/// Projects keep insertion order and entries keep creation order. All mutation goes through the
/// methods below, each of which reads the clock at most once, so callers never observe an
/// intermediate state.
pub struct TimeTrackingStore {
    projects: Vec<Project>,
    entries: Vec<TimeEntry>,
    next_project_id: u64,
    next_entry_id: u64,
    clock: Box<dyn Clock>,
}

impl TimeTrackingStore {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self {
            projects: vec![],
            entries: vec![],
            next_project_id: 1,
            next_entry_id: 1,
            clock,
        }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn entries(&self) -> &[TimeEntry] {
        &self.entries
    }

    pub fn project(&self, id: &ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| &p.id == id)
    }

    pub fn active_project(&self) -> Option<&Project> {
        self.projects.iter().find(|p| p.is_active())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.time()
    }

    pub fn today(&self) -> NaiveDate {
        local_date(self.now())
    }

    fn position(&self, id: &ProjectId) -> Result<usize, Rejected> {
        self.projects
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| Rejected::UnknownProject(id.clone()))
    }

    fn issue_project_id(&mut self) -> ProjectId {
        let id = self.next_project_id;
        self.next_project_id += 1;
        id.to_string().into()
    }

    fn issue_entry_id(&mut self) -> EntryId {
        let id = self.next_entry_id;
        self.next_entry_id += 1;
        id.to_string().into()
    }

    fn next_color(&self) -> ProjectColor {
        let palette = ProjectColor::PALETTE;
        palette[(self.next_project_id as usize - 1) % palette.len()]
    }

    /// Stops the running interval of the project at `index`, appending its entry.
    fn stop_at(&mut self, index: usize, now: DateTime<Utc>) -> Option<TimeEntry> {
        let start = self.projects[index].started_at?;
        let id = self.issue_entry_id();
        let project = &mut self.projects[index];
        let entry = TimeEntry::closing(id, project, start, now);
        project.time_spent += entry.duration;
        project.started_at = None;
        info!(
            "Stopped {} ({}) after {}s",
            project.name,
            project.id,
            entry.duration.num_seconds()
        );
        self.entries.push(entry.clone());
        Some(entry)
    }

    /// Starts or stops the timer of `id`. Starting a project while another one runs stops the
    /// other one first, so at most one timer runs after every call.
    pub fn toggle_timer(&mut self, id: &ProjectId) -> Result<Toggle, Rejected> {
        let index = self.position(id).inspect_err(|e| debug!("Ignoring toggle: {e}"))?;
        let now = self.clock.time();

        if let Some(entry) = self.stop_at(index, now) {
            return Ok(Toggle::Stopped { entry });
        }

        let previous = self
            .projects
            .iter()
            .position(|p| p.is_active())
            .and_then(|other| self.stop_at(other, now));

        let project = &mut self.projects[index];
        project.started_at = Some(now);
        info!("Started {} ({})", project.name, project.id);
        Ok(Toggle::Started {
            project: project.id.clone(),
            previous,
        })
    }

    /// Time spent on `project` including its running interval.
    pub fn current_time(&self, project: &Project) -> Duration {
        project.time_at(self.clock.time())
    }

    pub fn add_project(&mut self, fields: NewProject) -> Result<ProjectId, Rejected> {
        self.seed_project(fields, Duration::zero())
    }

    /// Adds a project that already carries completed work.
    pub fn seed_project(
        &mut self,
        fields: NewProject,
        time_spent: Duration,
    ) -> Result<ProjectId, Rejected> {
        fields
            .validate()
            .inspect_err(|e| debug!("Ignoring new project: {e}"))?;
        let color = self.next_color();
        let id = self.issue_project_id();
        let goal_time = fields.goal();
        let project = Project {
            id: id.clone(),
            name: fields.name,
            description: fields.description,
            color,
            time_spent,
            goal_time,
            started_at: None,
        };
        info!("Created project {} ({})", project.name, project.id);
        self.projects.push(project);
        Ok(id)
    }

    /// Replaces name, description and goal. Timer state and history are left alone.
    pub fn update_project(
        &mut self,
        id: &ProjectId,
        fields: ProjectFields,
    ) -> Result<&Project, Rejected> {
        let index = self
            .position(id)
            .and_then(|index| fields.validate().map(|_| index))
            .inspect_err(|e| debug!("Ignoring project update: {e}"))?;
        let goal_time = fields.goal();
        let project = &mut self.projects[index];
        project.name = fields.name;
        project.description = fields.description;
        project.goal_time = goal_time;
        info!("Updated project {} ({})", project.name, project.id);
        Ok(project)
    }

    /// Removes the project together with all of its time entries. A running interval is dropped
    /// without producing an entry.
    pub fn delete_project(&mut self, id: &ProjectId) -> Result<Removal, Rejected> {
        let index = self
            .position(id)
            .inspect_err(|e| debug!("Ignoring delete: {e}"))?;
        let project = self.projects.remove(index);
        let forfeited = project
            .started_at
            .map(|_| project.time_at(self.clock.time()) - project.time_spent);
        if let Some(forfeited) = forfeited {
            warn!(
                "Deleted running project {} ({}), dropping {}s of unsaved time",
                project.name,
                project.id,
                forfeited.num_seconds()
            );
        }

        let before = self.entries.len();
        self.entries.retain(|e| &e.project_id != id);
        let entries_removed = before - self.entries.len();
        info!(
            "Deleted project {} ({}) with {entries_removed} entries",
            project.name, project.id
        );

        Ok(Removal {
            project,
            entries_removed,
            forfeited,
        })
    }

    pub fn total_time_today(&self) -> Duration {
        stats::total_on(&self.entries, self.today())
    }

    pub fn sessions_today(&self) -> Vec<&TimeEntry> {
        stats::sessions_on(&self.entries, self.today())
    }

    pub fn average_session_today(&self) -> Duration {
        stats::average_session_on(&self.entries, self.today())
    }

    pub fn top_projects_today(&self, limit: usize) -> Vec<ProjectTotal> {
        stats::top_projects_on(&self.entries, self.today(), limit)
    }

    pub fn recent_sessions(&self, n: usize) -> Vec<&TimeEntry> {
        stats::recent_sessions(&self.entries, n)
    }

    /// Share of the daily goal reached, capped at 100%. Zero goals have no progress.
    pub fn goal_progress(&self, project: &Project) -> Option<Percentage> {
        stats::goal_progress(self.current_time(project), project.goal_time)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::utils::clock::{ManualClock, MockClock};

    use super::{NewProject, ProjectId, Rejected, TimeTrackingStore, Toggle};

    fn start_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 12, 9, 0, 0).unwrap()
    }

    fn store() -> (TimeTrackingStore, ManualClock) {
        let clock = ManualClock::new(start_time());
        (TimeTrackingStore::new(Box::new(clock.clone())), clock)
    }

    fn add(store: &mut TimeTrackingStore, name: &str) -> ProjectId {
        store.add_project(NewProject::new(name, "", 8)).unwrap()
    }

    fn assert_single_active(store: &TimeTrackingStore) {
        let active = store.projects().iter().filter(|p| p.is_active()).count();
        assert!(active <= 1, "{active} projects are running");
        for p in store.projects() {
            assert_eq!(p.is_active(), p.started_at().is_some());
        }
    }

    #[test]
    fn add_project_defaults() {
        let (mut store, _) = store();
        let id = store
            .add_project(NewProject::new("Web", "Client site", 8))
            .unwrap();
        let project = store.project(&id).unwrap();
        assert_eq!(project.name, "Web");
        assert_eq!(project.description, "Client site");
        assert_eq!(project.time_spent, Duration::zero());
        assert_eq!(project.goal_time, Duration::seconds(8 * 3600));
        assert!(!project.is_active());
    }

    #[test]
    fn add_project_rejects_blank_name() {
        let (mut store, _) = store();
        add(&mut store, "Existing");
        assert_eq!(
            store.add_project(NewProject::new("", "", 8)),
            Err(Rejected::EmptyName)
        );
        assert_eq!(
            store.add_project(NewProject::new("   ", "desc", 8)),
            Err(Rejected::EmptyName)
        );
        assert_eq!(store.projects().len(), 1);
    }

    #[test]
    fn add_project_accepts_zero_goal() {
        let (mut store, _) = store();
        let id = store.add_project(NewProject::new("Foo", "", 0)).unwrap();
        assert_eq!(store.project(&id).unwrap().goal_time, Duration::zero());
    }

    #[test]
    fn ids_are_unique_and_order_is_kept() {
        let (mut store, _) = store();
        let ids = ["a", "b", "c"].map(|n| add(&mut store, n));
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
        let names = store
            .projects()
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn start_then_stop_records_one_entry() {
        let (mut store, clock) = store();
        let id = add(&mut store, "A");

        let started = store.toggle_timer(&id).unwrap();
        assert_eq!(
            started,
            Toggle::Started {
                project: id.clone(),
                previous: None
            }
        );
        assert_eq!(store.project(&id).unwrap().started_at(), Some(start_time()));

        clock.advance(Duration::milliseconds(125_700));
        let Toggle::Stopped { entry } = store.toggle_timer(&id).unwrap() else {
            panic!("Expected the timer to stop");
        };

        assert_eq!(entry.duration, Duration::seconds(125));
        assert_eq!(entry.project_id, id);
        assert_eq!(entry.start_time, start_time());
        assert_eq!(entry.end_time, start_time() + Duration::milliseconds(125_700));
        assert_eq!(store.entries(), [entry]);

        let project = store.project(&id).unwrap();
        assert_eq!(project.time_spent, Duration::seconds(125));
        assert!(!project.is_active());
        assert_eq!(store.active_project(), None);
    }

    #[test]
    fn starting_another_project_stops_the_running_one() {
        let (mut store, clock) = store();
        let a = add(&mut store, "A");
        let b = add(&mut store, "B");

        store.toggle_timer(&a).unwrap();
        clock.advance_secs(125);
        store.toggle_timer(&a).unwrap();

        store.toggle_timer(&b).unwrap();
        clock.advance_secs(75);
        let toggle = store.toggle_timer(&a).unwrap();
        assert_single_active(&store);
        assert_eq!(toggle.entry().map(|e| e.project_id.clone()), Some(b.clone()));

        let Toggle::Started { project, previous } = toggle else {
            panic!("Expected A to start");
        };
        assert_eq!(project, a);
        let previous = previous.unwrap();
        assert_eq!(previous.project_id, b);
        assert_eq!(previous.duration, Duration::seconds(75));

        let durations = store
            .entries()
            .iter()
            .map(|e| e.duration.num_seconds())
            .collect::<Vec<_>>();
        assert_eq!(durations, [125, 75]);

        assert_eq!(store.project(&b).unwrap().time_spent, Duration::seconds(75));
        assert!(!store.project(&b).unwrap().is_active());
        let a = store.project(&a).unwrap();
        assert_eq!(a.started_at(), Some(start_time() + Duration::seconds(200)));
        assert_eq!(a.time_spent, Duration::seconds(125));
    }

    #[test]
    fn toggle_unknown_project_is_ignored() {
        let (mut store, clock) = store();
        let a = add(&mut store, "A");
        store.toggle_timer(&a).unwrap();
        clock.advance_secs(10);

        let missing = ProjectId::from("missing");
        assert_eq!(
            store.toggle_timer(&missing),
            Err(Rejected::UnknownProject(missing))
        );
        assert!(store.project(&a).unwrap().is_active());
        assert!(store.entries().is_empty());
    }

    #[test]
    fn arbitrary_toggles_keep_single_active() {
        let (mut store, clock) = store();
        let ids = ["a", "b", "c"].map(|n| add(&mut store, n));
        for step in 0..30usize {
            let id = &ids[(step * 7 + step / 3) % ids.len()];
            store.toggle_timer(id).unwrap();
            clock.advance_secs(step as i64 + 1);
            assert_single_active(&store);
        }
        let recorded: i64 = store.entries().iter().map(|e| e.duration.num_seconds()).sum();
        let spent: i64 = store
            .projects()
            .iter()
            .map(|p| p.time_spent.num_seconds())
            .sum();
        assert_eq!(recorded, spent);
    }

    #[test]
    fn current_time_includes_running_interval() {
        let (mut store, clock) = store();
        let id = store
            .seed_project(NewProject::new("A", "", 8), Duration::seconds(100))
            .unwrap();

        let project = store.project(&id).unwrap().clone();
        assert_eq!(store.current_time(&project), Duration::seconds(100));

        store.toggle_timer(&id).unwrap();
        let mut last = Duration::zero();
        for _ in 0..5 {
            clock.advance(Duration::milliseconds(600));
            let project = store.project(&id).unwrap();
            let current = store.current_time(project);
            assert!(current >= last);
            last = current;
        }
        assert_eq!(last, Duration::seconds(103));
    }

    #[test]
    fn toggle_reads_clock_once() {
        let mut clock = MockClock::new();
        clock.expect_time().times(1).returning(start_time);
        let mut store = TimeTrackingStore::new(Box::new(clock));
        let id = add(&mut store, "A");
        store.toggle_timer(&id).unwrap();
    }

    #[test]
    fn update_keeps_timer_and_history() {
        let (mut store, clock) = store();
        let id = add(&mut store, "Old");
        store.toggle_timer(&id).unwrap();
        clock.advance_secs(30);
        store.toggle_timer(&id).unwrap();
        store.toggle_timer(&id).unwrap();

        let project = store
            .update_project(&id, NewProject::new("New", "changed", 3))
            .unwrap();
        assert_eq!(project.name, "New");
        assert_eq!(project.description, "changed");
        assert_eq!(project.goal_time, Duration::hours(3));
        assert_eq!(project.time_spent, Duration::seconds(30));
        assert_eq!(project.started_at(), Some(start_time() + Duration::seconds(30)));

        assert_eq!(store.entries()[0].project_name, "Old");
    }

    #[test]
    fn update_rejects_without_mutation() {
        let (mut store, _) = store();
        let id = add(&mut store, "Keep");
        assert_eq!(
            store
                .update_project(&id, NewProject::new(" ", "changed", 2))
                .err(),
            Some(Rejected::EmptyName)
        );
        let missing = ProjectId::from("404");
        assert_eq!(
            store
                .update_project(&missing, NewProject::new("x", "", 2))
                .err(),
            Some(Rejected::UnknownProject(missing))
        );
        let project = store.project(&id).unwrap();
        assert_eq!(project.name, "Keep");
        assert_eq!(project.description, "");
        assert_eq!(project.goal_time, Duration::hours(8));
    }

    #[test]
    fn delete_cascades_to_entries_only_of_that_project() {
        let (mut store, clock) = store();
        let a = add(&mut store, "A");
        let b = add(&mut store, "B");
        for id in [&a, &b, &a, &b] {
            store.toggle_timer(id).unwrap();
            clock.advance_secs(10);
        }
        store.toggle_timer(&b).unwrap();
        let b_before = store.project(&b).unwrap().clone();

        let removal = store.delete_project(&a).unwrap();
        assert_eq!(removal.project.id, a);
        assert_eq!(removal.entries_removed, 2);
        assert_eq!(removal.forfeited, None);

        assert!(store.project(&a).is_none());
        assert_eq!(store.project(&b), Some(&b_before));
        assert_eq!(store.entries().len(), 2);
        assert!(store.entries().iter().all(|e| e.project_id == b));
    }

    #[test]
    fn delete_running_project_forfeits_interval() {
        let (mut store, clock) = store();
        let a = add(&mut store, "A");
        store.toggle_timer(&a).unwrap();
        clock.advance_secs(42);

        let removal = store.delete_project(&a).unwrap();
        assert_eq!(removal.forfeited, Some(Duration::seconds(42)));
        assert!(store.entries().is_empty());
        assert_eq!(store.active_project(), None);
    }

    #[test]
    fn delete_unknown_is_ignored() {
        let (mut store, _) = store();
        add(&mut store, "A");
        assert!(store.delete_project(&"9".into()).is_err());
        assert_eq!(store.projects().len(), 1);
    }

    #[test]
    fn total_today_excludes_yesterday() {
        let (mut store, clock) = store();
        let a = add(&mut store, "A");

        store.toggle_timer(&a).unwrap();
        clock.advance_secs(50);
        store.toggle_timer(&a).unwrap();

        clock.advance(Duration::days(1));
        store.toggle_timer(&a).unwrap();
        clock.advance_secs(20);
        store.toggle_timer(&a).unwrap();

        assert_eq!(store.total_time_today(), Duration::seconds(20));
        assert_eq!(store.sessions_today().len(), 1);
        assert_eq!(store.project(&a).unwrap().time_spent, Duration::seconds(70));
    }

    #[test]
    fn goal_progress_tracks_current_time() {
        let (mut store, clock) = store();
        let id = store.add_project(NewProject::new("A", "", 1)).unwrap();
        store.toggle_timer(&id).unwrap();
        clock.advance_secs(1800);
        let project = store.project(&id).unwrap();
        assert_eq!(store.goal_progress(project).map(|p| *p), Some(50.));

        let zero = store.add_project(NewProject::new("Z", "", 0)).unwrap();
        assert_eq!(store.goal_progress(store.project(&zero).unwrap()), None);
    }
}
