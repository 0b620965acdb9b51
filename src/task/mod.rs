use std::fmt;
use std::path::PathBuf;

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

pub mod web;

/// Due date formats tried in order when none are configured.
pub const DEFAULT_DATE_FORMATS: &[&str] = &["%d.%m.%Y %H:%M", "%Y-%m-%dT%H:%M"];

/// Format used for the display string attached to each scheduled task.
const DISPLAY_DATE_FORMAT: &str = "%d. %m. %Y o %H:%M";

/// A single to-do item as it is persisted.
///
/// `is_urgent` is derived state: it is recomputed over the whole
/// collection on every read and only ends up in the file because the
/// next mutation writes the collection back in full.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u32,
    pub text: String,
    pub done: bool,
    pub due_date: String,
    pub priority: String,
    pub order: usize,
    #[serde(default)]
    pub is_urgent: bool,
}

/// A task prepared for rendering, carrying the formatted due date.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TaskView {
    pub id: u32,
    pub text: String,
    pub done: bool,
    pub due_date: String,
    pub priority: String,
    pub is_urgent: bool,
    pub due_date_formatted: String,
}

/// The four display buckets of the read view.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Schedule {
    pub overdue: Vec<TaskView>,
    pub today: Vec<TaskView>,
    pub tomorrow: Vec<TaskView>,
    pub later: Vec<TaskView>,
}

/// Filter requested by the read view. Unrecognized values behave as `All`.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Deserialize)]
#[serde(from = "String")]
pub enum TaskFilter {
    #[default]
    All,
    Done,
    NotDone,
    High,
    Medium,
    Low,
}

impl From<String> for TaskFilter {
    fn from(value: String) -> Self {
        match value.as_str() {
            "done" => TaskFilter::Done,
            "not_done" => TaskFilter::NotDone,
            "high" => TaskFilter::High,
            "medium" => TaskFilter::Medium,
            "low" => TaskFilter::Low,
            _ => TaskFilter::All,
        }
    }
}

impl TaskFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskFilter::All => "all",
            TaskFilter::Done => "done",
            TaskFilter::NotDone => "not_done",
            TaskFilter::High => "high",
            TaskFilter::Medium => "medium",
            TaskFilter::Low => "low",
        }
    }

    fn matches(&self, task: &Task) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Done => task.done,
            TaskFilter::NotDone => !task.done,
            TaskFilter::High => task.priority == "high",
            TaskFilter::Medium => task.priority == "medium",
            TaskFilter::Low => task.priority == "low",
        }
    }
}

impl fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort mode requested by the read view. Anything other than `auto`
/// leaves the collection in insertion order.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Deserialize)]
#[serde(from = "String")]
pub enum SortMode {
    #[default]
    Auto,
    Manual,
}

impl From<String> for SortMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "auto" => SortMode::Auto,
            _ => SortMode::Manual,
        }
    }
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Auto => "auto",
            SortMode::Manual => "manual",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    /// The due date text matched none of the configured formats.
    #[error("Due date '{value}' matches no configured format")]
    InvalidDueDate {
        value: String,
        #[source]
        source: chrono::format::ParseError,
    },
    /// The configured format list is empty, so nothing can parse.
    #[error("No due date formats configured")]
    NoDateFormats,
    /// Represents a storage I/O error.
    #[error("Task storage I/O error")]
    Io(#[from] std::io::Error),
    /// Represents malformed data in the storage file.
    #[error("Task storage contains malformed data: {0}")]
    MalformedStorage(#[from] serde_json::Error),
}

/// Sort rank of a priority label: `high` before `medium` before `low`,
/// anything unrecognized last.
fn priority_rank(priority: &str) -> u8 {
    match priority {
        "high" => 1,
        "medium" => 2,
        "low" => 3,
        _ => 4,
    }
}

/// Parses a due date by attempting each format in order; the first
/// success wins. On total failure the error carries the last underlying
/// parse error.
pub fn parse_due_date(value: &str, formats: &[String]) -> Result<NaiveDateTime, TaskServiceError> {
    let mut last_error = None;
    for format in formats {
        match NaiveDateTime::parse_from_str(value, format) {
            Ok(parsed) => return Ok(parsed),
            Err(error) => last_error = Some(error),
        }
    }
    match last_error {
        Some(source) => Err(TaskServiceError::InvalidDueDate {
            value: value.to_string(),
            source,
        }),
        None => Err(TaskServiceError::NoDateFormats),
    }
}

/// Owns the task collection, the next-id counter and the backing file.
///
/// Every mutation writes the full collection back to the file before
/// returning; the in-memory list is the source of truth between writes.
#[derive(Debug)]
pub struct TaskService {
    tasks: Vec<Task>,
    next_id: u32,
    path: PathBuf,
    date_formats: Vec<String>,
}

impl TaskService {
    /// Loads the task collection from `path`. A missing file means no
    /// tasks yet; the next id is seeded as `max(id) + 1`, or 1 when the
    /// collection is empty.
    pub fn load(
        path: impl Into<PathBuf>,
        date_formats: Vec<String>,
    ) -> Result<Self, TaskServiceError> {
        let path = path.into();
        let tasks: Vec<Task> = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(error) => return Err(error.into()),
        };
        let next_id = tasks.iter().map(|task| task.id).max().map_or(1, |id| id + 1);
        Ok(Self {
            tasks,
            next_id,
            path,
            date_formats,
        })
    }

    /// Writes the full collection to the backing file, replacing its
    /// previous contents.
    fn persist(&self) -> Result<(), TaskServiceError> {
        let file = std::fs::File::create(&self.path)?;
        serde_json::to_writer_pretty(file, &self.tasks)?;
        Ok(())
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Returns the task with the given id, if any.
    pub fn get_task(&self, id: u32) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Appends a new task and persists the collection.
    ///
    /// Both `text` and `due_date` must be non-empty, otherwise nothing is
    /// created and `None` is returned. `priority` is stored as given; the
    /// due date text is not validated here, only at read time.
    ///
    /// # Returns
    ///
    /// The id assigned to the new task, or `None` when creation was
    /// skipped.
    #[tracing::instrument(skip(self))]
    pub fn add_task(
        &mut self,
        text: &str,
        due_date: &str,
        priority: &str,
    ) -> Result<Option<u32>, TaskServiceError> {
        if text.is_empty() || due_date.is_empty() {
            tracing::info!("Skipping task creation with missing text or due date");
            return Ok(None);
        }
        let id = self.next_id;
        self.tasks.push(Task {
            id,
            text: text.to_string(),
            done: false,
            due_date: due_date.to_string(),
            priority: priority.to_string(),
            order: self.tasks.len(),
            is_urgent: false,
        });
        self.next_id += 1;
        self.persist()?;
        Ok(Some(id))
    }

    /// Removes the task with the given id and persists. Unknown ids are
    /// a no-op, apart from the persistence round-trip.
    #[tracing::instrument(skip(self))]
    pub fn delete_task(&mut self, id: u32) -> Result<(), TaskServiceError> {
        self.tasks.retain(|task| task.id != id);
        self.persist()
    }

    /// Flips the completion flag of the first task with the given id and
    /// persists. Unknown ids are a no-op, apart from the persistence
    /// round-trip.
    #[tracing::instrument(skip(self))]
    pub fn toggle_task(&mut self, id: u32) -> Result<(), TaskServiceError> {
        if let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) {
            task.done = !task.done;
        }
        self.persist()
    }

    /// Overwrites the text and due date of the task with the given id,
    /// leaving priority and completion untouched, and persists.
    ///
    /// # Returns
    ///
    /// `true` if the task existed. Unknown ids change nothing and skip
    /// the write.
    #[tracing::instrument(skip(self))]
    pub fn edit_task(
        &mut self,
        id: u32,
        text: &str,
        due_date: &str,
    ) -> Result<bool, TaskServiceError> {
        match self.tasks.iter_mut().find(|task| task.id == id) {
            Some(task) => {
                task.text = text.to_string();
                task.due_date = due_date.to_string();
                self.persist()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Computes the read view: recomputes urgency over the whole
    /// collection, optionally sorts by due date then priority rank,
    /// applies the filter and partitions into the four buckets.
    ///
    /// A due date that matches no configured format aborts the whole
    /// computation.
    #[tracing::instrument(skip(self))]
    pub fn schedule(
        &mut self,
        filter: TaskFilter,
        sort: SortMode,
        now: NaiveDateTime,
    ) -> Result<Schedule, TaskServiceError> {
        // Urgency is a property of the full collection, not of the
        // filtered view.
        for task in &mut self.tasks {
            let due = parse_due_date(&task.due_date, &self.date_formats)?;
            let left = due - now;
            task.is_urgent = left > TimeDelta::zero() && left <= TimeDelta::seconds(86400);
        }

        let mut working = Vec::with_capacity(self.tasks.len());
        for task in &self.tasks {
            let due = parse_due_date(&task.due_date, &self.date_formats)?;
            working.push((due, task.clone()));
        }
        if sort == SortMode::Auto {
            // Stable, so tasks with identical due date and priority keep
            // their insertion order.
            working.sort_by_key(|(due, task)| (*due, priority_rank(&task.priority)));
        }

        let today = now.date();
        let tomorrow = today + chrono::Days::new(1);
        let mut schedule = Schedule::default();
        for (due, task) in working {
            if !filter.matches(&task) {
                continue;
            }
            let view = TaskView {
                id: task.id,
                text: task.text,
                done: task.done,
                due_date: task.due_date,
                priority: task.priority,
                is_urgent: task.is_urgent,
                due_date_formatted: due.format(DISPLAY_DATE_FORMAT).to_string(),
            };
            let due_day = due.date();
            if due_day < today && !view.done {
                schedule.overdue.push(view);
            } else if due_day == today {
                schedule.today.push(view);
            } else if due_day == tomorrow {
                schedule.tomorrow.push(view);
            } else {
                schedule.later.push(view);
            }
        }
        Ok(schedule)
    }
}
