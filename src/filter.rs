//! Filtered views and counters derived from the task collection.
//!
//! Everything here is a pure function of the collection and a [`Filter`];
//! nothing is cached, so a view can never lag behind the tasks it came from.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::task::Task;

/// Which subset of the collection to show
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub const ALL: [Filter; 3] = [Filter::All, Filter::Active, Filter::Completed];

    /// Parse a selector; anything unrecognized means [`Filter::All`].
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Filter::Active,
            "completed" => Filter::Completed,
            _ => Filter::All,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Active => "active",
            Filter::Completed => "completed",
        }
    }

    pub fn matches(self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !task.completed,
            Filter::Completed => task.completed,
        }
    }

    /// Text shown when the view has no tasks
    pub fn empty_message(self) -> String {
        match self {
            Filter::All => "No tasks yet. Add one above!".to_string(),
            other => format!("No {} tasks found.", other.as_str()),
        }
    }
}

impl FromStr for Filter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Filter::parse(s))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate counters over a collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub active_count: usize,
    pub completed_count: usize,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let completed_count = tasks.iter().filter(|task| task.completed).count();
        Self {
            total: tasks.len(),
            active_count: tasks.len() - completed_count,
            completed_count,
        }
    }

    /// `completed / total`, or `None` for an empty collection
    pub fn completion_ratio(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(self.completed_count as f64 / self.total as f64)
    }

    /// Completion rounded down to a whole percent
    pub fn percent_complete(&self) -> Option<u8> {
        if self.total == 0 {
            return None;
        }
        Some((self.completed_count * 100 / self.total) as u8)
    }

    /// Count shown next to a filter selector
    pub fn count_for(&self, filter: Filter) -> usize {
        match filter {
            Filter::All => self.total,
            Filter::Active => self.active_count,
            Filter::Completed => self.completed_count,
        }
    }
}

/// Filtered subsequence plus counters for the whole collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedView<'a> {
    pub filter: Filter,
    pub filtered_tasks: Vec<&'a Task>,
    pub total: usize,
    pub active_count: usize,
    pub completed_count: usize,
}

impl DerivedView<'_> {
    pub fn stats(&self) -> TaskStats {
        TaskStats {
            total: self.total,
            active_count: self.active_count,
            completed_count: self.completed_count,
        }
    }

    pub fn completion_ratio(&self) -> Option<f64> {
        self.stats().completion_ratio()
    }

    pub fn is_empty(&self) -> bool {
        self.filtered_tasks.is_empty()
    }
}

/// Derive the view of `tasks` selected by `filter`, preserving order
pub fn derive_view(tasks: &[Task], filter: Filter) -> DerivedView<'_> {
    let stats = TaskStats::from_tasks(tasks);
    DerivedView {
        filter,
        filtered_tasks: tasks.iter().filter(|task| filter.matches(task)).collect(),
        total: stats.total,
        active_count: stats.active_count,
        completed_count: stats.completed_count,
    }
}
