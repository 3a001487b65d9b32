use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::annotation::AnnotatedTask;
use crate::error::{Result, TaskError};

/// Ordering applied to the collection before it is presented.
///
/// All strategies are stable: tasks with equal keys keep their relative
/// order. `None` leaves the input order untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortStrategy {
    #[default]
    None,
    Title,
    Status,
    Assignee,
}

impl SortStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortStrategy::None => "none",
            SortStrategy::Title => "title",
            SortStrategy::Status => "status",
            SortStrategy::Assignee => "assignee",
        }
    }

    /// Return a sorted copy of `tasks`; the input is left as is.
    pub fn sort(&self, tasks: &[AnnotatedTask]) -> Vec<AnnotatedTask> {
        let mut sorted = tasks.to_vec();
        if *self != SortStrategy::None {
            sorted.sort_by(|a, b| self.compare(a, b));
        }
        sorted
    }

    pub fn compare(&self, a: &AnnotatedTask, b: &AnnotatedTask) -> Ordering {
        let (a, b) = (a.fields(), b.fields());
        match self {
            SortStrategy::None => Ordering::Equal,
            SortStrategy::Title => a.title.cmp(&b.title),
            SortStrategy::Status => a.status.rank().cmp(&b.status.rank()),
            SortStrategy::Assignee => a.assigned_user_id.cmp(&b.assigned_user_id),
        }
    }
}

impl fmt::Display for SortStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortStrategy {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" | "" => Ok(SortStrategy::None),
            "title" => Ok(SortStrategy::Title),
            "status" => Ok(SortStrategy::Status),
            "assignee" | "assigned_user" | "assigned_user_id" => Ok(SortStrategy::Assignee),
            other => Err(TaskError::Validation(format!(
                "Invalid sort strategy '{}'. Valid values: none, title, status, assignee",
                other
            ))),
        }
    }
}

/// Holder for the active strategy; swapped at runtime by the controller.
#[derive(Debug, Clone, Default)]
pub struct TaskSorter {
    strategy: SortStrategy,
}

impl TaskSorter {
    pub fn new(strategy: SortStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> SortStrategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: SortStrategy) {
        self.strategy = strategy;
    }

    pub fn sort(&self, tasks: &[AnnotatedTask]) -> Vec<AnnotatedTask> {
        self.strategy.sort(tasks)
    }
}
