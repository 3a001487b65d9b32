//! Aggregate statistics over a task collection.
//!
//! `AnalyticsVisitor` fans every visited task out to independent
//! sub-visitors and folds their results into one [`Analytics`] value.

use serde::Serialize;

use crate::annotation::AnnotatedTask;
use crate::models::TaskStatus;

/// Anything that can be walked over a collection of annotated tasks.
pub trait TaskVisitor {
    fn visit(&mut self, task: &AnnotatedTask);
}

/// Task counts per known status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusHistogram {
    pub to_do: usize,
    pub in_progress: usize,
    pub done: usize,
}

impl StatusHistogram {
    pub fn get(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::ToDo => self.to_do,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Done => self.done,
            TaskStatus::Unrecognized => 0,
        }
    }

    pub fn total(&self) -> usize {
        self.to_do + self.in_progress + self.done
    }
}

/// Immutable result of one analytics pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Analytics {
    pub total_count: usize,
    pub status_histogram: StatusHistogram,
    pub priority_count: usize,
    pub frozen_count: usize,
}

#[derive(Debug, Default)]
pub struct StatusVisitor {
    histogram: StatusHistogram,
}

impl TaskVisitor for StatusVisitor {
    fn visit(&mut self, task: &AnnotatedTask) {
        match task.fields().status {
            TaskStatus::ToDo => self.histogram.to_do += 1,
            TaskStatus::InProgress => self.histogram.in_progress += 1,
            TaskStatus::Done => self.histogram.done += 1,
            TaskStatus::Unrecognized => {},
        }
    }
}

/// Counts tasks carrying a priority layer anywhere in their chain.
#[derive(Debug, Default)]
pub struct PriorityVisitor {
    count: usize,
}

impl TaskVisitor for PriorityVisitor {
    fn visit(&mut self, task: &AnnotatedTask) {
        if task.is_priority() {
            self.count += 1;
        }
    }
}

/// Counts tasks carrying a frozen layer anywhere in their chain.
#[derive(Debug, Default)]
pub struct FrozenVisitor {
    count: usize,
}

impl TaskVisitor for FrozenVisitor {
    fn visit(&mut self, task: &AnnotatedTask) {
        if task.is_frozen() {
            self.count += 1;
        }
    }
}

/// Composite visitor producing an [`Analytics`] summary.
///
/// `finish` consumes the visitor, so one instance serves exactly one pass.
#[derive(Debug, Default)]
pub struct AnalyticsVisitor {
    total: usize,
    status: StatusVisitor,
    priority: PriorityVisitor,
    frozen: FrozenVisitor,
}

impl AnalyticsVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> Analytics {
        Analytics {
            total_count: self.total,
            status_histogram: self.status.histogram,
            priority_count: self.priority.count,
            frozen_count: self.frozen.count,
        }
    }
}

impl TaskVisitor for AnalyticsVisitor {
    fn visit(&mut self, task: &AnnotatedTask) {
        self.total += 1;
        self.status.visit(task);
        self.priority.visit(task);
        self.frozen.visit(task);
    }
}

/// Run a fresh [`AnalyticsVisitor`] over `tasks`.
pub fn compute<'a, I>(tasks: I) -> Analytics
where
    I: IntoIterator<Item = &'a AnnotatedTask>,
{
    let mut visitor = AnalyticsVisitor::new();
    for task in tasks {
        task.accept(&mut visitor);
    }
    visitor.finish()
}
