//! Client-local task annotations.
//!
//! A task carries its priority and frozen markers as wrapper layers around
//! the service record rather than as flags on it. Layers are always stacked
//! in the same order, priority innermost and frozen outermost, so any
//! sequence of toggles that ends with the same markers produces the same
//! chain and the same render output.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::analytics::TaskVisitor;
use crate::error::{Result, TaskError};
use crate::models::{TaskFields, TaskRecord};

/// One kind of annotation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Priority,
    Frozen,
}

impl AnnotationKind {
    /// Style attribute this layer adds to the render output.
    fn style_contribution(&self) -> (&'static str, &'static str) {
        match self {
            AnnotationKind::Priority => ("border", "2px solid red"),
            AnnotationKind::Frozen => ("color", "lightgrey"),
        }
    }
}

/// The annotation flags a chain encodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Annotations {
    pub priority: bool,
    pub frozen: bool,
}

impl Annotations {
    pub fn toggled(self, kind: AnnotationKind) -> Self {
        match kind {
            AnnotationKind::Priority => Self {
                priority: !self.priority,
                ..self
            },
            AnnotationKind::Frozen => Self {
                frozen: !self.frozen,
                ..self
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.priority && !self.frozen
    }
}

/// Render output of a (possibly decorated) task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Rendered {
    pub style: BTreeMap<String, String>,
}

/// A task record wrapped in zero or more annotation layers.
///
/// Chains are values: toggling returns a new chain and never touches the
/// one it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotatedTask {
    Base(TaskRecord),
    Priority(Box<AnnotatedTask>),
    Frozen(Box<AnnotatedTask>),
}

impl AnnotatedTask {
    pub fn new(record: TaskRecord) -> Self {
        AnnotatedTask::Base(record)
    }

    /// Build the canonical chain for `record` carrying `annotations`.
    pub fn build(record: TaskRecord, annotations: Annotations) -> Self {
        let mut task = AnnotatedTask::Base(record);
        if annotations.priority {
            task = AnnotatedTask::Priority(Box::new(task));
        }
        if annotations.frozen {
            task = AnnotatedTask::Frozen(Box::new(task));
        }
        task
    }

    /// Add the priority layer, or remove it when already present.
    pub fn toggle_priority(&self) -> Self {
        self.toggle(AnnotationKind::Priority)
    }

    /// Add the frozen layer, or remove it when already present.
    pub fn toggle_frozen(&self) -> Self {
        self.toggle(AnnotationKind::Frozen)
    }

    pub fn toggle(&self, kind: AnnotationKind) -> Self {
        Self::build(self.record().clone(), self.annotations().toggled(kind))
    }

    /// Same annotations around a different record (used after an update).
    pub fn with_record(&self, record: TaskRecord) -> Self {
        Self::build(record, self.annotations())
    }

    /// The immediately wrapped task, one layer removed.
    pub fn undecorate(&self) -> Result<&AnnotatedTask> {
        match self {
            AnnotatedTask::Priority(inner) | AnnotatedTask::Frozen(inner) => Ok(inner),
            AnnotatedTask::Base(record) => Err(TaskError::InvalidOperation(format!(
                "task {} has no annotation layer to remove",
                record.id
            ))),
        }
    }

    /// The underlying service record, whatever the number of layers.
    pub fn record(&self) -> &TaskRecord {
        match self {
            AnnotatedTask::Base(record) => record,
            AnnotatedTask::Priority(inner) | AnnotatedTask::Frozen(inner) => inner.record(),
        }
    }

    pub fn id(&self) -> &str {
        &self.record().id
    }

    pub fn fields(&self) -> &TaskFields {
        &self.record().task
    }

    /// Kind of the outermost layer, `None` for an undecorated task.
    pub fn outermost(&self) -> Option<AnnotationKind> {
        match self {
            AnnotatedTask::Base(_) => None,
            AnnotatedTask::Priority(_) => Some(AnnotationKind::Priority),
            AnnotatedTask::Frozen(_) => Some(AnnotationKind::Frozen),
        }
    }

    pub fn has_layer(&self, kind: AnnotationKind) -> bool {
        match self {
            AnnotatedTask::Base(_) => false,
            AnnotatedTask::Priority(inner) => {
                kind == AnnotationKind::Priority || inner.has_layer(kind)
            },
            AnnotatedTask::Frozen(inner) => kind == AnnotationKind::Frozen || inner.has_layer(kind),
        }
    }

    pub fn is_priority(&self) -> bool {
        self.has_layer(AnnotationKind::Priority)
    }

    pub fn is_frozen(&self) -> bool {
        self.has_layer(AnnotationKind::Frozen)
    }

    pub fn annotations(&self) -> Annotations {
        Annotations {
            priority: self.is_priority(),
            frozen: self.is_frozen(),
        }
    }

    /// Base render merged with each layer's style, inner layers first.
    pub fn render(&self) -> Rendered {
        match self {
            AnnotatedTask::Base(_) => Rendered::default(),
            AnnotatedTask::Priority(inner) => merge(inner.render(), AnnotationKind::Priority),
            AnnotatedTask::Frozen(inner) => merge(inner.render(), AnnotationKind::Frozen),
        }
    }

    /// Hand the whole chain to `visitor`, outermost layer included.
    pub fn accept<V: TaskVisitor + ?Sized>(&self, visitor: &mut V) {
        visitor.visit(self);
    }

    pub fn to_view(&self) -> TaskView {
        TaskView {
            id: self.id().to_string(),
            task: self.fields().clone(),
            annotations: self.annotations(),
            style: self.render().style,
        }
    }
}

fn merge(mut rendered: Rendered, kind: AnnotationKind) -> Rendered {
    let (key, value) = kind.style_contribution();
    rendered.style.insert(key.to_string(), value.to_string());
    rendered
}

/// Flattened, serializable form of an annotated task for output.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub id: String,
    pub task: TaskFields,
    pub annotations: Annotations,
    pub style: BTreeMap<String, String>,
}
