use crate::error::AppError;
use crate::processor::Outcome;
use std::fmt;
use std::path::Path;

/// One atomic metadata edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOp {
    Set { tag: String, value: String },
    /// Append to a repeatable tag such as IPTC keywords.
    Add { tag: String, value: String },
    Delete { tag: String },
}

impl MutationOp {
    pub fn tag(&self) -> &str {
        match self {
            MutationOp::Set { tag, .. } | MutationOp::Add { tag, .. } | MutationOp::Delete { tag } => tag,
        }
    }
}

impl fmt::Display for MutationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationOp::Set { tag, value } => write!(f, "set {} {}", tag, value),
            MutationOp::Add { tag, value } => write!(f, "add {} {}", tag, value),
            MutationOp::Delete { tag } => write!(f, "del {}", tag),
        }
    }
}

/// Ordered tag edits for one file. Cleanup deletions always run last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationPlan {
    edits: Vec<MutationOp>,
    cleanup: Vec<MutationOp>,
}

impl MutationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Setting a tag twice keeps its first position and the latest value.
    pub fn set(&mut self, tag: impl Into<String>, value: impl Into<String>) {
        let tag = tag.into();
        let value = value.into();
        for op in &mut self.edits {
            if let MutationOp::Set { tag: existing, value: current } = op {
                if *existing == tag {
                    *current = value;
                    return;
                }
            }
        }
        self.edits.push(MutationOp::Set { tag, value });
    }

    pub fn add(&mut self, tag: impl Into<String>, value: impl Into<String>) {
        self.edits.push(MutationOp::Add { tag: tag.into(), value: value.into() });
    }

    pub fn cleanup(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.cleanup.iter().any(|op| op.tag() == tag) {
            self.cleanup.push(MutationOp::Delete { tag });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty() && self.cleanup.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len() + self.cleanup.len()
    }

    pub fn into_operations(self) -> Vec<MutationOp> {
        let mut ops = self.edits;
        ops.extend(self.cleanup);
        ops
    }
}

/// Applies a single edit to a file, typically through an external tool.
pub trait MetadataWriter {
    fn apply(&self, path: &Path, op: &MutationOp) -> Result<(), AppError>;
}

pub struct MutationDispatcher<'a> {
    writer: &'a dyn MetadataWriter,
}

impl<'a> MutationDispatcher<'a> {
    pub fn new(writer: &'a dyn MetadataWriter) -> Self {
        Self { writer }
    }

    /// Run the plan in order, stopping at the first failed operation.
    /// Earlier writes are not rolled back.
    pub fn apply(&self, path: &Path, plan: MutationPlan) -> Outcome {
        if plan.is_empty() {
            return Outcome::success("Nothing to do");
        }

        let total = plan.len();
        let ops = plan.into_operations();
        for (idx, op) in ops.iter().enumerate() {
            log::trace!("Running '{}' on {:?}", op, path);
            if let Err(e) = self.writer.apply(path, op) {
                log::error!("'{}' failed on {}: {}", op, path.display(), e);
                if idx > 0 {
                    log::warn!("{} of {} updates were already written to {}", idx, total, path.display());
                }
                return Outcome::failure(format!("Failed to update ({})", op));
            }
        }
        Outcome::success("Updated")
    }
}
