//! Frame graph error type

use thiserror::Error;

use crate::backend::BackendError;

/// Errors raised while declaring, compiling or executing a frame graph.
///
/// Declaration and dependency errors are fatal to the compilation they occur
/// in. Backend errors surface from `execute` as a failed frame.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameGraphError {
    #[error("pass '{pass}' created resource '{resource}' twice")]
    DuplicateCreate { pass: String, resource: String },

    #[error(
        "resource '{resource}' is already created by pass '{creator}', \
         pass '{pass}' cannot create it"
    )]
    CreatorAlreadySet {
        resource: String,
        creator: String,
        pass: String,
    },

    #[error("resource '{name}' was redeclared with a conflicting descriptor")]
    DescriptorMismatch { name: String },

    #[error("pass '{pass}' references unknown resource #{index}")]
    UnknownResource { pass: String, index: u32 },

    #[error("handle to resource #{index} belongs to frame graph {handle_graph}, not {graph}")]
    ForeignHandle {
        index: u32,
        handle_graph: u64,
        graph: u64,
    },

    #[error("resource '{name}' is a {actual}, not a {expected}")]
    ResourceKindMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("pass '{pass}' uses resource '{resource}' which no registered pass creates")]
    MissingProducer { pass: String, resource: String },

    #[error("cyclic dependency between passes: {}", .passes.join(", "))]
    CyclicDependency { passes: Vec<String> },

    #[error("retained resource '{name}' does not match its backing object: {reason}")]
    RetainedMismatch { name: String, reason: String },

    #[error("backing object of retained resource '{name}' is not alive")]
    RetainedObjectMissing { name: String },

    #[error("resource '{name}' is not realized")]
    NotRealized { name: String },

    #[error("pass '{pass}' did not declare access to resource '{resource}'")]
    UndeclaredAccess { pass: String, resource: String },

    #[error("frame graph was already executed")]
    AlreadyExecuted,

    #[error("pass '{pass}' failed: {reason}")]
    PassFailed { pass: String, reason: String },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type FrameGraphResult<T> = Result<T, FrameGraphError>;
