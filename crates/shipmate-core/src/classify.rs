//! HTTP response classification shared by every remote call

use crate::error::FailureKind;

/// The remote endpoints shipmate talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// `GET /repos/{org}/{repo}/branches/{branch}`
    BranchDetail,
    /// `GET /repos/{org}/{repo}/commits/{sha}`
    CommitDetail,
    /// `GET /repos/{org}/{repo}/git/refs/tags/{tag}`
    TagRef,
    /// `GET` on the tag object url returned by a tag ref
    TagObject,
    /// `POST /repos/{org}/{repo}/git/tags`
    CreateTagObject,
    /// `POST /repos/{org}/{repo}/git/refs`
    CreateRef,
    /// `GET /repos/{org}/{repo}/actions/runs?...`
    WorkflowRuns,
    /// `GET` on a run url
    WorkflowRun,
    /// `GET` on a run's jobs url
    WorkflowJobs,
    /// Unauthenticated registry tag lookup
    ContainerTag,
}

impl EndpointKind {
    /// Status code that means the call did what was asked
    pub fn success_status(self) -> u16 {
        match self {
            EndpointKind::CreateTagObject | EndpointKind::CreateRef => 201,
            _ => 200,
        }
    }

    /// Whether a 422 means "malformed reference" for this endpoint
    fn accepts_unprocessable(self) -> bool {
        matches!(
            self,
            EndpointKind::CommitDetail | EndpointKind::CreateTagObject | EndpointKind::CreateRef
        )
    }
}

impl std::fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EndpointKind::BranchDetail => "branch",
            EndpointKind::CommitDetail => "commit",
            EndpointKind::TagRef => "tag ref",
            EndpointKind::TagObject => "tag object",
            EndpointKind::CreateTagObject => "create tag object",
            EndpointKind::CreateRef => "create ref",
            EndpointKind::WorkflowRuns => "workflow runs",
            EndpointKind::WorkflowRun => "workflow run",
            EndpointKind::WorkflowJobs => "workflow jobs",
            EndpointKind::ContainerTag => "container tag",
        };
        f.write_str(name)
    }
}

/// Outcome of a remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    Success,
    NotFound,
    Invalid,
    TransientFatal,
}

impl ResponseClass {
    /// The failure kind this class maps to, `None` on success
    pub fn failure_kind(self) -> Option<FailureKind> {
        match self {
            ResponseClass::Success => None,
            ResponseClass::NotFound => Some(FailureKind::NotFound),
            ResponseClass::Invalid => Some(FailureKind::Invalid),
            ResponseClass::TransientFatal => Some(FailureKind::TransientOrUnexpected),
        }
    }
}

/// Classify a status code returned by `kind`
///
/// Registry lookups only distinguish found from absent, so every non-200 is
/// `NotFound` there.
pub fn classify(kind: EndpointKind, status: u16) -> ResponseClass {
    if status == kind.success_status() {
        return ResponseClass::Success;
    }
    if kind == EndpointKind::ContainerTag {
        return ResponseClass::NotFound;
    }
    match status {
        404 => ResponseClass::NotFound,
        422 if kind.accepts_unprocessable() => ResponseClass::Invalid,
        _ => ResponseClass::TransientFatal,
    }
}
