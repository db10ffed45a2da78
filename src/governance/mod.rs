//! Governance policies over one repository.

pub mod branches;
pub mod merge;
pub mod repository;
pub mod resume;
pub mod runs;
pub mod versions;

pub use branches::{BranchCategory, BranchClassifier};
pub use merge::{BaseMergeOutcome, MergeCoordinator};
pub use repository::MonitoredRepository;
pub use resume::CiResumeAuthorizer;
pub use runs::{PassReport, RetentionDecision, WorkflowRunGovernor};
pub use versions::{
    parse_manifest_version, resolve_branch_name_for_milestone, resolve_milestone_for_branch,
    resolve_milestone_for_mainline, Version,
};
