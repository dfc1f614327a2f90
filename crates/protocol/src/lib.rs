//! Artifact and wire types shared by the gasprobe crates.
//!
//! # Main Types
//!
//! - [`TestResult`] / [`TestOutcome`] - one record per executed test function
//! - [`Report`] - the aggregate JSON report written after a run
//! - [`ExecutionRequest`] / [`Operation`] / [`ExecutionOutcome`] - script-execution API
//! - [`ClientSecrets`] / [`AuthorizedUser`] - OAuth credential files

pub mod oauth;
pub mod report;
pub mod result;
pub mod script_api;

pub use oauth::{AuthorizedUser, ClientSecrets, InstalledApp, TokenResponse};
pub use report::{Report, ReportSource, ReportSummary};
pub use result::{TestOutcome, TestResult};
pub use script_api::{ExecutionError, ExecutionOutcome, ExecutionRequest, Operation, OperationResponse, StackFrame, Status};
