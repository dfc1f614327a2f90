//! gasprobe: test-run automation for bound spreadsheet script projects.
//!
//! Drives the script editor and spreadsheet UI through Chromium over CDP, or
//! calls functions through the script-execution API, and turns what comes back
//! into [`TestResult`](gasprobe_protocol::TestResult) records.
//!
//! # Main Types
//!
//! - [`Session`] - browser session with polling waits and JS evaluation
//! - [`EditorRunner`] / [`ApiRunner`] - the two [`FunctionRunner`] implementations
//! - [`LogStore`] - log files and JSON reports on disk
//! - [`Settings`] - every tunable with working defaults
//!
//! ```ignore
//! use gasprobe::{EditorRunner, LaunchOptions, LogStore, Session, Settings, SuiteOptions, run_suite};
//!
//! let settings = Settings::default();
//! let session = Session::launch(&LaunchOptions::from(&settings.browser)).await?;
//! let mut runner = EditorRunner::new(&session, &settings, LogStore::new(settings.logs_dir()));
//! runner.open_editor().await?;
//! let results = run_suite(&mut runner, &settings.tests.functions, &SuiteOptions::default()).await;
//! session.close().await?;
//! ```

pub mod api;
pub mod browser;
pub mod classify;
pub mod courses;
pub mod editor;
pub mod error;
pub mod logstore;
pub mod oauth;
pub mod report;
pub mod retry;
pub mod settings;
pub mod sheets;
pub mod suite;

pub use api::{ApiRunner, ScriptClient};
pub use browser::{LaunchOptions, Locator, Session};
pub use classify::{Classification, FunctionMention, Mention, classify};
pub use editor::{EditorRunner, LogCheck, PrepareOutcome};
pub use error::{Error, Result};
pub use logstore::{LogStore, ReportKind};
pub use oauth::Authorizer;
pub use retry::RetryPolicy;
pub use settings::Settings;
pub use suite::{FunctionRunner, SuiteOptions, run_suite, run_with_retry};
