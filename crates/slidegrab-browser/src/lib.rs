//! Browser automation for JavaScript-heavy listing sites.
//!
//! Every task attempt gets its own Chromium process from the
//! [`BrowserSessionFactory`], which plugs into the worker pool as its
//! session factory. Page interaction goes through [`BrowserActions`] so
//! domain actions can be exercised against canned pages in tests.

pub mod actions;
pub mod engine;
pub mod error;
pub mod fingerprint;

pub use actions::BrowserActions;
pub use engine::{BrowserSession, BrowserSessionFactory};
pub use error::{BrowserError, Result};
pub use fingerprint::FingerprintConfig;
