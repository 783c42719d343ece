//! Student Activity Module
//!
//! Per-course report of enrolled participants with their forum activity:
//! how many posts and discussions each participant wrote, counted only
//! within the forums the viewing user is allowed to read.
//!
//! ## Architecture
//!
//! ### Contract Layer (`student-activity-sdk`)
//! - **Location:** `modules/student-activity/student-activity-sdk/`
//! - **Purpose:** Public API contract and collaborator interfaces
//! - **Contains:**
//!   - `StudentActivityClientV1` trait
//!   - Directory models: `Course`, `Forum`, `Discussion`, `Post`, ...
//!   - Report models: `ReportRequest`, `StudentActivityReport`, ...
//!   - Post visibility predicates: `PostScope`, `PostFilter`
//!   - Collaborator traits: `EnrolmentSource`, `CapabilityChecker`,
//!     `GroupIndex`, `ForumStore`
//!   - Error type: `StudentActivityError`
//!
//! ### Domain Layer (`student_activity::domain`)
//! - **Location:** `src/domain/`
//! - **Purpose:** Access policy, post counting, roster and report assembly
//! - **Dependencies:** SDK contract types only
//! - **Rule:** MUST NOT import `infra::*`
//!
//! ### Infrastructure Layer (`student_activity::infra`)
//! - **Location:** `src/infra/storage/`
//! - **Purpose:** Collaborator backends
//! - **Contains:** `InMemoryDirectory`, a JSON-loadable snapshot implementing
//!   all four collaborator traits
//!
//! ## Public API
//!
//! Consumers build a [`StudentActivity`] and call through
//! `StudentActivity::client()`, which returns `Arc<dyn StudentActivityClientV1>`.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

// === PUBLIC API (from SDK) ===
pub use student_activity_sdk::{
    PostCountRequest, ReportRequest, StudentActivityClientV1, StudentActivityError,
    StudentActivityReport, ViewerContext,
};

// === MODULE DEFINITION ===
pub mod module;
pub use module::StudentActivity;

// === INTERNAL MODULES ===
// WARNING: These modules are internal implementation details!
// They are exposed only for comprehensive testing and should NOT be used by external consumers.
// Only use the SDK types for stable public APIs.
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
