//! AI Literacy Academy · client-side progress & scoring core.
//!
//! Two independently usable components:
//!   - [`ProgressStore`]: per-lesson completion state with a session cache
//!     and best-effort sync against the remote progress API. Lessons unlock
//!     sequentially; certification is earned when the whole course is done.
//!   - [`LessonBank`] / [`scorer::evaluate`]: deterministic grading of
//!     free-text exercise answers against per-lesson rule sets.
//!
//! The usual flow: grade a submission, and on a passing verdict record it.
//!
//! ```no_run
//! # async fn demo() {
//! use academy_client::{HttpProgressApi, LessonBank, ProgressStore, SessionCache};
//! use std::sync::Arc;
//!
//! let bank = LessonBank::from_env();
//! let backend = HttpProgressApi::from_env().map(|api| Arc::new(api) as _);
//! let store = ProgressStore::new(bank.total(), SessionCache::new(), backend);
//! store.initialize().await;
//!
//! let verdict = bank.evaluate(1, "You are an expert coach. Help me write my essay as a bullet list.");
//! if verdict.passed {
//!     store.mark_complete(1, verdict.score).await;
//! }
//! # }
//! ```
//!
//! Important env variables:
//!   ACADEMY_API_BASE_URL   : default "http://127.0.0.1:8000/api"
//!   ACADEMY_SESSION_COOKIE : opaque session credential; enables the remote backend
//!   ACADEMY_CONFIG_PATH    : path to a TOML lesson bank overriding the built-ins
//!   LOG_LEVEL              : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT             : "pretty" (default) or "json"

pub mod api;
pub mod cache;
pub mod config;
pub mod domain;
pub mod lessons;
pub mod protocol;
pub mod scorer;
pub mod store;
pub mod telemetry;
pub mod util;

pub use api::{HttpProgressApi, ProgressBackend};
pub use cache::SessionCache;
pub use domain::{
    LessonId, LessonRubric, LessonState, ProgressRecord, ProgressSnapshot, ScoreVerdict,
};
pub use lessons::TOTAL_LESSONS;
pub use protocol::{CompletionReport, InitReport, ProgressOut};
pub use scorer::LessonBank;
pub use store::ProgressStore;
