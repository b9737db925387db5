//! Public result structs handed to rendering/UI callers (serde ready).
//! Keep this small and stable so the core and its consumers evolve
//! independently.

use serde::Serialize;

use crate::domain::{LessonId, ProgressSnapshot};

/// Where `initialize`/`refresh` found the snapshot.
pub const SOURCE_REMOTE: &str = "remote";
pub const SOURCE_CACHE: &str = "cache";
pub const SOURCE_EMPTY: &str = "empty";

/// Outcome of a snapshot load. `warning` is advisory: the operation itself
/// never fails, the learner just may be looking at stale data.
#[derive(Clone, Debug, Serialize)]
pub struct InitReport {
    pub source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Outcome of recording a lesson completion.
#[derive(Clone, Debug, Serialize)]
pub struct CompletionReport {
    /// false when the lesson was locked or unknown; the snapshot is untouched.
    pub accepted: bool,
    /// true when this call actually grew the completed set (idempotent repeats
    /// refresh the record but report false here).
    pub newly_completed: bool,
    pub certification_earned: bool,
    /// true only when the server confirmed the write.
    pub synced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// DTO for progress rendering (bar, lesson cards, celebration copy).
#[derive(Clone, Debug, Serialize)]
pub struct ProgressOut {
    pub completed_lessons: Vec<LessonId>,
    pub total_lessons: LessonId,
    pub percentage: u32,
    pub next_lesson: Option<LessonId>,
    pub certification_earned: bool,
    pub certification_date: Option<String>,
    pub message: String,
}

/// Convert the internal snapshot to the public DTO.
pub fn to_out(s: &ProgressSnapshot, total: LessonId) -> ProgressOut {
    let done = s.completed.len().min(total as usize) as LessonId;
    let remaining = total - done;
    let message = if total > 0 && remaining == 0 {
        format!("🎉 Congratulations! You've completed all {total} lessons! 🎉")
    } else if remaining == 1 {
        "Just 1 more lesson to go! 🚀".to_string()
    } else {
        format!("{remaining} more lessons to go! Keep it up! 💪")
    };

    ProgressOut {
        completed_lessons: s.completed.iter().copied().collect(),
        total_lessons: total,
        percentage: s.percentage(total),
        next_lesson: s.next_lesson(total),
        certification_earned: s.certification_earned,
        certification_date: s.certification_date.map(|d| d.to_rfc3339()),
        message,
    }
}
