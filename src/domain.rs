//! Domain models: lesson identity, progress records and snapshot, rule sets, verdicts.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lessons are numbered 1..=N. Lesson 1 has no prerequisite.
pub type LessonId = u8;

/// Pass mark shared by all built-in lessons (inclusive).
pub const DEFAULT_PASS_MARK: u32 = 70;

/// Per-lesson access state, always derived from the snapshot, never stored.
/// Transitions are monotonic: Locked -> Unlocked -> Completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonState {
  Locked,
  Unlocked,
  Completed,
}

/// What we remember about one completed (or attempted) lesson.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProgressRecord {
  pub score: u32,
  pub completed: bool,
  #[serde(default)]
  pub completed_at: Option<DateTime<Utc>>,
}

/// The full in-memory picture of a learner's progress.
///
/// Created empty at session start, populated from a remote fetch or the
/// session cache, mutated only through the store's completion path, and
/// discarded at session end. Durable storage belongs to the remote service.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProgressSnapshot {
  /// Completed lesson ids. A BTreeSet keeps membership unique and iteration
  /// strictly ascending, which is also the rendering order.
  pub completed: BTreeSet<LessonId>,
  pub records: BTreeMap<LessonId, ProgressRecord>,
  #[serde(default)]
  pub certification_earned: bool,
  #[serde(default)]
  pub certification_date: Option<DateTime<Utc>>,
}

impl ProgressSnapshot {
  pub fn empty() -> Self {
    Self::default()
  }

  /// Lesson 1 is always open; lesson n opens once lesson n-1 is completed.
  pub fn is_unlocked(&self, lesson: LessonId) -> bool {
    match lesson {
      0 => false,
      1 => true,
      n => self.completed.contains(&(n - 1)),
    }
  }

  pub fn is_completed(&self, lesson: LessonId) -> bool {
    self.completed.contains(&lesson)
  }

  pub fn state_of(&self, lesson: LessonId) -> LessonState {
    if self.is_completed(lesson) {
      LessonState::Completed
    } else if self.is_unlocked(lesson) {
      LessonState::Unlocked
    } else {
      LessonState::Locked
    }
  }

  /// Completion ratio rounded to a whole percentage.
  pub fn percentage(&self, total: LessonId) -> u32 {
    if total == 0 {
      return 0;
    }
    ((self.completed.len() as f64 / total as f64) * 100.0).round() as u32
  }

  /// Smallest lesson not yet completed; None once the course is done.
  pub fn next_lesson(&self, total: LessonId) -> Option<LessonId> {
    (1..=total).find(|l| !self.completed.contains(l))
  }

  /// Certification is earned exactly when every lesson 1..=total is completed.
  /// The date is written once, the first time the condition holds, and is
  /// never overwritten afterwards.
  pub fn recompute_certification(&mut self, total: LessonId, now: DateTime<Utc>) {
    let all_done = total > 0 && (1..=total).all(|l| self.completed.contains(&l));
    if all_done {
      self.certification_earned = true;
      self.certification_date.get_or_insert(now);
    } else {
      self.certification_earned = false;
    }
  }
}

/// A feature detector over the learner's trimmed text.
///
/// Matches when any lowercase keyword is contained in the text, or when the
/// text is longer than the optional character floor. A rule carrying both is
/// a disjunction (keywords OR length), which some lessons use for their
/// "shows depth" bonus checks.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Detector {
  #[serde(default)]
  pub keywords: Vec<String>,
  #[serde(default)]
  pub longer_than: Option<usize>,
}

impl Detector {
  /// `trimmed` is the learner text after whitespace trimming; `lowered` is
  /// its lowercase form, computed once per evaluation.
  pub fn matches(&self, trimmed: &str, lowered: &str) -> bool {
    if self
      .keywords
      .iter()
      .any(|k| !k.is_empty() && lowered.contains(k.as_str()))
    {
      return true;
    }
    match self.longer_than {
      Some(floor) => trimmed.chars().count() > floor,
      None => false,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.keywords.is_empty() && self.longer_than.is_none()
  }
}

/// One scored criterion in a lesson's rule set.
///
/// `fail_note` is optional: bonus checks stay silent when they miss, exactly
/// like the course content they were authored from.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Check {
  pub detector: Detector,
  pub weight: u32,
  pub pass_note: String,
  #[serde(default)]
  pub fail_note: Option<String>,
}

impl Check {
  /// Keyword check: matches when any of `keywords` appears (case-insensitive).
  pub fn any(weight: u32, keywords: &[&str], pass_note: &str) -> Self {
    Self {
      detector: Detector {
        keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        longer_than: None,
      },
      weight,
      pass_note: pass_note.into(),
      fail_note: None,
    }
  }

  /// Length check: matches when the trimmed text exceeds `floor` characters.
  pub fn longer_than(weight: u32, floor: usize, pass_note: &str) -> Self {
    Self {
      detector: Detector {
        keywords: Vec::new(),
        longer_than: Some(floor),
      },
      weight,
      pass_note: pass_note.into(),
      fail_note: None,
    }
  }

  /// Widen a keyword check into keywords-OR-length.
  pub fn or_longer_than(mut self, floor: usize) -> Self {
    self.detector.longer_than = Some(floor);
    self
  }

  pub fn with_fail(mut self, note: &str) -> Self {
    self.fail_note = Some(note.into());
    self
  }
}

/// One lesson's grading configuration. Pure data; the engine in `scorer`
/// is the only copy of the evaluation algorithm.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LessonRubric {
  pub id: LessonId,
  pub title: String,
  /// Hard gate: trimmed submissions shorter than this score 0 outright.
  pub min_len: usize,
  pub too_short_note: String,
  pub pass_mark: u32,
  pub pass_title: String,
  pub fail_title: String,
  /// Canonical strong answer, shown only after a pass. Not every lesson has one.
  #[serde(default)]
  pub example_answer: Option<String>,
  /// Authored order is the feedback order. Checks may overlap.
  pub checks: Vec<Check>,
}

/// The outcome of grading one submission. Grading never fails; bad input
/// degrades to a failed verdict with a single feedback line.
#[derive(Clone, Debug, Serialize)]
pub struct ScoreVerdict {
  pub passed: bool,
  pub score: u32,
  pub title: String,
  pub feedback: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub example_answer: Option<String>,
}
