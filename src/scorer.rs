//! Deterministic grading of free-text exercise answers.
//!
//! One engine, many rule sets: every lesson is graded by the same algorithm
//! parameterized by its `LessonRubric`. Checks are case-insensitive keyword
//! (or length) detectors over the learner's raw text: deliberately simple
//! heuristics. False positives and negatives are an accepted limitation of
//! keyword matching, not something to patch with cleverer text analysis.

use tracing::{debug, instrument, warn};

use crate::config::load_lesson_bank_from_env;
use crate::domain::{LessonId, LessonRubric, ScoreVerdict};
use crate::lessons::builtin_lessons;
use crate::util::clamp_score;

const TOO_SHORT_TITLE: &str = "⚠️ Too Short!";
const UNKNOWN_TITLE: &str = "⚠️ Unknown Lesson";

/// Grade one submission against one lesson's rule set.
///
/// Pure and synchronous; always returns a verdict:
/// - trimmed input shorter than the gate scores 0 with a single feedback line;
/// - otherwise every check is evaluated independently (checks may overlap),
///   matched weights are summed and clamped to 0..=100, and feedback is
///   emitted in authored order (pass note on match, fail note on miss for
///   checks that have one);
/// - the pass mark is inclusive, and the example answer is only attached to
///   passing verdicts.
pub fn evaluate(rubric: &LessonRubric, raw: &str) -> ScoreVerdict {
  let trimmed = raw.trim();
  if trimmed.chars().count() < rubric.min_len {
    return ScoreVerdict {
      passed: false,
      score: 0,
      title: TOO_SHORT_TITLE.into(),
      feedback: vec![rubric.too_short_note.clone()],
      example_answer: None,
    };
  }

  let lowered = trimmed.to_lowercase();
  let mut score: u32 = 0;
  let mut feedback = Vec::with_capacity(rubric.checks.len());

  for check in &rubric.checks {
    if check.detector.matches(trimmed, &lowered) {
      score += check.weight;
      feedback.push(check.pass_note.clone());
    } else if let Some(note) = &check.fail_note {
      feedback.push(note.clone());
    }
  }
  // Rule sets are authored to sum to <= 100; clamp anyway.
  score = clamp_score(score);

  let passed = score >= rubric.pass_mark;
  ScoreVerdict {
    passed,
    score,
    title: if passed {
      rubric.pass_title.clone()
    } else {
      rubric.fail_title.clone()
    },
    feedback,
    example_answer: if passed {
      rubric.example_answer.clone()
    } else {
      None
    },
  }
}

/// Lesson registry: the built-in rule sets, optionally overridden by a TOML
/// bank. Rubrics are resolved by lesson id; grading through the bank never
/// fails (an unknown id degrades to a failed verdict).
#[derive(Clone, Debug)]
pub struct LessonBank {
  lessons: Vec<LessonRubric>,
}

impl LessonBank {
  /// The built-in four-lesson course, untouched by configuration.
  pub fn builtin() -> Self {
    Self {
      lessons: builtin_lessons(),
    }
  }

  /// Built-ins with any configured overrides applied (ACADEMY_CONFIG_PATH).
  /// Configured lessons replace built-ins with the same id; new ids extend
  /// the course.
  pub fn from_env() -> Self {
    let mut lessons = builtin_lessons();
    if let Some(overrides) = load_lesson_bank_from_env() {
      for rubric in overrides {
        match lessons.iter_mut().find(|l| l.id == rubric.id) {
          Some(slot) => *slot = rubric,
          None => lessons.push(rubric),
        }
      }
      lessons.sort_by_key(|l| l.id);
    }
    Self { lessons }
  }

  /// Highest lesson id in the bank, i.e. the N that gates certification.
  pub fn total(&self) -> LessonId {
    self.lessons.last().map(|l| l.id).unwrap_or(0)
  }

  pub fn get(&self, lesson: LessonId) -> Option<&LessonRubric> {
    self.lessons.iter().find(|l| l.id == lesson)
  }

  pub fn rubrics(&self) -> &[LessonRubric] {
    &self.lessons
  }

  /// Grade a submission for a lesson by id.
  #[instrument(level = "debug", skip(self, raw), fields(%lesson, raw_len = raw.len()))]
  pub fn evaluate(&self, lesson: LessonId, raw: &str) -> ScoreVerdict {
    match self.get(lesson) {
      Some(rubric) => {
        let verdict = evaluate(rubric, raw);
        debug!(target: "lesson", %lesson, score = verdict.score, passed = verdict.passed, "Graded submission");
        verdict
      }
      None => {
        warn!(target: "lesson", %lesson, "Grading request for unknown lesson");
        ScoreVerdict {
          passed: false,
          score: 0,
          title: UNKNOWN_TITLE.into(),
          feedback: vec![format!("Unknown lessonId: {lesson}")],
          example_answer: None,
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Check, DEFAULT_PASS_MARK};

  /// Three keyword checks whose weights make the pass boundary reachable
  /// exactly: alpha+beta = 70, alpha+gamma = 69.
  fn boundary_rubric() -> LessonRubric {
    LessonRubric {
      id: 9,
      title: "boundary".into(),
      min_len: 5,
      too_short_note: "too short".into(),
      pass_mark: DEFAULT_PASS_MARK,
      pass_title: "pass".into(),
      fail_title: "fail".into(),
      example_answer: Some("model answer".into()),
      checks: vec![
        Check::any(40, &["alpha"], "got alpha").with_fail("no alpha"),
        Check::any(30, &["beta"], "got beta").with_fail("no beta"),
        Check::any(29, &["gamma"], "got gamma").with_fail("no gamma"),
      ],
    }
  }

  #[test]
  fn under_length_input_is_gated_with_a_single_item() {
    let lessons = builtin_lessons();
    let verdict = evaluate(&lessons[0], "too short"); // 9 chars < 20
    assert!(!verdict.passed);
    assert_eq!(verdict.score, 0);
    assert_eq!(verdict.feedback.len(), 1);
    assert_eq!(verdict.feedback[0], lessons[0].too_short_note);
    assert!(verdict.example_answer.is_none());
  }

  #[test]
  fn length_gate_counts_trimmed_characters() {
    let rubric = boundary_rubric();
    // 4 chars + lots of whitespace: still under the gate of 5.
    let verdict = evaluate(&rubric, "   abcd   ");
    assert_eq!(verdict.score, 0);
    assert_eq!(verdict.feedback, vec!["too short".to_string()]);
  }

  #[test]
  fn pass_mark_is_inclusive_at_seventy() {
    let rubric = boundary_rubric();
    let verdict = evaluate(&rubric, "alpha beta");
    assert_eq!(verdict.score, 70);
    assert!(verdict.passed);
    assert_eq!(verdict.title, "pass");
    assert_eq!(verdict.example_answer.as_deref(), Some("model answer"));
  }

  #[test]
  fn sixty_nine_fails_and_hides_the_example() {
    let rubric = boundary_rubric();
    let verdict = evaluate(&rubric, "alpha gamma");
    assert_eq!(verdict.score, 69);
    assert!(!verdict.passed);
    assert_eq!(verdict.title, "fail");
    assert!(verdict.example_answer.is_none());
  }

  #[test]
  fn full_marks_on_a_submission_hitting_every_check() {
    let bank = LessonBank::builtin();
    let text = "You are an expert writing coach. Help me write my college application essay, \
                format it with bullet points and keep it concise.";
    let verdict = bank.evaluate(1, text);
    assert_eq!(verdict.score, 100);
    assert!(verdict.passed);
    assert!(verdict.example_answer.is_some());
    assert_eq!(verdict.feedback.len(), 5, "all five checks matched");
  }

  #[test]
  fn feedback_preserves_authored_order_and_skips_silent_bonuses() {
    let lessons = builtin_lessons();
    // Long enough to clear the gate, matches nothing.
    let verdict = evaluate(&lessons[0], "qqqq qqqq qqqq qqqq qqqq");
    assert_eq!(verdict.score, 0);
    // Checks 4 and 5 carry no fail note, so only three items appear.
    assert_eq!(verdict.feedback.len(), 3);
    assert!(verdict.feedback[0].starts_with("❌ Add a role"));
    assert!(verdict.feedback[1].starts_with("❌ Specify what you need"));
    assert!(verdict.feedback[2].starts_with("💡 Bonus"));
  }

  #[test]
  fn disjunction_check_matches_on_length_alone() {
    let lessons = builtin_lessons();
    // Lesson 3's last check: keywords OR longer than 120 chars.
    let filler = "z".repeat(130);
    let verdict = evaluate(&lessons[2], &filler);
    assert!(verdict
      .feedback
      .iter()
      .any(|f| f.contains("strong critical thinking")));
  }

  #[test]
  fn checks_are_evaluated_independently() {
    let lessons = builtin_lessons();
    // Four distinct concerns named in one sentence: each check scores on its
    // own, so 25 + 25 + 20 + 15 = 85 without the length bonus.
    let text = "We must respect privacy and cite every source, verify outputs, and get consent first.";
    let verdict = evaluate(&lessons[3], text);
    assert_eq!(verdict.score, 85);
    assert!(verdict.passed);
  }

  #[test]
  fn defensive_clamp_bounds_overweighted_rule_sets() {
    let mut rubric = boundary_rubric();
    rubric.checks.push(Check::any(80, &["alpha"], "alpha again"));
    let verdict = evaluate(&rubric, "alpha beta gamma");
    assert_eq!(verdict.score, 100);
  }

  #[test]
  fn unknown_lesson_degrades_to_a_failed_verdict() {
    let bank = LessonBank::builtin();
    let verdict = bank.evaluate(42, "whatever text, long enough to pass any gate");
    assert!(!verdict.passed);
    assert_eq!(verdict.score, 0);
    assert_eq!(verdict.feedback, vec!["Unknown lessonId: 42".to_string()]);
  }

  #[test]
  fn bank_total_tracks_highest_lesson_id() {
    assert_eq!(LessonBank::builtin().total(), 4);
  }
}
