//! Loading an optional lesson rule-set bank from TOML.
//!
//! The built-in course (`lessons`) always works on its own; a bank lets
//! content authors retune gates, weights, keywords and feedback without a
//! rebuild. Any IO or parse failure is logged and the built-ins stand.

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::{Check, Detector, LessonId, LessonRubric, DEFAULT_PASS_MARK};
use crate::util::clamp_score;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AcademyConfig {
  #[serde(default)]
  pub lessons: Vec<LessonCfg>,
}

/// Lesson entry accepted in TOML configuration. Title, pass mark and verdict
/// titles are optional and default to the course conventions.
#[derive(Clone, Debug, Deserialize)]
pub struct LessonCfg {
  pub id: LessonId,
  #[serde(default)]
  pub title: Option<String>,
  pub min_len: usize,
  pub too_short_note: String,
  #[serde(default)]
  pub pass_mark: Option<u32>,
  #[serde(default)]
  pub pass_title: Option<String>,
  #[serde(default)]
  pub fail_title: Option<String>,
  #[serde(default)]
  pub example_answer: Option<String>,
  #[serde(default)]
  pub checks: Vec<CheckCfg>,
}

/// Check entry: at least one of `keywords` / `longer_than` must be present.
#[derive(Clone, Debug, Deserialize)]
pub struct CheckCfg {
  #[serde(default)]
  pub keywords: Vec<String>,
  #[serde(default)]
  pub longer_than: Option<usize>,
  pub weight: u32,
  pub pass_note: String,
  #[serde(default)]
  pub fail_note: Option<String>,
}

/// Attempt to load a lesson bank from ACADEMY_CONFIG_PATH.
/// On any parsing/IO error, returns None.
pub fn load_lesson_bank_from_env() -> Option<Vec<LessonRubric>> {
  let path = std::env::var("ACADEMY_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AcademyConfig>(&s) {
      Ok(cfg) => {
        info!(target: "academy_client", %path, lessons = cfg.lessons.len(), "Loaded lesson bank (TOML)");
        Some(rubrics_from(cfg))
      }
      Err(e) => {
        error!(target: "academy_client", %path, error = %e, "Failed to parse TOML lesson bank");
        None
      }
    },
    Err(e) => {
      error!(target: "academy_client", %path, error = %e, "Failed to read TOML lesson bank file");
      None
    }
  }
}

/// Convert validated bank entries into rubrics, skipping broken ones.
pub fn rubrics_from(cfg: AcademyConfig) -> Vec<LessonRubric> {
  let mut out = Vec::new();
  for lc in cfg.lessons {
    if lc.id == 0 {
      error!(target: "lesson", "Skipping bank lesson: id 0 is reserved");
      continue;
    }
    if lc.checks.is_empty() {
      error!(target: "lesson", id = lc.id, "Skipping bank lesson: no checks");
      continue;
    }

    let mut checks = Vec::with_capacity(lc.checks.len());
    let mut dropped = false;
    for cc in &lc.checks {
      let detector = Detector {
        // Lowercase on load so matching stays case-insensitive.
        keywords: cc.keywords.iter().map(|k| k.to_lowercase()).collect(),
        longer_than: cc.longer_than,
      };
      if detector.is_empty() {
        error!(target: "lesson", id = lc.id, "Skipping bank lesson: check without keywords or length floor");
        dropped = true;
        break;
      }
      checks.push(Check {
        detector,
        weight: clamp_score(cc.weight),
        pass_note: cc.pass_note.clone(),
        fail_note: cc.fail_note.clone(),
      });
    }
    if dropped {
      continue;
    }

    out.push(LessonRubric {
      id: lc.id,
      title: lc.title.unwrap_or_else(|| format!("Lesson {}", lc.id)),
      min_len: lc.min_len,
      too_short_note: lc.too_short_note,
      pass_mark: lc.pass_mark.map(clamp_score).unwrap_or(DEFAULT_PASS_MARK),
      pass_title: lc.pass_title.unwrap_or_else(|| "🎉 Excellent!".into()),
      fail_title: lc.fail_title.unwrap_or_else(|| "💪 Getting There!".into()),
      example_answer: lc.example_answer,
      checks,
    });
  }
  out
}
