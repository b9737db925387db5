//! Built-in lesson rule sets.
//!
//! These four tables are the course content: minimum lengths, weighted
//! feature checks, feedback lines, verdict titles, and the example answers
//! shown after a pass. They guarantee the crate is useful without any
//! external configuration; a TOML bank (see `config`) can override them.
//!
//! Weights in every rule set sum to 100 and the pass mark is 70 across the
//! course. The grading algorithm itself lives in `scorer` and is shared.

use crate::domain::{Check, LessonId, LessonRubric, DEFAULT_PASS_MARK};

/// Number of lessons in the built-in course.
pub const TOTAL_LESSONS: LessonId = 4;

const PASS_TITLE: &str = "🎉 Excellent!";
const FAIL_TITLE: &str = "💪 Getting There!";

/// Lesson 1: structuring a prompt with WHO, WHAT and HOW.
fn prompt_fundamentals() -> LessonRubric {
  LessonRubric {
    id: 1,
    title: "🎯 Prompt Fundamentals".into(),
    min_len: 20,
    too_short_note:
      "Your prompt needs more detail. Aim for at least 50 characters with WHO, WHAT, and HOW elements."
        .into(),
    pass_mark: DEFAULT_PASS_MARK,
    pass_title: PASS_TITLE.into(),
    fail_title: FAIL_TITLE.into(),
    example_answer: Some(
      "Perfect example: \"You are an experienced English teacher. Help me write a 5-paragraph essay on climate change for my college application. Format it with an introduction, three body paragraphs, and a conclusion.\""
        .into(),
    ),
    checks: vec![
      Check::any(
        30,
        &[
          "you are", "act as", "as a", "like a", "pretend", "role", "expert", "professional",
          "advisor", "coach",
        ],
        "✅ Great! You defined the role (WHO)",
      )
      .with_fail("❌ Add a role like \"You are an expert writing coach...\""),
      Check::any(
        30,
        &[
          "help", "write", "create", "make", "explain", "tell", "describe", "list", "provide",
          "give", "show", "teach",
        ],
        "✅ Excellent! You stated your goal clearly (WHAT)",
      )
      .with_fail("❌ Specify what you need: \"help me write...\", \"explain...\", etc."),
      Check::any(
        25,
        &[
          "format", "bullet", "paragraph", "step", "list", "example", "specific", "detail",
          "concise", "brief", "structured",
        ],
        "✅ Perfect! You specified the format (HOW)",
      )
      .with_fail("💡 Bonus: Add format details like \"use bullet points\" or \"keep it concise\""),
      // Relevance and length are bonus checks: silent when they miss.
      Check::any(
        10,
        &["essay", "paper", "writing", "college", "school", "assignment"],
        "✅ Good! Your prompt is relevant to the exercise",
      ),
      Check::longer_than(5, 50, "✅ Your prompt is nice and detailed!"),
    ],
  }
}

/// Lesson 2: giving the assistant enough background to tailor its answer.
fn context_is_key() -> LessonRubric {
  LessonRubric {
    id: 2,
    title: "📝 Context is Key".into(),
    min_len: 30,
    too_short_note:
      "Your prompt needs much more context. Aim for at least 100 characters with specific details."
        .into(),
    pass_mark: DEFAULT_PASS_MARK,
    pass_title: PASS_TITLE.into(),
    fail_title: FAIL_TITLE.into(),
    example_answer: Some(
      "\"I'm interviewing for a software engineering internship at a fintech startup next Tuesday. I'm a sophomore CS major with one Python project on GitHub but no professional experience. I'm nervous about technical questions on data structures and explaining my project clearly. Help me prepare a 2-minute introduction and practice answers for common technical questions.\""
        .into(),
    ),
    checks: vec![
      Check::any(
        25,
        &[
          "interview", "internship", "position", "role", "job", "software", "engineer",
          "marketing", "design", "analyst",
        ],
        "✅ Great! You specified the job/role",
      )
      .with_fail("❌ Add details about what job or position you're interviewing for"),
      Check::any(
        25,
        &[
          "student", "major", "experience", "project", "year", "sophomore", "junior", "senior",
          "graduated", "degree",
        ],
        "✅ Excellent! You included your background",
      )
      .with_fail("❌ Mention your education, experience, or relevant skills"),
      Check::any(
        20,
        &[
          "nervous", "worried", "concern", "help", "prepare", "practice", "struggle",
          "difficulty", "weak", "improve",
        ],
        "✅ Good! You identified what concerns you",
      )
      .with_fail("❌ Share what specifically worries you or what you need help with"),
      Check::any(
        15,
        &[
          "tomorrow", "next week", "monday", "days", "weeks", "soon", "upcoming", "scheduled",
        ],
        "✅ Nice! You mentioned when the interview is",
      )
      .with_fail("💡 Bonus tip: Adding a timeline helps AI prioritize your preparation"),
      Check::longer_than(15, 100, "✅ Your prompt is detailed and thorough!")
        .with_fail("💡 Try adding more specific details to get even better advice"),
    ],
  }
}

/// Lesson 3: spotting hallucinations and overclaims in a model answer.
/// The exercise shows a fabricated health claim citing a fake Harvard study.
fn think_critically() -> LessonRubric {
  LessonRubric {
    id: 3,
    title: "🔍 Think Critically".into(),
    min_len: 50,
    too_short_note:
      "Try to identify at least 3 specific problems with the AI response and explain how you'd verify them."
        .into(),
    pass_mark: DEFAULT_PASS_MARK,
    pass_title: "🎉 Excellent Critical Thinking!".into(),
    fail_title: "💪 Keep Analyzing!".into(),
    example_answer: None,
    checks: vec![
      Check::any(
        25,
        &[
          "unverifiable", "can't verify", "no source", "citation", "harvard", "dr. johnson",
          "dr johnson", "dr.johnson", "drjohnson", "2023 study", "fake", "made up",
        ],
        "✅ Great! You identified the unverifiable citation (the fake Harvard study)",
      )
      .with_fail("❌ Look for citations or sources that sound real but may be made up"),
      Check::any(
        25,
        &[
          "absolute", "cure", "completely", "all types", "prevents all", "no side effects",
          "too strong", "overstated", "exaggerat", "guarantee",
        ],
        "✅ Excellent! You caught the absolute claims like \"cure completely\" or \"prevents all cancer\"",
      )
      .with_fail("❌ Watch for absolute statements - they're rarely accurate in health/science"),
      Check::any(
        20,
        &[
          "5000", "dosage", "too much", "too high", "safe", "toxic", "maximum", "excess",
          "side effect",
        ],
        "✅ Good! You noticed the concerning dosage claim (5000mg is very high)",
      )
      .with_fail("💡 The extremely high dosage and claim of \"no side effects\" are major red flags"),
      Check::any(
        20,
        &[
          "verify", "check", "search", "look up", "consult", "doctor", "expert", "medical",
          "reliable source", "official", "research", "pubmed", "journal",
        ],
        "✅ Perfect! You explained how to verify the information with reliable sources",
      )
      .with_fail("❌ Always explain HOW you would verify suspicious claims"),
      // Bonus: naming the harm, or an unusually thorough write-up.
      Check::any(
        10,
        &[
          "medical", "health", "dangerous", "misinformation", "misleading", "harmful", "risky",
        ],
        "✅ You showed strong critical thinking about medical misinformation",
      )
      .or_longer_than(120),
    ],
  }
}

/// Lesson 4: ethical use (privacy, attribution, bias, consent).
fn use_ai_ethically() -> LessonRubric {
  LessonRubric {
    id: 4,
    title: "⚖️ Use AI Ethically".into(),
    min_len: 40,
    too_short_note: "Try to identify at least 2-3 ethical concerns for each scenario.".into(),
    pass_mark: DEFAULT_PASS_MARK,
    pass_title: "🎉 Strong Ethical Awareness!".into(),
    fail_title: "💪 Keep Thinking Ethically!".into(),
    example_answer: None,
    checks: vec![
      Check::any(
        25,
        &[
          "privacy", "personal", "sensitive", "data", "private", "confidential", "ssn",
          "medical", "health", "password",
        ],
        "✅ Great! You identified privacy concerns",
      )
      .with_fail("❌ Consider privacy risks - sharing sensitive personal data with AI"),
      Check::any(
        25,
        &[
          "plagiarism", "cite", "source", "credit", "attribution", "copy", "original",
          "academic", "integrity", "cheating",
        ],
        "✅ Excellent! You recognized plagiarism and attribution issues",
      )
      .with_fail("❌ Think about academic integrity and giving proper credit"),
      // Bias and verification count as one concern; either keyword family scores it.
      Check::any(
        20,
        &[
          "bias", "fair", "diverse", "perspective", "stereotype", "discriminat", "represent",
          "verify", "check", "fact", "accuracy", "responsibility", "review", "confirm",
        ],
        "✅ Good! You considered bias or verification responsibility",
      )
      .with_fail("💡 Remember to verify AI outputs and watch for bias"),
      Check::any(
        15,
        &["consent", "permission", "allow", "authorized", "appropriate"],
        "✅ Perfect! You thought about consent and appropriate use",
      )
      .with_fail("💡 Always consider if you have permission to share information"),
      Check::longer_than(15, 100, "✅ Your response shows thorough ethical thinking!"),
    ],
  }
}

/// The full built-in course, in lesson order.
pub fn builtin_lessons() -> Vec<LessonRubric> {
  vec![
    prompt_fundamentals(),
    context_is_key(),
    think_critically(),
    use_ai_ethically(),
  ]
}
