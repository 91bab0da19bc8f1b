// All LLM prompt constants for the tailoring pipeline.
// Reuses cross-cutting fragments from llm_client::prompts.
//
// Every system prompt opens with a distinct sentence; tests route scripted
// replies by that prefix.

/// System prompt for Stage 1 (keyword extraction).
pub const KEYWORD_SYSTEM: &str = "You are an expert technical recruiter who extracts \
    the vocabulary an applicant tracking system will look for in a job description.";

/// Keyword extraction prompt. Replace `{job_description}` before sending.
pub const KEYWORD_PROMPT_TEMPLATE: &str = r#"Extract the keywords a resume should contain to match this job description.

Return a JSON object with this EXACT schema (all four keys are required, use [] when empty):
{
  "technical_skills": ["Rust", "Kubernetes"],
  "soft_skills": ["cross-team communication"],
  "domain_terms": ["payment processing"],
  "action_verbs": ["architected", "migrated"]
}

Rules:
- Use the wording of the job description; do not paraphrase technologies.
- technical_skills: languages, frameworks, tools, platforms, methodologies.
- soft_skills: interpersonal and leadership qualities.
- domain_terms: industry and business vocabulary.
- action_verbs: verbs the description uses for the work itself.

JOB DESCRIPTION:
{job_description}"#;

/// System prompt for Stage 2 (relevance scoring).
pub const SCORING_SYSTEM: &str = "You are an expert hiring manager who rates how relevant \
    each item of a resume is to a specific job description.";

/// Relevance scoring prompt. Replace `{job_description}` and `{resume_yaml}`.
pub const SCORING_PROMPT_TEMPLATE: &str = r#"Score every item of the resume below for relevance to the job description.

Return a JSON object with this EXACT schema:
{
  "work": [{"index": 0, "score": 85, "reasoning": "Led the same stack the role uses"}],
  "projects": [{"index": 0, "score": 60, "reasoning": "..."}],
  "education": [{"index": 0, "score": 70, "reasoning": "..."}],
  "certificates": [{"index": 0, "score": 40, "reasoning": "..."}],
  "skills": [{"index": 0, "score": 90, "name": "Rust"}]
}

Rules:
- `index` is the 0-based position of the item in its resume section.
- `score` is an integer from 0 (irrelevant) to 100 (essential for this role).
- Score EVERY item of work, projects, education and certificates exactly once.
- For skills, number the keywords of every skill group in document order as one
  flat list, SKIPPING the group named "Languages"; `name` is the keyword text.
- Keep `reasoning` to one short sentence.

JOB DESCRIPTION:
{job_description}

RESUME (YAML):
{resume_yaml}"#;

/// System prompt for Stage 4 (wording optimization).
pub const OPTIMIZE_SYSTEM: &str = "You are an expert resume editor who aligns the wording \
    of an already-curated resume with the terminology of a job description.";

/// Wording optimization prompt. Replace `{job_description}`, `{keywords}`, `{resume_yaml}`.
pub const OPTIMIZE_PROMPT_TEMPLATE: &str = r#"{fidelity_instruction}

Rephrase summaries, highlights and descriptions so they use the job description's
terminology where the underlying facts support it. Do not add or remove items.

TARGET KEYWORDS:
{keywords}

JOB DESCRIPTION:
{job_description}

RESUME (YAML):
{resume_yaml}"#;

/// System prompt for the single-prompt fallback rewrite.
pub const SINGLE_PROMPT_SYSTEM: &str = "You are an expert resume writer who tailors a \
    complete resume to one job description in a single pass.";

/// Single-prompt rewrite. Replace `{job_description}` and `{resume_yaml}`.
pub const SINGLE_PROMPT_TEMPLATE: &str = r#"{fidelity_instruction}

Tailor the resume below to the job description: reorder highlights so the most
relevant come first, drop highlights that are irrelevant to the role, and align
wording with the job description's terminology.

JOB DESCRIPTION:
{job_description}

RESUME (YAML):
{resume_yaml}"#;
