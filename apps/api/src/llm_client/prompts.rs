// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_INSTRUCTION: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// System prompt fragment that enforces YAML-only output.
pub const YAML_ONLY_INSTRUCTION: &str = "You MUST respond with the complete resume \
    as valid YAML only. \
    Do NOT include any text before or after the YAML document. \
    Do NOT include explanations or apologies.";

/// Instruction shared by every prompt that rewrites resume wording.
pub const FIDELITY_INSTRUCTION: &str = "\
    CRITICAL: Never invent experience, employers, degrees, certificates, or skills. \
    Keep every company name, job title, institution, date, and URL exactly as given. \
    Keep the YAML structure and every key exactly as given; rephrase text values only.";
