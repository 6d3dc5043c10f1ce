// Shared prompt fragments. Each service that calls the model keeps its own
// prompts.rs next to it and composes these in.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps estimates honest when the input is thin.
pub const UNCERTAINTY_INSTRUCTION: &str = "\
    If the input is too vague to estimate, answer with a wide range for the \
    role's typical market rather than refusing. Never return an empty value.";
