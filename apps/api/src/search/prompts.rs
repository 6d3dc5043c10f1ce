// Salary estimation prompt templates.

use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, UNCERTAINTY_INSTRUCTION};

pub fn salary_estimate_system() -> String {
    format!(
        "{JSON_ONLY_SYSTEM} You estimate typical annual pay for job postings. {UNCERTAINTY_INSTRUCTION}"
    )
}

pub const SALARY_ESTIMATE_PROMPT: &str = r#"Estimate the typical annual salary range for this job posting.

JOB TITLE: {title}
LOCATION: {location}

Use the local currency of the location. If the location is empty, assume the United States.

OUTPUT SCHEMA (return exactly this structure):
{
  "range": "string, e.g. \"$85,000 - $110,000\""
}"#;

pub fn render_salary_prompt(title: &str, location: &str) -> String {
    SALARY_ESTIMATE_PROMPT
        .replace("{title}", title.trim())
        .replace("{location}", location.trim())
}
