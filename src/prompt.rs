/// Maximum number of complaint characters forwarded to the model
pub const MAX_PROMPT_COMPLAINT_CHARS: usize = 8000;

/// Instruction template; `{complaint}` is replaced with the sanitized complaint.
pub const PROMPT_TEMPLATE: &str = "
You classify renter complaints and draft a neutral, factual summary.

Complaint:
{complaint}

Return strict JSON with keys:
- category: one of [harassment, discrimination, access, noise, property_damage, other]
- severity: integer 1-5 (5 = most severe)
- summary: <= 60 words, neutral tone

JSON:
";

/// Remove control characters (newlines and tabs are kept) and hard-truncate.
/// Only the prompt copy is sanitized; the fallback works on the original text.
pub fn sanitize_complaint(raw: &str) -> String {
    raw.chars()
        .filter(|&c| c == '\n' || c == '\t' || !c.is_control())
        .take(MAX_PROMPT_COMPLAINT_CHARS)
        .collect()
}

/// Render the full prompt sent to the model for one complaint.
pub fn render_prompt(complaint: &str) -> String {
    PROMPT_TEMPLATE.replacen("{complaint}", &sanitize_complaint(complaint), 1)
}
