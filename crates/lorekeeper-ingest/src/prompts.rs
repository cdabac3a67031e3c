//! Prompt construction and response parsing for the summarize/tag stages.

/// Maximum characters kept in `summary` after the generator call.
pub const MAX_SUMMARY_LEN: usize = 500;
/// Maximum number of tags kept after dedup.
pub const MAX_TAGS: usize = 10;

#[must_use]
pub fn summarize_prompt(content: &str, lang: &str) -> String {
    format!(
        "Summarize the following document in {lang} in at most 3 sentences. \
         Write only the summary text, no heading.\n\n{content}"
    )
}

#[must_use]
pub fn tag_prompt(content: &str, lang: &str) -> String {
    format!(
        "Read the following document written in {lang} and produce at most {MAX_TAGS} \
         short topical tags. Respond with a single comma-separated line, nothing else.\n\n{content}"
    )
}

/// Clamp a generated summary to [`MAX_SUMMARY_LEN`] characters, respecting
/// UTF-8 boundaries.
#[must_use]
pub fn clamp_summary(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_SUMMARY_LEN {
        return trimmed.to_string();
    }
    trimmed.chars().take(MAX_SUMMARY_LEN).collect()
}

/// Split a comma-separated tag line, trim, drop empties, dedupe
/// case-insensitively, and cap at [`MAX_TAGS`].
#[must_use]
pub fn parse_tags(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut tags = Vec::new();
    for raw in text.split(',') {
        let tag = raw.trim();
        if tag.is_empty() {
            continue;
        }
        let key = tag.to_lowercase();
        if seen.insert(key) {
            tags.push(tag.to_string());
        }
        if tags.len() == MAX_TAGS {
            break;
        }
    }
    tags
}
