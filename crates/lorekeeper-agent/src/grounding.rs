//! Builds the grounded prompt for the GENERATING stage (§4.10): the
//! original query, a numbered list of reference excerpts, and an
//! instruction to cite by number and refuse when unsupported.

use lorekeeper_core::model::Reference;

/// Characters of `summary`/`content` kept per excerpt.
const EXCERPT_LEN: usize = 400;

#[must_use]
pub fn build_prompt(query: &str, references: &[Reference]) -> String {
    let mut excerpts = String::new();
    for (i, reference) in references.iter().enumerate() {
        let body = if reference.article.summary.trim().is_empty() {
            &reference.article.content
        } else {
            &reference.article.summary
        };
        let truncated: String = body.chars().take(EXCERPT_LEN).collect();
        excerpts.push_str(&format!(
            "[{}] {}\n{}\n\n",
            i + 1,
            reference.article.title,
            truncated
        ));
    }

    format!(
        "Answer the question using only the numbered references below. \
         Cite sources inline using their bracketed number, e.g. [1]. \
         If the references do not support an answer, say so plainly instead of guessing.\n\n\
         Question: {query}\n\nReferences:\n{excerpts}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lorekeeper_core::model::Article;

    fn reference(id: &str, title: &str, summary: &str) -> Reference {
        Reference {
            article: Article {
                id: id.to_string(),
                title: title.to_string(),
                content: "full content".to_string(),
                summary: summary.to_string(),
                tags: vec![],
                lang: "en".to_string(),
                author: None,
                original_url: None,
                created_date: Utc::now(),
                registrar: "alice".to_string(),
                title_embedding: vec![],
                summary_embedding: vec![],
            },
            score: 1.0,
        }
    }

    #[test]
    fn prompt_numbers_references_in_order() {
        let refs = vec![reference("a", "First", "one"), reference("b", "Second", "two")];
        let prompt = build_prompt("what happened?", &refs);
        assert!(prompt.contains("[1] First"));
        assert!(prompt.contains("[2] Second"));
        assert!(prompt.contains("what happened?"));
    }

    #[test]
    fn falls_back_to_content_when_summary_is_empty() {
        let refs = vec![reference("a", "Only", "")];
        let prompt = build_prompt("q", &refs);
        assert!(prompt.contains("full content"));
    }

    #[test]
    fn no_references_still_produces_a_valid_prompt() {
        let prompt = build_prompt("q", &[]);
        assert!(prompt.contains("Question: q"));
    }
}
