//! `.md`/`.txt` parsing: optional YAML frontmatter delimited by `---` lines.

use std::collections::HashMap;

use lorekeeper_core::error::Result;
use lorekeeper_core::traits::ParsedDocument;

pub(crate) fn parse(bytes: &[u8], fallback_title: String) -> Result<ParsedDocument> {
    let text = String::from_utf8_lossy(bytes).into_owned();

    if let Some((frontmatter, rest)) = split_frontmatter(&text) {
        let metadata = parse_frontmatter(frontmatter);
        let title = metadata
            .get("title")
            .cloned()
            .unwrap_or(fallback_title);
        return Ok(ParsedDocument {
            title,
            content: rest.trim().to_string(),
            metadata,
        });
    }

    Ok(ParsedDocument {
        title: fallback_title,
        content: text.trim().to_string(),
        metadata: HashMap::new(),
    })
}

/// Splits `---\n<frontmatter>\n---\n<rest>` when the document opens with a
/// frontmatter block; returns `None` otherwise.
fn split_frontmatter(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix("---")?;
    let rest = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n"))?;
    let end = rest.find("\n---")?;
    let frontmatter = &rest[..end];
    let after = &rest[end + 4..];
    let after = after
        .strip_prefix('\n')
        .or_else(|| after.strip_prefix("\r\n"))
        .unwrap_or(after);
    Some((frontmatter, after))
}

fn parse_frontmatter(raw: &str) -> HashMap<String, String> {
    match serde_yml::from_str::<serde_yml::Value>(raw) {
        Ok(serde_yml::Value::Mapping(map)) => map
            .into_iter()
            .filter_map(|(k, v)| {
                let key = k.as_str()?.to_string();
                let value = match v {
                    serde_yml::Value::String(s) => s,
                    other => serde_yml::to_string(&other).ok()?.trim().to_string(),
                };
                Some((key, value))
            })
            .collect(),
        _ => HashMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_has_no_frontmatter() {
        let doc = parse(b"just some content", "fallback".into()).unwrap();
        assert_eq!(doc.title, "fallback");
        assert_eq!(doc.content, "just some content");
        assert!(doc.metadata.is_empty());
    }

    #[test]
    fn frontmatter_title_overrides_fallback() {
        let input = b"---\ntitle: Hello World\nauthor: Ada\n---\nBody text here.\n";
        let doc = parse(input, "fallback".into()).unwrap();
        assert_eq!(doc.title, "Hello World");
        assert_eq!(doc.content, "Body text here.");
        assert_eq!(doc.metadata.get("author").map(String::as_str), Some("Ada"));
    }

    #[test]
    fn frontmatter_without_title_uses_fallback() {
        let input = b"---\nauthor: Ada\n---\nBody text here.\n";
        let doc = parse(input, "fallback".into()).unwrap();
        assert_eq!(doc.title, "fallback");
    }
}
