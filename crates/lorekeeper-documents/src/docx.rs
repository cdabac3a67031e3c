//! `.docx` parsing: unzip, parse `word/document.xml`, and render headings
//! as markdown `#` levels, paragraphs as blank-line-separated blocks, and
//! tables as GFM-style pipe tables.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use lorekeeper_core::error::{Error, Result};
use lorekeeper_core::traits::ParsedDocument;

use crate::escape_table_cell;

pub(crate) fn parse(bytes: &[u8], fallback_title: String) -> Result<ParsedDocument> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::validation(format!("not a valid docx (zip): {e}")))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| Error::validation(format!("docx missing word/document.xml: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| Error::validation(format!("docx document.xml is not valid UTF-8: {e}")))?;

    let content = render(&xml)?;

    Ok(ParsedDocument {
        title: fallback_title,
        content: content.trim().to_string(),
        metadata: Default::default(),
    })
}

#[derive(Default)]
struct Paragraph {
    style: Option<String>,
    text: String,
}

impl Paragraph {
    fn heading_level(&self) -> Option<usize> {
        let style = self.style.as_deref()?;
        let lower = style.to_ascii_lowercase();
        let digits: String = lower.chars().filter(char::is_ascii_digit).collect();
        if lower.starts_with("heading") && !digits.is_empty() {
            digits.parse::<usize>().ok().map(|n| n.clamp(1, 6))
        } else {
            None
        }
    }
}

fn render(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut out = String::new();
    let mut buf = Vec::new();

    let mut para: Option<Paragraph> = None;
    let mut in_pstyle = false;

    let mut in_table = false;
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut in_cell = false;
    let mut cell_text = String::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| Error::validation(format!("malformed docx xml: {e}")))?
        {
            Event::Eof => break,
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => para = Some(Paragraph::default()),
                b"w:pStyle" => {
                    in_pstyle = true;
                    if let Some(p) = para.as_mut() {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"w:val" {
                                p.style = Some(String::from_utf8_lossy(&attr.value).into_owned());
                            }
                        }
                    }
                }
                b"w:tbl" => {
                    in_table = true;
                    rows.clear();
                }
                b"w:tr" => row.clear(),
                b"w:tc" => {
                    in_cell = true;
                    cell_text.clear();
                }
                _ => {}
            },
            Event::Empty(e) => {
                if e.name().as_ref() == b"w:pStyle" {
                    if let Some(p) = para.as_mut() {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"w:val" {
                                p.style = Some(String::from_utf8_lossy(&attr.value).into_owned());
                            }
                        }
                    }
                } else if e.name().as_ref() == b"w:br" {
                    if in_cell {
                        cell_text.push(' ');
                    } else if let Some(p) = para.as_mut() {
                        p.text.push('\n');
                    }
                }
            }
            Event::Text(e) => {
                if in_pstyle {
                    // attribute-only element, no text content expected
                } else {
                    let text = e
                        .unescape()
                        .map_err(|err| Error::validation(format!("malformed docx xml: {err}")))?
                        .into_owned();
                    if in_cell {
                        cell_text.push_str(&text);
                    } else if let Some(p) = para.as_mut() {
                        p.text.push_str(&text);
                    }
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:pStyle" => in_pstyle = false,
                b"w:tc" => {
                    in_cell = false;
                    row.push(cell_text.trim().to_string());
                }
                b"w:tr" => rows.push(std::mem::take(&mut row)),
                b"w:tbl" => {
                    render_table(&rows, &mut out);
                    in_table = false;
                }
                b"w:p" => {
                    if let Some(p) = para.take() {
                        if !in_table {
                            render_paragraph(&p, &mut out);
                        }
                    }
                }
                _ => {}
            },
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

fn render_paragraph(p: &Paragraph, out: &mut String) {
    let text = p.text.trim();
    if let Some(level) = p.heading_level() {
        if !text.is_empty() {
            out.push_str(&"#".repeat(level));
            out.push(' ');
            out.push_str(text);
            out.push_str("\n\n");
        }
    } else if !text.is_empty() {
        out.push_str(text);
        out.push_str("\n\n");
    }
}

fn render_table(rows: &[Vec<String>], out: &mut String) {
    let Some(header) = rows.first() else {
        return;
    };
    let width = header.len().max(1);

    let render_row = |cells: &[String], out: &mut String| {
        out.push('|');
        for i in 0..width {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let cell = if cell.is_empty() { " " } else { cell };
            out.push(' ');
            out.push_str(&escape_table_cell(cell));
            out.push_str(" |");
        }
        out.push('\n');
    };

    render_row(header, out);
    out.push('|');
    for _ in 0..width {
        out.push_str(" --- |");
    }
    out.push('\n');
    for row in &rows[1..] {
        render_row(row, out);
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_heading_and_paragraph() {
        let xml = r#"<w:document xmlns:w="ns"><w:body>
            <w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Title</w:t></w:r></w:p>
            <w:p><w:r><w:t>Some body text.</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let out = render(xml).unwrap();
        assert!(out.contains("# Title"));
        assert!(out.contains("Some body text."));
    }

    #[test]
    fn renders_table_as_gfm() {
        let xml = r#"<w:document xmlns:w="ns"><w:body>
            <w:tbl>
                <w:tr><w:tc><w:p><w:r><w:t>A</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>B</w:t></w:r></w:p></w:tc></w:tr>
                <w:tr><w:tc><w:p><w:r><w:t>1</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>2|x</w:t></w:r></w:p></w:tc></w:tr>
            </w:tbl>
        </w:body></w:document>"#;
        let out = render(xml).unwrap();
        assert!(out.contains("| A | B |"));
        assert!(out.contains("| --- | --- |"));
        assert!(out.contains("2\\|x"));
    }

    #[test]
    fn non_zip_input_is_validation_error() {
        let err = parse(b"not a zip", "fallback".into()).unwrap_err();
        assert_eq!(err.category(), "ValidationFailed");
    }
}
