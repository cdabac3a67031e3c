//! `.xlsx` parsing: each sheet rendered as `### Sheet: <name>` followed by
//! a markdown table, first row as header.

use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};

use lorekeeper_core::error::{Error, Result};
use lorekeeper_core::traits::ParsedDocument;

use crate::escape_table_cell;

pub(crate) fn parse(bytes: &[u8], fallback_title: String) -> Result<ParsedDocument> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook: Xlsx<_> = open_workbook_from_rs(cursor)
        .map_err(|e| Error::validation(format!("not a valid xlsx: {e}")))?;

    let mut out = String::new();
    for name in workbook.sheet_names().to_owned() {
        let Ok(range) = workbook.worksheet_range(&name) else {
            continue;
        };
        out.push_str(&format!("### Sheet: {name}\n\n"));
        render_sheet(&range, &mut out);
        out.push('\n');
    }

    Ok(ParsedDocument {
        title: fallback_title,
        content: out.trim().to_string(),
        metadata: Default::default(),
    })
}

fn render_sheet(range: &calamine::Range<Data>, out: &mut String) {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return;
    };
    let width = header.len().max(1);

    let render_row = |cells: &[Data], out: &mut String| {
        out.push('|');
        for i in 0..width {
            let rendered = cells.get(i).map(cell_to_string).unwrap_or_default();
            let rendered = if rendered.is_empty() {
                " ".to_string()
            } else {
                escape_table_cell(&rendered)
            };
            out.push(' ');
            out.push_str(&rendered);
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
    for row in rows {
        render_row(row, out);
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        _ => cell.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_xlsx_input_is_validation_error() {
        let err = parse(b"not an xlsx", "fallback".into()).unwrap_err();
        assert_eq!(err.category(), "ValidationFailed");
    }
}
