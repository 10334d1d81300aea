// src/extract/matrix.rs
use once_cell::sync::Lazy;
use scraper::{ElementRef, Node, Selector};

use crate::row::clean_cell;

/// Rows of cleaned cell text for one `<table>`.
pub type TableMatrix = Vec<Vec<String>>;

static ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr").expect("selector should parse"));

/// Build the cell matrix of `table`: every descendant `<tr>`, its direct
/// `<th>`/`<td>` children as text, trailing empty cells dropped.
pub fn table_to_matrix(table: ElementRef<'_>) -> TableMatrix {
    table
        .select(&ROW_SELECTOR)
        .map(|tr| {
            let mut row: Vec<String> = tr
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|el| matches!(el.value().name(), "td" | "th"))
                .map(node_text)
                .collect();
            while row.last().is_some_and(|c| c.is_empty()) {
                row.pop();
            }
            row
        })
        .collect()
}

/// Visible text of an element with `<br>` read as a line break and all
/// whitespace collapsed. Entities are already decoded by the parser.
pub fn node_text(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    push_text(el, &mut raw);
    clean_cell(&raw)
}

fn push_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(inner) => match inner.name() {
                "br" => out.push('\n'),
                "script" | "style" => {}
                _ => {
                    if let Some(inner_ref) = ElementRef::wrap(child) {
                        push_text(inner_ref, out);
                    }
                }
            },
            _ => {}
        }
    }
}

/// `(row count, widest row)`.
pub fn dimensions(matrix: &TableMatrix) -> (usize, usize) {
    let cols = matrix.iter().map(Vec::len).max().unwrap_or(0);
    (matrix.len(), cols)
}
