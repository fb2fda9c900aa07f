use crate::dom::Document;
use crate::render::table_rows;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Html,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".html") || lower.ends_with(".htm") {
        return Some(OutputFormat::Html);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

pub fn render(document: &Document, container_id: &str, format: OutputFormat) -> Vec<u8> {
    match format {
        OutputFormat::Text => render_text(document, container_id),
        OutputFormat::Html => render_html(document),
    }
}

pub fn render_html(document: &Document) -> Vec<u8> {
    document.to_html().into_bytes()
}

/// Every table in the container as aligned plain-text columns. A container
/// with no table renders as nothing.
pub fn render_text(document: &Document, container_id: &str) -> Vec<u8> {
    let Some(container) = document.get_element_by_id(container_id) else {
        return Vec::new();
    };
    let mut out = String::new();
    for table in container.child_elements().filter(|e| e.tag() == "table") {
        let rows = table_rows(table);
        let columns = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        let widths: Vec<usize> = (0..columns)
            .map(|c| {
                rows.iter()
                    .filter_map(|r| r.get(c))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        for (i, row) in rows.iter().enumerate() {
            out.push_str(&format_row(row, &widths));
            if i == 0 {
                let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
                out.push_str(&format_row(&rule, &widths));
            }
        }
    }
    out.into_bytes()
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    let mut line = padded.join("  ").trim_end().to_string();
    line.push('\n');
    line
}
