use crate::dom::Element;
use crate::model::PasswordRecord;

pub const HEADER_LABELS: [&str; 3] = ["ID", "Service", "Password"];

/// Appends a new password table to `container`.
///
/// Existing children are left alone; callers clear the container first when
/// they want the table to replace earlier output. Cell values go in as text
/// nodes only.
pub fn populate_password_table(container: &mut Element, records: &[PasswordRecord]) {
    let mut header_row = Element::new("tr");
    for label in HEADER_LABELS {
        header_row.append_child(Element::new("th").with_text(label));
    }
    let thead = Element::new("thead").with_child(header_row);

    let mut tbody = Element::new("tbody");
    for record in records {
        let mut row = Element::new("tr");
        for value in record.cells() {
            row.append_child(Element::new("td").with_text(&value));
        }
        tbody.append_child(row);
    }

    let table = Element::new("table").with_child(thead).with_child(tbody);
    container.append_child(table);
}

/// Cell texts of every row of `table`, header first.
pub fn table_rows(table: &Element) -> Vec<Vec<String>> {
    table
        .descendants_by_tag("tr")
        .into_iter()
        .map(|row| row.child_elements().map(|cell| cell.text_content()).collect())
        .collect()
}
