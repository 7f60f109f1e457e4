use scraper::ElementRef;

use super::ParsedTable;
use crate::dom::{clean_cell_text, inner_text};

const MAX_COLSPAN: usize = 64;

pub fn parse_html_table(table: ElementRef<'_>) -> Option<ParsedTable> {
    let thead = child_elements(table).find(|child| child.value().name() == "thead");
    let mut headers = thead
        .and_then(|thead| child_elements(thead).find(|row| row.value().name() == "tr"))
        .map(row_cells)
        .unwrap_or_default();

    let mut rows = Vec::new();
    for row in body_rows(table) {
        let cells = row_cells(row);
        if cells.is_empty() {
            continue;
        }
        if headers.is_empty() && thead.is_none() {
            headers = cells;
            continue;
        }
        rows.push(cells);
    }

    ParsedTable::from_parts(headers, rows)
}

fn child_elements<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap)
}

fn body_rows<'a>(table: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    let mut rows = Vec::new();
    for child in child_elements(table) {
        match child.value().name() {
            "tr" => rows.push(child),
            "tbody" | "tfoot" => rows.extend(
                child_elements(child).filter(|row| row.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    let mut cells = Vec::new();
    for cell in child_elements(row).filter(|cell| matches!(cell.value().name(), "td" | "th")) {
        cells.push(clean_cell_text(&inner_text(cell)));
        let span = cell
            .value()
            .attr("colspan")
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(1)
            .clamp(1, MAX_COLSPAN);
        cells.extend(std::iter::repeat_n(String::new(), span - 1));
    }
    cells
}
