use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

use super::ParsedTable;
use crate::dom::{clean_cell_text, inner_text};

static ROLE_ROW_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[role="row"]"#).expect("hardcoded role row selector is valid")
});

static CLASS_ROW_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[class*="row"], [class*="Row"]"#)
        .expect("hardcoded class row selector is valid")
});

static CELL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        r#"[role="cell"], [role="gridcell"], [role="columnheader"], [role="rowheader"]"#,
    )
    .expect("hardcoded role cell selector is valid")
});

const TABLE_ROLES: &[&str] = &["table", "grid", "treegrid"];

pub fn is_aria_table(element: ElementRef<'_>) -> bool {
    let value = element.value();
    value
        .attr("role")
        .is_some_and(|role| TABLE_ROLES.contains(&role.trim().to_ascii_lowercase().as_str()))
        || value
            .classes()
            .any(|class| class.to_ascii_lowercase().contains("table"))
}

pub fn parse_aria_table(element: ElementRef<'_>) -> Option<ParsedTable> {
    let mut row_elements = leaf_rows(element, &ROLE_ROW_SELECTOR);
    if row_elements.is_empty() {
        row_elements = leaf_rows(element, &CLASS_ROW_SELECTOR);
    }

    let mut rows = row_elements
        .into_iter()
        .map(row_cells)
        .filter(|cells| !cells.is_empty())
        .collect::<Vec<_>>();
    if rows.is_empty() {
        return None;
    }
    let headers = rows.remove(0);
    ParsedTable::from_parts(headers, rows)
}

fn leaf_rows<'a>(element: ElementRef<'a>, selector: &Selector) -> Vec<ElementRef<'a>> {
    element
        .select(selector)
        .filter(|row| row.select(selector).next().is_none())
        .collect()
}

fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    let role_cells = row
        .select(&CELL_SELECTOR)
        .map(|cell| clean_cell_text(&inner_text(cell)))
        .collect::<Vec<_>>();
    if !role_cells.is_empty() {
        return role_cells;
    }

    row.children()
        .filter_map(ElementRef::wrap)
        .map(|cell| clean_cell_text(&inner_text(cell)))
        .collect()
}
