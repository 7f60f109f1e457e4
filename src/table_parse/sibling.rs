use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

use super::ParsedTable;
use crate::dom::{clean_cell_text, inner_text};

static DIV_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div").expect("hardcoded div selector is valid"));

pub fn parse_sibling_structure(
    element: ElementRef<'_>,
    min_children: usize,
    max_children: usize,
) -> Option<ParsedTable> {
    let candidates = std::iter::once(element)
        .filter(|element| element.value().name() == "div")
        .chain(element.select(&DIV_SELECTOR));

    let mut groups: Vec<(usize, Vec<ElementRef<'_>>)> = Vec::new();
    for div in candidates {
        let children = div.children().filter_map(ElementRef::wrap).collect::<Vec<_>>();
        if !(min_children..=max_children).contains(&children.len()) {
            continue;
        }
        if children
            .iter()
            .any(|child| clean_cell_text(&inner_text(*child)).is_empty())
        {
            continue;
        }

        match groups.iter_mut().find(|(count, _)| *count == children.len()) {
            Some((_, members)) => members.push(div),
            None => groups.push((children.len(), vec![div])),
        }
    }

    let (_, members) = groups
        .into_iter()
        .map(|(count, members)| (count, drop_wrappers(members)))
        .filter(|(_, members)| members.len() >= 2)
        .fold(None, |best: Option<(usize, Vec<ElementRef<'_>>)>, group| match best {
            Some(best) if best.1.len() >= group.1.len() => Some(best),
            _ => Some(group),
        })?;

    let mut rows = members
        .into_iter()
        .map(|member| {
            member
                .children()
                .filter_map(ElementRef::wrap)
                .map(|cell| clean_cell_text(&inner_text(cell)))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    let headers = rows.remove(0);
    ParsedTable::from_parts(headers, rows)
}

// A grid wrapper can share a child count with its own rows.
fn drop_wrappers(members: Vec<ElementRef<'_>>) -> Vec<ElementRef<'_>> {
    members
        .iter()
        .filter(|member| {
            !members.iter().any(|other| {
                other.id() != member.id() && other.ancestors().any(|up| up.id() == member.id())
            })
        })
        .copied()
        .collect()
}
