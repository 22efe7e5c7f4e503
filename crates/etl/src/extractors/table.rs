use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use crate::dataset::RawRow;
use crate::{EtlError, Result};

/// Pulls `(name, market cap text)` pairs out of the first table body in a page.
pub struct TableExtractor {
    body: Selector,
    row: Selector,
    cell: Selector,
}

impl TableExtractor {
    pub fn new() -> Self {
        Self {
            body: Selector::parse("tbody").expect("tbody selector should parse"),
            row: Selector::parse("tr").expect("tr selector should parse"),
            cell: Selector::parse("td").expect("td selector should parse"),
        }
    }

    /// Parses `html` and returns one [`RawRow`] per data row of the first
    /// `<tbody>`, in document order.
    ///
    /// The HTML5 parser inserts an implied `<tbody>` into any `<table>` whose
    /// rows sit directly under it, so a table without an explicit body still
    /// counts, and [`EtlError::Parse`] in practice means the page has no
    /// `<table>` at all. The first such table wins even if a later one has an
    /// explicit `<tbody>`.
    ///
    /// Fails with [`EtlError::Parse`] when the page has no table body. A data
    /// row with no third cell, or a third cell with no content, is still
    /// returned, with `market_cap_text = None`.
    pub fn extract(&self, html: &str) -> Result<Vec<RawRow>> {
        let document = Html::parse_document(html);

        let bodies: Vec<_> = document.select(&self.body).collect();
        info!("Found {} table bodies", bodies.len());

        let body = bodies
            .first()
            .ok_or_else(|| EtlError::Parse("no <tbody> found in document".to_string()))?;

        let rows: Vec<_> = body.select(&self.row).collect();
        debug!("Rows found: {}", rows.len());

        let extracted: Vec<RawRow> = rows
            .into_iter()
            .filter_map(|row| {
                let cells: Vec<_> = row.select(&self.cell).collect();
                is_data_row(&cells).then(|| Self::read_row(&cells))
            })
            .collect();

        info!("Extracted {} data rows", extracted.len());
        Ok(extracted)
    }

    fn read_row(cells: &[ElementRef<'_>]) -> RawRow {
        RawRow {
            name: stripped_text(cells[1]),
            market_cap_text: cells.get(2).and_then(|cell| first_child_text(*cell)),
        }
    }
}

impl Default for TableExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Heuristic for "this `<tr>` is a data row" on the largest-banks page: it has
/// `<td>` cells and the second one links somewhere (the bank's article).
/// Header rows use `<th>` and fail the first test; separator or note rows have
/// no link in the name column.
///
/// This is tied to that page's markup and is not a general table rule.
pub fn is_data_row(cells: &[ElementRef<'_>]) -> bool {
    cells.get(1).is_some_and(|name_cell| {
        name_cell
            .descendants()
            .filter_map(ElementRef::wrap)
            .any(|element| element.value().name() == "a")
    })
}

/// Text of every descendant text node, each trimmed, concatenated.
fn stripped_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .collect()
}

/// Trimmed text of the element's first child node, whether that node is text
/// or an element. `None` if there are no children or the first is neither
/// (a comment, for instance).
fn first_child_text(element: ElementRef<'_>) -> Option<String> {
    let first = element.children().next()?;

    if let Some(text) = first.value().as_text() {
        return Some(text.trim().to_string());
    }

    ElementRef::wrap(first).map(|child| child.text().collect::<String>().trim().to_string())
}
