use billing_core::{clean_text, Row};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

/// CSS selectors for the billing page. Defaults match the D-Tools Cloud
/// billing view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub table: String,
    /// Relative to the table.
    pub body_rows: String,
    /// Relative to a row.
    pub cells: String,
    /// Relative to a row.
    pub status: String,
    /// Relative to a cell; preferred text source when present.
    pub cell_primary: String,
    /// Relative to a cell; used when `cell_primary` is absent.
    pub cell_link: String,
    /// Every pagination item, numbered or not, in document order.
    pub page_items: String,
    pub next_page: String,
    pub active_class: String,
    pub disabled_class: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            table: ".table-container table".to_string(),
            body_rows: "tbody tr".to_string(),
            cells: "td".to_string(),
            status: ".status-height-width span".to_string(),
            cell_primary: ".flex-column".to_string(),
            cell_link: "a".to_string(),
            page_items: "ul.pagination li.page-item".to_string(),
            next_page: "ul.pagination li.page-item.next".to_string(),
            active_class: "active".to_string(),
            disabled_class: "disabled".to_string(),
        }
    }
}

impl Selectors {
    pub fn compile(&self) -> Result<CompiledSelectors, DomError> {
        Ok(CompiledSelectors {
            table: parse_selector(&self.table)?,
            body_rows: parse_selector(&self.body_rows)?,
            cells: parse_selector(&self.cells)?,
            status: parse_selector(&self.status)?,
            cell_primary: parse_selector(&self.cell_primary)?,
            cell_link: parse_selector(&self.cell_link)?,
            page_items: parse_selector(&self.page_items)?,
            next_page: parse_selector(&self.next_page)?,
            controls: parse_selector("a, button")?,
            active_class: self.active_class.clone(),
            disabled_class: self.disabled_class.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("invalid selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },
}

fn parse_selector(css: &str) -> Result<Selector, DomError> {
    Selector::parse(css).map_err(|err| DomError::InvalidSelector {
        selector: css.to_string(),
        message: err.to_string(),
    })
}

#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    table: Selector,
    body_rows: Selector,
    cells: Selector,
    status: Selector,
    cell_primary: Selector,
    cell_link: Selector,
    page_items: Selector,
    next_page: Selector,
    controls: Selector,
    active_class: String,
    disabled_class: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageControl {
    /// First numeric token of the control text; `None` for prev/next/ellipsis items.
    pub label: Option<u32>,
    pub active: bool,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pagination {
    /// All items matched by `page_items`, in document order.
    pub items: Vec<PageControl>,
    /// `Some(disabled)` when a next-page control exists.
    pub next: Option<bool>,
}

impl Pagination {
    /// Largest label among enabled numbered controls; 1 without pagination.
    pub fn total_pages(&self) -> u32 {
        self.items
            .iter()
            .filter(|item| !item.disabled)
            .filter_map(|item| item.label)
            .max()
            .unwrap_or(1)
    }

    /// Label of the active numbered control. A table without pagination is a
    /// single page and always on page 1; prev/next items without numbers mean
    /// the widget is still rendering and the page is unknown.
    pub fn active_page(&self) -> Option<u32> {
        if self.items.is_empty() {
            return Some(1);
        }
        self.items
            .iter()
            .find(|item| item.active && item.label.is_some())
            .and_then(|item| item.label)
    }

    /// Index among `page_items` matches of the control labelled `page`.
    pub fn position_of(&self, page: u32) -> Option<usize> {
        self.items.iter().position(|item| item.label == Some(page))
    }
}

/// Rows of the billing table body, or `None` when the table is not in the document.
pub fn parse_table(html: &str, selectors: &CompiledSelectors) -> Option<Vec<Row>> {
    let doc = Html::parse_document(html);
    let table = doc.select(&selectors.table).next()?;
    let rows = table
        .select(&selectors.body_rows)
        .map(|tr| read_row(tr, selectors))
        .collect();
    Some(rows)
}

pub fn parse_pagination(html: &str, selectors: &CompiledSelectors) -> Pagination {
    let doc = Html::parse_document(html);
    let items = doc
        .select(&selectors.page_items)
        .map(|item| PageControl {
            label: clean_text(&element_text(item))
                .split_whitespace()
                .find_map(|token| token.parse::<u32>().ok()),
            active: has_class(item, &selectors.active_class),
            disabled: is_disabled(item, selectors),
        })
        .collect();
    let next = doc
        .select(&selectors.next_page)
        .next()
        .map(|control| is_disabled(control, selectors));
    Pagination { items, next }
}

fn read_row(tr: ElementRef<'_>, selectors: &CompiledSelectors) -> Row {
    let cells = tr
        .select(&selectors.cells)
        .map(|cell| cell_text(cell, selectors))
        .collect();
    let status = tr
        .select(&selectors.status)
        .next()
        .map(|span| clean_text(&element_text(span)));
    Row { cells, status }
}

fn cell_text(cell: ElementRef<'_>, selectors: &CompiledSelectors) -> String {
    let source = cell
        .select(&selectors.cell_primary)
        .next()
        .or_else(|| cell.select(&selectors.cell_link).next())
        .unwrap_or(cell);
    clean_text(&element_text(source))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

fn is_disabled(element: ElementRef<'_>, selectors: &CompiledSelectors) -> bool {
    let flagged = |el: ElementRef<'_>| {
        has_class(el, &selectors.disabled_class)
            || el.value().attr("disabled").is_some()
            || el.value().attr("aria-disabled") == Some("true")
    };
    flagged(element) || element.select(&selectors.controls).any(flagged)
}
