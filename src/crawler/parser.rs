//! HTML parsers for catalog listing pages and item detail pages
//!
//! Listing pages yield item stubs (and, for page 1, the pagination
//! metadata). Detail pages yield the enrichment fields for one item.
//! Parsers are pure: they never fetch, retry or log.

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use url::Url;

/// Pagination metadata read from the first listing page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    /// Total number of items the catalog reports
    pub total_count: usize,

    /// Number of items shown per page (always >= 1)
    pub items_per_page: usize,
}

impl PageInfo {
    /// Number of listing pages: `ceil(total_count / items_per_page)`
    pub fn page_count(&self) -> u32 {
        let per_page = self.items_per_page.max(1);
        let pages = self.total_count.div_ceil(per_page);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }
}

/// An item as seen on a listing page, before enrichment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ItemStub {
    /// Catalog identifier, unique across the run
    pub id: String,

    /// Display name with any trailing category suffix removed
    pub name: String,

    /// Category taken from a trailing `(Category)` suffix of the display name
    pub category: String,

    /// Short description shown on the listing
    pub summary: String,

    /// Filled risk icons (0-5)
    pub risk: u8,

    /// Filled popularity icons (0-5)
    pub popularity: u8,
}

impl ItemStub {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Result of parsing one listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedListing {
    /// Stubs in document order
    pub stubs: Vec<ItemStub>,

    /// Only present for the first page
    pub page_info: Option<PageInfo>,
}

/// Enrichment fields from an item's detail page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ItemDetail {
    /// Description text, empty if the page has no description section
    pub description: String,

    /// Port tokens in page order, duplicates kept
    pub ports: Vec<String>,

    pub affected_products: Vec<String>,
    pub impact: String,
    pub technology: String,
    pub behavior: Vec<String>,
    pub references: Vec<String>,
}

/// Parses a listing page
///
/// # Arguments
///
/// * `html` - The listing page markup
/// * `page` - 1-based page number; page 1 also yields `PageInfo`
/// * `detail_path` - Path prefix of detail pages (e.g. `/appcontrol/`);
///   only rows whose `onclick` navigates below it are item rows
///
/// # Returns
///
/// * `Ok(ParsedListing)` - Stubs in document order
/// * `Err(String)` - Expected structural elements are missing
///
/// # Example
///
/// ```
/// use appid_harvest::crawler::parse_listing;
///
/// let html = r#"<p class="m-2">Total: <b>1</b></p>
///     <div class="row" onclick="location.href = '/appcontrol/42'">
///       <div class="col-md-3" style="word-break: break-all"><b>Demo (Web)</b></div>
///     </div>"#;
/// let parsed = parse_listing(html, 1, "/appcontrol/").unwrap();
/// assert_eq!(parsed.stubs[0].id, "42");
/// assert_eq!(parsed.stubs[0].category, "Web");
/// assert_eq!(parsed.page_info.unwrap().total_count, 1);
/// ```
pub fn parse_listing(html: &str, page: u32, detail_path: &str) -> Result<ParsedListing, String> {
    let document = Html::parse_document(html);

    let row_selector = selector("div.row[onclick]")?;
    let rows: Vec<(String, ElementRef)> = document
        .select(&row_selector)
        .filter_map(|row| {
            let onclick = row.value().attr("onclick")?;
            extract_item_id(onclick, detail_path).map(|id| (id, row))
        })
        .collect();

    let page_info = if page == 1 {
        let total_count = extract_total(&document)?;
        Some(PageInfo {
            total_count,
            items_per_page: rows.len().max(1),
        })
    } else {
        None
    };

    // An empty catalog is valid; an empty page of a non-empty one is not.
    let empty_catalog = matches!(page_info, Some(info) if info.total_count == 0);
    if rows.is_empty() && !empty_catalog {
        return Err(format!("no application rows found on page {}", page));
    }

    let mut stubs = Vec::with_capacity(rows.len());
    for (id, row) in rows {
        if let Some(stub) = extract_stub(id, row)? {
            stubs.push(stub);
        }
    }

    Ok(ParsedListing { stubs, page_info })
}

/// Parses an item's detail page
///
/// Every section is optional. Only a page with no detail sections and no
/// heading at all is rejected as malformed.
///
/// # Example
///
/// ```
/// use appid_harvest::crawler::parse_detail;
///
/// let html = r#"<div class="detail-item"><h3>Default Ports</h3>
///     <ul><li>TCP/443</li><li>UDP/53</li></ul></div>"#;
/// let detail = parse_detail(html).unwrap();
/// assert_eq!(detail.ports, vec!["TCP/443", "UDP/53"]);
/// assert!(detail.description.is_empty());
/// ```
pub fn parse_detail(html: &str) -> Result<ItemDetail, String> {
    let document = Html::parse_document(html);

    let section_selector = selector("div.detail-item")?;
    let heading_selector = selector("h1, h2")?;
    let title_selector = selector("h3")?;

    let sections: Vec<ElementRef> = document.select(&section_selector).collect();
    if sections.is_empty() && document.select(&heading_selector).next().is_none() {
        return Err("page has neither detail sections nor a heading".to_string());
    }

    let mut detail = ItemDetail::default();
    for section in sections {
        let Some(title) = section.select(&title_selector).next().map(clean_text) else {
            continue;
        };

        if title.contains("Default Ports") {
            detail.ports = list_items(section)?;
        } else if title.contains("Description") {
            detail.description = paragraph(section)?.unwrap_or_default();
        } else if title.contains("Affected Products") {
            detail.affected_products = paragraph_or_list(section)?;
        } else if title.contains("Impact") {
            detail.impact = paragraph(section)?.unwrap_or_default();
        } else if title.contains("Technology") {
            detail.technology = paragraph(section)?.unwrap_or_default();
        } else if title.contains("Behavior") {
            detail.behavior = list_or_paragraph(section)?;
        } else if title.contains("References") {
            detail.references = references(section)?;
        }
    }

    Ok(detail)
}

fn selector(css: &str) -> Result<Selector, String> {
    Selector::parse(css).map_err(|e| format!("invalid selector '{}': {}", css, e))
}

/// Collapses all whitespace runs in an element's text to single spaces
fn clean_text(element: ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracts the identifier from a row's `onclick` navigation target
///
/// With `detail_path` set to `/appcontrol/`, `location.href = '/appcontrol/59958'`
/// yields `59958`. The quoted target may be relative or absolute; its path
/// must be `detail_path` followed by exactly one segment. Query and
/// fragment are ignored.
fn extract_item_id(onclick: &str, detail_path: &str) -> Option<String> {
    let start = onclick.find(['\'', '"'])?;
    let quote = onclick[start..].chars().next()?;
    let rest = &onclick[start + 1..];
    let target = &rest[..rest.find(quote)?];

    let path = match Url::parse(target) {
        Ok(url) => url.path().to_string(),
        Err(_) => target
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let id = path.strip_prefix(detail_path)?.trim_end_matches('/');
    if id.is_empty() || id.contains('/') {
        return None;
    }
    Some(id.to_string())
}

/// Reads the `Total: 6,556` counter
fn extract_total(document: &Html) -> Result<usize, String> {
    let total_selector = selector("p.m-2")?;

    for element in document.select(&total_selector) {
        let text = clean_text(element);
        let Some((_, after)) = text.split_once("Total:") else {
            continue;
        };
        let digits: String = after
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == ',')
            .filter(char::is_ascii_digit)
            .collect();
        if let Ok(total) = digits.parse() {
            return Ok(total);
        }
        return Err(format!("could not read total count from '{}'", text));
    }

    Err("total count element not found".to_string())
}

fn extract_stub(id: String, row: ElementRef) -> Result<Option<ItemStub>, String> {
    let column_selector = selector("div.col-md-3")?;
    let bold_selector = selector("b")?;
    let small_selector = selector("small")?;
    let rating_selector = selector("div.col-md-2")?;

    let columns: Vec<ElementRef> = row.select(&column_selector).collect();
    let Some(full_name) = columns
        .iter()
        .find_map(|col| col.select(&bold_selector).next())
        .map(clean_text)
        .filter(|name| !name.is_empty())
    else {
        return Ok(None);
    };

    let (name, category) = split_category(&full_name);

    let summary = columns
        .get(1)
        .and_then(|col| col.select(&small_selector).next())
        .map(clean_text)
        .unwrap_or_default();

    let ratings: Vec<ElementRef> = row.select(&rating_selector).collect();
    let risk = match ratings.first() {
        Some(col) => count_rating(*col)?,
        None => 0,
    };
    let popularity = match ratings.get(1) {
        Some(col) => count_rating(*col)?,
        None => 0,
    };

    Ok(Some(ItemStub {
        id,
        name,
        category,
        summary,
        risk,
        popularity,
    }))
}

/// Splits `"DNF (Update)"` into `("DNF", "Update")`
fn split_category(full_name: &str) -> (String, String) {
    let split = full_name.strip_suffix(')').and_then(|rest| {
        let open = rest.rfind('(')?;
        let category = &rest[open + 1..];
        let name = rest[..open].trim_end();
        if category.is_empty() || category.contains(')') || name.is_empty() {
            None
        } else {
            Some((name.to_string(), category.to_string()))
        }
    });

    split.unwrap_or_else(|| (full_name.to_string(), String::new()))
}

/// Counts the filled rating icons in a column
fn count_rating(column: ElementRef) -> Result<u8, String> {
    let icon_selector = selector(r#"img[alt*="black-background"]"#)?;
    let count = column.select(&icon_selector).count();
    Ok(u8::try_from(count).unwrap_or(u8::MAX))
}

fn list_items(section: ElementRef) -> Result<Vec<String>, String> {
    let item_selector = selector("li")?;
    Ok(section
        .select(&item_selector)
        .map(clean_text)
        .filter(|text| !text.is_empty())
        .collect())
}

fn paragraph(section: ElementRef) -> Result<Option<String>, String> {
    let p_selector = selector("p")?;
    let text = section
        .select(&p_selector)
        .map(clean_text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Ok(if text.is_empty() { None } else { Some(text) })
}

fn paragraph_or_list(section: ElementRef) -> Result<Vec<String>, String> {
    match paragraph(section)? {
        Some(text) => Ok(vec![text]),
        None => list_items(section),
    }
}

fn list_or_paragraph(section: ElementRef) -> Result<Vec<String>, String> {
    let items = list_items(section)?;
    if !items.is_empty() {
        return Ok(items);
    }
    Ok(paragraph(section)?.into_iter().collect())
}

/// Reference links, preferring each item's href over its text
fn references(section: ElementRef) -> Result<Vec<String>, String> {
    let item_selector = selector("li")?;
    let link_selector = selector("a")?;

    Ok(section
        .select(&item_selector)
        .filter_map(|item| {
            let text = match item.select(&link_selector).next() {
                Some(link) => link.value().attr("href").unwrap_or_default().trim().to_string(),
                None => clean_text(item),
            };
            if text.is_empty() {
                None
            } else {
                Some(text)
            }
        })
        .collect())
}
