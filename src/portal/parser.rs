//! HTML parser for manufacturer listing pages.

use crate::portal::models::PriceRecord;
use crate::portal::selectors::{card, listing};
use scraper::{ElementRef, Html};
use std::collections::BTreeMap;
use tracing::{debug, trace};
use url::Url;

/// Page that serves listings, item detail and search results.
pub const LISTING_PATH: &str = "default.cfm";

/// Price link texts shown instead of a price to anonymous sessions.
const LOGIN_TEXTS: [&str; 2] = ["log in", "sign in"];

/// Note shown in the price column to anonymous sessions.
const LOGIN_NOTE: &str = "log in to see pricing";

/// Records parsed from one listing page.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    /// Product cards in page order
    pub records: Vec<PriceRecord>,
    /// Absolute URL of the next page, if the listing is paginated
    pub next_page: Option<Url>,
}

/// Parser for one portal listing page.
pub struct Parser {
    page_url: Url,
}

impl Parser {
    /// Creates a parser that absolutizes links against the URL the page was
    /// served from.
    pub fn new(page_url: Url) -> Self {
        Self { page_url }
    }

    /// Parses every product card on a listing page.
    ///
    /// Missing fields are left empty; a page without cards yields an empty
    /// listing rather than an error.
    pub fn parse_listing(&self, html: &str, manufacturer: &str) -> ListingPage {
        let document = Html::parse_document(html);

        let records: Vec<PriceRecord> = document
            .select(&listing::CARD)
            .map(|element| {
                let record = self.parse_card(element, manufacturer);
                trace!(
                    "Parsed card: {} - {}",
                    record.item_number.as_deref().unwrap_or("?"),
                    record.description.as_deref().unwrap_or("")
                );
                record
            })
            .collect();

        let next_page = document
            .select(&listing::NEXT_PAGE)
            .next()
            .and_then(|e| e.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty() && !href.starts_with('#'))
            .and_then(|href| self.join(href));

        debug!(
            "Parsed {} records for {} (next page: {})",
            records.len(),
            manufacturer,
            next_page.is_some()
        );

        ListingPage { records, next_page }
    }

    /// Parses a single product card.
    fn parse_card(&self, element: ElementRef, manufacturer: &str) -> PriceRecord {
        let mut record = PriceRecord::new(manufacturer);

        let button_item = element
            .select(&card::MORE_INFO)
            .next()
            .and_then(|e| e.value().attr(card::ITEM_ATTR))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        record.item_number = element
            .select(&card::ITEM_INPUT)
            .next()
            .and_then(|e| e.value().attr("value"))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .or_else(|| button_item.clone());

        record.description = element.select(&card::DESCRIPTION).next().map(text_of);

        record.model = element
            .select(&card::DESCRIPTION_LINE)
            .map(text_of)
            .find_map(|text| label_value(&text, "model:").map(String::from));

        record.price_text = self.parse_price(element);

        record.stock_status = element.select(&card::STOCK).next().map(text_of);

        record.inventory = self.parse_inventory(element);

        record.detail_url = element
            .select(&card::DETAIL_LINK)
            .next()
            .and_then(|e| e.value().attr("href"))
            .and_then(|href| self.join(href.trim()))
            .or_else(|| {
                button_item
                    .or_else(|| record.item_number.clone())
                    .and_then(|item| self.item_url(&item))
            })
            .map(String::from);

        record.image_url = element
            .select(&card::THUMBNAIL)
            .next()
            .and_then(|e| e.value().attr("src"))
            .and_then(|src| self.join(src.trim()))
            .map(String::from);

        record.extra_fields = self.parse_extra_fields(element);

        record
    }

    /// Returns the price text, or None when the card asks the visitor to log in.
    fn parse_price(&self, element: ElementRef) -> Option<String> {
        let text = element.select(&card::PRICE).next().map(text_of)?;

        if text.is_empty() || LOGIN_TEXTS.contains(&text.to_lowercase().as_str()) {
            return None;
        }

        Some(text)
    }

    /// Parses the branch inventory table. Only two-cell rows are used.
    fn parse_inventory(&self, element: ElementRef) -> BTreeMap<String, String> {
        let mut inventory = BTreeMap::new();

        let Some(table) = element.select(&card::INVENTORY_TABLE).next() else {
            return inventory;
        };

        for row in table.select(&card::TABLE_ROW) {
            let cells: Vec<String> = row.select(&card::TABLE_CELL).map(text_of).collect();
            if cells.len() != 2 {
                continue;
            }

            let location = cells[0].trim_end_matches([':', ' ']);
            if !location.is_empty() {
                inventory.insert(location.to_string(), cells[1].clone());
            }
        }

        inventory
    }

    /// Parses labelled values from the column that holds the price link.
    fn parse_extra_fields(&self, element: ElementRef) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();

        let Some(column) =
            element.select(&card::HALF_COLUMN).find(|c| c.select(&card::PRICE).next().is_some())
        else {
            return fields;
        };

        for text in column.select(&card::DESCRIPTION_LINE).map(text_of) {
            if text.is_empty() || label_value(&text, "model:").is_some() {
                continue;
            }

            if let Some(value) = label_value(&text, "map:") {
                fields.insert("MAP".to_string(), value.to_string());
            } else if let Some(value) = label_value(&text, "msrp:") {
                fields.insert("MSRP".to_string(), value.to_string());
            } else if let Some(value) = label_value(&text, "dealer:") {
                fields.insert("Dealer".to_string(), value.to_string());
            } else if !text.eq_ignore_ascii_case(LOGIN_NOTE) {
                fields.insert(text, String::new());
            }
        }

        fields
    }

    /// Resolves a link against the page URL. Unparseable links are dropped.
    fn join(&self, href: &str) -> Option<Url> {
        match self.page_url.join(href) {
            Ok(url) => Some(url),
            Err(e) => {
                debug!("Ignoring link {:?}: {}", href, e);
                None
            }
        }
    }

    /// Detail page link for an item number.
    fn item_url(&self, item: &str) -> Option<Url> {
        let mut url = self.join(LISTING_PATH)?;
        url.query_pairs_mut()
            .append_pair("itemsearch", item)
            .append_pair("page", "products")
            .append_pair("searchcode", "N");
        Some(url)
    }
}

/// Collects an element's text with whitespace collapsed.
fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the trimmed value after `label` if `text` starts with it
/// (ASCII case-insensitive).
fn label_value<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    let head = text.get(..label.len())?;
    if head.eq_ignore_ascii_case(label) {
        Some(text[label.len()..].trim())
    } else {
        None
    }
}
