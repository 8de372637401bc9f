//! CSS selectors for the portal's manufacturer listing markup.
//!
//! Every selector the parser depends on lives here. When the portal changes
//! its templates, capture a page, update the selector, and extend the
//! fixtures under `tests/fixtures/`.

use scraper::Selector;
use std::sync::LazyLock;

/// Selectors for a manufacturer listing page.
pub mod listing {
    use super::*;

    /// Product card container.
    pub static CARD: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse("div.col.d-flex.flex-column.border.rounded.px-3.py-3").unwrap()
    });

    /// Pagination link to the next page of the listing.
    pub static NEXT_PAGE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "a[rel='next'], \
             ul.pagination a[aria-label='Next']",
        )
        .unwrap()
    });
}

/// Selectors scoped to a single product card.
pub mod card {
    use super::*;

    /// Hidden add-to-cart input carrying the item number.
    pub static ITEM_INPUT: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("form input[name='item']").unwrap());

    /// "More info" button; also carries the item number.
    pub static MORE_INFO: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse(".moreInfoButton").unwrap());

    /// Item number attribute on the more-info button.
    pub static ITEM_ATTR: &str = "data-item";

    /// Bold description line.
    pub static DESCRIPTION: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("p.productDescription.font-weight-bold").unwrap());

    /// Any description paragraph (model, MAP, MSRP, notes).
    pub static DESCRIPTION_LINE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("p.productDescription").unwrap());

    /// Price link; reads "Log In" for anonymous sessions.
    pub static PRICE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("a.productPrice").unwrap());

    /// Stock badge.
    pub static STOCK: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse(".inStock, .outStock, .productStock").unwrap());

    /// Per-branch inventory table.
    pub static INVENTORY_TABLE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("table").unwrap());

    pub static TABLE_ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());

    pub static TABLE_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());

    /// Link to the item detail page.
    pub static DETAIL_LINK: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("a[href*='itemsearch=']").unwrap());

    /// Listing thumbnail.
    pub static THUMBNAIL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("img[src*='/wce/thumbnails/']").unwrap());

    /// Half-width columns; the one holding the price link has the extra fields.
    pub static HALF_COLUMN: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("div.col-6").unwrap());
}
