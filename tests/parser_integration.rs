//! Integration tests for the listing parser and output writer using fixture files.

use pricing_recorder::config::OutputFormat;
use pricing_recorder::format::Formatter;
use pricing_recorder::portal::Parser;
use std::collections::BTreeMap;
use url::Url;

const LISTING_FIXTURE: &str = include_str!("fixtures/manufacturer_listing.html");
const UNAUTHORIZED_FIXTURE: &str = include_str!("fixtures/unauthorized_listing.html");
const LISTING_URL: &str =
    "https://21stcenturydist.com/default.cfm?pagelink=manufacturer&pagelink1=ExampleCo&logo=Y";

fn parser() -> Parser {
    Parser::new(Url::parse(LISTING_URL).unwrap())
}

fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn test_parse_manufacturer_listing() {
    let parser = parser();
    let page = parser.parse_listing(LISTING_FIXTURE, "ExampleCo");

    assert_eq!(page.records.len(), 2);

    let record = &page.records[0];
    assert_eq!(record.manufacturer, "ExampleCo");
    assert_eq!(record.item_number.as_deref(), Some("ITEM123"));
    assert_eq!(record.model.as_deref(), Some("PRO-123"));
    assert_eq!(record.description.as_deref(), Some("Example Product Title"));
    assert_eq!(record.price_text.as_deref(), Some("$149.99"));
    assert_eq!(record.stock_status.as_deref(), Some("IN STOCK"));
    assert_eq!(record.inventory, map(&[("Raleigh", "12"), ("Charlotte", "5")]));
    assert_eq!(record.extra_fields, map(&[("MAP", "$199.99"), ("MSRP", "$249.99")]));
    assert_eq!(
        record.detail_url.as_deref(),
        Some("https://21stcenturydist.com/default.cfm?itemsearch=ITEM123&page=products&searchcode=N")
    );
    assert_eq!(
        record.image_url.as_deref(),
        Some("https://21stcenturydist.com/wce/thumbnails/example.png")
    );

    let flat = record.to_flat();
    assert_eq!(flat.get("manufacturer"), Some("ExampleCo"));
    assert_eq!(flat.get("inventory_raleigh"), Some("12"));
    assert_eq!(flat.get("info_map"), Some("$199.99"));
}

#[test]
fn test_parse_card_without_form_or_inventory() {
    let parser = parser();
    let page = parser.parse_listing(LISTING_FIXTURE, "ExampleCo");

    let record = &page.records[1];
    assert_eq!(record.item_number.as_deref(), Some("CLR9"));
    assert_eq!(record.model.as_deref(), Some("CLR-9"));
    assert_eq!(record.description.as_deref(), Some("Clearance Speaker"));
    assert_eq!(record.price_text.as_deref(), Some("$89.00"));
    assert_eq!(record.stock_status.as_deref(), Some("OUT OF STOCK"));
    assert!(record.inventory.is_empty());
    assert_eq!(
        record.extra_fields,
        map(&[("Dealer", "$70.00"), ("Clearance - final sale", "")])
    );
    assert_eq!(
        record.detail_url.as_deref(),
        Some("https://21stcenturydist.com/default.cfm?itemsearch=CLR9&page=products&searchcode=N")
    );
    assert_eq!(
        record.image_url.as_deref(),
        Some("https://cdn.example.com/wce/thumbnails/clearance.png")
    );
}

#[test]
fn test_parse_next_page_link() {
    let parser = parser();
    let page = parser.parse_listing(LISTING_FIXTURE, "ExampleCo");

    assert_eq!(
        page.next_page.as_ref().map(Url::as_str),
        Some(
            "https://21stcenturydist.com/default.cfm?pagelink=manufacturer&pagelink1=ExampleCo&logo=Y&startrow=25"
        )
    );
}

#[test]
fn test_unauthorized_listing_blank_price() {
    let parser = parser();
    let page = parser.parse_listing(UNAUTHORIZED_FIXTURE, "ExampleCo");

    assert_eq!(page.records.len(), 1);
    assert!(page.next_page.is_none());

    let record = &page.records[0];
    assert!(record.price_text.is_none());
    assert!(!record.has_price());
    assert!(record.extra_fields.is_empty());

    // Everything else is still visible without logging in
    assert_eq!(record.item_number.as_deref(), Some("ITEM123"));
    assert_eq!(record.model.as_deref(), Some("PRO-123"));
    assert_eq!(record.description.as_deref(), Some("Example Product Title"));
    assert_eq!(record.stock_status.as_deref(), Some("IN STOCK"));
    assert_eq!(record.inventory, map(&[("Raleigh", "12"), ("Charlotte", "5")]));

    let flat = record.to_flat();
    assert_eq!(flat.get("price_text"), Some(""));
}

#[test]
fn test_fixture_csv_and_json_equivalent() {
    let parser = parser();
    let mut records = parser.parse_listing(LISTING_FIXTURE, "ExampleCo").records;
    records.extend(parser.parse_listing(UNAUTHORIZED_FIXTURE, "OtherCo").records);

    let csv_text = Formatter::new(OutputFormat::Csv).format_records(&records).unwrap();
    let json_text = Formatter::new(OutputFormat::Json).format_records(&records).unwrap();

    let mut rdr = csv::Reader::from_reader(csv_text.as_bytes());
    let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
    let csv_rows: Vec<Vec<String>> = rdr
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();

    let json: serde_json::Value = serde_json::from_str(&json_text).unwrap();
    let json_rows = json.as_array().unwrap();

    assert_eq!(csv_rows.len(), 3);
    assert_eq!(json_rows.len(), 3);

    for (csv_row, json_row) in csv_rows.iter().zip(json_rows) {
        let object = json_row.as_object().unwrap();
        assert_eq!(object.len(), headers.len());
        for (column, value) in headers.iter().zip(csv_row) {
            assert_eq!(object[column].as_str(), Some(value.as_str()), "column {}", column);
        }
    }
}
