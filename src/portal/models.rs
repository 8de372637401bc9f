//! Data models for parsed listing rows.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Base columns in output order. Inventory and info columns follow these.
pub const BASE_COLUMNS: [&str; 9] = [
    "collected_at",
    "manufacturer",
    "item_number",
    "model",
    "description",
    "price_text",
    "stock_status",
    "detail_url",
    "image_url",
];

/// One product card from a manufacturer listing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Manufacturer name as requested
    pub manufacturer: String,
    /// Distributor item number used by the cart forms
    pub item_number: Option<String>,
    /// Model identifier shown on the card
    pub model: Option<String>,
    /// Product description
    pub description: Option<String>,
    /// Raw price string; None when the session cannot see pricing
    pub price_text: Option<String>,
    /// Stock badge text such as "IN STOCK"
    pub stock_status: Option<String>,
    /// Branch name to inventory count as displayed
    pub inventory: BTreeMap<String, String>,
    /// Absolute link to the item detail page
    pub detail_url: Option<String>,
    /// Absolute link to the listing thumbnail
    pub image_url: Option<String>,
    /// Other labelled values from the card (MAP, MSRP, notes)
    pub extra_fields: BTreeMap<String, String>,
    /// When the record was parsed
    pub collected_at: DateTime<Utc>,
}

impl PriceRecord {
    /// Creates an empty record for the given manufacturer, stamped now.
    pub fn new(manufacturer: impl Into<String>) -> Self {
        Self {
            manufacturer: manufacturer.into(),
            item_number: None,
            model: None,
            description: None,
            price_text: None,
            stock_status: None,
            inventory: BTreeMap::new(),
            detail_url: None,
            image_url: None,
            extra_fields: BTreeMap::new(),
            collected_at: Utc::now(),
        }
    }

    /// Returns true if the listing showed a price to this session.
    pub fn has_price(&self) -> bool {
        self.price_text.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Flattens the record into ordered output columns.
    pub fn to_flat(&self) -> FlatRecord {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();

        let mut row = FlatRecord::default();
        row.push("collected_at", self.collected_at.to_rfc3339_opts(SecondsFormat::Secs, true));
        row.push("manufacturer", self.manufacturer.clone());
        row.push("item_number", opt(&self.item_number));
        row.push("model", opt(&self.model));
        row.push("description", opt(&self.description));
        row.push("price_text", opt(&self.price_text));
        row.push("stock_status", opt(&self.stock_status));
        row.push("detail_url", opt(&self.detail_url));
        row.push("image_url", opt(&self.image_url));

        for (location, quantity) in &self.inventory {
            row.push(format!("inventory_{}", slugify_key(location)), quantity.clone());
        }
        for (key, value) in &self.extra_fields {
            row.push(format!("info_{}", slugify_key(key)), value.clone());
        }

        row
    }
}

/// A flattened record: ordered column name and value pairs.
///
/// Serializes as a JSON object with keys in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatRecord {
    fields: Vec<(String, String)>,
}

impl FlatRecord {
    /// Appends a column, replacing the value if the column already exists.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(c, _)| *c == column) {
            Some(existing) => existing.1 = value,
            None => self.fields.push((column, value)),
        }
    }

    /// Returns the value for a column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.iter().find(|(c, _)| c == column).map(|(_, v)| v.as_str())
    }

    /// Iterates over column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c, _)| c.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for FlatRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (column, value) in &self.fields {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Returns a CSV friendly slug for a column suffix.
pub fn slugify_key(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_sep = false;

    for c in value.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(c);
        } else {
            pending_sep = true;
        }
    }

    if slug.is_empty() {
        "value".to_string()
    } else {
        slug
    }
}

/// Returns the column order for a set of rows: base columns first, then the
/// remaining columns sorted.
pub fn union_columns(rows: &[FlatRecord]) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    for row in rows {
        seen.extend(row.columns().map(String::from));
    }

    let mut ordered: Vec<String> =
        BASE_COLUMNS.iter().filter(|c| seen.contains(**c)).map(|c| c.to_string()).collect();

    ordered.extend(seen.into_iter().filter(|c| !BASE_COLUMNS.contains(&c.as_str())));
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record() -> PriceRecord {
        let mut record = PriceRecord::new("ExampleCo");
        record.item_number = Some("ITEM123".to_string());
        record.model = Some("PRO-123".to_string());
        record.description = Some("Example Product Title".to_string());
        record.price_text = Some("$149.99".to_string());
        record.stock_status = Some("IN STOCK".to_string());
        record.inventory.insert("Raleigh".to_string(), "12".to_string());
        record.inventory.insert("Charlotte".to_string(), "5".to_string());
        record.extra_fields.insert("MAP".to_string(), "$199.99".to_string());
        record
    }

    #[test]
    fn test_slugify_key() {
        assert_eq!(slugify_key("Raleigh"), "raleigh");
        assert_eq!(slugify_key("  New Bern, NC  "), "new_bern_nc");
        assert_eq!(slugify_key("MAP"), "map");
        assert_eq!(slugify_key("--Call for price!--"), "call_for_price");
        assert_eq!(slugify_key("***"), "value");
        assert_eq!(slugify_key(""), "value");
    }

    #[test]
    fn test_flat_record_columns() {
        let flat = make_record().to_flat();
        let columns: Vec<&str> = flat.columns().collect();

        assert_eq!(&columns[..9], &BASE_COLUMNS[..]);
        // BTreeMap order: Charlotte before Raleigh
        assert_eq!(columns[9], "inventory_charlotte");
        assert_eq!(columns[10], "inventory_raleigh");
        assert_eq!(columns[11], "info_map");

        assert_eq!(flat.get("manufacturer"), Some("ExampleCo"));
        assert_eq!(flat.get("inventory_raleigh"), Some("12"));
        assert_eq!(flat.get("info_map"), Some("$199.99"));
    }

    #[test]
    fn test_flat_record_blank_optionals() {
        let flat = PriceRecord::new("Bare").to_flat();
        assert_eq!(flat.len(), BASE_COLUMNS.len());
        assert_eq!(flat.get("price_text"), Some(""));
        assert_eq!(flat.get("item_number"), Some(""));
    }

    #[test]
    fn test_flat_record_push_replaces() {
        let mut flat = FlatRecord::default();
        flat.push("a", "1");
        flat.push("a", "2");
        assert_eq!(flat.len(), 1);
        assert_eq!(flat.get("a"), Some("2"));
    }

    #[test]
    fn test_union_columns() {
        let first = make_record().to_flat();
        let mut other = PriceRecord::new("Other");
        other.inventory.insert("Atlanta".to_string(), "3".to_string());
        let second = other.to_flat();

        let columns = union_columns(&[first, second]);
        assert_eq!(&columns[..9], &BASE_COLUMNS.map(String::from)[..]);
        assert_eq!(
            &columns[9..],
            &["info_map", "inventory_atlanta", "inventory_charlotte", "inventory_raleigh"]
        );
    }

    #[test]
    fn test_has_price() {
        let mut record = make_record();
        assert!(record.has_price());
        record.price_text = None;
        assert!(!record.has_price());
        record.price_text = Some(String::new());
        assert!(!record.has_price());
    }

    #[test]
    fn test_flat_record_serializes_in_order() {
        let mut flat = FlatRecord::default();
        flat.push("zeta", "1");
        flat.push("alpha", "2");
        let json = serde_json::to_string(&flat).unwrap();
        assert_eq!(json, r#"{"zeta":"1","alpha":"2"}"#);
    }

    #[test]
    fn test_record_serde() {
        let record = make_record();
        let json = serde_json::to_string(&record).unwrap();
        let parsed: PriceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}
