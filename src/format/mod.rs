//! Output writers for collected records (CSV, JSON).

use crate::config::OutputFormat;
use crate::portal::models::{union_columns, FlatRecord};
use crate::portal::PriceRecord;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Serializes records in the configured format.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Writes records to `path`, creating the parent directory if needed.
    pub fn write_file(&self, records: &[PriceRecord], path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;

        self.write_records(records, std::io::BufWriter::new(file))
            .with_context(|| format!("Failed to write output file: {}", path.display()))?;

        debug!("Wrote {} {} rows to {}", records.len(), self.format, path.display());
        Ok(())
    }

    /// Writes records to any writer.
    pub fn write_records<W: Write>(&self, records: &[PriceRecord], writer: W) -> Result<()> {
        let rows: Vec<FlatRecord> = records.iter().map(PriceRecord::to_flat).collect();

        match self.format {
            OutputFormat::Csv => write_csv(&rows, writer),
            OutputFormat::Json => write_json(&rows, writer),
        }
    }

    /// Formats records as a string.
    pub fn format_records(&self, records: &[PriceRecord]) -> Result<String> {
        let mut buf = Vec::new();
        self.write_records(records, &mut buf)?;
        String::from_utf8(buf).context("Output was not valid UTF-8")
    }
}

fn write_csv<W: Write>(rows: &[FlatRecord], writer: W) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let columns = union_columns(rows);
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(&columns)?;
    for row in rows {
        wtr.write_record(columns.iter().map(|c| row.get(c).unwrap_or_default()))?;
    }

    wtr.flush()?;
    Ok(())
}

/// Every object carries the full column set so keys match the CSV header.
fn write_json<W: Write>(rows: &[FlatRecord], mut writer: W) -> Result<()> {
    let columns = union_columns(rows);

    let padded: Vec<FlatRecord> = rows
        .iter()
        .map(|row| {
            let mut full = FlatRecord::default();
            for column in &columns {
                full.push(column.as_str(), row.get(column).unwrap_or_default());
            }
            full
        })
        .collect();

    serde_json::to_writer_pretty(&mut writer, &padded)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn make_record() -> PriceRecord {
        let mut record = PriceRecord::new("ExampleCo");
        record.item_number = Some("ITEM123".to_string());
        record.model = Some("PRO-123".to_string());
        record.description = Some("Widget, large \"XL\"".to_string());
        record.price_text = Some("$1,149.99".to_string());
        record.stock_status = Some("IN STOCK".to_string());
        record.inventory.insert("Raleigh".to_string(), "12".to_string());
        record.extra_fields.insert("MAP".to_string(), "$199.99".to_string());
        record
    }

    fn make_unauthorized_record() -> PriceRecord {
        let mut record = PriceRecord::new("OtherCo");
        record.item_number = Some("ITEM9".to_string());
        record.inventory.insert("Charlotte".to_string(), "3".to_string());
        record
    }

    fn parse_csv(text: &str) -> Vec<BTreeMap<String, String>> {
        let mut rdr = csv::Reader::from_reader(text.as_bytes());
        let headers = rdr.headers().unwrap().clone();
        rdr.records()
            .map(|r| {
                let r = r.unwrap();
                headers.iter().zip(r.iter()).map(|(h, v)| (h.to_string(), v.to_string())).collect()
            })
            .collect()
    }

    fn parse_json(text: &str) -> Vec<BTreeMap<String, String>> {
        let value: Value = serde_json::from_str(text).unwrap();
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|obj| {
                obj.as_object()
                    .unwrap()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.as_str().unwrap().to_string()))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_csv_header_order() {
        let output = Formatter::new(OutputFormat::Csv).format_records(&[make_record()]).unwrap();
        let header = output.lines().next().unwrap();
        assert_eq!(
            header,
            "collected_at,manufacturer,item_number,model,description,price_text,\
             stock_status,detail_url,image_url,info_map,inventory_raleigh"
        );
    }

    #[test]
    fn test_csv_escapes_fields() {
        let output = Formatter::new(OutputFormat::Csv).format_records(&[make_record()]).unwrap();
        assert!(output.contains("\"Widget, large \"\"XL\"\"\""));
        assert!(output.contains("\"$1,149.99\""));
    }

    #[test]
    fn test_csv_missing_columns_blank() {
        let records = [make_record(), make_unauthorized_record()];
        let rows = parse_csv(&Formatter::new(OutputFormat::Csv).format_records(&records).unwrap());

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["manufacturer"], "OtherCo");
        assert_eq!(rows[1]["price_text"], "");
        assert_eq!(rows[1]["inventory_raleigh"], "");
        assert_eq!(rows[1]["inventory_charlotte"], "3");
        assert_eq!(rows[0]["inventory_charlotte"], "");
    }

    #[test]
    fn test_csv_and_json_field_equivalent() {
        let records = [make_record(), make_unauthorized_record()];

        let csv_rows = parse_csv(&Formatter::new(OutputFormat::Csv).format_records(&records).unwrap());
        let json_rows =
            parse_json(&Formatter::new(OutputFormat::Json).format_records(&records).unwrap());

        assert_eq!(csv_rows.len(), 2);
        assert_eq!(csv_rows, json_rows);
    }

    #[test]
    fn test_json_keys_in_column_order() {
        let output = Formatter::new(OutputFormat::Json).format_records(&[make_record()]).unwrap();
        let collected = output.find("\"collected_at\"").unwrap();
        let manufacturer = output.find("\"manufacturer\"").unwrap();
        let inventory = output.find("\"inventory_raleigh\"").unwrap();
        assert!(collected < manufacturer);
        assert!(manufacturer < inventory);
    }

    #[test]
    fn test_empty_records() {
        let csv = Formatter::new(OutputFormat::Csv).format_records(&[]).unwrap();
        assert!(csv.is_empty());

        let json = Formatter::new(OutputFormat::Json).format_records(&[]).unwrap();
        assert_eq!(json.trim(), "[]");
    }

    #[test]
    fn test_write_file_creates_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("out").join("prices.json");

        Formatter::new(OutputFormat::Json).write_file(&[make_record()], &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let rows = parse_json(&text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["item_number"], "ITEM123");
    }

    #[test]
    fn test_write_file_surfaces_fs_errors() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        // Parent is a regular file, so the directory cannot be created
        let path = blocker.join("prices.csv");
        let err = Formatter::new(OutputFormat::Csv).write_file(&[make_record()], &path).unwrap_err();
        assert!(err.to_string().contains("Failed to create directory"));
    }
}
