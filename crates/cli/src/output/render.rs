//! Rendering of operation results
//!
//! Single records print as aligned key/value lines, lists as tables.

use comfy_table::{Table, presets};
use serde::Serialize;

use akv_core::{Operation, OperationKind, ParsedResult, Record, TxHash};

use super::Formatter;
use crate::exit_code::ExitCode;

/// JSON envelope printed for every operation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutput<'a> {
    pub success: bool,
    pub operation: OperationKind,
    pub result: &'a ParsedResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<&'a TxHash>,
}

impl<'a> From<&'a Operation> for OperationOutput<'a> {
    fn from(op: &'a Operation) -> Self {
        Self {
            success: !op.result.is_error_payload(),
            operation: op.kind,
            result: &op.result,
            transaction_hash: op.transaction.as_ref(),
        }
    }
}

/// Print an operation result and pick the exit code
pub fn render_operation(formatter: &Formatter, op: &Operation) -> ExitCode {
    let code = if op.result.is_error_payload() {
        ExitCode::RemoteError
    } else {
        ExitCode::Success
    };

    if formatter.is_json() {
        formatter.json(&OperationOutput::from(op));
        return code;
    }

    match &op.result {
        ParsedResult::ErrorPayload(_) => {
            let message = op.result.error_message().unwrap_or_default();
            formatter.error(&format!("{} failed: {message}", op.kind));
        }
        ParsedResult::Bucket(bucket) => {
            if op.kind == OperationKind::CreateBucket {
                let name = formatter.style_name(bucket.name().unwrap_or("?"));
                formatter.success(&format!("Bucket '{name}' created."));
            }
            print_record(formatter, bucket.fields());
        }
        ParsedResult::BucketList(buckets) => {
            if buckets.is_empty() {
                formatter.println("No buckets found.");
            } else {
                print_table(formatter, buckets.iter().map(|b| b.fields()));
            }
        }
        ParsedResult::File(file) => print_record(formatter, file.fields()),
        ParsedResult::FileList(files) => {
            if files.is_empty() {
                formatter.println("No files found.");
            } else {
                print_table(formatter, files.iter().map(|f| f.fields()));
            }
        }
        ParsedResult::Deletion(record) => {
            let name = formatter.style_name(record.name().unwrap_or("?"));
            formatter.success(&format!("Bucket '{name}' deleted."));
        }
        ParsedResult::Upload(record) => {
            let name = formatter.style_name(record.name().unwrap_or("?"));
            formatter.success(&format!("Uploaded '{name}'."));
            print_record(formatter, record);
        }
        ParsedResult::RawPassthrough(file) => {
            let size = formatter.style_size(&human_size(file.size_bytes));
            formatter.success(&format!("Downloaded to {} ({size}).", file.path.display()));
        }
    }

    if let Some(hash) = &op.transaction {
        let label = formatter.style_key("Transaction:");
        formatter.println(&format!("{label} {}", formatter.style_hash(&hash.to_string())));
    }

    code
}

fn print_record(formatter: &Formatter, record: &Record) {
    let width = record.iter().map(|(k, _)| k.len()).max().unwrap_or(0) + 1;
    for key in ordered_keys([record]) {
        let value = record.get(&key).unwrap_or_default();
        let label = formatter.style_key(&format!("{:<width$}", format!("{key}:")));
        formatter.println(&format!("  {label} {}", styled_value(formatter, &key, value)));
    }
}

fn print_table<'a>(formatter: &Formatter, records: impl Iterator<Item = &'a Record> + Clone) {
    let columns = ordered_keys(records.clone());
    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    // Cells stay unstyled so column widths are not skewed by escape codes
    table.set_header(columns.iter().cloned());
    for record in records {
        table.add_row(
            columns
                .iter()
                .map(|c| display_value(c, record.get(c).unwrap_or_default())),
        );
    }
    formatter.println(&table.to_string());
}

/// Union of keys across records with `Name` first and the rest sorted
fn ordered_keys<'a>(records: impl IntoIterator<Item = &'a Record>) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for record in records {
        for (key, _) in record.iter() {
            if !keys.iter().any(|k| k == key) {
                keys.push(key.to_string());
            }
        }
    }
    keys.sort_by(|a, b| (a != "Name", a).cmp(&(b != "Name", b)));
    keys
}

/// Humanized sizes and timestamps, everything else verbatim
fn display_value(key: &str, value: &str) -> String {
    if key.contains("Size")
        && let Ok(bytes) = value.parse::<u64>()
    {
        return human_size(bytes);
    }
    if let Ok(ts) = value.parse::<jiff::Timestamp>() {
        return ts.strftime("%Y-%m-%d %H:%M:%S UTC").to_string();
    }
    value.to_string()
}

fn styled_value(formatter: &Formatter, key: &str, value: &str) -> String {
    let text = display_value(key, value);
    if key == "Name" {
        formatter.style_name(&text)
    } else if key.contains("Size") {
        formatter.style_size(&text)
    } else if text != value {
        formatter.style_date(&text)
    } else {
        text
    }
}

fn human_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
