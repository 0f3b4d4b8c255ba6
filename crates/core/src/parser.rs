//! Output parser for the external tool
//!
//! The tool prints human-readable lines such as
//! `Bucket created: Name=mybucket, Owner=0xabc` on success and a JSON object
//! when it reports an error in structured mode. Each operation kind maps to a
//! declarative [`Grammar`] in [`GRAMMARS`]; adjusting a vendor message is a
//! change to that table only.

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::types::{BucketRecord, FileRecord, OperationKind, ParsedResult, RawOutput, Record};

/// Where the grammar looks for its literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// The whole trimmed text must start with the literal; the first line is the record
    Prefix,
    /// Any line may contain the literal; noise before and after is ignored
    Marker,
    /// Every line starting with the literal is one record, other lines are skipped
    Lines,
    /// Success output is not text; only error payloads are recognised
    Opaque,
}

/// Line format of one operation's success output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grammar {
    pub kind: OperationKind,
    pub literal: &'static str,
    pub layout: Layout,
    pub pair_separator: &'static str,
    pub key_value_separator: char,
    /// Keys that must be present for the record to be accepted
    pub required: &'static [&'static str],
}

impl Grammar {
    const fn new(kind: OperationKind, literal: &'static str, layout: Layout) -> Self {
        Self {
            kind,
            literal,
            layout,
            pair_separator: ", ",
            key_value_separator: '=',
            required: &[],
        }
    }

    const fn requiring(mut self, keys: &'static [&'static str]) -> Self {
        self.required = keys;
        self
    }
}

pub const GRAMMARS: [Grammar; 8] = [
    Grammar::new(OperationKind::CreateBucket, "Bucket created:", Layout::Prefix),
    Grammar::new(OperationKind::DeleteBucket, "Bucket deleted:", Layout::Prefix).requiring(&["Name"]),
    Grammar::new(OperationKind::ViewBucket, "Bucket:", Layout::Prefix),
    Grammar::new(OperationKind::ListBuckets, "Bucket:", Layout::Lines),
    Grammar::new(OperationKind::ListFiles, "File:", Layout::Lines),
    Grammar::new(OperationKind::FileInfo, "File:", Layout::Prefix),
    Grammar::new(OperationKind::UploadFile, "File uploaded successfully:", Layout::Marker),
    Grammar::new(OperationKind::DownloadFile, "", Layout::Opaque),
];

// Rows are ordered by `OperationKind` discriminant so lookup is an index.
const _: () = {
    assert!(GRAMMARS.len() == OperationKind::ALL.len());
    let mut i = 0;
    while i < GRAMMARS.len() {
        assert!(GRAMMARS[i].kind as usize == i);
        i += 1;
    }
};

/// Look up the grammar for an operation kind
pub fn grammar(kind: OperationKind) -> &'static Grammar {
    &GRAMMARS[kind as usize]
}

/// Parse captured output for the requested operation
///
/// A JSON object always wins over the line grammar. The exit code is not
/// consulted; only the text decides.
pub fn parse_output(kind: OperationKind, raw: &RawOutput) -> Result<ParsedResult> {
    let text = raw.text.trim();

    if let Some(payload) = decode_error_payload(text) {
        tracing::debug!(operation = %kind, "Tool returned a JSON payload");
        return Ok(ParsedResult::ErrorPayload(payload));
    }

    if text.is_empty() {
        return Err(Error::parse(kind, "empty output", text));
    }

    let grammar = grammar(kind);
    match grammar.layout {
        Layout::Prefix => {
            let record = parse_prefixed(grammar, text)?;
            Ok(single(kind, record))
        }
        Layout::Marker => {
            let record = parse_marker(grammar, text)?;
            Ok(single(kind, record))
        }
        Layout::Lines => {
            let records = parse_lines(grammar, text)?;
            Ok(list(kind, records))
        }
        Layout::Opaque => Err(Error::parse(
            kind,
            "tool produced no file and no structured error",
            text,
        )),
    }
}

/// Decode `text` as a JSON object, the shape of a structured tool error
pub(crate) fn decode_error_payload(text: &str) -> Option<Map<String, Value>> {
    let text = text.trim();
    if !text.starts_with('{') {
        return None;
    }
    serde_json::from_str::<Map<String, Value>>(text).ok()
}

fn parse_prefixed(grammar: &Grammar, text: &str) -> Result<Record> {
    let Some(rest) = text.strip_prefix(grammar.literal) else {
        return Err(Error::parse(
            grammar.kind,
            format!("expected output to start with '{}'", grammar.literal),
            text,
        ));
    };
    let payload = rest.lines().next().unwrap_or_default();
    parse_record(grammar, payload).map_err(|reason| Error::parse(grammar.kind, reason, text))
}

fn parse_marker(grammar: &Grammar, text: &str) -> Result<Record> {
    let payload = text.lines().find_map(|line| {
        line.find(grammar.literal)
            .map(|idx| &line[idx + grammar.literal.len()..])
    });
    match payload {
        Some(payload) => {
            parse_record(grammar, payload).map_err(|reason| Error::parse(grammar.kind, reason, text))
        }
        None => Err(Error::parse(
            grammar.kind,
            format!("no line contains '{}'", grammar.literal),
            text,
        )),
    }
}

fn parse_lines(grammar: &Grammar, text: &str) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let Some(payload) = line.trim_end().strip_prefix(grammar.literal) else {
            continue;
        };
        let record = parse_record(grammar, payload)
            .map_err(|reason| Error::parse(grammar.kind, format!("line {}: {reason}", idx + 1), text))?;
        records.push(record);
    }
    Ok(records)
}

/// Split `Key=Value, Key=Value` into a record; any malformed segment fails the whole line
fn parse_record(grammar: &Grammar, payload: &str) -> std::result::Result<Record, String> {
    let mut record = Record::new();
    for segment in payload.trim().split(grammar.pair_separator) {
        let Some((key, value)) = segment.split_once(grammar.key_value_separator) else {
            return Err(format!(
                "segment '{segment}' is not a {}-separated pair",
                grammar.key_value_separator
            ));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("segment '{segment}' has an empty key"));
        }
        record.insert(key, value.trim());
    }

    if let Some(missing) = grammar.required.iter().find(|k| record.get(k).is_none()) {
        return Err(format!("missing required field '{missing}'"));
    }
    Ok(record)
}

fn single(kind: OperationKind, record: Record) -> ParsedResult {
    match kind {
        OperationKind::DeleteBucket => ParsedResult::Deletion(record),
        OperationKind::FileInfo => ParsedResult::File(FileRecord(record)),
        OperationKind::UploadFile => ParsedResult::Upload(record),
        _ => ParsedResult::Bucket(BucketRecord(record)),
    }
}

fn list(kind: OperationKind, records: Vec<Record>) -> ParsedResult {
    match kind {
        OperationKind::ListFiles => {
            ParsedResult::FileList(records.into_iter().map(FileRecord).collect())
        }
        _ => ParsedResult::BucketList(records.into_iter().map(BucketRecord).collect()),
    }
}
