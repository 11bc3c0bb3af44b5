//! Line-delimited JSON entries and the reopenable sources that yield them.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Kind of entry, used for stratified sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    Word,
    Phrase,
}

impl EntryType {
    /// Anything other than exactly `"phrase"` counts as a word.
    pub fn classify(raw: Option<&str>) -> Self {
        match raw {
            Some("phrase") => EntryType::Phrase,
            _ => EntryType::Word,
        }
    }
}

/// One parsed input line.
///
/// Only the recognised fields are extracted; `payload` keeps the whole
/// object, extra fields included, in original key order.
#[derive(Debug, Clone)]
pub struct Record {
    /// 1-based line number in the source.
    pub line_no: usize,
    pub entry_id: i64,
    pub headword: String,
    /// Stored verbatim, defaulting to `"word"`.
    pub entry_type: String,
    pub page: Option<String>,
    pub section: String,
    pub phonetic: Option<String>,
    pub payload: Map<String, Value>,
}

impl Record {
    pub fn parse(line_no: usize, raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| Error::malformed(line_no, format!("invalid JSON: {}", e)))?;
        let payload = match value {
            Value::Object(map) => map,
            other => {
                return Err(Error::malformed(
                    line_no,
                    format!("expected a JSON object, found {}", json_kind(&other)),
                ))
            }
        };

        let entry_id = match payload.get("entry_id") {
            Some(v) => coerce_id(v).ok_or_else(|| {
                Error::malformed(line_no, format!("entry_id is not an integer: {}", v))
            })?,
            None => return Err(Error::malformed(line_no, "missing required field `entry_id`")),
        };
        let page = match payload.get("page") {
            Some(v) => text_of(v),
            None => return Err(Error::malformed(line_no, "missing required field `page`")),
        };

        Ok(Record {
            line_no,
            entry_id,
            headword: text_field(&payload, "headword").unwrap_or_default(),
            entry_type: text_field(&payload, "entry_type").unwrap_or_else(|| "word".to_string()),
            page,
            section: text_field(&payload, "section").unwrap_or_default(),
            phonetic: text_field(&payload, "phonetic"),
            payload,
        })
    }

    pub fn kind(&self) -> EntryType {
        EntryType::classify(Some(self.entry_type.as_str()))
    }

    pub fn has_phonetic(&self) -> bool {
        self.payload.contains_key("phonetic")
    }

    /// Compact JSON with the original key order: the exact bytes that get
    /// compressed.
    pub fn canonical_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.payload).map_err(|e| Error::malformed(self.line_no, e.to_string()))
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Integer coercion: integers, truncated floats, numeric strings, booleans.
fn coerce_id(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(*b as i64),
        _ => None,
    }
}

/// Strings verbatim, `null` as absent, anything else as its JSON text.
fn text_of(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(text_of)
}

/// An input that can be read from the start any number of times.
///
/// The build makes two independent passes, so a plain iterator is not
/// enough.
pub trait RecordSource {
    type Lines: Iterator<Item = io::Result<String>>;

    fn open(&self) -> io::Result<Self::Lines>;

    /// Parsed records of a fresh pass, blank lines skipped.
    fn records(&self) -> Result<Records<Self::Lines>> {
        Ok(Records::new(self.open()?))
    }
}

/// A JSONL file on disk, reopened for every pass.
#[derive(Debug, Clone)]
pub struct JsonlFile {
    path: PathBuf,
}

impl JsonlFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for JsonlFile {
    type Lines = Lines<BufReader<File>>;

    fn open(&self) -> io::Result<Self::Lines> {
        Ok(BufReader::new(File::open(&self.path)?).lines())
    }
}

/// Lines held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    lines: Vec<String>,
}

impl MemorySource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl RecordSource for MemorySource {
    type Lines = std::iter::Map<std::vec::IntoIter<String>, fn(String) -> io::Result<String>>;

    fn open(&self) -> io::Result<Self::Lines> {
        Ok(self.lines.clone().into_iter().map(Ok as fn(String) -> io::Result<String>))
    }
}

/// Parses lines into [`Record`]s, skipping blank lines.
pub struct Records<L> {
    lines: L,
    line_no: usize,
}

impl<L> Records<L>
where
    L: Iterator<Item = io::Result<String>>,
{
    fn new(lines: L) -> Self {
        Self { lines, line_no: 0 }
    }

    /// Also yields the trimmed source line of each record.
    pub fn with_raw(self) -> RawRecords<L> {
        RawRecords(self)
    }

    /// Next non-blank line, trimmed.
    fn next_line(&mut self) -> Option<Result<String>> {
        loop {
            let next = self.lines.next()?;
            self.line_no += 1;
            let line = match next {
                Ok(line) => line,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    return Some(Err(Error::malformed(self.line_no, "invalid UTF-8")))
                }
                Err(e) => return Some(Err(e.into())),
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.len() == line.len() {
                return Some(Ok(line));
            }
            return Some(Ok(trimmed.to_string()));
        }
    }
}

impl<L> Iterator for Records<L>
where
    L: Iterator<Item = io::Result<String>>,
{
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.next_line()?;
        Some(line.and_then(|line| Record::parse(self.line_no, &line)))
    }
}

/// [`Records`] paired with their source lines, as `(line, record)`.
pub struct RawRecords<L>(Records<L>);

impl<L> Iterator for RawRecords<L>
where
    L: Iterator<Item = io::Result<String>>,
{
    type Item = Result<(String, Record)>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.0.next_line()?;
        let line_no = self.0.line_no;
        Some(line.and_then(|line| Record::parse(line_no, &line).map(|record| (line, record))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recognised_fields() {
        let r = Record::parse(
            1,
            r#"{"entry_id":7,"headword":"Apple","entry_type":"word","page":"12","section":"A","extra":[1,2]}"#,
        )
        .unwrap();
        assert_eq!(r.entry_id, 7);
        assert_eq!(r.headword, "Apple");
        assert_eq!(r.entry_type, "word");
        assert_eq!(r.page.as_deref(), Some("12"));
        assert_eq!(r.section, "A");
        assert_eq!(r.phonetic, None);
        assert!(!r.has_phonetic());
        assert_eq!(r.payload["extra"], serde_json::json!([1, 2]));
    }

    #[test]
    fn test_defaults() {
        let r = Record::parse(3, r#"{"entry_id":"42","page":5}"#).unwrap();
        assert_eq!(r.entry_id, 42);
        assert_eq!(r.headword, "");
        assert_eq!(r.entry_type, "word");
        assert_eq!(r.kind(), EntryType::Word);
        assert_eq!(r.page.as_deref(), Some("5"));
        assert_eq!(r.section, "");
    }

    #[test]
    fn test_entry_type_classification() {
        assert_eq!(EntryType::classify(Some("phrase")), EntryType::Phrase);
        assert_eq!(EntryType::classify(Some("word")), EntryType::Word);
        assert_eq!(EntryType::classify(Some("idiom")), EntryType::Word);
        assert_eq!(EntryType::classify(Some("Phrase")), EntryType::Word);
        assert_eq!(EntryType::classify(None), EntryType::Word);
    }

    #[test]
    fn test_entry_id_coercion() {
        let id = |json: &str| Record::parse(1, json).map(|r| r.entry_id);
        assert_eq!(id(r#"{"entry_id":3.9,"page":"1"}"#).unwrap(), 3);
        assert_eq!(id(r#"{"entry_id":" 12 ","page":"1"}"#).unwrap(), 12);
        assert_eq!(id(r#"{"entry_id":true,"page":"1"}"#).unwrap(), 1);
        assert!(id(r#"{"entry_id":"abc","page":"1"}"#).is_err());
        assert!(id(r#"{"entry_id":null,"page":"1"}"#).is_err());
    }

    #[test]
    fn test_missing_required_fields() {
        match Record::parse(4, r#"{"page":"1"}"#) {
            Err(Error::MalformedRecord { line, reason }) => {
                assert_eq!(line, 4);
                assert!(reason.contains("entry_id"));
            }
            other => panic!("unexpected: {:?}", other),
        }
        match Record::parse(5, r#"{"entry_id":1}"#) {
            Err(Error::MalformedRecord { line, reason }) => {
                assert_eq!(line, 5);
                assert!(reason.contains("page"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_non_object_is_malformed() {
        assert!(matches!(
            Record::parse(1, "[1,2,3]"),
            Err(Error::MalformedRecord { line: 1, .. })
        ));
        assert!(matches!(
            Record::parse(2, "{not json"),
            Err(Error::MalformedRecord { line: 2, .. })
        ));
    }

    #[test]
    fn test_canonical_json_keeps_key_order() {
        let r = Record::parse(1, r#"{ "page" : "9",  "entry_id": 2, "zeta": "é", "alpha": {"b":1,"a":2} }"#).unwrap();
        let canonical = String::from_utf8(r.canonical_json().unwrap()).unwrap();
        assert_eq!(canonical, r#"{"page":"9","entry_id":2,"zeta":"é","alpha":{"b":1,"a":2}}"#);
    }

    #[test]
    fn test_records_skip_blank_lines_and_count_lines() {
        let source = MemorySource::new(vec![
            r#"{"entry_id":1,"page":"1"}"#,
            "",
            "   ",
            r#"  {"entry_id":2,"page":"2","entry_type":"phrase"}  "#,
        ]);
        let records: Vec<Record> = source.records().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].line_no, 1);
        assert_eq!(records[1].line_no, 4);
        assert_eq!(records[1].kind(), EntryType::Phrase);
    }

    #[test]
    fn test_with_raw_yields_trimmed_lines() {
        let source = MemorySource::new(vec!["", r#"  {"entry_id":2,"page":"2"}  "#]);
        let pairs: Vec<(String, Record)> = source.records().unwrap().with_raw().collect::<Result<_>>().unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, r#"{"entry_id":2,"page":"2"}"#);
        assert_eq!(pairs[0].1.line_no, 2);
    }

    #[test]
    fn test_invalid_utf8_line_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        let mut bytes = b"{\"entry_id\":1,\"page\":\"1\"}\n".to_vec();
        bytes.extend_from_slice(b"{\"entry_id\":2,\"page\":\"\xff\xfe\"}\n");
        std::fs::write(&path, bytes).unwrap();

        let mut records = JsonlFile::new(&path).records().unwrap();
        assert_eq!(records.next().unwrap().unwrap().entry_id, 1);
        match records.next() {
            Some(Err(Error::MalformedRecord { line, reason })) => {
                assert_eq!(line, 2);
                assert!(reason.contains("UTF-8"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_large_numbers_keep_their_text() {
        let r = Record::parse(
            1,
            r#"{"entry_id":1,"page":123456789012345678901234567890,"freq":3.14159265358979323846264338}"#,
        )
        .unwrap();
        assert_eq!(r.page.as_deref(), Some("123456789012345678901234567890"));
        let canonical = String::from_utf8(r.canonical_json().unwrap()).unwrap();
        assert_eq!(
            canonical,
            r#"{"entry_id":1,"page":123456789012345678901234567890,"freq":3.14159265358979323846264338}"#
        );
    }

    #[test]
    fn test_source_can_be_reopened() {
        let source = MemorySource::new(vec![r#"{"entry_id":1,"page":"1"}"#]);
        assert_eq!(source.records().unwrap().count(), 1);
        assert_eq!(source.records().unwrap().count(), 1);
    }

    #[test]
    fn test_jsonl_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.jsonl");
        std::fs::write(&path, "{\"entry_id\":1,\"page\":\"1\"}\n\n{\"entry_id\":2,\"page\":\"2\"}\n").unwrap();

        let source = JsonlFile::new(&path);
        let ids: Vec<i64> = source.records().unwrap().map(|r| r.unwrap().entry_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(source.records().unwrap().count(), 2);
    }
}
