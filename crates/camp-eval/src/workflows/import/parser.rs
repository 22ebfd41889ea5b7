use std::io::Read;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

use super::normalizer::normalize_name;

/// One data row of a score sheet, still as raw cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreSheetRow {
    /// 1-based line number in the source file.
    pub line: u64,
    pub event: String,
    pub player: String,
    pub evaluator: String,
    pub criterion: String,
    pub score: String,
    pub submitted_at: Option<String>,
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<ScoreSheetRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: csv::StringRecord = csv_reader
        .headers()?
        .iter()
        .map(normalize_name)
        .collect();
    csv_reader.set_headers(headers.clone());

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map(|position| position.line()).unwrap_or(0);
        let row: SheetRow = record.deserialize(Some(&headers))?;
        rows.push(ScoreSheetRow {
            line,
            event: row.event,
            player: row.player,
            evaluator: row.evaluator,
            criterion: row.criterion,
            score: row.score,
            submitted_at: row.submitted_at,
        });
    }

    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct SheetRow {
    event: String,
    player: String,
    evaluator: String,
    criterion: String,
    score: String,
    #[serde(
        rename = "submitted at",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    submitted_at: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
pub(crate) fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
    }

    None
}
