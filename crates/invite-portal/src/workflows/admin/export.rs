use std::io::Write;

use chrono::NaiveDate;

use super::domain::AdminRecord;

/// Byte-order mark so spreadsheet tools detect UTF-8.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const MISSING: &str = "-";

const HEADERS: [&str; 14] = [
    "ID",
    "Email",
    "Identity",
    "Region",
    "Source",
    "Code",
    "Timestamp",
    "Status",
    "Chinese",
    "English",
    "Math",
    "Science",
    "Social",
    "Composition",
];

pub fn write_csv<W: Write>(records: &[AdminRecord], mut writer: W) -> Result<(), csv::Error> {
    writer.write_all(UTF8_BOM)?;
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(HEADERS)?;
    for record in records {
        let scores = record.scores.as_ref();
        csv_writer.write_record([
            record.id.as_str(),
            record.email.as_str(),
            record.identity.as_str(),
            record.region.as_str(),
            record.source.as_str(),
            record.code.as_str(),
            record.timestamp.as_str(),
            record.status.as_str(),
            score_cell(scores.map(|s| &s.chinese)),
            score_cell(scores.map(|s| &s.english)),
            score_cell(scores.map(|s| &s.math)),
            score_cell(scores.map(|s| &s.science)),
            score_cell(scores.map(|s| &s.social)),
            score_cell(scores.map(|s| &s.composition)),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn score_cell(value: Option<&String>) -> &str {
    value
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .unwrap_or(MISSING)
}

pub fn export_bytes(records: &[AdminRecord]) -> Result<Vec<u8>, csv::Error> {
    let mut buffer = Vec::new();
    write_csv(records, &mut buffer)?;
    Ok(buffer)
}

/// `export_users_YYYY-MM-DD.csv`
pub fn export_filename(date: NaiveDate) -> String {
    format!("export_users_{}.csv", date.format("%Y-%m-%d"))
}
