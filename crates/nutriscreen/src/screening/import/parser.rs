use std::collections::BTreeMap;

use super::ImportIssue;

/// One CSV line mapped onto header names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    /// 1-based line number; the header is row 1.
    pub row_number: usize,
    pub fields: BTreeMap<String, String>,
    pub raw_values: Vec<String>,
}

impl ImportRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .get(column)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug)]
pub(crate) struct ParsedCsv {
    pub(crate) headers: Vec<String>,
    pub(crate) rows: Vec<Result<ImportRow, ImportIssue>>,
}

/// Splits CSV text into rows. Fails only when no header row can be read.
pub(crate) fn parse_rows(text: &str) -> Result<ParsedCsv, ImportIssue> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|err| ImportIssue::batch(format!("unreadable CSV header row: {err}")))?
        .iter()
        .map(clean_header)
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(ImportIssue::batch(
            "CSV file has no header row; expected column names on the first line",
        ));
    }

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let fallback_row = index + 2;
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                let row_number = err
                    .position()
                    .map(|position| position.line() as usize)
                    .unwrap_or(fallback_row);
                rows.push(Err(ImportIssue::row(
                    row_number,
                    None,
                    format!("unreadable CSV row: {err}"),
                )));
                continue;
            }
        };

        // Whitespace-only lines; a row of bare separators is still validated.
        if record.len() == 1 && record.iter().all(str::is_empty) {
            continue;
        }

        let row_number = record
            .position()
            .map(|position| position.line() as usize)
            .unwrap_or(fallback_row);
        let raw_values: Vec<String> = record.iter().map(str::to_string).collect();

        let extra_values = raw_values
            .get(headers.len()..)
            .map_or(false, |extra| extra.iter().any(|value| !value.is_empty()));
        if raw_values.len() < headers.len() || extra_values {
            rows.push(Err(ImportIssue::row(
                row_number,
                None,
                format!(
                    "expected {} fields but found {}; values containing commas must be quoted",
                    headers.len(),
                    raw_values.len()
                ),
            )));
            continue;
        }

        let fields = headers
            .iter()
            .zip(raw_values.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, value)| (header.clone(), value.clone()))
            .collect();

        rows.push(Ok(ImportRow {
            row_number,
            fields,
            raw_values,
        }));
    }

    Ok(ParsedCsv { headers, rows })
}

fn clean_header(value: &str) -> String {
    value.trim_start_matches('\u{feff}').trim().to_string()
}
