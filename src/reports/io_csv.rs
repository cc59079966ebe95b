// Primitives for reading CSV rosters.

use crate::reports::*;

pub fn read_csv_roster(path: &str, source: &FileSource) -> BReportResult<RawTable> {
    let delimiter = csv_delimiter(source)?;
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;

    let mut header: Option<Vec<String>> = None;
    let mut rows: Vec<Vec<String>> = Vec::new();
    for (idx, line_r) in rdr.into_records().enumerate() {
        let lineno = idx + 1;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        let cells: Vec<String> = line.iter().map(|s| s.to_string()).collect();
        debug!("read_csv_roster: lineno: {:?} row: {:?}", lineno, cells);
        if header.is_none() {
            header = Some(cells);
        } else {
            rows.push(cells);
        }
    }
    Ok(RawTable {
        header: header.unwrap_or_default(),
        rows,
    })
}

fn csv_delimiter(source: &FileSource) -> ReportResult<u8> {
    match source.csv_delimiter.as_deref() {
        None => Ok(b','),
        Some("\\t") | Some("\t") => Ok(b'\t'),
        Some(s) if s.len() == 1 => Ok(s.as_bytes()[0]),
        Some(s) => whatever!("csvDelimiter must be a single character, got {:?}", s),
    }
}
