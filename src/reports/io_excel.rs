// Reading rosters from Excel files.

use calamine::{open_workbook, DataType, Reader, Xlsx};
use chrono::Timelike;

use crate::reports::*;

pub fn read_excel_roster(path: &str, worksheet_name_o: Option<&str>) -> BReportResult<RawTable> {
    let wrange = get_range(path, worksheet_name_o)?;
    let mut iter = wrange.rows();
    let header: Vec<String> = match iter.next() {
        Some(row) => cells_to_strings(row, 1),
        None => return Err(Box::new(ReportError::EmptyExcel { path: path.to_string() })),
    };
    debug!("read_excel_roster: header: {:?}", header);

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (idx, row) in iter.enumerate() {
        // The header is line 1.
        let lineno = idx as u64 + 2;
        let cells = cells_to_strings(row, lineno);
        debug!("read_excel_roster: lineno: {:?} row: {:?}", lineno, cells);
        rows.push(cells);
    }
    Ok(RawTable { header, rows })
}

fn cells_to_strings(row: &[DataType], lineno: u64) -> Vec<String> {
    row.iter()
        .map(|elt| match elt {
            DataType::String(s) => s.clone(),
            DataType::Int(i) => i.to_string(),
            // Durations and session numbers are often typed as numbers.
            DataType::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
            DataType::Float(f) => f.to_string(),
            DataType::Bool(b) => b.to_string(),
            DataType::DateTime(serial) => match elt.as_datetime() {
                Some(d) if d.hour() == 0 && d.minute() == 0 && d.second() == 0 => {
                    d.format("%d/%m/%Y").to_string()
                }
                Some(d) => d.format("%d/%m/%Y %H:%M").to_string(),
                None => serial.to_string(),
            },
            DataType::Empty => String::new(),
            // Error cells count as empty: a required column then reports the
            // missing value.
            _ => {
                debug!("cells_to_strings: lineno: {:?} unreadable cell {:?}", lineno, elt);
                String::new()
            }
        })
        .collect()
}

fn get_range(path: &str, worksheet_name_o: Option<&str>) -> BReportResult<calamine::Range<DataType>> {
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        path, worksheet_name_o
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(worksheet_name)
            .context(MissingWorksheetSnafu {
                name: worksheet_name,
                path,
            })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let wrange = workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    }
}
