// The outputs of a run: the summary spreadsheet and the archive.

use std::io::{Cursor, Write};

use report_filling::batch::{ArchiveEntry, SummaryRow};
use rust_xlsxwriter::{Format, Workbook};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::reports::*;

/// Column title of the headline answer: the group name, capitalized.
pub fn headline_title(group: Option<&str>) -> String {
    let mut chars = group.unwrap_or("réponse").chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn build_summary(rows: &[SummaryRow], headline_title: &str) -> BReportResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    let header = ["Session", "Formateur", "Participants", headline_title];
    for (col, h) in header.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *h, &bold)
            .context(WritingSummarySnafu {})?;
    }
    for (idx, row) in rows.iter().enumerate() {
        let r = idx as u32 + 1;
        sheet
            .write_string(r, 0, &row.session)
            .context(WritingSummarySnafu {})?;
        sheet
            .write_string(r, 1, &row.trainer)
            .context(WritingSummarySnafu {})?;
        sheet
            .write_number(r, 2, row.participants as f64)
            .context(WritingSummarySnafu {})?;
        sheet
            .write_string(r, 3, row.headline.as_deref().unwrap_or(""))
            .context(WritingSummarySnafu {})?;
    }
    debug!("build_summary: {} rows", rows.len());
    let bytes = workbook.save_to_buffer().context(WritingSummarySnafu {})?;
    Ok(bytes)
}

/// All the documents, then the summary if any, in one deflated archive.
pub fn build_archive(
    entries: &[ArchiveEntry],
    summary: Option<(String, Vec<u8>)>,
) -> BReportResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let summary_entry = summary.map(|(name, bytes)| ArchiveEntry { name, bytes });
    for entry in entries.iter().chain(summary_entry.iter()) {
        debug!("build_archive: {} ({} bytes)", entry.name, entry.bytes.len());
        zip.start_file(entry.name.as_str(), options)
            .context(ZipEntrySnafu {
                name: entry.name.clone(),
            })?;
        zip.write_all(&entry.bytes).context(ZipWriteSnafu {
            name: entry.name.clone(),
        })?;
    }
    let cursor = zip.finish().context(ZipEntrySnafu { name: "" })?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn entry(name: &str, contents: &str) -> ArchiveEntry {
        ArchiveEntry {
            name: name.to_string(),
            bytes: contents.as_bytes().to_vec(),
        }
    }

    #[test]
    fn archive_holds_documents_then_summary() {
        let entries = vec![
            entry("Compte_Rendu_S1.docx", "un"),
            entry("Compte_Rendu_S2.docx", "deux"),
        ];
        let rows = vec![SummaryRow {
            session: "S1".to_string(),
            trainer: "Martin".to_string(),
            participants: 2,
            headline: Some("Satisfait".to_string()),
        }];
        let summary = build_summary(&rows, &headline_title(Some("satisfaction"))).unwrap();
        assert!(!summary.is_empty());
        let bytes = build_archive(&entries, Some(("Recapitulatif.xlsx".to_string(), summary))).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = archive.file_names().map(|s| s.to_string()).collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"Recapitulatif.xlsx".to_string()));
        let mut contents = String::new();
        archive
            .by_name("Compte_Rendu_S2.docx")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "deux");
    }

    #[test]
    fn archive_without_summary() {
        let bytes = build_archive(&[entry("QCM_S1_Durand_Ana.docx", "x")], None).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn titles() {
        assert_eq!(headline_title(Some("satisfaction")), "Satisfaction");
        assert_eq!(headline_title(None), "Réponse");
    }
}
