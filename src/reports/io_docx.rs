// Reading and writing Word documents.
//
// A paragraph is one text unit, and a run with text is one run of the unit.
// Paragraphs nested in tables are visited in document order.

use std::io::Cursor;

use docx_rs::{
    read_docx, BreakType, DocumentChild, Docx, Paragraph, ParagraphChild, Run, RunChild, Table,
    TableCellContent, TableChild, TableRowChild,
};
use report_filling::batch::DocumentWriter;
use report_filling::document::{Document, TextUnit};

use crate::reports::*;

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[allow(irrefutable_let_patterns)]
fn visit_table(table: &mut Table, f: &mut dyn FnMut(&mut Paragraph)) {
    for row in table.rows.iter_mut() {
        if let TableChild::TableRow(r) = row {
            for cell in r.cells.iter_mut() {
                if let TableRowChild::TableCell(c) = cell {
                    for content in c.children.iter_mut() {
                        match content {
                            TableCellContent::Paragraph(p) => f(p),
                            TableCellContent::Table(t) => visit_table(t, &mut *f),
                            _ => {}
                        }
                    }
                }
            }
        }
    }
}

fn visit_paragraphs(docx: &mut Docx, f: &mut dyn FnMut(&mut Paragraph)) {
    for child in docx.document.children.iter_mut() {
        match child {
            DocumentChild::Paragraph(p) => f(p.as_mut()),
            DocumentChild::Table(t) => visit_table(t.as_mut(), &mut *f),
            _ => {}
        }
    }
}

fn text_runs(p: &mut Paragraph) -> Vec<&mut Run> {
    p.children
        .iter_mut()
        .filter_map(|c| match c {
            ParagraphChild::Run(r) => Some(r.as_mut()),
            _ => None,
        })
        .filter(|r| r.children.iter().any(|rc| matches!(rc, RunChild::Text(_))))
        .collect()
}

// Runs wrapped in hyperlinks or tracked insertions are not unit runs.
fn wrapped_children(p: &Paragraph) -> usize {
    p.children
        .iter()
        .filter(|c| matches!(c, ParagraphChild::Hyperlink(_) | ParagraphChild::Insert(_)))
        .count()
}

fn run_text(run: &Run) -> String {
    run.children
        .iter()
        .filter_map(|rc| match rc {
            RunChild::Text(t) => Some(unescape(&t.text)),
            _ => None,
        })
        .collect()
}

fn set_run_text(run: &mut Run, text: &str) {
    let mut first = true;
    for rc in run.children.iter_mut() {
        if let RunChild::Text(t) = rc {
            t.text = if first { escape(text) } else { String::new() };
            first = false;
        }
    }
}

fn parse(bytes: &[u8], path: &str) -> BReportResult<Docx> {
    let docx = read_docx(bytes).map_err(|e| {
        Box::new(ReportError::ParsingTemplate {
            path: path.to_string(),
            message: format!("{:?}", e),
        })
    })?;
    Ok(docx)
}

/// The text units of a template.
pub fn read_template(bytes: &[u8], path: &str) -> BReportResult<Document> {
    let mut docx = parse(bytes, path)?;
    let mut units: Vec<TextUnit> = Vec::new();
    visit_paragraphs(&mut docx, &mut |p: &mut Paragraph| {
        let wrapped = wrapped_children(p);
        if wrapped > 0 {
            warn!(
                "{}: paragraph {}: {} hyperlinks or tracked insertions are left as is",
                path,
                units.len(),
                wrapped
            );
        }
        let runs: Vec<String> = text_runs(p).into_iter().map(|r| run_text(r)).collect();
        units.push(TextUnit { runs });
    });
    debug!("read_template: {}: {} units", path, units.len());
    Ok(Document::new(units))
}

/// Writes filled documents into fresh copies of the template, keeping its
/// formatting.
pub struct DocxWriter {
    template: Vec<u8>,
}

impl DocxWriter {
    pub fn new(template: Vec<u8>) -> DocxWriter {
        DocxWriter { template }
    }

    fn fill(&self, doc: &Document) -> Result<Docx, String> {
        let mut docx = read_docx(&self.template).map_err(|e| format!("{:?}", e))?;
        let mut idx = 0;
        let mut error: Option<String> = None;
        visit_paragraphs(&mut docx, &mut |p: &mut Paragraph| {
            let unit = match doc.units.get(idx) {
                Some(u) => u,
                None => {
                    error.get_or_insert_with(|| {
                        format!("the template has more paragraphs than the {} units", doc.units.len())
                    });
                    return;
                }
            };
            idx += 1;
            if text_runs(p).is_empty() {
                if !unit.text().is_empty() {
                    p.children
                        .push(ParagraphChild::Run(Box::new(Run::new().add_text(unit.text()))));
                }
                return;
            }
            let mut runs = text_runs(p);
            let n = runs.len();
            for (j, run) in runs.iter_mut().enumerate() {
                if j + 1 < n {
                    set_run_text(run, unit.runs.get(j).map(|s| s.as_str()).unwrap_or(""));
                } else {
                    // Runs added while filling go into the last run.
                    let rest: String = unit.runs.iter().skip(j).map(|s| s.as_str()).collect();
                    set_run_text(run, &rest);
                }
            }
        });
        if let Some(e) = error {
            return Err(e);
        }
        if idx != doc.units.len() {
            return Err(format!(
                "{} units for {} paragraphs in the template",
                doc.units.len(),
                idx
            ));
        }

        for text in doc.appended.iter() {
            let mut run = Run::new();
            for (i, line) in text.split('\n').enumerate() {
                if i > 0 {
                    run = run.add_break(BreakType::TextWrapping);
                }
                run = run.add_text(line);
            }
            docx = docx.add_paragraph(Paragraph::new().add_run(run));
        }
        Ok(docx)
    }
}

impl DocumentWriter for DocxWriter {
    type Error = String;

    fn write(&self, doc: &Document) -> Result<Vec<u8>, String> {
        let docx = self.fill(doc)?;
        let mut cursor = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut cursor)
            .map_err(|e| format!("{:?}", e))?;
        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{TableCell, TableRow};

    fn pack(docx: Docx) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        docx.build().pack(&mut cursor).unwrap();
        cursor.into_inner()
    }

    fn template() -> Vec<u8> {
        let docx = Docx::new()
            .add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text("Session "))
                    .add_run(Run::new().add_text("{{ref_session}}").bold()),
            )
            .add_table(Table::new(vec![TableRow::new(vec![
                TableCell::new().add_paragraph(
                    Paragraph::new().add_run(Run::new().add_text("{{checkbox}} Oui & Non")),
                ),
            ])]))
            .add_paragraph(Paragraph::new());
        pack(docx)
    }

    #[test]
    fn units_in_document_order() {
        let doc = read_template(&template(), "modele.docx").unwrap();
        assert_eq!(doc.units.len(), 3);
        assert_eq!(doc.units[0].runs, vec!["Session ", "{{ref_session}}"]);
        assert_eq!(doc.units[1].text(), "{{checkbox}} Oui & Non");
        assert!(doc.units[2].runs.is_empty());
    }

    #[test]
    fn write_keeps_runs_and_appends() {
        let bytes = template();
        let mut doc = read_template(&bytes, "modele.docx").unwrap();
        doc.units[0].runs[1] = "S1".to_string();
        doc.units[1].runs[0] = "☑ Oui & Non".to_string();
        doc.appended
            .push("Autres observations :\nSalle <petite>".to_string());
        let writer = DocxWriter::new(bytes);
        let out = writer.write(&doc).unwrap();

        let back = read_template(&out, "out.docx").unwrap();
        assert_eq!(back.units[0].runs, vec!["Session ", "S1"]);
        assert_eq!(back.units[1].text(), "☑ Oui & Non");
        assert_eq!(back.units.len(), 4);
        assert!(back.units[3].text().contains("Salle <petite>"));

        // The writer starts from the template every time.
        let out2 = writer.write(&doc).unwrap();
        assert_eq!(read_template(&out2, "out2.docx").unwrap().units.len(), 4);
    }

    #[test]
    fn unit_count_mismatch() {
        let bytes = template();
        let mut doc = read_template(&bytes, "modele.docx").unwrap();
        doc.units.pop();
        let writer = DocxWriter::new(bytes);
        assert!(writer.write(&doc).is_err());
    }

    #[test]
    fn invalid_template() {
        let res = read_template(b"not a zip", "modele.docx");
        assert!(matches!(
            res.map_err(|e| *e),
            Err(ReportError::ParsingTemplate { .. })
        ));
    }

    #[test]
    fn wrapped_runs_are_counted() {
        use docx_rs::Insert;
        let p = Paragraph::new()
            .add_run(Run::new().add_text("{{checkbox}} Oui"))
            .add_insert(Insert::new(Run::new().add_text("{{checkbox}} Non")));
        assert_eq!(wrapped_children(&p), 1);
        assert_eq!(wrapped_children(&Paragraph::new().add_run(Run::new())), 0);
    }
}
