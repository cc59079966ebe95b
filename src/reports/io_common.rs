use std::path::{Path, PathBuf};

use crate::reports::*;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum RosterProvider {
    Excel,
    Csv,
}

/// The roster format: the configured provider, or the file extension.
pub fn roster_provider(source: &FileSource, path: &Path) -> ReportResult<RosterProvider> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    let provider = source.provider.clone().or(ext);
    debug!("roster_provider: {:?} {:?}", path, provider);
    match provider.as_deref() {
        Some("xlsx") | Some("excel") => Ok(RosterProvider::Excel),
        Some("csv") => Ok(RosterProvider::Csv),
        Some(x) => whatever!("Provider not implemented {:?}", x),
        None => whatever!("Cannot guess the format of {:?}", path),
    }
}

/// Paths of the configuration are relative to the directory of the
/// configuration file.
pub fn resolve_path(root: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(provider: Option<&str>) -> FileSource {
        FileSource {
            provider: provider.map(|s| s.to_string()),
            file_path: "inscrits".to_string(),
            excel_worksheet_name: None,
            csv_delimiter: None,
            columns: None,
        }
    }

    #[test]
    fn provider_from_config_or_extension() {
        assert_eq!(
            roster_provider(&source(None), Path::new("a/inscrits.CSV")).unwrap(),
            RosterProvider::Csv
        );
        assert_eq!(
            roster_provider(&source(None), Path::new("inscrits.xlsx")).unwrap(),
            RosterProvider::Excel
        );
        assert_eq!(
            roster_provider(&source(Some("csv")), Path::new("inscrits.txt")).unwrap(),
            RosterProvider::Csv
        );
        assert!(roster_provider(&source(None), Path::new("inscrits")).is_err());
        assert!(roster_provider(&source(Some("ods")), Path::new("inscrits.ods")).is_err());
    }

    #[test]
    fn relative_paths() {
        let root = Path::new("conf");
        assert_eq!(resolve_path(root, "modele.docx"), PathBuf::from("conf/modele.docx"));
        assert_eq!(resolve_path(root, "/tmp/modele.docx"), PathBuf::from("/tmp/modele.docx"));
    }
}
