use log::{debug, info};
use std::collections::HashMap;

use crate::config::RosterError;

/// A spreadsheet as read by the file readers: the first row, and the data rows
/// below it. All the cells are already rendered as text.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// The names of the required roster columns.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RosterColumns {
    pub session: String,
    pub first_name: String,
    pub last_name: String,
    pub course: String,
    pub duration: String,
    pub trainer: String,
}

impl Default for RosterColumns {
    fn default() -> Self {
        RosterColumns {
            session: "session".to_string(),
            first_name: "Prénom".to_string(),
            last_name: "Nom".to_string(),
            course: "formation".to_string(),
            duration: "nb d'heure".to_string(),
            trainer: "formateur".to_string(),
        }
    }
}

impl RosterColumns {
    fn required(&self) -> [&String; 6] {
        [
            &self.session,
            &self.first_name,
            &self.last_name,
            &self.course,
            &self.duration,
            &self.trainer,
        ]
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RosterRow {
    /// 1-based line in the source file.
    pub line: usize,
    pub session_id: String,
    pub first_name: String,
    pub last_name: String,
    pub course: String,
    pub duration_hours: String,
    pub trainer: String,
}

/// The participants sharing one session id, in file order.
// Invariant: rows is never empty.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Session {
    pub id: String,
    pub rows: Vec<RosterRow>,
}

impl Session {
    // The session-level fields are read from the first participant.
    fn first(&self) -> &RosterRow {
        &self.rows[0]
    }

    pub fn trainer(&self) -> &str {
        &self.first().trainer
    }

    pub fn course(&self) -> &str {
        &self.first().course
    }

    pub fn duration_hours(&self) -> &str {
        &self.first().duration_hours
    }

    pub fn participant_count(&self) -> usize {
        self.rows.len()
    }
}

/// Sessions in order of first appearance in the file.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Roster {
    pub sessions: Vec<Session>,
}

impl Roster {
    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn participant_count(&self) -> usize {
        self.sessions.iter().map(|s| s.rows.len()).sum()
    }
}

fn normalize_column_name(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Validates the roster columns and groups the rows by session.
///
/// Column names are compared trimmed and case-insensitively. The load fails as a
/// whole if a required column is absent, or if a row leaves a required cell
/// empty. Fully blank rows are skipped.
pub fn load_roster(table: &RawTable, columns: &RosterColumns) -> Result<Roster, RosterError> {
    let header_index: HashMap<String, usize> = table
        .header
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_column_name(name), idx))
        .collect();
    debug!("load_roster: header: {:?}", table.header);

    let mut missing: Vec<String> = Vec::new();
    let mut col_indexes: Vec<usize> = Vec::new();
    for name in columns.required() {
        match header_index.get(&normalize_column_name(name)) {
            Some(idx) => col_indexes.push(*idx),
            None => missing.push(name.clone()),
        }
    }
    if !missing.is_empty() {
        return Err(RosterError::MissingColumns(missing));
    }

    let mut sessions: Vec<Session> = Vec::new();
    let mut session_index: HashMap<String, usize> = HashMap::new();
    for (idx, row) in table.rows.iter().enumerate() {
        let line = idx + 2;
        if row.iter().all(|c| c.trim().is_empty()) {
            debug!("load_roster: line {}: blank row, skipped", line);
            continue;
        }
        let mut values: Vec<String> = Vec::new();
        for (col_idx, name) in col_indexes.iter().zip(columns.required()) {
            let v = row.get(*col_idx).map(|s| s.trim()).unwrap_or("");
            if v.is_empty() {
                return Err(RosterError::MissingValue {
                    line,
                    column: name.clone(),
                });
            }
            values.push(v.to_string());
        }
        let mut it = values.into_iter();
        let mut next = || it.next().unwrap_or_default();
        let rr = RosterRow {
            line,
            session_id: next(),
            first_name: next(),
            last_name: next(),
            course: next(),
            duration_hours: next(),
            trainer: next(),
        };
        match session_index.get(&rr.session_id) {
            Some(&s_idx) => sessions[s_idx].rows.push(rr),
            None => {
                session_index.insert(rr.session_id.clone(), sessions.len());
                sessions.push(Session {
                    id: rr.session_id.clone(),
                    rows: vec![rr],
                });
            }
        }
    }

    if sessions.is_empty() {
        return Err(RosterError::EmptyRoster);
    }
    let roster = Roster { sessions };
    info!(
        "Loaded {} participants in {} sessions",
        roster.participant_count(),
        roster.sessions.len()
    );
    Ok(roster)
}
