use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::model::{Roster, Task, Ticket};

use super::glpi::{parse_roster, parse_tasks, parse_tickets};
use super::{DataSource, LoadReport, Loaded};

pub const GROUPS_FILE: &str = "groups.json";
pub const TICKETS_FILE: &str = "tickets.json";
pub const TASKS_FILE: &str = "tasks.json";

/// Reads GLPI exports from a directory holding `groups.json`,
/// `tickets.json` and `tasks.json`. A missing file loads as empty.
#[derive(Debug, Clone)]
pub struct FileSource {
    dir: PathBuf,
}

impl FileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(Error::NotFound(format!("data directory {}", dir.display())));
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read(&self, name: &str) -> Result<Option<String>> {
        let path = self.dir.join(name);
        if !path.exists() {
            log::warn!("{} not found, loading no records", path.display());
            return Ok(None);
        }
        log::debug!("reading {}", path.display());
        Ok(Some(std::fs::read_to_string(&path)?))
    }

    fn load_with<T: Default>(
        &self,
        name: &str,
        parse: fn(&str, &str) -> Result<(T, LoadReport)>,
    ) -> Result<Loaded<T>> {
        let (items, report) = match self.read(name)? {
            Some(text) => parse(name, &text)?,
            None => (T::default(), LoadReport::from_counts(name.to_string(), 0, 0)),
        };
        Ok(Loaded { items, report })
    }
}

impl DataSource for FileSource {
    fn roster(&self) -> Result<Loaded<Roster>> {
        self.load_with(GROUPS_FILE, parse_roster)
    }

    fn tickets(&self) -> Result<Loaded<Vec<Ticket>>> {
        self.load_with(TICKETS_FILE, parse_tickets)
    }

    fn tasks(&self) -> Result<Loaded<Vec<Task>>> {
        self.load_with(TASKS_FILE, parse_tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::LoadStatus;
    use crate::model::TicketStatus;

    fn write(dir: &Path, name: &str, text: &str) {
        std::fs::write(dir.join(name), text).unwrap();
    }

    #[test]
    fn test_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            GROUPS_FILE,
            r#"[{"id": 1, "name": "Alpha", "group_users": [{"user": {"id": 1, "first_name": "Bob", "last_name": ""}}]}]"#,
        );
        write(
            dir.path(),
            TICKETS_FILE,
            r#"{"items": [{"id": 10, "status": 6, "date": "2024-03-03", "user_id": 1}, {"status": 1}]}"#,
        );

        let source = FileSource::new(dir.path()).unwrap();
        let (dataset, reports) = source.load().unwrap();

        assert_eq!(dataset.roster.teams[0].name, "Alpha");
        assert_eq!(dataset.tickets.len(), 1);
        assert_eq!(dataset.tickets[0].status, TicketStatus::Closed);
        assert!(dataset.tasks.is_empty());

        assert_eq!(reports[1].status, LoadStatus::PartialFailure);
        assert_eq!(reports[2].source, TASKS_FILE);
        assert_eq!(reports[2].items_loaded, 0);
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileSource::new(dir.path().join("nope")).is_err());
    }

    #[test]
    fn test_malformed_file_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), TASKS_FILE, "{ broken");
        let source = FileSource::new(dir.path()).unwrap();
        assert!(source.tasks().is_err());
        assert!(source.tickets().unwrap().items.is_empty());
    }
}
