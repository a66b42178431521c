use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

use crate::domain::paper::PaperOutcome;
use crate::store::repo::{JournalEntry, JournalRepository};

pub struct SqliteJournal {
    conn: Connection,
}

impl SqliteJournal {
    pub fn open(path: &std::path::Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let repo = Self { conn };
        repo.migrate()?;
        Ok(repo)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS outcomes (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                message_id  TEXT NOT NULL,
                seed_paper  TEXT NOT NULL,
                title       TEXT NOT NULL,
                outcome     TEXT NOT NULL,
                detail      TEXT NOT NULL,
                recorded_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS outcomes_by_outcome ON outcomes (outcome, id);
            "#,
        )?;
        Ok(())
    }
}

impl JournalRepository for SqliteJournal {
    fn record_outcome(&self, entry: &JournalEntry) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO outcomes (message_id, seed_paper, title, outcome, detail, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                entry.message_id,
                entry.seed_paper,
                entry.title,
                entry.outcome.as_str(),
                entry.detail,
                entry.recorded_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn list_failures(&self, limit: usize) -> Result<Vec<JournalEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT message_id, seed_paper, title, outcome, detail, recorded_at
            FROM outcomes
            WHERE outcome != ?1
            ORDER BY id DESC
            LIMIT ?2
            "#,
        )?;

        let mut rows = stmt.query(params![PaperOutcome::Added.as_str(), limit as i64])?;
        let mut out = Vec::new();

        while let Some(r) = rows.next()? {
            let outcome: String = r.get(3)?;
            let recorded_at: String = r.get(5)?;
            out.push(JournalEntry {
                message_id: r.get(0)?,
                seed_paper: r.get(1)?,
                title: r.get(2)?,
                outcome: PaperOutcome::parse(&outcome)
                    .ok_or_else(|| anyhow!("unknown outcome '{outcome}' in journal"))?,
                detail: r.get(4)?,
                recorded_at: DateTime::parse_from_rfc3339(&recorded_at)?.with_timezone(&Utc),
            });
        }
        Ok(out)
    }

    fn counts(&self) -> Result<Vec<(PaperOutcome, i64)>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT outcome, COUNT(*) FROM outcomes GROUP BY outcome ORDER BY outcome"#,
        )?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(r) = rows.next()? {
            let outcome: String = r.get(0)?;
            if let Some(o) = PaperOutcome::parse(&outcome) {
                out.push((o, r.get(1)?));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, outcome: PaperOutcome) -> JournalEntry {
        JournalEntry {
            message_id: "42".into(),
            seed_paper: "Seed Paper X".into(),
            title: title.into(),
            outcome,
            detail: String::new(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn failures_exclude_added_and_are_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let journal = SqliteJournal::open(&dir.path().join("journal.db")).unwrap();

        journal.record_outcome(&entry("Paper A", PaperOutcome::Added)).unwrap();
        journal.record_outcome(&entry("Paper B", PaperOutcome::NoContent)).unwrap();
        journal.record_outcome(&entry("Paper C", PaperOutcome::NotAdded)).unwrap();

        let failures = journal.list_failures(10).unwrap();
        let titles: Vec<&str> = failures.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Paper C", "Paper B"]);
        assert_eq!(failures[0].outcome, PaperOutcome::NotAdded);

        assert_eq!(journal.list_failures(1).unwrap().len(), 1);
    }

    #[test]
    fn counts_group_by_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let journal = SqliteJournal::open(&dir.path().join("journal.db")).unwrap();

        journal.record_outcome(&entry("A", PaperOutcome::Added)).unwrap();
        journal.record_outcome(&entry("B", PaperOutcome::Added)).unwrap();
        journal.record_outcome(&entry("", PaperOutcome::Unparseable)).unwrap();

        let counts = journal.counts().unwrap();
        assert!(counts.contains(&(PaperOutcome::Added, 2)));
        assert!(counts.contains(&(PaperOutcome::Unparseable, 1)));
    }

    #[test]
    fn reopening_keeps_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.db");
        {
            let journal = SqliteJournal::open(&path).unwrap();
            journal.record_outcome(&entry("Paper B", PaperOutcome::SummaryFailed)).unwrap();
        }
        let journal = SqliteJournal::open(&path).unwrap();
        assert_eq!(journal.list_failures(10).unwrap().len(), 1);
    }
}
