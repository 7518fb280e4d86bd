use crate::assignment::AssignmentResult;
use crate::config::RunConfig;
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRun {
    pub run_id: String,
    pub created_at: String,
    pub seed: u64,
    pub trials: usize,
    pub capacity: u64,
    pub batches: usize,
    pub seed_mode: String,
    pub winner: usize,
    pub winner_score: f64,
    pub fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAssignment {
    pub subject_id: String,
    pub weight: u32,
    pub batch: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredScore {
    pub trial: usize,
    pub avg_balance: Option<f64>,
    pub scored: usize,
    pub flagged: usize,
}

pub struct AssignmentDb {
    conn: Connection,
}

impl AssignmentDb {
    /// Create a new in-memory database
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to create in-memory database")?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Open (or create) a database file
    pub fn open(path: &str) -> Result<Self> {
        let conn =
            Connection::open(path).context(format!("Failed to open database at {}", path))?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
            CREATE TABLE IF NOT EXISTS runs (
                run_id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                seed INTEGER NOT NULL,
                trials INTEGER NOT NULL,
                capacity INTEGER NOT NULL,
                batches INTEGER NOT NULL,
                seed_mode TEXT NOT NULL,
                winner INTEGER NOT NULL,
                winner_score REAL NOT NULL,
                fingerprint TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS assignments (
                run_id TEXT NOT NULL,
                subject_id TEXT NOT NULL,
                weight INTEGER NOT NULL,
                batch INTEGER NOT NULL,
                PRIMARY KEY (run_id, subject_id),
                FOREIGN KEY (run_id) REFERENCES runs(run_id)
            );

            CREATE TABLE IF NOT EXISTS scores (
                run_id TEXT NOT NULL,
                trial INTEGER NOT NULL,
                avg_balance REAL,
                scored INTEGER NOT NULL,
                flagged INTEGER NOT NULL,
                PRIMARY KEY (run_id, trial),
                FOREIGN KEY (run_id) REFERENCES runs(run_id)
            );

            CREATE INDEX IF NOT EXISTS idx_assignments_batch ON assignments(run_id, batch);
            "#,
            )
            .context("Failed to initialize database schema")?;
        Ok(())
    }

    /// Store a completed assignment and its score table; returns the new run id
    pub fn insert_run(&self, config: &RunConfig, result: &AssignmentResult) -> Result<String> {
        let run_id = Uuid::new_v4().to_string();
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        tx.execute(
            "INSERT INTO runs (run_id, created_at, seed, trials, capacity, batches, seed_mode, winner, winner_score, fingerprint) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                run_id,
                Utc::now().to_rfc3339(),
                config.seed as i64,
                config.trials as i64,
                config.capacity as i64,
                config.batches as i64,
                config.seed_mode.to_string(),
                result.winner as i64,
                result.winner_score,
                result.fingerprint
            ],
        )
        .context("Failed to insert run")?;

        for row in &result.rows {
            tx.execute(
                "INSERT INTO assignments (run_id, subject_id, weight, batch) VALUES (?1, ?2, ?3, ?4)",
                params![run_id, row.record.id, row.record.weight, row.batch as i64],
            )
            .context(format!("Failed to insert assignment: {}", row.record.id))?;
        }

        for record in result.scores.records() {
            tx.execute(
                "INSERT INTO scores (run_id, trial, avg_balance, scored, flagged) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    run_id,
                    record.trial as i64,
                    record.avg_balance,
                    record.scored as i64,
                    record.flagged as i64
                ],
            )
            .context(format!("Failed to insert score for trial {}", record.trial))?;
        }

        tx.commit().context("Failed to commit run")?;
        tracing::debug!(%run_id, rows = result.rows.len(), "stored assignment");
        Ok(run_id)
    }

    pub fn get_run(&self, run_id: &str) -> Result<Option<StoredRun>> {
        let mut stmt = self
            .conn
            .prepare("SELECT run_id, created_at, seed, trials, capacity, batches, seed_mode, winner, winner_score, fingerprint FROM runs WHERE run_id = ?1")
            .context("Failed to prepare statement")?;

        let mut rows = stmt
            .query(params![run_id])
            .context("Failed to query run")?;

        if let Some(row) = rows.next().context("Failed to get next row")? {
            Ok(Some(StoredRun {
                run_id: row.get(0)?,
                created_at: row.get(1)?,
                seed: row.get::<_, i64>(2)? as u64,
                trials: row.get::<_, i64>(3)? as usize,
                capacity: row.get::<_, i64>(4)? as u64,
                batches: row.get::<_, i64>(5)? as usize,
                seed_mode: row.get(6)?,
                winner: row.get::<_, i64>(7)? as usize,
                winner_score: row.get(8)?,
                fingerprint: row.get(9)?,
            }))
        } else {
            Ok(None)
        }
    }

    /// Assignments of one run, in subject id order
    pub fn get_assignments(&self, run_id: &str) -> Result<Vec<StoredAssignment>> {
        let mut stmt = self
            .conn
            .prepare("SELECT subject_id, weight, batch FROM assignments WHERE run_id = ?1 ORDER BY subject_id")
            .context("Failed to prepare statement")?;

        let assignments = stmt
            .query_map(params![run_id], |row| {
                Ok(StoredAssignment {
                    subject_id: row.get(0)?,
                    weight: row.get(1)?,
                    batch: row.get::<_, i64>(2)? as usize,
                })
            })
            .context("Failed to query assignments")?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to collect assignments")?;

        Ok(assignments)
    }

    /// Score table of one run, in trial order
    pub fn get_scores(&self, run_id: &str) -> Result<Vec<StoredScore>> {
        let mut stmt = self
            .conn
            .prepare("SELECT trial, avg_balance, scored, flagged FROM scores WHERE run_id = ?1 ORDER BY trial")
            .context("Failed to prepare statement")?;

        let scores = stmt
            .query_map(params![run_id], |row| {
                Ok(StoredScore {
                    trial: row.get::<_, i64>(0)? as usize,
                    avg_balance: row.get(1)?,
                    scored: row.get::<_, i64>(2)? as usize,
                    flagged: row.get::<_, i64>(3)? as usize,
                })
            })
            .context("Failed to query scores")?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to collect scores")?;

        Ok(scores)
    }

    pub fn run_count(&self) -> Result<u32> {
        self.conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))
            .context("Failed to count runs")
    }
}

/// Write `value` as pretty JSON to `path`, or stdout when `path` is `None`
pub fn write_json<T: Serialize>(path: Option<&Path>, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    match path {
        Some(path) => std::fs::write(path, json)
            .context(format!("Failed to write {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::run;
    use crate::config::RunConfigBuilder;
    use crate::subject::{CovariateValue, Subject, SubjectTable};

    fn completed_run() -> (RunConfig, AssignmentResult) {
        let subjects = (0..16)
            .map(|i| Subject {
                id: format!("id{:02}", i),
                weight: 1 + (i % 2) as u32,
                covariates: vec![CovariateValue::Categorical(
                    if i % 4 == 0 { "x" } else { "y" }.to_string(),
                )],
            })
            .collect();
        let table = SubjectTable::new(vec!["site".into()], subjects).unwrap();
        let config = RunConfigBuilder::new()
            .trials(4)
            .capacity(7)
            .batches(3)
            .covariate("site")
            .build()
            .unwrap();
        let result = run(&table, &config)
            .unwrap()
            .outcome
            .assignment()
            .cloned()
            .unwrap();
        (config, result)
    }

    #[test]
    fn test_insert_and_read_back() {
        let (config, result) = completed_run();
        let db = AssignmentDb::new_in_memory().unwrap();
        let run_id = db.insert_run(&config, &result).unwrap();

        let stored = db.get_run(&run_id).unwrap().unwrap();
        assert_eq!(stored.winner, result.winner);
        assert_eq!(stored.fingerprint, result.fingerprint);
        assert_eq!(stored.seed_mode, "per-trial");
        assert_eq!(stored.batches, 3);

        let assignments = db.get_assignments(&run_id).unwrap();
        assert_eq!(assignments.len(), 16);
        assert_eq!(assignments[0].subject_id, "id00");
        assert_eq!(assignments[0].batch, result.rows[0].batch);

        let scores = db.get_scores(&run_id).unwrap();
        assert_eq!(scores.len(), 4);
        assert_eq!(scores[0].trial, 1);
        assert_eq!(db.run_count().unwrap(), 1);
    }

    #[test]
    fn test_missing_run() {
        let db = AssignmentDb::new_in_memory().unwrap();
        assert!(db.get_run("nope").unwrap().is_none());
        assert!(db.get_assignments("nope").unwrap().is_empty());
    }

    #[test]
    fn test_file_database_accumulates_runs() {
        let (config, result) = completed_run();
        let path = std::env::temp_dir().join(format!("batchrand-{}.db", Uuid::new_v4()));
        let path_str = path.to_string_lossy().to_string();

        let first = {
            let db = AssignmentDb::open(&path_str).unwrap();
            db.insert_run(&config, &result).unwrap()
        };
        let db = AssignmentDb::open(&path_str).unwrap();
        let second = db.insert_run(&config, &result).unwrap();

        assert_eq!(db.run_count().unwrap(), 2);
        assert!(db.get_run(&first).unwrap().is_some());
        assert!(db.get_run(&second).unwrap().is_some());

        drop(db);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_runs_get_distinct_ids() {
        let (config, result) = completed_run();
        let db = AssignmentDb::new_in_memory().unwrap();
        let a = db.insert_run(&config, &result).unwrap();
        let b = db.insert_run(&config, &result).unwrap();
        assert_ne!(a, b);
        assert_eq!(db.run_count().unwrap(), 2);
    }
}
