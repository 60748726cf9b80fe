use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use crate::exec::{Holdings, PlayerRound};

/// SQLite-backed store for round records and carry snapshots, keyed by
/// (session, participant[, round]). The engine owns all writes; the front
/// end and export tooling read.
pub struct StateStore {
    conn: Connection,
}

impl StateStore {
    pub fn new(path: &str) -> Result<Self> {
        Ok(Self { conn: Connection::open(path)? })
    }

    pub fn init(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS rounds (
                session TEXT NOT NULL,
                participant TEXT NOT NULL,
                round INTEGER NOT NULL,
                record TEXT NOT NULL,
                PRIMARY KEY (session, participant, round)
            );
            CREATE TABLE IF NOT EXISTS carry (
                session TEXT NOT NULL,
                participant TEXT NOT NULL,
                cash REAL NOT NULL,
                holdings TEXT NOT NULL,
                PRIMARY KEY (session, participant)
            );
            COMMIT;",
        )?;
        Ok(())
    }

    /// Write a finalized round record and the matching carry snapshot in
    /// one transaction, so a crash never splits them.
    pub fn persist_round(
        &mut self,
        session: &str,
        participant: &str,
        record: &PlayerRound,
    ) -> Result<()> {
        let carry = record.holdings();
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO rounds (session, participant, round, record)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                session,
                participant,
                record.round as i64,
                serde_json::to_string(record)?
            ],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO carry (session, participant, cash, holdings)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                session,
                participant,
                carry.cash,
                serde_json::to_string(&carry)?
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn load_carry(&self, session: &str, participant: &str) -> Result<Option<Holdings>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT holdings FROM carry WHERE session = ?1 AND participant = ?2",
                params![session, participant],
                |row| row.get(0),
            )
            .optional()?;
        Ok(match raw {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        })
    }

    pub fn load_rounds(&self, session: &str, participant: &str) -> Result<Vec<PlayerRound>> {
        let mut stmt = self.conn.prepare(
            "SELECT record FROM rounds
             WHERE session = ?1 AND participant = ?2 ORDER BY round ASC",
        )?;
        let rows = stmt.query_map(params![session, participant], |row| {
            row.get::<_, String>(0)
        })?;
        let mut records = Vec::new();
        for raw in rows {
            records.push(serde_json::from_str(&raw?)?);
        }
        Ok(records)
    }
}
