use rusqlite::{params, Connection, OptionalExtension, Result};
use sha2::{Digest, Sha256};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

// Tests print to stdout/stderr instead of going through the log facade
#[allow(unused_macros)]
macro_rules! log_info {
    ($($arg:tt)*) => {
        #[cfg(not(test))]
        {
            log::info!($($arg)*);
        }
        #[cfg(test)]
        {
            println!("[INFO] {}", format!($($arg)*));
        }
    };
}

#[allow(unused_macros)]
macro_rules! log_error {
    ($($arg:tt)*) => {
        #[cfg(not(test))]
        {
            log::error!($($arg)*);
        }
        #[cfg(test)]
        {
            eprintln!("[ERROR] {}", format!($($arg)*));
        }
    };
}

/// One schema step. Version 0 creates the bookkeeping table itself.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

impl Migration {
    pub fn new(version: u32, name: &'static str, sql: &'static str) -> Self {
        Self { version, name, sql }
    }

    /// Hex sha256 of the SQL text, stored next to the version once applied.
    pub fn checksum(&self) -> String {
        format!("{:x}", Sha256::digest(self.sql.as_bytes()))
    }
}

const SCHEMA: [(&str, &str); 3] = [
    ("bootstrap", include_str!("migrations/000_bootstrap.sql")),
    ("initial_schema", include_str!("migrations/001_initial_schema.sql")),
    ("add_settings", include_str!("migrations/002_add_settings.sql")),
];

/// Brings the trades database up to the latest schema version.
pub struct MigrationRunner {
    migrations: Vec<Migration>,
}

impl Default for MigrationRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationRunner {
    pub fn new() -> Self {
        let migrations = SCHEMA
            .into_iter()
            .enumerate()
            .map(|(version, (name, sql))| Migration::new(version as u32, name, sql))
            .collect();
        Self { migrations }
    }

    pub fn latest_version(&self) -> u32 {
        self.migrations.last().map(|m| m.version).unwrap_or(0)
    }

    /// Applies every migration newer than the recorded version, in order, and
    /// returns how many ran. Stops at the first failure; earlier migrations
    /// of the same run stay committed.
    pub fn run_pending_migrations(&self, conn: &Connection) -> Result<usize> {
        let current = self.get_current_version(conn)?;
        if let Some(version) = current {
            log_info!("Trades schema at version {}", version);
        } else {
            log_info!("Empty database, creating trades schema from scratch");
        }

        let pending: Vec<&Migration> = self
            .migrations
            .iter()
            .filter(|m| current.is_none_or(|v| m.version > v))
            .collect();

        for migration in &pending {
            if let Err(e) = self.apply_migration(conn, migration) {
                log_error!(
                    "Migration {} ({}) failed and was not recorded: {}",
                    migration.version,
                    migration.name,
                    e
                );
                return Err(e);
            }
        }

        Ok(pending.len())
    }

    /// Runs the SQL and records it in `schema_migrations` inside one
    /// transaction, so a failing script leaves no trace.
    fn apply_migration(&self, conn: &Connection, migration: &Migration) -> Result<()> {
        let started = Instant::now();
        let tx = conn.unchecked_transaction()?;

        tx.execute_batch(migration.sql)?;
        let elapsed_ms = started.elapsed().as_millis() as i64;
        tx.execute(
            "INSERT INTO schema_migrations \
             (version, name, applied_at, checksum, execution_time_ms, notes) \
             VALUES (?, ?, ?, ?, ?, NULL)",
            params![
                migration.version,
                migration.name,
                unix_seconds(),
                migration.checksum(),
                elapsed_ms
            ],
        )?;
        tx.commit()?;

        log_info!(
            "Applied migration {} ({}) in {}ms",
            migration.version,
            migration.name,
            elapsed_ms
        );
        Ok(())
    }

    /// Fails if an applied migration's SQL no longer matches its recorded checksum.
    pub fn verify_migrations(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare(
            "SELECT version, checksum FROM schema_migrations \
             WHERE checksum IS NOT NULL ORDER BY version",
        )?;
        let recorded: Vec<(u32, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>>>()?;

        for (version, stored) in recorded {
            let Some(migration) = self.migrations.iter().find(|m| m.version == version) else {
                continue;
            };
            if stored != migration.checksum() {
                log_error!(
                    "Migration {} ({}) was edited after it ran: recorded {}, now {}",
                    version,
                    migration.name,
                    stored,
                    migration.checksum()
                );
                return Err(rusqlite::Error::InvalidQuery);
            }
        }
        Ok(())
    }

    /// Highest applied version, `None` before the bootstrap migration ran.
    pub fn get_current_version(&self, conn: &Connection) -> Result<Option<u32>> {
        if !self.has_schema_migrations_table(conn)? {
            return Ok(None);
        }

        let version = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get::<_, Option<u32>>(0)
            })
            .optional()?
            .flatten();
        Ok(version)
    }

    fn has_schema_migrations_table(&self, conn: &Connection) -> Result<bool> {
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name = 'schema_migrations'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

fn unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
