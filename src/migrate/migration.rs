//! Migration file parsing.
//!
//! Migrations are SQL files named `V{version}__{name}.sql` (e.g.
//! `V3__add_loan_status.sql`). Loading sorts strictly by version and
//! rejects duplicates, so the apply order is total and deterministic.

use std::path::Path;

use crate::migrate::MigrationError;

/// One pending schema change.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u64,
    pub name: String,
    pub sql: String,
}

/// Load every migration in a directory, sorted by version.
pub fn load_dir(dir: &Path) -> Result<Vec<Migration>, MigrationError> {
    let entries = std::fs::read_dir(dir).map_err(|source| MigrationError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    let mut migrations = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| MigrationError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("sql") {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().into_owned();
        let (version, name) = parse_file_name(&file_name)
            .ok_or_else(|| MigrationError::InvalidFileName(file_name.clone()))?;

        let sql = std::fs::read_to_string(&path).map_err(|source| MigrationError::Io {
            path: path.display().to_string(),
            source,
        })?;

        migrations.push(Migration { version, name, sql });
    }

    migrations.sort_by_key(|m| m.version);
    for pair in migrations.windows(2) {
        if pair[0].version == pair[1].version {
            return Err(MigrationError::DuplicateVersion(pair[0].version));
        }
    }

    Ok(migrations)
}

fn parse_file_name(file_name: &str) -> Option<(u64, String)> {
    let stem = file_name.strip_suffix(".sql")?;
    let rest = stem.strip_prefix('V')?;
    let (version, name) = rest.split_once("__")?;
    let version: u64 = version.parse().ok()?;
    if name.is_empty() {
        return None;
    }
    Some((version, name.to_string()))
}
