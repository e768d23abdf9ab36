//! Startup registration of endpoints from a JSON file.

use crate::db::{DbError, NewEndpoint, Store};

use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid seed file: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Parse a JSON array of `{ "name": ..., "url": ... }` objects.
pub fn parse_seed(json: &str) -> Result<Vec<NewEndpoint>, SeedError> {
    Ok(serde_json::from_str(json)?)
}

/// Register each seed entry whose URL is not already monitored.
///
/// Returns the number of endpoints added.
pub fn apply_seed(store: &Store, entries: &[NewEndpoint]) -> Result<usize, SeedError> {
    let mut added = 0;
    for entry in entries {
        if store.find_endpoint_by_url(&entry.url)?.is_some() {
            continue;
        }
        let endpoint = store.add_endpoint(entry)?;
        tracing::info!("Registered endpoint {} ({})", endpoint.name, endpoint.url);
        added += 1;
    }
    Ok(added)
}

pub fn seed_from_file(store: &Store, path: &Path) -> Result<usize, SeedError> {
    let json = std::fs::read_to_string(path)?;
    let entries = parse_seed(&json)?;
    apply_seed(store, &entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MonitorStore;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_seed_skips_known_urls() {
        let db = NamedTempFile::new().unwrap();
        let store = Store::new(db.path()).unwrap();

        let mut seed = NamedTempFile::new().unwrap();
        write!(
            seed,
            r#"[
                {{"name": "Homepage", "url": "https://example.com"}},
                {{"name": "API", "url": "https://api.example.com/health"}}
            ]"#
        )
        .unwrap();

        assert_eq!(seed_from_file(&store, seed.path()).unwrap(), 2);
        assert_eq!(seed_from_file(&store, seed.path()).unwrap(), 0);
        assert_eq!(store.list_endpoints().unwrap().len(), 2);
    }

    #[test]
    fn test_parse_seed_rejects_malformed_json() {
        assert!(matches!(parse_seed(r#"[{"name": "x"}]"#), Err(SeedError::Json(_))));
        assert!(parse_seed("[]").unwrap().is_empty());
    }

    #[test]
    fn test_missing_seed_file() {
        let db = NamedTempFile::new().unwrap();
        let store = Store::new(db.path()).unwrap();
        let result = seed_from_file(&store, Path::new("/nonexistent/upwatch-seed.json"));
        assert!(matches!(result, Err(SeedError::Io(_))));
    }
}
