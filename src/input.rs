//! Reading the record input.
//!
//! The input is read in full and its handle released before any backend call
//! is made.
use crate::error::InputError;
use crate::record::{parse_records, ParsedBatch};
use std::io::Read;
use std::path::Path;

/// Location meaning "read from standard input".
pub const STDIN_LOCATION: &str = "-";

/// Read the raw text at `location` (a file path, or `-` for stdin).
pub fn read_input(location: &str) -> Result<String, InputError> {
    let unavailable = |source: std::io::Error| InputError::Unavailable {
        location: location.to_string(),
        source,
    };
    if location == STDIN_LOCATION {
        let mut text = String::new();
        std::io::stdin()
            .lock()
            .read_to_string(&mut text)
            .map_err(unavailable)?;
        return Ok(text);
    }
    std::fs::read_to_string(Path::new(location)).map_err(unavailable)
}

/// Read and parse the batch at `location`.
pub fn load_batch(location: &str) -> Result<ParsedBatch, InputError> {
    let text = read_input(location)?;
    let batch = parse_records(&text);
    tracing::debug!(
        location,
        records = batch.descriptors.len(),
        skipped = batch.skipped.len(),
        "input parsed"
    );
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_unavailable() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("absent.csv");
        let err = load_batch(&path.display().to_string()).expect_err("missing input");
        let InputError::Unavailable { location, .. } = err;
        assert!(location.ends_with("absent.csv"));
    }

    #[test]
    fn directory_is_unavailable() {
        let dir = tempfile::tempdir().expect("create temp dir");
        assert!(load_batch(&dir.path().display().to_string()).is_err());
    }

    #[test]
    fn loads_records_from_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("views.csv");
        std::fs::write(&path, "id,name,parentId\n1,Root,\n2,Child,1\n3,NUL,\n")
            .expect("write input");
        let batch = load_batch(&path.display().to_string()).expect("load");
        assert_eq!(batch.descriptors.len(), 2);
        assert_eq!(batch.skipped.len(), 1);
    }
}
