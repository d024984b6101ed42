//! Append-only journal used to rebuild the in-memory URL store on restart.
//!
//! The log is a stream of self-delimiting JSON objects, one per newly stored
//! URL, written in creation order:
//!
//! ```text
//! {"key":"c4ed1","value":"https://example.com/a"}
//! {"key":"69a42","value":"https://example.com/b"}
//! ```

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

/// One journal entry: a short id and the URL stored under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub key: String,
    pub value: Url,
}

impl BackupRecord {
    pub fn new(key: impl Into<String>, value: Url) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Handle to an open backup log.
///
/// Appends are serialized behind a dedicated mutex; the file position is not
/// safe for concurrent writers.
#[derive(Debug)]
pub struct BackupLog {
    file: Mutex<File>,
}

impl BackupLog {
    /// Opens (creating if needed) the log at `path` for read and append, and
    /// decodes every record already in it.
    ///
    /// Decoding stops at the first record that cannot be read. That is logged,
    /// the records decoded so far are still returned, and the file is cut back
    /// to the end of the last good record so later appends stay readable.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened or read.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<(Self, Vec<BackupRecord>)> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path.as_ref())
            .await?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents).await?;

        let (records, valid_len) = decode_records(&contents);
        if valid_len < contents.len() {
            warn!(
                dropped_bytes = contents.len() - valid_len,
                "Truncating backup log after the last readable record"
            );
            file.set_len(valid_len as u64).await?;
        }

        Ok((
            Self {
                file: Mutex::new(file),
            },
            records,
        ))
    }

    /// Appends one record and flushes it before returning.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if encoding or writing fails.
    pub async fn append(&self, record: &BackupRecord) -> io::Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await
    }
}

/// Decodes records in order and returns them with the length of the prefix
/// that decoded cleanly, trailing whitespace included.
fn decode_records(contents: &[u8]) -> (Vec<BackupRecord>, usize) {
    let mut records = Vec::new();
    let mut stream = serde_json::Deserializer::from_slice(contents).into_iter::<BackupRecord>();

    let valid_len = loop {
        match stream.next() {
            Some(Ok(record)) => records.push(record),
            None => break contents.len(),
            Some(Err(e)) if e.is_eof() => {
                debug!(replayed = records.len(), "Backup log ends with a truncated record");
                break clean_prefix_len(contents, stream.byte_offset());
            }
            Some(Err(e)) => {
                warn!(
                    error = %e,
                    replayed = records.len(),
                    "Stopping backup replay at undecodable record"
                );
                break clean_prefix_len(contents, stream.byte_offset());
            }
        }
    };

    (records, valid_len)
}

/// Extends `offset` over the whitespace that follows the last good record.
fn clean_prefix_len(contents: &[u8], offset: usize) -> usize {
    offset
        + contents[offset..]
            .iter()
            .take_while(|b| b.is_ascii_whitespace())
            .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str, url: &str) -> BackupRecord {
        BackupRecord::new(key, Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_open_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");

        let (_log, records) = BackupLog::open(&path).await.unwrap();

        assert!(records.is_empty());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_append_then_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");

        {
            let (log, _) = BackupLog::open(&path).await.unwrap();
            log.append(&record("aaaaa", "https://example.com/1"))
                .await
                .unwrap();
            log.append(&record("bbbbb", "https://example.com/2"))
                .await
                .unwrap();
        }

        let (_log, records) = BackupLog::open(&path).await.unwrap();

        assert_eq!(
            records,
            vec![
                record("aaaaa", "https://example.com/1"),
                record("bbbbb", "https://example.com/2"),
            ]
        );
    }

    #[tokio::test]
    async fn test_append_after_replay_keeps_existing_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");

        {
            let (log, _) = BackupLog::open(&path).await.unwrap();
            log.append(&record("aaaaa", "https://example.com/1"))
                .await
                .unwrap();
        }
        {
            let (log, records) = BackupLog::open(&path).await.unwrap();
            assert_eq!(records.len(), 1);
            log.append(&record("bbbbb", "https://example.com/2"))
                .await
                .unwrap();
        }

        let (_log, records) = BackupLog::open(&path).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].key, "bbbbb");
    }

    #[test]
    fn test_decode_stops_at_garbage() {
        let contents = br#"{"key":"aaaaa","value":"https://example.com/1"}
not json at all
{"key":"bbbbb","value":"https://example.com/2"}
"#;

        let (records, valid_len) = decode_records(contents);

        assert_eq!(records, vec![record("aaaaa", "https://example.com/1")]);
        assert_eq!(&contents[valid_len..valid_len + 3], b"not");
    }

    #[test]
    fn test_decode_tolerates_truncated_tail() {
        let contents = br#"{"key":"aaaaa","value":"https://example.com/1"}
{"key":"bbb"#;

        let (records, valid_len) = decode_records(contents);

        assert_eq!(records.len(), 1);
        assert_eq!(&contents[valid_len..], br#"{"key":"bbb"#);
    }

    #[test]
    fn test_decode_rejects_invalid_url_value() {
        let contents = br#"{"key":"aaaaa","value":"not a url"}"#;

        let (records, valid_len) = decode_records(contents);

        assert!(records.is_empty());
        assert_eq!(valid_len, 0);
    }

    #[test]
    fn test_decode_clean_log_keeps_everything() {
        let contents = b"{\"key\":\"aaaaa\",\"value\":\"https://example.com/1\"}\n";

        let (records, valid_len) = decode_records(contents);

        assert_eq!(records.len(), 1);
        assert_eq!(valid_len, contents.len());
    }

    #[tokio::test]
    async fn test_records_appended_after_truncated_tail_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        tokio::fs::write(
            &path,
            "{\"key\":\"aaaaa\",\"value\":\"https://example.com/1\"}\n{\"key\":\"bbb",
        )
        .await
        .unwrap();

        {
            let (log, records) = BackupLog::open(&path).await.unwrap();
            assert_eq!(records.len(), 1);
            log.append(&record("ccccc", "https://example.com/3"))
                .await
                .unwrap();
        }

        let (_log, records) = BackupLog::open(&path).await.unwrap();

        assert_eq!(
            records,
            vec![
                record("aaaaa", "https://example.com/1"),
                record("ccccc", "https://example.com/3"),
            ]
        );
    }
}
