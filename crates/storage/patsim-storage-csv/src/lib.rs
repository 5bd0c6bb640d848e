/*!
# CSV Storage

Append-only CSV sink for generated datapoints. One row per
[`OutputRecord`]; the header row is written only when the file is new or
empty, so consecutive runs can share one file.
*/

#![warn(missing_docs)]
#![warn(clippy::all)]

use csv::{Reader, Writer, WriterBuilder};
use patsim_core::{OutputRecord, OutputSink, PatsimError, Result};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default output file name
pub const DEFAULT_OUTPUT_PATH: &str = "patient_replies.csv";

/// Header row, in [`OutputRecord`] field order
pub const OUTPUT_HEADER: [&str; 14] = [
    "run_id",
    "sequence",
    "generated_at",
    "persona_id",
    "mood",
    "context_id",
    "therapist_statement",
    "reply",
    "realism_score",
    "explanation",
    "status",
    "attempts",
    "mood_score",
    "personality_traits",
];

/// Appends rows to a CSV file, flushing after each one
pub struct CsvSink {
    writer: Writer<File>,
    path: PathBuf,
    rows_written: usize,
}

impl CsvSink {
    /// Open `path` for appending, creating it if needed
    ///
    /// A non-empty file must start with [`OUTPUT_HEADER`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let is_empty = file.metadata()?.len() == 0;
        if !is_empty {
            check_header(path)?;
        }

        let writer = WriterBuilder::new()
            .has_headers(is_empty)
            .from_writer(file);

        if is_empty {
            info!("Writing new output file {}", path.display());
        } else {
            info!("Appending to existing output file {}", path.display());
        }

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            rows_written: 0,
        })
    }

    /// Output file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows appended through this sink
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }
}

impl OutputSink for CsvSink {
    fn append(&mut self, record: &OutputRecord) -> Result<()> {
        self.writer
            .serialize(record)
            .map_err(|e| PatsimError::storage(format!("{}: {}", self.path.display(), e)))?;
        self.writer.flush()?;
        self.rows_written += 1;
        debug!(sequence = record.sequence, "Row appended to {}", self.path.display());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn check_header(path: &Path) -> Result<()> {
    let mut reader = Reader::from_path(path)
        .map_err(|e| PatsimError::storage(format!("{}: {}", path.display(), e)))?;
    let headers = reader
        .headers()
        .map_err(|e| PatsimError::storage(format!("{}: {}", path.display(), e)))?;

    if !headers.iter().eq(OUTPUT_HEADER.iter().copied()) {
        return Err(PatsimError::storage(format!(
            "{} does not start with the expected header ({}); choose another output file",
            path.display(),
            OUTPUT_HEADER.join(",")
        )));
    }
    Ok(())
}

/// Read every row of an output file
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<OutputRecord>> {
    let path = path.as_ref();
    let mut reader = Reader::from_path(path)
        .map_err(|e| PatsimError::storage(format!("{}: {}", path.display(), e)))?;

    reader
        .deserialize()
        .map(|row| row.map_err(|e| PatsimError::storage(format!("{}: {}", path.display(), e))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use patsim_core::WorkflowStatus;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn record(sequence: usize, reply: &str) -> OutputRecord {
        OutputRecord {
            run_id: Uuid::new_v4(),
            sequence,
            generated_at: "2024-05-01T10:00:00+00:00".to_string(),
            persona_id: "alex".to_string(),
            mood: "anxious, but trying to stay composed".to_string(),
            context_id: "ctx-01".to_string(),
            therapist_statement: "How was your week?".to_string(),
            reply: reply.to_string(),
            realism_score: 0.8,
            explanation: "Consistent with the persona.".to_string(),
            status: WorkflowStatus::Accepted,
            attempts: 1,
            mood_score: 0.9,
            personality_traits: "introverted; perfectionist".to_string(),
        }
    }

    #[test]
    fn test_header_written_once_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");

        let mut sink = CsvSink::open(&path).unwrap();
        sink.append(&record(1, "Patient: Fine.")).unwrap();
        sink.flush().unwrap();
        drop(sink);

        let mut sink = CsvSink::open(&path).unwrap();
        sink.append(&record(1, "Patient: Not great.")).unwrap();
        assert_eq!(sink.rows_written(), 1);
        drop(sink);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.matches("run_id,sequence").count(), 1);
        assert!(contents.starts_with("run_id,sequence,generated_at,persona_id"));

        let rows = read_records(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].reply, "Patient: Not great.");
    }

    #[test]
    fn test_quotes_fields_with_commas_and_newlines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let reply = "Patient: I mean, it's \"fine\".\n(sighs)";

        let mut sink = CsvSink::open(&path).unwrap();
        let written = record(3, reply);
        sink.append(&written).unwrap();
        drop(sink);

        let rows = read_records(&path).unwrap();
        assert_eq!(rows, vec![written]);
        assert_eq!(rows[0].status, WorkflowStatus::Accepted);
    }

    #[test]
    fn test_header_matches_record_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");

        let mut sink = CsvSink::open(&path).unwrap();
        sink.append(&record(1, "Patient: Okay.")).unwrap();
        drop(sink);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().next(), Some(OUTPUT_HEADER.join(",").as_str()));
    }

    #[test]
    fn test_headerless_file_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("patient_replies.csv");
        std::fs::write(&path, "Name: Alex,anxious,Patient: I'm fine.\n").unwrap();

        let err = CsvSink::open(&path).err().unwrap();
        assert!(matches!(err, PatsimError::Storage(_)));
        assert!(err.to_string().contains("expected header"));

        let unchanged = std::fs::read_to_string(&path).unwrap();
        assert_eq!(unchanged, "Name: Alex,anxious,Patient: I'm fine.\n");
    }

    #[test]
    fn test_other_header_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "persona,mood,reply\nalex,calm,Patient: Hi.\n").unwrap();
        assert!(matches!(CsvSink::open(&path), Err(PatsimError::Storage(_))));
    }

    #[test]
    fn test_existing_empty_file_gets_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.csv");
        std::fs::write(&path, "").unwrap();

        let mut sink = CsvSink::open(&path).unwrap();
        sink.append(&record(1, "Patient: Hi.")).unwrap();
        drop(sink);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("run_id,"));
    }

    #[test]
    fn test_open_in_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        assert!(matches!(CsvSink::open(&path), Err(PatsimError::Io(_))));
    }

    #[test]
    fn test_read_records_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = read_records(dir.path().join("nope.csv"));
        assert!(matches!(result, Err(PatsimError::Storage(_))));
    }
}
