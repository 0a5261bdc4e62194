//! Line-delimited JSON sources

use async_trait::async_trait;
use rda_common::{RdaError, Result};
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use super::{exhausted, RecordSource, Sequenced};
use crate::cache::{open_possibly_compressed, CachedFile};

/// Lines read per trip to the blocking pool.
const READ_AHEAD_LINES: usize = 256;

/// Turns one line of text into a record.
pub type LineParser<T> = Arc<dyn Fn(&str) -> Result<T> + Send + Sync>;

/// Parser that deserializes each line with serde_json.
pub fn json_parser<T>() -> LineParser<T>
where
    T: DeserializeOwned + 'static,
{
    Arc::new(|line: &str| Ok(serde_json::from_str(line)?))
}

enum Lookahead<T> {
    Empty,
    Line(String),
    Record(T),
}

/// Reads one record per non-blank line of a text stream.
///
/// The underlying reader is blocking, so lines are pulled on the blocking
/// pool in batches and buffered. A line is only parsed when a record or its
/// sequence number is requested, so parse failures surface from `next` or
/// `peek_sequence_number`.
pub struct JsonSource<T> {
    reader: Option<Box<dyn BufRead + Send>>,
    pending: VecDeque<String>,
    read_error: Option<io::Error>,
    lookahead: Lookahead<T>,
    parser: LineParser<T>,
}

impl<T> JsonSource<T>
where
    T: Sequenced + Send + 'static,
{
    pub fn from_reader(reader: Box<dyn BufRead + Send>, parser: LineParser<T>) -> Self {
        Self {
            reader: Some(reader),
            pending: VecDeque::new(),
            read_error: None,
            lookahead: Lookahead::Empty,
            parser,
        }
    }

    pub fn from_string(text: impl Into<String>, parser: LineParser<T>) -> Self {
        Self::from_reader(Box::new(Cursor::new(text.into())), parser)
    }

    /// Opens a local NDJSON file, gunzipping it when the name ends in `.gz`.
    pub fn open_file(path: &Path, parser: LineParser<T>) -> Result<Self> {
        debug!(path = %path.display(), "Opening NDJSON file");
        let file = File::open(path)?;
        let compressed = path
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase().ends_with(".gz"))
            .unwrap_or(false);
        let reader = open_possibly_compressed(BufReader::new(file), compressed);
        Ok(Self::from_reader(reader, parser))
    }

    /// Opens a segment previously downloaded into the local cache.
    pub fn open_cached(file: &CachedFile, parser: LineParser<T>) -> Result<Self> {
        Ok(Self::from_reader(file.open_reader()?, parser))
    }

    async fn read_ahead(&mut self) -> Result<()> {
        if !matches!(self.lookahead, Lookahead::Empty) {
            return Ok(());
        }
        if self.pending.is_empty() {
            self.fill_pending().await?;
        }
        if let Some(line) = self.pending.pop_front() {
            self.lookahead = Lookahead::Line(line);
        }
        Ok(())
    }

    /// Refills `pending` from the reader. Lines read before an I/O error are
    /// delivered first; the error is returned once they are consumed.
    async fn fill_pending(&mut self) -> Result<()> {
        if let Some(error) = self.read_error.take() {
            return Err(error.into());
        }
        let Some(mut reader) = self.reader.take() else {
            return Ok(());
        };

        let (reader, lines, result) = tokio::task::spawn_blocking(move || {
            let mut lines = Vec::new();
            let result = read_lines(reader.as_mut(), &mut lines, READ_AHEAD_LINES);
            (reader, lines, result)
        })
        .await
        .map_err(|e| RdaError::Io(io::Error::other(e)))?;

        self.pending.extend(lines);
        match result {
            Ok(true) => debug!("Reached end of NDJSON stream"),
            Ok(false) => self.reader = Some(reader),
            Err(error) => {
                self.reader = Some(reader);
                if self.pending.is_empty() {
                    return Err(error.into());
                }
                self.read_error = Some(error);
            },
        }
        Ok(())
    }

    async fn parse_ahead(&mut self) -> Result<()> {
        self.read_ahead().await?;
        if let Lookahead::Line(line) = std::mem::replace(&mut self.lookahead, Lookahead::Empty) {
            self.lookahead = Lookahead::Record((self.parser)(&line)?);
        }
        Ok(())
    }
}

/// Appends up to `max` trimmed non-blank lines to `lines`. Returns `true` at
/// end of stream.
fn read_lines(
    reader: &mut dyn BufRead,
    lines: &mut Vec<String>,
    max: usize,
) -> io::Result<bool> {
    let mut line = String::new();
    while lines.len() < max {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(true);
        }
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed.to_string());
        }
    }
    Ok(false)
}

#[async_trait]
impl<T> RecordSource<T> for JsonSource<T>
where
    T: Sequenced + Send + 'static,
{
    async fn has_more(&mut self) -> Result<bool> {
        self.read_ahead().await?;
        Ok(!matches!(self.lookahead, Lookahead::Empty))
    }

    async fn next(&mut self) -> Result<T> {
        self.parse_ahead().await?;
        match std::mem::replace(&mut self.lookahead, Lookahead::Empty) {
            Lookahead::Record(record) => Ok(record),
            _ => exhausted(),
        }
    }

    async fn peek_sequence_number(&mut self) -> Result<Option<i64>> {
        self.parse_ahead().await?;
        match &self.lookahead {
            Lookahead::Record(record) => Ok(Some(record.sequence_number())),
            _ => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.reader = None;
        self.pending.clear();
        self.read_error = None;
        self.lookahead = Lookahead::Empty;
        Ok(())
    }
}
