use async_trait::async_trait;
use rda_common::Result;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

/// Destination for batches of records pulled by a load job.
#[async_trait]
pub trait RdaSink<T>: Send
where
    T: Send + 'static,
{
    /// Writes `batch`, returning how many records were accepted.
    async fn write_batch(&mut self, batch: Vec<T>) -> Result<usize>;

    async fn close(&mut self) -> Result<()>;
}

pub type BoxRdaSink<T> = Box<dyn RdaSink<T>>;

/// Builds a fresh sink for each job run.
#[async_trait]
pub trait SinkFactory<T>: Send + Sync
where
    T: Send + 'static,
{
    async fn create(&self) -> Result<BoxRdaSink<T>>;
}

/// Appends records to a local file, one JSON document per line.
pub struct NdjsonFileSink<T> {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    written: usize,
    _record: PhantomData<fn(T)>,
}

impl<T> NdjsonFileSink<T> {
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
            written: 0,
            _record: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

#[async_trait]
impl<T> RdaSink<T> for NdjsonFileSink<T>
where
    T: Serialize + Send + 'static,
{
    async fn write_batch(&mut self, batch: Vec<T>) -> Result<usize> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                format!("{} is closed", self.path.display()),
            )
            .into());
        };

        let mut buffer = Vec::new();
        for record in &batch {
            serde_json::to_writer(&mut buffer, record)?;
            buffer.push(b'\n');
        }
        writer.write_all(&buffer).await?;

        self.written += batch.len();
        debug!(count = batch.len(), total = self.written, "Wrote batch");
        Ok(batch.len())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().await?;
            writer.into_inner().sync_all().await?;
        }
        Ok(())
    }
}

/// Opens an [`NdjsonFileSink`] on the same path for every run.
pub struct NdjsonFileSinkFactory<T> {
    path: PathBuf,
    _record: PhantomData<fn(T)>,
}

impl<T> NdjsonFileSinkFactory<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }
}

#[async_trait]
impl<T> SinkFactory<T> for NdjsonFileSinkFactory<T>
where
    T: Serialize + Send + 'static,
{
    async fn create(&self) -> Result<BoxRdaSink<T>> {
        Ok(Box::new(NdjsonFileSink::create(&self.path).await?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_writes_lines_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/changes.ndjson");

        let mut sink = NdjsonFileSink::create(&path).await.unwrap();
        assert_eq!(sink.write_batch(vec![1, 2]).await.unwrap(), 2);
        assert_eq!(sink.write_batch(vec![3]).await.unwrap(), 1);
        assert_eq!(sink.written(), 3);
        sink.close().await.unwrap();
        sink.close().await.unwrap();

        let factory = NdjsonFileSinkFactory::<i32>::new(&path);
        let mut again = factory.create().await.unwrap();
        again.write_batch(vec![4]).await.unwrap();
        again.close().await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "1\n2\n3\n4\n");
    }

    #[tokio::test]
    async fn test_write_after_close_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = NdjsonFileSink::create(dir.path().join("x.ndjson"))
            .await
            .unwrap();
        sink.close().await.unwrap();
        assert!(sink.write_batch(vec!["late"]).await.is_err());
    }
}
