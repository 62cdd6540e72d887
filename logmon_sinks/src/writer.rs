use crate::formats::ReportFormat;
use async_trait::async_trait;
use logmon_core::{AlertEvent, MetricsSummary, Result, Sink};
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::debug;

/// Writes rendered reports to an async writer.
///
/// Clones share the writer, so the metrics and alert outputs can target the
/// same stream; each report is written whole under the lock and never
/// interleaves with another.
pub struct WriterSink<W, F> {
    writer: Arc<Mutex<W>>,
    format: Arc<F>,
}

impl<W, F> Clone for WriterSink<W, F> {
    fn clone(&self) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
            format: Arc::clone(&self.format),
        }
    }
}

impl<W, F> WriterSink<W, F>
where
    W: AsyncWrite + Send + Unpin + 'static,
    F: ReportFormat,
{
    pub fn new(writer: W, format: F) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
            format: Arc::new(format),
        }
    }

    async fn write(&self, rendered: String) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(rendered.as_bytes()).await?;
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.writer.lock().await.flush().await?;
        debug!("Output flushed");
        Ok(())
    }
}

impl<W> WriterSink<W, crate::TextFormat>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    pub fn text(writer: W, color: bool) -> Self {
        Self::new(writer, crate::TextFormat::new().with_color(color))
    }
}

#[async_trait]
impl<W, F> Sink<MetricsSummary> for WriterSink<W, F>
where
    W: AsyncWrite + Send + Unpin + 'static,
    F: ReportFormat,
{
    async fn consume(&mut self, summary: MetricsSummary) -> Result<()> {
        let rendered = self.format.metrics(&summary)?;
        self.write(rendered).await
    }

    async fn finish(&mut self) -> Result<()> {
        self.flush().await
    }
}

#[async_trait]
impl<W, F> Sink<AlertEvent> for WriterSink<W, F>
where
    W: AsyncWrite + Send + Unpin + 'static,
    F: ReportFormat,
{
    async fn consume(&mut self, alert: AlertEvent) -> Result<()> {
        let rendered = self.format.alert(&alert)?;
        self.write(rendered).await
    }

    async fn finish(&mut self) -> Result<()> {
        self.flush().await
    }
}
