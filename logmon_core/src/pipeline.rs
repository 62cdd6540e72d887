use crate::{
    aggregators::{AlertAggregator, MetricsAggregator},
    channel::{event_channel, EventReceiver, EventSender},
    config::MonitorConfig,
    dispatcher::{DispatchStats, Dispatcher, Route},
    error::{MonitorError, Result},
    event::LogEvent,
    report::{AlertEvent, MetricsSummary},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Producer of log events feeding the pipeline.
#[async_trait]
pub trait EventSource: Send {
    /// Next event, or `None` once the input is exhausted.
    async fn next_event(&mut self) -> Option<LogEvent>;
}

/// Consumer draining one of the pipeline's output channels.
#[async_trait]
pub trait Sink<T: Send + 'static>: Send + 'static {
    async fn consume(&mut self, item: T) -> Result<()>;

    /// Called once after the last item.
    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub events_read: usize,
    pub events_discarded: usize,
    pub summaries_emitted: usize,
    pub alerts_emitted: usize,
    pub summaries_written: usize,
    pub alerts_written: usize,
}

/// Reader → dispatcher → {metrics, alert} → sinks, wired with event channels.
///
/// The dispatcher and both sinks run as spawned tasks; the input source is
/// driven from the caller's task. `run` returns only after every task has
/// finished, so all emitted output has reached the sinks.
pub struct Pipeline {
    config: MonitorConfig,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that aborts a running pipeline when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub async fn run<S, M, A>(
        &self,
        mut source: S,
        metrics_sink: M,
        alert_sink: A,
    ) -> Result<PipelineReport>
    where
        S: EventSource,
        M: Sink<MetricsSummary>,
        A: Sink<AlertEvent>,
    {
        self.config.validate().map_err(MonitorError::InvalidConfig)?;

        info!(
            "Starting pipeline: metrics window {}s, alert window {}s, settling delay {}s, threshold {}",
            self.config.metrics_window_secs(),
            self.config.alert_window_secs(),
            self.config.settling_delay_secs(),
            self.config.alert_threshold
        );

        let (input_tx, input_rx) = event_channel(self.cancel.clone());
        let (metrics_tx, metrics_rx) = event_channel(self.cancel.clone());
        let (alerts_tx, alerts_rx) = event_channel(self.cancel.clone());

        let dispatcher = Dispatcher::new(
            input_rx,
            Route::new(MetricsAggregator::from_config(&self.config), metrics_tx),
            Route::new(AlertAggregator::from_config(&self.config), alerts_tx),
        );

        let dispatch_task = self.spawn_worker(dispatcher.run());
        let metrics_task = self.spawn_worker(drain(metrics_rx, metrics_sink, "metrics"));
        let alert_task = self.spawn_worker(drain(alerts_rx, alert_sink, "alert"));

        let read = self.read_input(&mut source, &input_tx).await;
        input_tx.close();
        if let Err(e) = &read {
            warn!("Input reader stopped early: {}", e);
        }

        let (dispatched, metrics_written, alerts_written) =
            tokio::join!(dispatch_task, metrics_task, alert_task);
        let dispatched = joined(dispatched);
        let metrics_written = joined(metrics_written);
        let alerts_written = joined(alerts_written);

        let mut errors = Vec::new();
        let events_read = read.unwrap_or_else(|e| {
            errors.push(e);
            0
        });
        let stats = dispatched.unwrap_or_else(|e| {
            errors.push(e);
            DispatchStats::default()
        });
        let summaries_written = metrics_written.unwrap_or_else(|e| {
            errors.push(e);
            0
        });
        let alerts_written = alerts_written.unwrap_or_else(|e| {
            errors.push(e);
            0
        });

        if let Some(error) = root_cause(errors) {
            return Err(error);
        }

        let report = PipelineReport {
            events_read,
            events_discarded: stats.events_discarded,
            summaries_emitted: stats.summaries_emitted,
            alerts_emitted: stats.alerts_emitted,
            summaries_written,
            alerts_written,
        };
        info!("Pipeline drained: {:?}", report);
        Ok(report)
    }

    async fn read_input<S: EventSource>(
        &self,
        source: &mut S,
        input: &EventSender<LogEvent>,
    ) -> Result<usize> {
        let mut count = 0;
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(MonitorError::Cancelled),
                next = source.next_event() => next,
            };

            match next {
                Some(event) => {
                    input.push(event)?;
                    count += 1;
                }
                None => break,
            }
        }
        debug!("Input exhausted after {} events", count);
        Ok(count)
    }

    /// Spawns a worker that cancels the whole pipeline if it fails.
    fn spawn_worker<F, T>(&self, work: F) -> JoinHandle<Result<T>>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let result = work.await;
            if let Err(e) = &result {
                if !e.is_cancelled() {
                    cancel.cancel();
                }
            }
            result
        })
    }
}

async fn drain<T, K>(mut output: EventReceiver<T>, mut sink: K, label: &'static str) -> Result<usize>
where
    T: Send + 'static,
    K: Sink<T>,
{
    let mut written = 0;
    let result = async {
        while let Some(item) = output.read().await? {
            sink.consume(item).await?;
            written += 1;
        }
        sink.finish().await
    }
    .await;

    match result {
        Ok(()) => {
            debug!("{} sink drained {} items", label, written);
            Ok(written)
        }
        Err(e) => {
            warn!("{} sink stopped after {} items: {}", label, written, e);
            Err(e)
        }
    }
}

fn joined<T>(result: std::result::Result<Result<T>, tokio::task::JoinError>) -> Result<T> {
    result.map_err(|e| MonitorError::TaskFailed(e.to_string()))?
}

/// Picks the error that explains the others: a worker failure first, then
/// cancellation, then the closed channels they leave behind.
fn root_cause(errors: Vec<MonitorError>) -> Option<MonitorError> {
    let rank = |e: &MonitorError| match e {
        MonitorError::ChannelClosed => 2,
        MonitorError::Cancelled => 1,
        _ => 0,
    };
    errors.into_iter().min_by_key(rank)
}
