use crate::{
    aggregators::{AlertAggregator, MetricsAggregator, WindowAggregator},
    channel::{EventReceiver, EventSender},
    error::Result,
    event::LogEvent,
};
use tracing::{debug, info, warn};

/// An aggregator paired with the channel its results are pushed to.
pub struct Route<A: WindowAggregator> {
    aggregator: A,
    output: EventSender<A::Output>,
    emitted: usize,
}

impl<A: WindowAggregator> Route<A> {
    pub fn new(aggregator: A, output: EventSender<A::Output>) -> Self {
        Self {
            aggregator,
            output,
            emitted: 0,
        }
    }

    fn forward(&mut self, event: &LogEvent) -> Result<()> {
        for result in self.aggregator.ingest(event) {
            self.output.push(result)?;
            self.emitted += 1;
        }
        Ok(())
    }

    fn close(&self) {
        debug!(
            "Closing {} output ({} timestamps still buffered)",
            self.aggregator.name(),
            self.aggregator.buffered_timestamps()
        );
        self.output.close();
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub events_received: usize,
    pub events_discarded: usize,
    pub summaries_emitted: usize,
    pub alerts_emitted: usize,
}

/// Fans every input event out to the metrics and alert aggregators, in input
/// order, and closes both output channels once the input is exhausted.
pub struct Dispatcher {
    input: EventReceiver<LogEvent>,
    metrics: Route<MetricsAggregator>,
    alerts: Route<AlertAggregator>,
}

impl Dispatcher {
    pub fn new(
        input: EventReceiver<LogEvent>,
        metrics: Route<MetricsAggregator>,
        alerts: Route<AlertAggregator>,
    ) -> Self {
        Self {
            input,
            metrics,
            alerts,
        }
    }

    pub async fn run(mut self) -> Result<DispatchStats> {
        let result = self.dispatch().await;

        // Sinks must see end of stream whatever happened upstream.
        self.metrics.close();
        self.alerts.close();

        match &result {
            Ok(stats) => info!(
                "Dispatcher finished: {} events, {} summaries, {} alerts",
                stats.events_received, stats.summaries_emitted, stats.alerts_emitted
            ),
            Err(e) => warn!("Dispatcher stopped early: {}", e),
        }

        result
    }

    async fn dispatch(&mut self) -> Result<DispatchStats> {
        let mut stats = DispatchStats::default();

        while let Some(event) = self.input.read().await? {
            stats.events_received += 1;
            if !event.is_valid() {
                stats.events_discarded += 1;
                continue;
            }

            self.metrics.forward(&event)?;
            self.alerts.forward(&event)?;
        }

        stats.summaries_emitted = self.metrics.emitted;
        stats.alerts_emitted = self.alerts.emitted;
        Ok(stats)
    }
}
