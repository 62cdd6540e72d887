use crate::error::{MonitorError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// What actually travels through the queue: values, then one terminal marker.
#[derive(Debug)]
enum Message<T> {
    Value(T),
    EndOfStream,
}

/// Creates an unbounded FIFO channel whose reads abort once `cancel` fires.
pub fn event_channel<T>(cancel: CancellationToken) -> (EventSender<T>, EventReceiver<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sender = EventSender {
        tx,
        closed: Arc::new(AtomicBool::new(false)),
    };
    let receiver = EventReceiver {
        rx,
        cancel,
        finished: false,
    };
    (sender, receiver)
}

#[derive(Debug)]
pub struct EventSender<T> {
    tx: mpsc::UnboundedSender<Message<T>>,
    closed: Arc<AtomicBool>,
}

impl<T> Clone for EventSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            closed: self.closed.clone(),
        }
    }
}

impl<T> EventSender<T> {
    /// Enqueues `value` without waiting.
    pub fn push(&self, value: T) -> Result<()> {
        if self.is_closed() {
            return Err(MonitorError::ChannelClosed);
        }
        self.tx
            .send(Message::Value(value))
            .map_err(|_| MonitorError::ChannelClosed)
    }

    /// Enqueues the end-of-stream marker. Only the first call has an effect.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            // A dropped receiver has nothing left to notify.
            let _ = self.tx.send(Message::EndOfStream);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct EventReceiver<T> {
    rx: mpsc::UnboundedReceiver<Message<T>>,
    cancel: CancellationToken,
    finished: bool,
}

impl<T> EventReceiver<T> {
    /// Waits for the next value.
    ///
    /// Returns `Ok(None)` once the end-of-stream marker is reached (or every
    /// sender is gone) and `Err(MonitorError::Cancelled)` if the channel's
    /// token is cancelled first.
    pub async fn read(&mut self) -> Result<Option<T>> {
        if self.finished {
            return Ok(None);
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(MonitorError::Cancelled),
            message = self.rx.recv() => match message {
                Some(Message::Value(value)) => Ok(Some(value)),
                Some(Message::EndOfStream) | None => {
                    self.finished = true;
                    Ok(None)
                }
            },
        }
    }

    /// Reads until end of stream.
    pub async fn collect(mut self) -> Result<Vec<T>> {
        let mut values = Vec::new();
        while let Some(value) = self.read().await? {
            values.push(value);
        }
        Ok(values)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
