//! Feature sources
//!
//! A `FeatureReader` opens the source of one dataset and hands back a
//! `FeatureStream`. The stream is pull-based: the reader runs on tokio's
//! blocking pool and is parked on a bounded channel until the consumer asks
//! for the next feature.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{GeomongoError, Result};
use crate::models::{DatasetDescriptor, Feature};

pub mod shapefile;

pub use self::shapefile::ShapefileFeatureReader;

/// Opens the feature source of a dataset
pub trait FeatureReader: Send + Sync {
    /// Open the dataset and start streaming its features
    fn open(&self, dataset: &DatasetDescriptor) -> Result<FeatureStream>;

    /// Get human-readable format name (e.g., "Shapefile")
    fn format_name(&self) -> &str;
}

/// Producer side of a `FeatureStream`
pub struct FeatureSink {
    sender: mpsc::Sender<Result<Feature>>,
}

impl FeatureSink {
    /// Hand one item to the consumer, blocking until it has room.
    ///
    /// Returns `false` once the consumer is gone.
    pub fn send(&self, item: Result<Feature>) -> bool {
        self.sender.blocking_send(item).is_ok()
    }
}

/// Lazy, finite sequence of features
///
/// Once exhausted it stays exhausted.
pub struct FeatureStream {
    receiver: mpsc::Receiver<Result<Feature>>,
    producer: Option<JoinHandle<()>>,
    exhausted: bool,
}

impl FeatureStream {
    /// Run `produce` on the blocking pool and stream what it sends
    pub fn from_blocking<F>(produce: F) -> Self
    where
        F: FnOnce(FeatureSink) + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(1);
        let producer = tokio::task::spawn_blocking(move || produce(FeatureSink { sender }));

        Self {
            receiver,
            producer: Some(producer),
            exhausted: false,
        }
    }

    /// Stream a fixed list of items
    pub fn from_items(items: Vec<Result<Feature>>) -> Self {
        Self::from_blocking(move |sink| {
            for item in items {
                if !sink.send(item) {
                    break;
                }
            }
        })
    }

    /// Pull the next feature; `None` once the source is exhausted
    pub async fn next(&mut self) -> Option<Result<Feature>> {
        if self.exhausted {
            return None;
        }

        if let Some(item) = self.receiver.recv().await {
            return Some(item);
        }

        self.exhausted = true;
        // A producer that died early must not look like a clean end of data
        match self.producer.take()?.await {
            Ok(()) => None,
            Err(e) => Some(Err(GeomongoError::FormatError {
                format: "stream".to_string(),
                message: format!("Feature reader stopped unexpectedly: {}", e),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stream_yields_items_in_order_then_stays_exhausted() {
        let mut stream = FeatureStream::from_items(vec![
            Ok(Feature::new(1, None)),
            Ok(Feature::new(2, None)),
        ]);

        assert_eq!(stream.next().await.unwrap().unwrap().id, 1);
        assert_eq!(stream.next().await.unwrap().unwrap().id, 2);
        assert!(stream.next().await.is_none());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_empty_stream() {
        let mut stream = FeatureStream::from_items(Vec::new());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_panicking_producer_surfaces_error() {
        let mut stream = FeatureStream::from_blocking(|sink| {
            sink.send(Ok(Feature::new(1, None)));
            panic!("corrupt file");
        });

        assert!(stream.next().await.unwrap().is_ok());
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(!err.is_record_level());
        assert!(stream.next().await.is_none());
    }
}
