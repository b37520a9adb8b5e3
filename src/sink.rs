use crate::catalog::Family;
use tokio::sync::mpsc::{
    self,
    UnboundedReceiver,
    UnboundedSender,
};

/// One gauge value of one scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub family: Family,
    pub value: f64,
    /// In the order of the family's label names.
    pub labels: Vec<String>,
}

impl Sample {
    pub fn new(family: Family, value: f64) -> Self {
        Self {
            family,
            value,
            labels: Vec::new(),
        }
    }

    pub fn with_labels<I, S>(family: Family, value: f64, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            family,
            value,
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }
}

/// Where gathering tasks write their samples. Clones feed the same receiver, so every task can hold its own.
#[derive(Debug, Clone)]
pub struct SampleSink {
    sender: UnboundedSender<Sample>,
}

impl SampleSink {
    pub fn channel() -> (Self, UnboundedReceiver<Sample>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn emit(&self, sample: Sample) {
        if let Err(e) = self.sender.send(sample) {
            debug!(family = %e.0.family, "sample dropped, nobody is reading the scrape anymore");
        }
    }
}

/// Everything that was written to the sink, once all its clones are gone.
pub async fn drain(mut receiver: UnboundedReceiver<Sample>) -> Vec<Sample> {
    let mut samples = Vec::new();
    while let Some(sample) = receiver.recv().await {
        samples.push(sample);
    }
    samples
}
