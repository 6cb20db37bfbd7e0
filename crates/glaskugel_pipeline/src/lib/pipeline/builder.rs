use std::sync::Arc;

use glaskugel_datastore::DataStore;

use crate::{
    events::EventBus,
    pipeline::{Inner, SummaryPipeline},
    summarizer::Summarizer,
    yt::VideoFetcher,
};

pub struct SummaryPipelineBuilder<D = (), F = (), S = ()> {
    store: D,
    fetcher: F,
    summarizer: S,
    bus: EventBus,
}

impl SummaryPipelineBuilder {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            store: (),
            fetcher: (),
            summarizer: (),
            bus: EventBus::default(),
        }
    }
}

impl<D, F, S> SummaryPipelineBuilder<D, F, S> {
    pub fn store<D2: DataStore + Send + Sync + 'static>(
        self,
        store: D2,
    ) -> SummaryPipelineBuilder<D2, F, S> {
        SummaryPipelineBuilder {
            store,
            fetcher: self.fetcher,
            summarizer: self.summarizer,
            bus: self.bus,
        }
    }

    pub fn fetcher<F2: VideoFetcher + Send + Sync + 'static>(
        self,
        fetcher: F2,
    ) -> SummaryPipelineBuilder<D, F2, S> {
        SummaryPipelineBuilder {
            store: self.store,
            fetcher,
            summarizer: self.summarizer,
            bus: self.bus,
        }
    }

    pub fn summarizer<S2: Summarizer + Send + Sync + 'static>(
        self,
        summarizer: S2,
    ) -> SummaryPipelineBuilder<D, F, S2> {
        SummaryPipelineBuilder {
            store: self.store,
            fetcher: self.fetcher,
            summarizer,
            bus: self.bus,
        }
    }

    /// Shares an externally owned bus instead of the default private one,
    /// so observers can subscribe before the pipeline exists.
    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.bus = bus;
        self
    }
}

impl<D, F, S> SummaryPipelineBuilder<D, F, S>
where
    D: DataStore + Send + Sync + 'static,
    F: VideoFetcher + Send + Sync + 'static,
    S: Summarizer + Send + Sync + 'static,
{
    pub fn build(self) -> SummaryPipeline<D, F, S> {
        SummaryPipeline {
            inner: Arc::new(Inner {
                store: self.store,
                fetcher: self.fetcher,
                summarizer: self.summarizer,
                bus: self.bus,
            }),
        }
    }
}
