use super::{Emitter, Producer, ProducerSettings, generate};
use crate::Result;

/// Generates items in-process.
///
/// Every invocation draws a fresh [`ProducerPlan`](super::ProducerPlan) from
/// the configured [`ProducerSettings`], then emits the planned items one per
/// delay tick.
#[derive(Clone, Debug, Default)]
pub struct LocalProducer {
    settings: ProducerSettings,
}

impl LocalProducer {
    pub const fn new(settings: ProducerSettings) -> Self {
        Self { settings }
    }
}

impl Producer for LocalProducer {
    async fn produce(&self, source: &str, emitter: &mut Emitter) -> Result<usize> {
        let plan = self.settings.plan(source);
        tracing::debug!(
            source,
            count = plan.count,
            delay = ?plan.delay,
            "Starting local producer"
        );
        generate(&plan, emitter).await
    }
}
