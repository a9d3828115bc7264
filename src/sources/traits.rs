use crate::engine::MetricSnapshot;
use crate::error::TransportError;
use std::future::Future;
use std::pin::Pin;

/// Capability interface over metric collectors. The watch loop never needs
/// to know which variant it holds; `Err` means "no data this tick".
pub trait MetricSource: Send + Sync {
    fn name(&self) -> &str;

    fn sample(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<MetricSnapshot, TransportError>> + Send + '_>>;
}

pub(crate) fn unavailable(source_name: &str, reason: impl Into<String>) -> TransportError {
    TransportError::SourceUnavailable {
        source_name: source_name.to_string(),
        reason: reason.into(),
    }
}
