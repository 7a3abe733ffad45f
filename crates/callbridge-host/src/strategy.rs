//! The contract shared by both hosting protocols

use crate::callable::Callable;
use crate::errors::HostingError;
use crate::legacy::LegacyBridge;
use crate::modern::ModernBridge;
use crate::native_loader::LibraryLoader;
use crate::params::{HostLayout, WrapperParams};
use callbridge_config::Protocol;
use std::sync::Arc;

/// A hosting protocol that turns a [`WrapperParams`] into a [`Callable`]
///
/// Implementations remember the outcome of their first `initialize`: calling
/// it again returns the same `Callable`, or the same error, without touching
/// the hosting library a second time.
pub trait HostingStrategy: Send + Sync {
    fn protocol(&self) -> Protocol;

    /// Run the whole handshake
    fn initialize(&mut self, params: &WrapperParams) -> Result<Callable, HostingError>;

    /// The `Callable` from a successful `initialize`, else `NotInitialized`
    fn get_callable(&self) -> Result<Callable, HostingError>;
}

/// Build the strategy for `protocol`
pub fn build_strategy(
    protocol: Protocol,
    loader: Arc<dyn LibraryLoader>,
    layout: HostLayout,
) -> Box<dyn HostingStrategy> {
    match protocol {
        Protocol::Legacy => Box::new(LegacyBridge::new(loader, layout)),
        Protocol::Modern => Box::new(ModernBridge::new(loader, layout)),
    }
}

/// Outcome memo shared by the strategies
#[derive(Debug, Default)]
pub(crate) struct Outcome(Option<Result<Callable, HostingError>>);

impl Outcome {
    /// Result of the first attempt, running `attempt` only if there was none
    pub(crate) fn get_or_run<F>(&mut self, attempt: F) -> Result<Callable, HostingError>
    where
        F: FnOnce() -> Result<Callable, HostingError>,
    {
        self.0.get_or_insert_with(attempt).clone()
    }

    pub(crate) fn callable(&self) -> Result<Callable, HostingError> {
        match self.0 {
            Some(Ok(callable)) => Ok(callable),
            _ => Err(HostingError::NotInitialized),
        }
    }
}
