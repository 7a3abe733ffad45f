//! Process-wide bridge singleton
//!
//! The first caller builds the configured hosting strategy and runs its
//! handshake inside the once-guard; everyone else, on any thread, gets the
//! cached outcome. A failed handshake is cached as well: the hosting libraries
//! refuse a second initialization in the same process, so there is nothing to
//! retry. Nothing is ever torn down.

use crate::callable::Callable;
use crate::errors::HostingError;
use crate::native_loader::SystemLoader;
use crate::params::{HostLayout, WrapperParams};
use crate::strategy::{build_strategy, HostingStrategy};
use callbridge_config::{BridgeSettings, Protocol};
use callbridge_logger as logger;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Instant;

struct BoundBridge {
    params: WrapperParams,
    strategy: Box<dyn HostingStrategy>,
    outcome: Result<Callable, HostingError>,
}

impl BoundBridge {
    fn initialize(params: WrapperParams, mut strategy: Box<dyn HostingStrategy>) -> Self {
        let start_time = Instant::now();
        logger::debug(&format!(
            "Initializing {} bridge for {}::{} in {}",
            strategy.protocol(),
            params.type_name(),
            params.method(),
            params.assembly()
        ));

        let outcome = strategy.initialize(&params);
        match &outcome {
            Ok(callable) => logger::debug(&format!(
                "Bridge initialized in {:?} ({:?})",
                start_time.elapsed(),
                callable
            )),
            Err(e) => logger::debug(&format!(
                "Bridge initialization failed after {:?}: {}",
                start_time.elapsed(),
                e
            )),
        }

        Self {
            params,
            strategy,
            outcome,
        }
    }
}

/// At most one initialized hosting strategy
pub struct BridgeSingleton {
    cell: OnceCell<BoundBridge>,
}

impl BridgeSingleton {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// The `Callable` for `params`, running the handshake on first use.
    ///
    /// `make_strategy` is only called by the caller that wins the
    /// initialization race. Later callers get the first outcome even when
    /// their `params` differ.
    pub fn get_instance<F>(
        &self,
        params: &WrapperParams,
        make_strategy: F,
    ) -> Result<Callable, HostingError>
    where
        F: FnOnce() -> Box<dyn HostingStrategy>,
    {
        let bound = self
            .cell
            .get_or_init(|| BoundBridge::initialize(params.clone(), make_strategy()));

        if bound.params != *params {
            logger::debug(&format!(
                "Bridge already bound to {:?}; ignoring request for {:?}",
                bound.params, params
            ));
        }
        bound.outcome.clone()
    }

    /// The cached `Callable`, `NotInitialized` before a successful handshake
    pub fn get_callable(&self) -> Result<Callable, HostingError> {
        self.cell
            .get()
            .map_or(Err(HostingError::NotInitialized), |bound| {
                bound.strategy.get_callable()
            })
    }

    /// Parameters the singleton was bound with
    pub fn params(&self) -> Option<&WrapperParams> {
        self.cell.get().map(|bound| &bound.params)
    }

    pub fn protocol(&self) -> Option<Protocol> {
        self.cell.get().map(|bound| bound.strategy.protocol())
    }
}

impl Default for BridgeSingleton {
    fn default() -> Self {
        Self::new()
    }
}

static BRIDGE_INSTANCE: BridgeSingleton = BridgeSingleton::new();

/// Entry point to the process-wide bridge
pub struct Bridge;

impl Bridge {
    /// Get or initialize the bridge singleton from resolved settings
    pub fn get(settings: &BridgeSettings) -> Result<Callable, HostingError> {
        let params = WrapperParams::from(settings);
        if let Some(protocol) = BRIDGE_INSTANCE.protocol() {
            if protocol != settings.protocol {
                logger::debug(&format!(
                    "Bridge already running the {} protocol; ignoring {}",
                    protocol, settings.protocol
                ));
            }
        }
        BRIDGE_INSTANCE.get_instance(&params, || {
            build_strategy(
                settings.protocol,
                Arc::new(SystemLoader),
                HostLayout::from(settings),
            )
        })
    }

    pub fn get_callable() -> Result<Callable, HostingError> {
        BRIDGE_INSTANCE.get_callable()
    }

    pub fn active_params() -> Option<&'static WrapperParams> {
        BRIDGE_INSTANCE.params()
    }

    pub fn active_protocol() -> Option<Protocol> {
        BRIDGE_INSTANCE.protocol()
    }
}
