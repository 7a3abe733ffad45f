//! Native runtime hosting bridge
//!
//! Loads a managed runtime's hosting library at run time and walks it through
//! one of two hosting protocols until it hands back a plain native function
//! pointer to a managed `(int, int) -> int` method:
//!
//! 1. Legacy (`coreclr_*`): explicit property table with a trusted platform
//!    assembly list, then explicit delegate creation
//! 2. Modern (`hostfxr_*`): runtime-config driven initialization, then the
//!    load-assembly runtime delegate resolves an unmanaged-callable pointer
//!
//! Both sit behind [`HostingStrategy`], and the process-wide [`Bridge`]
//! makes sure only one handshake ever runs per process.

pub mod callable;
pub mod entry_points;
pub mod errors;
mod initialization;
pub mod legacy;
pub mod modern;
pub mod native_export;
pub mod native_loader;
pub mod params;
pub mod strategy;
pub mod tpa;
pub mod utils;

#[cfg(test)]
mod testing;

pub use callable::{CalculateFn, Callable};
pub use errors::HostingError;
pub use initialization::{Bridge, BridgeSingleton};
pub use native_export::{load_export, DEFAULT_EXPORT};
pub use native_loader::{LibraryLoader, NativeLibrary, SystemLoader};
pub use params::{HostLayout, WrapperParams};
pub use strategy::{build_strategy, HostingStrategy};
