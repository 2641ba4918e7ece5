//! Progressive loading of dashboard views.
//!
//! `ProgressiveLoader::load_view` returns three independently awaitable
//! handles (critical, secondary, background). `FetchSite` keeps per-site
//! request state with stale-while-revalidating semantics.

pub mod config;
pub mod error;
pub mod handle;
pub mod loader;
pub mod site;

pub use config::LoaderConfig;
pub use error::{LoaderError, LoaderResult};
pub use handle::WaveHandle;
pub use loader::{BackgroundData, CriticalData, ProgressiveLoader, SecondaryData, ViewLoad};
pub use site::FetchSite;
