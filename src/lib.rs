//! craftdeck - game launcher
//!
//! Creates and manages local game servers, downloads server jars and mods
//! from public catalogs, and hands game launches to an external installer.

pub mod config;
pub mod fetch;
pub mod launcher;
pub mod models;
pub mod mods;
pub mod paths;
pub mod registry;
pub mod selection;
pub mod server;

pub use config::LauncherConfig;
pub use fetch::{Endpoints, FetchError, Fetcher, Progress, ProgressSink};
pub use launcher::{ExternalInstaller, GameInstaller, Launcher, LaunchError};
pub use models::{ModCatalogEntry, ServerCore, ServerRecord};
pub use mods::{ModError, ModLibrary};
pub use paths::Paths;
pub use registry::{RegistryError, ServerRegistry};
pub use selection::{SelectionContext, SelectionError};
pub use server::{ServerError, ServerLayout, ServerSpec};
