//! Mapsync keeps the sources and layers of a stateful map surface in sync with a declarative
//! description of what the map should show.
//!
//! # Quick start
//!
//! ```no_run
//! use mapsync::{DesiredState, FilterControl, MemorySurface, SurfaceConfig, SyncSession};
//! use mapsync::mapsync_types::{LayerDescriptor, LayerKind, SourceDescriptor};
//!
//! let config = SurfaceConfig::builder()
//!     .with_lnglat(-111.65, 40.581)
//!     .with_zoom(11.0)
//!     .build()
//!     .unwrap();
//! let mut session = SyncSession::new(MemorySurface::new(config));
//!
//! let state = DesiredState::default()
//!     .set_sources([SourceDescriptor::geojson_url(
//!         "ski-lifts",
//!         "https://opendata.arcgis.com/datasets/51d8a963411d4356ab3fa7a24146d203_0.geojson",
//!     )
//!     .unwrap()])
//!     .set_layers([LayerDescriptor::new("ski-lifts-line", LayerKind::Line, "ski-lifts").unwrap()])
//!     .add_filter_control(
//!         FilterControl::new("ski-lifts-line", "RESORT", "Resort")
//!             .with_option("Alta Ski Area", "Alta"),
//!     );
//!
//! session.submit(state.clone());
//! session.surface_mut().load();
//! session.on_ready().unwrap();
//!
//! session.submit(state.toggle_filter_value("ski-lifts-line", "Alta Ski Area"));
//! session.flush().unwrap();
//! ```
//!
//! # Main components
//!
//! * [`DesiredState`] is an immutable snapshot of the sources, layers, filters, terrain and camera
//!   the map should have. Every update returns a new snapshot. [`DesiredStateStore`] shares the
//!   latest snapshot between the parts of an application.
//! * [`MapSurface`] is the adapter over the rendering engine that owns the actual sources and
//!   layers. [`MemorySurface`] is a headless implementation that records every operation.
//! * [`Reconciler`] compares a snapshot with what is on the surface and applies the smallest set
//!   of [operations](SurfaceOp) that makes them equal, respecting the order in which sources and
//!   layers depend on each other.
//! * [`SyncSession`] ties it together: it waits for the surface to become ready, coalesces quickly
//!   following snapshots and stops touching the surface once it is torn down.

#![warn(clippy::unwrap_used)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
mod messenger;
pub mod reconciler;
pub mod session;
pub mod store;
pub mod surface;

#[cfg(test)]
pub(crate) mod tests;

pub use config::{PreReadyCamera, SurfaceConfig, SurfaceConfigBuilder};
pub use error::SyncError;
pub use mapsync_types;
pub use messenger::{DummyMessenger, Messenger};
pub use reconciler::{ReconcileReport, Reconciler};
pub use session::SyncSession;
pub use store::{DesiredState, DesiredStateStore, FilterControl, FilterOption};
pub use surface::{MapSurface, MemorySurface, SurfaceOp};
