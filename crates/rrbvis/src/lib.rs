#![forbid(unsafe_code)]

//! Incremental visualization of relaxed-radix-balanced vector trees.
//!
//! A [`Session`] mounts one [`VectorVis`] per vector of a [`VectorStore`].
//! Each mutation re-reads a snapshot, and the instance animates from the old
//! picture to the new one: nodes that survive move, new nodes grow out of the
//! transition source, vanished nodes shrink into it.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use rrbvis::{MemoryStore, Session, SvgSurface, Surface, VisConfig};
//!
//! let mut session = Session::new(MemoryStore::default(), VisConfig::default());
//! let id = session.add_vector(Some(40)).unwrap();
//! let other = session.split_instance(id, 20).unwrap();
//! session.tick(Duration::from_millis(250));
//!
//! let mut svg = SvgSurface::new();
//! session.present(other, &mut svg).unwrap();
//! assert!(svg.document().starts_with("<svg"));
//! ```

pub mod color;
pub mod config;
pub mod error;
pub mod expansion;
pub mod instance;
pub mod reconcile;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod surface;
pub mod view;

pub use color::{Color, ColorTracker};
pub use config::{ConfigError, VisConfig};
pub use error::{SnapshotError, StoreError, VisError};
pub use instance::{Affordance, CellRef, Hit, SplitRequest, ToggleEvent, VectorVis};
pub use reconcile::{Reconciler, RenderReport};
pub use session::Session;
pub use snapshot::{RawSnapshot, Snapshot, TreeNode};
pub use store::{MemoryStore, VectorId, VectorStore};
pub use surface::{Frame, RecordingSurface, Surface, SvgSurface};
