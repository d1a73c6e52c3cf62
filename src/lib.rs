//! Timeline interaction and layout core for the VibeLights sequence editor.
//!
//! Everything here is derived, per-frame state over a read-only show
//! snapshot: lane packing and row virtualization, time/pixel coordinate
//! mapping, the one-active-gesture pointer state machine, the dual-clock
//! playback arbiter, and the bounded thumbnail cache. Mutations and
//! transport always go through the [`host::ShowHost`] collaborator; this
//! crate never owns show data.

pub mod commits;
pub mod controller;
pub mod error;
pub mod gesture;
pub mod groups;
pub mod host;
pub mod index;
pub mod layout;
pub mod model;
pub mod playback;
pub mod selection;
pub mod thumbs;
pub mod viewport;
