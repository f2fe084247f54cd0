//! Scratch-off reveal widget.
//!
//! A country shape is covered by a flat scratch color; pointer strokes erase
//! the cover to reveal an overlay image (a flag). Once enough of the shape is
//! revealed the widget completes the reveal on its own and notifies the host.
//!
//! The crate works on plain pixel buffers: hosts feed pointer positions and
//! frame ticks to a [`Widget`] and present the returned [`FrameBuffer`]
//! however they like.

pub mod completion;
pub mod compositor;
pub mod config;
pub mod error;
pub mod frame;
pub mod loader;
pub mod scratch;
pub mod types;
pub mod widget;

pub use config::{Config, Tuning};
pub use error::{Error, LoadError};
pub use loader::{FileFetcher, ImageFetcher, MemoryFetcher};
pub use types::{Color, DecodedImage, FrameBuffer, ScratchMask};
pub use widget::{Callbacks, Widget, WidgetState};
