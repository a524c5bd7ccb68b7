//! Rendering of stored stories into display primitives.
//!
//! The renderer walks a chapter tree once: text becomes sanitized paragraphs,
//! elements keep their tag with a forced line class, and images are routed
//! through the image cache with a fallback to their original URL.

pub mod display;
pub mod renderer;
pub mod sanitize;

pub use display::{Display, to_html};
pub use renderer::{ImageResolver, ImageSignal, RenderedChapter, Renderer};
pub use bookshelf_storage::resolve_proxy_url;
pub use sanitize::{LINE_CLASS, sanitize_attributes, sanitize_text};
