//! # pdf-press – template-driven HTML → PDF
//!
//! A template is filled from a JSON record ([`template`]) and the resulting
//! HTML is rendered by one of two engines ([`engine`]):
//!
//! - **Pooled** – a bounded pool of headless-browser pages ([`pool`]) driven
//!   through Chrome/Chromium ([`chrome`], feature `chrome`).
//! - **Native** – a small flow layout engine with no external process:
//!   1. **Parse** – HTML string → DOM tree ([`dom`])
//!   2. **Style** – `<style>` class rules and inline styles ([`stylesheet`], [`style`])
//!   3. **Layout** – wrap and place text, paginate onto A4 ([`layout`], [`pagination`])
//!   4. **Write** – record draw calls and encode them via printpdf ([`writer`], [`render`])

#[cfg(feature = "chrome")]
pub mod chrome;
pub mod config;
pub mod document;
pub mod dom;
pub mod engine;
pub mod error;
pub mod fonts;
pub mod layout;
pub mod pagination;
pub mod pipeline;
pub mod pool;
pub mod render;
pub mod samples;
pub mod style;
pub mod stylesheet;
pub mod template;
pub mod writer;

// Re-exports for convenience
pub use config::{PoolConfig, PrintOptions};
pub use engine::{Engine, RenderOptions, Renderer};
pub use error::{PressError, Result};
pub use pipeline::{generate_pdf, generate_pdf_from_html, PipelineConfig};
pub use pool::{spawn_signal_shutdown, PageLease, PagePool, PoolStats};
pub use template::{list_placeholders, TemplateCache};
