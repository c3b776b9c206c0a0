// ABOUTME: Library module for the html2pptx program.
// ABOUTME: Renders a numbered folder of HTML documents into a PowerPoint deck of screenshot and text slides.

// Reexport modules
pub mod config;
pub mod deck;
pub mod errors;
pub mod locate;
pub mod pipeline;
pub mod pool;
pub mod pptx;
pub mod render;
pub mod utils;

// Reexport common types and functions
pub use config::{Config, ConvertConfig, RenderConfig};
pub use deck::{assemble_deck, AspectRatio, Deck, SlideSpec};
pub use errors::{ConvertError, RenderError, Result};
pub use locate::{locate_documents, DocumentRef};
pub use pipeline::{ConversionReport, DocumentFailure, Pipeline};
pub use pool::{render_all, TaskQueue};
pub use pptx::{write_pptx, DeckWriter, PptxWriter};
pub use render::{compose_text, ChromeEngine, PageCapture, PageRenderer, RenderResult};
