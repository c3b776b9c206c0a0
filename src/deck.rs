// ABOUTME: Deck model and assembly for the html2pptx application
// ABOUTME: Turns render results into slides in the original document order

use crate::locate::DocumentRef;
use crate::render::RenderResult;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

/// Slide size applied to every slide of a deck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatio {
    /// 13.333in x 7.5in
    #[default]
    Widescreen,
    /// 10in x 7.5in
    Standard,
}

impl AspectRatio {
    /// Slide width and height in EMU
    pub fn dimensions(self) -> (u64, u64) {
        match self {
            AspectRatio::Widescreen => (12_192_000, 6_858_000),
            AspectRatio::Standard => (9_144_000, 6_858_000),
        }
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "16:9" | "wide" | "widescreen" => Ok(AspectRatio::Widescreen),
            "4:3" | "standard" => Ok(AspectRatio::Standard),
            other => Err(format!("Unsupported aspect ratio: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlideSpec {
    /// A bitmap stretched over the whole slide.
    Image { data: Vec<u8> },
    /// A title line above a block of body text.
    Text { title: String, body: String },
}

/// Ordered slides sharing one layout
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Deck {
    pub aspect: AspectRatio,
    pub slides: Vec<SlideSpec>,
}

impl Deck {
    pub fn new(aspect: AspectRatio) -> Self {
        Self {
            aspect,
            slides: Vec::new(),
        }
    }

    pub fn add_image_slide(&mut self, data: Vec<u8>) {
        self.slides.push(SlideSpec::Image { data });
    }

    pub fn add_text_slide(&mut self, title: impl Into<String>, body: impl Into<String>) {
        self.slides.push(SlideSpec::Text {
            title: title.into(),
            body: body.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }
}

/// Title of the text slide that follows a document's image slide
pub fn text_slide_title(document: &DocumentRef) -> String {
    format!("Extracted text: {}", document.name())
}

/// Build a deck from `results`, following the order of `documents`.
///
/// Documents without an image contribute no slides. A document with
/// non-empty text gets a text slide right after its image slide.
pub fn assemble_deck(
    documents: &[DocumentRef],
    results: Vec<RenderResult>,
    aspect: AspectRatio,
) -> Deck {
    let mut by_path: HashMap<PathBuf, RenderResult> = results
        .into_iter()
        .map(|result| (result.document.path.clone(), result))
        .collect();

    let mut deck = Deck::new(aspect);
    for document in documents {
        let Some(result) = by_path.remove(&document.path) else {
            warn!("No render result for {}", document.name());
            continue;
        };
        let capture = match result.outcome {
            Ok(capture) => capture,
            Err(_) => {
                debug!("Skipping {}: render failed", document.name());
                continue;
            }
        };

        deck.add_image_slide(capture.image);
        if let Some(text) = capture.text.filter(|text| !text.is_empty()) {
            deck.add_text_slide(text_slide_title(document), text);
        }
    }

    info!(
        "Assembled {} slides from {} documents",
        deck.len(),
        documents.len()
    );
    deck
}
