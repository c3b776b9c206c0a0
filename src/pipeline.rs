// ABOUTME: Pipeline driver for the html2pptx application
// ABOUTME: Locates documents, renders them with bounded concurrency, assembles and writes the deck

use crate::config::{ConvertConfig, RenderConfig};
use crate::deck::{assemble_deck, Deck};
use crate::errors::{ConvertError, Result};
use crate::locate::{locate_documents, DocumentRef};
use crate::pool::render_all;
use crate::pptx::{DeckWriter, PptxWriter};
use crate::render::{ChromeEngine, PageRenderer};
use crate::utils;
use log::{info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A document that produced no slides, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFailure {
    pub document: String,
    pub message: String,
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct ConversionReport {
    pub output_path: PathBuf,
    pub documents: usize,
    pub rendered: usize,
    /// In document order.
    pub failures: Vec<DocumentFailure>,
    pub slides: usize,
}

/// One conversion run: input directory in, deck file out
pub struct Pipeline<W: DeckWriter = PptxWriter> {
    config: ConvertConfig,
    writer: W,
}

impl Pipeline<PptxWriter> {
    pub fn new(config: ConvertConfig) -> Self {
        let writer = PptxWriter::new(config.title.clone());
        Self { config, writer }
    }

    /// Run the conversion with a headless Chrome renderer
    pub async fn run(&self) -> Result<ConversionReport> {
        self.run_with(ChromeEngine::launch).await
    }
}

impl<W: DeckWriter> Pipeline<W> {
    pub fn with_writer(config: ConvertConfig, writer: W) -> Self {
        Self { config, writer }
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Run the conversion with the renderer produced by `launch`.
    ///
    /// `launch` is only called once documents have been found. The renderer
    /// is dropped before this returns, whether or not the deck was written.
    pub async fn run_with<R, L>(&self, launch: L) -> Result<ConversionReport>
    where
        R: PageRenderer,
        L: FnOnce(&RenderConfig) -> Result<R>,
    {
        self.config.validate()?;
        let output_path = self.config.output_path();
        info!("Input directory: {:?}", self.config.input_dir);
        info!("Output file: {:?}", output_path);

        let documents = locate_documents(&self.config.input_dir, &self.config.extension)?;
        if documents.is_empty() {
            if !self.config.allow_empty {
                return Err(ConvertError::NoDocumentsFound {
                    dir: self.config.input_dir.clone(),
                    extension: self.config.extension.clone(),
                });
            }
            warn!("No documents found, writing an empty deck");
            self.persist(&Deck::new(self.config.aspect), &output_path)?;
            return Ok(ConversionReport {
                output_path,
                documents: 0,
                rendered: 0,
                failures: Vec::new(),
                slides: 0,
            });
        }

        utils::ensure_directory_exists(&self.config.output_dir).map_err(|e| {
            ConvertError::PersistFailure {
                path: output_path.clone(),
                message: e.to_string(),
            }
        })?;

        let renderer = launch(&self.config.render)?;
        let outcome = self.convert(&renderer, &documents, &output_path).await;
        drop(renderer);
        outcome
    }

    async fn convert<R: PageRenderer>(
        &self,
        renderer: &R,
        documents: &[DocumentRef],
        output_path: &Path,
    ) -> Result<ConversionReport> {
        let results = render_all(renderer, documents, self.config.concurrency).await;

        let position: HashMap<&Path, usize> = documents
            .iter()
            .enumerate()
            .map(|(i, document)| (document.path.as_path(), i))
            .collect();
        let mut failed: Vec<(usize, DocumentFailure)> = results
            .iter()
            .filter_map(|result| {
                result.error().map(|e| {
                    let index = position
                        .get(result.document.path.as_path())
                        .copied()
                        .unwrap_or(usize::MAX);
                    let failure = DocumentFailure {
                        document: result.document.name(),
                        message: e.to_string(),
                    };
                    (index, failure)
                })
            })
            .collect();
        failed.sort_by_key(|(index, _)| *index);
        let failures: Vec<DocumentFailure> = failed.into_iter().map(|(_, f)| f).collect();
        let rendered = results.len() - failures.len();

        info!("Assembling deck");
        let deck = assemble_deck(documents, results, self.config.aspect);
        self.persist(&deck, output_path)?;

        Ok(ConversionReport {
            output_path: output_path.to_path_buf(),
            documents: documents.len(),
            rendered,
            failures,
            slides: deck.len(),
        })
    }

    fn persist(&self, deck: &Deck, output_path: &Path) -> Result<()> {
        info!("Writing {} slides to {:?}", deck.len(), output_path);
        self.writer.save(deck, output_path)
    }
}
