use html2pptx::{
    ConvertConfig, ConvertError, Deck, DeckWriter, DocumentRef, PageCapture, PageRenderer,
    Pipeline, PptxWriter, RenderError, RenderResult, SlideSpec,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use zip::ZipArchive;

/// Renderer that never touches a browser: the image is the document name
struct FakeRenderer {
    failing: HashSet<String>,
    with_text: bool,
    released: Arc<AtomicBool>,
}

impl FakeRenderer {
    fn new(failing: &[&str], with_text: bool) -> Self {
        Self {
            failing: failing.iter().map(|name| name.to_string()).collect(),
            with_text,
            released: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Drop for FakeRenderer {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

impl PageRenderer for FakeRenderer {
    async fn render(&self, document: &DocumentRef) -> RenderResult {
        // Later documents finish first
        let delay = 20u64.saturating_sub(document.ordinal * 5);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        let name = document.name();
        if self.failing.contains(&name) {
            return RenderResult::failure(
                document.clone(),
                RenderError::Navigation(format!("net::ERR_FAILED loading {}", name)),
            );
        }
        RenderResult::success(
            document.clone(),
            PageCapture {
                image: name.clone().into_bytes(),
                text: self.with_text.then(|| format!("Text of {}", name)),
            },
        )
    }
}

/// Keeps decks in memory instead of writing them
#[derive(Default)]
struct RecordingWriter {
    decks: Mutex<Vec<Deck>>,
}

impl DeckWriter for RecordingWriter {
    fn save(&self, deck: &Deck, _output_file: &Path) -> html2pptx::Result<()> {
        self.decks.lock().push(deck.clone());
        Ok(())
    }
}

struct FailingWriter;

impl DeckWriter for FailingWriter {
    fn save(&self, _deck: &Deck, output_file: &Path) -> html2pptx::Result<()> {
        Err(ConvertError::PersistFailure {
            path: output_file.to_path_buf(),
            message: "disk full".to_string(),
        })
    }
}

fn setup(names: &[&str]) -> (TempDir, ConvertConfig) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input_dir = temp_dir.path().join("inhtml");
    fs::create_dir(&input_dir).expect("Failed to create input directory");
    for name in names {
        fs::write(input_dir.join(name), "<html><body><p>hi</p></body></html>")
            .expect("Failed to write document");
    }
    let config = ConvertConfig {
        input_dir,
        output_dir: temp_dir.path().join("outppt"),
        concurrency: 2,
        ..ConvertConfig::default()
    };
    (temp_dir, config)
}

fn image_names(deck: &Deck) -> Vec<String> {
    deck.slides
        .iter()
        .filter_map(|slide| match slide {
            SlideSpec::Image { data } => Some(String::from_utf8_lossy(data).into_owned()),
            SlideSpec::Text { .. } => None,
        })
        .collect()
}

#[tokio::test]
async fn test_failed_document_is_skipped_and_order_kept() {
    let (_temp_dir, config) = setup(&["3.html", "1.html", "2.html"]);
    let writer = Arc::new(RecordingWriter::default());
    let pipeline = Pipeline::with_writer(config, SharedWriter(Arc::clone(&writer)));

    let report = pipeline
        .run_with(|_| Ok(FakeRenderer::new(&["2.html"], false)))
        .await
        .expect("Pipeline failed");

    assert_eq!(report.documents, 3);
    assert_eq!(report.rendered, 2);
    assert_eq!(report.slides, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].document, "2.html");
    assert!(report.failures[0].message.contains("ERR_FAILED"));

    let decks = writer.decks.lock();
    assert_eq!(decks.len(), 1);
    assert_eq!(image_names(&decks[0]), vec!["1.html", "3.html"]);
}

#[tokio::test]
async fn test_text_slides_follow_their_image() {
    let (_temp_dir, config) = setup(&["10.html", "2.html", "1.html"]);
    let writer = Arc::new(RecordingWriter::default());
    let pipeline = Pipeline::with_writer(config, SharedWriter(Arc::clone(&writer)));

    let report = pipeline
        .run_with(|_| Ok(FakeRenderer::new(&[], true)))
        .await
        .expect("Pipeline failed");
    assert_eq!(report.slides, 6);

    let decks = writer.decks.lock();
    let kinds: Vec<String> = decks[0]
        .slides
        .iter()
        .map(|slide| match slide {
            SlideSpec::Image { data } => format!("image {}", String::from_utf8_lossy(data)),
            SlideSpec::Text { title, .. } => format!("text {}", title),
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "image 1.html",
            "text Extracted text: 1.html",
            "image 2.html",
            "text Extracted text: 2.html",
            "image 10.html",
            "text Extracted text: 10.html",
        ]
    );
}

/// Lets a test keep a handle on the writer the pipeline owns
struct SharedWriter(Arc<RecordingWriter>);

impl DeckWriter for SharedWriter {
    fn save(&self, deck: &Deck, output_file: &Path) -> html2pptx::Result<()> {
        self.0.save(deck, output_file)
    }
}

#[tokio::test]
async fn test_repeated_runs_produce_same_slides() {
    let (_temp_dir, config) = setup(&["4.html", "1.html", "3.html", "2.html", "5.html"]);
    let writer = Arc::new(RecordingWriter::default());
    let pipeline = Pipeline::with_writer(config, SharedWriter(Arc::clone(&writer)));

    for _ in 0..2 {
        pipeline
            .run_with(|_| Ok(FakeRenderer::new(&["3.html"], true)))
            .await
            .expect("Pipeline failed");
    }

    let decks = writer.decks.lock();
    assert_eq!(decks.len(), 2);
    assert_eq!(decks[0], decks[1]);
    assert_eq!(
        image_names(&decks[0]),
        vec!["1.html", "2.html", "4.html", "5.html"]
    );
}

#[tokio::test]
async fn test_no_documents_fails_before_launch() {
    let (_temp_dir, config) = setup(&[]);
    fs::write(config.input_dir.join("readme.txt"), "not a slide").expect("Failed to write");
    let pipeline = Pipeline::with_writer(config, RecordingWriter::default());

    let launched = AtomicBool::new(false);
    let result = pipeline
        .run_with(|_| {
            launched.store(true, Ordering::SeqCst);
            Ok(FakeRenderer::new(&[], false))
        })
        .await;

    assert!(matches!(result, Err(ConvertError::NoDocumentsFound { .. })));
    assert!(!launched.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_missing_input_directory() {
    let (temp_dir, mut config) = setup(&[]);
    config.input_dir = temp_dir.path().join("does-not-exist");
    let pipeline = Pipeline::with_writer(config, RecordingWriter::default());

    let err = pipeline
        .run_with(|_| Ok(FakeRenderer::new(&[], false)))
        .await
        .expect_err("Missing directory must fail");
    assert!(matches!(err, ConvertError::InputNotFound(_)));
    assert_eq!(err.stage(), "input");
}

#[tokio::test]
async fn test_allow_empty_writes_empty_deck() {
    let (_temp_dir, mut config) = setup(&[]);
    config.allow_empty = true;
    let output_path = config.output_path();
    let pipeline = Pipeline::new(config);

    let launched = AtomicBool::new(false);
    let report = pipeline
        .run_with(|_| {
            launched.store(true, Ordering::SeqCst);
            Ok(FakeRenderer::new(&[], false))
        })
        .await
        .expect("Empty deck should be written");

    assert_eq!(report.slides, 0);
    assert!(!launched.load(Ordering::SeqCst));
    assert!(output_path.exists(), "Empty deck was not written");
}

#[tokio::test]
async fn test_persist_failure_still_releases_renderer() {
    let (_temp_dir, config) = setup(&["1.html", "2.html"]);
    let pipeline = Pipeline::with_writer(config, FailingWriter);

    let renderer = FakeRenderer::new(&[], false);
    let released = Arc::clone(&renderer.released);
    let err = pipeline
        .run_with(move |_| Ok(renderer))
        .await
        .expect_err("Writer failure must be reported");

    assert_eq!(err.stage(), "persist");
    assert!(released.load(Ordering::SeqCst), "Renderer was not released");
}

#[tokio::test]
async fn test_launch_failure_is_reported() {
    let (_temp_dir, config) = setup(&["1.html"]);
    let pipeline = Pipeline::with_writer(config, RecordingWriter::default());

    let result = pipeline
        .run_with(|_| -> html2pptx::Result<FakeRenderer> {
            Err(ConvertError::BrowserError {
                message: "no chrome".to_string(),
                source: None,
            })
        })
        .await;
    assert!(matches!(result, Err(ConvertError::BrowserError { .. })));
}

#[tokio::test]
async fn test_end_to_end_pptx_from_fake_renders() {
    let (_temp_dir, config) = setup(&["1.html", "2.html", "3.html"]);
    let output_path = config.output_path();
    let pipeline = Pipeline::with_writer(config, PptxWriter::new("Fake Deck"));

    let report = pipeline
        .run_with(|_| Ok(FakeRenderer::new(&["2.html"], false)))
        .await
        .expect("Pipeline failed");
    assert_eq!(report.slides, 2);
    assert_eq!(report.output_path, output_path);

    let file = fs::File::open(&output_path).expect("Failed to open PPTX file");
    let mut archive = ZipArchive::new(file).expect("Failed to read PPTX as ZIP");
    let mut slide_files: Vec<String> = archive
        .file_names()
        .filter(|name| name.starts_with("ppt/slides/slide") && name.ends_with(".xml"))
        .map(String::from)
        .collect();
    slide_files.sort();
    assert_eq!(
        slide_files,
        vec!["ppt/slides/slide1.xml", "ppt/slides/slide2.xml"]
    );

    let mut media = Vec::new();
    for name in ["ppt/media/image1.png", "ppt/media/image2.png"] {
        let mut entry = archive.by_name(name).expect("Missing media entry");
        let mut bytes = Vec::new();
        std::io::Read::read_to_end(&mut entry, &mut bytes).expect("Failed to read media");
        media.push(String::from_utf8_lossy(&bytes).into_owned());
    }
    assert_eq!(media, vec!["1.html", "3.html"]);
}
