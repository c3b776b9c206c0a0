use html2pptx::{AspectRatio, ConvertError, Deck, DeckWriter, PptxWriter};
use image::{ImageBuffer, ImageOutputFormat, Rgb};
use std::fs;
use std::io::{Cursor, Read};
use tempfile::TempDir;
use zip::ZipArchive;

fn png(color: [u8; 3]) -> Vec<u8> {
    let img = ImageBuffer::from_fn(64, 36, |_, _| Rgb(color));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .expect("Failed to encode PNG");
    bytes
}

fn jpeg(color: [u8; 3]) -> Vec<u8> {
    let img = ImageBuffer::from_fn(64, 36, |_, _| Rgb(color));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Jpeg(90))
        .expect("Failed to encode JPEG");
    bytes
}

#[test]
fn test_save_writes_slides_in_order() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output_path = temp_dir.path().join("nested").join("output.pptx");

    let red = png([255, 0, 0]);
    let blue = jpeg([0, 0, 255]);
    let mut deck = Deck::new(AspectRatio::Widescreen);
    deck.add_image_slide(red.clone());
    deck.add_text_slide("Extracted text: 1.html", "Hello\n\nWorld");
    deck.add_image_slide(blue.clone());

    PptxWriter::new("Test Presentation")
        .save(&deck, &output_path)
        .expect("Failed to save deck");

    // Check output file exists and nothing else was left behind
    assert!(output_path.exists(), "PPTX file was not created");
    let leftovers: Vec<_> = fs::read_dir(output_path.parent().unwrap())
        .expect("Failed to list output directory")
        .filter_map(Result::ok)
        .map(|entry| entry.file_name())
        .collect();
    assert_eq!(leftovers.len(), 1, "Unexpected files: {:?}", leftovers);

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
        vec![
            "ppt/slides/slide1.xml",
            "ppt/slides/slide2.xml",
            "ppt/slides/slide3.xml"
        ]
    );

    let mut stored_red = Vec::new();
    archive
        .by_name("ppt/media/image1.png")
        .expect("Missing first image")
        .read_to_end(&mut stored_red)
        .expect("Failed to read first image");
    assert_eq!(stored_red, red);

    let mut stored_blue = Vec::new();
    archive
        .by_name("ppt/media/image2.jpeg")
        .expect("Missing second image")
        .read_to_end(&mut stored_blue)
        .expect("Failed to read second image");
    assert_eq!(stored_blue, blue);

    let mut rels = String::new();
    archive
        .by_name("ppt/slides/_rels/slide3.xml.rels")
        .expect("Missing slide 3 relationships")
        .read_to_string(&mut rels)
        .expect("Failed to read relationships");
    assert!(rels.contains("../media/image2.jpeg"));

    let mut text_slide = String::new();
    archive
        .by_name("ppt/slides/slide2.xml")
        .expect("Missing text slide")
        .read_to_string(&mut text_slide)
        .expect("Failed to read text slide");
    assert!(text_slide.contains("Extracted text: 1.html"));
    assert!(text_slide.contains("<a:t>World</a:t>"));
}

#[test]
fn test_save_replaces_existing_deck() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output_path = temp_dir.path().join("output.pptx");
    fs::write(&output_path, b"stale").expect("Failed to write stale file");

    let mut deck = Deck::new(AspectRatio::Standard);
    deck.add_image_slide(png([0, 255, 0]));
    PptxWriter::default()
        .save(&deck, &output_path)
        .expect("Failed to save deck");

    let file = fs::File::open(&output_path).expect("Failed to open PPTX file");
    let archive = ZipArchive::new(file).expect("Stale file was not replaced");
    assert!(archive.file_names().any(|name| name == "ppt/slides/slide1.xml"));
}

#[test]
fn test_save_into_unwritable_location_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let blocker = temp_dir.path().join("not-a-dir");
    fs::write(&blocker, b"file").expect("Failed to write blocker");
    let output_path = blocker.join("output.pptx");

    let deck = Deck::new(AspectRatio::Widescreen);
    let err = PptxWriter::default()
        .save(&deck, &output_path)
        .expect_err("Saving under a file must fail");

    match err {
        ConvertError::PersistFailure { path, .. } => assert_eq!(path, output_path),
        other => panic!("Expected PersistFailure, got {:?}", other),
    }
}
