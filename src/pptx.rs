// ABOUTME: PPTX generation module for the html2pptx application
// ABOUTME: Serializes a deck into a PowerPoint package and writes it atomically

use crate::deck::{Deck, SlideSpec};
use crate::errors::{ConvertError, Result};
use crate::utils;
use image::ImageFormat;
use log::{info, warn};
use quick_xml::escape::escape;
use std::io::{Seek, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use zip::result::ZipResult;
use zip::{write::FileOptions, ZipWriter};

const EMU_PER_INCH: u64 = 914_400;

const NS_DECL: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_SLIDE_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
const REL_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const REL_THEME: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// Persists a finished deck
pub trait DeckWriter {
    fn save(&self, deck: &Deck, output_file: &Path) -> Result<()>;
}

/// Writes decks as `.pptx` packages
pub struct PptxWriter {
    pub title: String,
}

impl Default for PptxWriter {
    fn default() -> Self {
        Self {
            title: "Presentation".to_string(),
        }
    }
}

impl PptxWriter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

impl DeckWriter for PptxWriter {
    /// Write to a temporary file beside `output_file`, then rename it into place
    fn save(&self, deck: &Deck, output_file: &Path) -> Result<()> {
        let persist_failure = |message: String| ConvertError::PersistFailure {
            path: output_file.to_path_buf(),
            message,
        };

        utils::ensure_parent_directory_exists(output_file)
            .map_err(|e| persist_failure(e.to_string()))?;
        let dir = match output_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let tmp = NamedTempFile::new_in(dir).map_err(|e| persist_failure(e.to_string()))?;
        let tmp = write_pptx(deck, tmp, &self.title).map_err(|e| persist_failure(e.to_string()))?;
        tmp.persist(output_file)
            .map_err(|e| persist_failure(e.error.to_string()))?;

        info!("PPTX file created at {:?}", output_file);
        Ok(())
    }
}

/// Serialize `deck` as a PPTX package into `writer`
pub fn write_pptx<W: Write + Seek>(deck: &Deck, writer: W, title: &str) -> ZipResult<W> {
    let mut zip = ZipWriter::new(writer);
    let (cx, cy) = deck.aspect.dimensions();
    let slide_count = deck.slides.len();

    info!("Creating PPTX structure with {} slides", slide_count);

    zip.start_file("[Content_Types].xml", FileOptions::default())?;
    zip.write_all(content_types_xml(slide_count).as_bytes())?;

    zip.start_file("_rels/.rels", FileOptions::default())?;
    zip.write_all(ROOT_RELS.as_bytes())?;

    zip.start_file("docProps/app.xml", FileOptions::default())?;
    zip.write_all(app_xml(slide_count).as_bytes())?;

    zip.start_file("docProps/core.xml", FileOptions::default())?;
    zip.write_all(core_xml(title).as_bytes())?;

    zip.start_file("ppt/_rels/presentation.xml.rels", FileOptions::default())?;
    zip.write_all(presentation_rels_xml(slide_count).as_bytes())?;

    zip.start_file("ppt/presentation.xml", FileOptions::default())?;
    zip.write_all(presentation_xml(slide_count, cx, cy).as_bytes())?;

    zip.start_file("ppt/slideMasters/slideMaster1.xml", FileOptions::default())?;
    zip.write_all(slide_master_xml().as_bytes())?;
    zip.start_file(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        FileOptions::default(),
    )?;
    zip.write_all(
        relationships(&[
            ("rId1", REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml"),
            ("rId2", REL_THEME, "../theme/theme1.xml"),
        ])
        .as_bytes(),
    )?;

    zip.start_file("ppt/slideLayouts/slideLayout1.xml", FileOptions::default())?;
    zip.write_all(slide_layout_xml().as_bytes())?;
    zip.start_file(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        FileOptions::default(),
    )?;
    zip.write_all(
        relationships(&[("rId1", REL_SLIDE_MASTER, "../slideMasters/slideMaster1.xml")])
            .as_bytes(),
    )?;

    zip.start_file("ppt/theme/theme1.xml", FileOptions::default())?;
    zip.write_all(THEME_XML.as_bytes())?;

    let mut image_count = 0;
    for (i, slide) in deck.slides.iter().enumerate() {
        let slide_num = i + 1;
        let layout_rel = ("rId1", REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml");

        let (slide_xml, rels) = match slide {
            SlideSpec::Image { data } => {
                image_count += 1;
                let image_name = format!("image{}.{}", image_count, image_extension(data));
                zip.start_file(format!("ppt/media/{}", image_name), FileOptions::default())?;
                zip.write_all(data)?;

                let target = format!("../media/{}", image_name);
                (
                    image_slide_xml(cx, cy),
                    relationships(&[layout_rel, ("rId2", REL_IMAGE, target.as_str())]),
                )
            }
            SlideSpec::Text { title, body } => {
                (text_slide_xml(title, body, cx), relationships(&[layout_rel]))
            }
        };

        zip.start_file(
            format!("ppt/slides/_rels/slide{}.xml.rels", slide_num),
            FileOptions::default(),
        )?;
        zip.write_all(rels.as_bytes())?;

        zip.start_file(
            format!("ppt/slides/slide{}.xml", slide_num),
            FileOptions::default(),
        )?;
        zip.write_all(slide_xml.as_bytes())?;
    }

    info!("Finalizing PPTX file");
    zip.finish()
}

/// Media file extension for a captured bitmap
fn image_extension(data: &[u8]) -> &'static str {
    match image::guess_format(data) {
        Ok(ImageFormat::Png) => "png",
        Ok(ImageFormat::Jpeg) => "jpeg",
        Ok(other) => {
            warn!("Unexpected image format {:?}, storing as png", other);
            "png"
        }
        Err(e) => {
            warn!("Could not detect image format ({}), storing as png", e);
            "png"
        }
    }
}

fn relationships(entries: &[(&str, &str, &str)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
"#,
    );
    for (id, kind, target) in entries {
        xml.push_str(&format!(
            r#"    <Relationship Id="{}" Type="{}" Target="{}"/>"#,
            id, kind, target
        ));
        xml.push('\n');
    }
    xml.push_str("</Relationships>");
    xml
}

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>
    <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
    <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#;

fn content_types_xml(slide_count: usize) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="xml" ContentType="application/xml"/>
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="jpeg" ContentType="image/jpeg"/>
    <Default Extension="png" ContentType="image/png"/>
    <Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>
    <Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>
    <Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>
    <Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>
    <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
    <Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
{slides}
</Types>"#,
        slides = (1..=slide_count)
            .map(|n| format!(
                r#"    <Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
                n
            ))
            .collect::<Vec<String>>()
            .join("\n")
    )
}

fn app_xml(slide_count: usize) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
    <Application>html2pptx</Application>
    <Slides>{}</Slides>
</Properties>"#,
        slide_count
    )
}

fn core_xml(title: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
    <dc:title>{}</dc:title>
    <dc:creator>html2pptx</dc:creator>
    <dcterms:created xsi:type="dcterms:W3CDTF">{}</dcterms:created>
    <cp:revision>1</cp:revision>
</cp:coreProperties>"#,
        xml_text(title),
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
    )
}

// Master is rId1, theme rId2, slides follow from rId3
fn presentation_rels_xml(slide_count: usize) -> String {
    let targets: Vec<(String, String)> = (1..=slide_count)
        .map(|n| (format!("rId{}", n + 2), format!("slides/slide{}.xml", n)))
        .collect();
    let mut entries = vec![
        ("rId1", REL_SLIDE_MASTER, "slideMasters/slideMaster1.xml"),
        ("rId2", REL_THEME, "theme/theme1.xml"),
    ];
    entries.extend(
        targets
            .iter()
            .map(|(id, target)| (id.as_str(), REL_SLIDE, target.as_str())),
    );
    relationships(&entries)
}

fn presentation_xml(slide_count: usize, cx: u64, cy: u64) -> String {
    let slide_ids = if slide_count == 0 {
        String::new()
    } else {
        format!(
            "    <p:sldIdLst>\n{}\n    </p:sldIdLst>\n",
            (1..=slide_count)
                .map(|n| format!(r#"        <p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 2))
                .collect::<Vec<String>>()
                .join("\n")
        )
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation {ns} saveSubsetFonts="1">
    <p:sldMasterIdLst>
        <p:sldMasterId id="2147483648" r:id="rId1"/>
    </p:sldMasterIdLst>
{slide_ids}    <p:sldSz cx="{cx}" cy="{cy}"/>
    <p:notesSz cx="6858000" cy="9144000"/>
</p:presentation>"#,
        ns = NS_DECL,
        slide_ids = slide_ids,
        cx = cx,
        cy = cy
    )
}

const EMPTY_GROUP: &str = r#"<p:nvGrpSpPr>
                <p:cNvPr id="1" name=""/>
                <p:cNvGrpSpPr/>
                <p:nvPr/>
            </p:nvGrpSpPr>
            <p:grpSpPr>
                <a:xfrm>
                    <a:off x="0" y="0"/>
                    <a:ext cx="0" cy="0"/>
                    <a:chOff x="0" y="0"/>
                    <a:chExt cx="0" cy="0"/>
                </a:xfrm>
            </p:grpSpPr>"#;

fn slide_master_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster {ns}>
    <p:cSld>
        <p:spTree>
            {group}
        </p:spTree>
    </p:cSld>
    <p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>
    <p:sldLayoutIdLst>
        <p:sldLayoutId id="2147483649" r:id="rId1"/>
    </p:sldLayoutIdLst>
</p:sldMaster>"#,
        ns = NS_DECL,
        group = EMPTY_GROUP
    )
}

fn slide_layout_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout {ns} type="blank" preserve="1">
    <p:cSld name="Blank">
        <p:spTree>
            {group}
        </p:spTree>
    </p:cSld>
    <p:clrMapOvr>
        <a:masterClrMapping/>
    </p:clrMapOvr>
</p:sldLayout>"#,
        ns = NS_DECL,
        group = EMPTY_GROUP
    )
}

fn image_slide_xml(cx: u64, cy: u64) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld {ns}>
    <p:cSld>
        <p:spTree>
            {group}
            <p:pic>
                <p:nvPicPr>
                    <p:cNvPr id="2" name="Image"/>
                    <p:cNvPicPr>
                        <a:picLocks noChangeAspect="1"/>
                    </p:cNvPicPr>
                    <p:nvPr/>
                </p:nvPicPr>
                <p:blipFill>
                    <a:blip r:embed="rId2"/>
                    <a:stretch>
                        <a:fillRect/>
                    </a:stretch>
                </p:blipFill>
                <p:spPr>
                    <a:xfrm>
                        <a:off x="0" y="0"/>
                        <a:ext cx="{cx}" cy="{cy}"/>
                    </a:xfrm>
                    <a:prstGeom prst="rect">
                        <a:avLst/>
                    </a:prstGeom>
                </p:spPr>
            </p:pic>
        </p:spTree>
    </p:cSld>
    <p:clrMapOvr>
        <a:masterClrMapping/>
    </p:clrMapOvr>
</p:sld>"#,
        ns = NS_DECL,
        group = EMPTY_GROUP,
        cx = cx,
        cy = cy
    )
}

/// Escape `text` for element content, dropping characters XML 1.0 cannot carry
fn xml_text(text: &str) -> String {
    let allowed: String = text
        .chars()
        .filter(|c| match *c {
            '\t' | '\n' | '\r' => true,
            '\u{FFFE}' | '\u{FFFF}' => false,
            c => c >= '\u{20}',
        })
        .collect();
    escape(&allowed).into_owned()
}

/// One `<a:p>` per line of `text`
fn paragraphs(text: &str, size: u32, bold: bool) -> String {
    let bold_attr = if bold { r#" b="1""# } else { "" };
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                format!(r#"<a:p><a:endParaRPr lang="en-US" sz="{}"/></a:p>"#, size)
            } else {
                format!(
                    r#"<a:p><a:r><a:rPr lang="en-US" sz="{}"{} dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
                    size,
                    bold_attr,
                    xml_text(line)
                )
            }
        })
        .collect::<Vec<String>>()
        .join("\n                    ")
}

fn text_box(id: u32, name: &str, x: u64, y: u64, w: u64, h: u64, body: String) -> String {
    format!(
        r#"<p:sp>
                <p:nvSpPr>
                    <p:cNvPr id="{id}" name="{name}"/>
                    <p:cNvSpPr txBox="1"/>
                    <p:nvPr/>
                </p:nvSpPr>
                <p:spPr>
                    <a:xfrm>
                        <a:off x="{x}" y="{y}"/>
                        <a:ext cx="{w}" cy="{h}"/>
                    </a:xfrm>
                    <a:prstGeom prst="rect">
                        <a:avLst/>
                    </a:prstGeom>
                    <a:noFill/>
                </p:spPr>
                <p:txBody>
                    <a:bodyPr wrap="square" anchor="t"><a:normAutofit/></a:bodyPr>
                    <a:lstStyle/>
                    {body}
                </p:txBody>
            </p:sp>"#
    )
}

fn text_slide_xml(title: &str, body: &str, slide_cx: u64) -> String {
    let margin = EMU_PER_INCH / 2;
    // Body is 12in wide on widescreen; narrower slides keep the same margins
    let body_width = (EMU_PER_INCH * 12).min(slide_cx.saturating_sub(2 * margin));
    let title_width = (EMU_PER_INCH * 9).min(body_width);

    let title_box = text_box(
        2,
        "Title",
        margin,
        margin,
        title_width,
        margin,
        paragraphs(title, 1800, true),
    );
    let body_box = text_box(
        3,
        "Body",
        margin,
        EMU_PER_INCH * 12 / 10,
        body_width,
        EMU_PER_INCH * 11 / 2,
        paragraphs(body, 1200, false),
    );

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld {ns}>
    <p:cSld>
        <p:spTree>
            {group}
            {title_box}
            {body_box}
        </p:spTree>
    </p:cSld>
    <p:clrMapOvr>
        <a:masterClrMapping/>
    </p:clrMapOvr>
</p:sld>"#,
        ns = NS_DECL,
        group = EMPTY_GROUP,
        title_box = title_box,
        body_box = body_box
    )
}

const THEME_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme">
    <a:themeElements>
        <a:clrScheme name="Office">
            <a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>
            <a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>
            <a:dk2><a:srgbClr val="44546A"/></a:dk2>
            <a:lt2><a:srgbClr val="E7E6E6"/></a:lt2>
            <a:accent1><a:srgbClr val="4472C4"/></a:accent1>
            <a:accent2><a:srgbClr val="ED7D31"/></a:accent2>
            <a:accent3><a:srgbClr val="A5A5A5"/></a:accent3>
            <a:accent4><a:srgbClr val="FFC000"/></a:accent4>
            <a:accent5><a:srgbClr val="5B9BD5"/></a:accent5>
            <a:accent6><a:srgbClr val="70AD47"/></a:accent6>
            <a:hlink><a:srgbClr val="0563C1"/></a:hlink>
            <a:folHlink><a:srgbClr val="954F72"/></a:folHlink>
        </a:clrScheme>
        <a:fontScheme name="Office">
            <a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>
            <a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>
        </a:fontScheme>
        <a:fmtScheme name="Office">
            <a:fillStyleLst>
                <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
                <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
                <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
            </a:fillStyleLst>
            <a:lnStyleLst>
                <a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
                <a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
                <a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
            </a:lnStyleLst>
            <a:effectStyleLst>
                <a:effectStyle><a:effectLst/></a:effectStyle>
                <a:effectStyle><a:effectLst/></a:effectStyle>
                <a:effectStyle><a:effectLst/></a:effectStyle>
            </a:effectStyleLst>
            <a:bgFillStyleLst>
                <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
                <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
                <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
            </a:bgFillStyleLst>
        </a:fmtScheme>
    </a:themeElements>
</a:theme>"#;
