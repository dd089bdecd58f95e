use super::png;
use crate::cci::exporter::RenderError;
use crate::cci::pptx::{Slide, SlideDeck, SlideVisual};
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use tracing::warn;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

const EMU_PER_INCH: f64 = 914_400.0;
const MARGIN: i64 = 457_200;
const GUTTER: i64 = 228_600;
const TITLE_TOP: i64 = 304_800;
const TITLE_HEIGHT: i64 = 914_400;
const BODY_TOP: i64 = 1_371_600;
const FOOTER_HEIGHT: i64 = 457_200;

#[derive(Debug, Clone, Copy)]
struct TextStyle {
    /// Hundredths of a point.
    size: u32,
    bold: bool,
    bordered: bool,
}

const TITLE: TextStyle = TextStyle {
    size: 2800,
    bold: true,
    bordered: false,
};
const BODY: TextStyle = TextStyle {
    size: 1600,
    bold: false,
    bordered: false,
};
const PLACEHOLDER: TextStyle = TextStyle {
    bordered: true,
    ..BODY
};
const FOOTER: TextStyle = TextStyle {
    size: 900,
    ..BODY
};

const NAMESPACES: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const GROUP_HEADER: &str = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#;

#[derive(Debug, Clone, Copy)]
struct Frame {
    x: i64,
    y: i64,
    cx: i64,
    cy: i64,
}

/// Serializes the deck as an Office Open XML presentation package with a
/// single blank layout. Chart images are stored unchanged under
/// `ppt/media/`.
pub fn write_pptx(deck: &SlideDeck) -> Result<Vec<u8>, RenderError> {
    let width = (deck.width_in * EMU_PER_INCH).round() as i64;
    let height = (deck.height_in * EMU_PER_INCH).round() as i64;
    let mut package = Package::new();

    package.add("[Content_Types].xml", content_types(deck.slides.len()).as_bytes())?;
    package.add("_rels/.rels", package_rels().as_bytes())?;
    package.add(
        "ppt/presentation.xml",
        presentation(deck.slides.len(), width, height).as_bytes(),
    )?;
    package.add(
        "ppt/_rels/presentation.xml.rels",
        presentation_rels(deck.slides.len()).as_bytes(),
    )?;
    package.add("ppt/slideMasters/slideMaster1.xml", slide_master().as_bytes())?;
    package.add(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        relationships(&[
            ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
            ("rId2", "theme", "../theme/theme1.xml"),
        ])
        .as_bytes(),
    )?;
    package.add("ppt/slideLayouts/slideLayout1.xml", slide_layout().as_bytes())?;
    package.add(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        relationships(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]).as_bytes(),
    )?;
    package.add("ppt/theme/theme1.xml", THEME.as_bytes())?;

    let mut images = 0;
    for (index, slide) in deck.slides.iter().enumerate() {
        let number = index + 1;
        let mut rels = vec![(
            "rId1".to_string(),
            "slideLayout",
            "../slideLayouts/slideLayout1.xml".to_string(),
        )];

        let picture = match &slide.visual {
            Some(SlideVisual::Image { name, png }) => match png::read_header(png) {
                Ok(header) => {
                    images += 1;
                    let target = format!("media/image{images}.png");
                    package.add(&format!("ppt/{target}"), png)?;
                    rels.push(("rId2".to_string(), "image", format!("../{target}")));
                    Some((name.as_str(), header.width, header.height))
                }
                Err(err) => {
                    warn!(chart = %name, error = %err, "chart image not embedded");
                    None
                }
            },
            _ => None,
        };

        let xml = SlideWriter {
            deck,
            width,
            height,
        }
        .write(slide, picture);
        package.add(&format!("ppt/slides/slide{number}.xml"), xml.as_bytes())?;

        let rels: Vec<(&str, &str, &str)> = rels
            .iter()
            .map(|(id, kind, target)| (id.as_str(), *kind, target.as_str()))
            .collect();
        package.add(
            &format!("ppt/slides/_rels/slide{number}.xml.rels"),
            relationships(&rels).as_bytes(),
        )?;
    }

    package.finish()
}

/// Zip container with fixed timestamps so identical decks produce identical
/// bytes.
struct Package {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: FileOptions,
}

impl Package {
    fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options: FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .last_modified_time(DateTime::default()),
        }
    }

    fn add(&mut self, name: &str, data: &[u8]) -> Result<(), RenderError> {
        self.zip.start_file(name, self.options)?;
        self.zip.write_all(data)?;
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>, RenderError> {
        Ok(self.zip.finish()?.into_inner())
    }
}

struct SlideWriter<'a> {
    deck: &'a SlideDeck,
    width: i64,
    height: i64,
}

impl SlideWriter<'_> {
    fn write(&self, slide: &Slide, picture: Option<(&str, u32, u32)>) -> String {
        let content_width = self.width - 2 * MARGIN;
        let body_height = self.height - BODY_TOP - FOOTER_HEIGHT - 2 * GUTTER;
        let half = (content_width - GUTTER) / 2;
        let rtl = self.deck.language.is_rtl();

        let (body, visual) = if slide.visual.is_some() {
            let near = MARGIN;
            let far = MARGIN + half + GUTTER;
            let (body_x, visual_x) = if rtl { (far, near) } else { (near, far) };
            (
                Frame {
                    x: body_x,
                    y: BODY_TOP,
                    cx: half,
                    cy: body_height,
                },
                Some(Frame {
                    x: visual_x,
                    y: BODY_TOP,
                    cx: half,
                    cy: body_height,
                }),
            )
        } else {
            (
                Frame {
                    x: MARGIN,
                    y: BODY_TOP,
                    cx: content_width,
                    cy: body_height,
                },
                None,
            )
        };

        let mut shapes = String::new();
        let title = Frame {
            x: MARGIN,
            y: TITLE_TOP,
            cx: content_width,
            cy: TITLE_HEIGHT,
        };
        shapes.push_str(&self.text_box(2, "Title", title, &[slide.title.as_str()], TITLE));
        let lines: Vec<&str> = slide.body.iter().map(String::as_str).collect();
        shapes.push_str(&self.text_box(3, "Body", body, &lines, BODY));

        if let Some(frame) = visual {
            let shape = match (&slide.visual, picture) {
                (_, Some((name, image_width, image_height))) => {
                    picture_shape(4, name, fit(frame, image_width, image_height))
                }
                (Some(SlideVisual::Placeholder { text: label }), None)
                | (Some(SlideVisual::Image { name: label, .. }), None) => {
                    self.text_box(4, "Chart", frame, &[label.as_str()], PLACEHOLDER)
                }
                (None, None) => String::new(),
            };
            shapes.push_str(&shape);
        }

        let footer = Frame {
            x: MARGIN,
            y: self.height - FOOTER_HEIGHT - GUTTER,
            cx: content_width,
            cy: FOOTER_HEIGHT,
        };
        shapes.push_str(&self.text_box(5, "Footer", footer, &[slide.footer.as_str()], FOOTER));

        format!(
            "{XML_DECLARATION}<p:sld {NAMESPACES}><p:cSld><p:spTree>{GROUP_HEADER}{shapes}</p:spTree></p:cSld>\
             <p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"
        )
    }

    fn text_box(
        &self,
        id: u32,
        name: &str,
        frame: Frame,
        lines: &[&str],
        style: TextStyle,
    ) -> String {
        let language = self.deck.language;
        let paragraph_props = if language.is_rtl() {
            r#"<a:pPr algn="r" rtl="1"/>"#
        } else {
            ""
        };
        let run_lang = if language.is_rtl() { "ar-SA" } else { "en-US" };
        let size = style.size;
        let bold = if style.bold { r#" b="1""# } else { "" };

        let mut paragraphs = String::new();
        for line in lines {
            let _ = write!(
                paragraphs,
                r#"<a:p>{paragraph_props}<a:r><a:rPr lang="{run_lang}" sz="{size}"{bold} dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
                escape(line)
            );
        }
        if paragraphs.is_empty() {
            paragraphs.push_str("<a:p/>");
        }

        let outline = if style.bordered {
            r#"<a:ln w="12700"><a:solidFill><a:srgbClr val="A6A6A6"/></a:solidFill><a:prstDash val="dash"/></a:ln>"#
        } else {
            ""
        };
        format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/>{outline}</p:spPr><p:txBody><a:bodyPr wrap="square" rtlCol="0"><a:normAutofit/></a:bodyPr><a:lstStyle/>{paragraphs}</p:txBody></p:sp>"#,
            transform(frame)
        )
    }
}

fn picture_shape(id: u32, name: &str, frame: Frame) -> String {
    format!(
        r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="{}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId2"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#,
        escape(name),
        transform(frame)
    )
}

fn transform(frame: Frame) -> String {
    format!(
        r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        frame.x, frame.y, frame.cx, frame.cy
    )
}

/// Largest box of the image's aspect ratio inside `frame`, centred.
fn fit(frame: Frame, image_width: u32, image_height: u32) -> Frame {
    let scale = (frame.cx as f64 / f64::from(image_width))
        .min(frame.cy as f64 / f64::from(image_height));
    let cx = (f64::from(image_width) * scale).round() as i64;
    let cy = (f64::from(image_height) * scale).round() as i64;
    Frame {
        x: frame.x + (frame.cx - cx) / 2,
        y: frame.y + (frame.cy - cy) / 2,
        cx,
        cy,
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if c.is_control() && c != '\t' => {}
            c => out.push(c),
        }
    }
    out
}

fn relationships(entries: &[(&str, &str, &str)]) -> String {
    let mut out = format!("{XML_DECLARATION}<Relationships xmlns=\"{RELATIONSHIPS_NS}\">");
    for (id, kind, target) in entries {
        let _ = write!(
            out,
            r#"<Relationship Id="{id}" Type="{REL_TYPE}/{kind}" Target="{target}"/>"#
        );
    }
    out.push_str("</Relationships>");
    out
}

fn package_rels() -> String {
    relationships(&[("rId1", "officeDocument", "ppt/presentation.xml")])
}

fn content_types(slides: usize) -> String {
    const PML: &str = "application/vnd.openxmlformats-officedocument.presentationml";
    let mut out = format!(
        "{XML_DECLARATION}<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
         <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
         <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
         <Default Extension=\"png\" ContentType=\"image/png\"/>\
         <Override PartName=\"/ppt/presentation.xml\" ContentType=\"{PML}.presentation.main+xml\"/>\
         <Override PartName=\"/ppt/slideMasters/slideMaster1.xml\" ContentType=\"{PML}.slideMaster+xml\"/>\
         <Override PartName=\"/ppt/slideLayouts/slideLayout1.xml\" ContentType=\"{PML}.slideLayout+xml\"/>\
         <Override PartName=\"/ppt/theme/theme1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.theme+xml\"/>"
    );
    for number in 1..=slides {
        let _ = write!(
            out,
            "<Override PartName=\"/ppt/slides/slide{number}.xml\" ContentType=\"{PML}.slide+xml\"/>"
        );
    }
    out.push_str("</Types>");
    out
}

fn presentation(slides: usize, width: i64, height: i64) -> String {
    let mut ids = String::new();
    for index in 0..slides {
        let _ = write!(ids, r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + index, index + 3);
    }
    format!(
        "{XML_DECLARATION}<p:presentation {NAMESPACES} saveSubsetFonts=\"1\">\
         <p:sldMasterIdLst><p:sldMasterId id=\"2147483648\" r:id=\"rId1\"/></p:sldMasterIdLst>\
         <p:sldIdLst>{ids}</p:sldIdLst><p:sldSz cx=\"{width}\" cy=\"{height}\"/>\
         <p:notesSz cx=\"6858000\" cy=\"9144000\"/></p:presentation>"
    )
}

fn presentation_rels(slides: usize) -> String {
    let targets: Vec<String> = (1..=slides).map(|n| format!("slides/slide{n}.xml")).collect();
    let ids: Vec<String> = (0..slides).map(|index| format!("rId{}", index + 3)).collect();
    let mut entries = vec![
        ("rId1", "slideMaster", "slideMasters/slideMaster1.xml"),
        ("rId2", "theme", "theme/theme1.xml"),
    ];
    for (id, target) in ids.iter().zip(&targets) {
        entries.push((id.as_str(), "slide", target.as_str()));
    }
    relationships(&entries)
}

fn slide_master() -> String {
    format!(
        "{XML_DECLARATION}<p:sldMaster {NAMESPACES}><p:cSld><p:spTree>{GROUP_HEADER}</p:spTree></p:cSld>\
         <p:clrMap bg1=\"lt1\" tx1=\"dk1\" bg2=\"lt2\" tx2=\"dk2\" accent1=\"accent1\" accent2=\"accent2\" \
         accent3=\"accent3\" accent4=\"accent4\" accent5=\"accent5\" accent6=\"accent6\" hlink=\"hlink\" \
         folHlink=\"folHlink\"/>\
         <p:sldLayoutIdLst><p:sldLayoutId id=\"2147483649\" r:id=\"rId1\"/></p:sldLayoutIdLst></p:sldMaster>"
    )
}

fn slide_layout() -> String {
    format!(
        "{XML_DECLARATION}<p:sldLayout {NAMESPACES} type=\"blank\" preserve=\"1\">\
         <p:cSld name=\"Blank\"><p:spTree>{GROUP_HEADER}</p:spTree></p:cSld>\
         <p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"
    )
}

const THEME: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="AqlHR"><a:themeElements>"#,
    r#"<a:clrScheme name="AqlHR">"#,
    r#"<a:dk1><a:srgbClr val="000000"/></a:dk1><a:lt1><a:srgbClr val="FFFFFF"/></a:lt1>"#,
    r#"<a:dk2><a:srgbClr val="1F2937"/></a:dk2><a:lt2><a:srgbClr val="F3F4F6"/></a:lt2>"#,
    r#"<a:accent1><a:srgbClr val="0F766E"/></a:accent1><a:accent2><a:srgbClr val="2563EB"/></a:accent2>"#,
    r#"<a:accent3><a:srgbClr val="D97706"/></a:accent3><a:accent4><a:srgbClr val="DC2626"/></a:accent4>"#,
    r#"<a:accent5><a:srgbClr val="7C3AED"/></a:accent5><a:accent6><a:srgbClr val="059669"/></a:accent6>"#,
    r#"<a:hlink><a:srgbClr val="2563EB"/></a:hlink><a:folHlink><a:srgbClr val="7C3AED"/></a:folHlink>"#,
    r#"</a:clrScheme>"#,
    r#"<a:fontScheme name="AqlHR">"#,
    r#"<a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface="Arial"/></a:majorFont>"#,
    r#"<a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface="Arial"/></a:minorFont>"#,
    r#"</a:fontScheme>"#,
    r#"<a:fmtScheme name="AqlHR"><a:fillStyleLst>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"</a:fillStyleLst><a:lnStyleLst>"#,
    r#"<a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"<a:ln w="25400"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"<a:ln w="38100"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"</a:lnStyleLst><a:effectStyleLst>"#,
    r#"<a:effectStyle><a:effectLst/></a:effectStyle>"#,
    r#"<a:effectStyle><a:effectLst/></a:effectStyle>"#,
    r#"<a:effectStyle><a:effectLst/></a:effectStyle>"#,
    r#"</a:effectStyleLst><a:bgFillStyleLst>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"</a:bgFillStyleLst></a:fmtScheme>"#,
    r#"</a:themeElements></a:theme>"#,
);
