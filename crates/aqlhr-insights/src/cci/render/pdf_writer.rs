use super::png::{self, DecodedImage};
use crate::cci::exporter::RenderError;
use crate::cci::pdf::{PdfDocument, PdfElement, TextAlign, PAGE_MARGIN_PT, TABLE_ROW_HEIGHT_PT};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;
use tracing::warn;

const CELL_PADDING: f64 = 4.0;
const CELL_TEXT_SIZE: f64 = 9.0;
/// Mean Helvetica advance width as a share of the font size.
const AVERAGE_ADVANCE: f64 = 0.5;

/// Objects numbered from 1 in insertion order; ids can be reserved before
/// their body is known.
#[derive(Default)]
struct ObjectTable {
    objects: Vec<Option<Vec<u8>>>,
}

impl ObjectTable {
    fn reserve(&mut self) -> usize {
        self.objects.push(None);
        self.objects.len()
    }

    fn set(&mut self, id: usize, body: Vec<u8>) {
        self.objects[id - 1] = Some(body);
    }

    fn add(&mut self, body: Vec<u8>) -> usize {
        let id = self.reserve();
        self.set(id, body);
        id
    }

    fn finish(self, root: usize) -> Vec<u8> {
        let mut out = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
        let count = self.objects.len();
        let mut offsets = Vec::with_capacity(count);
        for (index, body) in self.objects.into_iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
            out.extend_from_slice(&body.unwrap_or_else(|| b"null".to_vec()));
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", count + 1).as_bytes());
        for offset in offsets {
            out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root {root} 0 R >>\nstartxref\n{xref}\n%%EOF\n",
                count + 1
            )
            .as_bytes(),
        );
        out
    }
}

/// Serializes the layout as a PDF 1.4 file using the standard Helvetica
/// faces. Page content streams are left uncompressed; images are deflated.
pub fn write_pdf(document: &PdfDocument) -> Result<Vec<u8>, RenderError> {
    let mut objects = ObjectTable::default();
    let catalog = objects.reserve();
    let pages = objects.reserve();
    let regular_font = objects.add(font("Helvetica"));
    let bold_font = objects.add(font("Helvetica-Bold"));

    let mut page = PageWriter {
        document,
        content: Vec::new(),
        replaced_glyphs: false,
    };
    let mut kids = Vec::with_capacity(document.pages.len());
    for layout in &document.pages {
        page.content.clear();
        let mut images = Vec::new();

        for element in &layout.elements {
            match element {
                PdfElement::Text {
                    x,
                    y,
                    size,
                    align,
                    bold,
                    content,
                } => page.text(*x, *y, *size, *align, *bold, content),
                PdfElement::Rule { y } => page.rule(*y),
                PdfElement::TableRow { y, header, cells } => page.row(*y, *header, cells),
                PdfElement::Image {
                    x,
                    y,
                    width,
                    height,
                    name,
                    png,
                } => match png::decode(png) {
                    Ok(image) => {
                        let resource = format!("Im{}", images.len() + 1);
                        let id = embed_image(&mut objects, &image)?;
                        page.image(&resource, &image, (*x, *y, *width, *height));
                        images.push((resource, id));
                    }
                    Err(err) => warn!(chart = %name, error = %err, "chart image not embedded"),
                },
            }
        }

        let contents = objects.add(stream("", &page.content));
        let xobjects = if images.is_empty() {
            String::new()
        } else {
            let entries: Vec<String> = images
                .iter()
                .map(|(resource, id)| format!("/{resource} {id} 0 R"))
                .collect();
            format!(" /XObject << {} >>", entries.join(" "))
        };
        let page_id = objects.add(
            format!(
                "<< /Type /Page /Parent {pages} 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Resources << /Font << /F1 {regular_font} 0 R /F2 {bold_font} 0 R >>{xobjects} >> \
                 /Contents {contents} 0 R >>",
                document.width, document.height
            )
            .into_bytes(),
        );
        kids.push(format!("{page_id} 0 R"));
    }

    if page.replaced_glyphs {
        warn!(
            language = document.language.code(),
            "pdf text outside the standard font repertoire was replaced"
        );
    }

    objects.set(
        pages,
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            kids.len()
        )
        .into_bytes(),
    );
    objects.set(
        catalog,
        format!("<< /Type /Catalog /Pages {pages} 0 R >>").into_bytes(),
    );
    Ok(objects.finish(catalog))
}

struct PageWriter<'a> {
    document: &'a PdfDocument,
    content: Vec<u8>,
    replaced_glyphs: bool,
}

impl PageWriter<'_> {
    /// `y` is the top of the line in layout coordinates.
    fn text(&mut self, x: f64, y: f64, size: f64, align: TextAlign, bold: bool, content: &str) {
        let width = text_width(content, size);
        let left = match align {
            TextAlign::Left => x,
            TextAlign::Center => x - width / 2.0,
            TextAlign::Right => x - width,
        };
        let baseline = self.document.height - y - size;
        self.show(if bold { "F2" } else { "F1" }, size, left, baseline, content);
    }

    fn rule(&mut self, y: f64) {
        let pdf_y = self.document.height - y;
        self.content.extend_from_slice(
            format!(
                "0.5 w {:.2} {pdf_y:.2} m {:.2} {pdf_y:.2} l S\n",
                PAGE_MARGIN_PT,
                self.document.width - PAGE_MARGIN_PT
            )
            .as_bytes(),
        );
    }

    /// Cells share the content width evenly; right-to-left documents place
    /// the first cell on the right.
    fn row(&mut self, y: f64, header: bool, cells: &[String]) {
        let content_width = self.document.width - 2.0 * PAGE_MARGIN_PT;
        let column = content_width / cells.len().max(1) as f64;
        let bottom = self.document.height - y - TABLE_ROW_HEIGHT_PT;
        if header {
            self.content.extend_from_slice(
                format!(
                    "0.92 g {:.2} {bottom:.2} {content_width:.2} {:.2} re f 0 g\n",
                    PAGE_MARGIN_PT, TABLE_ROW_HEIGHT_PT
                )
                .as_bytes(),
            );
        }

        let rtl = self.document.language.is_rtl();
        let max_chars =
            ((column - 2.0 * CELL_PADDING) / (CELL_TEXT_SIZE * AVERAGE_ADVANCE)) as usize;
        for (index, cell) in cells.iter().enumerate() {
            let text = truncate(cell, max_chars);
            let slot = if rtl { cells.len() - 1 - index } else { index };
            let cell_left = PAGE_MARGIN_PT + column * slot as f64;
            let left = if rtl {
                cell_left + column - CELL_PADDING - text_width(&text, CELL_TEXT_SIZE)
            } else {
                cell_left + CELL_PADDING
            };
            let font = if header { "F2" } else { "F1" };
            self.show(font, CELL_TEXT_SIZE, left, bottom + 5.0, &text);
        }
    }

    /// Fits the image into the box keeping its aspect ratio, top aligned
    /// and horizontally centred.
    fn image(&mut self, resource: &str, image: &DecodedImage, frame: (f64, f64, f64, f64)) {
        let (x, y, width, height) = frame;
        let scale = (width / f64::from(image.width)).min(height / f64::from(image.height));
        let drawn_width = f64::from(image.width) * scale;
        let drawn_height = f64::from(image.height) * scale;
        let left = x + (width - drawn_width) / 2.0;
        let bottom = self.document.height - y - drawn_height;
        self.content.extend_from_slice(
            format!(
                "q {drawn_width:.2} 0 0 {drawn_height:.2} {left:.2} {bottom:.2} cm /{resource} Do Q\n"
            )
            .as_bytes(),
        );
    }

    fn show(&mut self, font: &str, size: f64, left: f64, baseline: f64, text: &str) {
        let (encoded, replaced) = encode_text(text);
        self.replaced_glyphs |= replaced;
        self.content.extend_from_slice(
            format!("BT /{font} {size:.1} Tf {left:.2} {baseline:.2} Td (").as_bytes(),
        );
        self.content.extend_from_slice(&encoded);
        self.content.extend_from_slice(b") Tj ET\n");
    }
}

fn font(base: &str) -> Vec<u8> {
    format!("<< /Type /Font /Subtype /Type1 /BaseFont /{base} /Encoding /WinAnsiEncoding >>")
        .into_bytes()
}

fn stream(dictionary: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!("<< {dictionary}/Length {} >>\nstream\n", data.len()).into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(b"\nendstream");
    body
}

fn deflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

fn embed_image(objects: &mut ObjectTable, image: &DecodedImage) -> Result<usize, RenderError> {
    let smask = match &image.alpha {
        Some(alpha) => {
            let dictionary = format!(
                "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceGray \
                 /BitsPerComponent 8 /Filter /FlateDecode ",
                image.width, image.height
            );
            let id = objects.add(stream(&dictionary, &deflate(alpha)?));
            format!("/SMask {id} 0 R ")
        }
        None => String::new(),
    };
    let dictionary = format!(
        "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /{} \
         /BitsPerComponent 8 /Filter /FlateDecode {smask}",
        image.width,
        image.height,
        image.color.pdf_name()
    );
    Ok(objects.add(stream(&dictionary, &deflate(&image.pixels)?)))
}

fn text_width(text: &str, size: f64) -> f64 {
    text.chars().count() as f64 * size * AVERAGE_ADVANCE
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut shortened: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    shortened.push('…');
    shortened
}

/// WinAnsi bytes escaped for a literal string. Characters the standard
/// fonts cannot show become `?`; the flag reports whether that happened.
fn encode_text(text: &str) -> (Vec<u8>, bool) {
    let mut out = Vec::with_capacity(text.len());
    let mut replaced = false;
    for c in text.chars() {
        let byte = match c {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                c as u8
            }
            ' '..='~' => c as u8,
            '…' => 0x85,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            _ => {
                replaced = true;
                b'?'
            }
        };
        out.push(byte);
    }
    (out, replaced)
}
