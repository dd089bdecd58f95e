use super::domain::{sanitize_label, ChartSet, CciOverview, ExportScope, Initiative, Language};
use super::locale::{disclaimer, format_score, labels, MISSING_SCORE};
use tracing::warn;

/// A4 portrait in points.
pub const A4_WIDTH_PT: f64 = 595.28;
pub const A4_HEIGHT_PT: f64 = 841.89;

/// Left, right and top page margin.
pub const PAGE_MARGIN_PT: f64 = 40.0;
pub const TABLE_ROW_HEIGHT_PT: f64 = 18.0;

const FOOTER_HEIGHT: f64 = 48.0;
const CHART_HEIGHT: f64 = 260.0;
const MAX_CHARTS: usize = 2;
const MAX_INITIATIVES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PdfElement {
    Text {
        x: f64,
        y: f64,
        size: f64,
        align: TextAlign,
        bold: bool,
        content: String,
    },
    Image {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        name: String,
        png: Vec<u8>,
    },
    TableRow {
        y: f64,
        header: bool,
        cells: Vec<String>,
    },
    Rule {
        y: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfPage {
    pub number: usize,
    pub elements: Vec<PdfElement>,
}

/// Positioned content of the report; origin top-left, y grows downward.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfDocument {
    pub width: f64,
    pub height: f64,
    pub language: Language,
    pub pages: Vec<PdfPage>,
}

impl PdfDocument {
    pub fn elements(&self) -> impl Iterator<Item = &PdfElement> {
        self.pages.iter().flat_map(|page| page.elements.iter())
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.elements().filter_map(|element| match element {
            PdfElement::Text { content, .. } => Some(content.as_str()),
            _ => None,
        })
    }
}

pub fn pdf_filename(brand: &str, scope: &ExportScope) -> String {
    format!(
        "{brand}_CCI_{}_Wave_{}_{}.pdf",
        sanitize_label(scope.tenant_id.as_str()),
        scope.wave_no,
        scope.as_of.format("%Y%m%d")
    )
}

struct Cursor {
    language: Language,
    pages: Vec<PdfPage>,
    y: f64,
}

impl Cursor {
    fn new(language: Language) -> Self {
        Self {
            language,
            pages: vec![PdfPage {
                number: 1,
                elements: Vec::new(),
            }],
            y: PAGE_MARGIN_PT,
        }
    }

    /// Starts a new page when `height` more points would run into the footer.
    fn reserve(&mut self, height: f64) {
        if self.y + height > A4_HEIGHT_PT - FOOTER_HEIGHT {
            let number = self.pages.len() + 1;
            self.pages.push(PdfPage {
                number,
                elements: Vec::new(),
            });
            self.y = PAGE_MARGIN_PT;
        }
    }

    fn push(&mut self, element: PdfElement) {
        if let Some(page) = self.pages.last_mut() {
            page.elements.push(element);
        }
    }

    fn line(&mut self, content: String, size: f64, bold: bool) {
        let height = size * 1.4;
        self.reserve(height);
        let (x, align) = if self.language.is_rtl() {
            (A4_WIDTH_PT - PAGE_MARGIN_PT, TextAlign::Right)
        } else {
            (PAGE_MARGIN_PT, TextAlign::Left)
        };
        self.push(PdfElement::Text {
            x,
            y: self.y,
            size,
            align,
            bold,
            content,
        });
        self.y += height;
    }

    fn row(&mut self, cells: Vec<String>, header: bool) {
        self.reserve(TABLE_ROW_HEIGHT_PT);
        self.push(PdfElement::TableRow {
            y: self.y,
            header,
            cells,
        });
        self.y += TABLE_ROW_HEIGHT_PT;
    }

    fn gap(&mut self, height: f64) {
        self.y += height;
    }
}

/// Lays out the one-language report. Charts that are not valid PNG data are
/// skipped with a warning.
pub fn layout_pdf(
    brand: &str,
    scope: &ExportScope,
    overview: &CciOverview,
    initiatives: &[Initiative],
    charts: &ChartSet,
    language: Language,
) -> PdfDocument {
    let text = labels(language);
    let overview = overview.redacted();
    let mut cursor = Cursor::new(language);

    cursor.line(format!("{brand} · {}", text.report_title), 18.0, true);
    cursor.line(format!("{}: {}", text.survey, scope.survey_name), 11.0, false);
    cursor.line(format!("{}: {}", text.wave, scope.wave_label), 11.0, false);
    cursor.line(format!("{}: {}", text.as_of, scope.as_of), 11.0, false);
    cursor.reserve(8.0);
    cursor.push(PdfElement::Rule { y: cursor.y });
    cursor.gap(12.0);

    cursor.row(
        vec![
            text.balance_score.to_string(),
            text.risk_index.to_string(),
            text.psych_safety.to_string(),
            text.values_alignment.to_string(),
        ],
        true,
    );
    cursor.row(
        vec![
            format_score(overview.balance_score),
            format_score(overview.risk_index),
            format_score(overview.psych_safety),
            format_score(overview.values_alignment()),
        ],
        false,
    );
    if overview.is_suppressed() {
        cursor.line(text.suppressed_notice.to_string(), 9.0, false);
    }
    cursor.gap(12.0);

    for chart in charts.iter().take(MAX_CHARTS) {
        if !chart.is_png() {
            warn!(chart = %chart.name, "skipping chart that is not PNG data");
            continue;
        }
        cursor.reserve(CHART_HEIGHT);
        cursor.push(PdfElement::Image {
            x: PAGE_MARGIN_PT,
            y: cursor.y,
            width: A4_WIDTH_PT - 2.0 * PAGE_MARGIN_PT,
            height: CHART_HEIGHT,
            name: chart.name.clone(),
            png: chart.png.clone(),
        });
        cursor.gap(CHART_HEIGHT + 12.0);
    }

    cursor.line(text.initiatives.to_string(), 13.0, true);
    cursor.row(
        vec![
            text.title.to_string(),
            text.owner.to_string(),
            text.priority.to_string(),
        ],
        true,
    );
    if initiatives.is_empty() {
        cursor.line(text.no_initiatives.to_string(), 10.0, false);
    }
    for initiative in initiatives.iter().take(MAX_INITIATIVES) {
        cursor.row(
            vec![
                initiative.title.clone(),
                initiative
                    .owner
                    .clone()
                    .unwrap_or_else(|| MISSING_SCORE.to_string()),
                initiative.priority.clone(),
            ],
            false,
        );
    }

    let mut pages = cursor.pages;
    let total = pages.len();
    let footer = disclaimer(language);
    for page in &mut pages {
        let mut y = A4_HEIGHT_PT - FOOTER_HEIGHT + 8.0;
        for line in footer {
            page.elements.push(PdfElement::Text {
                x: A4_WIDTH_PT / 2.0,
                y,
                size: 7.0,
                align: TextAlign::Center,
                bold: false,
                content: (*line).to_string(),
            });
            y += 10.0;
        }
        page.elements.push(PdfElement::Text {
            x: A4_WIDTH_PT / 2.0,
            y,
            size: 7.0,
            align: TextAlign::Center,
            bold: false,
            content: format!("{} {} / {}", text.page, page.number, total),
        });
    }

    PdfDocument {
        width: A4_WIDTH_PT,
        height: A4_HEIGHT_PT,
        language,
        pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cci::domain::ChartImage;
    use crate::tenant::TenantId;
    use chrono::NaiveDate;

    fn scope() -> ExportScope {
        ExportScope {
            tenant_id: TenantId::parse("acme").expect("tenant"),
            survey_id: "s-1".into(),
            wave_id: "w-1".into(),
            survey_name: "Culture Pulse".into(),
            wave_label: "Wave 3".into(),
            wave_no: 3,
            as_of: NaiveDate::from_ymd_opt(2025, 5, 20).expect("valid date"),
        }
    }

    fn png() -> Vec<u8> {
        let mut bytes = vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
        bytes.extend_from_slice(&[0; 16]);
        bytes
    }

    fn initiative(title: &str) -> Initiative {
        Initiative {
            title: title.into(),
            owner: Some("HR".into()),
            priority: "high".into(),
        }
    }

    #[test]
    fn filename_uses_tenant_wave_and_date() {
        assert_eq!(pdf_filename("AqlHR", &scope()), "AqlHR_CCI_acme_Wave_3_20250520.pdf");
    }

    #[test]
    fn arabic_header_is_right_aligned() {
        let doc = layout_pdf(
            "AqlHR",
            &scope(),
            &CciOverview::default(),
            &[],
            &ChartSet::default(),
            Language::Ar,
        );
        match &doc.pages[0].elements[0] {
            PdfElement::Text { align, x, .. } => {
                assert_eq!(*align, TextAlign::Right);
                assert_eq!(*x, A4_WIDTH_PT - PAGE_MARGIN_PT);
            }
            other => panic!("expected header text, got {other:?}"),
        }
    }

    #[test]
    fn invalid_chart_is_skipped_and_extra_charts_ignored() {
        let charts = ChartSet {
            cvf: Some(ChartImage::new("cvf", b"not a png".to_vec())),
            heatmap: Some(ChartImage::new("heatmap", png())),
        };
        let doc = layout_pdf(
            "AqlHR",
            &scope(),
            &CciOverview::default(),
            &[],
            &charts,
            Language::En,
        );
        let images: Vec<&str> = doc
            .elements()
            .filter_map(|element| match element {
                PdfElement::Image { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(images, vec!["heatmap"]);
    }

    #[test]
    fn only_top_five_initiatives_are_listed() {
        let initiatives: Vec<Initiative> =
            (1..=7).map(|i| initiative(&format!("I{i}"))).collect();
        let doc = layout_pdf(
            "AqlHR",
            &scope(),
            &CciOverview::default(),
            &initiatives,
            &ChartSet::default(),
            Language::En,
        );
        let body_rows = doc
            .elements()
            .filter(|element| {
                matches!(
                    element,
                    PdfElement::TableRow {
                        header: false,
                        cells,
                        ..
                    } if cells.len() == 3
                )
            })
            .count();
        assert_eq!(body_rows, 5);
    }

    #[test]
    fn every_page_carries_the_footer() {
        let charts = ChartSet {
            cvf: Some(ChartImage::new("cvf", png())),
            heatmap: Some(ChartImage::new("heatmap", png())),
        };
        let initiatives: Vec<Initiative> =
            (1..=5).map(|i| initiative(&format!("I{i}"))).collect();
        let doc = layout_pdf(
            "AqlHR",
            &scope(),
            &CciOverview::default(),
            &initiatives,
            &charts,
            Language::En,
        );
        assert!(doc.pages.len() >= 2, "two charts push the table onto a second page");
        for page in &doc.pages {
            let has_footer = page.elements.iter().any(|element| {
                matches!(
                    element,
                    PdfElement::Text { content, .. } if content.starts_with("Not legal advice")
                )
            });
            assert!(has_footer, "page {} lacks the disclaimer", page.number);
        }
    }
}
