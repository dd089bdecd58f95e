use super::domain::{
    sanitize_label, ChartImage, ChartSet, CciOverview, ExportScope, Initiative, Language,
};
use super::locale::{disclaimer, format_score, labels, MISSING_SCORE};
use chrono::{Days, NaiveDate};

/// 16:9 slide size in inches.
pub const SLIDE_WIDTH_IN: f64 = 13.333;
pub const SLIDE_HEIGHT_IN: f64 = 7.5;

/// Days after the wave's as-of date at which pulse surveys are scheduled.
pub const PULSE_OFFSETS_DAYS: [u64; 3] = [30, 60, 90];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideKind {
    Cover,
    Method,
    KeyScores,
    CvfChart,
    HeatmapChart,
    Initiatives,
    PulseSchedule,
    NextSteps,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlideVisual {
    Image {
        name: String,
        png: Vec<u8>,
    },
    Placeholder {
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    pub kind: SlideKind,
    pub title: String,
    pub body: Vec<String>,
    pub visual: Option<SlideVisual>,
    pub footer: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlideDeck {
    pub width_in: f64,
    pub height_in: f64,
    pub language: Language,
    pub slides: Vec<Slide>,
}

pub fn pptx_filename(brand: &str, scope: &ExportScope) -> String {
    format!("{brand}_CCI_{}.pptx", sanitize_label(&scope.wave_label))
}

pub fn pulse_dates(as_of: NaiveDate) -> Vec<NaiveDate> {
    PULSE_OFFSETS_DAYS
        .iter()
        .filter_map(|days| as_of.checked_add_days(Days::new(*days)))
        .collect()
}

/// Builds the fixed eight-slide deck.
pub fn build_deck(
    brand: &str,
    scope: &ExportScope,
    overview: &CciOverview,
    initiatives: &[Initiative],
    charts: &ChartSet,
    language: Language,
) -> SlideDeck {
    let text = labels(language);
    let overview = overview.redacted();
    let footer = disclaimer(language).join(" ");

    let slide = |kind, title: &str, body: Vec<String>, visual| Slide {
        kind,
        title: title.to_string(),
        body,
        visual,
        footer: footer.clone(),
    };

    let scores = if overview.is_suppressed() {
        vec![text.suppressed_notice.to_string()]
    } else {
        vec![
            format!("{}: {}", text.balance_score, format_score(overview.balance_score)),
            format!("{}: {}", text.risk_index, format_score(overview.risk_index)),
            format!("{}: {}", text.psych_safety, format_score(overview.psych_safety)),
            format!(
                "{}: {}",
                text.values_alignment,
                format_score(overview.values_alignment())
            ),
        ]
    };

    let cvf_lines = overview
        .cvf()
        .quadrants()
        .iter()
        .map(|(name, value)| format!("{name}: {}", format_score(*value)))
        .collect();
    let web_lines = overview
        .web()
        .facets()
        .iter()
        .map(|(name, value)| format!("{name}: {}", format_score(*value)))
        .collect();

    let initiative_lines = if initiatives.is_empty() {
        vec![text.no_initiatives.to_string()]
    } else {
        initiatives
            .iter()
            .take(5)
            .enumerate()
            .map(|(rank, initiative)| {
                format!(
                    "{}. {} ({}, {})",
                    rank + 1,
                    initiative.title,
                    initiative.owner.as_deref().unwrap_or(MISSING_SCORE),
                    initiative.priority
                )
            })
            .collect()
    };

    let pulse_lines = pulse_dates(scope.as_of)
        .into_iter()
        .zip(PULSE_OFFSETS_DAYS)
        .map(|(date, days)| format!("{} +{days}: {date}", text.pulse_entry))
        .collect();

    let slides = vec![
        slide(
            SlideKind::Cover,
            &format!("{brand} · {}", text.report_title),
            vec![
                scope.survey_name.clone(),
                format!("{}: {}", text.wave, scope.wave_label),
                format!("{}: {}", text.as_of, scope.as_of),
            ],
            None,
        ),
        slide(
            SlideKind::Method,
            text.method_title,
            vec![
                text.method_body.to_string(),
                format!("{}: {}", text.respondents, overview.n),
            ],
            None,
        ),
        slide(SlideKind::KeyScores, text.key_scores, scores, None),
        slide(
            SlideKind::CvfChart,
            text.cvf_chart,
            cvf_lines,
            Some(visual(charts.cvf.as_ref(), text.chart_unavailable)),
        ),
        slide(
            SlideKind::HeatmapChart,
            text.heatmap_chart,
            web_lines,
            Some(visual(charts.heatmap.as_ref(), text.chart_unavailable)),
        ),
        slide(SlideKind::Initiatives, text.initiatives, initiative_lines, None),
        slide(SlideKind::PulseSchedule, text.pulse_schedule, pulse_lines, None),
        slide(
            SlideKind::NextSteps,
            text.next_steps,
            text.next_step_items.iter().map(|item| item.to_string()).collect(),
            None,
        ),
    ];

    SlideDeck {
        width_in: SLIDE_WIDTH_IN,
        height_in: SLIDE_HEIGHT_IN,
        language,
        slides,
    }
}

fn visual(chart: Option<&ChartImage>, placeholder: &str) -> SlideVisual {
    match chart {
        Some(chart) if chart.is_png() => SlideVisual::Image {
            name: chart.name.clone(),
            png: chart.png.clone(),
        },
        _ => SlideVisual::Placeholder {
            text: placeholder.to_string(),
        },
    }
}
