mod common;

use aqlhr_insights::cci::{
    build_deck, layout_pdf, CciExporter, CciOverview, ChartSet, DocumentRenderer, ExportError,
    ExportFormat, ExportRequest, ExportScope, Initiative, Language, PdfElement, SlideKind,
    CSV_HEADER,
};
use aqlhr_insights::source::{procedures, MemoryDataSource};
use chrono::NaiveDate;
use common::{tenant, TENANT};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Arc;
use zip::ZipArchive;

fn scope() -> ExportScope {
    ExportScope {
        tenant_id: tenant(),
        survey_id: "survey-1".into(),
        wave_id: "wave-2".into(),
        survey_name: "Culture Pulse 2025".into(),
        wave_label: "Wave 2 (May)".into(),
        wave_no: 2,
        as_of: NaiveDate::from_ymd_opt(2025, 5, 31).expect("valid date"),
    }
}

fn request(format: ExportFormat) -> ExportRequest {
    ExportRequest {
        scope: scope(),
        format,
        language: Language::En,
        initiatives: vec![Initiative {
            title: "Leadership listening tour".into(),
            owner: Some("CHRO".into()),
            priority: "high".into(),
        }],
        charts: ChartSet::default(),
    }
}

fn overview(n: u32) -> Value {
    json!({
        "balance_score": null,
        "risk_index": 32.5,
        "psych_safety": 71.0,
        "values_alignment": 0.4,
        "cvf": { "Clan": 31.0, "Adhocracy": 19.5, "Market": 27.0, "Hierarchy": 22.5 },
        "web": {
            "Stories": 3.9,
            "Rituals & Routines": 3.4,
            "Symbols": 3.1,
            "Organizational Structure": 2.8,
            "Control Systems": 3.0,
            "Power Structures": 2.6
        },
        "barrett": { "values_alignment": 0.68, "entropy": 0.14 },
        "n": n,
        "last_computed_at": "2025-05-30T22:00:00Z"
    })
}

fn backend(overview: Value) -> MemoryDataSource {
    let source = MemoryDataSource::new();
    source.register_procedure(procedures::CCI_OVERVIEW, move |params| {
        assert_eq!(params["p_tenant"], json!(TENANT));
        Ok(json!([overview.clone()]))
    });
    source.register_procedure(procedures::SESSION_MEMORY, |_| Ok(Value::Null));
    source
}

fn exporter(source: &MemoryDataSource) -> CciExporter {
    CciExporter::new(Arc::new(source.clone()), Arc::new(DocumentRenderer), "AqlHR")
}

fn csv_row(bytes: &[u8]) -> HashMap<String, String> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .from_reader(bytes);
    let headers = reader.headers().expect("header row").clone();
    let record = reader
        .records()
        .next()
        .expect("one data row")
        .expect("valid record");
    headers
        .iter()
        .zip(record.iter())
        .map(|(header, value)| (header.to_string(), value.to_string()))
        .collect()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

fn pptx_part(bytes: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("pptx is a zip package");
    let mut xml = String::new();
    archive
        .by_name(name)
        .expect("part present")
        .read_to_string(&mut xml)
        .expect("utf-8 part");
    xml
}

fn decoded(n: u32) -> CciOverview {
    serde_json::from_value(overview(n)).expect("decodes")
}

#[test]
fn csv_pulls_values_alignment_from_barrett_and_blanks_nulls() {
    let source = backend(overview(42));
    let artifact = exporter(&source)
        .export(&request(ExportFormat::Csv))
        .expect("export succeeds");

    assert_eq!(artifact.filename, "AqlHR_CCI_Wave_2__May__data.csv");
    assert_eq!(artifact.mime, "text/csv;charset=utf-8");

    let row = csv_row(&artifact.bytes);
    assert_eq!(row.len(), CSV_HEADER.len());
    assert_eq!(row["values_alignment"], "0.68");
    assert_eq!(row["balance_score"], "", "null renders as empty, never 0");
    assert_eq!(row["risk_index"], "32.5");
    assert_eq!(row["cvf_clan"], "31");
    assert_eq!(row["web_rituals_routines"], "3.4");
    assert_eq!(row["wave_label"], "Wave 2 (May)");
}

#[test]
fn suppressed_group_renders_every_score_empty() {
    let source = backend(overview(5));
    let artifact = exporter(&source)
        .export(&request(ExportFormat::Csv))
        .expect("export succeeds");
    let row = csv_row(&artifact.bytes);

    assert_eq!(row["n"], "5");
    for column in CSV_HEADER.iter().skip(6).take(14) {
        assert_eq!(row[*column], "", "{column} must be suppressed");
    }
    let text = String::from_utf8(artifact.bytes).expect("utf-8");
    assert!(!text.contains("null"));
    assert!(!text.contains("undefined"));
}

#[test]
fn pdf_kpi_row_shows_dash_for_null_balance_score() {
    let doc = layout_pdf(
        "AqlHR",
        &scope(),
        &decoded(42),
        &[],
        &ChartSet::default(),
        Language::En,
    );
    let kpi_values = doc
        .elements()
        .find_map(|element| match element {
            PdfElement::TableRow {
                header: false,
                cells,
                ..
            } if cells.len() == 4 => Some(cells.clone()),
            _ => None,
        })
        .expect("kpi row present");
    assert_eq!(kpi_values, vec!["—", "32.5", "71.0", "0.7"]);
}

#[test]
fn builders_are_idempotent_for_identical_input() {
    let source = backend(overview(42));
    let exporter = exporter(&source);
    for format in [ExportFormat::Csv, ExportFormat::Pdf, ExportFormat::Pptx] {
        let first = exporter.export(&request(format)).expect("first export");
        let second = exporter.export(&request(format)).expect("second export");
        assert_eq!(first, second, "{format} output differs between runs");
    }
}

#[test]
fn pdf_and_pptx_follow_their_filename_patterns() {
    let source = backend(overview(42));
    let exporter = exporter(&source);
    let pdf = exporter.export(&request(ExportFormat::Pdf)).expect("pdf");
    assert_eq!(pdf.filename, "AqlHR_CCI_acme_Wave_2_20250531.pdf");
    assert_eq!(pdf.mime, "application/pdf");
    assert!(pdf.bytes.starts_with(b"%PDF-1.4"));
    assert!(pdf.bytes.ends_with(b"%%EOF\n"));
    assert!(contains(&pdf.bytes, b"(32.5) Tj"));

    let pptx = exporter.export(&request(ExportFormat::Pptx)).expect("pptx");
    assert_eq!(pptx.filename, "AqlHR_CCI_Wave_2__May_.pptx");
    let archive = ZipArchive::new(Cursor::new(pptx.bytes.as_slice())).expect("zip package");
    let slides = archive
        .file_names()
        .filter(|name| name.starts_with("ppt/slides/slide"))
        .count();
    assert_eq!(slides, 8);
    assert!(pptx_part(&pptx.bytes, "ppt/slides/slide8.xml").contains("Not legal advice"));
}

#[test]
fn pdf_below_anonymity_floor_shows_only_dashes() {
    let doc = layout_pdf(
        "AqlHR",
        &scope(),
        &decoded(5),
        &[],
        &ChartSet::default(),
        Language::En,
    );
    let kpi_values = doc
        .elements()
        .find_map(|element| match element {
            PdfElement::TableRow {
                header: false,
                cells,
                ..
            } if cells.len() == 4 => Some(cells.clone()),
            _ => None,
        })
        .expect("kpi row present");
    assert_eq!(kpi_values, vec!["—"; 4]);
    assert!(doc
        .texts()
        .any(|text| text == "This group is below the anonymity floor; scores are hidden."));

    let source = backend(overview(5));
    let pdf = exporter(&source)
        .export(&request(ExportFormat::Pdf))
        .expect("pdf");
    assert!(contains(&pdf.bytes, b"(\x97) Tj"));
    for score in ["32.5", "71.0", "0.7"] {
        let shown = format!("({score}) Tj");
        assert!(!contains(&pdf.bytes, shown.as_bytes()), "{score} leaked");
    }
}

#[test]
fn pptx_below_anonymity_floor_hides_scores_on_every_slide() {
    let deck = build_deck(
        "AqlHR",
        &scope(),
        &decoded(5),
        &[],
        &ChartSet::default(),
        Language::En,
    );
    let body = |kind: SlideKind| {
        deck.slides
            .iter()
            .find(|slide| slide.kind == kind)
            .map(|slide| slide.body.clone())
            .expect("slide present")
    };

    assert_eq!(
        body(SlideKind::KeyScores),
        vec!["This group is below the anonymity floor; scores are hidden."]
    );
    for line in body(SlideKind::CvfChart)
        .iter()
        .chain(body(SlideKind::HeatmapChart).iter())
    {
        assert!(line.ends_with(": —"), "{line} is not suppressed");
        assert!(!line.chars().any(|c| c.is_ascii_digit()), "{line} has a score");
    }
    assert!(body(SlideKind::Method).contains(&"Respondents: 5".to_string()));

    let source = backend(overview(5));
    let pptx = exporter(&source)
        .export(&request(ExportFormat::Pptx))
        .expect("pptx");
    let key_scores = pptx_part(&pptx.bytes, "ppt/slides/slide3.xml");
    assert!(key_scores.contains("scores are hidden"));
    for slide in 3..=5 {
        let xml = pptx_part(&pptx.bytes, &format!("ppt/slides/slide{slide}.xml"));
        for score in ["32.5", "71.0", "3.9"] {
            assert!(!xml.contains(score), "{score} leaked on slide {slide}");
        }
    }
}

#[test]
fn failed_overview_fetch_aborts_export() {
    let source = backend(overview(42));
    source.fail(procedures::CCI_OVERVIEW, "rpc timeout");
    match exporter(&source).export(&request(ExportFormat::Csv)) {
        Err(ExportError::Source(err)) => assert!(err.to_string().contains("rpc timeout")),
        other => panic!("expected source error, got {other:?}"),
    }
    assert!(!source
        .calls()
        .iter()
        .any(|call| call == procedures::SESSION_MEMORY));
}

#[test]
fn empty_overview_result_is_reported_as_missing() {
    let source = MemoryDataSource::new();
    source.register_procedure(procedures::CCI_OVERVIEW, |_| Ok(json!([])));
    match exporter(&source).export(&request(ExportFormat::Pdf)) {
        Err(ExportError::MissingOverview { wave_id, .. }) => assert_eq!(wave_id, "wave-2"),
        other => panic!("expected missing overview, got {other:?}"),
    }
}

#[test]
fn session_memory_failure_is_swallowed() {
    let source = backend(overview(42));
    source.fail(procedures::SESSION_MEMORY, "function does not exist");
    let artifact = exporter(&source)
        .export(&request(ExportFormat::Csv))
        .expect("export still succeeds");
    assert!(!artifact.bytes.is_empty());
    assert_eq!(
        source.calls().last().map(String::as_str),
        Some(procedures::SESSION_MEMORY)
    );
}
