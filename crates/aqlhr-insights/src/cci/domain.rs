use crate::tenant::TenantId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Groups smaller than this are reported without scores.
pub const ANONYMITY_FLOOR: u32 = 7;

/// Competing Values Framework quadrant shares.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CvfProfile {
    #[serde(rename = "Clan", default)]
    pub clan: Option<f64>,
    #[serde(rename = "Adhocracy", default)]
    pub adhocracy: Option<f64>,
    #[serde(rename = "Market", default)]
    pub market: Option<f64>,
    #[serde(rename = "Hierarchy", default)]
    pub hierarchy: Option<f64>,
}

impl CvfProfile {
    pub fn quadrants(&self) -> [(&'static str, Option<f64>); 4] {
        [
            ("clan", self.clan),
            ("adhocracy", self.adhocracy),
            ("market", self.market),
            ("hierarchy", self.hierarchy),
        ]
    }
}

/// Cultural web facet scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CulturalWeb {
    #[serde(rename = "Stories", default)]
    pub stories: Option<f64>,
    #[serde(rename = "Rituals & Routines", default)]
    pub rituals_routines: Option<f64>,
    #[serde(rename = "Symbols", default)]
    pub symbols: Option<f64>,
    #[serde(rename = "Organizational Structure", default)]
    pub organizational_structure: Option<f64>,
    #[serde(rename = "Control Systems", default)]
    pub control_systems: Option<f64>,
    #[serde(rename = "Power Structures", default)]
    pub power_structures: Option<f64>,
}

impl CulturalWeb {
    pub fn facets(&self) -> [(&'static str, Option<f64>); 6] {
        [
            ("stories", self.stories),
            ("rituals_routines", self.rituals_routines),
            ("symbols", self.symbols),
            ("organizational_structure", self.organizational_structure),
            ("control_systems", self.control_systems),
            ("power_structures", self.power_structures),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BarrettProfile {
    #[serde(default)]
    pub values_alignment: Option<f64>,
    #[serde(default)]
    pub entropy: Option<f64>,
}

/// Survey-wave culture aggregate as computed by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CciOverview {
    #[serde(default)]
    pub balance_score: Option<f64>,
    #[serde(default)]
    pub risk_index: Option<f64>,
    #[serde(default)]
    pub psych_safety: Option<f64>,
    #[serde(default)]
    pub values_alignment: Option<f64>,
    #[serde(default)]
    pub cvf: Option<CvfProfile>,
    #[serde(default)]
    pub web: Option<CulturalWeb>,
    #[serde(default)]
    pub barrett: Option<BarrettProfile>,
    #[serde(default)]
    pub n: u32,
    #[serde(default)]
    pub last_computed_at: Option<DateTime<Utc>>,
}

impl CciOverview {
    pub fn is_suppressed(&self) -> bool {
        self.n < ANONYMITY_FLOOR
    }

    /// Copy with every score cleared when the group is below the anonymity
    /// floor. Respondent count and timestamps are kept.
    pub fn redacted(&self) -> Self {
        if !self.is_suppressed() {
            return self.clone();
        }
        Self {
            n: self.n,
            last_computed_at: self.last_computed_at,
            ..Self::default()
        }
    }

    /// Alignment reported by the Barrett block, else the top-level field.
    pub fn values_alignment(&self) -> Option<f64> {
        self.barrett
            .as_ref()
            .and_then(|barrett| barrett.values_alignment)
            .or(self.values_alignment)
    }

    pub fn cvf(&self) -> CvfProfile {
        self.cvf.clone().unwrap_or_default()
    }

    pub fn web(&self) -> CulturalWeb {
        self.web.clone().unwrap_or_default()
    }
}

/// Identifies the survey wave being exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportScope {
    pub tenant_id: TenantId,
    pub survey_id: String,
    pub wave_id: String,
    pub survey_name: String,
    pub wave_label: String,
    pub wave_no: u32,
    pub as_of: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Initiative {
    pub title: String,
    #[serde(default)]
    pub owner: Option<String>,
    pub priority: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    En,
    Ar,
}

impl Language {
    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ar => "ar",
        }
    }

    pub const fn is_rtl(self) -> bool {
        matches!(self, Self::Ar)
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "ar" | "arabic" => Ok(Self::Ar),
            other => Err(format!("unsupported language '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Csv,
    Pdf,
    Pptx,
}

impl ExportFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Pdf => "pdf",
            Self::Pptx => "pptx",
        }
    }

    pub const fn mime(self) -> &'static str {
        match self {
            Self::Csv => "text/csv;charset=utf-8",
            Self::Pdf => "application/pdf",
            Self::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "pdf" => Ok(Self::Pdf),
            "pptx" => Ok(Self::Pptx),
            other => Err(format!("unsupported export format '{other}'")),
        }
    }
}

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// Chart rendered elsewhere and handed in as PNG bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChartImage {
    pub name: String,
    pub png: Vec<u8>,
}

impl ChartImage {
    pub fn new(name: impl Into<String>, png: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            png,
        }
    }

    pub fn is_png(&self) -> bool {
        self.png.starts_with(&PNG_SIGNATURE)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartSet {
    pub cvf: Option<ChartImage>,
    pub heatmap: Option<ChartImage>,
}

impl ChartSet {
    pub fn iter(&self) -> impl Iterator<Item = &ChartImage> {
        self.cvf.iter().chain(self.heatmap.iter())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub scope: ExportScope,
    pub format: ExportFormat,
    pub language: Language,
    pub initiatives: Vec<Initiative>,
    pub charts: ChartSet,
}

/// Finished export ready to hand to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// Replaces everything but ASCII letters and digits with `_`.
pub fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_objects_decode_into_named_fields() {
        let overview: CciOverview = serde_json::from_value(json!({
            "balance_score": 71.2,
            "cvf": { "Clan": 30, "Adhocracy": 20, "Market": 25, "Hierarchy": 25 },
            "web": { "Rituals & Routines": 3.8, "Power Structures": 2.9 },
            "barrett": { "values_alignment": 0.64 },
            "n": 42
        }))
        .expect("decodes");

        assert_eq!(overview.cvf().clan, Some(30.0));
        assert_eq!(overview.web().rituals_routines, Some(3.8));
        assert_eq!(overview.web().stories, None);
        assert_eq!(overview.values_alignment(), Some(0.64));
        assert!(!overview.is_suppressed());
    }

    #[test]
    fn small_groups_are_redacted() {
        let overview = CciOverview {
            balance_score: Some(80.0),
            cvf: Some(CvfProfile {
                clan: Some(40.0),
                ..CvfProfile::default()
            }),
            n: 6,
            ..CciOverview::default()
        };
        let redacted = overview.redacted();
        assert_eq!(redacted.balance_score, None);
        assert_eq!(redacted.cvf, None);
        assert_eq!(redacted.n, 6);
    }

    #[test]
    fn wave_labels_are_sanitized_for_filenames() {
        assert_eq!(sanitize_label("Q1 2025 / Pulse"), "Q1_2025___Pulse");
    }

    #[test]
    fn png_signature_is_checked() {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(b"IHDR");
        assert!(ChartImage::new("cvf", bytes).is_png());
        assert!(!ChartImage::new("cvf", b"GIF89a".to_vec()).is_png());
    }
}
