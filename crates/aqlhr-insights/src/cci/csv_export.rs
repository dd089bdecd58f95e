use super::domain::{sanitize_label, Artifact, CciOverview, ExportFormat, ExportScope, Language};
use super::locale::disclaimer;
use super::ExportError;
use ::csv::{QuoteStyle, WriterBuilder};

/// Column order of the data export. Consumers key on these names.
pub const CSV_HEADER: [&str; 21] = [
    "tenant_id",
    "survey_id",
    "wave_id",
    "wave_label",
    "as_of",
    "n",
    "balance_score",
    "risk_index",
    "psych_safety",
    "values_alignment",
    "cvf_clan",
    "cvf_adhocracy",
    "cvf_market",
    "cvf_hierarchy",
    "web_stories",
    "web_rituals_routines",
    "web_symbols",
    "web_organizational_structure",
    "web_control_systems",
    "web_power_structures",
    "last_computed_at",
];

pub fn csv_filename(brand: &str, scope: &ExportScope) -> String {
    format!("{brand}_CCI_{}_data.csv", sanitize_label(&scope.wave_label))
}

/// One data row plus the disclaimer in both languages as `#` comment lines.
pub fn build_csv(
    brand: &str,
    scope: &ExportScope,
    overview: &CciOverview,
) -> Result<Artifact, ExportError> {
    let overview = overview.redacted();
    let cvf = overview.cvf();
    let web = overview.web();

    let mut row: Vec<String> = vec![
        scope.tenant_id.to_string(),
        scope.survey_id.clone(),
        scope.wave_id.clone(),
        scope.wave_label.clone(),
        scope.as_of.to_string(),
        overview.n.to_string(),
        cell(overview.balance_score),
        cell(overview.risk_index),
        cell(overview.psych_safety),
        cell(overview.values_alignment()),
    ];
    row.extend(cvf.quadrants().into_iter().map(|(_, value)| cell(value)));
    row.extend(web.facets().into_iter().map(|(_, value)| cell(value)));
    row.push(
        overview
            .last_computed_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_default(),
    );

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    writer.write_record(&row)?;
    let mut bytes = writer
        .into_inner()
        .map_err(|err| ExportError::Io(err.into_error()))?;

    for language in [Language::En, Language::Ar] {
        for line in disclaimer(language) {
            bytes.extend_from_slice(b"# ");
            bytes.extend_from_slice(line.as_bytes());
            bytes.push(b'\n');
        }
    }

    Ok(Artifact {
        filename: csv_filename(brand, scope),
        mime: ExportFormat::Csv.mime(),
        bytes,
    })
}

fn cell(value: Option<f64>) -> String {
    value
        .filter(|value| value.is_finite())
        .map(|value| value.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::TenantId;
    use chrono::NaiveDate;

    fn scope(label: &str) -> ExportScope {
        ExportScope {
            tenant_id: TenantId::parse("acme").expect("tenant"),
            survey_id: "s-1".into(),
            wave_id: "w-1".into(),
            survey_name: "Culture Pulse".into(),
            wave_label: label.into(),
            wave_no: 2,
            as_of: NaiveDate::from_ymd_opt(2025, 4, 1).expect("valid date"),
        }
    }

    fn rows(artifact: &Artifact) -> Vec<String> {
        String::from_utf8(artifact.bytes.clone())
            .expect("utf-8")
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn labels_with_commas_are_quoted() {
        let artifact =
            build_csv("AqlHR", &scope("Wave 2, Riyadh"), &CciOverview::default()).expect("csv");
        assert!(rows(&artifact)[1].contains("\"Wave 2, Riyadh\""));
        assert_eq!(artifact.filename, "AqlHR_CCI_Wave_2__Riyadh_data.csv");
        assert_eq!(artifact.mime, "text/csv;charset=utf-8");
    }

    #[test]
    fn disclaimer_is_appended_in_both_languages() {
        let artifact = build_csv("AqlHR", &scope("W2"), &CciOverview::default()).expect("csv");
        let lines = rows(&artifact);
        let comments: Vec<&String> = lines.iter().filter(|line| line.starts_with("# ")).collect();
        assert_eq!(comments.len(), 4);
        assert_eq!(lines.len(), 6);
    }
}
