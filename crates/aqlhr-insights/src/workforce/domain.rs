use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    Active,
    Probation,
    Terminated,
    Resigned,
}

impl EmploymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Probation => "probation",
            Self::Terminated => "terminated",
            Self::Resigned => "resigned",
        }
    }
}

/// Employee row as stored by the backend; read-only to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub id: String,
    #[serde(rename = "is_saudi", alias = "is_local_national", default)]
    pub is_local_national: bool,
    #[serde(rename = "status", alias = "employment_status")]
    pub employment_status: EmploymentStatus,
    #[serde(default)]
    pub department_id: Option<String>,
}

/// Compliance tier assigned from the localization rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NitaqatBand {
    Red,
    Yellow,
    Green,
    Platinum,
}

impl NitaqatBand {
    pub fn for_rate(localization_pct: f64) -> Self {
        if localization_pct >= 40.0 {
            Self::Platinum
        } else if localization_pct >= 25.0 {
            Self::Green
        } else if localization_pct >= 10.0 {
            Self::Yellow
        } else {
            Self::Red
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Red => "Red",
            Self::Yellow => "Yellow",
            Self::Green => "Green",
            Self::Platinum => "Platinum",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeadcountSummary {
    pub total_active: u32,
    pub local_active: u32,
    pub non_local_active: u32,
    pub localization_pct: f64,
    pub band: NitaqatBand,
}

impl Default for HeadcountSummary {
    fn default() -> Self {
        Self::from_counts(0, 0)
    }
}

impl HeadcountSummary {
    pub fn from_counts(total_active: u32, local_active: u32) -> Self {
        let local_active = local_active.min(total_active);
        let localization_pct = localization_pct(local_active, total_active);
        Self {
            total_active,
            local_active,
            non_local_active: total_active - local_active,
            localization_pct,
            band: NitaqatBand::for_rate(localization_pct),
        }
    }

    /// Counts only active employees; other statuses are ignored.
    pub fn from_records(records: &[EmployeeRecord]) -> Self {
        let active = records
            .iter()
            .filter(|record| record.employment_status == EmploymentStatus::Active);
        let (total, local) = active.fold((0_u32, 0_u32), |(total, local), record| {
            (total + 1, local + u32::from(record.is_local_national))
        });
        Self::from_counts(total, local)
    }
}

/// Localization share rounded to one decimal place; zero for an empty workforce.
pub fn localization_pct(local_active: u32, total_active: u32) -> f64 {
    if total_active == 0 {
        return 0.0;
    }
    ((f64::from(local_active) / f64::from(total_active)) * 1000.0).round() / 10.0
}

/// Row returned by the headcount procedure.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct HeadcountAggregate {
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default, alias = "local")]
    pub saudi: Option<u32>,
}

impl HeadcountAggregate {
    pub(crate) fn usable(&self) -> Option<HeadcountSummary> {
        match (self.total, self.saudi) {
            (Some(total), Some(local)) => Some(HeadcountSummary::from_counts(total, local)),
            _ => None,
        }
    }
}

/// Directory listing row shown next to the headcount widgets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryEntry {
    pub id: String,
    pub full_name: String,
    pub department_name: Option<String>,
    pub is_local_national: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DirectoryRow {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub is_saudi: bool,
    #[serde(default)]
    pub department_id: Option<String>,
}

impl DirectoryRow {
    pub(crate) fn full_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() {
            self.id.clone()
        } else {
            parts.join(" ")
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DepartmentRow {
    pub id: String,
    #[serde(alias = "name_en")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkforceSnapshot {
    pub summary: HeadcountSummary,
    pub directory: Vec<DirectoryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, local: bool, status: EmploymentStatus) -> EmployeeRecord {
        EmployeeRecord {
            id: id.to_string(),
            is_local_national: local,
            employment_status: status,
            department_id: None,
        }
    }

    #[test]
    fn empty_workforce_has_zero_localization() {
        let summary = HeadcountSummary::from_counts(0, 0);
        assert_eq!(summary.localization_pct, 0.0);
        assert_eq!(summary.non_local_active, 0);
        assert_eq!(summary.band, NitaqatBand::Red);
    }

    #[test]
    fn rounds_to_one_decimal_place() {
        assert_eq!(localization_pct(1247, 1848), 67.5);
        assert_eq!(localization_pct(1, 3), 33.3);
        assert_eq!(localization_pct(2, 3), 66.7);
    }

    #[test]
    fn only_active_records_are_counted() {
        let records = vec![
            record("1", true, EmploymentStatus::Active),
            record("2", false, EmploymentStatus::Active),
            record("3", true, EmploymentStatus::Terminated),
            record("4", true, EmploymentStatus::Probation),
        ];
        let summary = HeadcountSummary::from_records(&records);
        assert_eq!(summary.total_active, 2);
        assert_eq!(summary.local_active, 1);
        assert_eq!(summary.non_local_active, 1);
        assert_eq!(summary.localization_pct, 50.0);
    }

    #[test]
    fn bands_follow_localization_thresholds() {
        assert_eq!(NitaqatBand::for_rate(9.9), NitaqatBand::Red);
        assert_eq!(NitaqatBand::for_rate(10.0), NitaqatBand::Yellow);
        assert_eq!(NitaqatBand::for_rate(25.0), NitaqatBand::Green);
        assert_eq!(NitaqatBand::for_rate(67.5), NitaqatBand::Platinum);
    }

    #[test]
    fn aggregate_without_counts_is_unusable() {
        let aggregate: HeadcountAggregate =
            serde_json::from_value(serde_json::json!({ "total": null })).expect("decodes");
        assert!(aggregate.usable().is_none());
    }
}
