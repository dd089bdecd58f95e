mod aggregator;
pub mod domain;

pub use aggregator::{EmployeeAggregator, WorkforceError, DIRECTORY_LIMIT};
pub use domain::{
    localization_pct, DirectoryEntry, EmployeeRecord, EmploymentStatus, HeadcountSummary,
    NitaqatBand, WorkforceSnapshot,
};
