//! Domain models for production tracking

pub mod defect;
pub mod layout;
pub mod machine;
pub mod operator;
pub mod production;
pub mod report;

pub use defect::{Defect, Severity};
pub use layout::{Floor, Line};
pub use machine::{Machine, MachinePart, ServiceNotification};
pub use operator::{LastScan, Operator, ScoreChange, ScoreHistoryEntry};
pub use production::{
    DefectCount, HistoryAction, HourlyEntry, OperatorSnapshot, ProductionRecord, RecordState,
    WorkAs,
};
