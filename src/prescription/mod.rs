pub mod metadata;
pub mod rules;
pub mod statistics;

pub use metadata::{MetadataAssembler, ProvenanceRecord, RunSummary};
pub use rules::{CellClass, Classification, PrescriptionMap, RuleClassifier, Tier};
pub use statistics::{TierCount, TierStatistics};
