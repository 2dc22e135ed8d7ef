pub mod batch;
pub mod entry;
pub mod loaders;
pub mod report;
pub mod stage;
pub mod startup;

pub use batch::BatchRun;
pub use entry::{BatchEntry, EntryStatus};
pub use loaders::{load_all_startup_files, load_startup_file};
pub use report::{Competitor, CompetitorAnalysis, DueDiligenceReport, ScrapedPage};
pub use stage::{FailureKind, StageData, StageFailure, StageKind, StageOutcome};
pub use startup::StartupInput;
