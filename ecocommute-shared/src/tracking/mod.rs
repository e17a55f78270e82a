/// Commute tracking
///
/// - `scoring`: points and CO₂ for a week of commuting
/// - `merge`: folding a second submission into an existing weekly log
/// - `reconcile`: advancing challenge progress for a new log
/// - `submission`: the end-to-end submission flow

pub mod merge;
pub mod reconcile;
pub mod scoring;
pub mod submission;

pub use merge::DaySelection;
pub use reconcile::ReconcileSummary;
pub use submission::{submit_commute, CommuteSubmission, SubmissionError, SubmissionOutcome};
