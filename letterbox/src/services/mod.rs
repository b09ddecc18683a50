//! Services module
//!
//! Business logic that keeps the database, the page image blobs and the
//! wake-up scheduler consistent with each other.

pub mod categories;
pub mod letters;
pub mod reconcile;
pub mod rehydration;
pub mod reminders;

pub use categories::CategoriesService;
pub use letters::{LetterSyncReport, LettersService};
pub use rehydration::{RehydrationReport, RehydrationService};
pub use reminders::RemindersService;
