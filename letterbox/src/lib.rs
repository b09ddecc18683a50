//! Letterbox library
//!
//! Keeps the letter database, the scanned page images and the reminder
//! alarms consistent with each other.

pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod ids;
pub mod scheduler;
pub mod services;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;
