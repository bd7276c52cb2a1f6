//! Client library for the permit and license administration database.
//!
//! Business rules live in the database's stored routines. This crate owns the
//! connection, validates form input, invokes the routines, and turns results
//! into tables, reports and export files.

pub mod config;
pub mod db;
pub mod desk;
pub mod error;
pub mod export;
pub mod forms;
pub mod notice;
pub mod permits;
pub mod reports;
pub mod screen;
pub mod telemetry;
pub mod views;

pub use desk::{Action, Desk};
pub use notice::{Notice, NoticeLevel, Notifier, RecordingNotifier};
pub use screen::Screen;
