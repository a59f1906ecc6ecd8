//! Vaccine scheduler library
//!
//! Tracks a baby's vaccine doses: generates the full schedule from the date
//! of birth, advances to the next dose on completion and flags what is due.

pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod schedule;
pub mod services;
