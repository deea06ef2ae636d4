//! This crate scrapes the loans of one or more iOPAC library accounts and turns their due dates
//! into an iCalendar file.
//!
//! One refresh cycle logs into every configured account, parses the `SEARCH_LESER` table of the
//! returned page, groups all loans by due date and writes one all-day event per date.

pub use ical;

pub mod aggregate;
pub mod calendar;
pub mod config;
pub mod error;
pub mod loans;
pub mod parser;
pub mod portal;
pub mod refresh;
