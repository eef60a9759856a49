//! Order report retrieval and parsing: one authenticated POST returning CSV
//! text (possibly wrapped in a JSON envelope), parsed into order records.

pub mod fetch;
pub mod parse;

pub use fetch::{fetch_report, FetchError, ReportQuery};
pub use parse::{parse_report, OrderRecord, ParseError, ParsedReport};
