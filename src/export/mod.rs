pub mod csv;

pub use csv::{CsvLedger, CsvRow, write_detector_report};
