//! Readers that load external files into stored tables page by page.

pub mod csv;

pub use self::csv::{load_csv_path, load_csv_str, CsvLoad};
