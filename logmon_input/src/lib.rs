pub mod csv;

pub use csv::{Column, CsvLogReader, STDIN};
