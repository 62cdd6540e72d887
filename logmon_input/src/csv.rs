//! Header-driven reader for delimited access logs.

use async_trait::async_trait;
use logmon_core::{EventSource, LogEvent, MonitorConfig};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, info, warn};

/// Input name that selects standard input.
pub const STDIN: &str = "-";

type Input = BufReader<Box<dyn AsyncRead + Send + Unpin>>;

/// Logical field a column of the input maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Date,
    Request,
    Status,
    RemoteHost,
    Ignored,
}

impl Column {
    pub fn from_header(name: &str) -> Self {
        match name.trim() {
            "date" => Column::Date,
            "request" => Column::Request,
            "status" => Column::Status,
            "remotehost" => Column::RemoteHost,
            _ => Column::Ignored,
        }
    }
}

/// Reads [`LogEvent`]s from a delimited file whose first row names the columns.
///
/// Failing to open or read the input is logged and treated as end of stream.
pub struct CsvLogReader {
    input: Option<Input>,
    delimiter: char,
    columns: Option<Vec<Column>>,
    line: String,
    rows: usize,
}

impl CsvLogReader {
    /// Opens `source`, a file path or [`STDIN`].
    pub async fn open(source: &str, delimiter: char) -> Self {
        if source == STDIN {
            info!("Reading access log from stdin");
            return Self::from_reader(tokio::io::stdin(), delimiter);
        }

        match File::open(Path::new(source)).await {
            Ok(file) => {
                info!("Reading access log from {}", source);
                Self::from_reader(file, delimiter)
            }
            Err(e) => {
                warn!("Cannot open {}: {}", source, e);
                Self::closed(delimiter)
            }
        }
    }

    pub async fn from_config(source: &str, config: &MonitorConfig) -> Self {
        Self::open(source, config.delimiter).await
    }

    pub fn from_reader<R>(reader: R, delimiter: char) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(reader);
        Self {
            input: Some(BufReader::new(reader)),
            delimiter,
            columns: None,
            line: String::new(),
            rows: 0,
        }
    }

    fn closed(delimiter: char) -> Self {
        Self {
            input: None,
            delimiter,
            columns: None,
            line: String::new(),
            rows: 0,
        }
    }

    /// Column mapping read from the header row, once it has been read.
    pub fn columns(&self) -> Option<&[Column]> {
        self.columns.as_deref()
    }

    /// Data rows returned so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    async fn next_line(&mut self) -> Option<&str> {
        let input = self.input.as_mut()?;
        self.line.clear();

        match input.read_line(&mut self.line).await {
            Ok(0) => {
                debug!("End of input after {} rows", self.rows);
                self.input = None;
                None
            }
            Ok(_) => Some(self.line.trim_end_matches(['\n', '\r'])),
            Err(e) => {
                warn!("Read error after {} rows: {}", self.rows, e);
                self.input = None;
                None
            }
        }
    }

    fn parse_header(line: &str, delimiter: char) -> Vec<Column> {
        line.split(delimiter)
            .map(|name| Column::from_header(strip_quotes(name)))
            .collect()
    }

    fn parse_row(line: &str, delimiter: char, columns: &[Column]) -> LogEvent {
        let mut event = LogEvent::default();

        for (column, value) in columns.iter().zip(line.split(delimiter)) {
            let value = strip_quotes(value);
            match column {
                Column::Date => event.timestamp = value.trim().parse().unwrap_or(0),
                Column::Request => event.request = value.to_string(),
                Column::Status => event.status = value.trim().parse().unwrap_or(0),
                Column::RemoteHost => event.remote_host = value.to_string(),
                Column::Ignored => {}
            }
        }

        event
    }
}

fn strip_quotes(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

#[async_trait]
impl EventSource for CsvLogReader {
    async fn next_event(&mut self) -> Option<LogEvent> {
        let delimiter = self.delimiter;

        if self.columns.is_none() {
            let header = self.next_line().await?;
            let columns = Self::parse_header(header, delimiter);
            debug!("Header columns: {:?}", columns);
            self.columns = Some(columns);
        }

        loop {
            let line = self.next_line().await?.to_string();
            if line.trim().is_empty() {
                continue;
            }

            let columns = self.columns.as_deref().unwrap_or_default();
            let event = Self::parse_row(&line, delimiter, columns);
            self.rows += 1;
            return Some(event);
        }
    }
}
