use std::fmt::{self, Display};

use chrono::{DateTime, Local, NaiveTime, TimeZone, Utc};
use regex::Regex;

/// Identifies which process stream produced a line of output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSource {
    Stdout,
    Stderr,
}

/// Captures a single line of process output along with its origin stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamLine {
    pub line: String,
    pub source: StreamSource,
}

impl StreamLine {
    pub fn new<S: Into<String>>(line: S, source: StreamSource) -> Self {
        Self {
            line: line.into(),
            source,
        }
    }

    pub fn stdout<S: Into<String>>(line: S) -> Self {
        Self::new(line, StreamSource::Stdout)
    }

    pub fn stderr<S: Into<String>>(line: S) -> Self {
        Self::new(line, StreamSource::Stderr)
    }

    /// Decodes raw bytes read up to a newline: invalid UTF-8 is replaced and
    /// the trailing `\n` / `\r\n` is stripped.
    pub fn from_bytes(bytes: &[u8], source: StreamSource) -> Self {
        let text = String::from_utf8_lossy(bytes);
        let text = text.trim_end_matches(['\n', '\r']);
        Self::new(text, source)
    }

    pub fn msg(&self) -> &str {
        &self.line
    }

    /// Reads the leading `[HH:MM:SS]` of a server log line as today's local
    /// time.
    pub fn extract_timestamp(&self, re: &Regex) -> Option<DateTime<Utc>> {
        let caps = re.captures(&self.line)?;
        let time = NaiveTime::parse_from_str(&caps[1], "%H:%M:%S").ok()?;

        let today = Local::now().date_naive();
        let naive_dt = today.and_time(time);

        let local_dt = Local.from_local_datetime(&naive_dt).earliest()?;

        Some(local_dt.with_timezone(&Utc))
    }
}

impl Display for StreamLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_strips_line_endings_and_replaces_bad_utf8() {
        let line = StreamLine::from_bytes(b"hello\r\n", StreamSource::Stdout);
        assert_eq!(line.msg(), "hello");

        let line = StreamLine::from_bytes(b"caf\xff\n", StreamSource::Stderr);
        assert_eq!(line.msg(), "caf\u{fffd}");
        assert_eq!(line.source, StreamSource::Stderr);
    }

    #[test]
    fn timestamp_prefix_is_read_as_local_time() {
        let re = Regex::new(r"^\[(\d{2}:\d{2}:\d{2})\]").unwrap();
        let line = StreamLine::stdout("[12:34:56] [Server thread/INFO]: Done");

        let ts = line.extract_timestamp(&re).unwrap();
        assert_eq!(
            ts.with_timezone(&Local).time(),
            NaiveTime::from_hms_opt(12, 34, 56).unwrap()
        );

        assert!(StreamLine::stdout("no time here").extract_timestamp(&re).is_none());
    }
}
