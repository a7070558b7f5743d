use std::time::Instant;

use journal_parser::parse_line;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, warn};

use crate::error::FilterError;
use crate::metrics::{self, Metrics};
use crate::publisher::Publisher;

/// Per-run line counts, mirrored in [`Metrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSummary {
    pub lines_read: u64,
    pub parse_errors: u64,
    pub parsed: u64,
    pub published: u64,
    pub publish_failures: u64,
    pub written: u64,
    pub write_errors: u64,
}

/// Read extract lines, publish their CDC events and echo parsed lines.
///
/// Unparseable lines are logged, counted and skipped. A record that parses
/// but cannot be serialized aborts the run.
pub async fn run_filter<R, W>(
    mut reader: R,
    mut writer: W,
    publisher: &dyn Publisher,
    metrics: &Metrics,
) -> Result<FilterSummary, FilterError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut summary = FilterSummary::default();
    let mut buf = Vec::new();
    let mut line_number: u64 = 0;

    loop {
        buf.clear();
        if reader
            .read_until(b'\n', &mut buf)
            .await
            .map_err(FilterError::Read)?
            == 0
        {
            break;
        }
        let raw = trim_line_ending(&buf);
        // journals may carry Latin-1 bytes; decode lossily and echo the raw bytes
        let line = String::from_utf8_lossy(raw);
        line_number += 1;
        summary.lines_read += 1;
        metrics.incr_counter(metrics::LINES_READ);

        let rec = match parse_line(&line) {
            Ok(rec) => rec,
            Err(e) => {
                warn!(line_number, journal = %line, "Unable to parse record: {}", e);
                summary.parse_errors += 1;
                metrics.incr_counter(metrics::LINES_PARSE_ERROR);
                continue;
            }
        };
        summary.parsed += 1;
        metrics.incr_counter(metrics::LINES_PARSED);

        let json = rec.to_json().map_err(|source| {
            error!(line_number, journal = %line, "Cannot serialize record: {}", source);
            FilterError::Serialize {
                line_number,
                source,
            }
        })?;
        debug!(line_number, "line parsed to json {}", json);

        if publisher.is_available() {
            let start = Instant::now();
            match publisher.publish(&json) {
                Ok(()) => {
                    summary.published += 1;
                    metrics.incr_counter(metrics::LINES_PUBLISHED);
                    metrics.observe(
                        metrics::PUBLISH_DURATION_US,
                        start.elapsed().as_micros() as f64,
                    );
                }
                Err(e) => {
                    warn!(line_number, journal = %line, "Unable to publish message: {}", e);
                    summary.publish_failures += 1;
                    metrics.incr_counter(metrics::LINES_NOT_PUBLISHED);
                }
            }
        }

        match write_line(&mut writer, raw).await {
            Ok(()) => {
                summary.written += 1;
                metrics.incr_counter(metrics::LINES_WRITTEN);
            }
            Err(e) => {
                error!(line_number, "Unable to write to output: {}", e);
                summary.write_errors += 1;
                metrics.incr_counter(metrics::LINES_WRITE_ERROR);
            }
        }
    }

    if let Err(e) = writer.flush().await {
        error!("Unable to flush output: {}", e);
    }
    Ok(summary)
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &[u8]) -> std::io::Result<()> {
    writer.write_all(line).await?;
    writer.write_all(b"\n").await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PublishError;
    use crate::publisher::{DisabledPublisher, JsonLinesPublisher};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const SET_LINE: &str =
        r#"05\65282,59700\28\0\0\28\0\0\0\0\^ACN(1234,51)="300.00|61212|1||||""#;
    const TCOM_LINE: &str = r"09\65287,58606\8\0\0\8\0\0\1\";
    const BAD_LINE: &str = r"05\65282,59700\28";

    /// Replays scripted outcomes, like a mocked message producer.
    struct ScriptedPublisher {
        outcomes: Mutex<VecDeque<bool>>,
        sent: Mutex<Vec<String>>,
    }

    impl ScriptedPublisher {
        fn new(outcomes: &[bool]) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.iter().copied().collect()),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    impl Publisher for ScriptedPublisher {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn publish(&self, payload: &str) -> Result<(), PublishError> {
            self.sent.lock().unwrap().push(payload.to_string());
            match self.outcomes.lock().unwrap().pop_front() {
                Some(true) => Ok(()),
                _ => Err(PublishError::Write(std::io::Error::other("send message failed"))),
            }
        }
    }

    fn input(lines: &[&str]) -> Vec<u8> {
        let mut data = lines.join("\n");
        data.push('\n');
        data.into_bytes()
    }

    #[tokio::test]
    async fn test_filter_with_scripted_publisher() {
        // #1 publishes, #2 (TCOM) fails to publish, #3 cannot be parsed
        let publisher = ScriptedPublisher::new(&[true, false]);
        let metrics = Metrics::new();
        let data = input(&[SET_LINE, TCOM_LINE, BAD_LINE]);
        let mut output = Vec::new();

        let summary = run_filter(data.as_slice(), &mut output, &publisher, &metrics)
            .await
            .unwrap();

        assert_eq!(
            summary,
            FilterSummary {
                lines_read: 3,
                parse_errors: 1,
                parsed: 2,
                published: 1,
                publish_failures: 1,
                written: 2,
                write_errors: 0,
            }
        );
        assert_eq!(metrics.counter_value(metrics::LINES_READ), 3);
        assert_eq!(metrics.counter_value(metrics::LINES_PARSE_ERROR), 1);
        assert_eq!(metrics.counter_value(metrics::LINES_WRITTEN), 2);
        assert_eq!(metrics.counter_value(metrics::LINES_PUBLISHED), 1);
        assert_eq!(metrics.counter_value(metrics::LINES_NOT_PUBLISHED), 1);
        assert_eq!(metrics.histogram(metrics::PUBLISH_DURATION_US).unwrap().count, 1);

        // parsed lines are echoed unchanged, in input order
        assert_eq!(String::from_utf8(output).unwrap(), format!("{SET_LINE}\n{TCOM_LINE}\n"));

        let sent = publisher.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].starts_with(r#"{"operand":"SET","transaction_num":"28""#));
        assert!(sent[1].starts_with(r#"{"operand":"TCOM""#));
    }

    #[tokio::test]
    async fn test_disabled_publisher_still_echoes() {
        let metrics = Metrics::new();
        let data = input(&[TCOM_LINE, "", r"08\65287,62154\3\0\0\3\0\0"]);
        let mut output = Vec::new();

        let summary = run_filter(data.as_slice(), &mut output, &DisabledPublisher, &metrics)
            .await
            .unwrap();

        assert_eq!(summary.lines_read, 3);
        assert_eq!(summary.parse_errors, 1);
        assert_eq!(summary.published, 0);
        assert_eq!(summary.publish_failures, 0);
        assert_eq!(summary.written, 2);
        assert!(metrics.histogram(metrics::PUBLISH_DURATION_US).is_none());
    }

    #[tokio::test]
    async fn test_published_events_are_json_lines() {
        let publisher = JsonLinesPublisher::new("memory", Vec::new());
        let metrics = Metrics::new();
        let data = input(&[SET_LINE, TCOM_LINE]);

        run_filter(data.as_slice(), tokio::io::sink(), &publisher, &metrics)
            .await
            .unwrap();

        let events = String::from_utf8(publisher.into_inner()).unwrap();
        let events: Vec<serde_json::Value> = events
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["node_values"][2], "1");
        assert_eq!(events[0]["time_stamp"], 1_569_515_700);
        assert_eq!(events[1]["operand"], "TCOM");
        assert!(events[1].get("global").is_none());
    }

    #[tokio::test]
    async fn test_non_utf8_line_does_not_stop_the_run() {
        let publisher = JsonLinesPublisher::new("memory", Vec::new());
        let metrics = Metrics::new();
        let latin1 = b"05\\65282,59700\\28\\0\\0\\28\\0\\0\\0\\0\\^ACN(1234,51)=\"caf\xe9|1\"";
        let tstart = b"08\\65287,62154\\3\\0\\0\\3\\0\\0";

        let mut data = Vec::new();
        for line in [SET_LINE.as_bytes(), &latin1[..], &tstart[..]] {
            data.extend_from_slice(line);
            data.push(b'\n');
        }
        let mut output = Vec::new();

        let summary = run_filter(data.as_slice(), &mut output, &publisher, &metrics)
            .await
            .unwrap();

        assert_eq!(summary.lines_read, 3);
        assert_eq!(summary.parse_errors, 0);
        assert_eq!(summary.published, 3);
        assert_eq!(summary.written, 3);
        // the echo keeps the original bytes
        assert_eq!(output, data);

        let events = String::from_utf8(publisher.into_inner()).unwrap();
        let events: Vec<serde_json::Value> = events
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(events[1]["node_values"][0], "caf\u{fffd}");
        assert_eq!(events[2]["operand"], "TSTART");
    }

    #[tokio::test]
    async fn test_empty_input() {
        let metrics = Metrics::new();
        let summary = run_filter(&b""[..], tokio::io::sink(), &DisabledPublisher, &metrics)
            .await
            .unwrap();
        assert_eq!(summary, FilterSummary::default());
    }
}
