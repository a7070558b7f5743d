use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::sync::{Mutex, PoisonError};

use tracing::info;

use crate::config::OFF;
use crate::error::PublishError;

/// Destination for serialized CDC events.
pub trait Publisher: Send + Sync {
    /// Short name used in logs (e.g. "off", "stdout", "file").
    fn name(&self) -> &'static str;

    /// Whether events should be handed to [`Publisher::publish`] at all.
    fn is_available(&self) -> bool;

    /// Deliver one JSON event. Returns once the event is flushed.
    fn publish(&self, payload: &str) -> Result<(), PublishError>;
}

/// Publishing switched off; the filter only echoes lines.
pub struct DisabledPublisher;

impl Publisher for DisabledPublisher {
    fn name(&self) -> &'static str {
        OFF
    }

    fn is_available(&self) -> bool {
        false
    }

    fn publish(&self, _payload: &str) -> Result<(), PublishError> {
        Err(PublishError::Disabled(OFF))
    }
}

/// Newline-delimited JSON events written to any `Write` sink.
pub struct JsonLinesPublisher<W: Write + Send> {
    name: &'static str,
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesPublisher<W> {
    pub fn new(name: &'static str, writer: W) -> Self {
        Self {
            name,
            writer: Mutex::new(writer),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> Publisher for JsonLinesPublisher<W> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_available(&self) -> bool {
        true
    }

    fn publish(&self, payload: &str) -> Result<(), PublishError> {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        writer.write_all(payload.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

pub type FilePublisher = JsonLinesPublisher<BufWriter<File>>;

/// Build the publisher for a `--publish` target.
pub fn publisher_for_target(target: &str) -> Result<Box<dyn Publisher>, PublishError> {
    let target = target.trim();
    if target.is_empty() || target.eq_ignore_ascii_case(OFF) {
        info!("Publishing disabled");
        return Ok(Box::new(DisabledPublisher));
    }

    if target.eq_ignore_ascii_case("stdout") {
        info!("Publishing events to stdout");
        return Ok(Box::new(JsonLinesPublisher::new("stdout", io::stdout())));
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(target)
        .map_err(|source| PublishError::Open {
            path: target.to_string(),
            source,
        })?;
    info!("Publishing events to {}", target);
    Ok(Box::new(FilePublisher::new("file", BufWriter::new(file))))
}
