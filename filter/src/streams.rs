use tokio::fs::{File, OpenOptions};
use tokio::io::{self, AsyncBufRead, AsyncWrite, BufReader, BufWriter};
use tracing::debug;

use crate::error::FilterError;

pub type InputStream = Box<dyn AsyncBufRead + Unpin + Send>;
pub type OutputStream = Box<dyn AsyncWrite + Unpin + Send>;

/// Open the journal extract source; `stdin` (or empty) reads standard input.
pub async fn open_input(target: &str) -> Result<InputStream, FilterError> {
    if target.is_empty() || target.eq_ignore_ascii_case("stdin") {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }

    let file = File::open(target).await.map_err(|source| FilterError::OpenInput {
        path: target.to_string(),
        source,
    })?;
    debug!("Input file: {}", target);
    Ok(Box::new(BufReader::new(file)))
}

/// Open the echo target; `stdout` (or empty) writes standard output, a path
/// is opened for append.
pub async fn open_output(target: &str) -> Result<OutputStream, FilterError> {
    if target.is_empty() || target.eq_ignore_ascii_case("stdout") {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(target)
        .await
        .map_err(|source| FilterError::OpenOutput {
            path: target.to_string(),
            source,
        })?;
    debug!("Output file: {}", target);
    Ok(Box::new(BufWriter::new(file)))
}
