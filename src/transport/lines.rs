use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use std::io;
use std::pin::Pin;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tokio_util::io::StreamReader;

type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Why a line could not be delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    /// Over the length cap or not UTF-8; the stream carries on after it
    Malformed(String),
    /// The connection failed; nothing more will arrive
    Interrupted(String),
}

/// Newline-delimited view of a response body, capped per line.
pub struct FramedLines {
    frames: FramedRead<StreamReader<ByteStream, Bytes>, LinesCodec>,
    /// FramedRead yields one `None` after a decode error before resuming
    resume_after_error: bool,
}

impl FramedLines {
    pub fn new(body: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static, max_line_bytes: usize) -> Self {
        let body: ByteStream = Box::pin(body.map_err(io::Error::other));
        Self {
            frames: FramedRead::new(StreamReader::new(body), LinesCodec::new_with_max_length(max_line_bytes)),
            resume_after_error: false,
        }
    }

    /// Next line without its terminator, `None` once the body is drained
    pub async fn next_line(&mut self) -> Option<Result<String, LineError>> {
        let mut next = self.frames.next().await;
        if next.is_none() && std::mem::take(&mut self.resume_after_error) {
            next = self.frames.next().await;
        }

        match next? {
            Ok(line) => Some(Ok(line)),
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                self.resume_after_error = true;
                Some(Err(LineError::Malformed("line exceeds maximum length".to_string())))
            }
            Err(LinesCodecError::Io(e)) if e.kind() == io::ErrorKind::InvalidData => {
                self.resume_after_error = true;
                Some(Err(LineError::Malformed(e.to_string())))
            }
            Err(LinesCodecError::Io(e)) => Some(Err(LineError::Interrupted(format!("stream interrupted: {}", e)))),
        }
    }
}
