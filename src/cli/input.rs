use std::io::ErrorKind;

use tokio_util::{
    bytes::BytesMut,
    codec::{Decoder, LinesCodec, LinesCodecError},
};

/// Longest command line accepted. Anything longer is skipped up to the next newline.
pub const MAX_LINE_LENGTH: usize = 8 * 1024;

/// One line of session input.
#[derive(Debug, PartialEq, Eq)]
pub enum InputLine {
    Line(String),
    /// A line that was consumed but can't be a command, with the reason.
    Unreadable(String),
}

/// [LinesCodec] that keeps going after a line that isn't UTF-8 or is too long. `FramedRead` ends
/// the stream after the first decoder error, so such lines are turned into items instead.
pub struct SessionCodec {
    lines: LinesCodec,
}

impl SessionCodec {
    pub fn new() -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
        }
    }
}

impl Default for SessionCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn recover(
    decoded: Result<Option<String>, LinesCodecError>,
) -> Result<Option<InputLine>, LinesCodecError> {
    match decoded {
        Ok(line) => Ok(line.map(InputLine::Line)),
        Err(LinesCodecError::Io(e)) if e.kind() == ErrorKind::InvalidData => {
            Ok(Some(InputLine::Unreadable(e.to_string())))
        }
        Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(InputLine::Unreadable(format!(
            "line is longer than {MAX_LINE_LENGTH} bytes"
        )))),
        Err(e) => Err(e),
    }
}

impl Decoder for SessionCodec {
    type Item = InputLine;
    type Error = LinesCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<InputLine>, LinesCodecError> {
        recover(self.lines.decode(buf))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<InputLine>, LinesCodecError> {
        recover(self.lines.decode_eof(buf))
    }
}
