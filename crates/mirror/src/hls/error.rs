/// Structural problems found while tokenizing a manifest.
///
/// Line numbers are 1-based and refer to the fetched manifest text.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PlaylistError {
    #[error("segment directives opened at line {line} are not followed by a URI")]
    UnterminatedSegment { line: usize },
    #[error("invalid media sequence `{value}` at line {line}")]
    InvalidMediaSequence { line: usize, value: String },
    #[error("invalid segment duration `{value}` at line {line}")]
    InvalidDuration { line: usize, value: String },
    #[error("invalid program date-time `{value}` at line {line}")]
    InvalidTimestamp { line: usize, value: String },
}
