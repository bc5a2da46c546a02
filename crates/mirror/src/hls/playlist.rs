// HLS playlist tokenizer: turns manifest text into header directives and an
// ordered list of body entries, advancing the shared timeline as it goes.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, trace};

use crate::hls::error::PlaylistError;
use crate::hls::timeline::{TimelineState, segment_duration};

const EXTM3U: &str = "#EXTM3U";
const MEDIA_SEQUENCE_TAG: &str = "#EXT-X-MEDIA-SEQUENCE";
const HEADER_TAGS: [&str; 3] = [
    "#EXT-X-VERSION",
    "#EXT-X-TARGETDURATION",
    "#EXT-X-DISCONTINUITY-SEQUENCE",
];
const AES_KEY_MARKER: &str = "#EXT-X-KEY:METHOD=AES-128";
const KEY_URI_ATTR: &str = "URI=";
const PROGRAM_DATE_TIME_TAG: &str = "#EXT-X-PROGRAM-DATE-TIME";
const EXTINF_PREFIX: &str = "#EXTINF:";

// Tags that describe the whole playlist and never precede a segment URI.
const PLAYLIST_TAGS: [&str; 8] = [
    "#EXT-X-ENDLIST",
    "#EXT-X-PLAYLIST-TYPE",
    "#EXT-X-INDEPENDENT-SEGMENTS",
    "#EXT-X-ALLOW-CACHE",
    "#EXT-X-START",
    "#EXT-X-I-FRAMES-ONLY",
    "#EXT-X-SERVER-CONTROL",
    "#EXT-X-PART-INF",
];

/// Global directives, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestHeader {
    lines: Vec<String>,
}

impl ManifestHeader {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn push(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}

/// A media segment: its leading directives plus the resolved URI line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentEntry {
    pub directive_lines: Vec<String>,
    /// AES-128 key lines inside the group, keyed by their index in `directive_lines`.
    pub keys: Vec<(usize, KeyDirective)>,
    pub url: String,
    /// Segment counter after this segment's `#EXTINF` lines were applied.
    pub segment_index: u64,
    /// Program time after this segment's `#EXTINF` lines were applied.
    pub program_timestamp: DateTime<Utc>,
}

/// An `#EXT-X-KEY:METHOD=AES-128` line split around its `URI=` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDirective {
    pub raw_line: String,
    /// Everything up to and including `URI=`.
    pub prefix: String,
    /// The URI as written in the playlist, without quotes.
    pub uri: String,
    /// Attributes following the URI value, e.g. `,IV=0x...`.
    pub suffix: String,
    /// `uri` resolved against the playlist host.
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampDirective {
    pub raw_line: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyEntry {
    Segment(SegmentEntry),
    Key(KeyDirective),
    Timestamp(TimestampDirective),
    Blank,
    Opaque(String),
}

impl BodyEntry {
    /// The manifest lines this entry was built from.
    pub fn source_lines(&self) -> Vec<&str> {
        match self {
            BodyEntry::Segment(segment) => segment
                .directive_lines
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(segment.url.as_str()))
                .collect(),
            BodyEntry::Key(key) => vec![key.raw_line.as_str()],
            BodyEntry::Timestamp(ts) => vec![ts.raw_line.as_str()],
            BodyEntry::Blank => vec![""],
            BodyEntry::Opaque(line) => vec![line.as_str()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedManifest {
    pub header: ManifestHeader,
    pub body: Vec<BodyEntry>,
}

impl ParsedManifest {
    pub fn segment_count(&self) -> usize {
        self.body
            .iter()
            .filter(|entry| matches!(entry, BodyEntry::Segment(_)))
            .count()
    }
}

/// What a single manifest line is, independent of where it appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Header,
    /// `#EXT-X-MEDIA-SEQUENCE`, with its value.
    MediaSequence(&'a str),
    Key,
    /// `#EXT-X-PROGRAM-DATE-TIME`, with its value.
    ProgramDateTime(&'a str),
    PlaylistTag,
    /// Any other `#` line; opens or continues a segment group.
    Directive,
    Blank,
    Literal,
}

pub fn classify(line: &str) -> LineKind<'_> {
    if line == EXTM3U {
        return LineKind::Header;
    }

    if let Some(name) = line.rfind(':').map(|idx| &line[..idx]) {
        if name == MEDIA_SEQUENCE_TAG {
            return LineKind::MediaSequence(&line[name.len() + 1..]);
        }
        if HEADER_TAGS.contains(&name) {
            return LineKind::Header;
        }
    }

    if line.contains(AES_KEY_MARKER) && line.contains(KEY_URI_ATTR) {
        return LineKind::Key;
    }

    if line.contains(PROGRAM_DATE_TIME_TAG) {
        let value = line.split_once(':').map_or("", |(_, value)| value);
        return LineKind::ProgramDateTime(value);
    }

    if line.starts_with('#') {
        let tag = line.split_once(':').map_or(line, |(tag, _)| tag);
        if PLAYLIST_TAGS.contains(&tag) {
            return LineKind::PlaylistTag;
        }
        return LineKind::Directive;
    }

    if line.trim().is_empty() {
        return LineKind::Blank;
    }

    LineKind::Literal
}

/// Tokenize `raw` into header and body, updating `timeline` in place.
///
/// `host_base` is the `scheme://host[:port]` that relative URIs are joined to.
pub fn parse_manifest(
    host_base: &str,
    raw: &str,
    timeline: &mut TimelineState,
) -> Result<ParsedManifest, PlaylistError> {
    let mut manifest = ParsedManifest::default();
    let mut lines = raw.lines().enumerate().map(|(idx, line)| (idx + 1, line));

    while let Some((line_no, line)) = lines.next() {
        let entry = match classify(line) {
            LineKind::Header => {
                manifest.header.push(line);
                continue;
            }
            LineKind::MediaSequence(value) => {
                let sequence = value.trim().parse::<u64>().map_err(|_| {
                    PlaylistError::InvalidMediaSequence {
                        line: line_no,
                        value: value.to_string(),
                    }
                })?;
                timeline.set_media_sequence(sequence);
                manifest.header.push(line);
                continue;
            }
            LineKind::Key => BodyEntry::Key(parse_key(host_base, line)),
            LineKind::ProgramDateTime(value) => {
                let timestamp = program_date_time(line_no, value)?;
                timeline.set_program_time(timestamp);
                BodyEntry::Timestamp(TimestampDirective {
                    raw_line: line.to_string(),
                    timestamp,
                })
            }
            LineKind::Directive => {
                BodyEntry::Segment(collect_segment(host_base, line_no, line, &mut lines, timeline)?)
            }
            LineKind::Blank => BodyEntry::Blank,
            LineKind::PlaylistTag | LineKind::Literal => BodyEntry::Opaque(line.to_string()),
        };
        trace!(?entry, "Parsed manifest entry");
        manifest.body.push(entry);
    }

    debug!(
        header_lines = manifest.header.lines().len(),
        body_entries = manifest.body.len(),
        segments = manifest.segment_count(),
        segment_counter = timeline.segment_counter(),
        "Parsed manifest"
    );
    Ok(manifest)
}

fn collect_segment<'a>(
    host_base: &str,
    opened_at: usize,
    first: &str,
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
    timeline: &mut TimelineState,
) -> Result<SegmentEntry, PlaylistError> {
    let mut directive_lines = Vec::new();
    let mut keys = Vec::new();
    apply_segment_directive(opened_at, first, timeline)?;
    directive_lines.push(first.to_string());

    loop {
        let Some((line_no, line)) = lines.next() else {
            return Err(PlaylistError::UnterminatedSegment { line: opened_at });
        };

        if line.trim().is_empty() {
            return Err(PlaylistError::UnterminatedSegment { line: opened_at });
        }

        if line.starts_with('#') {
            if classify(line) == LineKind::Key {
                keys.push((directive_lines.len(), parse_key(host_base, line)));
            } else {
                apply_segment_directive(line_no, line, timeline)?;
            }
            directive_lines.push(line.to_string());
            continue;
        }

        let (segment_index, program_timestamp) = timeline.snapshot();
        return Ok(SegmentEntry {
            directive_lines,
            keys,
            url: resolve_uri(host_base, line),
            segment_index,
            program_timestamp,
        });
    }
}

// Timeline effects of a directive that travels inside a segment group.
fn apply_segment_directive(
    line_no: usize,
    line: &str,
    timeline: &mut TimelineState,
) -> Result<(), PlaylistError> {
    if let Some(rest) = line.strip_prefix(EXTINF_PREFIX) {
        let value = rest.split_once(',').map_or(rest, |(seconds, _)| seconds);
        let duration = value
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(segment_duration)
            .ok_or_else(|| PlaylistError::InvalidDuration {
                line: line_no,
                value: value.to_string(),
            })?;
        timeline.advance(duration);
    } else if line.contains(PROGRAM_DATE_TIME_TAG) {
        let value = line.split_once(':').map_or("", |(_, value)| value);
        timeline.set_program_time(program_date_time(line_no, value)?);
    }
    Ok(())
}

fn parse_key(host_base: &str, line: &str) -> KeyDirective {
    let (left, right) = line.split_once(KEY_URI_ATTR).unwrap_or((line, ""));

    let (uri, suffix) = match right.strip_prefix('"') {
        Some(quoted) => match quoted.find('"') {
            Some(end) => (&quoted[..end], &quoted[end + 1..]),
            None => (quoted, ""),
        },
        None => match right.find(',') {
            Some(end) => (&right[..end], &right[end..]),
            None => (right, ""),
        },
    };

    KeyDirective {
        raw_line: line.to_string(),
        prefix: format!("{left}{KEY_URI_ATTR}"),
        uri: uri.to_string(),
        suffix: suffix.to_string(),
        url: resolve_uri(host_base, uri),
    }
}

fn program_date_time(line_no: usize, value: &str) -> Result<DateTime<Utc>, PlaylistError> {
    parse_program_date_time(value).ok_or_else(|| PlaylistError::InvalidTimestamp {
        line: line_no,
        value: value.to_string(),
    })
}

/// Parse an ISO-8601 program date-time. A value without a zone is UTC.
pub fn parse_program_date_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(ts.with_timezone(&Utc));
    }
    let naive = value.strip_suffix('Z').unwrap_or(value);
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|ts| ts.and_utc())
}

/// Join a playlist URI to the host base unless it is already absolute.
pub fn resolve_uri(host_base: &str, uri: &str) -> String {
    let is_absolute = uri
        .get(..4)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("http"));
    if is_absolute {
        uri.to_string()
    } else {
        format!(
            "{}/{}",
            host_base.trim_end_matches('/'),
            uri.trim_start_matches('/')
        )
    }
}
