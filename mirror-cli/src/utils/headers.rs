use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, warn};

/// Parse one `Name: Value` argument.
///
/// Values are not logged since request headers commonly carry cookies or
/// tokens for the stream.
fn parse_header(header_str: &str) -> Option<(HeaderName, HeaderValue)> {
    let Some((name, value)) = header_str.split_once(':') else {
        warn!("Invalid header format: '{header_str}'. Expected 'Name: Value'");
        return None;
    };
    let name = name.trim();

    let Ok(header_name) = HeaderName::from_bytes(name.as_bytes()) else {
        warn!("Invalid header name: '{name}'");
        return None;
    };
    let Ok(header_value) = HeaderValue::from_str(value.trim()) else {
        warn!("Invalid value for header '{name}'");
        return None;
    };

    debug!("Adding request header: {name}");
    Some((header_name, header_value))
}

/// Parse repeated `-H` arguments, skipping malformed ones.
pub fn parse_headers(header_strings: &[String]) -> HeaderMap {
    header_strings
        .iter()
        .filter_map(|header_str| parse_header(header_str))
        .collect()
}
