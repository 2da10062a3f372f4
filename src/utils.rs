use http::header::{HeaderMap, HeaderName, HeaderValue};
use httparse::{parse_headers, Status, EMPTY_HEADER};

use crate::{Error, Result};

pub(crate) const MAX_HEADERS: usize = 8 * 2;
pub(crate) const DASHES: [u8; 2] = [b'-', b'-']; // `--`
pub(crate) const CRLF: [u8; 2] = [b'\r', b'\n']; // `\r\n`
pub(crate) const CRLFS: [u8; 4] = [b'\r', b'\n', b'\r', b'\n']; // `\r\n\r\n`

const NAME: &str = "name";
const FILE_NAME: &str = "filename";
const FORM_DATA: &str = "form-data";

pub(crate) fn parse_content_type(header: Option<&HeaderValue>) -> Option<mime::Mime> {
    header
        .map(HeaderValue::to_str)
        .and_then(Result::ok)
        .map(str::parse)
        .and_then(Result::ok)
}

/// Extracts the `boundary` parameter of a `multipart/form-data` content-type.
pub(crate) fn parse_boundary(content_type: &str) -> Result<String> {
    content_type
        .parse::<mime::Mime>()
        .ok()
        .and_then(|m| m.get_param(mime::BOUNDARY).map(|b| b.as_str().to_owned()))
        .filter(|b| !b.is_empty())
        .ok_or(Error::MissingBoundary)
}

pub(crate) fn parse_part_headers(bytes: &[u8]) -> Result<HeaderMap> {
    let mut headers = [EMPTY_HEADER; MAX_HEADERS];
    match parse_headers(bytes, &mut headers) {
        Ok(Status::Complete((_, hs))) => {
            let mut header_map = HeaderMap::with_capacity(hs.len());
            for h in hs {
                header_map.append(
                    HeaderName::from_bytes(h.name.as_bytes()).map_err(|_| Error::InvalidHeader)?,
                    HeaderValue::from_bytes(h.value).map_err(|_| Error::InvalidHeader)?,
                );
            }
            Ok(header_map)
        }
        Ok(Status::Partial) | Err(_) => Err(Error::InvalidHeader),
    }
}

/// Parses `form-data; name="a[b]"; filename="c.txt"` into `(name, filename)`.
///
/// Parameter order is free and quoted values may contain `;`.
pub(crate) fn parse_content_disposition(hv: &[u8]) -> Result<(String, Option<String>)> {
    let hv = String::from_utf8_lossy(hv);
    let mut params = split_params(&hv).into_iter();

    match params.next() {
        Some(kind) if kind.trim().eq_ignore_ascii_case(FORM_DATA) => {}
        _ => return Err(Error::InvalidContentDisposition),
    }

    let mut name = None;
    let mut filename = None;

    for param in params {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let value = unquote(value.trim());
        match key.trim() {
            k if k.eq_ignore_ascii_case(NAME) => {
                name.get_or_insert(value);
            }
            k if k.eq_ignore_ascii_case(FILE_NAME) => {
                filename.get_or_insert(value);
            }
            _ => {}
        }
    }

    match name {
        Some(name) if !name.is_empty() => Ok((name, filename)),
        _ => Err(Error::InvalidContentDisposition),
    }
}

fn split_params(s: &str) -> Vec<&str> {
    let mut params = Vec::with_capacity(3);
    let mut quoted = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => {
                params.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(&s[start..]);

    params
}

fn unquote(s: &str) -> String {
    match s.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => {
            let mut out = String::with_capacity(inner.len());
            let mut chars = inner.chars();
            while let Some(c) = chars.next() {
                // browsers escape `"` but leave `\` of windows paths alone
                if c == '\\' && chars.as_str().starts_with('"') {
                    continue;
                }
                out.push(c);
            }
            out
        }
        None => s.to_owned(),
    }
}

/// Last path component of a client supplied filename.
pub(crate) fn basename(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
}
