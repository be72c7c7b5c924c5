//! `multipart/form-data` parser for uploads.
//!
//! Works on the already-collected body. Text fields are kept by name; parts
//! carrying a `filename` are kept as files.

use std::collections::HashMap;

use bytes::Bytes;

use crate::error::HttpError;

/// One uploaded file part.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// Form field name.
    pub field: String,
    /// Client-side file name from `Content-Disposition`.
    pub filename: String,
    /// Part `Content-Type`, if the client sent one.
    pub content_type: Option<String>,
    /// File bytes.
    pub data: Bytes,
}

/// A parsed form submission.
#[derive(Debug, Default)]
pub struct MultipartForm {
    /// Non-file fields (name → value).
    pub fields: HashMap<String, String>,
    /// File parts in body order.
    pub files: Vec<FilePart>,
}

impl MultipartForm {
    /// The first file submitted under `field`.
    #[must_use]
    pub fn file(&self, field: &str) -> Option<&FilePart> {
        self.files.iter().find(|f| f.field == field)
    }
}

/// Extract the boundary from a `multipart/form-data; boundary=...` content type.
///
/// # Errors
///
/// [`HttpError::UnsupportedMediaType`] if the content type is not
/// `multipart/form-data`, [`HttpError::BadRequest`] if the boundary is missing.
pub fn extract_boundary(content_type: &str) -> Result<String, HttpError> {
    if !content_type
        .to_ascii_lowercase()
        .starts_with("multipart/form-data")
    {
        return Err(HttpError::UnsupportedMediaType(format!(
            "Expected multipart/form-data, got: {content_type}"
        )));
    }

    for part in content_type.split(';') {
        let trimmed = part.trim();
        let Some((name, value)) = trimmed.split_once('=') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("boundary") {
            let boundary = value.trim().trim_matches('"');
            if boundary.is_empty() {
                return Err(HttpError::bad_request("Empty boundary in Content-Type"));
            }
            return Ok(boundary.to_owned());
        }
    }

    Err(HttpError::bad_request("Missing boundary in Content-Type"))
}

/// Parse a `multipart/form-data` body.
///
/// # Errors
///
/// [`HttpError::BadRequest`] if no part could be found.
pub fn parse_multipart(body: &Bytes, boundary: &str) -> Result<MultipartForm, HttpError> {
    let delimiter = format!("--{boundary}");
    let mut form = MultipartForm::default();
    let mut seen_any = false;

    for (offset, part) in split_parts(body, delimiter.as_bytes()) {
        let Some(split) = find_bytes(part, b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&part[..split]);
        let content_start = offset + split + 4;
        let content_end = offset + part.len();

        let Some(field) = header_param(&headers, "content-disposition", "name") else {
            continue;
        };
        seen_any = true;

        match header_param(&headers, "content-disposition", "filename") {
            Some(filename) => form.files.push(FilePart {
                field,
                filename,
                content_type: header_value(&headers, "content-type"),
                data: body.slice(content_start..content_end),
            }),
            None => {
                let value = String::from_utf8_lossy(&body[content_start..content_end]);
                form.fields.insert(field, value.into_owned());
            }
        }
    }

    if seen_any {
        Ok(form)
    } else {
        Err(HttpError::bad_request("Malformed multipart body"))
    }
}

/// Split the body on `delimiter`, returning each part with its byte offset.
///
/// The CRLF that precedes every delimiter belongs to the delimiter, not the
/// part content, so it is stripped.
fn split_parts<'a>(body: &'a [u8], delimiter: &[u8]) -> Vec<(usize, &'a [u8])> {
    let mut parts = Vec::new();
    let Some(first) = find_bytes(body, delimiter) else {
        return parts;
    };

    let mut cursor = first + delimiter.len();
    loop {
        let rest = &body[cursor..];
        if rest.starts_with(b"--") {
            break;
        }
        let start = cursor + if rest.starts_with(b"\r\n") { 2 } else { 0 };

        let Some(next) = find_bytes(&body[start..], delimiter) else {
            break;
        };
        let mut end = start + next;
        if body[start..end].ends_with(b"\r\n") {
            end -= 2;
        }
        parts.push((start, &body[start..end]));
        cursor = start + next + delimiter.len();
    }
    parts
}

/// Value of a header line (case-insensitive name) in a part's header block.
fn header_value(headers: &str, name: &str) -> Option<String> {
    headers.split("\r\n").find_map(|line| {
        let (n, v) = line.split_once(':')?;
        n.trim()
            .eq_ignore_ascii_case(name)
            .then(|| v.trim().to_owned())
    })
}

/// A `param="value"` (or unquoted) parameter of a header.
fn header_param(headers: &str, header: &str, param: &str) -> Option<String> {
    let value = header_value(headers, header)?;
    value.split(';').skip(1).find_map(|segment| {
        let (k, v) = segment.split_once('=')?;
        k.trim()
            .eq_ignore_ascii_case(param)
            .then(|| v.trim().trim_matches('"').to_owned())
    })
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn test_should_extract_boundary() {
        let ct = "multipart/form-data; boundary=----WebKitFormBoundary7MA4YWxkTrZu0gW";
        assert_eq!(
            extract_boundary(ct).unwrap(),
            "----WebKitFormBoundary7MA4YWxkTrZu0gW"
        );
        assert_eq!(
            extract_boundary(r#"multipart/form-data; boundary="abc123""#).unwrap(),
            "abc123"
        );
    }

    #[test]
    fn test_should_reject_non_multipart() {
        let err = extract_boundary("application/json").unwrap_err();
        assert_eq!(err.status(), http::StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let err = extract_boundary("multipart/form-data").unwrap_err();
        assert_eq!(err.status(), http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_should_parse_fields_and_file() {
        let raw = body(
            "------b\r\n\
             Content-Disposition: form-data; name=\"note\"\r\n\
             \r\n\
             holiday\r\n\
             ------b\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"beach.PNG\"\r\n\
             Content-Type: image/png\r\n\
             \r\n\
             \x00\x01\r\n\x02\r\n\
             ------b--\r\n",
        );

        let form = parse_multipart(&raw, "----b").unwrap();
        assert_eq!(form.fields.get("note").map(String::as_str), Some("holiday"));
        let file = form.file("file").unwrap();
        assert_eq!(file.filename, "beach.PNG");
        assert_eq!(file.content_type.as_deref(), Some("image/png"));
        assert_eq!(file.data.as_ref(), b"\x00\x01\r\n\x02");
    }

    #[test]
    fn test_should_treat_part_without_filename_as_field() {
        let raw = body(
            "--x\r\n\
             Content-Disposition: form-data; name=\"file\"\r\n\
             \r\n\
             not a file\r\n\
             --x--\r\n",
        );
        let form = parse_multipart(&raw, "x").unwrap();
        assert!(form.file("file").is_none());
        assert_eq!(form.fields.get("file").map(String::as_str), Some("not a file"));
    }

    #[test]
    fn test_should_reject_body_without_parts() {
        assert!(parse_multipart(&body("garbage"), "x").is_err());
        assert!(parse_multipart(&body("--x--\r\n"), "x").is_err());
    }
}
