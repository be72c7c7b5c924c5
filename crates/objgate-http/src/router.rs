//! Route identification and query string parsing.
//!
//! Routing is a flat `(method, path)` match. Query strings are decoded into
//! ordered key/value pairs; the first occurrence of a key wins.

use percent_encoding::percent_decode_str;

use crate::error::HttpError;

/// A gateway endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `GET /health`, `GET /_health`.
    Health,
    /// `POST /upload`.
    Upload,
    /// `GET /download`.
    Download,
    /// `GET /list`.
    List,
    /// `GET /presign`.
    Presign,
    /// `DELETE /files`.
    DeleteFile,
    /// `POST /migrate`.
    Migrate,
}

impl Route {
    /// Short name used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Upload => "upload",
            Self::Download => "download",
            Self::List => "list",
            Self::Presign => "presign",
            Self::DeleteFile => "delete",
            Self::Migrate => "migrate",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a method and path to a [`Route`].
///
/// A trailing `/` is ignored.
///
/// # Errors
///
/// [`HttpError::NotFound`] for unknown paths, [`HttpError::MethodNotAllowed`]
/// when the path is known but the method is not.
pub fn resolve(method: &http::Method, path: &str) -> Result<Route, HttpError> {
    use http::Method;

    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };

    let (route, allowed) = match path {
        "/health" | "/_health" => (Route::Health, Method::GET),
        "/upload" => (Route::Upload, Method::POST),
        "/download" => (Route::Download, Method::GET),
        "/list" => (Route::List, Method::GET),
        "/presign" => (Route::Presign, Method::GET),
        "/files" => (Route::DeleteFile, Method::DELETE),
        "/migrate" => (Route::Migrate, Method::POST),
        _ => return Err(HttpError::NotFound(format!("No route for {path}"))),
    };

    if *method == allowed {
        Ok(route)
    } else {
        Err(HttpError::MethodNotAllowed {
            method: method.clone(),
            path: path.to_owned(),
        })
    }
}

/// Decoded query string parameters.
#[derive(Debug, Clone, Default)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// Parse a raw query string (without the leading `?`).
    ///
    /// `+` is treated as a space, as browsers encode form submissions that way.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let pairs = query
            .split('&')
            .filter(|s| !s.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((k, v)) => (decode_component(k), decode_component(v)),
                None => (decode_component(pair), String::new()),
            })
            .collect();
        Self(pairs)
    }

    /// Parse the query of a request URI.
    #[must_use]
    pub fn from_uri(uri: &http::Uri) -> Self {
        Self::parse(uri.query().unwrap_or_default())
    }

    /// The value of `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The value of `key`, which must be present and non-empty.
    ///
    /// # Errors
    ///
    /// [`HttpError::BadRequest`] naming the missing parameter.
    pub fn require(&self, key: &str) -> Result<&str, HttpError> {
        match self.get(key) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(HttpError::bad_request(format!("No {key} provided"))),
        }
    }
}

fn decode_component(s: &str) -> String {
    let s = s.replace('+', " ");
    percent_decode_str(&s).decode_utf8_lossy().into_owned()
}
