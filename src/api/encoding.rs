//! Response encoding
//!
//! Three response modes: plain (raw string or JSON), compressed JSON
//! negotiated through `Accept-Encoding`, and binary protobuf requested
//! through a custom header. Compression is opportunistic: a client that
//! advertises neither gzip nor deflate gets plain JSON.

use std::io::Write;

use axum::body::Body as AxumBody;
use axum::http::header::{HeaderName, HeaderValue, ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use flate2::write::{DeflateEncoder, GzEncoder};
use flate2::Compression;

use crate::error::{Error, Result};

/// Request/response header negotiating the binary format
pub const BINARY_FORMAT_HEADER: &str = "binary-format";

/// The only binary format currently spoken
pub const BINARY_FORMAT_PROTOBUF: &str = "protobuf";

const CONTENT_TYPE_JSON: &str = "application/json";
const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

/// Response payload before encoding
pub enum Body {
    /// No payload; the wire body is `{}`
    Empty,
    /// Pre-rendered string, written as-is
    Raw(String),
    /// JSON-encoded structure
    Json(serde_json::Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Gzip,
    Deflate,
}

/// Plain response without compression
pub fn respond(status: StatusCode, body: Body) -> Response {
    match body {
        Body::Empty => raw_response(status, None, b"{}".to_vec()),
        Body::Raw(text) => raw_response(status, None, text.into_bytes()),
        Body::Json(value) => match serde_json::to_vec(&value) {
            Ok(bytes) => raw_response(status, Some(CONTENT_TYPE_JSON), bytes),
            Err(e) => Error::from(e).into_response(),
        },
    }
}

/// Compressed response if the client advertises support for it
pub fn respond_compressed(request_headers: &HeaderMap, status: StatusCode, body: Body) -> Response {
    let Some(encoding) = negotiate(request_headers) else {
        return respond(status, body);
    };

    let (content_type, source) = match body {
        Body::Empty => return respond(status, Body::Empty),
        Body::Raw(text) => (None, text.into_bytes()),
        Body::Json(value) => match serde_json::to_vec(&value) {
            Ok(bytes) => (Some(CONTENT_TYPE_JSON), bytes),
            Err(e) => return Error::from(e).into_response(),
        },
    };

    let compressed = match compress_data(encoding == Encoding::Deflate, &source) {
        Ok(bytes) => bytes,
        Err(e) => return e.into_response(),
    };

    let mut response = raw_response(status, content_type, compressed);
    let value = match encoding {
        Encoding::Gzip => HeaderValue::from_static("gzip"),
        Encoding::Deflate => HeaderValue::from_static("deflate"),
    };
    response.headers_mut().insert(CONTENT_ENCODING, value);
    response
}

/// Binary protobuf response, optionally gzip-compressed
pub fn respond_binary(status: StatusCode, data: Vec<u8>, compress: bool) -> Response {
    let (content_type, bytes) = if compress {
        match compress_data(false, &data) {
            Ok(compressed) => (None, compressed),
            Err(e) => return e.into_response(),
        }
    } else {
        (Some(CONTENT_TYPE_OCTET_STREAM), data)
    };

    let mut response = raw_response(status, content_type, bytes);
    response.headers_mut().insert(
        HeaderName::from_static(BINARY_FORMAT_HEADER),
        HeaderValue::from_static(BINARY_FORMAT_PROTOBUF),
    );
    response
}

/// Pick a compression encoding from `Accept-Encoding`. gzip wins over
/// deflate; q-values are ignored.
fn negotiate(headers: &HeaderMap) -> Option<Encoding> {
    let accepted = headers.get(ACCEPT_ENCODING)?.to_str().ok()?;

    let mut deflate = false;
    for token in accepted.split(',') {
        let token = token.split(';').next().unwrap_or("").trim();
        match token {
            "gzip" => return Some(Encoding::Gzip),
            "deflate" => deflate = true,
            _ => {}
        }
    }

    deflate.then_some(Encoding::Deflate)
}

/// Compress a byte buffer with gzip or deflate at the fastest level
pub fn compress_data(deflate: bool, data: &[u8]) -> Result<Vec<u8>> {
    if deflate {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    } else {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }
}

fn raw_response(status: StatusCode, content_type: Option<&'static str>, body: Vec<u8>) -> Response {
    let mut response = Response::new(AxumBody::from(body));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    response
}
