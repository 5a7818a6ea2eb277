/// Response format negotiation
///
/// Handlers always produce JSON. When a client asks for XML through the
/// `Accept` header, this middleware re-encodes JSON responses as XML:
///
/// ```text
/// {"projects": [{"id": "…", "title": "A"}], "pagination": {"total": 1}}
/// ```
///
/// becomes
///
/// ```xml
/// <?xml version="1.0" encoding="UTF-8"?>
/// <response>
///     <projects>
///         <id>…</id>
///         <title>A</title>
///     </projects>
///     <pagination>
///         <total>1</total>
///     </pagination>
/// </response>
/// ```
///
/// Arrays inside objects repeat their element name, arrays at the root or
/// nested in other arrays use `<item>`, and `null` becomes an empty element.

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use serde_json::Value;

use crate::error::ApiError;

/// Root element of every XML document
pub const ROOT_ELEMENT: &str = "response";

const ARRAY_ITEM_ELEMENT: &str = "item";

/// Error raised while writing XML
#[derive(Debug, thiserror::Error)]
#[error("Failed to write XML: {0}")]
pub struct XmlError(String);

/// Whether the client prefers XML over JSON
pub fn wants_xml(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| {
            let accept = accept.to_ascii_lowercase();
            accept.contains("application/xml") || accept.contains("text/xml")
        })
        .unwrap_or(false)
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false)
}

/// Turns a JSON key into a valid XML element name
fn element_name(key: &str) -> String {
    let mut name: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if !name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        name.insert(0, '_');
    }

    name
}

fn write_err(err: impl std::fmt::Display) -> XmlError {
    XmlError(err.to_string())
}

fn write_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> Result<(), XmlError> {
    match value {
        Value::Null => {
            writer
                .write_event(Event::Empty(BytesStart::new(name)))
                .map_err(write_err)?;
        }
        Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(write_err)?;
            writer
                .write_event(Event::Text(BytesText::new(&text)))
                .map_err(write_err)?;
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(write_err)?;
        }
        Value::Object(map) => {
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(write_err)?;
            for (key, child) in map {
                let child_name = element_name(key);
                match child {
                    Value::Array(items) => {
                        for item in items {
                            write_element(writer, &child_name, item)?;
                        }
                    }
                    other => write_element(writer, &child_name, other)?,
                }
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(write_err)?;
        }
        Value::Array(items) => {
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(write_err)?;
            for item in items {
                write_element(writer, ARRAY_ITEM_ELEMENT, item)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(write_err)?;
        }
    }

    Ok(())
}

/// Serializes a JSON value as an XML document rooted at `<response>`
pub fn json_to_xml(value: &Value) -> Result<String, XmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(write_err)?;
    write_element(&mut writer, ROOT_ELEMENT, value)?;

    String::from_utf8(writer.into_inner()).map_err(write_err)
}

/// Middleware re-encoding JSON responses as XML when requested
pub async fn negotiate_format(req: Request, next: Next) -> Response {
    let xml = wants_xml(req.headers());
    let response = next.run(req).await;

    if !xml || !is_json(response.headers()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return ApiError::InternalError(format!("Failed to read response body: {}", e))
                .into_response()
        }
    };

    let encoded = serde_json::from_slice::<Value>(&bytes)
        .map_err(write_err)
        .and_then(|value| json_to_xml(&value));

    match encoded {
        Ok(document) => {
            parts.headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/xml; charset=utf-8"),
            );
            parts.headers.remove(header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(document))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Falling back to JSON response");
            Response::from_parts(parts, Body::from(bytes))
        }
    }
}
