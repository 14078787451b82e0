use axum::http::HeaderMap;
use bytes::Bytes;
use serde_json::{Map, Value};

/// A file part of a multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Decoded request body: scalar fields plus any uploaded files.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    pub fields: Map<String, Value>,
    pub files: Vec<UploadedFile>,
}

impl FormData {
    /// Text of a scalar field. Numbers and booleans are rendered as text so
    /// JSON and multipart callers look the same to handlers.
    pub fn text(&self, name: &str) -> Option<String> {
        match self.fields.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Remove and return the first non-empty file uploaded under `name`.
    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        let pos = self
            .files
            .iter()
            .position(|f| f.field == name && !f.bytes.is_empty())?;
        Some(self.files.remove(pos))
    }

    /// The `data` payload, accepted either as a nested object or as a JSON
    /// string (multipart clients send it serialized).
    pub fn payload(&self) -> Result<Option<Value>, String> {
        match self.fields.get("data") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => {
                let value: Value =
                    serde_json::from_str(s).map_err(|e| format!("Invalid data JSON: {e}"))?;
                expect_object(value).map(Some)
            }
            Some(other) => expect_object(other.clone()).map(Some),
        }
    }
}

fn expect_object(value: Value) -> Result<Value, String> {
    if value.is_object() {
        Ok(value)
    } else {
        Err("data must be a JSON object".to_string())
    }
}

/// Parse a request body based on its Content-Type header.
pub async fn parse_request(headers: &HeaderMap, body: Bytes) -> Result<FormData, String> {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json");

    if content_type.contains("multipart/form-data") {
        parse_multipart(content_type, body).await
    } else {
        parse_json(&body)
    }
}

fn parse_json(body: &[u8]) -> Result<FormData, String> {
    if body.is_empty() {
        return Ok(FormData::default());
    }
    match serde_json::from_slice(body).map_err(|e| format!("Invalid JSON: {e}"))? {
        Value::Object(fields) => Ok(FormData {
            fields,
            files: Vec::new(),
        }),
        _ => Err("Request body must be a JSON object".to_string()),
    }
}

/// Parse multipart form data using multer.
async fn parse_multipart(content_type: &str, body: Bytes) -> Result<FormData, String> {
    let boundary =
        multer::parse_boundary(content_type).map_err(|_| "Missing multipart boundary".to_string())?;

    let stream = futures_util::stream::once(async { Ok::<_, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut form = FormData::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Multipart error: {e}"))?
    {
        let name = field.name().unwrap_or("unknown").to_string();
        if let Some(file_name) = field.file_name().map(str::to_string) {
            let content_type = field.content_type().map(|m| m.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| format!("File read error: {e}"))?;
            form.files.push(UploadedFile {
                field: name,
                file_name,
                content_type,
                bytes,
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| format!("Field read error: {e}"))?;
            form.fields.insert(name, Value::String(value));
        }
    }

    Ok(form)
}
