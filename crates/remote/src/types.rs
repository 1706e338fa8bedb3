//! Bot API response envelopes.

use serde::{Deserialize, Deserializer};

/// The `{ "ok": bool, "result": …, "description": … }` wrapper every Bot API
/// method returns.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub ok: bool,
    #[serde(default = "Option::default")]
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Error-only view of an envelope, used for non-200 bodies and for methods
/// whose result is ignored.
#[derive(Debug, Deserialize)]
pub struct BareEnvelope {
    pub ok: bool,
    #[serde(default)]
    pub description: Option<String>,
}

/// `result` of `getFile`.
#[derive(Debug, Deserialize)]
pub struct RemoteFile {
    #[serde(default)]
    pub file_path: Option<String>,
}

/// `result` of `sendDocument`.
#[derive(Debug, Deserialize)]
pub struct SentMessage {
    #[serde(deserialize_with = "string_or_number")]
    pub message_id: String,
    #[serde(default)]
    pub document: Option<DocumentInfo>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentInfo {
    #[serde(deserialize_with = "string_or_number")]
    pub file_id: String,
}

/// Accepts an identifier encoded either as a JSON string or a JSON number.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
        Uint(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
        Id::Uint(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_document_result() {
        let json = r#"{"ok":true,"result":{"message_id":77,"date":1,
            "document":{"file_id":"BQACAgIAAx","file_unique_id":"x","file_size":3}}}"#;
        let env: Envelope<SentMessage> = serde_json::from_str(json).unwrap();
        assert!(env.ok);
        let msg = env.result.unwrap();
        assert_eq!(msg.message_id, "77");
        assert_eq!(msg.document.unwrap().file_id, "BQACAgIAAx");
    }

    #[test]
    fn accepts_string_message_id() {
        let json = r#"{"ok":true,"result":{"message_id":"12","document":{"file_id":"f"}}}"#;
        let env: Envelope<SentMessage> = serde_json::from_str(json).unwrap();
        assert_eq!(env.result.unwrap().message_id, "12");
    }

    #[test]
    fn parses_error_envelope() {
        let json = r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#;
        let env: Envelope<RemoteFile> = serde_json::from_str(json).unwrap();
        assert!(!env.ok);
        assert!(env.result.is_none());
        assert_eq!(env.description.as_deref(), Some("Bad Request: chat not found"));
    }

    #[test]
    fn bare_envelope_ignores_result() {
        let env: BareEnvelope = serde_json::from_str(r#"{"ok":true,"result":true}"#).unwrap();
        assert!(env.ok);
        assert!(env.description.is_none());
    }
}
