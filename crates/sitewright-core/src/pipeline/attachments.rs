//! Data-URI attachment decoding

use crate::models::Attachment;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use percent_encoding::percent_decode_str;
use tracing::error;

/// An attachment with its payload decoded to text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAttachment {
    pub name: String,
    pub mime_type: String,
    /// UTF-8 text, lowercase hex for binary payloads, empty when malformed
    pub content: String,
}

/// Decode a data URI.
///
/// Base64 payloads that are not UTF-8 come back as lowercase hex. Anything
/// that is not a `data:` URI is returned verbatim, and malformed data URIs
/// decode to an empty string.
pub fn decode_data_uri(uri: &str) -> String {
    let Some(rest) = uri.strip_prefix("data:") else {
        return uri.to_string();
    };
    let Some((header, payload)) = rest.split_once(',') else {
        error!("data URI has no payload separator");
        return String::new();
    };

    if header.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        match STANDARD.decode(compact) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(err) => hex::encode(err.into_bytes()),
            },
            Err(err) => {
                error!(error = %err, "failed to decode base64 data URI");
                String::new()
            }
        }
    } else {
        percent_decode_str(payload).decode_utf8_lossy().into_owned()
    }
}

/// Decode every attachment of a request
pub fn decode_attachments(attachments: &[Attachment]) -> Vec<DecodedAttachment> {
    attachments
        .iter()
        .map(|attachment| DecodedAttachment {
            name: attachment.name.clone(),
            mime_type: attachment.mime_type().to_string(),
            content: decode_data_uri(&attachment.url),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_base64_text() {
        // "a,b\n1,2"
        assert_eq!(decode_data_uri("data:text/csv;base64,YSxiCjEsMg=="), "a,b\n1,2");
    }

    #[test]
    fn test_base64_binary_becomes_hex() {
        // 0x89 'P' 'N' 'G'
        assert_eq!(decode_data_uri("data:image/png;base64,iVBORw=="), "89504e47");
    }

    #[test]
    fn test_percent_encoded() {
        assert_eq!(decode_data_uri("data:text/plain,hello%20world%21"), "hello world!");
        assert_eq!(decode_data_uri("data:,plain"), "plain");
    }

    #[test]
    fn test_non_data_uri_verbatim() {
        assert_eq!(
            decode_data_uri("https://example.com/file.csv"),
            "https://example.com/file.csv"
        );
        assert_eq!(decode_data_uri(""), "");
    }

    #[test]
    fn test_malformed_is_empty() {
        assert_eq!(decode_data_uri("data:text/plain;base64"), "");
        assert_eq!(decode_data_uri("data:text/plain;base64,@@@"), "");
    }

    #[test]
    fn test_decode_attachments() {
        let decoded = decode_attachments(&[Attachment::new("input.md", "data:text/markdown;base64,IyBoaQ==")]);
        assert_eq!(
            decoded,
            vec![DecodedAttachment {
                name: "input.md".to_string(),
                mime_type: "text/markdown".to_string(),
                content: "# hi".to_string(),
            }]
        );
    }
}
