//! Strict extraction of identity and token values
//!
//! Grammars:
//! - GUID: a `Set-Cookie` value whose cookie-pair is `GUID=<alnum>+`
//!   (attributes after `;` are ignored)
//! - v2 token: JSON `{"data": {"token": <non-empty string>}}`
//! - legacy token: text between `<div id='token'...>` and the next `</div>`
//!
//! Every extractor fails with a [`ParseError`] on non-match.

use serde_json::Value;

use crate::error::ParseError;

const TOKEN_DIV_OPEN: &str = "<div id='token'";
const TOKEN_DIV_CLOSE: &str = "</div>";

/// Find the `GUID` cookie value among `Set-Cookie` header values
pub fn guid_from_set_cookie<'a, I>(headers: I) -> Result<String, ParseError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut saw_header = false;
    for header in headers {
        saw_header = true;
        let pair = header.split(';').next().unwrap_or_default().trim();
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        if name.trim() != "GUID" {
            continue;
        }
        let value = value.trim();
        if !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Ok(value.to_string());
        }
    }

    if saw_header {
        Err(ParseError::MissingGuid)
    } else {
        Err(ParseError::MissingSetCookie)
    }
}

/// Extract `data.token` from a `/api/v2/token` body
pub fn token_from_json(body: &str) -> Result<String, ParseError> {
    let value: Value = serde_json::from_str(body)?;
    let token = value
        .pointer("/data/token")
        .and_then(Value::as_str)
        .ok_or(ParseError::MissingToken)?;
    non_empty(token.to_string())
}

/// Extract the token from the legacy `token.html` page
pub fn token_from_html(body: &str) -> Result<String, ParseError> {
    let start = body
        .find(TOKEN_DIV_OPEN)
        .ok_or(ParseError::TokenMarkerNotFound)?;
    let rest = &body[start + TOKEN_DIV_OPEN.len()..];
    let content_start = rest.find('>').ok_or(ParseError::TokenMarkerNotFound)? + 1;
    let rest = &rest[content_start..];
    let end = rest
        .find(TOKEN_DIV_CLOSE)
        .ok_or(ParseError::TokenMarkerNotFound)?;

    non_empty(rest[..end].trim().to_string())
}

fn non_empty(token: String) -> Result<String, ParseError> {
    if token.is_empty() {
        Err(ParseError::EmptyToken)
    } else {
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guid_from_set_cookie() {
        let guid = guid_from_set_cookie(["GUID=xyz;"]).unwrap();
        assert_eq!(guid, "xyz");

        let guid =
            guid_from_set_cookie(["lang=en; Path=/", "GUID=A1b2C3; Path=/; HttpOnly"]).unwrap();
        assert_eq!(guid, "A1b2C3");
    }

    #[test]
    fn test_guid_missing() {
        assert!(matches!(
            guid_from_set_cookie(std::iter::empty::<&str>()),
            Err(ParseError::MissingSetCookie)
        ));
        assert!(matches!(
            guid_from_set_cookie(["session=1; Path=/"]),
            Err(ParseError::MissingGuid)
        ));
        // GUID only counts as the cookie-pair, not as an attribute
        assert!(matches!(
            guid_from_set_cookie(["other=1; GUID=abc"]),
            Err(ParseError::MissingGuid)
        ));
        assert!(matches!(
            guid_from_set_cookie(["GUID=ab-cd;"]),
            Err(ParseError::MissingGuid)
        ));
    }

    #[test]
    fn test_token_from_json() {
        assert_eq!(token_from_json(r#"{"data":{"token":"abc123"}}"#).unwrap(), "abc123");
        assert!(matches!(
            token_from_json(r#"{"data":{}}"#),
            Err(ParseError::MissingToken)
        ));
        assert!(matches!(
            token_from_json("<html>"),
            Err(ParseError::InvalidJson(_))
        ));
        assert!(matches!(
            token_from_json(r#"{"data":{"token":""}}"#),
            Err(ParseError::EmptyToken)
        ));
    }

    #[test]
    fn test_token_from_html() {
        let html = "<html><div id='token' style='display:none;'>Zt9kq_01</div></html>";
        assert_eq!(token_from_html(html).unwrap(), "Zt9kq_01");

        let bare = "<div id='token'>abc</div>";
        assert_eq!(token_from_html(bare).unwrap(), "abc");
    }

    #[test]
    fn test_token_from_html_rejects_non_match() {
        assert!(matches!(
            token_from_html("<div id=\"token\">abc</div>"),
            Err(ParseError::TokenMarkerNotFound)
        ));
        assert!(matches!(
            token_from_html("<div id='token' style='x'>abc"),
            Err(ParseError::TokenMarkerNotFound)
        ));
        assert!(matches!(
            token_from_html("<div id='token'></div>"),
            Err(ParseError::EmptyToken)
        ));
    }
}
