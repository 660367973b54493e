use serde::Deserialize;

use crate::error::{ExtractError, InvalidTokenError, TokenFieldIssue};

/// One OCR-recognized word with its bounding box in image pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Token {
    #[must_use]
    pub fn new(text: impl Into<String>, left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            text: text.into(),
            left,
            top,
            width,
            height,
        }
    }
}

/// Token as reported by an OCR collaborator, before boundary validation.
///
/// Every field is optional here so that a missing coordinate can be reported
/// with the token's position instead of failing the whole document parse.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawToken {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub left: Option<f64>,
    #[serde(default)]
    pub top: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
}

impl RawToken {
    /// Checks that every coordinate is present and finite.
    ///
    /// A missing `text` is treated as an empty word; the clusterer drops those.
    pub fn validate(self, index: usize) -> Result<Token, InvalidTokenError> {
        let coordinate = |value: Option<f64>, field: &'static str| match value {
            None => Err(InvalidTokenError {
                index,
                field,
                reason: TokenFieldIssue::Missing,
            }),
            Some(value) if !value.is_finite() => Err(InvalidTokenError {
                index,
                field,
                reason: TokenFieldIssue::NotFinite,
            }),
            Some(value) => Ok(value),
        };

        Ok(Token {
            left: coordinate(self.left, "left")?,
            top: coordinate(self.top, "top")?,
            width: coordinate(self.width, "width")?,
            height: coordinate(self.height, "height")?,
            text: self.text.unwrap_or_default(),
        })
    }
}

pub fn validate_tokens(raw: Vec<RawToken>) -> Result<Vec<Token>, InvalidTokenError> {
    raw.into_iter()
        .enumerate()
        .map(|(index, token)| token.validate(index))
        .collect()
}

/// Parses a JSON array of `{text, left, top, width, height}` objects.
pub fn parse_tokens_json(input: &str) -> Result<Vec<Token>, ExtractError> {
    let raw = serde_json::from_str::<Vec<RawToken>>(input)?;
    Ok(validate_tokens(raw)?)
}

#[cfg(test)]
mod tests {
    use super::{RawToken, parse_tokens_json};
    use crate::error::{ExtractError, TokenFieldIssue};

    #[test]
    fn parses_complete_token_dump() {
        let tokens = parse_tokens_json(
            r#"[{"text":"Qty","left":10,"top":4,"width":30,"height":12},
                {"text":"Price","left":80.5,"top":5,"width":40,"height":12}]"#,
        )
        .expect("tokens should parse");

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].text, "Price");
        assert_eq!(tokens[1].left, 80.5);
    }

    #[test]
    fn rejects_token_without_top() {
        let err = parse_tokens_json(r#"[{"text":"ok","left":1,"top":1,"width":1,"height":1},
                                         {"text":"bad","left":1,"width":1,"height":1}]"#)
            .expect_err("missing top should fail");

        let ExtractError::InvalidToken(invalid) = err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(invalid.index, 1);
        assert_eq!(invalid.field, "top");
        assert_eq!(invalid.reason, TokenFieldIssue::Missing);
    }

    #[test]
    fn rejects_non_finite_coordinate() {
        let raw = RawToken {
            text: Some("x".to_string()),
            left: Some(f64::NAN),
            top: Some(0.0),
            width: Some(1.0),
            height: Some(1.0),
        };
        let invalid = raw.validate(3).expect_err("NaN left should fail");
        assert_eq!(invalid.field, "left");
        assert_eq!(invalid.reason, TokenFieldIssue::NotFinite);
        assert_eq!(invalid.to_string(), "token 3 is invalid: non-finite value in 'left'");
    }

    #[test]
    fn missing_text_becomes_empty_word() {
        let tokens = parse_tokens_json(r#"[{"left":1,"top":2,"width":3,"height":4}]"#)
            .expect("text is optional");
        assert_eq!(tokens[0].text, "");
    }
}
