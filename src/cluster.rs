//! Row/column reconstruction from positioned OCR words.
//!
//! Scanned pages carry no table geometry, so rows are recovered by quantizing
//! each word's `top` into fixed-height buckets and columns by ordering each
//! bucket on `left`. Rows stay ragged; nothing aligns columns across rows.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::ExtractError;
use crate::token::Token;

/// Bucket height calibrated for pages rendered at 300 DPI.
pub const DEFAULT_BUCKET_SIZE: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenClusterer {
    bucket_size: f64,
}

impl Default for TokenClusterer {
    fn default() -> Self {
        Self {
            bucket_size: DEFAULT_BUCKET_SIZE,
        }
    }
}

impl TokenClusterer {
    pub fn new(bucket_size: f64) -> Result<Self, ExtractError> {
        if !bucket_size.is_finite() || bucket_size <= 0.0 {
            return Err(ExtractError::InvalidOption(format!(
                "bucket size must be a positive finite number, got {bucket_size}"
            )));
        }
        Ok(Self { bucket_size })
    }

    #[must_use]
    pub fn bucket_size(&self) -> f64 {
        self.bucket_size
    }

    /// Bucket index for a vertical position.
    ///
    /// Halfway values round to the even neighbour: with a bucket of 20,
    /// `top = 10` lands in row 0 and `top = 30` in row 2.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn row_key(&self, top: f64) -> i64 {
        (top / self.bucket_size).round_ties_even() as i64
    }

    /// Groups one page's tokens into rows of cell strings, top to bottom and
    /// left to right. Words with identical `left` keep their input order.
    #[must_use]
    pub fn cluster(&self, tokens: &[Token]) -> Vec<Vec<String>> {
        let mut buckets: BTreeMap<i64, Vec<&Token>> = BTreeMap::new();
        for token in tokens.iter().filter(|token| !token.text.trim().is_empty()) {
            buckets
                .entry(self.row_key(token.top))
                .or_default()
                .push(token);
        }

        debug!(
            tokens = tokens.len(),
            rows = buckets.len(),
            bucket_size = self.bucket_size,
            "clustered OCR tokens"
        );

        buckets
            .into_values()
            .map(|mut members| {
                members.sort_by(|a, b| a.left.total_cmp(&b.left));
                members
                    .into_iter()
                    .map(|token| token.text.clone())
                    .collect()
            })
            .collect()
    }
}
