//! Redaction-based hierarchies for string values.
//!
//! ```text
//!   level 0   12345      raw value
//!   level 1   1234*      one character redacted
//!   ...
//!   level 5   *****      fully redacted
//! ```
//!
//! Values are first aligned to a common length with a padding character.
//! Each level then masks one more character from the redaction side.

use serde::{Deserialize, Serialize};

use tracing::debug;

use super::{Hierarchy, HierarchyBuilder};
use crate::domain::ValueDomain;
use crate::error::{HierarchyResult, SpecResult, SpecificationError};
use crate::types::StringType;

/// The side a string is processed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedactionOrder {
    #[default]
    LeftToRight,
    RightToLeft,
}

/// Optional knowledge about the domain of a string attribute.
///
/// Any two of the three fields determine the third.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alphabet_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value_length: Option<usize>,
}

impl DomainMetrics {
    pub fn new(
        domain_size: Option<u64>,
        alphabet_size: Option<u64>,
        max_value_length: Option<usize>,
    ) -> Self {
        Self {
            domain_size,
            alphabet_size,
            max_value_length,
        }
    }

    fn check(&self) -> SpecResult<()> {
        if self.domain_size == Some(0) {
            return Err(SpecificationError::InvalidMetrics(
                "domain size must be positive".to_string(),
            ));
        }
        if self.alphabet_size == Some(0) {
            return Err(SpecificationError::InvalidMetrics(
                "alphabet size must be positive".to_string(),
            ));
        }
        if let (Some(1), Some(domain), None) =
            (self.alphabet_size, self.domain_size, self.max_value_length)
        {
            if domain > 1 {
                return Err(SpecificationError::InvalidMetrics(format!(
                    "a single-character alphabet cannot produce {} values",
                    domain
                )));
            }
        }
        if let (Some(domain), Some(alphabet), Some(length)) =
            (self.domain_size, self.alphabet_size, self.max_value_length)
        {
            if saturating_pow(alphabet, length) < domain {
                return Err(SpecificationError::InvalidMetrics(format!(
                    "{} characters of length {} cannot form {} values",
                    alphabet, length, domain
                )));
            }
        }
        if let (None, Some(domain), Some(0)) =
            (self.alphabet_size, self.domain_size, self.max_value_length)
        {
            if domain > 1 {
                return Err(SpecificationError::InvalidMetrics(
                    "values of length 0 cannot form more than one value".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Fill in the missing field when exactly two are known.
    pub fn resolve(&self) -> SpecResult<DomainMetrics> {
        self.check()?;
        let resolved = match (self.domain_size, self.alphabet_size, self.max_value_length) {
            (Some(domain), Some(alphabet), None) => {
                Self::new(Some(domain), Some(alphabet), Some(length_for(domain, alphabet)))
            }
            (Some(domain), None, Some(length)) => {
                Self::new(Some(domain), Some(alphabet_for(domain, length)), Some(length))
            }
            (None, Some(alphabet), Some(length)) => Self::new(
                Some(saturating_pow(alphabet, length)),
                Some(alphabet),
                Some(length),
            ),
            _ => *self,
        };
        Ok(resolved)
    }

    /// Estimated number of distinct labels per level, starting at level 0.
    ///
    /// `None` unless all three metrics are known or derivable.
    pub fn level_domain_sizes(&self) -> SpecResult<Option<Vec<u64>>> {
        let resolved = self.resolve()?;
        let (Some(domain), Some(alphabet), Some(length)) = (
            resolved.domain_size,
            resolved.alphabet_size,
            resolved.max_value_length,
        ) else {
            return Ok(None);
        };
        Ok(Some(
            (0..=length)
                .map(|redacted| domain.min(saturating_pow(alphabet, length - redacted)))
                .collect(),
        ))
    }
}

fn saturating_pow(base: u64, exponent: usize) -> u64 {
    (0..exponent).fold(1u64, |acc, _| acc.saturating_mul(base))
}

/// Smallest length with `alphabet^length >= domain`.
fn length_for(domain: u64, alphabet: u64) -> usize {
    if alphabet <= 1 {
        return if domain <= 1 { 0 } else { 1 };
    }
    let mut length = 0;
    while saturating_pow(alphabet, length) < domain {
        length += 1;
    }
    length
}

/// Smallest alphabet with `alphabet^length >= domain`.
fn alphabet_for(domain: u64, length: usize) -> u64 {
    if length == 0 {
        return 1;
    }
    let mut alphabet = (domain as f64).powf(1.0 / length as f64).ceil().max(1.0) as u64;
    while alphabet > 1 && saturating_pow(alphabet - 1, length) >= domain {
        alphabet -= 1;
    }
    while saturating_pow(alphabet, length) < domain {
        alphabet += 1;
    }
    alphabet
}

/// Builds hierarchies by masking characters one at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct RedactionBuilder {
    alignment: RedactionOrder,
    redaction: RedactionOrder,
    padding_char: char,
    redaction_char: char,
    metrics: DomainMetrics,
}

impl Default for RedactionBuilder {
    fn default() -> Self {
        Self {
            alignment: RedactionOrder::LeftToRight,
            redaction: RedactionOrder::RightToLeft,
            padding_char: ' ',
            redaction_char: '*',
            metrics: DomainMetrics::default(),
        }
    }
}

impl RedactionBuilder {
    pub fn new(alignment: RedactionOrder, redaction: RedactionOrder) -> Self {
        Self {
            alignment,
            redaction,
            ..Self::default()
        }
    }

    pub fn with_characters(mut self, padding_char: char, redaction_char: char) -> Self {
        self.padding_char = padding_char;
        self.redaction_char = redaction_char;
        self
    }

    pub fn with_metrics(mut self, metrics: DomainMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn alignment(&self) -> RedactionOrder {
        self.alignment
    }

    pub fn redaction(&self) -> RedactionOrder {
        self.redaction
    }

    pub fn padding_char(&self) -> char {
        self.padding_char
    }

    pub fn redaction_char(&self) -> char {
        self.redaction_char
    }

    pub fn metrics(&self) -> &DomainMetrics {
        &self.metrics
    }

    /// Number of redaction levels for values up to `observed` characters.
    pub fn level_count(&self, observed: usize) -> SpecResult<usize> {
        let declared = self.metrics.resolve()?.max_value_length.unwrap_or(0);
        Ok(observed.max(declared))
    }

    fn align(&self, value: &str, width: usize) -> Vec<char> {
        let chars: Vec<char> = value.chars().collect();
        let padding = std::iter::repeat(self.padding_char).take(width.saturating_sub(chars.len()));
        match self.alignment {
            RedactionOrder::LeftToRight => chars.into_iter().chain(padding).collect(),
            RedactionOrder::RightToLeft => padding.chain(chars).collect(),
        }
    }

    fn redact(&self, aligned: &[char], count: usize) -> String {
        let width = aligned.len();
        aligned
            .iter()
            .enumerate()
            .map(|(i, ch)| {
                let masked = match self.redaction {
                    RedactionOrder::LeftToRight => i < count,
                    RedactionOrder::RightToLeft => i >= width.saturating_sub(count),
                };
                if masked {
                    self.redaction_char
                } else {
                    *ch
                }
            })
            .collect()
    }
}

impl HierarchyBuilder for RedactionBuilder {
    fn validate(&self) -> SpecResult<()> {
        self.metrics.resolve().map(|_| ())
    }

    fn build<S: AsRef<str>>(&self, values: &[S]) -> HierarchyResult<Hierarchy> {
        self.validate()?;
        let domain = ValueDomain::new(StringType, values)?;
        let observed = domain
            .raw_values()
            .map(|v| v.chars().count())
            .max()
            .unwrap_or(0);
        let width = self.level_count(observed)?;

        debug!(
            values = domain.len(),
            levels = width,
            alignment = ?self.alignment,
            redaction = ?self.redaction,
            "building redaction hierarchy"
        );

        let rows = domain
            .raw_values()
            .map(|raw| {
                let aligned = self.align(raw, width);
                std::iter::once(raw.to_string())
                    .chain((1..=width).map(|count| self.redact(&aligned, count)))
                    .collect()
            })
            .collect();

        Ok(Hierarchy::new(rows).with_suppression_level())
    }
}
