//! Cell classification and field parsers
//!
//! Parsers are pure: they take the text of a single cell and return a typed
//! value or a [`FieldParseError`]. They never panic on malformed input.

use regex::Regex;

use crate::error::{Field, FieldParseError};
use crate::models::Sex;

/// Weight-change token shown when the previous weight is unavailable
pub const PREVIOUS_WEIGHT_UNAVAILABLE: &str = "前計不";

/// Structural label of a competitor cell, read from its class attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellLabel {
    /// `HorseInfo`
    Name,
    /// `Umaban<N> Txt_C`
    Bib,
    /// `Barei Txt_C`
    SexAge,
    /// `Txt_C`
    CarriedWeight,
    /// `Weight`
    BodyWeight,
    /// `Jockey`
    Handler,
    /// `Txt_R Popular`
    Odds,
    /// `Popular Popular_Ninki Txt_C`
    Popularity,
}

/// Maps class attributes to [`CellLabel`]s
pub struct CellClassifier {
    bib_pattern: Regex,
}

impl Default for CellClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl CellClassifier {
    pub fn new() -> Self {
        Self {
            bib_pattern: Regex::new(r"^Umaban\d+ Txt_C$").unwrap(),
        }
    }

    /// Classify a cell by its class attribute.
    ///
    /// Returns `None` for cells the extractor does not read (frame number,
    /// trainer, marks, ...).
    pub fn classify(&self, class_attr: &str) -> Option<CellLabel> {
        let class = class_attr.split_whitespace().collect::<Vec<_>>().join(" ");

        let label = match class.as_str() {
            "HorseInfo" => CellLabel::Name,
            "Barei Txt_C" => CellLabel::SexAge,
            "Txt_C" => CellLabel::CarriedWeight,
            "Weight" => CellLabel::BodyWeight,
            "Jockey" => CellLabel::Handler,
            "Txt_R Popular" => CellLabel::Odds,
            "Popular Popular_Ninki Txt_C" => CellLabel::Popularity,
            other if self.bib_pattern.is_match(other) => CellLabel::Bib,
            _ => return None,
        };
        Some(label)
    }
}

pub fn parse_bib(text: &str) -> Result<u32, FieldParseError> {
    text.trim()
        .parse()
        .map_err(|_| FieldParseError::new(Field::Bib, text, "not a post number"))
}

/// Split a 性齢 token such as `牡3` into sex and age
pub fn parse_sex_age(text: &str) -> Result<(Sex, u32), FieldParseError> {
    let token = text.trim();
    let len = token.chars().count();
    if !(2..=3).contains(&len) {
        return Err(FieldParseError::new(
            Field::SexAge,
            text,
            "expected a sex code followed by an age",
        ));
    }

    let mut chars = token.chars();
    let sex = chars
        .next()
        .and_then(Sex::from_code)
        .ok_or_else(|| FieldParseError::new(Field::SexAge, text, "unknown sex code"))?;

    let age_text = chars.as_str();
    if !age_text.chars().all(|c| c.is_ascii_digit()) {
        return Err(FieldParseError::new(Field::SexAge, text, "age is not a number"));
    }
    let age = age_text
        .parse()
        .map_err(|_| FieldParseError::new(Field::SexAge, text, "age is not a number"))?;

    Ok((sex, age))
}

/// Carried weight, only for decimal tokens such as `57.0`.
///
/// Plain `Txt_C` cells are not all weights, so anything else yields `None`
/// and the field stays unassigned.
pub fn parse_carried_weight(text: &str) -> Option<f64> {
    let token = text.trim();
    let (whole, frac) = token.split_once('.')?;
    let is_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !is_digits(whole) || !is_digits(frac) {
        return None;
    }
    token.parse().ok()
}

/// Body weight from a `480(+4)` cell: the number before the parenthesis
pub fn parse_body_weight(text: &str) -> Result<i32, FieldParseError> {
    let weight = text.split('(').next().unwrap_or_default().trim();
    if weight.is_empty() {
        return Err(FieldParseError::new(Field::BodyWeight, text, "no weight given"));
    }
    weight
        .parse()
        .map_err(|_| FieldParseError::new(Field::BodyWeight, text, "not an integer weight"))
}

/// Weight change from the parenthesised part, e.g. `(+4)`, `(-2)` or `(前計不)`.
///
/// The unavailable-previous-weight token counts as no change (0).
pub fn parse_weight_change(text: &str) -> Result<i32, FieldParseError> {
    let token = text.trim().trim_start_matches('(').trim_end_matches(')').trim();
    if token == PREVIOUS_WEIGHT_UNAVAILABLE {
        return Ok(0);
    }
    if token.is_empty() {
        return Err(FieldParseError::new(
            Field::BodyWeightChange,
            text,
            "no weight change given",
        ));
    }
    token
        .parse()
        .map_err(|_| FieldParseError::new(Field::BodyWeightChange, text, "not a signed integer"))
}

/// Parenthesised part of a body weight cell, for pages without a `<small>`
pub fn weight_change_token(text: &str) -> Option<&str> {
    let start = text.find('(')?;
    let end = text[start..].find(')').map(|i| start + i + 1)?;
    Some(&text[start..end])
}

/// Win odds as printed (`4.5`); placeholders such as `---.-` are rejected
pub fn parse_odds(text: &str) -> Result<String, FieldParseError> {
    let token = text.trim();
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(token.to_string()),
        _ => Err(FieldParseError::new(Field::Odds, text, "odds not published")),
    }
}

pub fn parse_popularity(text: &str) -> Result<u32, FieldParseError> {
    text.trim()
        .parse()
        .map_err(|_| FieldParseError::new(Field::Popularity, text, "not a rank"))
}
