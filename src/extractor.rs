//! Best-effort scrape of nutrient amounts out of free-form model prose.
//!
//! The model's answer has no guaranteed structure, so this is deliberately a
//! line-oriented pattern scan rather than a parser. Per line, every known label
//! that occurs gets the first number following it (or, failing that, the first
//! number on the line). When a label shows up on several lines the last one
//! wins.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::nutrient::{Nutrient, NutrientReading};

lazy_static! {
    static ref NUMBER: Regex = Regex::new(r"[0-9]+(?:\.[0-9]+)?").expect("number pattern is valid");
}

/// Extracts a (possibly empty) reading from `text`.
pub fn extract(text: &str) -> NutrientReading {
    let mut reading = NutrientReading::new();
    for line in text.lines() {
        for nutrient in Nutrient::ALL {
            if let Some(amount) = amount_for_label(line, nutrient.label()) {
                reading.set(nutrient, amount);
            }
        }
    }
    debug!(found = reading.len(), "extracted nutrient reading");
    reading
}

fn amount_for_label(line: &str, label: &str) -> Option<f64> {
    let at = line.find(label)?;
    let after = &line[at + label.len()..];
    NUMBER
        .find(after)
        .or_else(|| NUMBER.find(line))
        .and_then(|m| m.as_str().parse().ok())
}
