use serde::Serialize;

use crate::nutrient::{Nutrient, NutrientReading, NutrientTotals, TargetTable};

/// A dish the user chose to log, with whatever the extractor found for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealEntry {
    dish: String,
    reading: NutrientReading,
}

impl MealEntry {
    pub fn new(dish: impl Into<String>, reading: NutrientReading) -> Self {
        Self {
            dish: dish.into(),
            reading,
        }
    }

    pub fn dish(&self) -> &str {
        &self.dish
    }

    pub fn reading(&self) -> &NutrientReading {
        &self.reading
    }
}

/// One nutrient's running total next to its daily target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TargetComparison {
    pub nutrient: Nutrient,
    pub total: f64,
    pub target: f64,
}

/// Append-only meal log for a single session, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Vec<MealEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: MealEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[MealEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum per nutrient across all entries; nutrients an entry lacks count as zero.
    pub fn totals(&self) -> NutrientTotals {
        let mut totals = NutrientTotals::zero();
        for entry in &self.entries {
            for (nutrient, amount) in entry.reading.iter() {
                totals.add(nutrient, amount);
            }
        }
        totals
    }

    pub fn compare_to_target(&self, target: &TargetTable) -> Vec<TargetComparison> {
        let totals = self.totals();
        Nutrient::ALL
            .iter()
            .map(|&nutrient| TargetComparison {
                nutrient,
                total: totals.get(nutrient),
                target: target.get(nutrient),
            })
            .collect()
    }
}
