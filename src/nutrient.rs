//! The fixed nutrient set, partial readings and the daily target table.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// One of the five tracked nutrients. Declaration order is the fixed
/// iteration order used everywhere (extraction, tables, charts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Nutrient {
    Energy,
    Protein,
    Fat,
    Carbohydrate,
    Potassium,
}

impl Nutrient {
    pub const ALL: [Nutrient; 5] = [
        Nutrient::Energy,
        Nutrient::Protein,
        Nutrient::Fat,
        Nutrient::Carbohydrate,
        Nutrient::Potassium,
    ];

    /// The label the model is asked about and that the extractor searches for.
    pub fn label(self) -> &'static str {
        match self {
            Nutrient::Energy => "エネルギー",
            Nutrient::Protein => "たんぱく質",
            Nutrient::Fat => "脂質",
            Nutrient::Carbohydrate => "糖質",
            Nutrient::Potassium => "カリウム",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Nutrient::Energy => "kcal",
            Nutrient::Potassium => "mg",
            _ => "g",
        }
    }

    /// Fixed daily target amount, in [`Nutrient::unit`].
    pub fn daily_target(self) -> f64 {
        match self {
            Nutrient::Energy => 2000.0,
            Nutrient::Protein => 100.0,
            Nutrient::Fat => 60.0,
            Nutrient::Carbohydrate => 250.0,
            Nutrient::Potassium => 3500.0,
        }
    }
}

impl fmt::Display for Nutrient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Nutrient {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Partial mapping from nutrient to amount. Not every nutrient has to be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NutrientReading(BTreeMap<Nutrient, f64>);

impl NutrientReading {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the amount for `nutrient`, replacing any earlier value.
    pub fn set(&mut self, nutrient: Nutrient, amount: f64) {
        self.0.insert(nutrient, amount);
    }

    pub fn get(&self, nutrient: Nutrient) -> Option<f64> {
        self.0.get(&nutrient).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Present values in fixed nutrient order.
    pub fn iter(&self) -> impl Iterator<Item = (Nutrient, f64)> + '_ {
        self.0.iter().map(|(n, v)| (*n, *v))
    }
}

impl FromIterator<(Nutrient, f64)> for NutrientReading {
    fn from_iter<I: IntoIterator<Item = (Nutrient, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A complete mapping over all five nutrients, as produced by aggregation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NutrientTotals([f64; 5]);

impl NutrientTotals {
    pub fn zero() -> Self {
        Self([0.0; 5])
    }

    pub fn get(&self, nutrient: Nutrient) -> f64 {
        self.0[nutrient as usize]
    }

    pub fn add(&mut self, nutrient: Nutrient, amount: f64) {
        self.0[nutrient as usize] += amount;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Nutrient, f64)> + '_ {
        Nutrient::ALL.iter().map(move |n| (*n, self.get(*n)))
    }
}

impl Default for NutrientTotals {
    fn default() -> Self {
        Self::zero()
    }
}

impl Serialize for NutrientTotals {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// The daily reference amounts. Process-wide constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetTable(NutrientTotals);

impl TargetTable {
    pub fn daily() -> Self {
        let mut totals = NutrientTotals::zero();
        for nutrient in Nutrient::ALL {
            totals.add(nutrient, nutrient.daily_target());
        }
        Self(totals)
    }

    pub fn get(&self, nutrient: Nutrient) -> f64 {
        self.0.get(nutrient)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Nutrient, f64)> + '_ {
        self.0.iter()
    }
}

impl Serialize for TargetTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}
