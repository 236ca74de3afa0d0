//! Bar chart data shared by the HTML page and the terminal renderer.
//!
//! All bars in a chart share one scale: the largest value maps to 100%.

use serde::Serialize;
use std::fmt::Write as _;
use unicode_width::UnicodeWidthStr;

use crate::ledger::TargetComparison;
use crate::nutrient::NutrientTotals;

pub const INTAKE_SERIES: &str = "摂取量";
pub const TARGET_SERIES: &str = "目標量";

const TEXT_BAR_WIDTH: usize = 40;
/// Terminal columns reserved for the bar label; CJK labels take two columns per char.
const TEXT_LABEL_WIDTH: usize = 24;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub series: &'static str,
    pub value: f64,
    pub display: String,
    /// Length relative to the chart's largest value, 0..=100.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarGroup {
    pub label: &'static str,
    pub unit: &'static str,
    pub bars: Vec<Bar>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub title: &'static str,
    pub groups: Vec<BarGroup>,
}

impl BarChart {
    /// One bar per nutrient with the running totals.
    pub fn totals(totals: &NutrientTotals) -> Self {
        let groups = totals
            .iter()
            .map(|(nutrient, value)| BarGroup {
                label: nutrient.label(),
                unit: nutrient.unit(),
                bars: vec![Bar {
                    series: INTAKE_SERIES,
                    value,
                    display: format_amount(value),
                    percent: 0.0,
                }],
            })
            .collect();
        Self::scaled("摂取量のグラフ", groups)
    }

    /// Intake and target side by side for each nutrient.
    pub fn against_target(comparison: &[TargetComparison]) -> Self {
        let groups = comparison
            .iter()
            .map(|c| BarGroup {
                label: c.nutrient.label(),
                unit: c.nutrient.unit(),
                bars: vec![
                    Bar {
                        series: INTAKE_SERIES,
                        value: c.total,
                        display: format_amount(c.total),
                        percent: 0.0,
                    },
                    Bar {
                        series: TARGET_SERIES,
                        value: c.target,
                        display: format_amount(c.target),
                        percent: 0.0,
                    },
                ],
            })
            .collect();
        Self::scaled("摂取量と目標量の比較グラフ", groups)
    }

    fn scaled(title: &'static str, mut groups: Vec<BarGroup>) -> Self {
        let max = groups
            .iter()
            .flat_map(|g| g.bars.iter())
            .map(|b| b.value)
            .fold(0.0_f64, f64::max);
        if max > 0.0 {
            for bar in groups.iter_mut().flat_map(|g| g.bars.iter_mut()) {
                bar.percent = (bar.value / max * 100.0).clamp(0.0, 100.0);
            }
        }
        Self { title, groups }
    }

    /// Renders the chart as fixed-width text for the terminal.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.title);
        for group in &self.groups {
            for bar in &group.bars {
                let cells = (bar.percent / 100.0 * TEXT_BAR_WIDTH as f64).round() as usize;
                let name = if group.bars.len() > 1 {
                    format!("{}({})", group.label, bar.series)
                } else {
                    group.label.to_string()
                };
                let _ = writeln!(
                    out,
                    "  {} {:<width$} {} {}",
                    pad_to_width(&name, TEXT_LABEL_WIDTH),
                    "█".repeat(cells),
                    bar.display,
                    group.unit,
                    width = TEXT_BAR_WIDTH
                );
            }
        }
        out
    }
}

// Pads by terminal display width, not by char count.
fn pad_to_width(text: &str, width: usize) -> String {
    let used = UnicodeWidthStr::width(text);
    format!("{}{}", text, " ".repeat(width.saturating_sub(used)))
}

/// Formats an amount without a trailing ".0" for whole numbers.
pub fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}
