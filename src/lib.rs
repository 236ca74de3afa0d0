//! Dish nutrition analysis backed by Gemini, with a per-session meal log.

pub mod chart;
pub mod chat;
pub mod constants;
pub mod extractor;
pub mod gemini;
pub mod ledger;
pub mod nutrient;
pub mod session;
pub mod web_server;
