//! Keyword-level understanding of chatbot messages.
//!
//! - [`router`] classifies a message and finds the dormitories it names
//! - [`pricing`] answers "which dormitory is cheapest" questions

pub mod pricing;
pub mod router;

pub use pricing::{answer_cheapest_dorm_query, CheapestAnswer};
pub use router::{Intent, IntentRouter};
