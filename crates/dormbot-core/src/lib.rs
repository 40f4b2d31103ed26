//! dormbot-core: the logic behind the dormitory marketplace chatbot.
//!
//! - [`config`] — Typed configuration loading from JSON
//! - [`models`] — Dormitory listings and coordinates
//! - [`agent`] — Intent routing and cheapest-price answers
//! - [`distance`] — Road distance with a great-circle fallback
//! - [`provider`] — LLM provider trait and OpenAI-compatible implementation
//! - [`chatbot`] — Per-message orchestration of all of the above
//!
//! # Quick Start
//!
//! ```no_run
//! use dormbot_core::chatbot::{repository::JsonFileDorms, Chatbot};
//! use dormbot_core::config::Config;
//! use dormbot_core::distance::DistanceResolver;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let client = reqwest::Client::new();
//!
//! let resolver = DistanceResolver::from_config(&config.routing, client);
//! let dorms = JsonFileDorms::new(&config.chatbot.dorms_path);
//! let bot = Chatbot::new(Box::new(dorms), resolver, None, config.chatbot.clone());
//!
//! let reply = bot.respond("หอไหนถูกที่สุด").await?;
//! println!("{}", reply.text);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod chatbot;
pub mod config;
pub mod distance;
pub mod models;
pub mod provider;
