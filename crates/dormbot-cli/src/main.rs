//! 🏠 dormbot CLI — chat with the dormitory assistant and query distances.
//!
//! Usage:
//!   dormbot chat                         — Start an interactive chat session
//!   dormbot ask "หอไหนถูกที่สุด"           — Answer a single message
//!   dormbot distance LAT1 LON1 LAT2 LON2 — Road distance between two points
//!   dormbot nearest LAT LON              — Dormitories nearest to a point
//!   dormbot compare NAME1 NAME2          — Walking/driving between two dormitories
//!   dormbot onboard                      — Create a default configuration
//!   dormbot status                       — Show current configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;

use dormbot_core::agent::IntentRouter;
use dormbot_core::chatbot::repository::{DormRepository, JsonFileDorms};
use dormbot_core::chatbot::Chatbot;
use dormbot_core::config::Config;
use dormbot_core::distance::{DistanceResolver, TravelMode};
use dormbot_core::provider::openai::{OpenAiProvider, DEFAULT_GROQ_MODEL};
use dormbot_core::provider::LlmProvider;

#[derive(Parser)]
#[command(
    name = "dormbot",
    version,
    about = "Dormitory marketplace chatbot",
    long_about = "🏠 dormbot — answers price and distance questions about dormitories."
)]
struct Cli {
    /// Dormitory JSON file (overrides chatbot.dormsPath)
    #[arg(long, global = true)]
    dorms: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat,

    /// Answer a single message and exit
    Ask {
        /// The question, e.g. "หอไหนถูกที่สุด"
        message: String,
    },

    /// Road distance between two points (falls back to straight-line)
    Distance {
        #[arg(allow_negative_numbers = true)]
        lat1: f64,
        #[arg(allow_negative_numbers = true)]
        lon1: f64,
        #[arg(allow_negative_numbers = true)]
        lat2: f64,
        #[arg(allow_negative_numbers = true)]
        lon2: f64,
        /// walking, driving or cycling
        #[arg(short, long, default_value = "walking")]
        mode: TravelMode,
    },

    /// Dormitories nearest to a point, by walking distance
    Nearest {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,
        /// Maximum number of results (default: chatbot.nearestLimit)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Walking and driving distance between two dormitories
    Compare {
        /// First dormitory name (fuzzy)
        first: String,
        /// Second dormitory name (fuzzy)
        second: String,
    },

    /// Create or reset the default configuration
    Onboard,

    /// Show configuration status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let dorms_override = cli.dorms;

    match cli.command {
        Some(Commands::Chat) | None => cmd_chat(dorms_override).await?,
        Some(Commands::Ask { message }) => cmd_ask(dorms_override, &message).await?,
        Some(Commands::Distance {
            lat1,
            lon1,
            lat2,
            lon2,
            mode,
        }) => cmd_distance(lat1, lon1, lat2, lon2, mode).await?,
        Some(Commands::Nearest { lat, lon, limit }) => cmd_nearest(dorms_override, lat, lon, limit).await?,
        Some(Commands::Compare { first, second }) => cmd_compare(dorms_override, &first, &second).await?,
        Some(Commands::Onboard) => cmd_onboard()?,
        Some(Commands::Status) => cmd_status()?,
    }

    Ok(())
}

// ── Shared Setup ────────────────────────────────────────────────────

fn load_config() -> Result<Config> {
    let config = Config::load()?;
    if let Err(errors) = config.validate() {
        eprintln!("\n  \x1b[31m❌ Configuration errors:\x1b[0m");
        for e in &errors {
            eprintln!("     • {}", e);
        }
        eprintln!();
        anyhow::bail!("Fix the above {} error(s) in config.json", errors.len());
    }
    Ok(config)
}

fn dorms_path(config: &Config, dorms_override: Option<PathBuf>) -> PathBuf {
    dorms_override.unwrap_or_else(|| PathBuf::from(&config.chatbot.dorms_path))
}

/// Build a fully wired chatbot from config.
fn setup_chatbot(config: &Config, dorms_override: Option<PathBuf>) -> Chatbot {
    let client = reqwest::Client::new();
    let resolver = DistanceResolver::from_config(&config.routing, client.clone());

    let llm = config.providers.find_active().map(|(name, entry)| {
        let model = entry.model.as_deref().unwrap_or(DEFAULT_GROQ_MODEL);
        Box::new(OpenAiProvider::new(
            name,
            &entry.api_key,
            entry.api_base.as_deref(),
            model,
            client.clone(),
        )) as Box<dyn LlmProvider>
    });

    let dorms = JsonFileDorms::new(dorms_path(config, dorms_override));
    Chatbot::new(Box::new(dorms), resolver, llm, config.chatbot.clone())
}

// ── Chat Command ────────────────────────────────────────────────────

async fn cmd_chat(dorms_override: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let dorms = dorms_path(&config, dorms_override.clone());
    let bot = setup_chatbot(&config, dorms_override);

    println!();
    println!("  🏠 dormbot v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "  LLM: {} | Routing: {}",
        config
            .providers
            .find_active()
            .map(|(n, _)| n)
            .unwrap_or("none"),
        if config.routing.is_configured() {
            "openrouteservice"
        } else {
            "straight-line only"
        }
    );
    println!("  Dormitories: {}", dorms.display());
    println!();
    println!("  Type your question, or /quit to exit.");
    println!("  ─────────────────────────────────────");
    println!();

    let stdin = io::stdin();
    loop {
        print!("  \x1b[36m>\x1b[0m ");
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        match input {
            "/quit" | "/exit" | "/q" => {
                println!("  Goodbye! 👋");
                break;
            }
            "/status" => {
                cmd_status()?;
                continue;
            }
            _ => {}
        }

        println!();
        match bot.respond(input).await {
            Ok(reply) => {
                let colour = if reply.approximate { "33" } else { "32" };
                println!("  \x1b[{}m{}\x1b[0m\n", colour, reply.text);
            }
            Err(e) => {
                eprintln!("  \x1b[31mError: {:#}\x1b[0m\n", e);
            }
        }
    }

    Ok(())
}

// ── Ask Command ─────────────────────────────────────────────────────

async fn cmd_ask(dorms_override: Option<PathBuf>, message: &str) -> Result<()> {
    let config = load_config()?;
    let bot = setup_chatbot(&config, dorms_override);
    let reply = bot.respond(message).await?;
    println!("{}", reply.text);
    Ok(())
}

// ── Distance Commands ───────────────────────────────────────────────

async fn cmd_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64, mode: TravelMode) -> Result<()> {
    let config = load_config()?;
    let resolver = DistanceResolver::from_config(&config.routing, reqwest::Client::new());

    let result = resolver
        .calculate_road_distance(lat1, lon1, lat2, lon2, mode)
        .await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn cmd_nearest(dorms_override: Option<PathBuf>, lat: f64, lon: f64, limit: Option<usize>) -> Result<()> {
    let config = load_config()?;
    let resolver = DistanceResolver::from_config(&config.routing, reqwest::Client::new());
    let dorms = JsonFileDorms::new(dorms_path(&config, dorms_override))
        .list()
        .await?;

    let limit = limit.unwrap_or(config.chatbot.nearest_limit);
    let nearest = resolver
        .find_nearest_dorms_to_location(lat, lon, &dorms, limit)
        .await;
    println!("{}", serde_json::to_string_pretty(&nearest)?);
    Ok(())
}

async fn cmd_compare(dorms_override: Option<PathBuf>, first: &str, second: &str) -> Result<()> {
    let config = load_config()?;
    let resolver = DistanceResolver::from_config(&config.routing, reqwest::Client::new());
    let dorms = JsonFileDorms::new(dorms_path(&config, dorms_override))
        .list()
        .await?;

    let dorm1 = IntentRouter::extract_dorms(first, &dorms)
        .into_iter()
        .next()
        .with_context(|| format!("No dormitory matches '{}'", first))?;
    let dorm2 = IntentRouter::extract_dorms(second, &dorms)
        .into_iter()
        .next()
        .with_context(|| format!("No dormitory matches '{}'", second))?;

    let comparison = resolver.calculate_distance_between_dorms(dorm1, dorm2).await?;
    println!("{}", serde_json::to_string_pretty(&comparison)?);
    Ok(())
}

// ── Onboard Command ─────────────────────────────────────────────────

fn cmd_onboard() -> Result<()> {
    let path = Config::write_default_template()?;
    println!();
    println!("  ✅ Configuration created at:");
    println!("     {}", path.display());
    println!();
    println!("  Next steps:");
    println!("  1. Add your OpenRouteService key (routing.apiKey)");
    println!("  2. Optionally add a Groq key for general questions");
    println!("  3. Run `dormbot chat --dorms dorms.json`");
    println!();
    Ok(())
}

// ── Status Command ──────────────────────────────────────────────────

fn cmd_status() -> Result<()> {
    let config_path = Config::default_path();
    let config = Config::load()?;

    println!();
    println!("  🏠 dormbot status");
    println!("  ─────────────────────────────────────");

    if PathBuf::from("config.json").exists() {
        println!("  Config:    ./config.json");
    } else if config_path.exists() {
        println!("  Config:    {}", config_path.display());
    } else {
        println!("  Config:    ❌ Not found (run `dormbot onboard`)");
    }

    if config.routing.is_configured() {
        println!("  Routing:   ✅ {}", config.routing.api_base);
    } else {
        println!("  Routing:   ⚠️  No API key, distances are straight-line estimates");
    }
    match config.routing.cache_ttl_seconds {
        Some(ttl) if ttl > 0 => println!("  Cache:     {}s", ttl),
        _ => println!("  Cache:     off"),
    }

    match config.providers.find_active() {
        Some((name, entry)) => println!(
            "  LLM:       ✅ {} ({})",
            name,
            entry.model.as_deref().unwrap_or(DEFAULT_GROQ_MODEL)
        ),
        None => println!("  LLM:       ❌ Not configured (general questions get a help text)"),
    }

    let dorms = PathBuf::from(&config.chatbot.dorms_path);
    println!(
        "  Dorms:     {} {}",
        dorms.display(),
        if dorms.exists() { "✅" } else { "❌" }
    );
    println!("  Landmarks: {}", config.chatbot.landmarks.len());

    match config.validate() {
        Ok(()) => println!("  Valid:     ✅"),
        Err(errors) => println!("  Valid:     ❌ {} problem(s)", errors.len()),
    }

    println!();
    Ok(())
}
