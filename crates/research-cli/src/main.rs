//! Command-line interface for research-rs
//!
//! Wires a local engine together for interactive use: synchronous `ask`,
//! background `submit` with polling, and budget inspection/updates.

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use comfy_table::Table;
use research_core::{QueryInput, QueryMode, QueryRecord, Session, Verbosity};
use research_engine::{
    AgentAdapter, BudgetPatch, BudgetSettings, EngineConfig, MemoryStore, QueryEngine, QueryStore,
};
use research_llm::LLMProvider;
use research_llm::providers::{AnthropicProvider, OpenAIProvider};
use research_market::{EnrichmentPipeline, LiveMarketData, MarketConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "research")]
#[command(about = "Ask market research questions with artifact-rich answers", long_about = None)]
struct Args {
    /// Acting user id
    #[arg(long, default_value = "local-user")]
    user: String,

    /// Session id queries run under
    #[arg(long, default_value = "local-session")]
    session: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a query synchronously and print the answer
    Ask {
        question: String,

        /// Provider-selection mode: auto, fast, or deep
        #[arg(long, default_value = "auto")]
        mode: String,

        /// Verbosity: brief, standard, or detailed
        #[arg(long, default_value = "standard")]
        verbosity: String,
    },

    /// Enqueue a query and poll the job until it finishes
    Submit {
        question: String,

        /// Provider-selection mode: auto, fast, or deep
        #[arg(long, default_value = "auto")]
        mode: String,

        /// Verbosity: brief, standard, or detailed
        #[arg(long, default_value = "standard")]
        verbosity: String,
    },

    /// Show the budget snapshot, optionally updating caps first
    Budget {
        #[arg(long)]
        daily: Option<f64>,
        #[arg(long)]
        monthly: Option<f64>,
        #[arg(long)]
        session_cap: Option<f64>,
        #[arg(long)]
        per_query: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    research_utils::init_tracing();
    let args = Args::parse();

    let engine = build_engine(&args).await?;

    match args.command {
        Command::Ask {
            question,
            mode,
            verbosity,
        } => {
            let input = build_input(&args.session, question, &mode, &verbosity)?;
            let record = engine.execute_query(&args.user, input).await?;
            print_record(&record);
        }
        Command::Submit {
            question,
            mode,
            verbosity,
        } => {
            let input = build_input(&args.session, question, &mode, &verbosity)?;
            let job = engine.enqueue_query(&args.user, input).await?;
            println!("job {} enqueued", job.id);

            loop {
                tokio::time::sleep(Duration::from_millis(500)).await;
                let job = engine.get_job(&job.id, &args.user).await?;
                if !job.status.is_terminal() {
                    continue;
                }
                match (job.result, job.error) {
                    (Some(record), _) => print_record(&record),
                    (None, error) => {
                        println!("job failed: {}", error.unwrap_or_default());
                    }
                }
                break;
            }
        }
        Command::Budget {
            daily,
            monthly,
            session_cap,
            per_query,
        } => {
            let patch = BudgetPatch {
                daily_cap: daily,
                monthly_cap: monthly,
                session_cap,
                per_query_cap: per_query,
            };
            let has_update = daily.is_some()
                || monthly.is_some()
                || session_cap.is_some()
                || per_query.is_some();
            let snapshot = if has_update {
                engine.update_budget_settings(&args.user, patch).await?
            } else {
                engine
                    .budget_snapshot(&args.user, Some(&args.session))
                    .await
            };
            print_budget(&snapshot);
        }
    }

    Ok(())
}

async fn build_engine(args: &Args) -> anyhow::Result<QueryEngine> {
    let config = Arc::new(EngineConfig::default());

    let (primary, fallback): (Arc<dyn LLMProvider>, Option<Arc<dyn LLMProvider>>) =
        if std::env::var("ANTHROPIC_API_KEY").is_ok() {
            let primary = Arc::new(AnthropicProvider::from_env()?);
            let fallback = match OpenAIProvider::from_env() {
                Ok(provider) => Some(Arc::new(provider) as Arc<dyn LLMProvider>),
                Err(_) => None,
            };
            (primary, fallback)
        } else if std::env::var("OPENAI_API_KEY").is_ok() {
            (Arc::new(OpenAIProvider::from_env()?), None)
        } else {
            bail!("set ANTHROPIC_API_KEY or OPENAI_API_KEY to run queries");
        };

    let adapter = Arc::new(AgentAdapter::new(primary, fallback, Arc::clone(&config)));

    let market_config = MarketConfig::default().with_env_keys();
    let market =
        Arc::new(LiveMarketData::new(market_config.clone()).context("market data setup")?);
    let pipeline = Arc::new(EnrichmentPipeline::new(
        market,
        market_config.max_related_tickers,
    ));

    let store = Arc::new(MemoryStore::new());
    store
        .put_session(Session::new(&args.session, &args.user).with_title("CLI session"))
        .await;

    info!(user = %args.user, session = %args.session, "engine ready");
    Ok(QueryEngine::new(
        adapter,
        pipeline,
        store as Arc<dyn QueryStore>,
        config,
        BudgetSettings::default(),
    ))
}

fn build_input(
    session: &str,
    question: String,
    mode: &str,
    verbosity: &str,
) -> anyhow::Result<QueryInput> {
    let mode = match mode {
        "auto" => QueryMode::Auto,
        "fast" => QueryMode::Fast,
        "deep" => QueryMode::Deep,
        other => bail!("unknown mode '{other}' (expected auto, fast, or deep)"),
    };
    let verbosity = match verbosity {
        "brief" => Verbosity::Brief,
        "standard" => Verbosity::Standard,
        "detailed" => Verbosity::Detailed,
        other => bail!("unknown verbosity '{other}' (expected brief, standard, or detailed)"),
    };
    Ok(QueryInput::new(session, question)
        .with_mode(mode)
        .with_verbosity(verbosity))
}

fn print_record(record: &QueryRecord) {
    match &record.response {
        Some(response) => println!("{response}"),
        None => println!(
            "query failed: {}",
            record.error.clone().unwrap_or_default()
        ),
    }

    if !record.artifacts.is_empty() {
        let keys: Vec<&str> = research_core::FragmentKind::all()
            .iter()
            .filter(|kind| record.artifacts.get(**kind).is_some())
            .map(|kind| kind.as_str())
            .collect();
        println!("\nartifacts: {}", keys.join(", "));
    }

    if let Some(usage) = &record.usage {
        println!(
            "tokens: {} in / {} out, cost: {:.4}",
            usage.input_tokens,
            usage.output_tokens,
            usage.cost.total()
        );
    }
}

fn print_budget(snapshot: &research_engine::BudgetSnapshot) {
    let mut table = Table::new();
    table.set_header(["window", "cap", "spent", "remaining"]);
    table.add_row([
        "daily".to_string(),
        format!("{:.2}", snapshot.settings.daily_cap),
        format!("{:.4}", snapshot.spent.daily),
        format!("{:.4}", snapshot.remaining.daily),
    ]);
    table.add_row([
        "monthly".to_string(),
        format!("{:.2}", snapshot.settings.monthly_cap),
        format!("{:.4}", snapshot.spent.monthly),
        format!("{:.4}", snapshot.remaining.monthly),
    ]);
    if let (Some(spent), Some(remaining)) = (snapshot.spent.session, snapshot.remaining.session) {
        table.add_row([
            "session".to_string(),
            format!("{:.2}", snapshot.settings.session_cap),
            format!("{spent:.4}"),
            format!("{remaining:.4}"),
        ]);
    }
    table.add_row([
        "per-query".to_string(),
        format!("{:.2}", snapshot.settings.per_query_cap),
        "-".to_string(),
        "-".to_string(),
    ]);
    println!("{table}");
    println!("as of {}", snapshot.as_of.to_rfc3339());
}
