//! Thin CLI wrapper (spec.md §6): forwards flags into the `RunOptions`
//! mapping and prints the `TaskResult` as JSON. Carries no independent logic.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use wayfinder_browser::{CdpAdapter, CdpConfig};
use wayfinder_llm::{HttpLlmClient, HttpLlmClientConfig, LlmClient};
use wayfinder_runner::TaskRunner;
use wayfinder_stealth::StealthRuntime;
use wayfinder_types::model::{RunOptions, SessionKey};

#[derive(Parser)]
#[command(name = "wayfinder", about = "LLM-driven browser automation engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one task: drive `url` with `instruction` through the plan-act-observe loop.
    Run(RunArgs),
}

#[derive(Parser)]
struct RunArgs {
    url: String,
    instruction: String,

    #[arg(long)]
    visual_mode: bool,
    #[arg(long)]
    stealth_mode: bool,
    #[arg(long, default_value_t = true)]
    headless: bool,
    #[arg(long)]
    max_steps: Option<u32>,
    #[arg(long)]
    step_timeout_ms: Option<u64>,
    #[arg(long)]
    llm_timeout_ms: Option<u64>,
    #[arg(long)]
    llm_max_retries: Option<u32>,
    #[arg(long)]
    context_max_chars: Option<usize>,
    #[arg(long)]
    hierarchical_planner: Option<bool>,
    #[arg(long)]
    hierarchical_threshold_chars: Option<usize>,
    #[arg(long)]
    session_key: Option<String>,
    #[arg(long)]
    dom_max_chars: Option<usize>,
    #[arg(long)]
    max_same_error: Option<u32>,
    #[arg(long)]
    submit_wait_ms: Option<u64>,
    #[arg(long)]
    deadline_secs: Option<u64>,

    #[arg(long, env = "WAYFINDER_LOGS_DIR", default_value = "logs")]
    logs_dir: PathBuf,
    #[arg(long, env = "WAYFINDER_LLM_ENDPOINT")]
    llm_endpoint: Option<String>,
    #[arg(long, env = "WAYFINDER_LLM_API_KEY")]
    llm_api_key: Option<String>,
    #[arg(long, env = "WAYFINDER_LLM_MODEL", default_value = "gpt-4o-mini")]
    llm_model: String,
}

impl RunArgs {
    fn run_options(&self) -> RunOptions {
        let defaults = RunOptions::default();
        RunOptions {
            visual_mode: self.visual_mode,
            stealth_mode: self.stealth_mode,
            headless: self.headless,
            max_steps: self.max_steps.unwrap_or(defaults.max_steps),
            step_timeout_ms: self.step_timeout_ms.unwrap_or(defaults.step_timeout_ms),
            llm_timeout_ms: self.llm_timeout_ms.unwrap_or(defaults.llm_timeout_ms),
            llm_max_retries: self.llm_max_retries.unwrap_or(defaults.llm_max_retries),
            context_max_chars: self.context_max_chars.unwrap_or(defaults.context_max_chars),
            hierarchical_planner: self.hierarchical_planner,
            hierarchical_threshold_chars: self
                .hierarchical_threshold_chars
                .unwrap_or(defaults.hierarchical_threshold_chars),
            session_key: self.session_key.clone().map(SessionKey),
            dom_max_chars: self.dom_max_chars.unwrap_or(defaults.dom_max_chars),
            max_same_error: self.max_same_error.unwrap_or(defaults.max_same_error),
            submit_wait_ms: self.submit_wait_ms.unwrap_or(defaults.submit_wait_ms),
            deadline: self
                .deadline_secs
                .map(Duration::from_secs)
                .or(defaults.deadline),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    wayfinder_observe::tracing::init_tracing();

    let cli = Cli::parse();
    let args = match cli.command {
        Command::Run(args) => args,
    };

    let llm: Arc<dyn LlmClient> = match (&args.llm_endpoint, &args.llm_api_key) {
        (Some(endpoint), Some(api_key)) => Arc::new(HttpLlmClient::new(HttpLlmClientConfig {
            endpoint: endpoint.clone(),
            api_key: api_key.clone(),
            model: args.llm_model.clone(),
        })),
        _ => {
            anyhow::bail!(
                "no LLM backend configured: pass --llm-endpoint/--llm-api-key or set \
                 WAYFINDER_LLM_ENDPOINT/WAYFINDER_LLM_API_KEY"
            );
        }
    };

    let (bus, _rx) = tokio::sync::broadcast::channel(64);
    let cdp = Arc::new(CdpAdapter::new(
        CdpConfig {
            headless: args.headless,
            ..CdpConfig::default()
        },
        bus,
    ));
    let stealth = Arc::new(StealthRuntime::new());

    let runner = TaskRunner::new(cdp, llm, stealth, args.logs_dir.clone());
    let result = runner
        .run_task(&args.url, &args.instruction, args.run_options())
        .await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}
