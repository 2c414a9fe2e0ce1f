//! The Task Runner (spec.md §4.1): the plan-act-observe loop that drives one
//! `Task` from its starting URL to a [`TaskResult`]. Owns the page for the
//! task's lifetime and wires together every other component: context
//! collection, planning (hierarchical or standard), tool execution, stall
//! detection, result aggregation, pacing, and the run log.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::{info, warn};

use wayfinder_browser::{AdapterErrorKind, Cdp, CdpAdapter};
use wayfinder_context::{disclose, ContextCollector};
use wayfinder_llm::{LlmClient, LlmOptions};
use wayfinder_planner::hierarchical::{infer_page_type, should_use_hierarchical, PageOutline};
use wayfinder_planner::{HierarchicalPlanner, Level1Outcome, StandardPlanner};
use wayfinder_stealth::StealthControl;
use wayfinder_tools::{default_registry, ToolContext, ToolRegistry};
use wayfinder_types::model::{
    ErrorKind, PlanStep, ResultError, RunOptions, SessionKey, Task, TaskResult, ToolHistory,
    ToolHistoryEntry,
};
use wayfinder_types::WayfinderError;

use crate::aggregator::ResultAggregator;
use crate::bridge::{LlmFieldAdapter, LlmSemanticAdapter};
use crate::pacing::HostPacer;
use crate::run_log::RunLogger;
use crate::stall::StallTracker;

/// Locks held per `SessionKey` so a second task against an in-use session is
/// refused rather than silently racing a shared cookie jar (spec.md §6: "a
/// second Task against a locked session_key is refused with a
/// `ConfigurationError`", resolved in this crate's composition root).
static SESSION_LOCKS: Lazy<DashMap<String, ()>> = Lazy::new(DashMap::new);

struct SessionGuard(String);

impl Drop for SessionGuard {
    fn drop(&mut self) {
        SESSION_LOCKS.remove(&self.0);
    }
}

fn acquire_session(key: &SessionKey) -> Result<SessionGuard, WayfinderError> {
    if SESSION_LOCKS.insert(key.0.clone(), ()).is_some() {
        return Err(WayfinderError::Configuration(format!(
            "session_key {:?} is already in use by another task",
            key.0
        )));
    }
    Ok(SessionGuard(key.0.clone()))
}

/// Everything the runner needs to drive a task that outlives any single
/// `Task` invocation: the browser adapter, the LLM backend, and process-wide
/// pacing. Built once per process (or per test) and shared across tasks.
pub struct TaskRunner {
    cdp: Arc<CdpAdapter>,
    llm: Arc<dyn LlmClient>,
    stealth: Arc<dyn StealthControl + Send + Sync>,
    pacer: Arc<HostPacer>,
    logs_dir: PathBuf,
}

impl TaskRunner {
    pub fn new(
        cdp: Arc<CdpAdapter>,
        llm: Arc<dyn LlmClient>,
        stealth: Arc<dyn StealthControl + Send + Sync>,
        logs_dir: PathBuf,
    ) -> Self {
        wayfinder_observe::tracing::init_tracing();
        Self {
            cdp,
            llm,
            stealth,
            pacer: Arc::new(HostPacer::default()),
            logs_dir,
        }
    }

    /// Runs one task end to end (spec.md §4.1), returning a [`TaskResult`]
    /// even when the task fails — failures are carried in `TaskResult::error`
    /// rather than propagated, since `run_task` is the crate's public
    /// boundary and callers always want the run log/screenshots regardless
    /// of outcome.
    pub async fn run_task(&self, url: &str, instruction: &str, options: RunOptions) -> TaskResult {
        let task = Task::new(url, instruction, options);
        let run_id = task.run_id.clone();

        let _session_guard = match &task.session_key {
            Some(key) => match acquire_session(key) {
                Ok(guard) => Some(guard),
                Err(err) => return self.early_failure(&run_id, err),
            },
            None => None,
        };

        let options_summary = serde_json::to_string(&task.options).unwrap_or_default();
        let mut logger = match RunLogger::open(&self.logs_dir, run_id.clone(), instruction, url, &options_summary).await
        {
            Ok(logger) => logger,
            Err(err) => {
                return self.early_failure(
                    &run_id,
                    WayfinderError::Configuration(format!("could not open run log: {err}")),
                )
            }
        };

        let result = self.drive(&task, &mut logger).await;

        let (success, data, screenshots, steps_taken, error) = match result {
            Ok(outcome) => (
                outcome.success,
                outcome.data,
                outcome.screenshots,
                outcome.steps_taken,
                outcome.error,
            ),
            Err(err) => (false, Value::Null, Vec::new(), 0, Some(err)),
        };

        let outcome_line = match &error {
            Some(err) => format!("failed: {} ({:?})", err.message, err.kind),
            None => "success".to_string(),
        };
        let _ = logger.log_footer(&outcome_line).await;

        let mut labels = wayfinder_observe::guard::LabelMap::new();
        labels.insert("success".to_string(), success.to_string());
        wayfinder_observe::metrics::inc("wayfinder_tasks_total", labels);
        wayfinder_observe::metrics::observe(
            "wayfinder_task_steps",
            steps_taken as u64,
            wayfinder_observe::guard::LabelMap::new(),
        );

        TaskResult {
            success,
            result: data,
            steps_taken,
            run_log: logger.path().display().to_string(),
            screenshots,
            error,
            evaluation: None,
        }
    }

    fn early_failure(&self, run_id: &wayfinder_types::model::RunId, err: WayfinderError) -> TaskResult {
        warn!(run_id = %run_id.0, error = %err, "task rejected before execution");
        TaskResult {
            success: false,
            result: Value::Null,
            steps_taken: 0,
            run_log: String::new(),
            screenshots: Vec::new(),
            error: Some(to_result_error(&err)),
            evaluation: None,
        }
    }

    async fn drive(&self, task: &Task, logger: &mut RunLogger) -> Result<DriveOutcome, ResultError> {
        let options = &task.options;
        let deadline = options.deadline.map(|d| Instant::now() + d);

        let page = self
            .cdp
            .create_page(&task.url)
            .await
            .map_err(|e| to_result_error(&WayfinderError::External(format!("create_page: {:?}", e.kind))))?;

        if options.stealth_mode {
            if let Err(e) = self.stealth.apply_stealth(&task.url).await {
                warn!(run_id = %task.run_id.0, error = %e, "stealth profile application failed, continuing without it");
            }
        }

        let host = HostPacer::host_of(&task.url);
        self.pacer.wait_turn(&host).await;
        self.navigate_with_retry(page, &task.url, options.step_timeout_ms).await?;

        let collector = ContextCollector::new(Arc::clone(&self.cdp));
        let registry: ToolRegistry<CdpAdapter> = default_registry();

        let field_llm = Arc::new(LlmFieldAdapter::new(
            Arc::clone(&self.llm),
            LlmOptions { timeout: Duration::from_millis(options.llm_timeout_ms), ..Default::default() },
            options.llm_max_retries,
        ));
        let semantic_validator = Arc::new(LlmSemanticAdapter::new(
            Arc::clone(&self.llm),
            LlmOptions { timeout: Duration::from_millis(options.llm_timeout_ms), ..Default::default() },
            options.llm_max_retries,
        ));

        let site_domain = host.clone();
        let run_dir = self.logs_dir.join(&task.run_id.0);

        let mut history = ToolHistory::new(20);
        let mut aggregator = ResultAggregator::new();
        let mut stall = StallTracker::new();
        let llm_options = LlmOptions {
            timeout: Duration::from_millis(options.llm_timeout_ms),
            ..Default::default()
        };

        for step_index in 0..options.max_steps {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    info!(run_id = %task.run_id.0, step_index, "wall-clock deadline reached, stopping loop");
                    break;
                }
            }

            collector.dismiss_cookie_banner(page).await;

            let form_focus = !wayfinder_planner::hierarchical::parse_instruction_kv(&task.instruction).is_empty();
            let snapshot = collector
                .collect(page, step_index, form_focus)
                .await
                .map_err(|e| to_result_error(&WayfinderError::Transient(format!("context collection: {e}"))))?;

            let plan_step = self
                .decide(
                    &task.instruction,
                    &snapshot,
                    &history,
                    step_index,
                    options,
                    &llm_options,
                )
                .await
                .map_err(|e| to_result_error(&WayfinderError::Planner(e.to_string())))?;

            match plan_step {
                PlanStep::Complete { reason, result } => {
                    aggregator.record_explicit_result(result);
                    logger
                        .log_step(step_index, &snapshot.context, &reason, None, None, None, None)
                        .await
                        .ok();
                    return Ok(DriveOutcome {
                        success: true,
                        data: aggregator.data(),
                        screenshots: aggregator.screenshots(),
                        steps_taken: step_index + 1,
                        error: None,
                    });
                }
                PlanStep::Error { reason } => {
                    logger
                        .log_step(step_index, &snapshot.context, &reason, None, None, None, None)
                        .await
                        .ok();
                    return Ok(DriveOutcome {
                        success: !aggregator.is_empty(),
                        data: aggregator.data(),
                        screenshots: aggregator.screenshots(),
                        steps_taken: step_index + 1,
                        error: Some(ResultError {
                            kind: ErrorKind::Planner,
                            message: reason,
                            suggestion: None,
                        }),
                    });
                }
                PlanStep::Navigate { url } => {
                    let host = HostPacer::host_of(&url);
                    self.pacer.wait_turn(&host).await;
                    if let Err(err) = self.navigate_with_retry(page, &url, options.step_timeout_ms).await {
                        logger
                            .log_step(step_index, &snapshot.context, "navigate failed", Some("dom.navigate"), None, Some(&serde_json::json!({"error": err.message.clone()})), None)
                            .await
                            .ok();
                        history.push(ToolHistoryEntry {
                            step_index,
                            tool_name: "dom.navigate".to_string(),
                            args_summary: url.clone(),
                            result_summary: String::new(),
                            error: Some(err.message.clone()),
                        });
                        continue;
                    }
                    logger
                        .log_step(step_index, &snapshot.context, "navigating", Some("dom.navigate"), Some(&serde_json::json!({"url": url.clone()})), None, None)
                        .await
                        .ok();
                    history.push(ToolHistoryEntry {
                        step_index,
                        tool_name: "dom.navigate".to_string(),
                        args_summary: url,
                        result_summary: "ok".to_string(),
                        error: None,
                    });
                }
                PlanStep::Tool { tool_name, args, reason } => {
                    if stall.is_abandoned(&tool_name) {
                        history.push(ToolHistoryEntry {
                            step_index,
                            tool_name: tool_name.clone(),
                            args_summary: args.to_string(),
                            result_summary: String::new(),
                            error: Some("tool abandoned after repeated identical failure".to_string()),
                        });
                        continue;
                    }

                    let ctx = ToolContext::new(
                        Arc::clone(&self.cdp),
                        page,
                        run_dir.clone(),
                        site_domain.clone(),
                        task.instruction.clone(),
                        Arc::clone(&field_llm) as Arc<dyn wayfinder_formfill::FieldLlm>,
                    )
                    .with_semantic_validator(Arc::clone(&semantic_validator) as Arc<dyn wayfinder_extract::SemanticValidator>)
                    .with_timeouts(
                        Duration::from_millis(options.step_timeout_ms),
                        options.max_same_error,
                        options.submit_wait_ms,
                    );

                    let output = registry.invoke(&ctx, &tool_name, args.clone()).await;
                    aggregator.record_tool_result(&tool_name, &output);

                    let screenshot_path = output.get("path").and_then(Value::as_str).map(|s| s.to_string());
                    let error_message = output.get("error").and_then(|e| e.get("message")).and_then(Value::as_str).map(str::to_string);

                    logger
                        .log_step(
                            step_index,
                            &snapshot.context,
                            &reason,
                            Some(&tool_name),
                            Some(&args),
                            Some(&output),
                            screenshot_path.as_deref(),
                        )
                        .await
                        .ok();

                    history.push(ToolHistoryEntry {
                        step_index,
                        tool_name: tool_name.clone(),
                        args_summary: args.to_string(),
                        result_summary: if error_message.is_none() { "ok".to_string() } else { String::new() },
                        error: error_message,
                    });
                    stall.update(&history, options.max_same_error);
                }
            }
        }

        Ok(DriveOutcome {
            success: !aggregator.is_empty(),
            data: aggregator.data(),
            screenshots: aggregator.screenshots(),
            steps_taken: options.max_steps,
            error: if aggregator.is_empty() {
                Some(ResultError {
                    kind: ErrorKind::PartialSuccess,
                    message: "max_steps exhausted without an explicit completion".to_string(),
                    suggestion: Some("increase max_steps or simplify the instruction".to_string()),
                })
            } else {
                None
            },
        })
    }

    async fn decide(
        &self,
        instruction: &str,
        snapshot: &wayfinder_context::PageSnapshot,
        history: &ToolHistory,
        step_index: u32,
        options: &RunOptions,
        llm_options: &LlmOptions,
    ) -> Result<PlanStep, wayfinder_planner::AgentError> {
        let context_chars = snapshot.context.approx_serialized_chars();
        let use_hierarchical = should_use_hierarchical(
            instruction,
            context_chars,
            options.hierarchical_threshold_chars,
            options.hierarchical_planner,
        );

        if !use_hierarchical {
            let planner = StandardPlanner::new(self.llm.as_ref(), llm_options.clone(), options.llm_max_retries);
            return planner.decide(instruction, &snapshot.context, history, step_index).await;
        }

        let planner = HierarchicalPlanner::new(self.llm.as_ref(), llm_options.clone(), options.llm_max_retries);
        let page_type = infer_page_type(&snapshot.context);
        let outline = PageOutline::from_context(&snapshot.context, page_type);

        match planner.level_one(instruction, &outline, step_index).await? {
            Level1Outcome::Resolved(step) => Ok(step),
            Level1Outcome::NeedsDetails { decision, paths } => {
                let mut disclosures = BTreeMap::new();
                for path in &paths {
                    disclosures.insert(path.clone(), disclose(snapshot, path));
                }
                planner.level_two(instruction, &decision, &disclosures, history).await
            }
        }
    }

    /// Retries navigation with exponential backoff (200ms, 400ms, 800ms) on
    /// transient adapter failures, matching the retry shape
    /// `wayfinder-llm::invoke_with_retry` uses for LLM calls.
    async fn navigate_with_retry(
        &self,
        page: wayfinder_browser::PageId,
        url: &str,
        step_timeout_ms: u64,
    ) -> Result<(), ResultError> {
        let deadline = Duration::from_millis(step_timeout_ms);
        let mut delay = Duration::from_millis(200);
        let mut last_err = None;
        for attempt in 0..3u32 {
            match self.cdp.navigate(page, url, deadline).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    let retryable = matches!(err.kind, AdapterErrorKind::NavTimeout | AdapterErrorKind::CdpIo);
                    last_err = Some(err);
                    if !retryable || attempt == 2 {
                        break;
                    }
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
        Err(to_result_error(&WayfinderError::External(format!(
            "navigation to {url} failed: {:?}",
            last_err.map(|e| e.kind)
        ))))
    }
}

struct DriveOutcome {
    success: bool,
    data: Value,
    screenshots: Vec<String>,
    steps_taken: u32,
    error: Option<ResultError>,
}

fn to_result_error(err: &WayfinderError) -> ResultError {
    ResultError {
        kind: err.kind(),
        message: err.message(),
        suggestion: err.suggestion(),
    }
}
