//! The Run Logger (spec.md §4.7): one markdown file per task, written
//! incrementally in step order. After step 1, only *changes* in
//! `PageContext` are logged verbatim; unchanged sections emit a one-line
//! "unchanged" note, keeping typical logs to a few hundred lines rather
//! than tens of thousands. Large payloads (full snapshots, model replies
//! over 4KB) are spilled to sibling sidecar files and referenced by path.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use wayfinder_types::model::{PageContext, RunId};

const SIDECAR_THRESHOLD: usize = 4 * 1024;

/// A per-section diff against the previous step's `PageContext`. `None`
/// means "unchanged since last step" and is rendered as a one-line note
/// rather than the full value.
#[derive(Default)]
struct ContextDiff {
    title: Option<String>,
    url: Option<String>,
    headings: Option<String>,
    forms: Option<String>,
    text: Option<String>,
    interactive: Option<String>,
}

fn diff_context(prev: Option<&PageContext>, current: &PageContext) -> ContextDiff {
    let Some(prev) = prev else {
        return ContextDiff {
            title: Some(current.title.clone()),
            url: Some(current.url.clone()),
            headings: Some(format!("{:?}", current.headings)),
            forms: Some(serde_json::to_string(&current.forms).unwrap_or_default()),
            text: Some(current.text.clone()),
            interactive: Some(serde_json::to_string(&current.interactive).unwrap_or_default()),
        };
    };
    ContextDiff {
        title: (prev.title != current.title).then(|| current.title.clone()),
        url: (prev.url != current.url).then(|| current.url.clone()),
        headings: (prev.headings != current.headings).then(|| format!("{:?}", current.headings)),
        forms: (serde_json::to_string(&prev.forms).ok() != serde_json::to_string(&current.forms).ok())
            .then(|| serde_json::to_string(&current.forms).unwrap_or_default()),
        text: (prev.text != current.text).then(|| current.text.clone()),
        interactive: (serde_json::to_string(&prev.interactive).ok()
            != serde_json::to_string(&current.interactive).ok())
        .then(|| serde_json::to_string(&current.interactive).unwrap_or_default()),
    }
}

fn render_diff(diff: &ContextDiff) -> String {
    let mut out = String::new();
    let mut section = |name: &str, value: &Option<String>| {
        match value {
            Some(v) => out.push_str(&format!("- **{name}**: {v}\n")),
            None => out.push_str(&format!("- **{name}**: unchanged\n")),
        }
    };
    section("title", &diff.title);
    section("url", &diff.url);
    section("headings", &diff.headings);
    section("forms", &diff.forms);
    section("interactive", &diff.interactive);
    section("text", &diff.text);
    out
}

/// One task's run log: a markdown file plus a sibling sidecar directory for
/// payloads too large to inline.
pub struct RunLogger {
    run_id: RunId,
    log_path: PathBuf,
    sidecar_dir: PathBuf,
    previous_context: Option<PageContext>,
    buffer: String,
}

impl RunLogger {
    /// Opens `logs/<run_id>.md` under `logs_dir`, creating the directory
    /// tree (including the sidecar directory) if needed.
    pub async fn open(
        logs_dir: &Path,
        run_id: RunId,
        instruction: &str,
        url: &str,
        options_summary: &str,
    ) -> std::io::Result<Self> {
        fs::create_dir_all(logs_dir).await?;
        let log_path = logs_dir.join(format!("{}.md", run_id.0));
        let sidecar_dir = logs_dir.join(&run_id.0);
        fs::create_dir_all(&sidecar_dir).await?;

        let mut logger = Self {
            run_id,
            log_path,
            sidecar_dir,
            previous_context: None,
            buffer: String::new(),
        };
        logger.buffer.push_str(&format!(
            "# Run {}\n\n- **instruction**: {instruction}\n- **url**: {url}\n- **options**: {options_summary}\n\n",
            logger.run_id.0
        ));
        logger.flush().await?;
        Ok(logger)
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }

    /// Logs one loop iteration: the context diff since the previous step,
    /// the planner prompt/reply (spilled to a sidecar if large), the tool
    /// invoked, and its result summary.
    pub async fn log_step(
        &mut self,
        step_index: u32,
        context: &PageContext,
        plan_reason: &str,
        tool_name: Option<&str>,
        tool_args: Option<&Value>,
        tool_result: Option<&Value>,
        screenshot: Option<&str>,
    ) -> std::io::Result<()> {
        let diff = diff_context(self.previous_context.as_ref(), context);
        self.previous_context = Some(context.clone());

        self.buffer.push_str(&format!("## Step {step_index}\n\n"));
        self.buffer.push_str(&render_diff(&diff));
        self.buffer.push_str(&format!("- **reason**: {plan_reason}\n"));

        if let Some(tool) = tool_name {
            self.buffer.push_str(&format!("- **tool**: `{tool}`\n"));
            if let Some(args) = tool_args {
                self.buffer.push_str(&format!(
                    "- **args**: {}\n",
                    self.inline_or_sidecar(step_index, "args", args).await?
                ));
            }
            if let Some(result) = tool_result {
                self.buffer.push_str(&format!(
                    "- **result**: {}\n",
                    self.inline_or_sidecar(step_index, "result", result).await?
                ));
            }
        }
        if let Some(shot) = screenshot {
            self.buffer.push_str(&format!("- **screenshot**: {shot}\n"));
        }
        self.buffer.push('\n');
        self.flush().await
    }

    /// Inlines `value` if its serialized form is under the 4KB sidecar
    /// threshold, otherwise writes it to `logs/<run_id>/step-N-<label>.json`
    /// and returns a reference to that path.
    async fn inline_or_sidecar(
        &self,
        step_index: u32,
        label: &str,
        value: &Value,
    ) -> std::io::Result<String> {
        let rendered = serde_json::to_string_pretty(value).unwrap_or_default();
        if rendered.len() <= SIDECAR_THRESHOLD {
            return Ok(rendered);
        }
        let path = self.sidecar_dir.join(format!("step-{step_index}-{label}.json"));
        fs::write(&path, &rendered).await?;
        Ok(format!("see {}", path.display()))
    }

    pub async fn log_footer(&mut self, outcome: &str) -> std::io::Result<()> {
        self.buffer.push_str(&format!("## Outcome\n\n{outcome}\n"));
        self.flush().await
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await?;
        file.write_all(self.buffer.as_bytes()).await?;
        file.flush().await?;
        self.buffer.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn ctx(title: &str) -> PageContext {
        PageContext {
            title: title.to_string(),
            url: "https://example.com".into(),
            headings: vec!["A".into()],
            forms: vec![],
            dom_preview: vec![],
            iframes: vec![],
            interactive: Default::default(),
            text: "body".into(),
            captured_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn log_file_exists_after_open_and_close() {
        let dir = tempfile::tempdir().unwrap();
        let run_id = RunId::new(Utc::now());
        let mut logger = RunLogger::open(dir.path(), run_id, "do a thing", "https://example.com", "{}")
            .await
            .unwrap();
        logger
            .log_step(0, &ctx("Home"), "navigating", Some("dom.navigate"), Some(&json!({"url": "https://example.com"})), Some(&json!({"title": "Home"})), None)
            .await
            .unwrap();
        logger.log_footer("success").await.unwrap();
        assert!(logger.path().exists());
        let contents = std::fs::read_to_string(logger.path()).unwrap();
        assert!(contents.contains("## Step 0"));
        assert!(contents.contains("## Outcome"));
    }

    #[tokio::test]
    async fn unchanged_sections_are_noted_not_repeated() {
        let dir = tempfile::tempdir().unwrap();
        let run_id = RunId::new(Utc::now());
        let mut logger = RunLogger::open(dir.path(), run_id, "x", "https://example.com", "{}")
            .await
            .unwrap();
        logger.log_step(0, &ctx("Home"), "r0", None, None, None, None).await.unwrap();
        logger.log_step(1, &ctx("Home"), "r1", None, None, None, None).await.unwrap();
        let contents = std::fs::read_to_string(logger.path()).unwrap();
        let step1 = contents.split("## Step 1").nth(1).unwrap();
        assert!(step1.contains("**title**: unchanged"));
    }

    #[tokio::test]
    async fn large_payload_spills_to_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let run_id = RunId::new(Utc::now());
        let mut logger = RunLogger::open(dir.path(), run_id, "x", "https://example.com", "{}")
            .await
            .unwrap();
        let big = json!({"blob": "x".repeat(5000)});
        logger
            .log_step(0, &ctx("Home"), "r", Some("extract.products"), None, Some(&big), None)
            .await
            .unwrap();
        let contents = std::fs::read_to_string(logger.path()).unwrap();
        assert!(contents.contains("see "));
        assert!(!contents.contains(&"x".repeat(5000)));
    }
}
