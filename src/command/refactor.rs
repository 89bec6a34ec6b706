//! Engine-driven commands: analysis and plan-producing refactorings.
//!
//! Each invocation starts (or adopts) one engine, asks it for a plan and
//! stops it again before the plan is applied locally inside the safe
//! workflow.

use anyhow::{bail, Context, Result};
use std::future::Future;
use uuid::Uuid;

use crate::cli::ApplyOptions;
use crate::domain::{FileInfo, PatternApplied, RefactorPlan, Report};
use crate::engine::{EngineClient, EngineSupervisor};
use crate::error::ToolResult;
use crate::report::save_analysis;

use super::{confirm, CommandContext};

/// Hotspots printed by `analyze`
const TOP_HOTSPOTS: usize = 10;

pub enum RefactorKind {
    Deduplicate,
    Idiomatize,
    Pattern(String),
}

impl RefactorKind {
    fn label(&self) -> String {
        match self {
            RefactorKind::Deduplicate => "deduplication".to_string(),
            RefactorKind::Idiomatize => "idiomatization".to_string(),
            RefactorKind::Pattern(name) => format!("{} pattern", name),
        }
    }
}

pub async fn run_analyze(ctx: &CommandContext, path: &str, report: bool) -> Result<()> {
    let workspace = ctx.workspace();
    let files = scope(workspace.collect_files().await?, path);
    println!("🔍 Analyzing {} file(s) under {}", files.len(), path);

    let analysis = with_engine(ctx, |client| async move { client.analyze(path, &files).await })
        .await
        .context("Analysis failed")?;

    println!(
        "Files: {}  Symbols: {}  Duplicate groups: {}",
        analysis.total_files,
        analysis.total_symbols,
        analysis.duplicates.len()
    );

    let mut hotspots = analysis.hotspots.clone();
    hotspots.sort_by(|a, b| b.cyclomatic_complexity.cmp(&a.cyclomatic_complexity));
    if !hotspots.is_empty() {
        println!("\nComplexity hotspots:");
        for hotspot in hotspots.iter().take(TOP_HOTSPOTS) {
            println!(
                "  {}:{} {} (cyclomatic {}, cognitive {})",
                hotspot.file,
                hotspot.line,
                hotspot.symbol,
                hotspot.cyclomatic_complexity,
                hotspot.cognitive_complexity
            );
        }
    }

    if report {
        let session_id = Uuid::new_v4().to_string();
        let saved = save_analysis(&ctx.root, &session_id, &analysis)?;
        println!("\n📄 Baseline written to {}", saved.display());
    }

    Ok(())
}

pub async fn run_refactor(
    ctx: &CommandContext,
    kind: RefactorKind,
    path: &str,
    options: ApplyOptions,
) -> Result<()> {
    let mut workspace = ctx.workspace();
    let language = workspace.runner().project_kind().language();
    let files = scope(workspace.collect_files().await?, path);
    println!("🔍 Requesting {} for {} file(s)", kind.label(), files.len());

    let plan = with_engine(ctx, |client| {
        let kind = &kind;
        async move {
            match kind {
                RefactorKind::Deduplicate => client.deduplicate(path, &files).await,
                RefactorKind::Idiomatize => client.idiomatize(path, &files, language).await,
                RefactorKind::Pattern(name) => client.pattern(name, path, &files).await,
            }
        }
    })
    .await
    .with_context(|| format!("Engine failed to produce a {} plan", kind.label()))?;

    if plan.changes.is_empty() {
        println!("Nothing to change.");
        return Ok(());
    }

    show_plan(&plan);

    if !options.yes && !confirm("Apply these changes?")? {
        println!("Cancelled. No files were changed.");
        return Ok(());
    }

    let result = workspace
        .apply_plan_safe(&plan, !options.no_tests)
        .await
        .context("Failed to apply plan")?;

    if result.success {
        println!(
            "✅ Applied {} change(s){}",
            result.changes.len(),
            if options.no_tests {
                ", tests not run"
            } else {
                ", tests passed"
            }
        );
    } else {
        println!(
            "❌ Plan not applied: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
        println!("   The repository is back at its pre-change checkpoint.");
    }

    if options.report {
        let session_id = Uuid::new_v4().to_string();
        let mut report = Report::from_results(&session_id, std::slice::from_ref(&result));
        match &kind {
            RefactorKind::Deduplicate => {
                report = report.with_duplicates(plan.changes.len());
            }
            RefactorKind::Pattern(name) if result.success => {
                report = report.with_pattern(PatternApplied {
                    pattern: name.clone(),
                    files: result.changes.iter().map(|c| c.path.clone()).collect(),
                    description: plan.description.clone(),
                });
            }
            _ => {}
        }
        let saved = report.save(&ctx.root)?;
        println!("📄 Report written to {}", saved.display());
    }

    if !result.success {
        bail!("Refactoring was rolled back");
    }
    Ok(())
}

/// Run `call` against a supervised engine, stopping it afterwards whatever
/// the outcome.
async fn with_engine<F, Fut, T>(ctx: &CommandContext, call: F) -> Result<T>
where
    F: FnOnce(EngineClient) -> Fut,
    Fut: Future<Output = ToolResult<T>>,
{
    let mut supervisor = EngineSupervisor::new(ctx.config.engine.clone())?;
    supervisor
        .start()
        .await
        .context("Failed to start the analysis engine")?;

    let outcome = call(supervisor.client().clone()).await;
    supervisor.stop().await;
    Ok(outcome?)
}

fn show_plan(plan: &RefactorPlan) {
    if !plan.description.is_empty() {
        println!("\n{}", plan.description);
    }
    println!("\nProposed changes ({}):", plan.changes.len());
    for change in &plan.changes {
        let before = change.original.lines().count() as i64;
        let after = change.modified.lines().count() as i64;
        let state = if change.original.is_empty() {
            "new".to_string()
        } else {
            format!("{:+} lines", after - before)
        };
        if change.description.is_empty() {
            println!("  {} ({})", change.path, state);
        } else {
            println!("  {} ({}): {}", change.path, state, change.description);
        }
    }
    println!();
}

/// Keep the files under `path`, a repository-relative directory.
fn scope(files: Vec<FileInfo>, path: &str) -> Vec<FileInfo> {
    let prefix = path.trim_start_matches("./").trim_end_matches('/');
    if prefix.is_empty() || prefix == "." {
        return files;
    }
    files
        .into_iter()
        .filter(|f| {
            f.path == prefix
                || f.path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
        .collect()
}
