use anyhow::{bail, Result};
use std::time::Duration;

use crate::runner::TestResult;

use super::CommandContext;

pub async fn run_test(ctx: &CommandContext) -> Result<()> {
    let workspace = ctx.workspace();
    let result = workspace.runner().run_tests().await;
    report("Tests", &result)
}

pub async fn run_build(ctx: &CommandContext) -> Result<()> {
    let workspace = ctx.workspace();
    let result = workspace.runner().build().await;
    report("Build", &result)
}

pub async fn run_lint(ctx: &CommandContext) -> Result<()> {
    let workspace = ctx.workspace();
    let result = workspace.runner().run_lint().await;

    if result.skipped {
        println!("Lint skipped: {}", result.output);
        return Ok(());
    }

    for issue in &result.issues {
        match issue.column {
            Some(column) => println!(
                "{}:{}:{}: {} {}",
                issue.file, issue.line, column, issue.severity, issue.message
            ),
            None => println!(
                "{}:{}: {} {}",
                issue.file, issue.line, issue.severity, issue.message
            ),
        }
    }
    if result.issues.is_empty() && !result.output.trim().is_empty() {
        println!("{}", result.output.trim_end());
    }

    if result.success {
        println!("✅ Lint passed in {}", seconds(result.duration));
        Ok(())
    } else {
        bail!("Lint reported {} issue(s)", result.issues.len())
    }
}

fn report(label: &str, result: &TestResult) -> Result<()> {
    if result.skipped {
        println!("{} skipped: {}", label, result.output);
        return Ok(());
    }

    println!("$ {}", result.command);
    if !result.output.trim().is_empty() {
        println!("{}", result.output.trim_end());
    }

    if result.success {
        println!("✅ {} passed in {}", label, seconds(result.duration));
        Ok(())
    } else if result.timed_out {
        bail!("{} timed out after {}", label, seconds(result.duration))
    } else {
        bail!("{} failed (exit code {})", label, result.exit_code)
    }
}

fn seconds(duration: Duration) -> String {
    format!("{:.1}s", duration.as_secs_f64())
}
