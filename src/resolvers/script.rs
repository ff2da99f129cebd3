//! `[[SCRIPT=name|arg|...]]` - run a user script from the template library.
//!
//! The script body is written to a temporary file and run by the configured
//! interpreter with the remaining directive arguments as positional
//! parameters. Standard output, minus one trailing newline, replaces the
//! directive.
//!
//! When the script fails, the interpreter's diagnostic is searched for a line
//! number inside the temporary file so the alert can point at the offending
//! line of the script body:
//!
//! ```text
//! Error in script greet
//! greet: line 2: nonexistent: command not found
//! Line 2: nonexistent
//! ```

use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::ScriptConfig;
use crate::core::QuicktextError;
use crate::engine::{CacheScope, CachedValue, ExpansionSession, Resolver};

/// Runs scripts named by `SCRIPT` directives. Never cached: a script may have
/// side effects or return a different value each time.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptResolver;

#[async_trait]
impl Resolver for ScriptResolver {
    fn scope(&self, _arguments: &[String]) -> CacheScope {
        CacheScope::Uncached
    }

    async fn fetch(&self, arguments: &[String], session: &mut ExpansionSession) -> Result<CachedValue> {
        let Some((name, script_arguments)) = arguments.split_first() else {
            return Ok(CachedValue::Text(String::new()));
        };
        let body = session
            .templates()
            .script(name)
            .map(|script| script.body.clone())
            .ok_or_else(|| QuicktextError::ScriptNotFound {
                name: name.clone(),
            })?;

        let output = run_script(name, &body, script_arguments, &session.config().script).await?;
        Ok(CachedValue::Text(output))
    }
}

async fn run_script(name: &str, body: &str, arguments: &[String], config: &ScriptConfig) -> Result<String> {
    let interpreter = which::which(&config.interpreter).map_err(|e| QuicktextError::ScriptFailed {
        script: name.to_string(),
        line: 0,
        source_line: None,
        message: format!("interpreter '{}' not found: {e}", config.interpreter),
    })?;

    let mut file = tempfile::Builder::new()
        .prefix("quicktext-")
        .suffix(".script")
        .tempfile()
        .context("Failed to create a temporary script file")?;
    file.write_all(body.as_bytes()).context("Failed to write the script body")?;
    file.flush().context("Failed to write the script body")?;

    tracing::debug!("Running script '{}' with {} argument(s) via {}", name, arguments.len(), config.interpreter);

    let mut cmd = Command::new(&interpreter);
    cmd.arg(file.path())
        .args(arguments)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let duration = Duration::from_secs(config.timeout_secs);
    let output = match timeout(duration, cmd.output()).await {
        Ok(result) => result.map_err(|e| QuicktextError::ScriptFailed {
            script: name.to_string(),
            line: 0,
            source_line: None,
            message: format!("failed to start '{}': {e}", config.interpreter),
        })?,
        Err(_) => {
            tracing::warn!("Script '{}' timed out after {} seconds", name, duration.as_secs());
            return Err(QuicktextError::ScriptFailed {
                script: name.to_string(),
                line: 0,
                source_line: None,
                message: format!("timed out after {} seconds", duration.as_secs()),
            }
            .into());
        }
    };

    if output.status.success() {
        let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if stdout.ends_with('\n') {
            stdout.pop();
            if stdout.ends_with('\r') {
                stdout.pop();
            }
        }
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    tracing::debug!("Script '{}' exited with {:?}", name, output.status.code());
    Err(script_failure(name, body, file.path(), &stderr, output.status.code()).into())
}

fn script_failure(name: &str, body: &str, script_path: &Path, stderr: &str, code: Option<i32>) -> QuicktextError {
    let path = script_path.display().to_string();
    let line = failing_line(&path, stderr).unwrap_or(0);
    let source_line = line
        .checked_sub(1)
        .and_then(|index| body.lines().nth(index))
        .map(|text| text.trim().to_string());

    let message = if stderr.trim().is_empty() {
        code.map_or_else(
            || "terminated by a signal".to_string(),
            |code| format!("exited with status {code}"),
        )
    } else {
        stderr.trim().replace(&path, name)
    };

    QuicktextError::ScriptFailed {
        script: name.to_string(),
        line,
        source_line,
        message,
    }
}

/// First line number the interpreter reported for `path`.
///
/// Matches the common shapes `path: line 3:` (bash), `path: 3:` (dash) and
/// `File "path", line 3` (python).
fn failing_line(path: &str, stderr: &str) -> Option<usize> {
    let pattern = format!(r#"{}(?:", line |: line |:)\s*(\d+)"#, regex::escape(path));
    let regex = Regex::new(&pattern).ok()?;
    regex.captures(stderr).and_then(|captures| captures[1].parse().ok())
}
