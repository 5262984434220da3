// daemon/src/daemon/shell.rs
use crate::daemon::task::TaskContext;
use anyhow::{anyhow, Context, Result};
use std::process::Stdio;
use tokio::process::Command;

const STDERR_TAIL_BYTES: usize = 512;

/// Splits a command line the way a POSIX shell would, without running one.
pub fn parse_command(cmd: &str) -> Result<Vec<String>> {
    let argv = shlex::split(cmd).ok_or_else(|| anyhow!("Unbalanced quoting in command: {}", cmd))?;
    if argv.is_empty() {
        return Err(anyhow!("Empty command"));
    }
    Ok(argv)
}

/// Runs `argv` to completion. The child is killed if this future is
/// dropped, which is how a deadline expiry reaches the process.
pub async fn run_command(argv: Vec<String>, ctx: TaskContext) -> Result<()> {
    let (program, args) = argv.split_first().ok_or_else(|| anyhow!("Empty command"))?;
    let output = Command::new(program)
        .args(args)
        .env("WARDEN_TASK_ID", &ctx.task_id)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("Failed to spawn '{}'", program))?;

    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let tail = stderr_tail(stderr.trim_end());
    if tail.is_empty() {
        Err(anyhow!("'{}' exited with {}", program, output.status))
    } else {
        Err(anyhow!("'{}' exited with {}: {}", program, output.status, tail))
    }
}

fn stderr_tail(stderr: &str) -> &str {
    if stderr.len() <= STDERR_TAIL_BYTES {
        return stderr;
    }
    let mut start = stderr.len() - STDERR_TAIL_BYTES;
    while !stderr.is_char_boundary(start) {
        start += 1;
    }
    &stderr[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daemon::task::TaskArgs;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    fn ctx() -> TaskContext {
        TaskContext::new("shell_1".into(), TaskArgs::Null, Arc::new(AtomicBool::new(false)))
    }

    #[test]
    fn parses_quoted_arguments() {
        assert_eq!(
            parse_command("echo 'hello world' x").unwrap(),
            vec!["echo", "hello world", "x"]
        );
        assert!(parse_command("   ").is_err());
        assert!(parse_command("echo 'open").is_err());
    }

    #[test]
    fn tail_keeps_the_end() {
        let long = "x".repeat(600) + "END";
        let tail = stderr_tail(&long);
        assert_eq!(tail.len(), STDERR_TAIL_BYTES);
        assert!(tail.ends_with("END"));
    }

    #[tokio::test]
    async fn successful_command_is_ok() {
        run_command(parse_command("true").unwrap(), ctx()).await.unwrap();
    }

    #[tokio::test]
    async fn failure_carries_status_and_stderr() {
        let argv = parse_command("sh -c 'echo disk full >&2; exit 3'").unwrap();
        let err = run_command(argv, ctx()).await.unwrap_err().to_string();
        assert!(err.contains("exit status: 3"), "{}", err);
        assert!(err.contains("disk full"), "{}", err);
    }

    #[tokio::test]
    async fn task_id_is_exported() {
        let argv = parse_command(r#"sh -c 'test "$WARDEN_TASK_ID" = shell_1'"#).unwrap();
        run_command(argv, ctx()).await.unwrap();
    }
}
