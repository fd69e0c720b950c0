// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Integration tests for the `ringsync` binary.

use anyhow::Result;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::io::Read;
use std::process::{Child, Command, Output, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

fn ringsync() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ringsync"))
}

fn run_with_args(args: &[&str]) -> Result<Output> {
    Ok(ringsync().args(args).output()?)
}

/// Start the binary, let it run for `run_for`, then deliver `signal`.
fn run_until_signal(args: &[&str], run_for: Duration, signal: Signal) -> Result<(i32, String)> {
    let mut child: Child = ringsync()
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;

    std::thread::sleep(run_for);
    kill(Pid::from_raw(child.id() as i32), signal)?;

    let status = match child.wait_timeout(Duration::from_secs(10))? {
        Some(status) => status,
        None => {
            child.kill()?;
            anyhow::bail!("ringsync did not exit after {:?}", signal);
        }
    };

    let mut stdout = String::new();
    if let Some(mut pipe) = child.stdout.take() {
        pipe.read_to_string(&mut stdout)?;
    }
    Ok((status.code().unwrap_or(-1), stdout))
}

fn assert_usage_error(output: &Output) {
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Example: ringsync 4 3"),
        "missing usage example in: {}",
        stderr
    );
}

#[test]
fn test_missing_arguments_print_usage() -> Result<()> {
    assert_usage_error(&run_with_args(&[])?);
    assert_usage_error(&run_with_args(&["4"])?);
    Ok(())
}

#[test]
fn test_extra_or_non_numeric_arguments_print_usage() -> Result<()> {
    assert_usage_error(&run_with_args(&["4", "3", "2"])?);
    assert_usage_error(&run_with_args(&["four", "3"])?);
    Ok(())
}

#[test]
fn test_out_of_range_counts_are_rejected() -> Result<()> {
    for args in [
        ["0", "3"],
        ["10", "3"],
        ["4", "0"],
        ["4", "10"],
        ["-1", "3"],
        ["4", "-2"],
        ["4294967296", "3"],
    ] {
        let output = run_with_args(&args)?;
        assert!(!output.status.success(), "{:?} should fail", args);
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(
            stderr.contains("Parameters should be between 1 and 9."),
            "{:?} printed: {}",
            args,
            stderr
        );
    }
    Ok(())
}

#[test]
fn test_help_exits_successfully() -> Result<()> {
    let output = run_with_args(&["--help"])?;
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("producerNumber"));
    Ok(())
}

#[test]
fn test_sigint_dumps_buffer_and_exits() -> Result<()> {
    let (code, stdout) = run_until_signal(&["4", "3"], Duration::from_millis(1500), Signal::SIGINT)?;
    assert_eq!(code, 0);

    let lines: Vec<&str> = stdout.lines().collect();
    let top = lines
        .iter()
        .position(|line| *line == "    --------------")
        .expect("dump header missing");
    assert_eq!(lines[top + 1].get(..5), Some("8   |"));
    assert_eq!(lines.last().copied(), Some("    --------------"));

    let rows: Vec<&str> = lines[top..]
        .iter()
        .copied()
        .filter(|line| line.ends_with("  |"))
        .collect();
    assert_eq!(rows.len(), 9);
    assert!(rows[8].starts_with("0   |"));
    Ok(())
}

#[test]
fn test_sigterm_also_shuts_down() -> Result<()> {
    let (code, stdout) = run_until_signal(&["1", "1"], Duration::from_millis(500), Signal::SIGTERM)?;
    assert_eq!(code, 0);
    assert!(stdout.contains("    |------------|"));
    Ok(())
}

#[test]
fn test_report_lines_precede_dump() -> Result<()> {
    let (code, stdout) = run_until_signal(&["9", "9"], Duration::from_millis(4500), Signal::SIGINT)?;
    assert_eq!(code, 0);

    let dump_start = stdout.find("    --------------").expect("dump missing");
    let (reports, dump) = stdout.split_at(dump_start);
    assert!(
        reports.contains("insert value 0x"),
        "expected at least one insert report before the dump"
    );
    assert!(!dump.contains("[Info]"));
    Ok(())
}
