//! Deterministic sanitizer for remote-shell output
//!
//! Remote shells invoked non-interactively still sometimes dump their
//! exported environment (profile hooks, `env -i` escapes, etc) mixed in with
//! real program output. This module removes that noise while preserving
//! anything that looks like actual stdout/stderr from the executed program.

use regex::Regex;
use std::sync::LazyLock;

/// Lines emitted by OpenSSH and similar transports that never carry program output.
static TRANSPORT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)^Warning: Permanently added .* to the list of known hosts\.?$").unwrap(),
        Regex::new(r"(?i)^Host key verification failed\.?$").unwrap(),
        Regex::new(r"(?i)^The authenticity of host .* can't be established\.?$").unwrap(),
        Regex::new(r"(?i)^ECDSA key fingerprint is .*$").unwrap(),
        Regex::new(r"(?i)^Are you sure you want to continue connecting.*\?$").unwrap(),
        Regex::new(r"(?i)^Pseudo-terminal will not be allocated.*$").unwrap(),
    ]
});

static ENV_VAR_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^[A-Z_][A-Z0-9_]*=('.*'|".*"|[^=]*)$"#).unwrap());

/// Markers that bound the "leading dump" phase emitted by login/interactive shells.
const LEADING_MARKERS: &[&str] = &[
    "HOME=", "PATH=", "USER=", "PWD=", "PS1=", "PS2=", "IFS=", "OPTIND=", "PPID=",
];

fn is_transport_line(line: &str) -> bool {
    TRANSPORT_PATTERNS.iter().any(|re| re.is_match(line.trim_end()))
}

fn is_env_var_line(line: &str) -> bool {
    ENV_VAR_LINE.is_match(line.trim_end())
}

fn is_leading_marker(line: &str) -> bool {
    LEADING_MARKERS.iter().any(|m| line.starts_with(m))
        || line.starts_with("BASH_EXECUTION_STRING=set")
        || line.starts_with("BASH_VERSION=")
}

/// Result of sanitizing a single stream (stdout or stderr alone).
fn strip_transport(text: &str) -> String {
    text.lines()
        .filter(|l| !is_transport_line(l))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Diagnostic string used when bulk-dump detection strips everything and the
/// command failed with nothing usable left over.
fn exit_code_diagnostic(exit_code: i32) -> String {
    format!("(no output; remote command exited with code {})", exit_code)
}

/// Sanitize combined remote-shell output.
///
/// `stdout` and `stderr` are sanitized together for bulk-dump detection (the
/// dump ratio is computed over stdout lines, since that's where shells emit
/// `env`/`set` output), but the function returns the cleaned primary output
/// the caller should surface, choosing stderr as a fallback per §4.3.
pub fn sanitize(stdout: &str, stderr: &str, exit_code: i32) -> String {
    let stdout = strip_transport(stdout);
    let cleaned_stderr = strip_transport(stderr);

    let lines: Vec<&str> = stdout.lines().collect();
    let non_empty: Vec<&str> = lines.iter().copied().filter(|l| !l.trim().is_empty()).collect();

    if !non_empty.is_empty() {
        let env_count = non_empty.iter().filter(|l| is_env_var_line(l)).count();
        let ratio = env_count as f64 / non_empty.len() as f64;

        if ratio >= 0.8 {
            // Bulk dump on a failed run: prefer stderr over whatever's left
            // of stdout, even if a handful of non-env lines survived the
            // filter. A leftover stdout fragment doesn't explain a crash;
            // the stderr text does.
            if exit_code != 0 && !cleaned_stderr.trim().is_empty() {
                return finalize(&cleaned_stderr);
            }

            // Otherwise: keep only the non-env, non-empty lines.
            let real: Vec<&str> = non_empty
                .iter()
                .copied()
                .filter(|l| !is_env_var_line(l))
                .collect();

            if real.is_empty() {
                return if exit_code != 0 {
                    exit_code_diagnostic(exit_code)
                } else {
                    String::new()
                };
            }

            return finalize(&real.join("\n"));
        }
    }

    // Not a bulk dump: trim only a leading run of env-var lines, bounded by
    // well-known markers, until the first real line is seen.
    let mut result = Vec::with_capacity(lines.len());
    let mut trimming = true;

    for line in &lines {
        if trimming {
            if line.trim().is_empty() {
                continue;
            }
            if is_env_var_line(line) && is_leading_marker(line) {
                continue;
            }
            if is_env_var_line(line) {
                // An env-looking line that isn't one of the bounding markers
                // still counts as part of the dump while we haven't seen real
                // output yet.
                continue;
            }
            trimming = false;
        }
        result.push(*line);
    }

    finalize(&result.join("\n"))
}

fn finalize(text: &str) -> String {
    let cleaned: Vec<&str> = text
        .lines()
        .filter(|l| !is_transport_line(l))
        .collect();

    if cleaned.iter().all(|l| l.trim().is_empty() || is_transport_line(l)) {
        return String::new();
    }

    cleaned.join("\n").trim().to_string()
}

/// Did the sanitized run succeed? Exit code 0 after sanitization is success.
pub fn is_success(exit_code: i32) -> bool {
    exit_code == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_dump_is_stripped() {
        let mut lines: Vec<String> = (0..90).map(|i| format!("VAR{i}=val{i}")).collect();
        lines.push("program-output".to_string());
        let stdout = lines.join("\n");

        let result = sanitize(&stdout, "", 0);
        assert_eq!(result, "program-output");
    }

    #[test]
    fn bulk_dump_with_failure_prefers_stderr_over_leftover_stdout() {
        // The documented failure scenario: same 90-line dump plus a single
        // `program-output` line as the success case, but this run failed and
        // left a traceback on stderr. The one surviving stdout line doesn't
        // explain the crash, so stderr wins even though `real` isn't empty.
        let mut lines: Vec<String> = (0..90).map(|i| format!("VAR{i}=val{i}")).collect();
        lines.push("program-output".to_string());
        let stdout = lines.join("\n");
        let stderr = "Traceback (most recent call last):\nValueError: boom";

        let result = sanitize(&stdout, stderr, 2);
        assert_eq!(result, stderr);
    }

    #[test]
    fn bulk_dump_with_failure_and_no_real_output_prefers_stderr() {
        let mut lines: Vec<String> = (0..90).map(|i| format!("VAR{i}=val{i}")).collect();
        // all lines are env lines, ratio 100% with no real output line at all
        lines.push("ANOTHERVAR=x".to_string());
        let stdout = lines.join("\n");
        let stderr = "Traceback (most recent call last):\nValueError: boom";

        let result = sanitize(&stdout, stderr, 2);
        assert_eq!(result, stderr);
    }

    #[test]
    fn bulk_dump_with_failure_and_no_stderr_reports_exit_code() {
        let lines: Vec<String> = (0..50).map(|i| format!("VAR{i}=val{i}")).collect();
        let stdout = lines.join("\n");

        let result = sanitize(&stdout, "", 7);
        assert!(result.contains('7'));
    }

    #[test]
    fn leading_dump_is_trimmed_until_real_output() {
        let stdout = "HOME=/root\nPATH=/usr/bin\nUSER=root\nreal line one\nVAR=leftover-but-kept";
        let result = sanitize(stdout, "", 0);
        assert_eq!(result, "real line one\nVAR=leftover-but-kept");
    }

    #[test]
    fn transport_warnings_are_always_removed() {
        let stdout =
            "Warning: Permanently added 'host' (ED25519) to the list of known hosts.\nhello";
        let result = sanitize(stdout, "", 0);
        assert_eq!(result, "hello");
    }

    #[test]
    fn solely_transport_output_returns_empty() {
        let stdout = "Warning: Permanently added 'host' (ED25519) to the list of known hosts.";
        let result = sanitize(stdout, "", 0);
        assert_eq!(result, "");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let mut lines: Vec<String> = (0..90).map(|i| format!("VAR{i}=val{i}")).collect();
        lines.push("program-output".to_string());
        let stdout = lines.join("\n");

        let once = sanitize(&stdout, "", 0);
        let twice = sanitize(&once, "", 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn preserves_output_with_no_transport_or_env_lines() {
        let stdout = "plain program output\nsecond line";
        let result = sanitize(stdout, "", 0);
        assert_eq!(result, stdout);
    }
}
