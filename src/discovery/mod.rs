//! The capability-discovery sub-protocol: fork a command in `-c` mode and
//! classify its stdout into legal/required keys and legal values.

use crate::process::{ExecResult, ProcessSpawner, SpawnRequest};
use crate::tokenizer::{tokenize, TokenizerState};

/// Result of forking a command for discovery. Never a hard error on its
/// own — a child that misbehaves or exits non-zero is recorded in `error`
/// and `stderr_bytes` so the caller can attach it to the `Parameter` node,
/// per the spec's "record an error string, don't abort resolution" policy.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryResult {
    pub legal_keys: Vec<String>,
    pub required_keys: Vec<String>,
    pub legal_values: Vec<String>,
    pub stderr_bytes: Vec<u8>,
    pub error: Option<String>,
}

/// One ancestor parameter contributing to the discovery argv: its key (empty
/// string if the ancestor had none) and its value.
#[derive(Debug, Clone)]
pub struct AncestorPair {
    pub key: String,
    pub value: String,
}

#[allow(clippy::too_many_arguments)]
pub fn run_discovery(
    spawner: &dyn ProcessSpawner,
    libexec_path: &str,
    sysconf_cwd: &str,
    ancestors: &[AncestorPair],
    token: &str,
    env: Vec<(String, String)>,
    line_cap: usize,
) -> DiscoveryResult {
    let mut args = vec!["-c".to_string()];
    for pair in ancestors {
        args.push(pair.key.clone());
        args.push(pair.value.clone());
    }
    args.push(token.to_string());

    let request = SpawnRequest {
        program: libexec_path.to_string(),
        args,
        cwd: Some(sysconf_cwd.to_string()),
        env,
        stdin: Some(Vec::new()),
    };

    match spawner.spawn(&request) {
        Ok(exec) => classify(exec, line_cap),
        Err(crate::error::ShellError::ChildFailure(cf)) => {
            // Spec §4.3 classifies stdout (step 3) regardless of exit status
            // (step 5) — a child can advertise valid keys/values and still
            // exit non-zero, and both the candidates and the error carry
            // through to the caller.
            let reason = format!("child {}", cf);
            let mut result = classify(ExecResult { stdout: cf.stdout, stderr: cf.stderr, exit_code: cf.exit_code.unwrap_or(-1) }, line_cap);
            result.error = Some(match result.error {
                Some(cap_error) => format!("{cap_error}; {reason}"),
                None => reason,
            });
            result
        }
        Err(e) => DiscoveryResult { error: Some(e.to_string()), ..Default::default() },
    }
}

fn classify(exec: ExecResult, line_cap: usize) -> DiscoveryResult {
    let mut result = DiscoveryResult { stderr_bytes: exec.stderr, ..Default::default() };
    let mut accepted = 0usize;
    let mut start = 0usize;
    let bytes = &exec.stdout;

    while start < bytes.len() {
        let newline_pos = bytes[start..].iter().position(|&b| b == b'\n');
        let (line, next_start) = match newline_pos {
            Some(rel) => (&bytes[start..start + rel], start + rel + 1),
            None => {
                // Trailing non-newline-terminated data: skip it entirely.
                break;
            }
        };
        start = next_start;

        if accepted >= line_cap {
            if result.error.is_none() {
                result.error = Some(format!("discovery line cap ({line_cap}) exceeded"));
            }
            continue;
        }

        if line.is_empty() {
            continue;
        }
        let prefix = line[0];
        if prefix != b'-' && prefix != b'*' {
            continue;
        }
        let rest = &line[1..];
        let retok = match tokenize(rest, TokenizerState::default()) {
            Ok(r) => r,
            Err(_) => continue,
        };
        if retok.argv.len() != 1 || retok.final_state.in_token {
            continue;
        }
        let decoded = String::from_utf8_lossy(&retok.argv[0]).into_owned();
        let required = prefix == b'*';
        match decoded.split_once('=') {
            Some((key, _value)) => {
                if required {
                    result.required_keys.push(key.to_string());
                } else {
                    result.legal_keys.push(key.to_string());
                }
            }
            None => result.legal_values.push(decoded),
        }
        accepted += 1;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec(stdout: &str) -> ExecResult {
        ExecResult { stdout: stdout.as_bytes().to_vec(), stderr: Vec::new(), exit_code: 0 }
    }

    #[test]
    fn classifies_required_and_optional_keys_and_values() {
        let result = classify(exec("*name=\nport=\n-timeout=\nenabled\n"), 1000);
        assert_eq!(result.required_keys, vec!["name"]);
        assert_eq!(result.legal_keys, vec!["timeout"]);
        assert_eq!(result.legal_values, vec!["enabled"]);
    }

    #[test]
    fn skips_malformed_lines() {
        let result = classify(exec("not-a-candidate\n*ok=\n"), 1000);
        assert_eq!(result.required_keys, vec!["ok"]);
    }

    #[test]
    fn drops_trailing_unterminated_line() {
        let result = classify(exec("*ok=\nmore-without-newline"), 1000);
        assert_eq!(result.required_keys, vec!["ok"]);
    }

    #[test]
    fn child_failure_still_classifies_stdout() {
        let cf = crate::error::ChildFailureError {
            exit_reason: "exited with status 1".to_string(),
            exit_code: Some(1),
            stdout: b"*name=\nport=\n".to_vec(),
            stderr: b"boom\n".to_vec(),
        };
        let reason = format!("child {}", cf);
        let mut result = classify(ExecResult { stdout: cf.stdout, stderr: cf.stderr, exit_code: 1 }, 1000);
        result.error = Some(reason);
        assert_eq!(result.required_keys, vec!["name"]);
        assert_eq!(result.legal_keys, vec!["port"]);
        assert_eq!(result.stderr_bytes, b"boom\n");
        assert!(result.error.is_some());
    }

    #[test]
    fn respects_line_cap() {
        let mut stdout = String::new();
        for i in 0..5 {
            stdout.push_str(&format!("-k{i}=\n"));
        }
        let result = classify(exec(&stdout), 2);
        assert_eq!(result.legal_keys.len(), 2);
        assert!(result.error.is_some());
    }
}
