use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::GrepConfig;
use crate::search::{SearchError, SearchOptions, Searcher};
use crate::task::{ContextLine, Match};

/// Searches files by invoking the external grep binary.
///
/// grep's exit codes drive classification: 0 means matches were found,
/// 1 means a clean scan with no matches, anything else is a tool error.
#[derive(Debug, Clone)]
pub struct GrepSearcher {
    config: GrepConfig,
}

impl GrepSearcher {
    pub fn new(config: GrepConfig) -> Self {
        Self { config }
    }

    fn base_args(&self, pattern: &str, opts: SearchOptions) -> Vec<String> {
        let mut args = vec!["-n".to_string()];
        if self.config.extended {
            args.push("-E".to_string());
        }
        if opts.case_insensitive {
            args.push("-i".to_string());
        }
        if let Some(k) = opts.context_lines.filter(|k| *k > 0) {
            args.push("-C".to_string());
            args.push(k.to_string());
        }
        if self.config.max_matches > 0 {
            args.push("-m".to_string());
            args.push(self.config.max_matches.to_string());
        }
        // "--" so patterns starting with a dash are not taken as flags
        args.push("--".to_string());
        args.push(pattern.to_string());
        args
    }
}

#[async_trait]
impl Searcher for GrepSearcher {
    async fn compile_check(&self, pattern: &str) -> Result<(), SearchError> {
        // A scan of /dev/null exits 1 when the expression is fine and 2
        // when grep cannot compile it.
        let output = Command::new(&self.config.binary)
            .args(self.base_args(pattern, SearchOptions::default()))
            .arg("/dev/null")
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        match output.status.code() {
            Some(0) | Some(1) => Ok(()),
            _ => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(SearchError::PatternInvalid(stderr.trim().to_string()))
            }
        }
    }

    async fn search(
        &self,
        pattern: &str,
        file: &Path,
        opts: SearchOptions,
    ) -> Result<Vec<Match>, SearchError> {
        let output = Command::new(&self.config.binary)
            .args(self.base_args(pattern, opts))
            .arg(file)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        match output.status.code() {
            Some(0) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                Ok(parse_output(file, &stdout))
            }
            Some(1) => Ok(Vec::new()),
            code => Err(SearchError::Tool {
                code,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }
}

/// Parse `grep -n` output for a single file into matches.
///
/// Match lines look like `12:text`, context lines (with `-C`) like
/// `11-text`, and `--` separates context groups. Context before a match
/// attaches to that match; context after a match attaches to the previous
/// match in the same group.
fn parse_output(file: &Path, stdout: &str) -> Vec<Match> {
    let mut matches: Vec<Match> = Vec::new();
    let mut leading: Vec<ContextLine> = Vec::new();
    let mut group_has_match = false;

    for raw in stdout.lines() {
        if raw == "--" {
            leading.clear();
            group_has_match = false;
            continue;
        }
        let Some((line_number, is_match, text)) = split_line(raw) else {
            continue;
        };
        if is_match {
            matches.push(Match {
                path: file.to_path_buf(),
                line_number,
                line: text.to_string(),
                context: std::mem::take(&mut leading),
            });
            group_has_match = true;
        } else {
            let ctx = ContextLine {
                line_number,
                line: text.to_string(),
            };
            if group_has_match {
                if let Some(last) = matches.last_mut() {
                    last.context.push(ctx);
                }
            } else {
                leading.push(ctx);
            }
        }
    }

    matches
}

/// Split a grep output line into (line number, is-match, text).
fn split_line(raw: &str) -> Option<(u64, bool, &str)> {
    let idx = raw.find(|c: char| !c.is_ascii_digit())?;
    if idx == 0 {
        return None;
    }
    let line_number: u64 = raw[..idx].parse().ok()?;
    let rest = &raw[idx..];
    match rest.as_bytes()[0] {
        b':' => Some((line_number, true, &rest[1..])),
        b'-' => Some((line_number, false, &rest[1..])),
        _ => None,
    }
}
