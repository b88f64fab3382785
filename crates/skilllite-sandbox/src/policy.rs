//! Bash Policy Engine: a single public predicate `validate(command) -> Result<(), String>`
//! with layered, fail-closed checks, plus an idempotent sanitizer distinct from validation.
//!
//! Grounded on `security::policy`'s mandatory deny-path/process tables and
//! `security::scanner`'s regex-rule classification pattern — those two teacher
//! modules never combine into one call, so this is new code synthesized from
//! both, built to the shape the spec calls for.

use regex::Regex;
use std::sync::OnceLock;

pub const MAX_COMMAND_BYTES: usize = 10_000;

/// Primary commands that are always rejected regardless of arguments.
const DENY_LIST: &[&str] = &[
    "rm", "shutdown", "reboot", "halt", "poweroff", "sudo", "su", "curl", "wget", "ssh", "scp",
    "sftp", "nc", "ncat", "netcat", "telnet", "mount", "umount", "passwd", "chmod", "chown",
    "chgrp", "useradd", "userdel", "usermod", "groupadd", "groupdel", "adduser", "deluser",
    "visudo", "iptables", "nft", "systemctl", "launchctl", "kill", "killall", "pkill", "dd",
    "mkfs", "fdisk", "parted",
];

/// Primary commands always accepted: read-only coreutils, text processors,
/// language toolchains, and common dev tooling.
const ALLOW_LIST: &[&str] = &[
    "ls", "cat", "head", "tail", "wc", "sort", "uniq", "cut", "tr", "echo", "printf", "pwd",
    "which", "whoami", "date", "env", "find", "grep", "egrep", "fgrep", "sed", "awk", "diff",
    "file", "stat", "du", "df", "tree", "basename", "dirname", "realpath", "xargs", "tee",
    "git", "make", "cmake", "docker", "kubectl", "dd", "go", "cargo", "rustc", "python",
    "python3", "pip", "pip3", "node", "npm", "npx", "yarn", "pnpm", "java", "javac", "mvn",
    "gradle", "ruby", "gem", "bundle", "php", "composer", "tar", "gzip", "gunzip", "zip",
    "unzip", "jq", "yq", "test", "true", "false", "sleep", "ps", "uname",
];

/// Shell builtins commonly used in scripts (not external programs, always accepted).
const SHELL_BUILTINS: &[&str] = &[
    "cd", "export", "unset", "alias", "unalias", "source", "type", "read", "set", "shift",
    "return", "exit", "break", "continue", "local", "declare", "if", "then", "else", "fi",
    "for", "while", "do", "done", "case", "esac", "function",
];

const SAFE_SHAPE_PREFIXES: &[&str] = &[
    "npm-", "node-", "go-", "py-", "python-", "java-", "rust-", "cargo-", "gem-", "bundle-",
    "php-",
];
const SAFE_SHAPE_SUFFIXES: &[&str] = &[
    "-config", "-version", "-help", "-info", "-check", "-lint", "-fmt", "-test", "-build",
    "-run",
];

struct DangerousPattern {
    regex: Regex,
    intent: &'static str,
}

fn dangerous_patterns() -> &'static Vec<DangerousPattern> {
    static PATTERNS: OnceLock<Vec<DangerousPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let defs: &[(&str, &str)] = &[
            (r"\$\(", "command substitution"),
            (r"`[^`]*`", "backtick substitution"),
            (r"\$\{[^}a-zA-Z0-9_][^}]*\}", "arithmetic/complex expansion"),
            (r";\s*\S", "semicolon chaining"),
            (r"/etc/passwd|/etc/shadow|/etc/hosts|/proc/|/sys/", "sensitive filesystem"),
            (r"\.\./", "path traversal"),
            (r"~[a-zA-Z][a-zA-Z0-9_-]*/", "other-user home access"),
            (r"\$HOME/\.\w+", "hidden files in home"),
            (r"exec\s+\d*[<>]", "fd redirection via exec"),
            (r"\{[^}]*;[^}]*\}", "brace group with embedded commands"),
        ];
        defs.iter()
            .map(|(pattern, intent)| DangerousPattern {
                regex: Regex::new(pattern).expect("dangerous pattern regex is valid"),
                intent,
            })
            .collect()
    })
}

fn pipeline_splitter() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*(?:\|{1,2}|&&)\s*").unwrap())
}

fn primary_command(segment: &str) -> Option<String> {
    segment
        .split_whitespace()
        .next()
        .map(|s| s.to_lowercase())
}

fn is_safe_shape(cmd: &str) -> bool {
    SAFE_SHAPE_PREFIXES.iter().any(|p| cmd.starts_with(p))
        || SAFE_SHAPE_SUFFIXES.iter().any(|s| cmd.ends_with(s))
}

fn classify_primary(cmd: &str) -> Result<(), String> {
    if DENY_LIST.contains(&cmd) {
        return Err(format!("command '{cmd}' is not allowed"));
    }
    if ALLOW_LIST.contains(&cmd) || SHELL_BUILTINS.contains(&cmd) || is_safe_shape(cmd) {
        return Ok(());
    }
    Err(format!(
        "command '{cmd}' is not allowed: not in the allow-list, not a shell builtin, and does not match a safe-shape heuristic"
    ))
}

fn check_sub_validators(segment: &str, primary: &str) -> Result<(), String> {
    match primary {
        "find" if segment.contains("-exec rm") || segment.contains("-delete") => {
            return Err("find: '-exec rm' and '-delete' are not allowed".to_string());
        }
        "sed" if segment.contains("-i") || segment.contains("w ") || segment.contains("w\t") => {
            return Err("sed: in-place edit ('-i') and 'w' commands are not allowed".to_string());
        }
        "awk" if segment.contains("system(") || segment.contains("print >") => {
            return Err("awk: 'system(' and 'print >' are not allowed".to_string());
        }
        "grep" | "egrep" | "fgrep"
            if segment.contains("/etc/") || segment.contains("/proc/") =>
        {
            return Err("grep: access to /etc/ or /proc/ is not allowed".to_string());
        }
        _ => {}
    }
    Ok(())
}

/// Strip NUL and control bytes (except `\n`, `\t`) and trim outer whitespace.
/// Idempotent: `sanitize(sanitize(s)) == sanitize(s)`.
pub fn sanitize(command: &str) -> String {
    let filtered: String = command
        .chars()
        .filter(|&c| c == '\n' || c == '\t' || !c.is_control())
        .collect();
    filtered.trim().to_string()
}

/// Validate a bash command string against the layered policy. Fails closed
/// on the first rejection; returns the matched reason so the rejection is
/// human-readable (§7 user-visible behavior).
pub fn validate(command: &str) -> Result<(), String> {
    if command.is_empty() {
        return Err("command is empty".to_string());
    }
    if command.len() > MAX_COMMAND_BYTES {
        return Err(format!(
            "command exceeds maximum length of {MAX_COMMAND_BYTES} bytes"
        ));
    }

    for pattern in dangerous_patterns() {
        if pattern.regex.is_match(command) {
            return Err(format!(
                "dangerous pattern detected ({}): matched {:?}",
                pattern.intent,
                pattern.regex.as_str()
            ));
        }
    }

    let primary = primary_command(command)
        .ok_or_else(|| "command has no primary token".to_string())?;
    classify_primary(&primary)?;
    check_sub_validators(command, &primary)?;

    for segment in pipeline_splitter().split(command) {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        if let Some(seg_primary) = primary_command(segment) {
            if DENY_LIST.contains(&seg_primary.as_str()) {
                return Err(format!(
                    "command '{seg_primary}' is not allowed in pipeline segment '{segment}'"
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_plain_echo() {
        assert!(validate("echo hello").is_ok());
    }

    #[test]
    fn rejects_rm_rf_root() {
        let err = validate("rm -rf /").unwrap_err();
        assert!(err.contains("not allowed"));
    }

    #[test]
    fn rejects_command_substitution() {
        let err = validate("echo $(whoami)").unwrap_err();
        assert!(err.contains("dangerous pattern"));
    }

    #[test]
    fn allows_pipes_and_boolean_chains() {
        assert!(validate("cat file.txt | grep foo").is_ok());
        assert!(validate("git status && git diff").is_ok());
    }

    #[test]
    fn rejects_deny_listed_command_in_pipeline_segment() {
        let err = validate("echo hi && sudo rm -rf /").unwrap_err();
        assert!(err.contains("sudo") || err.contains("not allowed"));
    }

    #[test]
    fn rejects_traversal_and_sensitive_paths() {
        assert!(validate("cat ../secret.txt").is_err());
        assert!(validate("cat /etc/passwd").is_err());
    }

    #[test]
    fn find_sub_validator_rejects_exec_rm() {
        assert!(validate("find . -exec rm {} \\;").is_err());
    }

    #[test]
    fn accepts_safe_shape_commands() {
        assert!(validate("cargo-audit check").is_ok());
        assert!(validate("eslint-config run").is_ok());
    }

    #[test]
    fn sanitize_is_idempotent_and_strips_control_bytes() {
        let s = "hello\x00\x07world\n\t";
        let once = sanitize(s);
        assert_eq!(sanitize(&once), once);
        assert!(!once.contains('\0'));
        assert!(!once.chars().any(|c| c.is_control() && c != '\n' && c != '\t'));
    }

    #[test]
    fn rejects_overlong_command() {
        let cmd = "echo ".to_string() + &"a".repeat(MAX_COMMAND_BYTES);
        assert!(validate(&cmd).is_err());
    }
}
