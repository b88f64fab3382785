//! Common utilities for sandbox implementations
//!
//! This module provides shared functionality used by both macOS and Linux
//! sandbox implementations, including process monitoring and resource limits.

// ============================================================
// Resource Limits Constants (Single Source of Truth)
// ============================================================

/// Default maximum memory limit in MB
pub const DEFAULT_MAX_MEMORY_MB: u64 = 256;

/// Default execution timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default file size limit in MB
pub const DEFAULT_FILE_SIZE_LIMIT_MB: u64 = 10;

/// Maximum number of processes (fork bomb protection)
pub const DEFAULT_MAX_PROCESSES: u64 = 50;

/// Memory check interval in milliseconds
pub const MEMORY_CHECK_INTERVAL_MS: u64 = 100;

/// Get memory usage of a process in bytes (platform-specific implementation)
/// Returns None if memory information cannot be retrieved
#[cfg(target_os = "macos")]
pub fn get_process_memory(pid: u32) -> Option<u64> {
    use std::process::Command;
    
    let output = Command::new("ps")
        .args(["-o", "rss=", "-p", &pid.to_string()])
        .output()
        .ok()?;
    
    if output.status.success() {
        let rss_str = String::from_utf8_lossy(&output.stdout);
        // ps returns RSS in KB, convert to bytes
        if let Ok(rss_kb) = rss_str.trim().parse::<u64>() {
            return Some(rss_kb * 1024);
        }
    }
    
    None
}

/// Get memory usage of a process in bytes (Linux version)
/// Uses /proc/<pid>/status to read VmRSS
#[cfg(target_os = "linux")]
pub fn get_process_memory(pid: u32) -> Option<u64> {
    let status = std::fs::read_to_string(format!("/proc/{}/status", pid)).ok()?;

    for line in status.lines() {
        if line.starts_with("VmRSS:") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 2 {
                if let Ok(rss_kb) = parts[1].parse::<u64>() {
                    return Some(rss_kb * 1024);
                }
            }
            break;
        }
    }

    None
}

/// Get memory usage of a process in bytes (Windows version)
/// Uses tasklist command to get working set size
#[cfg(target_os = "windows")]
pub fn get_process_memory(pid: u32) -> Option<u64> {
    use std::process::Command;

    // Use tasklist to get memory info
    // Format: tasklist /FI "PID eq <pid>" /FO CSV /NH
    let output = Command::new("tasklist")
        .args(["/FI", &format!("PID eq {}", pid), "/FO", "CSV", "/NH"])
        .output()
        .ok()?;

    if output.status.success() {
        let output_str = String::from_utf8_lossy(&output.stdout);
        // CSV format: "Image Name","PID","Session Name","Session#","Mem Usage"
        // Example: "python.exe","1234","Console","1","50,000 K"
        for line in output_str.lines() {
            if line.contains(&pid.to_string()) {
                // Parse the memory field (last column)
                let parts: Vec<&str> = line.split(',').collect();
                if parts.len() >= 5 {
                    // Remove quotes and "K" suffix, handle comma in numbers
                    let mem_str = parts[4]
                        .trim()
                        .trim_matches('"')
                        .replace(" K", "")
                        .replace(",", "");
                    if let Ok(mem_kb) = mem_str.parse::<u64>() {
                        return Some(mem_kb * 1024);
                    }
                }
            }
        }
    }

    None
}

/// Get peak RSS of all waited-for children via getrusage(RUSAGE_CHILDREN).
/// Returns bytes on all platforms (macOS reports bytes, Linux reports KB).
#[cfg(unix)]
pub(crate) fn get_children_peak_rss_bytes() -> Option<u64> {
    use libc::{getrusage, rusage, RUSAGE_CHILDREN};
    let mut usage: rusage = unsafe { std::mem::zeroed() };
    let ret = unsafe { getrusage(RUSAGE_CHILDREN, &mut usage) };
    if ret != 0 {
        return None;
    }
    let maxrss = usage.ru_maxrss;
    if maxrss <= 0 {
        return None;
    }
    #[cfg(target_os = "macos")]
    {
        // macOS: ru_maxrss is in bytes
        Some(maxrss as u64)
    }
    #[cfg(not(target_os = "macos"))]
    {
        // Linux: ru_maxrss is in kilobytes
        Some(maxrss as u64 * 1024)
    }
}

#[cfg(not(unix))]
pub(crate) fn get_children_peak_rss_bytes() -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_memory_check_interval() {
        assert_eq!(MEMORY_CHECK_INTERVAL_MS, 100);
    }
}
