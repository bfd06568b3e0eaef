//! I/O error adapters.
//!
//! Enrich `io::Error` with the operation, the path and a platform-aware hint,
//! for use with `map_err` in both per-item and `anyhow` code paths.
//!
//! Usage:
//!   // per-item transfer code returning Result<_, TransferError>
//!   fs::write(dst, bytes).map_err(io_failure("write member", dst))?;
//!
//!   // application code returning anyhow::Result<_>
//!   fs::read_dir(dir).map_err(io_error_with_help("list directory", dir))?;

use anyhow::anyhow;
use std::io;
use std::path::Path;

use crate::errors::TransferError;

fn hint(e: &io::Error) -> Option<&'static str> {
    #[cfg(unix)]
    if let Some(code) = e.raw_os_error() {
        let by_code = match code {
            libc::EACCES | libc::EPERM => Some("permission denied; check ownership and write permissions"),
            libc::ENOENT => Some("path not found; verify it exists"),
            libc::EEXIST => Some("already exists; remove the target or use --replace"),
            libc::ENOSPC => Some("insufficient space on device"),
            libc::EROFS => Some("read-only filesystem; cannot write here"),
            libc::EISDIR => Some("is a directory; a file was expected"),
            libc::ENOTDIR => Some("a path component is not a directory"),
            libc::ENAMETOOLONG => Some("filename or path too long; shorten path segments"),
            libc::EMFILE => Some("process file descriptor limit reached; lower --mcr or raise limits"),
            _ => None,
        };
        if by_code.is_some() {
            return by_code;
        }
    }

    match e.kind() {
        io::ErrorKind::PermissionDenied => Some("permission denied; check ownership and write permissions"),
        io::ErrorKind::NotFound => Some("path not found; verify it exists"),
        io::ErrorKind::AlreadyExists => Some("already exists; remove the target or use --replace"),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Some("busy/timed out; retry later"),
        _ => None,
    }
}

fn build_message(op: &str, path: &Path, e: &io::Error) -> String {
    let mut msg = format!("{} '{}': {}", op, path.display(), e);
    if let Some(h) = hint(e) {
        msg.push_str(" (");
        msg.push_str(h);
        msg.push(')');
    }
    msg
}

/// Adapter for per-item transfer code: io::Error -> TransferError::Io.
pub fn io_failure<'a>(op: &'a str, path: &'a Path) -> impl FnOnce(io::Error) -> TransferError + 'a {
    move |e: io::Error| {
        let message = build_message(op, path, &e);
        TransferError::Io {
            context: op.to_string(),
            message,
        }
    }
}

/// Adapter for anyhow::Result code.
pub fn io_error_with_help<'a>(op: &'a str, path: &'a Path) -> impl FnOnce(io::Error) -> anyhow::Error + 'a {
    move |e: io::Error| anyhow!(build_message(op, path, &e))
}
