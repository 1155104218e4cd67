// src/exec/status.rs

use std::process::ExitStatus;

use super::spec::EXIT_UNKNOWN;

/// Decode a child's wait status into a single exit code.
///
/// Normal exits report their code. On unix a signal death reports
/// `128 + signal`, the way shells do.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;

        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    EXIT_UNKNOWN
}
