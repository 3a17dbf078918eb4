//! Human readable descriptions for process exit codes.

use super::ExecError;

/// Descriptions for the exit codes shells commonly report, including the
/// `128 + n` codes of processes terminated by signal `n`.
const EXIT_CODES: &[(i32, &str)] = &[
    (-1, "Internal app error"),
    (0, "Success"),
    (1, "General error, unspecified error"),
    (2, "Misuse of shell builtins"),
    (126, "Command cannot execute"),
    (127, "Command not found"),
    (128, "Invalid argument to exit"),
    (129, "Fatal error signal 1 (SIGHUP)"),
    (130, "Script terminated by Control-C (SIGINT)"),
    (131, "Fatal error signal 3 (SIGQUIT)"),
    (132, "Fatal error signal 4 (SIGILL)"),
    (133, "Fatal error signal 5 (SIGTRAP)"),
    (134, "Fatal error signal 6 (SIGABRT/SIGIOT)"),
    (135, "Fatal error signal 7 (SIGBUS)"),
    (136, "Fatal error signal 8 (SIGFPE)"),
    (137, "Fatal error signal 9 (SIGKILL)"),
    (138, "Fatal error signal 10 (SIGUSR1)"),
    (139, "Fatal error signal 11 (SIGSEGV)"),
    (140, "Fatal error signal 12 (SIGUSR2)"),
    (141, "Fatal error signal 13 (SIGPIPE)"),
    (142, "Fatal error signal 14 (SIGALRM)"),
    (143, "Fatal error signal 15 (SIGTERM)"),
    (255, "Exit status out of range"),
];

/// Exit code reported for a command that is not installed in the container.
pub const COMMAND_NOT_FOUND: i32 = 127;
/// Exit code reported for a command that exists but cannot be executed.
pub const COMMAND_CANNOT_EXECUTE: i32 = 126;

/// Returns the description of `code`, or an empty string for unknown codes.
pub fn describe(code: i32) -> &'static str {
    EXIT_CODES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, description)| *description)
        .unwrap_or("")
}

/// Translates an exec error into the remote exit code and its description.
///
/// A remote process exit keeps its code even when the table has no entry
/// for it; any other failure maps to `(-1, "")`.
pub fn classify_error(err: &ExecError) -> (i32, String) {
    match err {
        ExecError::NonZeroExit { code, .. } => match describe(*code) {
            "" => (*code, format!("Exit code {code} description not found!")),
            description => (*code, description.to_string()),
        },
        _ => (-1, String::new()),
    }
}
