//! Shell and FASTBuild text helpers for command lines.

use shell_quote::{QuoteRefExt, Sh};

use super::IrGenError;

/// Placeholder FASTBuild expands to the step's first input.
pub const INPUT_PLACEHOLDER: &str = "$FB_INPUT_1_PLACEHOLDER$";
/// Placeholder FASTBuild expands to the step's output.
pub const OUTPUT_PLACEHOLDER: &str = "$FB_INPUT_2_PLACEHOLDER$";

/// Returns `true` when the command contains an odd number of backticks.
///
/// # Examples
/// ```rust,ignore
/// assert!(has_unmatched_backticks("echo`"));
/// assert!(!has_unmatched_backticks("`echo`"));
/// ```
fn has_unmatched_backticks(s: &str) -> bool {
    s.chars().filter(|&c| c == '`').count().rem_euclid(2) != 0
}

/// Quote one argument for a POSIX shell.
pub(crate) fn quote_arg(arg: &str) -> String {
    let bytes: Vec<u8> = arg.quoted(Sh);
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            debug_assert!(false, "shell quoting produced non UTF-8 bytes: {err}");
            String::from_utf8_lossy(&err.into_bytes()).into_owned()
        }
    }
}

/// Join an argument vector into one shell command line.
pub(crate) fn command_line(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| quote_arg(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reject command lines a shell could not split.
pub(crate) fn validate(unit: &str, command: &str) -> Result<(), IrGenError> {
    if has_unmatched_backticks(command) || shlex::split(command).is_none() {
        let snippet = command.chars().take(160).collect();
        return Err(IrGenError::InvalidCommand {
            unit: unit.to_owned(),
            command: command.to_owned(),
            snippet,
        });
    }
    Ok(())
}

/// Split a command line into its executable and the remaining flags.
///
/// A leading double-quoted executable keeps embedded spaces; the quotes are
/// removed.
///
/// # Examples
/// ```rust,ignore
/// assert_eq!(split_executable("cc -c x.c"), ("cc".into(), "-c x.c".into()));
/// ```
pub(crate) fn split_executable(command: &str) -> (String, String) {
    let trimmed = command.trim_start();
    if let Some(rest) = trimmed.strip_prefix('"')
        && let Some((exe, flags)) = rest.split_once('"')
    {
        return (exe.to_owned(), flags.trim().to_owned());
    }
    trimmed.split_once(char::is_whitespace).map_or_else(
        || (trimmed.to_owned(), String::new()),
        |(exe, flags)| (exe.to_owned(), flags.trim().to_owned()),
    )
}

/// Escape literal text for a FASTBuild string that may also hold variable
/// references.
pub(crate) fn escape_fastbuild(text: &str) -> String {
    text.replace('^', "^^").replace('$', "^$")
}

/// Escape `template` and then replace each `{token}` with its FASTBuild
/// replacement.
pub(crate) fn expand_tokens(template: &str, tokens: &[(&str, &str)]) -> String {
    tokens
        .iter()
        .fold(escape_fastbuild(template), |text, (token, replacement)| {
            text.replace(token, replacement)
        })
}
