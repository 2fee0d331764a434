//! Output → human/json/raw string formatting.
//!
//! Three modes:
//! - **Human** (default on a TTY): `"content"`, `OK`, `Transaction started: txn-1`
//! - **JSON** (`--json`): `serde_json::to_string_pretty`
//! - **Raw** (`--raw`): bare values, no quotes, no prefixes

use memfs_executor::{Error, Output};

/// Output formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Redis-style human output.
    Human,
    /// Pretty-printed JSON.
    Json,
    /// Bare values.
    Raw,
}

/// Format a successful output. An empty string means "print nothing".
pub fn format_output(output: &Output, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(output)
            .unwrap_or_else(|err| format!("{{\"error\": \"{}\"}}", err)),
        OutputMode::Raw => format_raw(output),
        OutputMode::Human => format_human(output),
    }
}

/// Format an error.
pub fn format_error(err: &Error, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(&serde_json::json!({
            "error": err.to_string()
        }))
        .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", err)),
        OutputMode::Raw => err.to_string(),
        OutputMode::Human => format!("(error) {}", err),
    }
}

fn format_human(output: &Output) -> String {
    match output {
        Output::Unit => "OK".to_string(),
        Output::Content(content) => format!("{:?}", content),
        Output::Names(names) => names.join("\n"),
        Output::TxnStarted(txn) => format!("Transaction started: {}", txn),
        Output::Cwd(path) => path.clone(),
    }
}

fn format_raw(output: &Output) -> String {
    match output {
        Output::Unit => String::new(),
        Output::Content(content) => content.clone(),
        Output::Names(names) => names.join("\n"),
        Output::TxnStarted(txn) => txn.to_string(),
        Output::Cwd(path) => path.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memfs_executor::TxnId;

    #[test]
    fn test_human_content_is_quoted() {
        let out = format_output(&Output::Content("".into()), OutputMode::Human);
        assert_eq!(out, "\"\"");
    }

    #[test]
    fn test_human_txn_started_wording() {
        let out = format_output(&Output::TxnStarted(TxnId::from_raw(1)), OutputMode::Human);
        assert_eq!(out, "Transaction started: txn-1");
    }

    #[test]
    fn test_raw_content_is_bare() {
        let out = format_output(&Output::Content("x y".into()), OutputMode::Raw);
        assert_eq!(out, "x y");
    }

    #[test]
    fn test_json_error_shape() {
        let out = format_error(&Error::no_such_file("/f"), OutputMode::Json);
        assert!(out.contains("no such file: /f"));
    }

    #[test]
    fn test_human_error_prefix() {
        let out = format_error(&Error::not_open("/f"), OutputMode::Human);
        assert_eq!(out, "(error) file not open: /f");
    }
}
