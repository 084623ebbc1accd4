//! Execution ledger
//!
//! Append-only record of command outcomes for the current session. Clearing
//! the console empties this buffer and leaves command history alone.

use sb_core::time::format_timestamp;
use sb_core::CommandOutcome;
use sb_protocol::ServerId;

/// Ordered outcomes, oldest first
#[derive(Debug, Default, Clone)]
pub struct ExecutionLedger {
    entries: Vec<CommandOutcome>,
}

impl ExecutionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an outcome
    pub fn append(&mut self, outcome: CommandOutcome) {
        self.entries.push(outcome);
    }

    /// Empty the display buffer
    pub fn clear_display(&mut self) {
        self.entries.clear();
    }

    /// Render every entry as one line, in append order.
    ///
    /// Each line reads `[<timestamp>] <server_id> <OK|ERR> <text>` where text
    /// is the output, or the message when the output is empty. Embedded
    /// newlines are escaped as `\n`.
    pub fn export_as_text(&self) -> String {
        self.entries
            .iter()
            .map(export_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn entries(&self) -> &[CommandOutcome] {
        &self.entries
    }

    /// Outcomes for one server, oldest first
    pub fn entries_for(&self, server_id: ServerId) -> Vec<CommandOutcome> {
        self.entries
            .iter()
            .filter(|e| e.server_id == server_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn export_line(outcome: &CommandOutcome) -> String {
    let text = if outcome.output.is_empty() {
        &outcome.message
    } else {
        &outcome.output
    };
    format!(
        "[{}] {} {} {}",
        format_timestamp(&outcome.timestamp),
        outcome.server_id,
        if outcome.success { "OK" } else { "ERR" },
        text.trim_end().replace("\r\n", "\n").replace('\n', "\\n"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn outcome(server: u64, success: bool, output: &str, secs: i64) -> CommandOutcome {
        CommandOutcome::at(
            ServerId(server),
            success,
            output,
            "",
            Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
        )
    }

    #[test]
    fn test_export_two_lines_in_append_order() {
        let mut ledger = ExecutionLedger::new();
        ledger.append(outcome(1, true, "total 0", 0));
        ledger.append(outcome(2, false, "permission denied", 5));

        assert_eq!(
            ledger.export_as_text(),
            "[2023-11-14T22:13:20Z] 1 OK total 0\n\
             [2023-11-14T22:13:25Z] 2 ERR permission denied"
        );
    }

    #[test]
    fn test_export_escapes_multiline_output() {
        let mut ledger = ExecutionLedger::new();
        ledger.append(outcome(1, true, "a\nb\n", 0));
        assert_eq!(ledger.export_as_text(), "[2023-11-14T22:13:20Z] 1 OK a\\nb");
    }

    #[test]
    fn test_export_uses_message_when_output_empty() {
        let mut ledger = ExecutionLedger::new();
        ledger.append(CommandOutcome::at(
            ServerId(3),
            true,
            "",
            "Command executed",
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        ));
        assert_eq!(
            ledger.export_as_text(),
            "[2023-11-14T22:13:20Z] 3 OK Command executed"
        );
    }

    #[test]
    fn test_clear_display_and_filter() {
        let mut ledger = ExecutionLedger::new();
        ledger.append(outcome(1, true, "x", 0));
        ledger.append(outcome(2, true, "y", 1));
        ledger.append(outcome(1, true, "z", 2));

        assert_eq!(ledger.entries_for(ServerId(1)).len(), 2);

        ledger.clear_display();
        assert!(ledger.is_empty());
        assert_eq!(ledger.export_as_text(), "");
    }
}
