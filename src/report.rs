//! Rendering a finalized TestRun for operators, plus exit-code mapping.

use colored::Colorize;

use crate::core::errors::Result;
use crate::model::run::{CompletionKind, RunResult, TestRun};
use crate::model::step::OutcomeKind;

/// Process exit code for a finalized run.
///
/// 0 — passed; 1 — completed (restoration ran) but failed; 2 — aborted
/// before restoration completed, manual remediation required. The 1/2
/// split matters operationally: a failed-but-restored drill needs
/// process review, an aborted one needs someone paged.
#[must_use]
pub fn exit_code(run: &TestRun) -> i32 {
    match (run.result, run.completion) {
        (Some(RunResult::Passed), _) => 0,
        (_, Some(CompletionKind::Aborted)) => 2,
        _ => 1,
    }
}

/// Pretty JSON rendering of the full run record.
pub fn render_json(run: &TestRun) -> Result<String> {
    Ok(serde_json::to_string_pretty(run)?)
}

/// Human-readable report: per-step table, verdict, archive reference.
#[must_use]
pub fn render_text(run: &TestRun) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Drill: {}  (config {})\n",
        run.scenario_id.bold(),
        run.config_hash
    ));
    out.push_str(&format!("Started: {}\n\n", run.started_at.to_rfc3339()));

    for outcome in &run.outcomes {
        let label = match outcome.kind {
            OutcomeKind::Verified => "verified",
            OutcomeKind::TimedOut => "timed out",
            OutcomeKind::VerificationFailed => "verify failed",
            OutcomeKind::ActionError => "action error",
        };
        // Pad before colorizing: a width specifier on a ColoredString
        // counts the ANSI escape bytes and misaligns the column.
        let padded = format!("{label:>13}");
        let status = match outcome.kind {
            OutcomeKind::Verified => padded.green(),
            OutcomeKind::TimedOut => padded.yellow(),
            OutcomeKind::VerificationFailed => padded.red(),
            OutcomeKind::ActionError => padded.red().bold(),
        };
        let duration_ms = (outcome.ended_at - outcome.started_at).num_milliseconds();
        out.push_str(&format!(
            "  {:<28} {:<5} {:<32} {}  {:>4} attempt(s)  {}ms\n",
            outcome.step_id,
            outcome.action.label(),
            outcome.target.to_string(),
            status,
            outcome.attempts,
            duration_ms
        ));
        if let Some(err) = &outcome.error {
            out.push_str(&format!("      {} {}\n", err.code.dimmed(), err.message));
        }
    }

    out.push('\n');
    match (run.result, run.completion) {
        (Some(RunResult::Passed), _) => {
            out.push_str(&format!("Result: {}\n", "PASSED".green().bold()));
        }
        (_, Some(CompletionKind::Aborted)) => {
            out.push_str(&format!(
                "Result: {} — drill aborted before restoration completed; \
                 manual remediation required\n",
                "ABORTED".red().bold()
            ));
        }
        (_, Some(CompletionKind::DeadlineExceeded)) => {
            out.push_str(&format!(
                "Result: {} — drill budget exhausted; restorative cleanup was attempted\n",
                "FAILED".red().bold()
            ));
        }
        _ => {
            out.push_str(&format!(
                "Result: {} — drill completed with verification failures\n",
                "FAILED".red().bold()
            ));
        }
    }

    match &run.archive_ref {
        Some(name) => out.push_str(&format!("Audit archive: {name}\n")),
        None if run.archive_degraded => out.push_str(&format!(
            "Audit archive: {}\n",
            "UPLOAD FAILED (verdict unaffected)".yellow()
        )),
        None => {}
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::model::resource::ResourceRef;
    use crate::model::step::{ActionKind, StepError, StepOutcome};

    fn run_with(kind: OutcomeKind, completion: CompletionKind) -> TestRun {
        let mut run = TestRun::begin("weekly-dr", "abc123");
        run.record(StepOutcome {
            step_id: "compute-failover".into(),
            action: ActionKind::Stop,
            target: ResourceRef::compute("rg-1", "primary-webapp"),
            started_at: Utc::now(),
            ended_at: Utc::now(),
            final_state: None,
            kind,
            attempts: 1,
            error: (kind == OutcomeKind::ActionError).then(|| StepError {
                code: "FDH-2101".into(),
                message: "authorization denied".into(),
                transient: false,
            }),
        });
        run.finalize(completion);
        run
    }

    #[test]
    fn exit_codes_distinguish_failed_from_aborted() {
        assert_eq!(
            exit_code(&run_with(OutcomeKind::Verified, CompletionKind::Completed)),
            0
        );
        assert_eq!(
            exit_code(&run_with(OutcomeKind::TimedOut, CompletionKind::Completed)),
            1
        );
        assert_eq!(
            exit_code(&run_with(OutcomeKind::ActionError, CompletionKind::Aborted)),
            2
        );
    }

    #[test]
    fn aborted_report_calls_for_remediation() {
        colored::control::set_override(false);
        let text = render_text(&run_with(OutcomeKind::ActionError, CompletionKind::Aborted));
        assert!(text.contains("manual remediation required"));
        assert!(text.contains("FDH-2101"));
    }

    #[test]
    fn status_column_stays_padded_when_color_is_enabled() {
        colored::control::set_override(true);
        let text = render_text(&run_with(OutcomeKind::Verified, CompletionKind::Completed));
        colored::control::set_override(false);
        // The padding must sit inside the color escapes, not be eaten
        // by a width specifier counting escape bytes.
        assert!(text.contains(&format!("{:>13}", "verified")));
    }

    #[test]
    fn completed_failure_reads_as_verification_failure() {
        colored::control::set_override(false);
        let text = render_text(&run_with(OutcomeKind::TimedOut, CompletionKind::Completed));
        assert!(text.contains("verification failures"));
    }

    #[test]
    fn json_rendering_is_parseable() {
        let rendered = render_json(&run_with(OutcomeKind::Verified, CompletionKind::Completed)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["scenario_id"], "weekly-dr");
        assert_eq!(value["result"], "passed");
    }
}
