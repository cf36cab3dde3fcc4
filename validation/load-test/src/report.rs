//! Results reporting and formatting.

use crate::metrics::TestResults;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};

/// Formats test results for output.
pub struct ResultsReport;

impl ResultsReport {
    /// Format results as a console table.
    pub fn format_table(results: &TestResults) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![format!("Load Test Results: {}", results.scenario_name)]);

        table.add_row(vec!["Target:", &results.target]);
        table.add_row(vec!["Duration:", &format!("{:.1}s", results.duration_secs)]);
        table.add_row(vec![
            "Rate / Concurrency:",
            &format!("{} lps / {}", results.loads_per_second, results.concurrency),
        ]);
        table.add_row(vec![
            "Final Status:",
            &results.final_status.to_string(),
        ]);
        table.add_row(vec![
            "Calls Dispatched:",
            &results.calls_dispatched.to_string(),
        ]);
        table.add_row(vec![
            "Results Received:",
            &format!(
                "{} ({} dropped)",
                results.results_received, results.results_dropped
            ),
        ]);
        table.add_row(vec![
            "Success Rate:",
            &format!("{:.1}%", results.success_rate),
        ]);
        table.add_row(vec![
            "Treatments/sec:",
            &format!("{:.1}", results.treatments_per_second),
        ]);

        table.add_row(vec!["", ""]);
        table.add_row(vec!["Latency (ms)", "p50 / p90 / p99 / max / avg"]);
        table.add_row(vec![
            "",
            &format!(
                "{:.1} / {:.1} / {:.1} / {:.1} / {:.1}",
                results.latency_p50,
                results.latency_p90,
                results.latency_p99,
                results.latency_max,
                results.latency_avg
            ),
        ]);

        table.add_row(vec!["", ""]);
        for code in &results.codes {
            table.add_row(vec![
                format!("{} ({}):", code.name, code.code),
                code.count.to_string(),
            ]);
        }

        table.to_string()
    }

    /// Format results as JSON.
    pub fn format_json(results: &TestResults) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(results)?)
    }

    /// Format results as CSV row.
    pub fn format_csv(results: &TestResults) -> String {
        format!(
            "{},{},{},{:.1},{},{},{},{:.1},{:.1},{:.1},{:.1},{:.1}",
            results.timestamp,
            results.scenario_name,
            results.loads_per_second,
            results.duration_secs,
            results.calls_dispatched,
            results.results_received,
            results.successful_calls,
            results.treatments_per_second,
            results.latency_p50,
            results.latency_p90,
            results.latency_p99,
            results.latency_max
        )
    }

    /// CSV header row.
    pub fn csv_header() -> &'static str {
        "timestamp,scenario,lps,duration,dispatched,received,success,tps,p50,p90,p99,max"
    }
}
