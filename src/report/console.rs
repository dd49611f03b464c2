use colored::Colorize;

use super::RunSummary;

/// Print the final run summary
pub fn print_summary(summary: &RunSummary) {
    println!("\n{}", "=".repeat(60));
    println!("{}", "STRESS TEST RESULTS".bold());
    println!("{}", "=".repeat(60));
    println!("Total requests: {}", summary.total_entries);
    if summary.interrupted {
        println!(
            "Completed requests: {}",
            summary.completed.to_string().yellow()
        );
    }
    println!(
        "Successful requests: {}",
        summary.success_count.to_string().green()
    );
    println!("Failed requests: {}", summary.error_count.to_string().red());
    println!("Success rate: {:.1}%", summary.success_percent());
    println!("Total duration: {:.2} seconds", summary.duration_secs);
    println!(
        "Average requests per second: {:.2}",
        summary.requests_per_sec
    );
    println!(
        "Latency: {:.0}ms mean, {}ms max",
        summary.mean_latency_ms, summary.max_latency_ms
    );

    println!("\n{}", "Sheet Distribution:".bold());
    for (sheet, count) in &summary.bucket_distribution {
        println!("  Sheet {}: {} entries", sheet.cyan(), count);
    }
    println!(
        "Entries in current slot: {}",
        summary.current_bucket_count
    );

    if !summary.failure_sample.is_empty() {
        println!(
            "\n{}",
            format!("First {} errors:", summary.failure_sample.len()).red()
        );
        for outcome in &summary.failure_sample {
            let status = outcome
                .status_code
                .map_or_else(|| "no response".to_string(), |s| s.to_string());
            println!(
                "  Entry {} [{}]: {}",
                outcome.entry_number,
                status.yellow(),
                outcome.response_data
            );
        }
    }
}
