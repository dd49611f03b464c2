use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sheet_stress::{report, runner, utils::config::RunConfig};

#[derive(Parser)]
#[command(name = "sheet-stress")]
#[command(version)]
#[command(
    about = "Stress test a sheet-routing form endpoint with concurrent submissions",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send synthetic RSVP entries to an endpoint
    Run {
        /// Target API endpoint
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Number of entries to send
        #[arg(short = 'n', long)]
        entries: Option<usize>,

        /// Concurrent requests
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Per-request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// YAML config file (flags override its values)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for the results file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not write a results file
        #[arg(long, default_value = "false")]
        no_save: bool,

        /// Probe the endpoint once before sending entries
        #[arg(long, default_value = "false")]
        preflight: bool,

        /// Skip the confirmation prompt
        #[arg(short, long, default_value = "false")]
        yes: bool,
    },

    /// Summarize a saved results file
    Report {
        /// Path to a stress_test_results_*.json file
        results: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            endpoint,
            entries,
            concurrency,
            timeout,
            config,
            output,
            no_save,
            preflight,
            yes,
        } => {
            let mut run_config = match config {
                Some(path) => RunConfig::from_yaml_file(&path)?,
                None => RunConfig::default(),
            };
            if let Some(endpoint) = endpoint {
                run_config.endpoint = endpoint;
            }
            if let Some(entries) = entries {
                run_config.entries = entries;
            }
            if let Some(concurrency) = concurrency {
                run_config.concurrency = concurrency;
            }
            if let Some(timeout) = timeout {
                run_config.timeout_secs = timeout;
            }
            if let Some(output) = output {
                run_config.output_dir = output;
            }
            run_config.preflight |= preflight;

            println!("{}", "Sheets API Stress Tester".bold());
            println!("{}", "=".repeat(40));
            println!("\nConfiguration:");
            println!("  Endpoint: {}", run_config.endpoint.cyan());
            println!("  Entries: {}", run_config.entries.to_string().yellow());
            println!(
                "  Concurrent: {}",
                run_config.concurrency.to_string().yellow()
            );
            println!("  Timeout: {}s", run_config.timeout_secs);
            if !no_save {
                println!("  Output: {}", run_config.output_dir.display().to_string().cyan());
            }

            run_config.validate()?;

            if !yes && !confirm("\nProceed with stress test? (y/N): ")? {
                println!("Test cancelled.");
                return Ok(());
            }

            let stop = Arc::new(AtomicBool::new(false));
            let stop_handler = Arc::clone(&stop);
            ctrlc::set_handler(move || {
                if !stop_handler.swap(true, Ordering::SeqCst) {
                    println!(
                        "\n{} Stopping: waiting for in-flight requests...",
                        "⏹️ ".yellow()
                    );
                }
            })?;

            runner::run_stress_test(&run_config, !no_save, stop).await?;
        }

        Commands::Report { results, format } => {
            println!(
                "{} Summarizing results from: {}",
                "📊".to_string().blue(),
                results.display()
            );
            report::generate_report(&results, &format).await?;
        }
    }

    Ok(())
}

/// Ask a yes/no question on stdin; anything but "y" is a no
fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{}", prompt);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}
