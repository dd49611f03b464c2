use tokio::sync::broadcast;

use crate::report::RunSummary;

/// Stress run events for real-time updates
#[derive(Debug, Clone)]
pub enum RunEvent {
    RunStarted {
        run_id: String,
        endpoint: String,
        total: usize,
        concurrency: usize,
    },
    Progress {
        completed: usize,
        total: usize,
    },
    Interrupted {
        completed: usize,
        total: usize,
    },
    RunFinished {
        summary: Box<RunSummary>,
    },
}

/// Event emitter for broadcasting run events
#[derive(Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<RunEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<RunEvent>) {
        let (sender, receiver) = broadcast::channel(256);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: RunEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }
}

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Console event listener for printing real-time updates
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    /// Render events until every emitter is dropped
    pub async fn listen(mut receiver: broadcast::Receiver<RunEvent>) {
        use colored::Colorize;
        use std::io::IsTerminal;

        let interactive = std::io::stdout().is_terminal();
        let mut bar: Option<ProgressBar> = None;

        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::debug!("Console listener skipped {} events", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                RunEvent::RunStarted {
                    run_id,
                    endpoint,
                    total,
                    concurrency,
                } => {
                    println!(
                        "\n{} Starting stress test with {} entries...",
                        "▶".green().bold(),
                        total
                    );
                    println!("  Run: {}", run_id.dimmed());
                    println!("  Using {} concurrent requests", concurrency);
                    println!("  Target endpoint: {}", endpoint.cyan());
                    println!("{}", "-".repeat(60));

                    let pb = if interactive {
                        ProgressBar::new(total as u64)
                    } else {
                        ProgressBar::with_draw_target(
                            Some(total as u64),
                            ProgressDrawTarget::hidden(),
                        )
                    };
                    if let Ok(style) = ProgressStyle::default_bar().template(
                        "  {spinner} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} requests",
                    ) {
                        pb.set_style(style);
                    }
                    bar = Some(pb);
                }

                RunEvent::Progress { completed, total } => {
                    match &bar {
                        Some(pb) if interactive => pb.set_position(completed as u64),
                        _ => println!("Completed: {}/{} requests", completed, total),
                    }
                }

                RunEvent::Interrupted { completed, total } => {
                    if let Some(pb) = &bar {
                        pb.abandon();
                    }
                    println!(
                        "\n{} Run interrupted after {}/{} requests",
                        "⚠".yellow(),
                        completed,
                        total
                    );
                }

                RunEvent::RunFinished { summary } => {
                    if let Some(pb) = bar.take() {
                        pb.finish_and_clear();
                    }
                    crate::report::console::print_summary(&summary);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events_in_order() {
        let (emitter, mut receiver) = EventEmitter::new();
        let mut second = emitter.subscribe();

        emitter.emit(RunEvent::Progress {
            completed: 25,
            total: 50,
        });
        emitter.emit(RunEvent::Progress {
            completed: 50,
            total: 50,
        });
        drop(emitter);

        for rx in [&mut receiver, &mut second] {
            let mut seen = Vec::new();
            while let Ok(RunEvent::Progress { completed, .. }) = rx.recv().await {
                seen.push(completed);
            }
            assert_eq!(seen, vec![25, 50]);
        }
    }
}
