use std::io::{self, BufRead, Write};
use std::process::exit;

use broadcaster::Broadcaster;
use orchestrator::{Config, Orchestrator};

fn main() {
    let config = match Config::load() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("\n[FATAL]: {error}");
            exit(-1);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(config.log_level.as_filter())
        .init();

    let broadcaster = if config.enable_broadcaster {
        match Broadcaster::start(8080, config.broadcast_interval) {
            Ok(broadcaster) => {
                println!("Broadcaster started on port {}.\n", broadcaster.local_addr().port());
                Some(broadcaster)
            }
            Err(error) => {
                eprintln!("\n[FATAL]: {error}");
                exit(-1);
            }
        }
    } else {
        None
    };

    println!("Enter any key to start order flow.");
    let _ = io::stdout().flush();

    let mut choice = String::new();
    if io::stdin().lock().read_line(&mut choice).is_err() || choice.trim().is_empty() {
        exit(-1);
    }

    let summary = Orchestrator::new(config).and_then(|orchestrator| {
        orchestrator.run(broadcaster.as_ref())
    });

    match summary {
        Ok(summary) => {
            println!(
                "\nSUMMARY:\nOrders executed: {}\nOrders matched: {}\nTime taken: {:?}",
                summary.executed, summary.matched, summary.duration
            );
        }
        Err(error) => {
            eprintln!("\n[FATAL]: An error occured when trying to create orders: {error}");
            exit(-1);
        }
    }
}
