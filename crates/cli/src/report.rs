use colored::*;
use snatcher_core::{EngineOutput, RunSummary};

pub fn command(text: &str) {
    println!("{} {}", ">>".bright_cyan(), text.bold());
}

pub fn event(output: &EngineOutput) {
    match output {
        EngineOutput::Sent {
            item,
            command: _,
            attempt,
        } => {
            if *attempt > 1 {
                println!("📤 {} (attempt {})", item.cyan(), attempt);
            } else {
                println!("📤 {}", item.cyan());
            }
        }
        EngineOutput::Succeeded { item } => println!("✅ {}", item.green()),
        EngineOutput::Retrying {
            item,
            reason,
            failures,
            budget,
        } => println!(
            "🔁 {} failed ({}/{}): {}",
            item.yellow(),
            failures,
            budget,
            reason
        ),
        EngineOutput::Dropped { item, reason } => {
            eprintln!("❌ {} dropped: {}", item.red(), reason.red())
        }
        EngineOutput::Skipped { item, next } => match next {
            Some(next) => println!("⏭  Skipped {}, next is {}", item.yellow(), next.cyan()),
            None => println!("⏭  Skipped {}, queue is empty", item.yellow()),
        },
        EngineOutput::Info {
            current,
            remaining,
            failures,
        } => println!(
            "ℹ️  Current: {} | {} remaining | {} failure(s)",
            current.as_deref().unwrap_or("none").cyan(),
            remaining,
            failures
        ),
        EngineOutput::Notice(text) => println!("⚠️  {}", text),
        EngineOutput::Finished(summary) => {
            println!("🏁 {}", "Queue exhausted".green());
            totals(summary);
        }
        EngineOutput::Stopped(summary) => {
            println!("🛑 {}", "Stopped".yellow());
            totals(summary);
        }
    }
}

fn totals(summary: &RunSummary) {
    println!(
        "   {} succeeded, {} dropped, {} skipped",
        summary.succeeded.to_string().green(),
        summary.dropped.to_string().red(),
        summary.skipped.to_string().yellow()
    );
}
