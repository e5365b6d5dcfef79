/// Migration ledger CLI for operators.
///
/// Usage: migrate <status|up|down>
///   status : list every step with its applied/pending state
///   up     : apply all pending steps in order
///   down   : revert the most recently applied step (refuses irreversible
///            steps with an explanatory error)
///
/// Failures abort immediately and are surfaced as-is; nothing is retried.
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

use schoolhub_api::db::migrations::runner;

#[derive(Parser)]
#[command(name = "migrate", about = "Manage the schoolhub database schema")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show applied and pending migration steps
    Status,
    /// Apply all pending migration steps
    Up,
    /// Revert the most recently applied step
    Down,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable not set"))?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    match args.command {
        Command::Status => {
            for step in runner::status(&pool).await? {
                let mark = if step.applied { "applied" } else { "pending" };
                println!("{:>14}  {:<40} {}", step.id, step.name, mark);
            }
        }
        Command::Up => {
            let applied = runner::run_pending(&pool).await?;
            println!("Applied {applied} migration(s)");
        }
        Command::Down => match runner::revert_last(&pool).await? {
            Some((id, name)) => println!("Reverted {id} ({name})"),
            None => println!("Nothing to revert"),
        },
    }

    Ok(())
}
