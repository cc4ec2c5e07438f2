// Command-line entry point: classify one complaint and print the record as JSON.
//
//   fairstay-classify "The heating has been off for a week"
//   echo "Neighbour keeps shouting at my kids" | fairstay-classify

use anyhow::{Context, Result};
use fairstay::{Classifier, ClassifierConfig};
use tokio::io::AsyncReadExt;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the environment and defaults still apply.
    dotenvy::dotenv().ok();
    fairstay::setup_logging();

    let config = ClassifierConfig::from_env();
    info!(
        model = %config.model,
        base_url = %config.base_url,
        timeout_secs = config.timeout.as_secs(),
        "Starting complaint classifier"
    );

    let args: Vec<String> = std::env::args().skip(1).collect();
    let complaint = if args.is_empty() {
        let mut buffer = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buffer)
            .await
            .context("Failed to read complaint from stdin")?;
        buffer
    } else {
        args.join(" ")
    };

    let classifier = Classifier::new(&config);
    let record = classifier.classify_and_summarize(&complaint).await;

    let rendered =
        serde_json::to_string_pretty(&record).context("Failed to serialize classification")?;
    println!("{rendered}");

    Ok(())
}
