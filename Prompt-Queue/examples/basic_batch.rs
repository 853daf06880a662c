use prompt_queue::imagegen_rs::{
    GeminiClient, GeminiConfig, ImageBackend, OpenAiImagesClient, OpenAiImagesConfig,
};
use prompt_queue::storage::LAST_CONFIG_KEY;
use prompt_queue::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// GEMINI_API_KEY=... cargo run --example basic_batch
// or OPENAI_BASE_URL=... OPENAI_TOKEN=... cargo run --example basic_batch
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let backend = match (std::env::var("OPENAI_BASE_URL"), std::env::var("OPENAI_TOKEN")) {
        (Ok(url), Ok(token)) => {
            ImageBackend::OpenAi(OpenAiImagesClient::new(OpenAiImagesConfig::new(url, token)))
        }
        _ => ImageBackend::Gemini(GeminiClient::new(GeminiConfig::from_env()?)?),
    };

    // Reuse the settings from the previous run, if any
    let store = LocalStore::open(Some(std::path::Path::new("prompt-queue.db")))?;
    let config = store.get::<BatchConfig>(LAST_CONFIG_KEY).unwrap_or_else(|| {
        BatchConfig::builder()
            .with_model(backend.default_model())
            .with_size(backend.sizes().first().copied().unwrap_or_default())
            .with_style_preset(STYLE_PRESETS[1].value)
            .build()
    });
    store.set(LAST_CONFIG_KEY, &config);

    let processor = Arc::new(QueueProcessor::new(backend, ProcessorConfig::default()));
    let mut state = processor.subscribe();

    let prompts = "a lighthouse at dawn\n\na red panda reading a book\na bowl of ramen";
    let handle = processor.clone().spawn_batch(prompts, config);

    while state.changed().await.is_ok() {
        let s = state.borrow_and_update().clone();
        println!(
            "[{}/{}] {:.0}%",
            s.completed,
            s.total,
            s.progress_percentage()
        );
        if s.is_finished() {
            break;
        }
    }

    let Some(summary) = handle.await? else {
        println!("Another batch is already running");
        return Ok(());
    };
    println!(
        "Batch {}: {} succeeded, {} failed in {}ms",
        summary.batch_id, summary.succeeded, summary.failed, summary.total_duration_ms
    );

    let results = processor.snapshot().results;
    for r in &results {
        println!("  {:<8} {}", r.status.as_str(), r.prompt);
    }

    if processor.snapshot().has_successful_images() {
        let dir = std::env::current_dir()?;
        if let Some(path) = ResultArchiver::new().save_to_dir(&results, &dir).await {
            println!("Saved {}", path.display());
        }
    }

    Ok(())
}
