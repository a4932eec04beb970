use anyhow::Context;
use docqa::cli::output::Output;
use docqa::cli::{Cli, Commands};
use docqa::extract::extractor_for;
use docqa::llm::{LLMClient, Provider};
use docqa::memory::{Conversation, ConversationSettings, Turn};
use docqa::rag::cache::{CacheStatus, IndexCache};
use docqa::rag::chunker::TextChunker;
use docqa::rag::embeddings::{create_embedder, Embedder};
use docqa::rag::index::{DocumentIndex, SharedIndex};
use docqa::utils::toml_config::{DocqaConfig, LoggingConfig};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let mut config =
        DocqaConfig::discover(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;

    init_tracing(&config.logging, !cli.no_color);

    let document = cli.command.document();
    let embedder = create_embedder(&config.embedding)?;
    let shared = SharedIndex::empty();
    shared.install(load_index(document, &config, embedder.as_ref(), &output).await?);
    let index = shared.current()?;

    if let Commands::Index { .. } = cli.command {
        output.kv("passages", &index.len().to_string());
        output.kv("model", index.model());
        return Ok(());
    }

    let provider = Provider::from_config(&config.llm)?;
    let llm: Arc<dyn LLMClient> = Arc::from(provider.create_client()?);
    info!(provider = provider.name(), model = llm.model_name(), "Generator ready");

    let mut conversation = Conversation::new(
        index,
        embedder,
        llm,
        ConversationSettings::from_config(&config),
    )?;

    match &cli.command {
        Commands::Ask { question, .. } => {
            let turn = conversation.ask(question).await?;
            show_turn(&output, turn, cli.verbose);
        }
        Commands::Chat { .. } => {
            output.banner(&document.display().to_string());
            chat(&mut conversation, &output, cli.verbose).await?;
        }
        Commands::Index { .. } => {}
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig, ansi: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries the transcript; logs go to stderr.
    if logging.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_ansi(ansi).with_writer(std::io::stderr))
            .init();
    }
}

async fn load_index(
    document: &Path,
    config: &DocqaConfig,
    embedder: &dyn Embedder,
    output: &Output,
) -> anyhow::Result<DocumentIndex> {
    output.step(1, 3, &format!("Extracting {}", document.display()));
    let pages = extractor_for(document)?
        .extract(document)
        .await
        .with_context(|| format!("failed to extract {}", document.display()))?;

    output.step(
        2,
        3,
        &format!(
            "Indexing {} pages with {}",
            pages.len(),
            embedder.model_name()
        ),
    );
    let chunker = TextChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;

    let index = if config.cache.enabled {
        let cache = IndexCache::new(config.cache.dir.clone());
        let name = IndexCache::entry_name(document);
        let (index, status) = cache
            .load_or_build(
                &name,
                &pages,
                &chunker,
                embedder,
                config.embedding.concurrency,
            )
            .await?;
        match status {
            CacheStatus::Hit => output.info("Reused cached index"),
            CacheStatus::Miss => output.info("Built and cached index"),
            CacheStatus::Rebuilt => output.warning("Cached index was stale; rebuilt it"),
        }
        index
    } else {
        let passages = chunker.chunk(&pages)?;
        DocumentIndex::build(passages, embedder, config.embedding.concurrency).await?
    };

    output.step(3, 3, &format!("Ready: {} passages", index.len()));
    Ok(index)
}

fn show_turn(output: &Output, turn: &Turn, verbose: bool) {
    if verbose {
        output.retrieval_table(&turn.retrieved);
        if let Some(reason) = turn.outcome.rejection() {
            output.rejection(reason, &turn.raw_answer);
        }
    }
    output.answer(turn);
}

async fn chat(conversation: &mut Conversation, output: &Output, verbose: bool) -> anyhow::Result<()> {
    while let Some(line) = output.prompt()? {
        let line = line.trim();
        match line {
            "" => continue,
            "quit" | "exit" | "q" => break,
            "reset" => {
                conversation.reset();
                output.success("History cleared");
                continue;
            }
            _ => {}
        }

        match conversation.ask(line).await {
            Ok(turn) => show_turn(output, turn, verbose),
            Err(e) if e.is_retryable() => {
                output.error(&format!("{} (try again)", e));
            }
            Err(e) => output.error(&e.to_string()),
        }
    }

    info!(
        session = %conversation.session_id(),
        turns = conversation.history().len(),
        "Session ended"
    );
    Ok(())
}
