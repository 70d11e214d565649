use anyhow::Context;
use medrag::{
    api::routes::create_app,
    cli::{output::Output, Cli, Commands},
    db::PineconeStore,
    llm::Provider,
    rag::{
        chunker::TextChunker, embeddings::create_embedder, Ingestor, PipelineConfig,
        PromptTemplate, RagPipeline,
    },
    utils::toml_config::ConfigSource,
    AppConfig, AppState,
};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let (config, source) = match AppConfig::load_with_source(&cli.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            output.error(&format!("Failed to load {}: {}", cli.config.display(), e));
            std::process::exit(1);
        }
    };

    init_tracing(&config, cli.verbose);
    match source {
        ConfigSource::File(path) => tracing::info!(path = %path.display(), "Configuration loaded"),
        ConfigSource::Defaults => tracing::info!(
            path = %cli.config.display(),
            "No configuration file, using defaults"
        ),
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Ingest { data_dir } => ingest(config, data_dir, &output).await,
        Commands::Config { validate } => show_config(&config, validate, &output),
    }
}

fn init_tracing(config: &AppConfig, verbose: bool) {
    let default_level = if verbose {
        "debug"
    } else {
        config.server.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "medrag={0},medrag_server={0},tower_http={0}",
            default_level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.server.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    config
        .validate_serving()
        .context("Invalid configuration for serving")?;

    let embedder = create_embedder(&config.embedding)?;
    let store = Arc::new(PineconeStore::new(
        config.pinecone_api_key()?,
        &config.vector_store,
    )?);
    let provider = Provider::from_config(&config)?;
    let provider_name = provider.name();
    let llm = provider.create_client()?;

    let pipeline = RagPipeline::new(
        embedder,
        store,
        Arc::from(llm),
        PipelineConfig {
            index_name: config.vector_store.index_name.clone(),
            top_k: config.rag.top_k,
            prompt: PromptTemplate::new(config.rag.system_prompt.clone()),
            retry: config.retry.policy(),
        },
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server.host/server.port")?;

    // Refuse to serve from a missing or incompatible index
    pipeline.check_index().await.with_context(|| {
        format!(
            "Index '{}' is not usable; run `medrag-server ingest` with embedding dimension {}",
            config.vector_store.index_name,
            config.embedding.dimensions()
        )
    })?;

    tracing::info!(
        index = %config.vector_store.index_name,
        embedding_model = config.embedding.model(),
        llm_provider = provider_name,
        llm_model = %config.llm.model,
        "Pipeline ready"
    );

    let app = create_app(AppState {
        pipeline: Arc::new(pipeline),
    });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn ingest(config: AppConfig, data_dir: Option<PathBuf>, output: &Output) -> anyhow::Result<()> {
    output.banner();
    config
        .validate_ingestion()
        .context("Invalid configuration for ingestion")?;

    let data_dir = data_dir.unwrap_or_else(|| config.rag.data_dir.clone());
    output.info(&format!("Loading documents from {}", data_dir.display()));

    let embedder = create_embedder(&config.embedding)?;
    let store = Arc::new(PineconeStore::new(
        config.pinecone_api_key()?,
        &config.vector_store,
    )?);
    let chunker = TextChunker::new(config.rag.chunk_size, config.rag.chunk_overlap)?;
    let spec = config.vector_store.index_spec(config.embedding.dimensions())?;

    let ingestor = Ingestor::new(embedder, store, chunker, spec)
        .with_batch_sizes(config.rag.embed_batch_size, config.rag.upsert_batch_size)
        .with_retry(config.retry.policy());

    match ingestor.run(&data_dir).await {
        Ok(report) => {
            output.ingest_report(&config.vector_store.index_name, &report);
            Ok(())
        }
        Err(e) => {
            output.error(&e.to_string());
            Err(e.into())
        }
    }
}

fn show_config(config: &AppConfig, validate: bool, output: &Output) -> anyhow::Result<()> {
    output.banner();
    output.config_summary(config);

    if validate {
        println!();
        match config.validate_serving() {
            Ok(()) => output.success("Configuration is valid for serving and ingestion"),
            Err(e) => {
                output.error(&e.to_string());
                output.hint("Set the missing variables in your environment or .env file");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
