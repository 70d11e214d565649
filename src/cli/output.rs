//! Colored output helpers for CLI
//!
//! Terminal rendering for the `ingest` and `config` commands. Server logs go
//! through `tracing`; this is only for human-facing summaries.

use crate::rag::IngestReport;
use crate::utils::toml_config::AppConfig;
use owo_colors::OwoColorize;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    pub fn banner(&self) {
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        if self.colored {
            println!(
                "\n   {} {}\n",
                "medrag".bright_cyan().bold(),
                version.dimmed()
            );
        } else {
            println!("\n   medrag {}\n", version);
        }
    }

    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a file skipped message
    pub fn skipped(&self, path: &str, reason: &str) {
        if self.colored {
            println!(
                "  {} {} {}",
                "○".yellow(),
                path.dimmed(),
                format!("({})", reason).yellow()
            );
        } else {
            println!("  [SKIPPED] {} ({})", path, reason);
        }
    }

    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {}", message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Summarize an ingestion run.
    pub fn ingest_report(&self, index: &str, report: &IngestReport) {
        self.header("Ingestion");
        self.kv("index", index);
        self.kv("files loaded", &report.files_loaded.to_string());
        self.kv("files skipped", &report.files_skipped().to_string());
        self.kv("pages/documents", &report.documents.to_string());
        self.kv("chunks", &report.chunks.to_string());
        self.kv("records upserted", &report.records_upserted.to_string());
        self.kv("records in index", &report.index_record_count.to_string());
        self.kv("elapsed", &format!("{:.1}s", report.elapsed_ms as f64 / 1000.0));
        println!();

        for (path, reason) in &report.skipped {
            self.skipped(&path.display().to_string(), reason);
        }

        if report.chunks == 0 {
            self.warning("No text was found to ingest");
        } else {
            self.success(&format!(
                "Upserted {} records into '{}'",
                report.records_upserted, index
            ));
        }
    }

    /// Summarize the effective configuration (no secrets, only env var names).
    pub fn config_summary(&self, config: &AppConfig) {
        self.header("Server");
        self.kv("bind", &format!("{}:{}", config.server.host, config.server.port));
        self.kv("log level", &config.server.log_level);

        self.header("Vector store");
        self.kv("index", &config.vector_store.index_name);
        self.kv("metric", &config.vector_store.metric);
        self.kv(
            "serverless",
            &format!("{}/{}", config.vector_store.cloud, config.vector_store.region),
        );
        self.kv("api key env", &config.vector_store.api_key_env);

        self.header("Embedding");
        self.kv("model", config.embedding.model());
        self.kv("dimensions", &config.embedding.dimensions().to_string());

        self.header("LLM");
        self.kv("model", &config.llm.model);
        self.kv("api base", &config.llm.api_base);
        self.kv("api key env", &config.llm.api_key_env);

        self.header("RAG");
        self.kv("top k", &config.rag.top_k.to_string());
        self.kv(
            "chunking",
            &format!("{} chars, {} overlap", config.rag.chunk_size, config.rag.chunk_overlap),
        );
        self.kv("data dir", &config.rag.data_dir.display().to_string());
    }
}
