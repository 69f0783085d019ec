use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use triage_core::providers::{OpenAiCompatProvider, OpenAiProvider};
use triage_core::tools::{JiraClient, RecordStore};
use triage_core::{
    AgentProfile, Category, Conversation, Dispatcher, LlmClassifier, LlmProvider, ModelRouter, SubAgent,
    TicketPipeline, TicketRouter, ToolExecutor, ToolRegistry, ToolSettings, default_registry,
};

mod config;

use config::{TriageConfig, shellexpand};

#[derive(Parser)]
#[command(name = "triage")]
#[command(version)]
#[command(about = "Route support tickets to specialised agents")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory, default config and sample data
    Init,

    /// Show current configuration (secrets masked)
    Config,

    /// Classify a ticket without handling it
    Route {
        /// The customer's message
        #[arg(required = true)]
        message: Vec<String>,

        /// Print the routing directive as JSON
        #[arg(long)]
        json: bool,
    },

    /// Route a ticket and let the selected agent answer it
    Handle {
        /// The customer's message
        #[arg(required = true)]
        message: Vec<String>,
    },

    /// List the tools agents can use
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging; RUST_LOG wins over --debug
    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config),
        Commands::Route { message, json } => cmd_route(&cli.config, &message.join(" "), json).await,
        Commands::Handle { message } => cmd_handle(&cli.config, &message.join(" ")).await,
        Commands::Tools => cmd_tools(&cli.config),
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        let default_config = include_str!("../../../config/default.toml");
        tokio::fs::write(&config_path, default_config).await?;
        restrict_permissions(&config_path)?;
        info!("Created default config at {}", config_path.display());
    }

    let records_path = config_dir.join("records.json");
    if !records_path.exists() {
        tokio::fs::write(&records_path, include_str!("../../../config/records.json")).await?;
        info!("Created sample records at {}", records_path.display());
    }

    let company_dir = config_dir.join("company");
    tokio::fs::create_dir_all(&company_dir).await?;
    for (name, content) in [
        ("about.md", include_str!("../../../config/company/about.md")),
        ("policies.md", include_str!("../../../config/company/policies.md")),
    ] {
        let path = company_dir.join(name);
        if !path.exists() {
            tokio::fs::write(&path, content).await?;
            info!("Created {}", path.display());
        }
    }

    println!("triage initialized at {}", config_dir.display());
    println!(
        "Set OPENAI_API_KEY (or edit {}) to configure providers.",
        config_path.display()
    );
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = TriageConfig::load(config_path)?;
    println!("{:#?}", cfg);
    Ok(())
}

async fn cmd_route(config_path: &Option<PathBuf>, message: &str, json: bool) -> Result<()> {
    let cfg = TriageConfig::load(config_path)?;
    let router = build_router(&cfg)?;

    let directive = router.decide(&Conversation::from_user(message)).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&directive)?);
    } else {
        println!(
            "Category: {} ({})",
            directive.goto,
            directive.goto.description()
        );
        println!("Handler:  {}", directive.target());
        println!("Reason:   {}", directive.rationale);
    }
    Ok(())
}

async fn cmd_handle(config_path: &Option<PathBuf>, message: &str) -> Result<()> {
    let cfg = TriageConfig::load(config_path)?;
    let registry = Arc::new(build_registry(&cfg)?);
    let router = build_router(&cfg)?;
    let dispatcher = build_dispatcher(&cfg, registry)?;
    let pipeline = TicketPipeline::new(Arc::new(router), Arc::new(dispatcher));

    let ticket = pipeline
        .handle_ticket(Conversation::from_user(message))
        .await?;
    let usage = &ticket.outcome.usage;
    info!(
        "Ticket {} handled by {} ({})",
        ticket.ticket_id,
        ticket.directive.target(),
        usage
    );

    println!("{}", ticket.reply());
    Ok(())
}

fn cmd_tools(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = TriageConfig::load(config_path)?;
    let registry = build_registry(&cfg)?;

    for tool in registry.list_tools() {
        let agents: Vec<&str> = Category::ALL
            .iter()
            .filter(|c| {
                cfg.agent_profile(**c)
                    .map(|p| p.is_tool_allowed(&tool.name))
                    .unwrap_or(false)
            })
            .map(|c| c.handler_name())
            .collect();
        println!("{:<22} {}", tool.name, tool.description);
        if !agents.is_empty() {
            println!("{:<22} used by: {}", "", agents.join(", "));
        }
    }
    Ok(())
}

fn build_router(cfg: &TriageConfig) -> Result<TicketRouter> {
    let provider = build_provider(
        cfg,
        cfg.router.model.as_deref(),
        Some(cfg.router.temperature),
    )?;
    info!(
        "Router using {} ({})",
        provider.provider_name(),
        provider.model()
    );

    let router = TicketRouter::new(Arc::new(LlmClassifier::new(provider)));
    Ok(match cfg.router_instruction()? {
        Some(instruction) => router.with_instruction(instruction),
        None => router,
    })
}

fn build_dispatcher(cfg: &TriageConfig, registry: Arc<ToolRegistry>) -> Result<Dispatcher> {
    let mut dispatcher = Dispatcher::new();
    for category in Category::ALL {
        let profile = cfg.agent_profile(category)?;
        let provider = agent_provider(cfg, &profile)?;
        debug!(
            "{} using {} ({})",
            profile.id,
            provider.provider_name(),
            provider.model()
        );
        dispatcher.register(
            category,
            Arc::new(SubAgent::new(profile, provider, registry.clone())),
        );
    }
    Ok(dispatcher)
}

fn agent_provider(cfg: &TriageConfig, profile: &AgentProfile) -> Result<Arc<dyn LlmProvider>> {
    build_provider(cfg, profile.model.as_deref(), Some(profile.temperature))
}

/// Build the configured providers in failover order.
///
/// `model` overrides the primary provider's model. A single provider with one
/// attempt is returned as-is; anything else goes through a `ModelRouter`.
fn build_provider(
    cfg: &TriageConfig,
    model: Option<&str>,
    temperature: Option<f32>,
) -> Result<Arc<dyn LlmProvider>> {
    let order: Vec<String> = if cfg.providers.failover_order.is_empty() {
        vec!["openai".to_string(), "openai_compat".to_string()]
    } else {
        cfg.providers.failover_order.clone()
    };

    let mut providers: Vec<Arc<dyn LlmProvider>> = Vec::new();
    for name in &order {
        let model = if providers.is_empty() { model } else { None };
        match name.as_str() {
            "openai" => {
                let Some(openai) = &cfg.providers.openai else {
                    continue;
                };
                if openai.api_key.is_empty() {
                    warn!("OpenAI provider configured without an API key, skipping");
                    continue;
                }
                let mut provider = OpenAiProvider::new(
                    openai.api_key.clone(),
                    model.unwrap_or(&openai.model).to_string(),
                    openai.base_url.clone(),
                    openai.max_tokens,
                );
                if let Some(t) = temperature {
                    provider = provider.with_temperature(t);
                }
                providers.push(Arc::new(provider));
            }
            "openai_compat" => {
                let Some(compat) = &cfg.providers.openai_compat else {
                    continue;
                };
                let mut provider = OpenAiCompatProvider::new(
                    &compat.name,
                    compat.api_key.clone(),
                    model.unwrap_or(&compat.model).to_string(),
                    &compat.base_url,
                    compat.max_tokens,
                )?;
                if let Some(t) = temperature {
                    provider = provider.with_temperature(t);
                }
                providers.push(Arc::new(provider));
            }
            other => warn!("Unknown provider '{}' in failover_order, skipping", other),
        }
    }

    if providers.is_empty() {
        return Err(anyhow!(
            "No LLM provider configured. Set OPENAI_API_KEY or configure [providers.openai_compat]."
        ));
    }

    if providers.len() == 1 && cfg.router.max_retries <= 1 {
        return Ok(providers.remove(0));
    }

    Ok(Arc::new(
        ModelRouter::with_failover(providers)?.with_max_retries(cfg.router.max_retries),
    ))
}

fn build_registry(cfg: &TriageConfig) -> Result<ToolRegistry> {
    let records_path = shellexpand(&cfg.data.records_file);
    let records = if records_path.exists() {
        RecordStore::load(&records_path)?
    } else {
        warn!(
            "Records file {} not found, order and transaction lookups will find nothing",
            records_path.display()
        );
        RecordStore::default()
    };

    let company_docs_dir = Some(shellexpand(&cfg.data.company_docs_dir)).filter(|d| d.is_dir());
    if company_docs_dir.is_none() {
        warn!(
            "Company docs directory {} not found",
            cfg.data.company_docs_dir
        );
    }

    let jira = if cfg.jira.enabled {
        if cfg.jira.base_url.is_empty() || cfg.jira.api_token.is_empty() {
            return Err(anyhow!(
                "Jira is enabled but base_url or api_token is missing"
            ));
        }
        Some(JiraClient::new(
            &cfg.jira.base_url,
            &cfg.jira.email,
            &cfg.jira.api_token,
        ))
    } else {
        None
    };

    let registry = default_registry(ToolSettings {
        records: Arc::new(records),
        company_docs_dir,
        search_dirs: cfg.data.search_dirs.clone(),
        jira,
    });
    debug!("Registered {} tools", registry.len());
    Ok(registry)
}
