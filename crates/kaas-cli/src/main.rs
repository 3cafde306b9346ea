use std::cell::RefCell;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use kaas_core::RawConfig;
use kaas_services::{
    build_http_client, CatalogStatus, Field, FieldErrors, KaasConfig, ModelCatalogService,
    ModelConfig, ModelDialogController, ModelStore, OllamaCatalog, OllamaClient, Provider,
    Services, StoreError, SubmitOutcome,
};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Exit code for input rejected by the model form
const EXIT_INVALID: u8 = 2;

/// The model form refused the submitted values
#[derive(Error, Debug)]
#[error("invalid model configuration")]
struct InvalidModel(FieldErrors);

#[derive(Parser)]
#[command(name = "kaas")]
#[command(about = "Kaas - manage LLM model configurations", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List models served by an Ollama endpoint
    Catalog {
        /// Endpoint URL (defaults to the configured Ollama host)
        #[arg(short, long, conflicts_with = "id")]
        endpoint: Option<String>,

        /// Use the endpoint of a configured model
        #[arg(long)]
        id: Option<String>,
    },

    /// Manage configured models
    #[command(subcommand)]
    Models(ModelCommands),

    /// Show Ollama status
    Status,
}

#[derive(Subcommand)]
enum ModelCommands {
    /// List configured models
    List,

    /// Add a model configuration
    Add {
        #[arg(short, long)]
        alias: String,

        #[arg(short, long)]
        endpoint: String,

        #[arg(short, long)]
        model: String,
    },

    /// Edit a model configuration
    Edit {
        id: String,

        #[arg(short, long)]
        alias: Option<String>,

        #[arg(short, long)]
        endpoint: Option<String>,

        #[arg(short, long)]
        model: Option<String>,
    },

    /// Delete a model configuration
    Delete { id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("kaas_services=info,kaas_cli=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<InvalidModel>() {
            Some(InvalidModel(errors)) => {
                print_field_errors(errors);
                ExitCode::from(EXIT_INVALID)
            }
            None => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = KaasConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Catalog { endpoint, id } => cmd_catalog(&config, endpoint, id, cli.json).await?,
        Commands::Status => cmd_status(&config).await?,
        Commands::Models(command) => {
            let services = Services::from_config(&config, tokio::runtime::Handle::current())?;
            match command {
                ModelCommands::List => print_models(&services.store.list()?, cli.json)?,
                ModelCommands::Add {
                    alias,
                    endpoint,
                    model,
                } => cmd_add(&services, alias, endpoint, model, cli.json).await?,
                ModelCommands::Edit {
                    id,
                    alias,
                    endpoint,
                    model,
                } => cmd_edit(&services, &id, alias, endpoint, model, cli.json).await?,
                ModelCommands::Delete { id } => cmd_delete(&services, &id)?,
            }
        }
    }

    Ok(())
}

async fn cmd_catalog(
    config: &KaasConfig,
    endpoint: Option<String>,
    id: Option<String>,
    json: bool,
) -> Result<()> {
    let raw = match (id, endpoint) {
        (Some(id), _) => {
            let store = ModelStore::open(&config.storage.db_path)?;
            store
                .get(&id)?
                .with_context(|| format!("model {} not found", id))?
                .raw_config()
        }
        (None, endpoint) => RawConfig::new(
            Provider::Ollama,
            endpoint.unwrap_or_else(|| config.ollama.host.clone()),
        ),
    };
    let endpoint = raw.endpoint.clone();
    let catalog = OllamaCatalog::from_config(config)?;
    let models = catalog
        .list(&raw)
        .await
        .with_context(|| format!("failed to list models at {}", endpoint))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&models)?);
        return Ok(());
    }

    println!();
    println!("Models at {}:", endpoint);
    println!("{:-<50}", "");
    for (i, model) in models.iter().enumerate() {
        println!("  {:<4} {}", i + 1, model);
    }
    println!();
    Ok(())
}

async fn cmd_status(config: &KaasConfig) -> Result<()> {
    let client = OllamaClient::with_client(
        build_http_client(&config.proxy)?,
        &config.ollama.host,
        config.ollama.timeout(),
    );

    println!();
    println!("Ollama host: {}", client.host());
    match client.version().await {
        Ok(version) => println!("  Status:  running (v{})", version),
        Err(e) => println!("  Status:  unavailable ({})", e),
    }
    println!();
    Ok(())
}

async fn cmd_add(
    services: &Services,
    alias: String,
    endpoint: String,
    model: String,
    json: bool,
) -> Result<()> {
    let created: Rc<RefCell<Option<Result<ModelConfig, StoreError>>>> = Rc::default();
    let sink = created.clone();
    let store = services.store.clone();
    let mut controller = services.new_model_dialog(move |model| {
        *sink.borrow_mut() = Some(store.create(model));
    });

    controller.open(None);
    controller.set_field(Field::Alias, alias)?;
    controller.set_field(Field::Endpoint, endpoint)?;
    controller.settle().await;
    report_catalog(&controller);
    controller.select_model(model)?;
    submit(&mut controller)?;

    let created = created.borrow_mut().take().context("no model was submitted")??;
    print_models(&[created], json)
}

async fn cmd_edit(
    services: &Services,
    id: &str,
    alias: Option<String>,
    endpoint: Option<String>,
    model: Option<String>,
    json: bool,
) -> Result<()> {
    let existing = services
        .store
        .get(id)?
        .with_context(|| format!("model {} not found", id))?;

    let updated: Rc<RefCell<Option<Result<ModelConfig, StoreError>>>> = Rc::default();
    let sink = updated.clone();
    let store = services.store.clone();
    let mut controller = services.edit_model_dialog(
        move |model| {
            *sink.borrow_mut() = Some(store.update(&model).map(|_| model));
        },
        |_| {},
    );

    controller.open(Some(existing));
    if let Some(alias) = alias {
        controller.set_field(Field::Alias, alias)?;
    }
    if let Some(endpoint) = endpoint {
        controller.set_field(Field::Endpoint, endpoint)?;
    }
    controller.settle().await;
    report_catalog(&controller);
    if let Some(model) = model {
        controller.select_model(model)?;
    }
    submit(&mut controller)?;

    let updated = updated.borrow_mut().take().context("no model was submitted")??;
    print_models(&[updated], json)
}

fn cmd_delete(services: &Services, id: &str) -> Result<()> {
    let existing = services
        .store
        .get(id)?
        .with_context(|| format!("model {} not found", id))?;

    let deleted: Rc<RefCell<Option<Result<(), StoreError>>>> = Rc::default();
    let sink = deleted.clone();
    let store = services.store.clone();
    let mut controller = services.edit_model_dialog(
        |_| {},
        move |model| {
            *sink.borrow_mut() = Some(store.delete(&model.id));
        },
    );

    controller.open(Some(existing));
    controller.delete();
    controller.close();

    deleted.borrow_mut().take().context("nothing was deleted")??;
    println!("Deleted {}", id);
    Ok(())
}

fn submit(controller: &mut ModelDialogController) -> Result<()> {
    match controller.submit() {
        SubmitOutcome::Submitted => Ok(()),
        SubmitOutcome::Invalid(errors) => Err(InvalidModel(errors).into()),
        SubmitOutcome::NotOpen => bail!("model dialog is not open"),
    }
}

fn report_catalog(controller: &ModelDialogController) {
    let Some(form) = controller.form() else {
        return;
    };
    let catalog = form.catalog();
    match catalog.status() {
        CatalogStatus::Loaded => {
            tracing::info!(
                endpoint = catalog.endpoint(),
                models = ?catalog.suggestions(),
                "Catalog loaded"
            );
        }
        CatalogStatus::Failed(reason) => {
            eprintln!(
                "Warning: could not list models at {} ({}); model name not checked",
                catalog.endpoint(),
                reason
            );
        }
        CatalogStatus::Idle | CatalogStatus::Loading => {}
    }
}

fn print_field_errors(errors: &FieldErrors) {
    eprintln!("Invalid model configuration:");
    for (field, error) in errors.iter() {
        eprintln!("  {:<10} {}", field, error);
    }
}

fn print_models(models: &[ModelConfig], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(models)?);
        return Ok(());
    }

    println!();
    println!("{:-<100}", "");
    println!(
        "  {:<36} {:<8} {:<16} {:<24} {}",
        "ID", "Provider", "Alias", "Endpoint", "Model"
    );
    println!("{:-<100}", "");
    for m in models {
        println!(
            "  {:<36} {:<8} {:<16} {:<24} {}",
            m.id, m.provider, m.alias, m.endpoint, m.model
        );
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use kaas_core::ProxyConfig;
    use kaas_services::FieldError;
    use tokio::runtime::Handle;

    use super::*;

    #[tokio::test]
    async fn test_invalid_submit_is_typed_error() {
        let client = build_http_client(&ProxyConfig::default()).unwrap();
        let catalog = Arc::new(OllamaCatalog::new(client, Duration::from_secs(1)));
        let services = Services::new(catalog, ModelStore::in_memory().unwrap(), Handle::current());
        let mut controller = services.new_model_dialog(|_| {});

        controller.open(None);
        controller.set_field(Field::Alias, "Local").unwrap();

        let err = submit(&mut controller).unwrap_err();
        let InvalidModel(errors) = err.downcast_ref::<InvalidModel>().unwrap();
        assert_eq!(errors.get(Field::Endpoint), Some(&FieldError::Required));
        assert_eq!(errors.get(Field::Model), Some(&FieldError::Required));
        assert!(controller.dialog().is_rendered());
    }

    #[test]
    fn test_catalog_endpoint_and_id_conflict() {
        let both = ["kaas", "catalog", "--endpoint", "http://a", "--id", "1"];
        assert!(Cli::try_parse_from(both).is_err());
        assert!(Cli::try_parse_from(["kaas", "catalog", "--id", "1"]).is_ok());
    }
}
