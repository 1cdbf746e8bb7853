//! # cloudctl
//!
//! Command-line interface for the cloud facade.
//!
//! The provider is selected and configured from the environment
//! (`CLOUD_PROVIDER`, `CLOUD_REGION` and the vendor credential variables).
//! Every command prints JSON on stdout; logs go to stderr.
//!
//! ## Usage
//!
//! ```bash
//! # Probe compute, storage and ML
//! cloudctl health
//!
//! # Launch and inspect an instance
//! cloudctl instance create --name web-1 --instance-type t3.micro --image-id ami-0abc
//! cloudctl instance get i-0123456789
//!
//! # Move objects around
//! cloudctl storage upload --container reports --path q1.csv --file ./q1.csv
//!
//! # Deploy model artifacts and score
//! cloudctl model deploy --model-id churn --runtime sklearn model.pkl
//! cloudctl model infer --model-id churn --input '{"instances": [[1, 2, 3]]}'
//! ```

use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use clap::{Parser, Subcommand};
use cloud_facade::config::{ConfigLoader, LoggingConfig};
use cloud_facade::observability::{init_logging, metrics};
use cloud_facade::provider::{CloudProvider, ProviderFactory};
use cloud_facade::types::{MlModelOptions, ModelFile, StorageOptions};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Cloud facade CLI
#[derive(Parser)]
#[command(name = "cloudctl")]
#[command(about = "Compute, storage and ML operations on AWS or Azure", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Load environment variables from this file before reading configuration
    #[arg(long, global = true, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Print Prometheus metrics for the command to stderr when it finishes
    #[arg(long, global = true)]
    emit_metrics: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe compute, storage and ML
    Health,
    /// Show the resolved configuration without secrets
    Config,
    /// Compute instance lifecycle
    Instance {
        #[command(subcommand)]
        command: InstanceCommands,
    },
    /// Object storage
    Storage {
        #[command(subcommand)]
        command: StorageCommands,
    },
    /// ML model deploy and inference
    Model {
        #[command(subcommand)]
        command: ModelCommands,
    },
}

#[derive(Subcommand)]
enum InstanceCommands {
    /// Provision one instance
    Create {
        #[arg(long)]
        name: String,
        /// Vendor instance type or VM size (e.g. t3.micro, Standard_B1s)
        #[arg(long)]
        instance_type: String,
        /// AMI id, or an Azure image URN / resource id
        #[arg(long)]
        image_id: String,
        /// File whose content is passed as user data
        #[arg(long, value_name = "PATH")]
        user_data_file: Option<PathBuf>,
    },
    /// Show the current state of an instance
    Get {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Request termination of an instance
    Terminate {
        #[arg(value_name = "ID")]
        id: String,
    },
}

#[derive(Subcommand)]
enum StorageCommands {
    /// Upload a local file
    Upload {
        #[arg(long)]
        container: String,
        #[arg(long)]
        path: String,
        #[arg(long, value_name = "PATH")]
        file: PathBuf,
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Download an object
    Download {
        #[arg(long)]
        container: String,
        #[arg(long)]
        path: String,
        /// Write the object here instead of embedding it (base64) in the output
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Delete an object
    Delete {
        #[arg(long)]
        container: String,
        #[arg(long)]
        path: String,
    },
}

#[derive(Subcommand)]
enum ModelCommands {
    /// Upload artifacts and register the first one
    Deploy {
        #[arg(long)]
        model_id: String,
        #[arg(long)]
        version: Option<String>,
        /// pytorch, tensorflow, sklearn or xgboost
        #[arg(long)]
        runtime: Option<String>,
        /// Artifact files; the first is the primary artifact
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
    /// Run inference against a deployed model
    Infer {
        #[arg(long)]
        model_id: String,
        #[arg(long)]
        version: Option<String>,
        /// JSON payload, or @path to read it from a file
        #[arg(long)]
        input: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Configure rustls crypto provider before any TLS client is built.
    // An error only means a provider is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();

    if let Some(env_file) = &cli.env_file {
        dotenvy::from_path(env_file)
            .with_context(|| format!("Failed to load env file {}", env_file.display()))?;
    }

    init_logging(&LoggingConfig::from_env())?;

    if cli.emit_metrics {
        metrics::register_metrics().context("Failed to register metrics")?;
    }

    let config = ConfigLoader::from_env().load()?;
    debug!("Resolved configuration: {:?}", config);

    let output = if let Commands::Config = cli.command {
        describe_config(&config)
    } else {
        let factory = ProviderFactory::new();
        let provider = factory.get_provider(&config).await?;
        info!(
            "Using {} provider in {}",
            provider.provider_kind(),
            config.region()
        );
        run_command(provider.as_ref(), cli.command).await?
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    if cli.emit_metrics {
        eprint!("{}", metrics::gather_text()?);
    }
    Ok(())
}

fn describe_config(config: &cloud_facade::config::CloudConfig) -> Value {
    let mut description = json!({
        "provider": config.provider,
        "region": config.region(),
    });
    if let Some(azure) = &config.credentials.azure {
        description["resourceGroup"] = json!(azure.resource_group);
        description["mlWorkspace"] = json!(azure.ml_workspace);
        description["vmAdminUsername"] = json!(azure.vm_admin_username);
    }
    if let Some(aws) = &config.credentials.aws {
        description["sagemakerExecutionRoleArn"] = json!(aws.sagemaker_execution_role_arn);
    }
    description
}

async fn run_command(provider: &dyn CloudProvider, command: Commands) -> Result<Value> {
    let output = match command {
        Commands::Health => serde_json::to_value(provider.health_check().await)?,
        Commands::Config => describe_config(provider.get_config()),
        Commands::Instance { command } => run_instance_command(provider, command).await?,
        Commands::Storage { command } => run_storage_command(provider, command).await?,
        Commands::Model { command } => run_model_command(provider, command).await?,
    };
    Ok(output)
}

async fn run_instance_command(
    provider: &dyn CloudProvider,
    command: InstanceCommands,
) -> Result<Value> {
    match command {
        InstanceCommands::Create {
            name,
            instance_type,
            image_id,
            user_data_file,
        } => {
            let user_data = match user_data_file {
                Some(path) => Some(
                    tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?,
                ),
                None => None,
            };
            let instance = provider
                .create_compute_instance(&name, &instance_type, &image_id, user_data.as_deref())
                .await?;
            Ok(serde_json::to_value(instance)?)
        }
        InstanceCommands::Get { id } => {
            Ok(serde_json::to_value(provider.get_compute_instance(&id).await?)?)
        }
        InstanceCommands::Terminate { id } => {
            provider.terminate_instance(&id).await?;
            Ok(json!({ "id": id, "terminationRequested": true }))
        }
    }
}

async fn run_storage_command(
    provider: &dyn CloudProvider,
    command: StorageCommands,
) -> Result<Value> {
    match command {
        StorageCommands::Upload {
            container,
            path,
            file,
            content_type,
        } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let mut options = StorageOptions::new(container, path);
            options.content_type = content_type;
            let size = data.len();
            let locator = provider.upload_file(&options, data).await?;
            Ok(json!({ "locator": locator, "bytes": size }))
        }
        StorageCommands::Download {
            container,
            path,
            output,
        } => {
            let options = StorageOptions::new(container, path);
            let data = provider.download_file(&options).await?;
            match output {
                Some(target) => {
                    tokio::fs::write(&target, &data)
                        .await
                        .with_context(|| format!("Failed to write {}", target.display()))?;
                    Ok(json!({ "output": target, "bytes": data.len() }))
                }
                None => Ok(json!({
                    "bytes": data.len(),
                    "contentBase64": general_purpose::STANDARD.encode(&data),
                })),
            }
        }
        StorageCommands::Delete { container, path } => {
            let options = StorageOptions::new(container, path);
            provider.delete_file(&options).await?;
            Ok(json!({ "deleted": true }))
        }
    }
}

async fn run_model_command(provider: &dyn CloudProvider, command: ModelCommands) -> Result<Value> {
    match command {
        ModelCommands::Deploy {
            model_id,
            version,
            runtime,
            files,
        } => {
            let options = model_options(model_id, version, runtime);
            let mut model_files = Vec::with_capacity(files.len());
            for path in &files {
                model_files.push(read_model_file(path).await?);
            }
            let model = provider.deploy_model(&options, &model_files).await?;
            Ok(json!({ "model": model, "artifacts": model_files.len() }))
        }
        ModelCommands::Infer {
            model_id,
            version,
            input,
        } => {
            let options = model_options(model_id, version, None);
            let payload = read_payload(&input).await?;
            Ok(serde_json::to_value(
                provider.run_inference(&options, &payload).await?,
            )?)
        }
    }
}

fn model_options(
    model_id: String,
    version: Option<String>,
    runtime: Option<String>,
) -> MlModelOptions {
    let mut options = MlModelOptions::new(model_id);
    options.version = version;
    options.runtime = runtime;
    options
}

/// Read an artifact; its file name becomes the relative path
async fn read_model_file(path: &Path) -> Result<ModelFile> {
    let relative_path = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?;
    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(ModelFile::new(relative_path, content))
}

async fn read_payload(input: &str) -> Result<Value> {
    let raw = match input.strip_prefix('@') {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {path}"))?,
        None => input.to_string(),
    };
    serde_json::from_str(&raw).context("Inference input is not valid JSON")
}
