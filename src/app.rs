//! Main application orchestration and execution

use crate::{
    cli::{Cli, Command},
    config::{display_config_summary, load_config, EnvManager},
    error::{AppError, Result},
    ingest::HarnessImporter,
    logging::LoggerFactory,
    models::Config,
    output::{OutputFormatter, OutputFormatterFactory},
    query::QueryFacade,
    registry::{VariantInfo, VariantRegistry},
    repository::TelemetryRepository,
    storage::{DocumentStore, JsonLinesStore},
};
use std::sync::Arc;

/// Main application struct that coordinates all components
pub struct App {
    config: Config,
    command: Command,
    facade: QueryFacade,
    importer: HarnessImporter,
    formatter: Box<dyn OutputFormatter>,
    loggers: LoggerFactory,
}

impl App {
    /// Create a new application instance from parsed CLI arguments
    pub async fn new(cli: Cli) -> Result<Self> {
        cli.validate().map_err(AppError::validation)?;
        let command = cli.command.clone();
        let config = load_config(cli)?;
        let store: Arc<dyn DocumentStore> = Arc::new(JsonLinesStore::new(config.data_dir.clone()));
        Ok(Self::with_store(config, command, store).await)
    }

    /// Create an application over an explicit store
    pub async fn with_store(config: Config, command: Command, store: Arc<dyn DocumentStore>) -> Self {
        let loggers = LoggerFactory::new(config.clone());
        let query_logger = loggers.create_query_logger().await;

        let registry = Arc::new(VariantRegistry::new(Arc::clone(&store)));
        let facade = QueryFacade::new(TelemetryRepository::new(registry)).with_logger(query_logger.clone());
        let importer = HarnessImporter::new(store).with_logger(query_logger);
        let formatter = OutputFormatterFactory::from_config(&config);

        Self {
            config,
            command,
            facade,
            importer,
            formatter,
            loggers,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn loggers(&self) -> &LoggerFactory {
        &self.loggers
    }

    /// Run the selected command and return what should be printed
    pub async fn run(&self) -> Result<String> {
        let logger = self.loggers.create_logger("APP").await;
        let operation = self.command.name();
        let correlation_id = logger.start_operation(operation).await;
        crate::log_debug!(
            logger,
            "Data directory {} ({} output)",
            self.config.data_dir.display(),
            self.config.output_format
        );

        let result = self.execute().await;
        match &result {
            Ok(output) => crate::log_info!(logger, "{} rendered {} bytes", operation, output.len()),
            Err(error) if error.is_data_corruption() => {
                crate::log_warn!(logger, "Stored data under {} needs repair", self.config.data_dir.display())
            }
            Err(_) => {}
        }

        logger.end_operation(&correlation_id, operation, result.is_ok()).await;
        if let Err(ref error) = result {
            self.loggers
                .create_error_logger()
                .log_error(error, Some(operation), Some(&correlation_id))
                .await;
        }
        result
    }

    async fn execute(&self) -> Result<String> {
        match &self.command {
            Command::Variants => self.formatter.format_variants(&self.facade.variants()),
            Command::Overview => {
                let overview = self.facade.overview().await?;
                self.formatter.format_overview(&overview)
            }
            Command::List { variant } => {
                let variant_id = variant.as_deref().unwrap_or(&self.config.default_variant);
                let summaries = self.facade.summaries(variant_id).await?;
                let variant: VariantInfo = variant_id.parse::<crate::types::ProtocolVariant>()?.into();
                self.formatter.format_summaries(&variant, &summaries)
            }
            Command::Detail { variant, id, raw } => {
                let detail = self.facade.detail(variant, id).await?;
                self.formatter.format_detail(&detail, *raw)
            }
            Command::Import { file } => {
                let outcome = self.importer.import_path(file).await?;
                self.formatter.format_import(&outcome)
            }
            Command::Config => {
                let mut output = display_config_summary(&self.config);
                output.push_str("\n\n");
                output.push_str(&EnvManager::display_env_help());
                for warning in EnvManager::validate_current_env() {
                    output.push('\n');
                    output.push_str(&self.formatter.format_warning(&warning)?);
                }
                Ok(output)
            }
        }
    }
}
