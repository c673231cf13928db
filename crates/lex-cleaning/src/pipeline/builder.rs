//! The cleaning pipeline and its builder.

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::ai::AIProvider;
use crate::compiler::{CompiledRules, RuleCompiler};
use crate::config::{CleaningConfig, ConfigValidationError};
use crate::error::Result;
use crate::executor::RuleExecutor;
use crate::loader::DatasetLoader;
use crate::quality::DatasetValidator;
use crate::reporting::StatsComputer;
use crate::table::Table;
use crate::types::{CleaningResult, ColumnMeta, ValidationReport};

/// The cleaning pipeline.
///
/// Use [`Pipeline::builder()`] to create one.
///
/// # Example
///
/// ```rust,ignore
/// use lex_cleaning::{CleaningConfig, Pipeline};
/// use lex_cleaning::ai::GeminiProvider;
/// use std::sync::Arc;
///
/// // With AI interpretation, falling back to pattern matching
/// let provider = Arc::new(GeminiProvider::new(api_key)?);
/// let result = Pipeline::builder()
///     .ai_provider(provider)
///     .build()?
///     .run(&bytes, "remove duplicates, fill missing age with median")?;
///
/// // Pattern matching only
/// let result = Pipeline::builder()
///     .config(CleaningConfig::builder().use_ai(false).build()?)
///     .build()?
///     .run(&bytes, "trim whitespace")?;
///
/// for entry in &result.action_log {
///     println!("{}", entry);
/// }
/// ```
pub struct Pipeline {
    config: CleaningConfig,
    loader: DatasetLoader,
    validator: DatasetValidator,
    compiler: RuleCompiler,
    executor: RuleExecutor,
}

// Requests may be handed to a worker thread.
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Whether instructions go to the AI strategy first.
    pub fn uses_ai(&self) -> bool {
        self.compiler.has_ai()
    }

    /// Parse raw input and run the (non-fatal) quality checks.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CleaningError::MalformedInput`] when the content
    /// cannot be turned into a table.
    pub fn load(&self, bytes: &[u8]) -> Result<(Table, ValidationReport)> {
        info!("Step 1: Loading dataset ({} bytes)...", bytes.len());
        let table = self.loader.load(bytes)?;

        info!("Step 2: Validating dataset...");
        let report = self.validator.validate(&table);
        for issue in &report.issues {
            warn!("Validation: {}", issue.message);
        }
        Ok((table, report))
    }

    /// Compile an instruction against a schema.
    pub fn compile(&self, instruction: &str, schema: &[ColumnMeta]) -> Result<CompiledRules> {
        info!("Step 3: Compiling instruction...");
        self.compiler.compile(instruction, schema)
    }

    /// Apply compiled rules to a table. Never fails: rules that cannot be
    /// applied are skipped and logged.
    pub fn execute(&self, table: &Table, compiled: CompiledRules) -> CleaningResult {
        let validation = self.validator.validate(table);
        self.finish(table, compiled, validation)
    }

    fn finish(
        &self,
        table: &Table,
        compiled: CompiledRules,
        validation: ValidationReport,
    ) -> CleaningResult {
        info!("Step 4: Executing {} rules...", compiled.rules.len());
        let (transformed, action_log) = self.executor.execute(table, &compiled.rules);

        info!("Step 5: Computing statistics...");
        let stats = StatsComputer::compute(table, &transformed);

        CleaningResult {
            table: transformed,
            rules: compiled.rules,
            action_log,
            stats,
            strategy: compiled.strategy,
            warnings: compiled.warnings,
            validation,
        }
    }

    /// Compile and execute against an already loaded table.
    pub fn clean(&self, table: &Table, instruction: &str) -> Result<CleaningResult> {
        let compiled = self.compile(instruction, table.schema())?;
        Ok(self.execute(table, compiled))
    }

    /// The whole run: load, validate, compile, execute, stats.
    ///
    /// Only malformed input and unparseable instructions are errors.
    pub fn run(&self, bytes: &[u8], instruction: &str) -> Result<CleaningResult> {
        let start = Instant::now();
        let (table, report) = self.load(bytes)?;
        let compiled = self.compile(instruction, table.schema())?;
        let result = self.finish(&table, compiled, report);

        info!(
            "Cleaning complete in {:.2?}: {} rules ({}), {} skipped, {} -> {} rows",
            start.elapsed(),
            result.rules.len(),
            result.strategy,
            result.skipped_count(),
            result.stats.rows_before,
            result.stats.rows_after
        );
        Ok(result)
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<CleaningConfig>,
    ai_provider: Option<Arc<dyn AIProvider>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    pub fn config(mut self, config: CleaningConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the language-understanding service consulted before pattern
    /// matching. Ignored when the config disables AI.
    ///
    /// ```rust,ignore
    /// use lex_cleaning::ai::OpenRouterProvider;
    ///
    /// let provider = Arc::new(OpenRouterProvider::new(api_key)?);
    /// let pipeline = Pipeline::builder().ai_provider(provider).build()?;
    /// ```
    pub fn ai_provider(mut self, provider: Arc<dyn AIProvider>) -> Self {
        self.ai_provider = Some(provider);
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            loader: DatasetLoader::new(config.clone()),
            validator: DatasetValidator::new(config.high_missing_ratio),
            compiler: RuleCompiler::new(&config, self.ai_provider),
            executor: RuleExecutor::new(),
            config,
        })
    }
}
