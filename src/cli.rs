use clap::{Args, Parser, Subcommand};
use fee_engine::admin::{apply, validate, Command, CommandRecord, FeeDraft, FeePatch};
use fee_engine::calculator::{calculate, CalculationRequest};
use fee_engine::config::Config;
use fee_engine::error::{Error, Result};
use fee_engine::registry::{
    CalculationKind, CatalogEntry, CatalogKind, FeeDefinition, FeeFilter, Registry, ScopeKind,
    Sharer,
};
use fee_engine::replay::replay_to_tip;
use fee_engine::storage::{FileStorage, Storage};
use rust_decimal::Decimal;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "fee-engine")]
#[command(about = "Fee resolution and calculation engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: "human" or "json"
    #[arg(short, long)]
    pub format: Option<String>,

    /// Data directory path
    #[arg(short, long)]
    pub data_dir: Option<String>,

    /// Log level filter (overridden by RUST_LOG)
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the data directory
    Init,

    /// Manage transaction types and channels
    #[command(subcommand)]
    Catalog(CatalogCommand),

    /// Manage fee definitions
    #[command(subcommand)]
    Fee(FeeCommand),

    /// Calculate the fee for a transaction
    Calculate {
        /// Transaction type code
        #[arg(long = "type")]
        transaction_type: String,

        /// Channel code
        #[arg(long)]
        channel: String,

        /// Transaction amount
        #[arg(long)]
        amount: Decimal,

        #[arg(long)]
        tenant: Option<String>,

        #[arg(long)]
        client_id: Option<String>,

        #[arg(long)]
        product_id: Option<String>,

        #[arg(long)]
        processor_id: Option<String>,

        /// Skip the sharer split
        #[arg(long)]
        no_sharing: bool,
    },
}

#[derive(Subcommand)]
pub enum CatalogCommand {
    /// Register a transaction type
    AddType {
        code: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Register a channel
    AddChannel {
        code: String,
        #[arg(long)]
        description: Option<String>,
    },
    EnableType { code: String },
    DisableType { code: String },
    EnableChannel { code: String },
    DisableChannel { code: String },
    /// List both catalogs
    List,
}

#[derive(Subcommand)]
pub enum FeeCommand {
    /// Create a fee definition from JSON
    Create {
        #[command(flatten)]
        input: JsonInput,
        #[arg(long)]
        tenant: Option<String>,
        /// Validate but don't apply
        #[arg(long)]
        dry_run: bool,
    },
    /// Replace a fee definition from JSON
    Update {
        id: u64,
        #[command(flatten)]
        input: JsonInput,
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Update selected fields from a JSON object
    Patch {
        id: u64,
        #[command(flatten)]
        input: JsonInput,
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Replace the sharers of a shared fee from a JSON array
    Sharers {
        id: u64,
        #[command(flatten)]
        input: JsonInput,
        #[arg(long)]
        tenant: Option<String>,
    },
    Activate {
        id: u64,
        #[arg(long)]
        tenant: Option<String>,
    },
    Deactivate {
        id: u64,
        #[arg(long)]
        tenant: Option<String>,
    },
    Show {
        id: u64,
        #[arg(long)]
        tenant: Option<String>,
    },
    List {
        #[arg(long)]
        tenant: Option<String>,

        /// Only this scope kind (default, product, processor, client)
        #[arg(long)]
        scope: Option<ScopeKind>,

        /// Only this calculation type (fixed, percentage, ranged)
        #[arg(long)]
        calculation: Option<CalculationKind>,

        /// Only active (true) or inactive (false) definitions
        #[arg(long)]
        active: Option<bool>,

        /// Only shared (true) or unshared (false) definitions
        #[arg(long)]
        shared: Option<bool>,
    },
}

/// JSON payload given inline, from a file, or on stdin.
#[derive(Args)]
pub struct JsonInput {
    /// Inline JSON
    #[arg(short, long)]
    json: Option<String>,

    /// JSON file path
    #[arg(long)]
    file: Option<String>,
}

impl JsonInput {
    fn read(&self) -> Result<String> {
        if let Some(json) = &self.json {
            return Ok(json.clone());
        }
        match &self.file {
            Some(path) => fs::read_to_string(path)
                .map_err(|e| Error::InvalidRequest(format!("Failed to read file {}: {}", path, e))),
            None => {
                let mut buffer = String::new();
                io::stdin().read_to_string(&mut buffer).map_err(|e| {
                    Error::InvalidRequest(format!("Failed to read from stdin: {}", e))
                })?;
                Ok(buffer)
            }
        }
    }

    fn parse<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.read()?)
            .map_err(|e| Error::InvalidDefinition(format!("Failed to parse JSON: {}", e)))
    }
}

/// Registry at the tip of the log plus the log position it reflects.
struct Workspace {
    storage: FileStorage,
    registry: Registry,
    applied: u64,
}

impl Workspace {
    fn open(config: &Config) -> Result<Self> {
        let storage = FileStorage::new(config);
        let (registry, applied) = replay_to_tip(&storage)?;
        Ok(Workspace {
            storage,
            registry,
            applied,
        })
    }

    /// Apply a command, then log it and snapshot the new registry.
    fn commit(&mut self, command: Command) -> Result<()> {
        let record = CommandRecord::new(command);
        let next = apply(&self.registry, &record)?;
        self.storage.append_command(&record)?;
        self.applied += 1;
        self.storage.persist_snapshot(&next, self.applied)?;
        self.registry = next;
        info!(applied = self.applied, "command committed");
        Ok(())
    }
}

/// Format output based on format type
fn format_output<T: serde::Serialize + std::fmt::Debug>(data: &T, format: &str) -> Result<String> {
    match format {
        "json" => serde_json::to_string_pretty(data)
            .map_err(|e| Error::StorageError(format!("Failed to serialize JSON: {}", e))),
        _ => Ok(format!("{:#?}", data)),
    }
}

pub fn load_config(cli: &Cli) -> Config {
    let mut config = Config::from_env();
    if let Some(dir) = &cli.data_dir {
        config.set_data_dir(PathBuf::from(dir));
    }
    if let Some(format) = &cli.format {
        config.set_output_format(format.clone());
    }
    if let Some(level) = &cli.log_level {
        config.set_log_level(level.clone());
    }
    config
}

pub fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Init => {
            fs::create_dir_all(config.get_data_dir()).map_err(|e| {
                Error::StorageError(format!("Failed to create data directory: {}", e))
            })?;
            println!(
                "Initialized data directory at: {}",
                config.get_data_dir().display()
            );
            Ok(())
        }
        Commands::Catalog(command) => run_catalog(command, &config),
        Commands::Fee(command) => run_fee(command, &config),
        Commands::Calculate {
            transaction_type,
            channel,
            amount,
            tenant,
            client_id,
            product_id,
            processor_id,
            no_sharing,
        } => {
            let workspace = Workspace::open(&config)?;
            let request = CalculationRequest {
                tenant_id: tenant,
                transaction_type,
                channel,
                amount,
                product_id,
                processor_id,
                client_id,
                apply_sharing: !no_sharing,
            };
            let response = calculate(&workspace.registry, &config, &request)?;
            println!("{}", format_output(&response, config.get_output_format())?);
            Ok(())
        }
    }
}

fn run_catalog(command: CatalogCommand, config: &Config) -> Result<()> {
    let mut workspace = Workspace::open(config)?;

    let (command, message) = match command {
        CatalogCommand::AddType { code, description } => (
            register(CatalogKind::TransactionType, &code, description),
            format!("✓ Registered transaction type {}", code),
        ),
        CatalogCommand::AddChannel { code, description } => (
            register(CatalogKind::Channel, &code, description),
            format!("✓ Registered channel {}", code),
        ),
        CatalogCommand::EnableType { code } => (
            toggle(CatalogKind::TransactionType, &code, true),
            format!("✓ Enabled transaction type {}", code),
        ),
        CatalogCommand::DisableType { code } => (
            toggle(CatalogKind::TransactionType, &code, false),
            format!("✓ Disabled transaction type {}", code),
        ),
        CatalogCommand::EnableChannel { code } => (
            toggle(CatalogKind::Channel, &code, true),
            format!("✓ Enabled channel {}", code),
        ),
        CatalogCommand::DisableChannel { code } => (
            toggle(CatalogKind::Channel, &code, false),
            format!("✓ Disabled channel {}", code),
        ),
        CatalogCommand::List => {
            let output = CatalogOutput {
                transaction_types: workspace
                    .registry
                    .catalog_entries(CatalogKind::TransactionType)
                    .into_iter()
                    .map(CatalogEntryOutput::from)
                    .collect(),
                channels: workspace
                    .registry
                    .catalog_entries(CatalogKind::Channel)
                    .into_iter()
                    .map(CatalogEntryOutput::from)
                    .collect(),
            };
            println!("{}", format_output(&output, config.get_output_format())?);
            return Ok(());
        }
    };

    workspace.commit(command)?;
    println!("{}", message);
    Ok(())
}

fn register(kind: CatalogKind, code: &str, description: Option<String>) -> Command {
    Command::RegisterCatalogEntry {
        kind,
        code: code.to_string(),
        description,
    }
}

fn toggle(kind: CatalogKind, code: &str, active: bool) -> Command {
    Command::SetCatalogEntryActive {
        kind,
        code: code.to_string(),
        active,
    }
}

fn run_fee(command: FeeCommand, config: &Config) -> Result<()> {
    let mut workspace = Workspace::open(config)?;

    match command {
        FeeCommand::Create {
            input,
            tenant,
            dry_run,
        } => {
            let tenant_id = config.effective_tenant_id(tenant.as_deref());
            let draft: FeeDraft = input.parse()?;
            let command = Command::CreateFee {
                tenant_name: config.tenant_name_for(&tenant_id),
                tenant_id: tenant_id.clone(),
                draft,
            };

            if dry_run {
                let record = CommandRecord::new(command);
                if let Some(fee) = validate(&workspace.registry, &record)? {
                    println!("✓ Fee definition is valid (would be id {})", fee.id);
                }
                return Ok(());
            }

            let fee_id = workspace.registry.next_fee_id;
            workspace.commit(command)?;
            print_fee(&workspace.registry, &tenant_id, fee_id, config)
        }
        FeeCommand::Update { id, input, tenant } => {
            let tenant_id = config.effective_tenant_id(tenant.as_deref());
            let draft: FeeDraft = input.parse()?;
            workspace.commit(Command::ReplaceFee {
                tenant_id: tenant_id.clone(),
                fee_id: id,
                draft,
            })?;
            print_fee(&workspace.registry, &tenant_id, id, config)
        }
        FeeCommand::Patch { id, input, tenant } => {
            let tenant_id = config.effective_tenant_id(tenant.as_deref());
            let fields: serde_json::Value = input.parse()?;
            let object = fields.as_object().ok_or_else(|| {
                Error::InvalidDefinition("Patch must be a JSON object".to_string())
            })?;
            let patch = FeePatch::from_fields(object)?;
            if patch.is_empty() {
                return Err(Error::InvalidDefinition(
                    "Patch contains no fields".to_string(),
                ));
            }
            workspace.commit(Command::PatchFee {
                tenant_id: tenant_id.clone(),
                fee_id: id,
                patch,
            })?;
            print_fee(&workspace.registry, &tenant_id, id, config)
        }
        FeeCommand::Sharers { id, input, tenant } => {
            let tenant_id = config.effective_tenant_id(tenant.as_deref());
            let sharers: Vec<Sharer> = input.parse()?;
            workspace.commit(Command::ReplaceSharers {
                tenant_id: tenant_id.clone(),
                fee_id: id,
                sharers,
            })?;
            print_fee(&workspace.registry, &tenant_id, id, config)
        }
        FeeCommand::Activate { id, tenant } => set_active(&mut workspace, config, id, tenant, true),
        FeeCommand::Deactivate { id, tenant } => {
            set_active(&mut workspace, config, id, tenant, false)
        }
        FeeCommand::Show { id, tenant } => {
            let tenant_id = config.effective_tenant_id(tenant.as_deref());
            require_tenant(&workspace.registry, &tenant_id)?;
            print_fee(&workspace.registry, &tenant_id, id, config)
        }
        FeeCommand::List {
            tenant,
            scope,
            calculation,
            active,
            shared,
        } => {
            let tenant_id = config.effective_tenant_id(tenant.as_deref());
            require_tenant(&workspace.registry, &tenant_id)?;
            let filter = FeeFilter {
                scope,
                calculation,
                active,
                shared,
            };
            let fees: Vec<FeeSummaryOutput> = workspace
                .registry
                .search_fees(&tenant_id, &filter)
                .into_iter()
                .map(FeeSummaryOutput::from)
                .collect();
            let output = FeeListOutput {
                tenant_id,
                fees,
            };
            println!("{}", format_output(&output, config.get_output_format())?);
            Ok(())
        }
    }
}

fn set_active(
    workspace: &mut Workspace,
    config: &Config,
    id: u64,
    tenant: Option<String>,
    active: bool,
) -> Result<()> {
    let tenant_id = config.effective_tenant_id(tenant.as_deref());
    workspace.commit(Command::SetFeeActive {
        tenant_id,
        fee_id: id,
        active,
    })?;
    println!(
        "✓ Fee {} {}",
        id,
        if active { "activated" } else { "deactivated" }
    );
    Ok(())
}

fn require_tenant(registry: &Registry, tenant_id: &str) -> Result<()> {
    registry
        .get_tenant(tenant_id)
        .map(|_| ())
        .ok_or_else(|| Error::TenantNotFound(tenant_id.to_string()))
}

fn print_fee(registry: &Registry, tenant_id: &str, id: u64, config: &Config) -> Result<()> {
    let fee = registry
        .get_fee(tenant_id, id)
        .ok_or(Error::FeeNotFound(id))?;
    println!("{}", format_output(fee, config.get_output_format())?);
    Ok(())
}

#[derive(Debug, serde::Serialize)]
struct CatalogEntryOutput {
    code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    active: bool,
}

impl From<&CatalogEntry> for CatalogEntryOutput {
    fn from(entry: &CatalogEntry) -> Self {
        CatalogEntryOutput {
            code: entry.code.clone(),
            description: entry.description.clone(),
            active: entry.active,
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct CatalogOutput {
    transaction_types: Vec<CatalogEntryOutput>,
    channels: Vec<CatalogEntryOutput>,
}

#[derive(Debug, serde::Serialize)]
struct FeeSummaryOutput {
    id: u64,
    name: String,
    transaction_type: String,
    channels: Vec<String>,
    scope: String,
    calculation: String,
    shared: bool,
    active: bool,
}

impl From<&FeeDefinition> for FeeSummaryOutput {
    fn from(fee: &FeeDefinition) -> Self {
        FeeSummaryOutput {
            id: fee.id,
            name: fee.name.clone(),
            transaction_type: fee.transaction_type.clone(),
            channels: fee.channels.iter().cloned().collect(),
            scope: fee.scope.to_string(),
            calculation: fee.calculation_kind().to_string(),
            shared: fee.shared,
            active: fee.active,
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct FeeListOutput {
    tenant_id: String,
    fees: Vec<FeeSummaryOutput>,
}
