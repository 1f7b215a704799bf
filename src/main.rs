//! Stockroom CLI - terminal front end for the local product catalog

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "stockroom")]
#[command(version)]
#[command(about = "Local product catalog - SQLite-backed inventory with SQL import/export")]
#[command(long_about = r#"
Stockroom keeps a product catalog (barcode, name, price, description) in an
embedded SQLite database that is saved as a whole into a local storage file.

Example usage:
  stockroom add --name "Green tea" --barcode 4006381333931 --price 3.49
  stockroom search tea
  stockroom export --output catalog.sql
  stockroom import catalog.sql --mode replace
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the storage file (overrides config)
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    /// Storage key the catalog is saved under (overrides config)
    #[arg(long, global = true)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file with the default settings
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Add a product
    Add {
        /// Product name
        #[arg(short, long)]
        name: String,

        /// Barcode (must be unique)
        #[arg(short, long)]
        barcode: Option<String>,

        /// Unit price
        #[arg(short, long, allow_negative_numbers = true)]
        price: Option<f64>,

        /// Free-form description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Edit a product; omitted fields keep their current value
    Edit {
        /// Product id
        id: i64,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long, conflicts_with = "clear_barcode")]
        barcode: Option<String>,

        #[arg(short, long, allow_negative_numbers = true, conflicts_with = "clear_price")]
        price: Option<f64>,

        #[arg(short, long, conflicts_with = "clear_description")]
        description: Option<String>,

        /// Remove the barcode
        #[arg(long)]
        clear_barcode: bool,

        /// Remove the price
        #[arg(long)]
        clear_price: bool,

        /// Remove the description
        #[arg(long)]
        clear_description: bool,
    },

    /// Remove a product
    Remove {
        /// Product id
        id: i64,
    },

    /// Show one product
    Show {
        /// Product id
        id: i64,
    },

    /// List all products, newest first
    List,

    /// Search products by name or barcode
    Search {
        /// Text to look for; omit to list everything
        term: Option<String>,
    },

    /// Export the catalog as a SQL script
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import products from a SQL script
    Import {
        /// SQL script to import
        file: PathBuf,

        /// merge (keep existing products) or replace (clear them first)
        #[arg(short, long, default_value = "merge")]
        mode: String,
    },

    /// Show catalog statistics
    Stats,

    /// Delete every product and the saved state
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

/// How results are written to stdout
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(self) -> bool {
        self == OutputMode::Human
    }
}

/// Print a successful result envelope in JSON mode
pub fn emit_success(output_mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    if output_mode == OutputMode::Json {
        let envelope = serde_json::json!({
            "ok": true,
            "command": command,
            "data": data,
        });
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    Ok(())
}

fn emit_failure(output_mode: OutputMode, err: &anyhow::Error) {
    let kind = err
        .downcast_ref::<stockroom::Error>()
        .map(stockroom::Error::kind)
        .unwrap_or("error");

    match output_mode {
        OutputMode::Json => {
            let envelope = serde_json::json!({
                "ok": false,
                "error": { "kind": kind, "message": err.to_string() },
            });
            println!("{}", serde_json::to_string_pretty(&envelope).unwrap_or_default());
        }
        OutputMode::Human => stockroom::ui::error(&format!("{:#}", err)),
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging on stderr so stdout stays clean for JSON and exports
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };

    if let Err(err) = run(cli, output_mode) {
        emit_failure(output_mode, &err);
        std::process::exit(1);
    }
}

fn run(cli: Cli, output_mode: OutputMode) -> anyhow::Result<()> {
    let settings = commands::Settings::resolve(cli.config.as_deref(), cli.storage, cli.key)?;

    match cli.command {
        Commands::Init { force } => commands::run_init(&settings, force, output_mode),
        Commands::Add { name, barcode, price, description } => {
            let mut fields = stockroom::ProductFields::new(name);
            fields.barcode = barcode;
            fields.price = price;
            fields.description = description;
            commands::run_add(&settings, fields, output_mode)
        }
        Commands::Edit {
            id,
            name,
            barcode,
            price,
            description,
            clear_barcode,
            clear_price,
            clear_description,
        } => {
            let edit = commands::FieldEdit {
                name,
                barcode: commands::Change::from_flags(barcode, clear_barcode),
                price: commands::Change::from_flags(price, clear_price),
                description: commands::Change::from_flags(description, clear_description),
            };
            commands::run_edit(&settings, id, edit, output_mode)
        }
        Commands::Remove { id } => commands::run_remove(&settings, id, output_mode),
        Commands::Show { id } => commands::run_show(&settings, id, output_mode),
        Commands::List => commands::run_search(&settings, None, output_mode),
        Commands::Search { term } => commands::run_search(&settings, term.as_deref(), output_mode),
        Commands::Export { output } => commands::run_export(&settings, output.as_deref(), output_mode),
        Commands::Import { file, mode } => {
            let mode: stockroom::ImportMode = mode.parse()?;
            commands::run_import(&settings, &file, mode, output_mode)
        }
        Commands::Stats => commands::run_stats(&settings, output_mode),
        Commands::Reset { yes } => commands::run_reset(&settings, yes, output_mode),
    }
}
