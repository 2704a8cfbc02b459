//! Maison CLI - Catalog inspection and seeding tools.
//!
//! # Usage
//!
//! ```bash
//! # List the catalog, filtered and sorted like the storefront
//! maison-cli catalog list --category Submariner --sort price-high
//!
//! # Seed products and boutiques from YAML as an admin
//! maison-cli catalog seed catalog.yaml -e admin@maison.example
//!
//! # Find boutiques
//! maison-cli boutiques list --search geneva
//! ```
//!
//! # Environment Variables
//!
//! - `SUPABASE_URL` - Project URL
//! - `SUPABASE_ANON_KEY` - Public anon key
//! - `MAISON_ADMIN_PASSWORD` - Admin password for `catalog seed` when
//!   `--password` is not given

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "maison-cli")]
#[command(author, version, about = "Maison CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and seed the product catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Inspect boutiques
    Boutiques {
        #[command(subcommand)]
        action: BoutiquesAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List products with optional filters
    List {
        /// Category to include (repeatable)
        #[arg(short, long)]
        category: Vec<String>,

        /// Sort order (`relevance`, `price-low`, `price-high`, `name`)
        #[arg(short, long, default_value = "relevance")]
        sort: String,

        /// Case-insensitive name search
        #[arg(short = 'q', long)]
        search: Option<String>,
    },
    /// Insert products and boutiques from a YAML file
    Seed {
        /// Path to the YAML file
        file: String,

        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin password (falls back to `MAISON_ADMIN_PASSWORD`)
        #[arg(short, long)]
        password: Option<String>,
    },
}

#[derive(Subcommand)]
enum BoutiquesAction {
    /// List boutiques, optionally matching a search term
    List {
        /// Matches name or address
        #[arg(short = 'q', long)]
        search: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Catalog { action } => match action {
            CatalogAction::List {
                category,
                sort,
                search,
            } => commands::catalog::list(category, &sort, search).await?,
            CatalogAction::Seed {
                file,
                email,
                password,
            } => {
                let report = commands::catalog::seed(&file, &email, password).await?;
                tracing::info!(
                    products = report.products,
                    boutiques = report.boutiques,
                    "Seeding complete"
                );
            }
        },
        Commands::Boutiques { action } => match action {
            BoutiquesAction::List { search } => {
                commands::boutiques::list(search.as_deref().unwrap_or_default()).await?;
            }
        },
    }
    Ok(())
}
