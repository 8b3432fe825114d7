//! Moda Verse CLI - Browse the catalog, manage the cart, place orders.
//!
//! # Usage
//!
//! ```bash
//! # List tops under S/50, cheapest first
//! mv-cli catalog list --category Tops --max-price 50 --sort price-asc
//!
//! # Show a product
//! mv-cli catalog show classic-white-tee
//!
//! # Add a product, mark it down, then remove it
//! mv-cli catalog add wool-scarf --name "Wool Scarf" --category Accessories \
//!     --price 39.99 --image https://cdn.moda-verse.pe/scarf.jpg
//! mv-cli catalog edit wool-scarf --price 29.99 --original-price 39.99 --badge Oferta
//! mv-cli catalog delete wool-scarf
//!
//! # Add two to the cart, then view it
//! mv-cli cart add classic-white-tee -q 2
//! mv-cli cart show
//!
//! # Check out
//! mv-cli checkout --first-name Ana --last-name Quispe --address "Av. Larco 123" \
//!     --city Lima --state Lima --zip 15074 --card-number 4242424242424242 \
//!     --expiry 08/29 --cvc 123
//!
//! # Admin overview, listing only shipped orders
//! mv-cli dashboard --status Enviado
//! ```
//!
//! # Commands
//!
//! - `catalog` - List, show, add, edit and delete products
//! - `cart` - Show and change the saved cart
//! - `checkout` - Turn the cart into an order
//! - `dashboard` - Revenue, sales and recent orders
//! - `seed check` - Validate a catalog seed file

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use modaverse_core::OrderStatus;
use modaverse_storefront::catalog::{ProductQuery, ProductSort};
use modaverse_storefront::StorefrontError;
use modaverse_storefront::config::StorefrontConfig;

mod commands;

#[derive(Parser)]
#[command(name = "mv-cli")]
#[command(author, version, about = "Moda Verse storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the product catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Manage the saved cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for everything in the cart
    Checkout(CheckoutArgs),
    /// Show the admin overview
    Dashboard {
        /// Number of recent orders to list
        #[arg(short, long, default_value_t = 5)]
        limit: usize,

        /// Only list orders in this status (English or Spanish name)
        #[arg(short, long)]
        status: Option<OrderStatus>,
    },
    /// Work with catalog seed files
    Seed {
        #[command(subcommand)]
        action: SeedAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List products
    List {
        /// Only this category
        #[arg(short, long)]
        category: Option<String>,

        /// Only products at or below this price
        #[arg(long)]
        max_price: Option<Decimal>,

        /// Sort order (`price-asc`, `price-desc`, `name`)
        #[arg(short, long)]
        sort: Option<ProductSort>,

        /// Maximum number of products
        #[arg(short, long)]
        limit: Option<usize>,

        /// Case-insensitive text search over name, description and category
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one product
    Show {
        /// Product slug
        slug: String,
    },
    /// Add a product to the catalog
    Add {
        /// Slug for the new product (lowercase letters, digits and hyphens)
        slug: String,

        #[command(flatten)]
        fields: ProductArgs,
    },
    /// Change a product; fields not given keep their value
    Edit {
        /// Slug of the product to change
        slug: String,

        /// Give the product a new slug
        #[arg(long)]
        rename: Option<String>,

        /// Drop the markdown price
        #[arg(long, conflicts_with = "original_price")]
        clear_original_price: bool,

        #[command(flatten)]
        fields: ProductArgs,
    },
    /// Remove a product from the catalog
    Delete {
        /// Slug of the product to remove
        slug: String,
    },
}

#[derive(clap::Args)]
struct ProductArgs {
    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    category: Option<String>,

    #[arg(long)]
    price: Option<Decimal>,

    /// Price before the markdown, shown struck through
    #[arg(long)]
    original_price: Option<Decimal>,

    /// Image URL; repeat for several, the first is the main image
    #[arg(long = "image")]
    images: Vec<String>,

    #[arg(long)]
    description: Option<String>,

    /// Detail bullet; repeat for several
    #[arg(long = "detail")]
    details: Vec<String>,

    /// Short label such as "Nuevo"; an empty value removes it
    #[arg(long)]
    badge: Option<String>,
}

#[derive(Subcommand)]
enum CartAction {
    /// List cart lines and totals
    Show,
    /// Add a product
    Add {
        /// Product slug
        slug: String,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Set the quantity of a line (0 or less removes it)
    Update {
        /// Product slug
        slug: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a product
    Remove {
        /// Product slug
        slug: String,
    },
    /// Remove everything
    Clear,
}

#[derive(clap::Args)]
struct CheckoutArgs {
    /// Signed-in customer id; the order is added to their history
    #[arg(long)]
    user: Option<String>,

    #[arg(long)]
    first_name: String,

    #[arg(long)]
    last_name: String,

    #[arg(long)]
    address: String,

    #[arg(long)]
    city: String,

    #[arg(long)]
    state: String,

    #[arg(long)]
    zip: String,

    /// Card number (simulated payment, only the last four digits are kept)
    #[arg(long)]
    card_number: String,

    /// Card expiry as MM/YY
    #[arg(long)]
    expiry: String,

    /// Card security code
    #[arg(long)]
    cvc: String,
}

#[derive(Subcommand)]
enum SeedAction {
    /// Validate a catalog seed file without loading it
    Check {
        /// Path to the YAML seed file
        file: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "modaverse_storefront=info,modaverse_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, config).await;

    if let Err(e) = result {
        if let Some(err) = e.downcast_ref::<StorefrontError>() {
            err.capture();
        }
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), Box<dyn std::error::Error>> {
    let command = match cli.command {
        Commands::Seed {
            action: SeedAction::Check { file },
        } => return commands::seed::check(&file).await,
        command => command,
    };

    let state = commands::open_state(config).await?;

    match command {
        Commands::Catalog { action } => match action {
            CatalogAction::List {
                category,
                max_price,
                sort,
                limit,
                search,
            } => {
                let query = ProductQuery {
                    category,
                    max_price,
                    sort,
                    limit,
                };
                commands::catalog::list(&state, &query, search.as_deref()).await?;
            }
            CatalogAction::Show { slug } => commands::catalog::show(&state, &slug).await?,
            CatalogAction::Add { slug, fields } => commands::catalog::add(&state, slug, fields)?,
            CatalogAction::Edit {
                slug,
                rename,
                clear_original_price,
                fields,
            } => {
                commands::catalog::edit(&state, &slug, rename, clear_original_price, fields)
                    .await?;
            }
            CatalogAction::Delete { slug } => commands::catalog::delete(&state, &slug).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&state)?,
            CartAction::Add { slug, quantity } => {
                commands::cart::add(&state, &slug, quantity).await?;
            }
            CartAction::Update { slug, quantity } => {
                commands::cart::update(&state, &slug, quantity)?;
            }
            CartAction::Remove { slug } => commands::cart::remove(&state, &slug)?,
            CartAction::Clear => commands::cart::clear(&state)?,
        },
        Commands::Checkout(args) => commands::checkout::run(&state, args).await?,
        Commands::Dashboard { limit, status } => {
            commands::dashboard::show(&state, limit, status).await?;
        }
        Commands::Seed { .. } => {}
    }
    Ok(())
}
