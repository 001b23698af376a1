use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use sea_orm::DbErr;
use sea_orm_migration::MigratorTrait;
use tracing::{info, warn};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use menuforge::config::MenuConfig;
use menuforge::database::connection::{
    connect_and_migrate, establish_connection, get_database_url,
};
use menuforge::database::migrations::Migrator;
use menuforge::errors::format_db_error;
use menuforge::menu::{
    flatten_tree, DropOutcome, EntityKind, Expansion, MenuNode, NoopObserver, RowKey,
};
use menuforge::services::{
    CreateCategoryRequest, CreateLabelRequest, CreateProductRequest, OrderMode,
    UpdateCategoryRequest,
};
use menuforge::{app_context::ReorderScope, AppContext};

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    /// Database file, `:memory:` or a sqlite URL
    #[clap(short, long, global = true)]
    database: Option<String>,
    #[clap(long, global = true)]
    order_mode: Option<OrderMode>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Db {
        #[clap(subcommand)]
        command: DbCommands,
    },
    Label {
        #[clap(subcommand)]
        command: LabelCommands,
    },
    Category {
        #[clap(subcommand)]
        command: CategoryCommands,
    },
    Product {
        #[clap(subcommand)]
        command: ProductCommands,
    },
    /// Attach children to a parent, appended or at a position
    Attach {
        #[clap(subcommand)]
        command: AttachCommands,
    },
    /// Detach children from one parent
    Detach {
        #[clap(subcommand)]
        command: DetachCommands,
    },
    /// Drag one row onto another within a list
    Reorder {
        #[clap(subcommand)]
        scope: ReorderCommands,
    },
    /// Clone the rows with the given keys (see `tree`)
    Clone { keys: Vec<String> },
    /// Remove the rows with the given keys from their parents
    Remove { keys: Vec<String> },
    /// Print the menu
    Tree {
        #[clap(long)]
        flat: bool,
        /// Emit the rows as JSON
        #[clap(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    Init,
    Migrate {
        #[clap(subcommand)]
        direction: MigrateDirection,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum MigrateDirection {
    Up,
    Down,
    Fresh,
}

#[derive(Subcommand, Debug)]
enum LabelCommands {
    Add {
        name: String,
        #[clap(long)]
        icon: Option<String>,
    },
    Show { id: i32 },
    Hide { id: i32 },
    Delete { id: i32 },
}

#[derive(Subcommand, Debug)]
enum CategoryCommands {
    Add {
        name: String,
        slug: String,
        #[clap(short, long = "label")]
        labels: Vec<i32>,
    },
    Update {
        id: i32,
        #[clap(long)]
        name: Option<String>,
        #[clap(long)]
        slug: Option<String>,
        /// Replace attached labels
        #[clap(long, value_delimiter = ',')]
        labels: Option<Vec<i32>>,
        /// Detach every label
        #[clap(long, conflicts_with = "labels")]
        clear_labels: bool,
        #[clap(long)]
        visible: Option<bool>,
    },
    Delete { id: i32 },
    List,
}

#[derive(Subcommand, Debug)]
enum ProductCommands {
    Add {
        name: String,
        slug: String,
        #[clap(short, long)]
        category: Option<i32>,
    },
    Disable { id: i32 },
    Enable { id: i32 },
    Delete { id: i32 },
}

#[derive(Subcommand, Debug)]
enum AttachCommands {
    Categories {
        label_id: i32,
        #[clap(required = true)]
        ids: Vec<i32>,
        #[clap(long)]
        position: Option<usize>,
    },
    Products {
        category_id: i32,
        #[clap(required = true)]
        ids: Vec<i32>,
        #[clap(long)]
        position: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
enum DetachCommands {
    Categories {
        label_id: i32,
        #[clap(required = true)]
        ids: Vec<i32>,
    },
    Products {
        category_id: i32,
        #[clap(required = true)]
        ids: Vec<i32>,
    },
}

#[derive(Subcommand, Debug)]
enum ReorderCommands {
    Labels {
        dragged: i32,
        onto: i32,
    },
    Categories {
        dragged: i32,
        onto: i32,
    },
    LabelCategories {
        label_id: i32,
        dragged: i32,
        onto: i32,
    },
    CategoryProducts {
        category_id: i32,
        dragged: i32,
        onto: i32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let config = MenuConfig::from_env()?.with_overrides(
        args.database.clone(),
        args.order_mode,
        args.log_level.clone(),
    );
    setup_logging(&config.log_level);

    match args.command {
        Commands::Db { command } => match command {
            DbCommands::Init => {
                info!("Initializing database: {}", config.database);
                migrate_database(&config.database, MigrateDirection::Up).await?;
            }
            DbCommands::Migrate { direction } => {
                info!("Running database migration: {:?}", direction);
                migrate_database(&config.database, direction).await?;
            }
        },
        command => {
            let db = connect_and_migrate(&config.database_url()).await?;
            let ctx = AppContext::new(db);
            run_catalog_command(&ctx, &config, command).await?;
        }
    }

    Ok(())
}

async fn run_catalog_command(ctx: &AppContext, config: &MenuConfig, command: Commands) -> Result<()> {
    let catalog = ctx.catalog();

    match command {
        Commands::Db { .. } => bail!("database commands run without a catalog connection"),
        Commands::Label { command } => match command {
            LabelCommands::Add { name, icon } => {
                let label = catalog
                    .create_label(CreateLabelRequest { name, icon })
                    .await?;
                println!("{}\t{}", label.id, label.name);
            }
            LabelCommands::Show { id } => {
                catalog.set_label_visibility(id, true).await?;
            }
            LabelCommands::Hide { id } => {
                catalog.set_label_visibility(id, false).await?;
            }
            LabelCommands::Delete { id } => {
                catalog.delete_label_with_relations(id).await?;
            }
        },
        Commands::Category { command } => match command {
            CategoryCommands::Add { name, slug, labels } => {
                let category = catalog
                    .create_category_with_labels(CreateCategoryRequest {
                        name,
                        slug,
                        label_ids: labels,
                    })
                    .await?;
                println!("{}\t{}\t{}", category.id, category.slug, category.name);
            }
            CategoryCommands::Update {
                id,
                name,
                slug,
                labels,
                clear_labels,
                visible,
            } => {
                let label_ids = if clear_labels { Some(Vec::new()) } else { labels };
                catalog
                    .update_category_with_labels(UpdateCategoryRequest {
                        id,
                        name,
                        slug,
                        label_ids,
                        is_visible: visible,
                    })
                    .await?;
            }
            CategoryCommands::Delete { id } => {
                catalog.delete_category_with_relations(id).await?;
            }
            CategoryCommands::List => {
                let listing = catalog.list_categories_and_labels(config.order_mode).await?;
                for entry in listing.categories {
                    let labels: Vec<String> = entry
                        .labels
                        .iter()
                        .map(|attached| format!("{}#{}", attached.label.name, attached.order))
                        .collect();
                    println!(
                        "{}\t{}\t{}\t[{}]",
                        entry.category.id,
                        entry.category.slug,
                        entry.category.name,
                        labels.join(", ")
                    );
                }
            }
        },
        Commands::Product { command } => match command {
            ProductCommands::Add {
                name,
                slug,
                category,
            } => {
                let product = catalog
                    .create_product(CreateProductRequest { name, slug })
                    .await?;
                if let Some(category_id) = category {
                    catalog
                        .attach_products_to_category(category_id, &[product.id], None)
                        .await?;
                }
                println!("{}\t{}\t{}", product.id, product.slug, product.name);
            }
            ProductCommands::Disable { id } => {
                catalog.set_product_disabled(id, true).await?;
            }
            ProductCommands::Enable { id } => {
                catalog.set_product_disabled(id, false).await?;
            }
            ProductCommands::Delete { id } => {
                catalog.delete_product_with_relations(id).await?;
            }
        },
        Commands::Attach { command } => match command {
            AttachCommands::Categories {
                label_id,
                ids,
                position,
            } => {
                let added = catalog
                    .attach_categories_to_label(label_id, &ids, position)
                    .await?;
                println!("Attached {added} categories");
            }
            AttachCommands::Products {
                category_id,
                ids,
                position,
            } => {
                let added = catalog
                    .attach_products_to_category(category_id, &ids, position)
                    .await?;
                println!("Attached {added} products");
            }
        },
        Commands::Detach { command } => {
            let (parent_id, kind, ids) = match command {
                DetachCommands::Categories { label_id, ids } => {
                    (label_id, EntityKind::Category, ids)
                }
                DetachCommands::Products { category_id, ids } => {
                    (category_id, EntityKind::Product, ids)
                }
            };
            let Some(first) = ids.first().copied() else {
                bail!("nothing to detach");
            };
            let handler = ctx
                .detach_handler(Some(parent_id), kind)?
                .with_selection(ids);
            if let Some(report) = handler.handle_remove(first).await {
                if report.failed > 0 {
                    bail!("{} of {} detaches failed", report.failed, report.attempted());
                }
            }
        }
        Commands::Reorder { scope } => {
            let (scope, dragged, onto) = match scope {
                ReorderCommands::Labels { dragged, onto } => (ReorderScope::Labels, dragged, onto),
                ReorderCommands::Categories { dragged, onto } => {
                    (ReorderScope::Categories, dragged, onto)
                }
                ReorderCommands::LabelCategories {
                    label_id,
                    dragged,
                    onto,
                } => (ReorderScope::LabelCategories { label_id }, dragged, onto),
                ReorderCommands::CategoryProducts {
                    category_id,
                    dragged,
                    onto,
                } => (ReorderScope::CategoryProducts { category_id }, dragged, onto),
            };
            match ctx.drop_in_scope(scope, dragged, onto).await? {
                DropOutcome::Persisted(ids) => println!("New order: {ids:?}"),
                DropOutcome::Unchanged => println!("Order unchanged"),
            }
        }
        Commands::Clone { keys } => {
            let (_, registry) = ctx.load_menu().await?;
            let keys: Vec<RowKey> = keys.into_iter().map(RowKey::from).collect();
            ctx.bulk_dispatcher(registry)
                .handle_clone(&keys, &NoopObserver)
                .await?;
        }
        Commands::Remove { keys } => {
            let (_, registry) = ctx.load_menu().await?;
            let keys: Vec<RowKey> = keys.into_iter().map(RowKey::from).collect();
            let report = ctx
                .bulk_dispatcher(registry)
                .handle_remove(&keys, &NoopObserver)
                .await;
            if report.failed > 0 {
                bail!("{} of {} removals failed", report.failed, report.attempted());
            }
        }
        Commands::Tree { flat, json } => {
            let tree = ctx.load_menu_tree().await?;
            if json {
                let output = if flat {
                    serde_json::to_string_pretty(&flatten_tree(&tree, &Expansion::All))?
                } else {
                    serde_json::to_string_pretty(&tree)?
                };
                println!("{output}");
            } else if flat {
                for row in flatten_tree(&tree, &Expansion::All) {
                    println!(
                        "{}{}\t{}\t{}",
                        "  ".repeat(row.depth),
                        row.name,
                        row.key,
                        visibility_marker(row.visible)
                    );
                }
            } else {
                for node in &tree {
                    print_node(node, 0);
                }
            }
        }
    }

    Ok(())
}

fn visibility_marker(visible: bool) -> &'static str {
    if visible {
        ""
    } else {
        "(hidden)"
    }
}

fn print_node(node: &MenuNode, depth: usize) {
    let count = node
        .product_count
        .map(|count| format!(" [{count}]"))
        .unwrap_or_default();
    println!(
        "{}{} {}{}\t{}\t{}",
        "  ".repeat(depth),
        node.kind.display_name(),
        node.name,
        count,
        node.key,
        visibility_marker(node.visible)
    );
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

async fn migrate_database(database: &str, direction: MigrateDirection) -> Result<()> {
    let db = establish_connection(&get_database_url(Some(database)))
        .await
        .map_err(|e| describe_db_error("connect", &e))?;
    let result = match direction {
        MigrateDirection::Up => Migrator::up(&db, None).await,
        MigrateDirection::Down => Migrator::down(&db, Some(1)).await,
        MigrateDirection::Fresh => Migrator::fresh(&db).await,
    };
    result.map_err(|e| describe_db_error("migrate", &e))?;
    info!("Migration {:?} complete", direction);
    Ok(())
}

fn describe_db_error(operation: &str, err: &DbErr) -> anyhow::Error {
    let (kind, message) = format_db_error(operation, err);
    warn!("{:?} database error during {}", kind, operation);
    anyhow!(message)
}

fn setup_logging(log_level: &str) {
    let log_level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("sqlx=warn,sea_orm=warn,{}", log_level)))
        .without_time()
        .init();
}
