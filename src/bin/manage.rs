//! Management commands for content that has no page of its own
//!
//! Usage: `manage <command> [args]`, e.g.
//! `manage create-category travel "Travel" "Trips and places"`.
//! The configuration is read the same way as by the server.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use blogicum::{
    config::Config,
    db::{
        self,
        repositories::{
            SqlxCategoryRepository, SqlxLocationRepository, SqlxPostRepository,
            SqlxSessionRepository, SqlxUserRepository,
        },
        DynDatabasePool,
    },
    services::{
        CategoryService, CreateCategoryInput, LocationService, PostService, RegisterInput,
        UserService,
    },
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(long, env = "BLOGICUM_CONFIG", default_value = "config.yml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a category
    CreateCategory {
        slug: String,
        title: String,
        #[arg(default_value = "")]
        description: String,
        /// Create it unpublished
        #[arg(long)]
        hidden: bool,
    },
    /// Create a location
    CreateLocation {
        name: String,
        #[arg(long)]
        hidden: bool,
    },
    /// Publish or hide a category together with its posts
    PublishCategory {
        slug: String,
        #[arg(action = clap::ArgAction::Set)]
        published: bool,
    },
    /// Delete a category; its posts keep existing without one
    DeleteCategory { slug: String },
    /// Delete a location; its posts keep existing without one
    DeleteLocation { id: i64 },
    /// Create a user account
    CreateUser {
        username: String,
        password: String,
        #[arg(default_value = "")]
        email: String,
    },
    /// Apply pending database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blogicum=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = Config::load_with_env(&args.config)?;
    let pool = db::create_pool(&config.database).await?;

    let result = run(args.command, &pool).await;
    pool.close().await;
    result
}

async fn run(command: Command, pool: &DynDatabasePool) -> Result<()> {
    if matches!(command, Command::Migrate) {
        let pending = db::migrations::pending_count(pool).await?;
        let applied = db::migrations::run_migrations(pool).await?;
        println!("Applied {} of {} pending migrations", applied, pending);
        return Ok(());
    }
    db::migrations::run_migrations(pool).await?;

    let categories = CategoryService::new(SqlxCategoryRepository::boxed(pool.clone()));
    let locations = LocationService::new(SqlxLocationRepository::boxed(pool.clone()));
    let posts = PostService::new(
        SqlxPostRepository::boxed(pool.clone()),
        SqlxCategoryRepository::boxed(pool.clone()),
        SqlxLocationRepository::boxed(pool.clone()),
    );

    match command {
        Command::CreateCategory {
            slug,
            title,
            description,
            hidden,
        } => {
            let input = CreateCategoryInput {
                title,
                description,
                slug,
                is_published: !hidden,
            };
            let category = categories.create(input).await?;
            println!("Created category {} (id {})", category.slug, category.id);
        }
        Command::CreateLocation { name, hidden } => {
            let location = locations.create(&name, !hidden).await?;
            println!("Created location {} (id {})", location.name, location.id);
        }
        Command::PublishCategory { slug, published } => {
            let category = categories.set_published(&slug, published).await?;
            let affected = posts.posts_in_category(category.id).await?.len();
            let state = if category.is_published { "published" } else { "hidden" };
            println!(
                "Category {} is now {} ({} posts affected)",
                category.slug, state, affected
            );
        }
        Command::DeleteCategory { slug } => {
            let category = categories.get_by_slug(&slug).await?;
            let orphaned = posts.posts_in_category(category.id).await?.len();
            categories.delete(&slug).await?;
            println!("Deleted category {}; {} posts left without one", slug, orphaned);
        }
        Command::DeleteLocation { id } => {
            locations.delete(id).await?;
            println!("Deleted location {}", id);
        }
        Command::CreateUser {
            username,
            password,
            email,
        } => {
            let users = UserService::new(
                SqlxUserRepository::boxed(pool.clone()),
                SqlxSessionRepository::boxed(pool.clone()),
            );
            let user = users
                .register(RegisterInput {
                    username,
                    email,
                    password_confirm: password.clone(),
                    password,
                })
                .await
                .context("Failed to create user")?;
            println!("Created user {} (id {})", user.username, user.id);
        }
        Command::Migrate => {}
    }

    Ok(())
}
