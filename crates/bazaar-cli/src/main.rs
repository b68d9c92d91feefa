use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bazaar_core::models::{NewUser, ROLE_ADMIN, User};
use bazaar_core::services::UserAccounts;
use bazaar_core::{AppError, AuthService, CrudService, JwtKeys, PageRequest, UserDirectory};
use bazaar_db::{Database, DatabaseConfig};

#[derive(Parser)]
#[command(name = "bazaar", version, about = "Bazaar commerce backend operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,

    /// Create an administrator, or promote an existing account
    CreateAdmin {
        #[arg(short, long)]
        email: String,

        /// Password for a new account (ignored when the account exists)
        #[arg(short, long, env = "BAZAAR_ADMIN_PASSWORD")]
        password: String,

        /// Display name for a new account
        #[arg(short, long, default_value = "Administrator")]
        name: String,
    },

    /// Print a bearer token for an existing account
    IssueToken {
        #[arg(short, long)]
        email: String,

        #[arg(long, env = "BAZAAR_JWT_SECRET", hide_env_values = true)]
        jwt_secret: String,

        /// Token lifetime in seconds
        #[arg(long, env = "BAZAAR_JWT_TTL_SECS", default_value_t = 86_400)]
        ttl_secs: i64,
    },

    /// List catalog products as JSON
    Products {
        #[arg(long, default_value_t = 0)]
        page: u32,

        #[arg(long, default_value_t = 10)]
        size: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("bazaar=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db = connect_db().await?;

    match cli.command {
        Commands::Migrate => {
            db.migrate().await.context("Failed to run migrations")?;
            tracing::info!("Migrations applied");
        }
        Commands::CreateAdmin {
            email,
            password,
            name,
        } => cmd_create_admin(&db, email, password, name).await?,
        Commands::IssueToken {
            email,
            jwt_secret,
            ttl_secs,
        } => {
            let keys = JwtKeys::new(jwt_secret, ttl_secs)?;
            cmd_issue_token(&db, keys, &email).await?;
        }
        Commands::Products { page, size } => cmd_products(&db, PageRequest::new(page, size)).await?,
    }

    Ok(())
}

/// Connect to PostgreSQL using DATABASE_URL.
async fn connect_db() -> Result<Database> {
    let config = DatabaseConfig::from_env()?;
    Database::connect(&config)
        .await
        .context("Failed to connect to database")
}

async fn cmd_create_admin(db: &Database, email: String, password: String, name: String) -> Result<()> {
    let accounts = CrudService::new(UserAccounts::new(db.users()));
    let input = NewUser {
        email: email.clone(),
        password,
        full_name: name,
        phone: None,
    };

    let user = match accounts.create(input).await {
        Ok(user) => user,
        Err(AppError::Conflict(_)) => {
            tracing::info!(%email, "Account exists, promoting");
            find_user(db, &email).await?
        }
        Err(e) => return Err(e.into()),
    };

    db.user_roles().grant(user.id, ROLE_ADMIN).await?;
    let roles = db.users().role_names(user.id).await?;
    tracing::info!(user_id = user.id, ?roles, "Administrator ready");
    println!("{} ({})", user.email, roles.join(", "));
    Ok(())
}

async fn cmd_issue_token(db: &Database, keys: JwtKeys, email: &str) -> Result<()> {
    let user = find_user(db, email).await?;
    let session = AuthService::new(db.users(), keys).session_for(user).await?;
    tracing::info!(expires_in = session.expires_in, roles = ?session.roles, "Token issued");
    println!("{}", session.token);
    Ok(())
}

async fn cmd_products(db: &Database, page: PageRequest) -> Result<()> {
    let products = CrudService::new(db.products()).list(page).await?;
    println!("{}", serde_json::to_string_pretty(&products)?);
    Ok(())
}

async fn find_user(db: &Database, email: &str) -> Result<User> {
    db.users()
        .find_by_email(email)
        .await?
        .with_context(|| format!("No account with email {email}"))
}
