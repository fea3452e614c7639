use dotenvy::dotenv;
use settle_buddy::{
    bot, config,
    errors::{Error, Result},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also come from the environment
    dotenv().ok();

    // 3. Ledger settings and admin identity
    let settings = config::settings::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {e}"))?;
    info!(policy = ?settings.ledger.split_policy, "Loaded ledger settings");

    let admin_id = config::admin::get_admin_id()
        .inspect_err(|e| error!("ADMIN_DISCORD_ID is not usable: {e}"))?;

    let dev_guild_id = match std::env::var("DEV_GUILD_ID") {
        Ok(raw) => Some(raw.trim().parse::<u64>().map_err(|_| Error::Config {
            message: format!("DEV_GUILD_ID must be a Discord guild ID, got '{raw}'"),
        })?),
        Err(_) => None,
    };

    // 4. Database
    let database = config::database::create_connection()
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {e}"))?;

    // 5. Run the bot
    let token = std::env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {e}"))?;

    bot::run_bot(
        token,
        database,
        admin_id,
        settings.ledger.split_policy,
        dev_guild_id,
    )
    .await
}
