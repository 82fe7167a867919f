use std::error::Error;

use chrono::Duration;
use database::{DatabaseConnectionInfo, PgDatabase};
use platform::Client;
use web::{config::WebConfig, start_web_server, WebState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let config = WebConfig::from_env();

    // database
    let database_connection_info = DatabaseConnectionInfo::from_env()
        .ok_or("expected database connection info in env")?;
    let database = PgDatabase::connect(database_connection_info).await?;

    // platform
    let client = Client::new(database).with_session_ttl(Duration::hours(config.session_ttl_hours));
    if let Some(admin) = &config.admin {
        client
            .bootstrap_admin(&admin.email, &admin.password, &admin.full_name)
            .await?;
    }

    // web server
    start_web_server(WebState::new(client, config)).await?;

    Ok(())
}
