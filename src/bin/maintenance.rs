use std::env;

use anyhow::{anyhow, bail, Context, Result};
use diesel::prelude::*;
use uuid::Uuid;

use outreach::{
    auth::jwt::JwtService,
    config::AppConfig,
    db,
    models::{Campaign, NewUser, User},
    queries,
    schema::{campaigns, users},
    stats,
};

const USAGE: &str = "Usage:
  maintenance create-user <name> <email>
  maintenance issue-token <user-id>
  maintenance campaign-stats <user-id>";

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        ["create-user", name, email] => create_user(name, email),
        ["issue-token", user_id] => issue_token(user_id),
        ["campaign-stats", user_id] => campaign_stats(user_id),
        [cmd, ..] => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
        [] => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }
}

fn connect(config: &AppConfig) -> Result<db::PgPool> {
    tracing::info!(
        component = "maintenance",
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        "loaded backend configuration"
    );
    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
    let mut conn = pool
        .get()
        .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
    db::run_migrations(&mut conn)?;
    Ok(pool)
}

fn parse_user_id(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).with_context(|| format!("invalid user id: {value}"))
}

fn create_user(name: &str, email: &str) -> Result<()> {
    let name = name.trim();
    let email = email.trim();
    if name.is_empty() || email.is_empty() {
        bail!("name and email must not be empty");
    }

    let config = AppConfig::from_env()?;
    let pool = connect(&config)?;
    let mut conn = pool
        .get()
        .map_err(|err| anyhow!("failed to get database connection: {err}"))?;

    let user = NewUser {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: email.to_string(),
    };
    diesel::insert_into(users::table)
        .values(&user)
        .execute(&mut conn)
        .context("failed to insert user")?;

    println!("{}", user.id);
    Ok(())
}

fn issue_token(user_id: &str) -> Result<()> {
    let user_id = parse_user_id(user_id)?;
    let config = AppConfig::from_env()?;
    let pool = connect(&config)?;
    let mut conn = pool
        .get()
        .map_err(|err| anyhow!("failed to get database connection: {err}"))?;

    let user: User = users::table
        .find(user_id)
        .first(&mut conn)
        .optional()
        .context("failed to load user")?
        .ok_or_else(|| anyhow!("user {user_id} not found"))?;

    let jwt = JwtService::from_config(&config)?;
    let token = jwt.generate_token(user.id, &user.name, &user.email)?;
    println!("{token}");
    Ok(())
}

fn campaign_stats(user_id: &str) -> Result<()> {
    let user_id = parse_user_id(user_id)?;
    let config = AppConfig::from_env()?;
    let pool = connect(&config)?;
    let mut conn = pool
        .get()
        .map_err(|err| anyhow!("failed to get database connection: {err}"))?;

    let owned: Vec<Campaign> = campaigns::table
        .filter(campaigns::user_id.eq(user_id))
        .order(campaigns::created_at.desc())
        .load(&mut conn)
        .context("failed to load campaigns")?;

    if owned.is_empty() {
        println!("No campaigns found.");
        return Ok(());
    }

    let by_campaign = queries::campaign_stats_for_user(&mut conn, user_id)
        .map_err(|err| anyhow!("failed to compute statistics: {err}"))?;

    for campaign in &owned {
        let campaign_stats = by_campaign.get(&campaign.id).copied().unwrap_or_default();
        println!(
            "{}\t{}\tleads={}\tsent={}\taccepted={}\tacceptance={:.1}%\treply={:.1}%",
            campaign.id,
            campaign.name,
            campaign_stats.total_leads,
            campaign_stats.requests.sent,
            campaign_stats.requests.accepted,
            campaign_stats.acceptance_rate(),
            campaign_stats.reply_rate(),
        );
    }

    let total = stats::totals(by_campaign.values());
    println!(
        "total\tleads={}\tacceptance={:.1}%\treply={:.1}%",
        total.total_leads,
        total.acceptance_rate(),
        total.reply_rate(),
    );
    Ok(())
}
