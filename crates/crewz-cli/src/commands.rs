use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::{error, warn};

use crewz_core::models::ProfileUpdate;
use crewz_core::{ApiClient, Config, SessionError, SessionStore, User};

use crate::Command;

pub async fn run(command: Command, config: &mut Config) -> Result<()> {
    let store = open_store(config)?;
    store.restore().await;

    match command {
        Command::Login { email } => {
            let email = match email {
                Some(email) => email,
                None => prompt_email(config.last_email.as_deref())?,
            };
            let password = rpassword::prompt_password("Password: ")?;

            let user = store.login(&email, &password).await.map_err(report)?;
            remember_email(config, email);
            println!("Logged in as {}", user.display_name());
        }
        Command::Register {
            username,
            email,
            full_name,
        } => {
            let password = rpassword::prompt_password("Password: ")?;
            let confirm = rpassword::prompt_password("Confirm password: ")?;
            if password != confirm {
                anyhow::bail!("Passwords do not match");
            }

            let user = store
                .register(&username, &email, &password, &full_name)
                .await
                .map_err(report)?;
            remember_email(config, email);
            println!("Welcome to the crew, {}", user.display_name());
        }
        Command::Logout => {
            let was_logged_in = store.is_authenticated();
            store.logout().await.map_err(report)?;
            if was_logged_in {
                println!("Logged out");
            } else {
                println!("Not logged in");
            }
        }
        Command::Whoami => match store.user() {
            Some(user) => print_user(&user)?,
            None => println!("Not logged in"),
        },
        Command::Profile { full_name, bio } => {
            let update = ProfileUpdate {
                full_name,
                bio,
                profile_image: None,
            };
            if update.is_empty() {
                anyhow::bail!("Nothing to update. Pass --full-name and/or --bio");
            }
            let user = store.update_profile(update).await.map_err(report)?;
            print_user(&user)?;
        }
        Command::Get { path } => {
            let body: serde_json::Value = store
                .client()
                .get(&path)
                .await
                .map_err(|e| report(e.into()))?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}

fn open_store(config: &Config) -> Result<SessionStore> {
    let api_url = config.api_url()?;
    let api = ApiClient::with_timeout(api_url, config.request_timeout())
        .context("Failed to create HTTP client")?;
    let storage = config.open_storage()?;
    Ok(SessionStore::new(api, storage))
}

/// Log the full error, hand the member the short version
fn report(e: SessionError) -> anyhow::Error {
    error!(error = ?e, "Session operation failed");
    anyhow::anyhow!(e.user_message())
}

fn remember_email(config: &mut Config, email: String) {
    config.last_email = Some(email.trim().to_string());
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }
}

fn prompt_email(last_email: Option<&str>) -> Result<String> {
    match last_email {
        Some(last) => print!("Email [{}]: ", last),
        None => print!("Email: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    Ok(match (input.is_empty(), last_email) {
        (true, Some(last)) => last.to_string(),
        _ => input.to_string(),
    })
}

fn print_user(user: &User) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(user)?);
    Ok(())
}
