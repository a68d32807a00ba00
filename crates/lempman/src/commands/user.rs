//! Offline user management against the console database

use anyhow::{bail, Context, Result};
use dialoguer::Password;
use lempman_core::{validate_username, Role, Settings, User, DEFAULT_ADMIN_USERNAME};
use lempman_web::auth::hash_password;

use crate::cli::{UserArgs, UserCommand};
use crate::output::{print_success, print_users};

pub async fn execute(settings: Settings, args: UserArgs) -> Result<()> {
    match args.command {
        UserCommand::List => list(&settings).await,
        UserCommand::Add {
            username,
            role,
            password,
        } => add(&settings, &username, role, password).await,
        UserCommand::Passwd { username, password } => passwd(&settings, &username, password).await,
        UserCommand::Delete { username } => delete(&settings, &username).await,
    }
}

/// Use the given password or prompt for one with confirmation
fn password_or_prompt(password: Option<String>, username: &str) -> Result<String> {
    let password = match password {
        Some(p) => p,
        None => Password::new()
            .with_prompt(format!("Password for {}", username))
            .with_confirmation("Repeat password", "Passwords do not match")
            .interact()
            .context("Failed to read password")?,
    };

    if password.is_empty() {
        bail!("Password must not be empty");
    }
    Ok(password)
}

async fn list(settings: &Settings) -> Result<()> {
    let db = super::open_db(settings).await?;
    let users = db.users().list().await?;
    print_users(&users);
    Ok(())
}

async fn add(settings: &Settings, username: &str, role: Role, password: Option<String>) -> Result<()> {
    if !validate_username(username) {
        bail!("Invalid username: {}", username);
    }

    let db = super::open_db(settings).await?;
    let users = db.users();
    if users.get(username).await?.is_some() {
        bail!("User {} already exists", username);
    }

    let password = password_or_prompt(password, username)?;
    let hash = hash_password(&password, settings.bcrypt_cost).await?;
    users.insert(&User::new(username, hash, role)).await?;

    print_success(&format!("Added {} user {}", role, username));
    Ok(())
}

async fn passwd(settings: &Settings, username: &str, password: Option<String>) -> Result<()> {
    let db = super::open_db(settings).await?;
    let users = db.users();
    if users.get(username).await?.is_none() {
        bail!("User {} not found", username);
    }

    let password = password_or_prompt(password, username)?;
    let hash = hash_password(&password, settings.bcrypt_cost).await?;
    users.update_password(username, &hash).await?;

    print_success(&format!("Password updated for {}", username));
    Ok(())
}

async fn delete(settings: &Settings, username: &str) -> Result<()> {
    if username == DEFAULT_ADMIN_USERNAME {
        bail!("The default admin {} cannot be deleted", DEFAULT_ADMIN_USERNAME);
    }

    let db = super::open_db(settings).await?;
    if !db.users().delete(username).await? {
        bail!("User {} not found", username);
    }

    print_success(&format!("Deleted user {}", username));
    Ok(())
}
