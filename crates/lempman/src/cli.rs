//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use lempman_core::Role;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lempman")]
#[command(version, about = "Admin console for LEMP/Magento hosts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Settings file (default: <config dir>/lempman.toml)
    #[arg(long, global = true, env = "LEMPMAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format instead of tables
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web console
    Serve(ServeArgs),

    /// Manage console users
    User(UserArgs),

    /// Configure notifications (Telegram)
    Notify(NotifyArgs),

    /// Show host and service status
    Status,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on (overrides settings)
    #[arg(long)]
    pub bind: Option<String>,

    /// Also write logs to daily rotated files in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Do not poll services in the background
    #[arg(long)]
    pub no_watch: bool,
}

#[derive(Args)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand)]
pub enum UserCommand {
    /// List users
    List,

    /// Add a user
    Add {
        username: String,

        /// admin or user
        #[arg(long, default_value = "user", value_parser = parse_role)]
        role: Role,

        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Set a user's password
    Passwd {
        username: String,

        /// New password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Delete a user
    Delete { username: String },
}

#[derive(Args)]
pub struct NotifyArgs {
    #[command(subcommand)]
    pub command: NotifyCommand,
}

#[derive(Subcommand)]
pub enum NotifyCommand {
    /// Configure Telegram notifications
    Telegram {
        /// Bot token from @BotFather
        #[arg(long)]
        token: String,

        /// Chat ID to send messages to
        #[arg(long)]
        chat: String,

        /// Store the credentials but do not send anything
        #[arg(long)]
        disable: bool,
    },

    /// Show current notification configuration
    Status,

    /// Send a test message
    Test,
}

fn parse_role(s: &str) -> Result<Role, String> {
    s.parse().map_err(|e: lempman_core::Error| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_user_add() {
        let cli = Cli::parse_from(["lempman", "user", "add", "alice", "--role", "admin", "--password", "pw"]);
        match cli.command {
            Commands::User(UserArgs {
                command: UserCommand::Add { username, role, password },
            }) => {
                assert_eq!(username, "alice");
                assert_eq!(role, Role::Admin);
                assert_eq!(password.as_deref(), Some("pw"));
            }
            _ => panic!("expected user add"),
        }
    }

    #[test]
    fn test_unknown_role_rejected() {
        assert!(Cli::try_parse_from(["lempman", "user", "add", "bob", "--role", "root"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["lempman", "status", "--json", "-vv"]);
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
    }
}
