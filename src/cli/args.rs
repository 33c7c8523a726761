//! CLI argument definitions.
//!
//! Uses clap derive macros for type-safe argument parsing.

use clap::{Parser, Subcommand};

/// Back office server and maintenance commands
#[derive(Parser, Debug)]
#[command(name = "backoffice")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve(ServeArgs),

    /// Run database migrations
    Migrate(MigrateArgs),

    /// Create the permission catalogue, roles, an admin account and default menus
    Seed(SeedArgs),
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "SERVER_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "3000", env = "SERVER_PORT")]
    pub port: u16,
}

/// Arguments for the migrate command
#[derive(Parser, Debug)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub action: MigrateAction,
}

/// Migration actions
#[derive(Subcommand, Debug)]
pub enum MigrateAction {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset and re-run all migrations
    Fresh,
}

/// Arguments for the seed command
#[derive(Parser, Debug)]
pub struct SeedArgs {
    /// Email of the administrator account
    #[arg(long, default_value = "admin@example.com", env = "ADMIN_EMAIL")]
    pub admin_email: String,

    /// Password of the administrator account
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_with_port() {
        let cli = Cli::try_parse_from(["backoffice", "serve", "--port", "8080"]).unwrap();
        match cli.command {
            Commands::Serve(args) => assert_eq!(args.port, 8080),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_migrate_fresh_verbose() {
        let cli = Cli::try_parse_from(["backoffice", "-v", "migrate", "fresh"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Migrate(MigrateArgs {
                action: MigrateAction::Fresh
            })
        ));
    }

    #[test]
    fn test_parse_seed_arguments() {
        let cli = Cli::try_parse_from([
            "backoffice",
            "seed",
            "--admin-email",
            "root@example.com",
            "--admin-password",
            "secret-password",
        ])
        .unwrap();
        match cli.command {
            Commands::Seed(args) => {
                assert_eq!(args.admin_email, "root@example.com");
                assert_eq!(args.admin_password, "secret-password");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
