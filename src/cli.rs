//! Command-line interface, parsed with clap.

use clap::{Parser, Subcommand};

/// Mercato - storefront account and catalog API
#[derive(Parser)]
#[command(name = "mercato")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API server (the default when no command is given)
    #[command(alias = "runserver")]
    Serve,

    /// Create a default config file
    #[command(alias = "--init")]
    Init,

    /// Create an administrator account
    #[command(alias = "createsuperuser")]
    CreateSuperuser {
        /// Email address, also the login identifier
        #[arg(long)]
        email: String,

        /// Password in plain text; hashed before it is stored
        #[arg(long)]
        password: String,

        /// Given name
        #[arg(long, default_value = "Admin")]
        first_name: String,

        /// Family name
        #[arg(long, default_value = "User")]
        last_name: String,
    },
}
