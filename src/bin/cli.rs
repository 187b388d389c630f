//! kvgate CLI Client
//!
//! Command-line interface for interacting with a kvgate server.

use std::io::Write;
use std::process;

use clap::{Parser, Subcommand};
use kvgate::network::Client;
use kvgate::GateError;

/// kvgate CLI
#[derive(Parser, Debug)]
#[command(name = "kvgate-cli")]
#[command(about = "CLI for the kvgate key-value server")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    #[command(alias = "del")]
    Delete {
        /// The key to delete
        key: String,
    },

    /// Ping the server
    Ping,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), GateError> {
    let mut client = Client::connect(&args.server)?;

    match args.command {
        Commands::Get { key } => match client.get(key.as_bytes())? {
            Some(value) => {
                let mut stdout = std::io::stdout();
                stdout.write_all(&value)?;
                stdout.write_all(b"\n")?;
            }
            None => println!("Key not found"),
        },
        Commands::Set { key, value } => {
            client.set(key.as_bytes(), value.as_bytes())?;
            println!("OK");
        }
        Commands::Delete { key } => {
            client.delete(key.as_bytes())?;
            println!("OK");
        }
        Commands::Ping => {
            client.ping()?;
            println!("PONG");
        }
    }

    Ok(())
}
