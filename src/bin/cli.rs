//! PipeKV CLI Client
//!
//! Interactive client: connects through the server's registration pipe,
//! reads commands from stdin, and prints pushed notifications as
//! `(key,value)` lines from a background thread.
//!
//! Commands: `SUBSCRIBE <key>`, `UNSUBSCRIBE <key>`, `DELAY <ms>`,
//! `DISCONNECT`, `HELP`.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use pipekv::Client;
use tracing_subscriber::{fmt, EnvFilter};

/// PipeKV CLI
#[derive(Parser, Debug)]
#[command(name = "pipekv-cli")]
#[command(about = "Interactive client for the PipeKV server")]
#[command(version)]
struct Args {
    /// Unique client id; names this client's pipes
    id: String,

    /// Path of the server's registration pipe
    register_pipe_path: PathBuf,

    /// Directory the client's pipes are created in
    #[arg(long, default_value = "/tmp")]
    pipe_dir: PathBuf,
}

fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,pipekv=info"));
    fmt().with_env_filter(filter).init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let request_path = args.pipe_dir.join(format!("req_{}", args.id));
    let response_path = args.pipe_dir.join(format!("resp_{}", args.id));
    let notification_path = args.pipe_dir.join(format!("notif_{}", args.id));

    let mut client = match Client::connect(
        &args.register_pipe_path,
        &request_path,
        &response_path,
        &notification_path,
    ) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to connect to the server: {}", e);
            std::process::exit(1);
        }
    };

    // Notification printer
    let notifications = match client.notifications() {
        Ok(receiver) => receiver,
        Err(e) => {
            eprintln!("Failed to start notification reader: {}", e);
            std::process::exit(1);
        }
    };
    thread::spawn(move || {
        for notification in notifications {
            println!("({},{})", notification.key, notification.value);
        }
    });

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("Failed to read command: {}", e);
                break;
            }
        };

        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (None, _) => continue,

            (Some("SUBSCRIBE"), Some(key)) => match client.subscribe(key) {
                Ok(true) => println!("Subscribed to '{}'", key),
                Ok(false) => println!("Subscribe rejected: '{}' does not exist", key),
                Err(e) => {
                    eprintln!("Command subscribe failed: {}", e);
                    break;
                }
            },

            (Some("UNSUBSCRIBE"), Some(key)) => match client.unsubscribe(key) {
                Ok(true) => println!("Unsubscribed from '{}'", key),
                Ok(false) => println!("'{}' was not subscribed", key),
                Err(e) => {
                    eprintln!("Command unsubscribe failed: {}", e);
                    break;
                }
            },

            (Some("DELAY"), Some(ms)) => match ms.parse::<u64>() {
                Ok(ms) => {
                    println!("Waiting...");
                    thread::sleep(Duration::from_millis(ms));
                }
                Err(_) => eprintln!("Invalid command. See HELP for usage"),
            },

            (Some("DISCONNECT"), None) => {
                match client.disconnect() {
                    Ok(()) => println!("Disconnected from server"),
                    Err(e) => {
                        eprintln!("Failed to disconnect from the server: {}", e);
                        std::process::exit(1);
                    }
                }
                return;
            }

            (Some("HELP"), None) => print_help(),

            _ => eprintln!("Invalid command. See HELP for usage"),
        }
    }

    // stdin closed without an explicit DISCONNECT; leave politely anyway.
    if let Err(e) = client.disconnect() {
        eprintln!("Failed to disconnect from the server: {}", e);
        std::process::exit(1);
    }
}

fn print_help() {
    println!(
        "Available commands:\n\
         \x20 SUBSCRIBE <key>\n\
         \x20 UNSUBSCRIBE <key>\n\
         \x20 DELAY <ms>\n\
         \x20 DISCONNECT\n\
         \x20 HELP"
    );
}
