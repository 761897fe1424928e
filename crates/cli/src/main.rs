//! Waitline CLI - Command-line interface for the Waitline queue service

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9640";

#[derive(Parser)]
#[command(name = "waitline")]
#[command(about = "Waitline walk-in queue CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "WAITLINE_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a new queue
    Create {
        /// Queue name
        name: String,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        location: Option<String>,

        /// Estimated minutes per person
        #[arg(short, long)]
        time_per_person: Option<u32>,
    },

    /// Join a queue
    Join {
        queue_id: String,

        /// Display name
        name: String,

        #[arg(short, long)]
        contact: Option<String>,

        /// Idempotency key; retrying with the same key never joins twice
        #[arg(long)]
        join_key: Option<String>,
    },

    /// Show a queue and everyone waiting
    Show { queue_id: String },

    /// Call the next person (host)
    Next {
        queue_id: String,

        #[arg(long, env = "WAITLINE_HOST_TOKEN")]
        host_token: Option<String>,
    },

    /// Remove a person from a queue (host)
    Remove {
        queue_id: String,
        person_id: String,

        #[arg(long, env = "WAITLINE_HOST_TOKEN")]
        host_token: Option<String>,
    },

    /// Leave a queue
    Leave { queue_id: String, person_id: String },

    /// End a queue (host)
    End {
        queue_id: String,

        #[arg(long, env = "WAITLINE_HOST_TOKEN")]
        host_token: Option<String>,
    },
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Deserialize)]
struct Person {
    id: String,
    name: String,
    #[serde(default)]
    contact_info: Option<String>,
}

#[derive(Deserialize)]
struct WaitingPerson {
    position: usize,
    #[serde(default)]
    estimated_wait_minutes: Option<u64>,
    #[serde(flatten)]
    person: Person,
}

#[derive(Deserialize)]
struct QueueView {
    id: String,
    name: String,
    description: String,
    location: String,
    is_active: bool,
    people: Vec<WaitingPerson>,
}

#[derive(Tabled)]
struct WaitingRow {
    #[tabled(rename = "#")]
    position: usize,
    name: String,
    contact: String,
    wait: String,
    person_id: String,
}

impl From<WaitingPerson> for WaitingRow {
    fn from(entry: WaitingPerson) -> Self {
        Self {
            position: entry.position,
            name: entry.person.name,
            contact: entry.person.contact_info.unwrap_or_else(|| "-".to_string()),
            wait: entry
                .estimated_wait_minutes
                .map(|m| format!("~{} min", m))
                .unwrap_or_else(|| "-".to_string()),
            person_id: entry.person.id,
        }
    }
}

async fn call_rpc(url: &str, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

/// Host token from a queue.create.v1 result; a queue without one is unusable
fn host_token_of(result: &serde_json::Value) -> Result<String> {
    match result["host_token"].as_str() {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => anyhow::bail!("Daemon returned no host token"),
    }
}

fn print_queue(queue: QueueView) {
    let status = if queue.is_active {
        "ACTIVE".green()
    } else {
        "ENDED".red()
    };

    println!("{} {} [{}]", queue.name.cyan().bold(), queue.id.dimmed(), status);
    if !queue.description.is_empty() {
        println!("  {}", queue.description);
    }
    if !queue.location.is_empty() {
        println!("  {} {}", "Location:".bold(), queue.location);
    }
    println!();

    if queue.people.is_empty() {
        println!("{}", "Nobody is waiting".yellow());
        return;
    }

    let rows: Vec<WaitingRow> = queue.people.into_iter().map(WaitingRow::from).collect();
    println!("{}", Table::new(rows));
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Create {
            name,
            description,
            location,
            time_per_person,
        } => {
            let params = json!({
                "name": name,
                "description": description,
                "location": location,
                "time_per_person": time_per_person,
            });

            let result = call_rpc(&cli.rpc_url, "queue.create.v1", params).await?;
            let host_token = host_token_of(&result)?;
            let queue: QueueView = serde_json::from_value(result["queue"].clone())?;

            println!("{}", "✓ Queue created".green().bold());
            println!("  {} {}", "Queue ID:".bold(), queue.id);
            println!("  {} {}", "Host token:".bold(), host_token);
            println!();
            println!(
                "  {}",
                "Keep the host token; export it as WAITLINE_HOST_TOKEN for next/remove/end"
                    .dimmed()
            );
        }

        Commands::Join {
            queue_id,
            name,
            contact,
            join_key,
        } => {
            let params = json!({
                "queue_id": queue_id,
                "name": name,
                "contact_info": contact,
                "join_key": join_key,
            });

            let result = call_rpc(&cli.rpc_url, "queue.join.v1", params).await?;
            let person: Person = serde_json::from_value(result["person"].clone())?;

            println!(
                "{}",
                format!("✓ {} joined at position {}", person.name, result["position"])
                    .green()
                    .bold()
            );
            println!("  {} {}", "Person ID:".bold(), person.id);
        }

        Commands::Show { queue_id } => {
            let result = call_rpc(&cli.rpc_url, "queue.get.v1", json!({ "queue_id": queue_id }))
                .await?;
            let queue: QueueView = serde_json::from_value(result)?;
            print_queue(queue);
        }

        Commands::Next {
            queue_id,
            host_token,
        } => {
            let params = json!({ "queue_id": queue_id, "host_token": host_token });
            let result = call_rpc(&cli.rpc_url, "queue.call_next.v1", params).await?;

            if result["status"] == "called" {
                let person: Person = serde_json::from_value(result["person"].clone())?;
                println!("{}", format!("▶ Now serving {}", person.name).green().bold());
                if let Some(contact) = person.contact_info {
                    println!("  {} {}", "Contact:".bold(), contact);
                }
            } else {
                println!("{}", "Queue is empty".yellow());
            }
        }

        Commands::Remove {
            queue_id,
            person_id,
            host_token,
        } => {
            let params = json!({
                "queue_id": queue_id,
                "person_id": person_id,
                "host_token": host_token,
            });
            let result = call_rpc(&cli.rpc_url, "queue.remove_person.v1", params).await?;

            if result["removed"].as_bool().unwrap_or(false) {
                println!("{}", format!("✓ Removed {}", person_id).green().bold());
            } else {
                println!("{}", format!("○ {} was not waiting", person_id).yellow());
            }
        }

        Commands::Leave {
            queue_id,
            person_id,
        } => {
            let params = json!({ "queue_id": queue_id, "person_id": person_id });
            let result = call_rpc(&cli.rpc_url, "queue.leave.v1", params).await?;

            if result["removed"].as_bool().unwrap_or(false) {
                println!("{}", "✓ Left the queue".green().bold());
            } else {
                println!("{}", "○ Already out of the queue".yellow());
            }
        }

        Commands::End {
            queue_id,
            host_token,
        } => {
            let params = json!({ "queue_id": queue_id, "host_token": host_token });
            let result = call_rpc(&cli.rpc_url, "queue.end.v1", params).await?;
            let queue: QueueView = serde_json::from_value(result["queue"].clone())?;

            println!("{}", format!("✓ Queue {} ended", queue.id).green().bold());
            println!();
            print_queue(queue);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_token_is_required() {
        let ok = json!({ "host_token": "secret", "queue": {} });
        assert_eq!(host_token_of(&ok).unwrap(), "secret");

        assert!(host_token_of(&json!({ "queue": {} })).is_err());
        assert!(host_token_of(&json!({ "host_token": "" })).is_err());
        assert!(host_token_of(&json!({ "host_token": 7 })).is_err());
    }
}
