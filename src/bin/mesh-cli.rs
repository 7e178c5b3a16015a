use clap::{Parser, Subcommand};
use rand::Rng;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "mesh-cli")]
#[command(about = "Operator CLI for mesh processes", long_about = None)]
struct Cli {
    /// Base URL of the process to talk to.
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the root status of a process
    Status,
    /// Inspect or modify counters on a counter service
    Counters {
        #[command(subcommand)]
        action: CounterAction,
    },
    /// Resolve a logical service name on a registry server
    Resolve {
        name: String,
    },
    /// List every registered instance on a registry server
    Services,
    /// Send item requests through a gateway
    Traffic {
        /// Number of rounds; each round requests one item from every path.
        count: u32,

        /// Gateway item paths to exercise.
        #[arg(long = "path", default_values_t = ["/gateway/m1/items".to_string(), "/gateway/m2/items".to_string()])]
        paths: Vec<String>,

        /// Print every response body.
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Subcommand)]
enum CounterAction {
    List,
    Get { key: String },
    Incr { key: String },
    Reset { key: String },
    ResetAll,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Status => {
            print_response(client.get(format!("{}/", base)).send().await?).await?;
        }
        Commands::Counters { action } => {
            let request = match action {
                CounterAction::List => client.get(format!("{}/counters", base)),
                CounterAction::Get { key } => client.get(format!("{}/counters/{}", base, key)),
                CounterAction::Incr { key } => client.post(format!("{}/counters/{}", base, key)),
                CounterAction::Reset { key } => client.delete(format!("{}/counters/{}", base, key)),
                CounterAction::ResetAll => client.delete(format!("{}/counters", base)),
            };
            print_response(request.send().await?).await?;
        }
        Commands::Resolve { name } => {
            let res = client
                .get(format!("{}/registry/services/{}", base, name))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Services => {
            print_response(client.get(format!("{}/registry/services", base)).send().await?).await?;
        }
        Commands::Traffic { count, paths, verbose } => {
            traffic(&client, base, count, &paths, verbose).await?;
        }
    }

    Ok(())
}

/// Request `{path}/{prefix}-{n}` for each path, with a short random pause
/// between requests. Every seventh round also asks for an item id that
/// needs escaping.
async fn traffic(
    client: &reqwest::Client,
    base: &str,
    count: u32,
    paths: &[String],
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut statuses: BTreeMap<u16, u32> = BTreeMap::new();

    for round in 0..count {
        for (i, path) in paths.iter().enumerate() {
            let mut ids = vec![format!("m{}-{}", i + 1, round)];
            if round % 7 == 0 {
                ids.push(format!("x%20y{}", i));
            }
            for id in ids {
                let res = client.get(format!("{}{}/{}", base, path, id)).send().await?;
                *statuses.entry(res.status().as_u16()).or_default() += 1;
                let body = res.text().await?;
                if verbose {
                    println!("{}", body);
                }
            }
            let pause = 10 + rand::thread_rng().gen_range(0..=100);
            tokio::time::sleep(Duration::from_millis(pause)).await;
        }
    }

    for (status, n) in statuses {
        println!("{}: {}", status, n);
    }
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let text = res.text().await?;
    if text.is_empty() {
        println!("{}", status);
        return Ok(());
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
