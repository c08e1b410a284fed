//! `stepowl` - line-driven front-end for the step quest game.
//!
//! Step-counter readings and player actions arrive as text commands on
//! stdin, one per line, so the game can be played from a terminal or fed by
//! a sensor bridge.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use stepowl_client::{ClientConfig, FileStore, Game, QuestCatalog, SyncClient};

#[derive(Parser)]
#[command(name = "stepowl")]
#[command(about = "Walk, finish quests, collect items")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sync server base URL
    #[arg(long)]
    server_url: Option<String>,

    /// Directory for save data
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Quest catalog TOML to use instead of the built-in pool
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Seed for quest selection (repeatable offers)
    #[arg(long)]
    seed: Option<u64>,

    /// Verbose logging (-v, -vv for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, PartialEq)]
enum Command {
    Steps(f64),
    Walk(f64),
    Status,
    Select(usize),
    Cancel,
    Claim,
    Force,
    Sync(String),
    Remote(String),
    Clear,
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else {
            return Ok(Command::Status);
        };
        let arg = parts.collect::<Vec<_>>().join(" ");

        let number = |what: &str| -> Result<f64, String> {
            arg.parse::<f64>()
                .ok()
                .filter(|n| n.is_finite() && *n >= 0.0)
                .ok_or_else(|| format!("{} needs a non-negative number", what))
        };

        match name.to_lowercase().as_str() {
            "steps" => number("steps").map(Command::Steps),
            "walk" => number("walk").map(Command::Walk),
            "status" | "s" => Ok(Command::Status),
            "select" => arg
                .parse::<usize>()
                .ok()
                .filter(|n| *n >= 1)
                .map(Command::Select)
                .ok_or_else(|| "select needs an offer number (1, 2, 3)".to_string()),
            "cancel" => Ok(Command::Cancel),
            "claim" => Ok(Command::Claim),
            "force" => Ok(Command::Force),
            "sync" => Ok(Command::Sync(arg)),
            "remote" => Ok(Command::Remote(arg)),
            "clear" => Ok(Command::Clear),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(format!("unknown command '{}' (try 'help')", other)),
        }
    }
}

const HELP: &str = "\
commands:
  steps <total>     step-counter reading since boot
  walk <n>          advance the step counter by n
  status            show steps, quests and inventory
  select <n>        accept offer n
  cancel            abandon the active quest
  claim             claim the completed quest's reward
  force             (debug) complete the active quest
  sync <playerId>   send the inventory to the server and clear it
  remote <playerId> show the server-side inventory
  clear             empty the local inventory
  quit";

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config_path = cli.config.clone().or_else(ClientConfig::default_path);
    let mut config = match config_path {
        Some(path) => ClientConfig::load(&path).unwrap_or_else(|e| {
            eprintln!("{}", e);
            std::process::exit(1);
        }),
        None => ClientConfig::default(),
    };
    if let Some(url) = cli.server_url {
        config.server_url = url;
    }
    if let Some(dir) = cli.save_dir {
        config.save_dir = Some(dir);
    }
    if let Some(catalog) = cli.catalog {
        config.catalog_path = Some(catalog);
    }

    let catalog = match &config.catalog_path {
        Some(path) => QuestCatalog::load_from_file(path),
        None => QuestCatalog::builtin(),
    };
    let catalog = match catalog {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => {
            eprintln!("Failed to load quest catalog: {}", e);
            std::process::exit(1);
        }
    };

    let save_dir = config.save_dir.clone().unwrap_or_else(FileStore::default_dir);
    log::info!("Saving to {:?}", save_dir);
    let store = Box::new(FileStore::new(save_dir));

    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut game = Game::new(catalog, store, rng);
    let client = SyncClient::new(&config.server_url, config.sync_timeout());

    println!("StepOwl - type 'help' for commands");
    print_status(&game);

    let mut pending_syncs: Vec<JoinHandle<()>> = Vec::new();
    let stdin = io::stdin();
    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("Failed to read input: {}", e);
                break;
            }
        }

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        if command == Command::Quit {
            break;
        }
        if let Some(handle) = run_command(&mut game, &client, command) {
            pending_syncs.push(handle);
        }
    }

    // Let in-flight syncs finish before the process exits
    for handle in pending_syncs {
        let _ = handle.join();
    }
}

fn run_command(game: &mut Game<StdRng>, client: &SyncClient, command: Command) -> Option<JoinHandle<()>> {
    let result = match command {
        Command::Steps(total) => {
            game.update_steps(total);
            Ok(())
        }
        Command::Walk(n) => {
            game.update_steps(game.current_sensor_steps() + n);
            Ok(())
        }
        Command::Help => {
            println!("{}", HELP);
            return None;
        }
        Command::Status | Command::Quit => Ok(()),
        Command::Select(n) => {
            let Some(id) = game.available_quests().get(n - 1).map(|q| q.id.clone()) else {
                println!("No offer number {}", n);
                return None;
            };
            game.select_quest(&id)
        }
        Command::Cancel => game.cancel_quest(),
        Command::Claim => game.claim_reward(),
        Command::Force => game.debug_force_complete(),
        Command::Clear => {
            game.clear_inventory();
            Ok(())
        }
        Command::Sync(player_id) => {
            let count = game.inventory().len();
            match game.sync_inventory(client, &player_id, |result| {
                if let Err(e) = result {
                    println!("\nSync failed: {}", e);
                }
            }) {
                Ok(handle) => {
                    println!("Sent {} item stacks for {}", count, player_id.trim());
                    return handle;
                }
                Err(e) => Err(e),
            }
        }
        Command::Remote(player_id) => {
            match client.fetch_inventory(player_id.trim()) {
                Ok(items) if items.is_empty() => println!("Nothing stored for {}", player_id.trim()),
                Ok(items) => {
                    for item in items {
                        println!("  item #{} x{}", item.item_id, item.quantity);
                    }
                }
                Err(e) => println!("Could not reach server: {}", e),
            }
            return None;
        }
    };

    match result {
        Ok(()) => print_status(game),
        Err(e) => println!("{}", e),
    }
    None
}

fn print_status(game: &Game<StdRng>) {
    match game.active_quest() {
        Some(quest) => {
            let state = if quest.is_completed { "done - claim it!" } else { "in progress" };
            println!(
                "Quest: {} [{}] {}/{} steps -> {} ({})",
                quest.description,
                quest.rarity,
                game.steps_in_quest().min(u64::from(quest.target_steps)),
                quest.target_steps,
                quest.reward_item.name,
                state
            );
        }
        None => {
            if game.inventory().is_full() {
                println!("Inventory full! Only stackable rewards can be accepted.");
            }
            println!("Offers:");
            for (i, quest) in game.available_quests().iter().enumerate() {
                let marker = if game.can_accept(quest) { "" } else { " (no room)" };
                println!(
                    "  {}. {} [{}] {} steps -> {}{}",
                    i + 1,
                    quest.description,
                    quest.rarity,
                    quest.target_steps,
                    quest.reward_item.name,
                    marker
                );
            }
        }
    }

    let inventory = game.inventory();
    println!(
        "Inventory ({}/{}):",
        inventory.len(),
        stepowl_client::game::INVENTORY_CAPACITY
    );
    for item in inventory.items() {
        println!("  {} x{} [{}]", item.name, item.quantity, item.rarity);
    }
}
