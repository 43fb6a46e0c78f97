//! Join a room and chat from the terminal.
//!
//! Demonstrates:
//! - Creating a RoomSession from a TransportConfig
//! - Registering a message listener
//! - Sending lines typed on stdin as chat messages
//! - Leaving the room on EOF or Ctrl+C
//!
//! Usage:
//!   cargo run --example join_room -- ABC123 Alice
//!   cargo run --example join_room -- ABC123 Alice --url ws://localhost:8080/ws/websocket
//!   cargo run --example join_room -- ABC123 Alice --debug

// ============================================================================
// Imports
// ============================================================================

use syncparty_chat::transport::DEFAULT_URL;
use syncparty_chat::{
    Error, Result, RoomSession, TransportConfig, generate_user_id, random_profile_image,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Args
// ============================================================================

#[derive(Debug, Clone)]
struct Args {
    room_code: String,
    username: String,
    url: String,
    debug: bool,
}

impl Args {
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().skip(1).collect();

        let url = args
            .iter()
            .position(|a| a == "--url")
            .and_then(|i| args.get(i + 1))
            .cloned()
            .unwrap_or_else(|| DEFAULT_URL.to_owned());

        let mut positional = args
            .iter()
            .enumerate()
            .filter(|(i, a)| !a.starts_with("--") && (*i == 0 || args[i - 1] != "--url"))
            .map(|(_, a)| a.clone());

        let room_code = positional
            .next()
            .ok_or_else(|| Error::config("usage: join_room <ROOM_CODE> <USERNAME> [--url URL]"))?;
        let username = positional.next().unwrap_or_else(|| "guest".to_owned());

        Ok(Self {
            room_code,
            username,
            url,
            debug: args.iter().any(|a| a == "--debug"),
        })
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "syncparty_chat=debug"
    } else {
        "syncparty_chat=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== Join Room ===\n");

    let session = RoomSession::from_config(TransportConfig::new(args.url.as_str()))?;
    let user_id = generate_user_id();
    let avatar = random_profile_image();

    println!("[Setup] Joining {} as {} ({avatar})...", args.room_code, args.username);
    session
        .initialize(&args.room_code, &user_id, &args.username)
        .await?;
    println!("        ✓ Joined. Type messages, Ctrl+D to leave.\n");

    let own_id = user_id.clone();
    let _listener = session.on_message(move |message| {
        let who = if message.user_id == own_id {
            "you"
        } else {
            message.user_name.as_str()
        };
        println!("[{}] {who}: {}", message.timestamp, message.message);
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let text = line.trim();
                if text.is_empty() {
                    continue;
                }
                if let Err(e) = session.send_message(text) {
                    eprintln!("[send failed] {e}");
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!("\n[Teardown] Leaving...");
    session.leave().await;
    println!("           ✓ Left {}", args.room_code);

    Ok(())
}
