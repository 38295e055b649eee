//! Console Bot
//!
//! Runs the router against the terminal: every line typed becomes a message
//! from `--sender`, every reply is printed.
//!
//! ```bash
//! cargo run --package console-bot -- --public
//! cargo run --package console-bot -- --group 120363000000000001@g.us
//! ```
//!
//! Try `.menu`, `.ping`, `.whoami`, or `/join 4470@s.whatsapp.net` in a group,
//! then `.promote 4470` or `.kick 4470`.
//! `/quit` ends the session.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use switchyard::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "console-bot", about = "Drive a Switchyard bot from the terminal")]
struct Args {
    /// Configuration file (defaults to switchyard.toml in the working directory).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the module manifests.
    #[arg(short, long, default_value = "demos/console_bot/modules")]
    modules: PathBuf,

    /// Owner number; defaults to the sender so admin commands work.
    #[arg(long)]
    owner: Option<String>,

    /// Identifier typed lines are sent from.
    #[arg(long, default_value = "15550001@s.whatsapp.net")]
    sender: String,

    /// Simulate this group chat instead of a private chat.
    #[arg(long)]
    group: Option<String>,

    /// Answer everyone, not only owners.
    #[arg(long)]
    public: bool,
}

// ============================================================================
// Handlers
// ============================================================================

async fn whoami(ctx: CommandContext) -> anyhow::Result<()> {
    let message = &ctx.message;
    let text = format!(
        "👤 {} ({})\n💬 {}\n👑 owner: {}",
        message.push_name,
        message.number,
        message.chat,
        if message.is_creator { "yes" } else { "no" }
    );
    ctx.reply(text).await?;
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let owner = args
        .owner
        .clone()
        .unwrap_or_else(|| args.sender.split('@').next().unwrap_or_default().to_string());

    let catalog = HandlerCatalog::new();
    catalog.add_command("demo.whoami", command_fn(whoami));

    let mut builder = Runtime::builder()
        .catalog(catalog)
        .set("bot.modules_dir", &args.modules)
        .set("bot.owners", vec![owner]);
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if args.public {
        builder = builder.set("bot.mode", WorkMode::Public);
    }
    let runtime = builder.build()?;

    let mut console = ConsoleConfig::default().with_sender(args.sender);
    if let Some(group) = args.group {
        console = console.with_group(group);
    }

    info!(chat = %console.chat(), "Type a message, or /quit to leave");
    runtime.run(ConsoleConnector::stdio(console)).await?;
    Ok(())
}
