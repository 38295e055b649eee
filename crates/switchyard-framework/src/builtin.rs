//! Built-in native handlers.
//!
//! Enabled by the `builtin` feature (on by default). Manifests refer to them
//! by name:
//!
//! | Name | Kind | Description |
//! |------|------|-------------|
//! | `core.menu` | command | Menu built from the registry |
//! | `core.alive` | command | Alive message; owners can read or replace the template |
//! | `core.ping` | command | Round-trip latency |
//! | `core.stats` | command | Registry counts and uptime |
//! | `core.logger` | event | Logs incoming text |
//! | `admin.modules` | command | Lists loaded units |
//! | `admin.reload` | command | Reloads one unit |
//! | `admin.ban` / `admin.unban` | command | Ban list for a chat |
//! | `admin.shutoff` | command | Sets the global shut-off flag |
//! | `admin.toggle` | command | Enables or disables a command |
//! | `admin.setcmd` / `admin.delcmd` / `admin.getcmd` | command | Sticker bindings |
//! | `group.promote` / `group.demote` | command | Grants or takes group admin |
//! | `group.kick` / `group.add` | command | Removes or adds a member; `add` falls back to an invite |
//! | `group.mute` / `group.unmute` | command | Announce mode on or off |
//! | `group.gname` / `group.gdesc` | command | Group subject and description |
//! | `group.invite` / `group.revoke` | command | Shows or resets the invite link |
//!
//! The `group.*` commands act on the current group through the transport. The
//! sender must be a group admin or an owner, and when the command sets
//! `only_admin` the bot must be an admin too. Targets come from mentions, then
//! the quoted message's author, then a number in the arguments.
//!
//! ```rust,ignore
//! let catalog = HandlerCatalog::new();
//! switchyard_framework::builtin::register_builtins(&catalog);
//! ```

use std::sync::LazyLock;
use std::time::Instant;

use regex::Regex;
use tracing::{info, warn};

use switchyard_core::jid;
use switchyard_core::{
    MediaSource, OutgoingContent, OutgoingMessage, ParticipantAction, ParticipantResult,
    ParticipantStatus, Payload, TransportResult,
};

use crate::catalog::HandlerCatalog;
use crate::context::{AdminCheck, CommandContext, EventContext};
use crate::handler::{command_fn, event_fn};
use crate::template::format_uptime;

/// Longest body excerpt written by `core.logger`.
const LOG_EXCERPT_CHARS: usize = 50;

const INVITE_LINK_BASE: &str = "https://chat.whatsapp.com/";

static MENU_IMAGE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)https?://[^\s;,|]+\.(?:jpg|jpeg|png|gif)").ok());

/// Registers every built-in handler.
pub fn register_builtins(catalog: &HandlerCatalog) {
    catalog
        .add_command("core.menu", command_fn(menu))
        .add_command("core.alive", command_fn(alive))
        .add_command("core.ping", command_fn(ping))
        .add_command("core.stats", command_fn(stats))
        .add_command("admin.modules", command_fn(modules))
        .add_command("admin.reload", command_fn(reload))
        .add_command("admin.ban", command_fn(ban))
        .add_command("admin.unban", command_fn(unban))
        .add_command("admin.shutoff", command_fn(shutoff))
        .add_command("admin.toggle", command_fn(toggle))
        .add_command("admin.setcmd", command_fn(setcmd))
        .add_command("admin.delcmd", command_fn(delcmd))
        .add_command("admin.getcmd", command_fn(getcmd))
        .add_command("group.promote", command_fn(promote))
        .add_command("group.demote", command_fn(demote))
        .add_command("group.kick", command_fn(kick))
        .add_command("group.add", command_fn(add))
        .add_command("group.mute", command_fn(mute))
        .add_command("group.unmute", command_fn(unmute))
        .add_command("group.gname", command_fn(gname))
        .add_command("group.gdesc", command_fn(gdesc))
        .add_command("group.invite", command_fn(invite))
        .add_command("group.revoke", command_fn(revoke))
        .add_event("core.logger", event_fn(logger));
}

// =============================================================================
// Core
// =============================================================================

async fn menu(ctx: CommandContext) -> anyhow::Result<()> {
    let settings = ctx.settings();
    let text = ctx.control().menu().render(&settings.info, &settings.version);

    let image = MENU_IMAGE
        .as_ref()
        .and_then(|re| re.find(&settings.info))
        .map(|m| m.as_str().to_string());

    match image {
        Some(url) => {
            ctx.send(OutgoingMessage::new(OutgoingContent::Image {
                source: MediaSource::Url(url),
                caption: Some(text),
            }))
            .await?;
        }
        None => {
            ctx.send(text).await?;
        }
    }
    Ok(())
}

async fn alive(ctx: CommandContext) -> anyhow::Result<()> {
    let state = ctx.state();
    let args = ctx.args.trim();

    if ctx.message.is_creator && args.eq_ignore_ascii_case("get") {
        ctx.send(state.alive_text().await?).await?;
        return Ok(());
    }
    if ctx.message.is_creator && !args.is_empty() {
        state.set_alive_text(args).await?;
        ctx.send("*✅ Alive message updated successfully*").await?;
        return Ok(());
    }

    let template = state.alive_text().await?;
    ctx.send_template(&template).await?;
    Ok(())
}

async fn ping(ctx: CommandContext) -> anyhow::Result<()> {
    let start = Instant::now();
    let key = ctx.send("🏓 Pinging...").await?;
    let elapsed = start.elapsed().as_millis();
    ctx.message
        .actions()
        .edit_sent(&key, &format!("🏓 *Pong!*\n⚡ *Response Time:* {elapsed}ms"))
        .await?;
    Ok(())
}

async fn stats(ctx: CommandContext) -> anyhow::Result<()> {
    let stats = ctx.control().stats();
    let text = format!(
        "*📊 Switchyard Statistics*\n\n\
         *🔧 Modules:* {}\n\
         *⚡ Commands:* {}\n\
         *📡 Events:* {}\n\
         *📂 Categories:* {}\n\
         *⏱️ Uptime:* {}\n\
         *🤖 Platform:* {}",
        stats.modules,
        stats.commands,
        stats.events,
        stats.categories,
        format_uptime(ctx.services.started.elapsed()),
        std::env::consts::OS,
    );
    ctx.send(text).await?;
    Ok(())
}

async fn logger(ctx: EventContext) -> anyhow::Result<()> {
    if let Some(message) = ctx.message()
        && !message.from_me
        && !message.body.is_empty()
    {
        let mut excerpt: String = message.body.chars().take(LOG_EXCERPT_CHARS).collect();
        if message.body.chars().count() > LOG_EXCERPT_CHARS {
            excerpt.push_str("...");
        }
        info!(chat = %message.chat, "{}: {}", message.push_name, excerpt);
    }
    Ok(())
}

// =============================================================================
// Admin
// =============================================================================

async fn modules(ctx: CommandContext) -> anyhow::Result<()> {
    let units = ctx.control().list_units();
    let mut text = format!("*📦 Switchyard Modules ({})*\n\n", units.len());
    for (index, unit) in units.iter().enumerate() {
        text.push_str(&format!("*{}.* `{}` ({})\n", index + 1, unit.name, unit.id));
        if !unit.description.is_empty() {
            text.push_str(&format!("   📝 {}\n", unit.description));
        }
        text.push_str(&format!(
            "   📂 Category: {}\n",
            unit.category.as_deref().unwrap_or("none")
        ));
        text.push_str(&format!("   ⚡ Commands: {}\n", unit.command_count));
        if !unit.version.is_empty() {
            text.push_str(&format!("   🔢 Version: {}\n", unit.version));
        }
        text.push('\n');
    }
    ctx.send(text).await?;
    Ok(())
}

async fn reload(ctx: CommandContext) -> anyhow::Result<()> {
    let id = ctx.args.trim();
    if id.is_empty() {
        ctx.send("🔄 *Provide module ID to reload*\nUse `modules` to see available modules")
            .await?;
        return Ok(());
    }

    let text = match ctx.control().reload_unit(id).await {
        Ok(report) => format!(
            "✅ *Module '{}' reloaded successfully* ({} commands, {} events)",
            report.id, report.commands, report.events
        ),
        Err(e) => format!("❌ *Failed to reload module '{id}': {e}*"),
    };
    ctx.send(text).await?;
    Ok(())
}

/// The chat named in the arguments, or the current one.
fn target_chat(ctx: &CommandContext) -> String {
    ctx.args
        .split_whitespace()
        .next()
        .map(str::to_string)
        .unwrap_or_else(|| ctx.message.chat.clone())
}

async fn ban(ctx: CommandContext) -> anyhow::Result<()> {
    let chat = target_chat(&ctx);
    let text = if ctx.state().ban(&chat).await? {
        "🚫 *Bot banned in this chat*"
    } else {
        "❌ *Bot already banned in this chat*"
    };
    ctx.send(text).await?;
    Ok(())
}

async fn unban(ctx: CommandContext) -> anyhow::Result<()> {
    let chat = target_chat(&ctx);
    let text = if ctx.state().unban(&chat).await? {
        "✅ *Bot unbanned in this chat*"
    } else {
        "ℹ️ *Bot not banned in this chat*"
    };
    ctx.send(text).await?;
    Ok(())
}

async fn shutoff(ctx: CommandContext) -> anyhow::Result<()> {
    ctx.state().set_shut_off(true).await?;
    ctx.send("💤 *Bot shut off*").await?;
    Ok(())
}

async fn toggle(ctx: CommandContext) -> anyhow::Result<()> {
    let mut words = ctx.args.split_whitespace();
    let (Some(name), Some(switch)) = (words.next(), words.next()) else {
        ctx.send("📝 *Usage:* `toggle <command> on|off`").await?;
        return Ok(());
    };

    let enabled = match switch.to_ascii_lowercase().as_str() {
        "on" => true,
        "off" => false,
        _ => {
            ctx.send("📝 *Usage:* `toggle <command> on|off`").await?;
            return Ok(());
        }
    };

    let Some(command) = ctx.control().registry().find_command(name) else {
        ctx.send(format!("❌ *Unknown command: {name}*")).await?;
        return Ok(());
    };
    if command.pattern().eq_ignore_ascii_case(&ctx.command) {
        ctx.send("❌ *This command cannot be toggled*").await?;
        return Ok(());
    }

    ctx.state()
        .set_command_enabled(command.pattern(), enabled)
        .await?;
    let state = if enabled { "enabled" } else { "disabled" };
    ctx.send(format!("✅ *Command '{}' {state}*", command.pattern()))
        .await?;
    Ok(())
}

/// Fingerprint of the sticker the command replies to.
fn quoted_sticker(ctx: &CommandContext) -> Option<String> {
    ctx.message
        .reply
        .as_ref()
        .and_then(|quoted| quoted.content.sticker_message.as_ref())
        .and_then(Payload::fingerprint)
        .map(str::to_string)
}

async fn setcmd(ctx: CommandContext) -> anyhow::Result<()> {
    let Some(fingerprint) = quoted_sticker(&ctx) else {
        ctx.send("📎 *Reply to a sticker to set as command*").await?;
        return Ok(());
    };
    let Some(name) = ctx.args.split_whitespace().next() else {
        ctx.send("📝 *Provide command name*\nExample: `setcmd ping`")
            .await?;
        return Ok(());
    };

    ctx.state().bind_sticker(&fingerprint, name).await?;
    ctx.send(format!("✅ *Sticker set as command: {name}*"))
        .await?;
    Ok(())
}

async fn delcmd(ctx: CommandContext) -> anyhow::Result<()> {
    let state = ctx.state();

    if let Some(fingerprint) = quoted_sticker(&ctx) {
        let text = if state.unbind_sticker(&fingerprint).await? {
            "✅ *Sticker command deleted*"
        } else {
            "ℹ️ *This sticker is not bound to a command*"
        };
        ctx.send(text).await?;
        return Ok(());
    }

    let Some(name) = ctx.args.split_whitespace().next() else {
        ctx.send("📝 *Reply to a sticker or provide a command name to delete*")
            .await?;
        return Ok(());
    };
    let removed = state.unbind_command(name).await?;
    let text = if removed > 0 {
        format!("✅ *Sticker command '{name}' deleted*")
    } else {
        format!("ℹ️ *No sticker is bound to '{name}'*")
    };
    ctx.send(text).await?;
    Ok(())
}

async fn getcmd(ctx: CommandContext) -> anyhow::Result<()> {
    let bindings = ctx.state().sticker_bindings().await?;
    if bindings.is_empty() {
        ctx.send("ℹ️ *No sticker commands found*").await?;
        return Ok(());
    }

    let mut text = String::from("*📎 Sticker Commands*\n\n");
    for (index, (_, command)) in bindings.iter().enumerate() {
        text.push_str(&format!("{}. `{command}`\n", index + 1));
    }
    ctx.send(text).await?;
    Ok(())
}

// =============================================================================
// Group
// =============================================================================

/// Sends the refusal and returns `false` unless the admin checks pass.
async fn admitted(ctx: &CommandContext) -> anyhow::Result<bool> {
    let refusal = match ctx.check_group_admin().await? {
        AdminCheck::Granted(_) => return Ok(true),
        AdminCheck::NotGroup => "👥 *This command only works in groups*",
        AdminCheck::BotNotAdmin => "❌ *Bot must be admin first*",
        AdminCheck::SenderNotAdmin => "❌ *Only group admins can use this command*",
    };
    ctx.send(refusal).await?;
    Ok(false)
}

/// Mentioned users, else the quoted author, else a number in the arguments.
fn targets(ctx: &CommandContext) -> Vec<String> {
    let mentioned: Vec<String> = ctx
        .message
        .mention
        .jids
        .iter()
        .map(|id| jid::normalize_user(id))
        .collect();
    if !mentioned.is_empty() {
        return mentioned;
    }

    if let Some(quoted) = &ctx.message.reply
        && !quoted.sender.is_empty()
    {
        return vec![quoted.sender.clone()];
    }

    let digits: String = ctx.args.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        Vec::new()
    } else {
        vec![format!("{digits}@{}", jid::USER_SERVER)]
    }
}

/// Sends `done(value)`, or `failed` when the transport refused.
async fn report<T, F>(
    ctx: &CommandContext,
    result: TransportResult<T>,
    done: F,
    failed: &str,
) -> anyhow::Result<()>
where
    T: Send,
    F: FnOnce(T) -> String + Send,
{
    let text = match result {
        Ok(value) => done(value),
        Err(e) => {
            warn!(chat = %ctx.message.chat, command = %ctx.command, error = %e, "Group operation failed");
            failed.to_string()
        }
    };
    ctx.send(text).await?;
    Ok(())
}

fn invite_link(code: &str) -> String {
    format!("{INVITE_LINK_BASE}{code}")
}

async fn change_participants(ctx: CommandContext, action: ParticipantAction) -> anyhow::Result<()> {
    if !admitted(&ctx).await? {
        return Ok(());
    }
    let targets = targets(&ctx);
    if targets.is_empty() {
        ctx.send("👤 *Reply to a user, mention them or provide a number*")
            .await?;
        return Ok(());
    }

    let transport = ctx.message.transport();
    let results = match transport
        .update_participants(&ctx.message.chat, &targets, action)
        .await
    {
        Ok(results) => results,
        Err(e) => {
            warn!(chat = %ctx.message.chat, action = action.as_str(), error = %e, "Participant update failed");
            ctx.send(format!("❌ *Failed to {} user*", action.as_str()))
                .await?;
            return Ok(());
        }
    };

    for ParticipantResult { id, status } in results {
        let user = format!("@{}", jid::number_of(&id));
        let text = match (action, status) {
            (ParticipantAction::Promote, ParticipantStatus::Done) => {
                format!("✅ *{user} promoted to admin*")
            }
            (ParticipantAction::Demote, ParticipantStatus::Done) => {
                format!("✅ *{user} demoted from admin*")
            }
            (ParticipantAction::Remove, ParticipantStatus::Done) => {
                format!("✅ *{user} removed from group*")
            }
            (ParticipantAction::Add, ParticipantStatus::Done) => {
                format!("✅ *{user} added to group*")
            }
            (ParticipantAction::Add, ParticipantStatus::AlreadyMember) => {
                format!("ℹ️ *{user} is already in the group*")
            }
            (ParticipantAction::Add, ParticipantStatus::InviteRequired) => {
                ctx.send(format!("📨 *Couldn't add {user}. Sending invite...*"))
                    .await?;
                let code = transport.invite_code(&ctx.message.chat).await?;
                transport
                    .send(
                        &id,
                        OutgoingMessage::text(format!("🔗 *Group Invite*\n{}", invite_link(&code))),
                    )
                    .await?;
                continue;
            }
            _ => format!("❌ *Failed to {} {user}*", action.as_str()),
        };
        ctx.send(OutgoingMessage::text(text).with_mentions([id]))
            .await?;
    }
    Ok(())
}

async fn promote(ctx: CommandContext) -> anyhow::Result<()> {
    change_participants(ctx, ParticipantAction::Promote).await
}

async fn demote(ctx: CommandContext) -> anyhow::Result<()> {
    change_participants(ctx, ParticipantAction::Demote).await
}

async fn kick(ctx: CommandContext) -> anyhow::Result<()> {
    change_participants(ctx, ParticipantAction::Remove).await
}

async fn add(ctx: CommandContext) -> anyhow::Result<()> {
    change_participants(ctx, ParticipantAction::Add).await
}

async fn announce(ctx: CommandContext, on: bool) -> anyhow::Result<()> {
    if !admitted(&ctx).await? {
        return Ok(());
    }
    let result = ctx
        .message
        .transport()
        .set_announce(&ctx.message.chat, on)
        .await;
    let (done, failed) = if on {
        (
            "🔇 *Group muted - Only admins can send messages*",
            "❌ *Failed to mute group*",
        )
    } else {
        (
            "🔊 *Group unmuted - All members can send messages*",
            "❌ *Failed to unmute group*",
        )
    };
    report(&ctx, result, |()| done.to_string(), failed).await
}

async fn mute(ctx: CommandContext) -> anyhow::Result<()> {
    announce(ctx, true).await
}

async fn unmute(ctx: CommandContext) -> anyhow::Result<()> {
    announce(ctx, false).await
}

async fn gname(ctx: CommandContext) -> anyhow::Result<()> {
    if !admitted(&ctx).await? {
        return Ok(());
    }
    let subject = ctx.args.trim();
    if subject.is_empty() {
        ctx.send("📝 *Provide new group name*").await?;
        return Ok(());
    }
    let result = ctx
        .message
        .transport()
        .set_subject(&ctx.message.chat, subject)
        .await;
    report(
        &ctx,
        result,
        |()| format!("✅ *Group name changed to: {subject}*"),
        "❌ *Failed to change group name*",
    )
    .await
}

async fn gdesc(ctx: CommandContext) -> anyhow::Result<()> {
    if !admitted(&ctx).await? {
        return Ok(());
    }
    let result = ctx
        .message
        .transport()
        .set_description(&ctx.message.chat, ctx.args.trim())
        .await;
    report(
        &ctx,
        result,
        |()| "✅ *Group description updated*".to_string(),
        "❌ *Failed to update description*",
    )
    .await
}

async fn invite(ctx: CommandContext) -> anyhow::Result<()> {
    if !admitted(&ctx).await? {
        return Ok(());
    }
    let result = ctx.message.transport().invite_code(&ctx.message.chat).await;
    report(
        &ctx,
        result,
        |code| format!("🔗 *Group Invite Link:*\n{}", invite_link(&code)),
        "❌ *Failed to get invite link*",
    )
    .await
}

async fn revoke(ctx: CommandContext) -> anyhow::Result<()> {
    if !admitted(&ctx).await? {
        return Ok(());
    }
    let result = ctx.message.transport().revoke_invite(&ctx.message.chat).await;
    report(
        &ctx,
        result,
        |_| "✅ *Group invite link revoked*".to_string(),
        "❌ *Failed to revoke invite link*",
    )
    .await
}
