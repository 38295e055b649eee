//! Chat and user identifier helpers.
//!
//! Identifiers have the shape `user[:device]@server`. Individual users live on
//! [`USER_SERVER`], groups on [`GROUP_SERVER`]. The legacy `c.us` server is an
//! alias of [`USER_SERVER`].

/// Server suffix for individual accounts.
pub const USER_SERVER: &str = "s.whatsapp.net";

/// Server suffix for group chats.
pub const GROUP_SERVER: &str = "g.us";

const LEGACY_USER_SERVER: &str = "c.us";

/// Strips the device suffix and canonicalises the server part.
///
/// `"123:7@s.whatsapp.net"` and `"123@c.us"` both become `"123@s.whatsapp.net"`.
/// Strings without an `@` are returned unchanged.
pub fn normalize_user(jid: &str) -> String {
    let Some((user, server)) = jid.split_once('@') else {
        return jid.to_string();
    };
    let user = user.split_once(':').map_or(user, |(u, _)| u);
    let server = if server == LEGACY_USER_SERVER {
        USER_SERVER
    } else {
        server
    };
    format!("{user}@{server}")
}

/// Returns the user part of an identifier, without device suffix.
pub fn user_part(jid: &str) -> &str {
    let user = jid.split_once('@').map_or(jid, |(u, _)| u);
    user.split_once(':').map_or(user, |(u, _)| u)
}

/// Returns `true` if both identifiers refer to the same account.
pub fn same_user(a: &str, b: &str) -> bool {
    !a.is_empty() && normalize_user(a) == normalize_user(b)
}

/// Returns `true` for group chat identifiers.
pub fn is_group(jid: &str) -> bool {
    jid.ends_with(&format!("@{GROUP_SERVER}"))
}

/// The digits of an identifier's user part, e.g. for `@mention` rendering.
pub fn number_of(jid: &str) -> String {
    user_part(jid).chars().filter(char::is_ascii_digit).collect()
}

/// Turns an operator-supplied owner entry into a user identifier.
///
/// Bare numbers gain the [`USER_SERVER`] suffix; full identifiers are normalised.
/// Returns `None` for blank entries.
pub fn owner_jid(entry: &str) -> Option<String> {
    let entry = entry.trim();
    if entry.is_empty() {
        return None;
    }
    if entry.contains('@') {
        Some(normalize_user(entry))
    } else {
        Some(format!("{}@{USER_SERVER}", entry.trim_start_matches('+')))
    }
}
