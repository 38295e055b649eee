//! Group chat metadata and membership changes.

use serde::{Deserialize, Serialize};

/// Snapshot of a group chat as reported by the transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupMetadata {
    pub id: String,
    pub subject: String,
    pub desc: Option<String>,
    pub participants: Vec<GroupParticipant>,
    /// `true` when only admins may send messages.
    pub announce: bool,
}

impl GroupMetadata {
    /// Identifiers of admins and super-admins.
    pub fn admins(&self) -> impl Iterator<Item = &str> {
        self.participants
            .iter()
            .filter(|p| p.admin.is_some())
            .map(|p| p.id.as_str())
    }

    /// Whether `id` holds admin, ignoring device suffixes.
    pub fn is_admin(&self, id: &str) -> bool {
        self.admins().any(|admin| crate::jid::same_user(admin, id))
    }

    /// Whether `id` is a participant, ignoring device suffixes.
    pub fn is_member(&self, id: &str) -> bool {
        self.participants
            .iter()
            .any(|p| crate::jid::same_user(&p.id, id))
    }
}

/// One group member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupParticipant {
    pub id: String,
    /// `"admin"` / `"superadmin"`, absent for regular members.
    pub admin: Option<String>,
}

/// What happened to the participants of a [`GroupParticipantsUpdate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantAction {
    Add,
    Remove,
    Promote,
    Demote,
}

impl ParticipantAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Promote => "promote",
            Self::Demote => "demote",
        }
    }
}

/// How the transport settled one participant of a membership request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    Done,
    /// The account's privacy settings refuse direct adds; send an invite.
    InviteRequired,
    /// Added while already a member.
    AlreadyMember,
    /// Any other refusal, with the server's status code.
    Rejected(u16),
}

impl ParticipantStatus {
    /// Maps a server status code.
    pub fn from_code(code: u16) -> Self {
        match code {
            200 => Self::Done,
            403 => Self::InviteRequired,
            409 => Self::AlreadyMember,
            other => Self::Rejected(other),
        }
    }
}

/// Result for one participant of [`Transport::update_participants`].
///
/// [`Transport::update_participants`]: crate::Transport::update_participants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantResult {
    pub id: String,
    pub status: ParticipantStatus,
}

/// A membership change in a group chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupParticipantsUpdate {
    /// Group the change happened in.
    pub group: String,
    /// Affected participants.
    pub participants: Vec<String>,
    pub action: ParticipantAction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_lookup_ignores_device_suffix() {
        let metadata = GroupMetadata {
            participants: vec![
                GroupParticipant {
                    id: "100@s.whatsapp.net".into(),
                    admin: Some("admin".into()),
                },
                GroupParticipant {
                    id: "200@s.whatsapp.net".into(),
                    admin: None,
                },
            ],
            ..Default::default()
        };

        assert!(metadata.is_admin("100:3@s.whatsapp.net"));
        assert!(!metadata.is_admin("200@s.whatsapp.net"));
        assert!(metadata.is_member("200@c.us"));
        assert!(!metadata.is_member("300@s.whatsapp.net"));
    }

    #[test]
    fn test_participant_status_codes() {
        assert_eq!(ParticipantStatus::from_code(200), ParticipantStatus::Done);
        assert_eq!(ParticipantStatus::from_code(403), ParticipantStatus::InviteRequired);
        assert_eq!(ParticipantStatus::from_code(409), ParticipantStatus::AlreadyMember);
        assert_eq!(ParticipantStatus::from_code(500), ParticipantStatus::Rejected(500));
    }
}
