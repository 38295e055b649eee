//! Access checks shared by commands and events.
//!
//! A denial is not an error: the pipeline skips the handler and sends nothing.

use std::fmt;

use crate::message::NormalizedMessage;
use crate::settings::DispatchSettings;
use crate::unit::Access;

/// Why an invocation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// `from_me` is set and the caller is not an owner.
    OwnerOnly,
    /// `only_group` is set and the chat is not a group.
    GroupOnly,
    /// The bot runs in private mode and the caller is not an owner.
    PrivateMode,
    /// The command is toggled off.
    Disabled,
    /// The trigger has no caller to satisfy `from_me`.
    NoCaller,
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OwnerOnly => "owner only",
            Self::GroupOnly => "group only",
            Self::PrivateMode => "private mode",
            Self::Disabled => "disabled",
            Self::NoCaller => "no caller",
        })
    }
}

/// Checks `access` and the work mode against a message.
///
/// The per-command toggle is checked separately, since it needs the store.
pub fn check_message(
    access: &Access,
    message: &NormalizedMessage,
    settings: &DispatchSettings,
) -> Result<(), Denial> {
    if access.from_me && !message.is_creator {
        return Err(Denial::OwnerOnly);
    }
    if access.only_group && !message.is_group {
        return Err(Denial::GroupOnly);
    }
    if settings.mode.is_restrictive() && !message.is_creator {
        return Err(Denial::PrivateMode);
    }
    Ok(())
}

/// Checks `access` for a group membership trigger.
///
/// The chat is always a group and there is no caller, so `only_group` passes,
/// `from_me` fails and the work mode does not apply.
pub fn check_group_update(access: &Access) -> Result<(), Denial> {
    if access.from_me {
        return Err(Denial::NoCaller);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use switchyard_core::BoxedTransport;

    use super::*;
    use crate::normalizer::normalize;
    use crate::settings::WorkMode;
    use crate::testing::{RecordingTransport, text_message};

    fn message(chat: &str, participant: Option<&str>, settings: &DispatchSettings) -> NormalizedMessage {
        let transport: BoxedTransport = Arc::new(RecordingTransport::default());
        normalize(&text_message("M1", chat, participant, "hi"), &transport, settings).unwrap()
    }

    #[test]
    fn test_owner_only() {
        let settings = DispatchSettings::default()
            .with_mode(WorkMode::Public)
            .with_owners(["555"]);
        let owner_only = Access {
            from_me: true,
            ..Default::default()
        };

        let stranger = message("42@s.whatsapp.net", None, &settings);
        assert_eq!(check_message(&owner_only, &stranger, &settings), Err(Denial::OwnerOnly));

        let owner = message("555@s.whatsapp.net", None, &settings);
        assert_eq!(check_message(&owner_only, &owner, &settings), Ok(()));
    }

    #[test]
    fn test_group_only() {
        let settings = DispatchSettings::default().with_mode(WorkMode::Public);
        let group_only = Access {
            only_group: true,
            ..Default::default()
        };

        let private = message("42@s.whatsapp.net", None, &settings);
        assert_eq!(check_message(&group_only, &private, &settings), Err(Denial::GroupOnly));

        let group = message("9@g.us", Some("42@s.whatsapp.net"), &settings);
        assert_eq!(check_message(&group_only, &group, &settings), Ok(()));
    }

    #[test]
    fn test_private_mode_refuses_strangers() {
        let settings = DispatchSettings::default().with_owners(["555"]);
        let stranger = message("42@s.whatsapp.net", None, &settings);
        assert_eq!(
            check_message(&Access::default(), &stranger, &settings),
            Err(Denial::PrivateMode)
        );
        let owner = message("555@s.whatsapp.net", None, &settings);
        assert_eq!(check_message(&Access::default(), &owner, &settings), Ok(()));
    }

    #[test]
    fn test_group_update_has_no_caller() {
        let access = Access {
            only_group: true,
            ..Default::default()
        };
        assert_eq!(check_group_update(&access), Ok(()));
        assert_eq!(
            check_group_update(&Access {
                from_me: true,
                ..Default::default()
            }),
            Err(Denial::NoCaller)
        );
    }
}
