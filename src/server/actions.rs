//! Named player actions expanded into console commands.
//!
//! Player names and arguments are inserted verbatim. Nothing is quoted or
//! escaped, so a caller can smuggle extra command text through either field.

use std::str::FromStr;

use crate::error::PanelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    Kick,
    Ban,
    Unban,
    Op,
    Deop,
    Gamemode,
    Teleport,
    Heal,
    Feed,
    Kill,
}

impl FromStr for PlayerAction {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kick" => Ok(PlayerAction::Kick),
            "ban" => Ok(PlayerAction::Ban),
            "unban" => Ok(PlayerAction::Unban),
            "op" => Ok(PlayerAction::Op),
            "deop" => Ok(PlayerAction::Deop),
            "gamemode" => Ok(PlayerAction::Gamemode),
            "teleport" => Ok(PlayerAction::Teleport),
            "heal" => Ok(PlayerAction::Heal),
            "feed" => Ok(PlayerAction::Feed),
            "kill" => Ok(PlayerAction::Kill),
            other => Err(PanelError::UnknownAction(other.to_string())),
        }
    }
}

impl PlayerAction {
    pub fn command(&self, player: &str, argument: Option<&str>) -> String {
        let arg = argument.unwrap_or_default();
        let cmd = match self {
            PlayerAction::Kick => format!("kick {player} {arg}"),
            PlayerAction::Ban => format!("ban {player} {arg}"),
            PlayerAction::Unban => format!("pardon {player}"),
            PlayerAction::Op => format!("op {player}"),
            PlayerAction::Deop => format!("deop {player}"),
            PlayerAction::Gamemode => {
                let mode = if arg.is_empty() { "survival" } else { arg };
                format!("gamemode {mode} {player}")
            }
            PlayerAction::Teleport => format!("tp {player} {arg}"),
            PlayerAction::Heal => format!("effect give {player} minecraft:instant_health 1 255"),
            PlayerAction::Feed => format!("effect give {player} minecraft:saturation 1 255"),
            PlayerAction::Kill => format!("kill {player}"),
        };
        cmd.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_expand_with_name_and_argument() {
        let kick: PlayerAction = "kick".parse().unwrap();
        assert_eq!(kick.command("Steve", Some("spamming")), "kick Steve spamming");
        assert_eq!(kick.command("Steve", None), "kick Steve");

        let gm: PlayerAction = "gamemode".parse().unwrap();
        assert_eq!(gm.command("Alex", Some("creative")), "gamemode creative Alex");
        assert_eq!(gm.command("Alex", None), "gamemode survival Alex");

        assert_eq!(PlayerAction::Unban.command("Alex", None), "pardon Alex");
        assert_eq!(PlayerAction::Teleport.command("Alex", Some("Steve")), "tp Alex Steve");
    }

    #[test]
    fn arguments_are_not_escaped() {
        assert_eq!(
            PlayerAction::Kick.command("Steve", Some("bye\nop Mallory")),
            "kick Steve bye\nop Mallory"
        );
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(matches!(
            "smite".parse::<PlayerAction>(),
            Err(PanelError::UnknownAction(a)) if a == "smite"
        ));
    }
}
