use std::fmt::Display;

pub const STORYTELLER_EMOJI: &str = "📖";
pub const MAIN_PLAYER_EMOJI: &str = "⚔️";
pub const TRAVELER_EMOJI: &str = "🎒";
pub const SPECTATOR_EMOJI: &str = "🍿";

/// Main player parties, from a party of 2 up to a party of 6.
pub const MAIN_PARTY_EMOJIS: [&str; 5] = ["🗡️", "⚡", "🛡️", "🏹", "🔥"];
/// Traveler parties, from a party of 2 up to a party of 6.
pub const TRAVELER_PARTY_EMOJIS: [&str; 5] = ["🌟", "🎭", "🎨", "🎪", "🎯"];

const VARIATION_SELECTOR: char = '\u{FE0F}';

/// What a participant signs up for by reacting to the signup board.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Storyteller,
    MainPlayer { slots: u8 },
    Traveler { slots: u8 },
    Spectator,
    /// Any other emoji. Counted, never capped.
    Novelty(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RoleCategory {
    Storyteller,
    MainPlayer,
    Traveler,
    Spectator,
    Novelty,
}

impl Role {
    pub fn from_emoji(emoji: &str) -> Role {
        let emoji = normalize_emoji(emoji);

        let party = |emojis: &[&str]| {
            emojis
                .iter()
                .position(|e| normalize_emoji(e) == emoji)
                .map(|index| index as u8 + 2)
        };

        if emoji == normalize_emoji(STORYTELLER_EMOJI) {
            Role::Storyteller
        } else if emoji == normalize_emoji(MAIN_PLAYER_EMOJI) {
            Role::MainPlayer { slots: 1 }
        } else if let Some(slots) = party(&MAIN_PARTY_EMOJIS) {
            Role::MainPlayer { slots }
        } else if emoji == normalize_emoji(TRAVELER_EMOJI) {
            Role::Traveler { slots: 1 }
        } else if let Some(slots) = party(&TRAVELER_PARTY_EMOJIS) {
            Role::Traveler { slots }
        } else if emoji == normalize_emoji(SPECTATOR_EMOJI) {
            Role::Spectator
        } else {
            Role::Novelty(emoji)
        }
    }

    /// The emoji a participant reacts with to select this role.
    pub fn emoji(&self) -> String {
        use Role::*;

        let party = |emojis: &[&'static str], slots: u8| -> Option<&'static str> {
            emojis.get((slots as usize).checked_sub(2)?).copied()
        };

        match self {
            Storyteller => STORYTELLER_EMOJI.to_owned(),
            MainPlayer { slots: 1 } => MAIN_PLAYER_EMOJI.to_owned(),
            MainPlayer { slots } => party(&MAIN_PARTY_EMOJIS, *slots)
                .unwrap_or(MAIN_PLAYER_EMOJI)
                .to_owned(),
            Traveler { slots: 1 } => TRAVELER_EMOJI.to_owned(),
            Traveler { slots } => party(&TRAVELER_PARTY_EMOJIS, *slots)
                .unwrap_or(TRAVELER_EMOJI)
                .to_owned(),
            Spectator => SPECTATOR_EMOJI.to_owned(),
            Novelty(emoji) => emoji.clone(),
        }
    }

    pub fn category(&self) -> RoleCategory {
        match self {
            Role::Storyteller => RoleCategory::Storyteller,
            Role::MainPlayer { .. } => RoleCategory::MainPlayer,
            Role::Traveler { .. } => RoleCategory::Traveler,
            Role::Spectator => RoleCategory::Spectator,
            Role::Novelty(_) => RoleCategory::Novelty,
        }
    }

    /// Reactions the bot seeds on a fresh signup board, in display order.
    pub fn palette() -> Vec<Role> {
        let mut palette = vec![Role::Storyteller, Role::MainPlayer { slots: 1 }];
        palette.extend((2..=6).map(|slots| Role::MainPlayer { slots }));
        palette.push(Role::Traveler { slots: 1 });
        palette.extend((2..=6).map(|slots| Role::Traveler { slots }));
        palette.push(Role::Spectator);
        palette
    }
}

impl RoleCategory {
    pub fn name(&self) -> &'static str {
        use RoleCategory::*;

        match self {
            Storyteller => "storyteller",
            MainPlayer => "main player",
            Traveler => "traveler",
            Spectator => "spectator",
            Novelty => "other",
        }
    }
}

impl Display for RoleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Discord sends some emoji with the variation selector and some without.
pub fn normalize_emoji(emoji: &str) -> String {
    emoji.chars().filter(|c| *c != VARIATION_SELECTOR).collect()
}
