use indoc::formatdoc;
use poise::serenity_prelude::{CreateEmbed, CreateEmbedFooter, Mentionable};

use crate::{
    game::{
        format_clock, Role, RoleCategory, SessionError, SlotEntry, TallySnapshot, WeekOverview,
        WeekStatus, MAIN_PARTY_EMOJIS, MAIN_PLAYER_EMOJI, SPECTATOR_EMOJI, STORYTELLER_EMOJI,
        TRAVELER_EMOJI, TRAVELER_PARTY_EMOJIS,
    },
    utils::{formatting::plural, timestamp, TimestampStyle},
};

pub const GAME_TITLE: &str = "Blood on the Clocktower - Weekly Game Night";
const BOARD_COLOUR: u32 = 0x8B0000;

pub fn board_embed(overview: &WeekOverview) -> CreateEmbed {
    let snapshot = &overview.snapshot;

    let mut embed = CreateEmbed::new()
        .title(format!("🕐 {GAME_TITLE}"))
        .description("React to join the game! First come, first served.")
        .colour(BOARD_COLOUR)
        .field("📅 Next Game", next_game_line(overview), false)
        .field("📍 Location", &overview.location, false)
        .field(
            group_title(
                STORYTELLER_EMOJI,
                "Storyteller",
                snapshot.storytellers.len() as u32,
                Some(snapshot.limits.storytellers),
            ),
            mention_list(&snapshot.storytellers, "No storyteller yet"),
            false,
        )
        .field(
            group_title(
                MAIN_PLAYER_EMOJI,
                "Main Players",
                snapshot.main_player_slots(),
                Some(snapshot.limits.main_players),
            ),
            slot_list(&snapshot.main_players, "No players signed up yet"),
            true,
        )
        .field(
            group_title(
                TRAVELER_EMOJI,
                "Travelers",
                snapshot.traveler_slots(),
                Some(snapshot.limits.travelers),
            ),
            slot_list(&snapshot.travelers, "No travelers signed up yet"),
            true,
        );

    if !snapshot.spectators.is_empty() {
        embed = embed.field(
            group_title(SPECTATOR_EMOJI, "Spectators", snapshot.spectators.len() as u32, None),
            mention_list(&snapshot.spectators, ""),
            false,
        );
    }

    if !snapshot.novelty.is_empty() {
        embed = embed.field("Other reactions", novelty_line(snapshot), false);
    }

    if overview.status == WeekStatus::Closed {
        embed = embed.field(
            "🔒 Signups closed",
            "The game has started. Signups for next week open here once it is over, \
             or right away with `/reset_signups`.",
            false,
        );
    } else {
        embed = embed.field("How to Join", how_to_join(), false);
    }

    embed.footer(CreateEmbedFooter::new("May the odds be in your favor! 🎲"))
}

pub fn next_game_line(overview: &WeekOverview) -> String {
    format!(
        "{} ({})\n{} at {} {}",
        timestamp(overview.starts_at, TimestampStyle::LongDateTime),
        timestamp(overview.starts_at, TimestampStyle::RelativeTime),
        overview.schedule.day(),
        format_clock(overview.schedule.time()),
        overview.schedule.timezone_name(),
    )
}

pub fn group_title(emoji: &str, name: &str, count: u32, cap: Option<u32>) -> String {
    match cap {
        Some(cap) => format!("{emoji} {name} ({count}/{cap})"),
        None => format!("{emoji} {name} ({count})"),
    }
}

pub fn slot_list(entries: &[SlotEntry], empty: &str) -> String {
    if entries.is_empty() {
        return empty.to_owned();
    }

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let party = match entry.slots {
                1 => String::new(),
                slots => format!(" (party of {slots})"),
            };
            format!("{}. {}{party}\n", i + 1, entry.participant.mention())
        })
        .collect()
}

fn mention_list(users: &[poise::serenity_prelude::UserId], empty: &str) -> String {
    if users.is_empty() {
        return empty.to_owned();
    }

    users
        .iter()
        .map(|user| user.mention().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn novelty_line(snapshot: &TallySnapshot) -> String {
    snapshot
        .novelty
        .iter()
        .map(|(emoji, count)| format!("{emoji} × {count}"))
        .collect::<Vec<_>>()
        .join("  ")
}

pub fn how_to_join() -> String {
    let parties = |emojis: &[&str]| {
        emojis
            .iter()
            .enumerate()
            .map(|(i, emoji)| format!("{emoji} party of {}", i + 2))
            .collect::<Vec<_>>()
            .join(" · ")
    };

    formatdoc! {
        r#"
            **Storyteller:** {STORYTELLER_EMOJI}

            **Main Players:**
            {MAIN_PLAYER_EMOJI} Solo player
            {main_parties}

            **Travelers:**
            {TRAVELER_EMOJI} Solo traveler
            {traveler_parties}

            **Just watching:** {SPECTATOR_EMOJI}"#,
        main_parties = parties(&MAIN_PARTY_EMOJIS[..]),
        traveler_parties = parties(&TRAVELER_PARTY_EMOJIS[..]),
    }
}

/// Text for the scheduled event, kept in sync with the board.
pub fn event_description(snapshot: &TallySnapshot) -> String {
    formatdoc! {
        r#"
            Weekly Blood on the Clocktower game!

            Storyteller: {storytellers}/{max_storytellers}
            Main Players: {main}/{max_main}
            Travelers: {travelers}/{max_travelers}

            React to the signup message to join!"#,
        storytellers = snapshot.storytellers.len(),
        max_storytellers = snapshot.limits.storytellers,
        main = snapshot.main_player_slots(),
        max_main = snapshot.limits.main_players,
        travelers = snapshot.traveler_slots(),
        max_travelers = snapshot.limits.travelers,
    }
}

/// Direct message for a participant whose reaction was reverted.
pub fn rejection_message(role: &Role, error: &SessionError) -> String {
    match error {
        SessionError::CapacityExceeded {
            category: RoleCategory::Storyteller,
            ..
        } => format!(
            "🚫 **We already have a storyteller this week!** \
             React with {MAIN_PLAYER_EMOJI} to play instead, or come watch the mayhem unfold! 🍿"
        ),

        SessionError::CapacityExceeded {
            category,
            requested,
            available,
        } => {
            let (name, alternative, alternative_name) = match category {
                RoleCategory::Traveler => ("traveler", MAIN_PLAYER_EMOJI, "main players"),
                _ => ("main player", TRAVELER_EMOJI, "travelers"),
            };

            if *available > 0 {
                format!(
                    "🚫 **Not enough {name} spots!** \
                     You requested {} but only {} remain. \
                     Try a smaller group or react with {alternative} to join as {alternative_name}!",
                    plural(*requested, "spot"),
                    available,
                )
            } else {
                format!(
                    "🚫 **{}s are full!** \
                     Try reacting with {alternative} to join as {alternative_name}, \
                     or come watch the mayhem unfold! 🍿",
                    capitalize(name),
                )
            }
        }

        SessionError::SignupsClosed => format!(
            "🔒 **Signups for this week's game are closed**, so your {} reaction was removed. \
             Keep an eye out for next week's signup!",
            role.emoji()
        ),

        error => format!("🚫 Your reaction could not be counted: {error}"),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// The weekly reminder posted in the board channel.
pub fn reminder_message(overview: &WeekOverview) -> String {
    let snapshot = &overview.snapshot;
    let participants = snapshot.participants();

    let mentions = if participants.is_empty() {
        "Nobody has signed up yet, now is a great time to react!".to_owned()
    } else {
        participants
            .iter()
            .map(|user| user.mention().to_string())
            .collect::<Vec<_>>()
            .join(" ")
    };

    formatdoc! {
        r#"
            # ⏰ {GAME_TITLE} starts {relative}!

            {when} at {location}.

            {STORYTELLER_EMOJI} Storyteller: {storytellers}/{max_storytellers} · {MAIN_PLAYER_EMOJI} Main players: {main}/{max_main} · {TRAVELER_EMOJI} Travelers: {travelers}/{max_travelers}

            {mentions}"#,
        relative = timestamp(overview.starts_at, TimestampStyle::RelativeTime),
        when = timestamp(overview.starts_at, TimestampStyle::LongDateTime),
        location = overview.location,
        storytellers = snapshot.storytellers.len(),
        max_storytellers = snapshot.limits.storytellers,
        main = snapshot.main_player_slots(),
        max_main = snapshot.limits.main_players,
        travelers = snapshot.traveler_slots(),
        max_travelers = snapshot.limits.travelers,
    }
}

/// Plain text dump of every group, for `/debug_players`.
pub fn debug_dump(snapshot: &TallySnapshot) -> String {
    let mut dump = String::new();

    for group in snapshot.groups() {
        let cap = group
            .cap
            .map(|cap| format!("/{cap}"))
            .unwrap_or_default();
        dump += &format!("**{}** {}{cap}\n", capitalize(group.category.name()), group.count);

        for entry in &group.entries {
            dump += &format!(
                " - {} (`{}`): {}\n",
                entry.participant.mention(),
                entry.participant,
                plural(entry.slots, "slot")
            );
        }

        if let Some(novelty) = group.novelty {
            for (emoji, count) in novelty {
                dump += &format!(" - {emoji}: {count}\n");
            }
        }
    }

    dump
}

#[cfg(test)]
mod tests {
    use serenity::all::UserId;
    use time::{macros::datetime, macros::time, Weekday};

    use super::{debug_dump, event_description, group_title, rejection_message, reminder_message, slot_list};
    use crate::game::{
        CapacityLimits, GameSchedule, Role, RoleCategory, SessionError, SignupTally, SlotEntry,
        WeekOverview, WeekStatus,
    };

    fn overview(tally: &SignupTally) -> WeekOverview {
        WeekOverview {
            schedule: GameSchedule::new(Weekday::Thursday, time!(19:30), "America/Los_Angeles")
                .unwrap(),
            location: "Voice Channel".to_owned(),
            status: WeekStatus::Open,
            starts_at: datetime!(2024-01-05 03:30 UTC),
            reminded: false,
            board: None,
            event: None,
            snapshot: tally.snapshot(),
            revision: 1,
        }
    }

    #[test]
    fn group_titles() {
        assert_eq!(group_title("⚔️", "Main Players", 4, Some(15)), "⚔️ Main Players (4/15)");
        assert_eq!(group_title("🍿", "Spectators", 2, None), "🍿 Spectators (2)");
    }

    #[test]
    fn slot_list_numbers_participants() {
        let entries = [
            SlotEntry {
                participant: UserId::new(1),
                slots: 1,
            },
            SlotEntry {
                participant: UserId::new(2),
                slots: 4,
            },
        ];

        assert_eq!(
            slot_list(&entries, "nobody"),
            "1. <@1>\n2. <@2> (party of 4)\n"
        );
        assert_eq!(slot_list(&[], "nobody"), "nobody");
    }

    #[test]
    fn event_description_counts() {
        let mut tally = SignupTally::new(CapacityLimits::default());
        tally.add_reaction(UserId::new(1), &Role::MainPlayer { slots: 4 }).unwrap();
        tally.add_reaction(UserId::new(2), &Role::Traveler { slots: 1 }).unwrap();

        let description = event_description(&tally.snapshot());
        assert!(description.contains("Main Players: 4/15"));
        assert!(description.contains("Travelers: 1/5"));
        assert!(description.contains("Storyteller: 0/1"));
    }

    #[test]
    fn rejection_suggests_the_other_group() {
        let message = rejection_message(
            &Role::MainPlayer { slots: 4 },
            &SessionError::CapacityExceeded {
                category: RoleCategory::MainPlayer,
                requested: 4,
                available: 2,
            },
        );
        assert!(message.contains("You requested 4 spots but only 2 remain"));
        assert!(message.contains("🎒"));

        let message = rejection_message(
            &Role::Traveler { slots: 1 },
            &SessionError::CapacityExceeded {
                category: RoleCategory::Traveler,
                requested: 1,
                available: 0,
            },
        );
        assert!(message.contains("Travelers are full!"));
        assert!(message.contains("⚔️"));
    }

    #[test]
    fn reminder_mentions_participants() {
        let mut tally = SignupTally::new(CapacityLimits::default());
        tally.add_reaction(UserId::new(7), &Role::Storyteller).unwrap();
        tally.add_reaction(UserId::new(8), &Role::Novelty("🦇".to_owned())).unwrap();

        let message = reminder_message(&overview(&tally));
        assert!(message.contains("<@7>"));
        assert!(!message.contains("<@8>"));
        assert!(message.contains("<t:1704425400:R>"));
    }

    #[test]
    fn reminder_without_participants() {
        let tally = SignupTally::new(CapacityLimits::default());
        assert!(reminder_message(&overview(&tally)).contains("Nobody has signed up yet"));
    }

    #[test]
    fn debug_dump_lists_groups() {
        let mut tally = SignupTally::new(CapacityLimits::default());
        tally.add_reaction(UserId::new(3), &Role::MainPlayer { slots: 2 }).unwrap();
        tally.add_reaction(UserId::new(3), &Role::Novelty("🦇".to_owned())).unwrap();

        let dump = debug_dump(&tally.snapshot());
        assert!(dump.contains("**Main player** 2/15"));
        assert!(dump.contains(" - <@3> (`3`): 2 slots"));
        assert!(dump.contains(" - 🦇: 1"));
    }
}
