use std::collections::{BTreeMap, BTreeSet, HashMap};

use serenity::all::UserId;

use super::{Role, RoleCategory, SessionError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapacityLimits {
    pub storytellers: u32,
    pub main_players: u32,
    pub travelers: u32,
}

impl Default for CapacityLimits {
    fn default() -> Self {
        CapacityLimits {
            storytellers: 1,
            main_players: 15,
            travelers: 5,
        }
    }
}

/// Slot counts a participant currently has reacted with in one category.
///
/// The last selection is the effective one.
#[derive(Clone, Debug, PartialEq, Eq)]
struct SlotClaim {
    joined: u64,
    selections: Vec<u8>,
}

impl SlotClaim {
    fn effective(&self) -> u32 {
        self.selections.last().copied().unwrap_or(0) as u32
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Signup {
    storyteller: Option<u64>,
    main_player: Option<SlotClaim>,
    traveler: Option<SlotClaim>,
    spectator: Option<u64>,
    novelty: BTreeSet<String>,
}

impl Signup {
    fn is_empty(&self) -> bool {
        self.storyteller.is_none()
            && self.main_player.is_none()
            && self.traveler.is_none()
            && self.spectator.is_none()
            && self.novelty.is_empty()
    }

    fn slot_claim_mut(&mut self, category: RoleCategory) -> Option<&mut Option<SlotClaim>> {
        match category {
            RoleCategory::MainPlayer => Some(&mut self.main_player),
            RoleCategory::Traveler => Some(&mut self.traveler),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemoveOutcome {
    /// Fallback selections dropped because they no longer fit under the cap.
    pub evicted: Vec<Role>,
}

#[derive(Clone, Debug)]
pub struct SignupTally {
    limits: CapacityLimits,
    signups: HashMap<UserId, Signup>,
    sequence: u64,
}

impl SignupTally {
    pub fn new(limits: CapacityLimits) -> SignupTally {
        SignupTally {
            limits,
            signups: HashMap::new(),
            sequence: 0,
        }
    }

    pub fn clear(&mut self) {
        self.signups.clear();
    }

    pub fn storyteller_count(&self) -> u32 {
        self.signups
            .values()
            .filter(|s| s.storyteller.is_some())
            .count() as u32
    }

    pub fn main_player_slots(&self) -> u32 {
        self.slot_total(RoleCategory::MainPlayer)
    }

    pub fn traveler_slots(&self) -> u32 {
        self.slot_total(RoleCategory::Traveler)
    }

    fn slot_total(&self, category: RoleCategory) -> u32 {
        self.signups
            .values()
            .filter_map(|s| match category {
                RoleCategory::MainPlayer => s.main_player.as_ref(),
                RoleCategory::Traveler => s.traveler.as_ref(),
                _ => None,
            })
            .map(SlotClaim::effective)
            .sum()
    }

    fn slot_cap(&self, category: RoleCategory) -> u32 {
        match category {
            RoleCategory::MainPlayer => self.limits.main_players,
            RoleCategory::Traveler => self.limits.travelers,
            RoleCategory::Storyteller => self.limits.storytellers,
            _ => u32::MAX,
        }
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    /// Commits the role selection, or rejects it when it would exceed a cap.
    ///
    /// Rejections leave the tally untouched.
    pub fn add_reaction(&mut self, participant: UserId, role: &Role) -> Result<(), SessionError> {
        match role {
            Role::Storyteller => {
                let already = self
                    .signups
                    .get(&participant)
                    .is_some_and(|s| s.storyteller.is_some());
                if already {
                    return Ok(());
                }

                let count = self.storyteller_count();
                if count + 1 > self.limits.storytellers {
                    return Err(SessionError::CapacityExceeded {
                        category: RoleCategory::Storyteller,
                        requested: 1,
                        available: self.limits.storytellers.saturating_sub(count),
                    });
                }

                let joined = self.next_sequence();
                self.signups.entry(participant).or_default().storyteller = Some(joined);
            }

            Role::MainPlayer { slots } | Role::Traveler { slots } => {
                let category = role.category();
                let slots = *slots;
                let current = self
                    .signups
                    .get(&participant)
                    .and_then(|s| match category {
                        RoleCategory::MainPlayer => s.main_player.as_ref(),
                        _ => s.traveler.as_ref(),
                    })
                    .map(SlotClaim::effective)
                    .unwrap_or(0);

                let others = self.slot_total(category) - current;
                let cap = self.slot_cap(category);
                if others + slots as u32 > cap {
                    return Err(SessionError::CapacityExceeded {
                        category,
                        requested: slots as u32,
                        available: cap.saturating_sub(others),
                    });
                }

                let joined = self.next_sequence();
                let signup = self.signups.entry(participant).or_default();
                if let Some(claim) = signup.slot_claim_mut(category) {
                    let claim = claim.get_or_insert_with(|| SlotClaim {
                        joined,
                        selections: Vec::new(),
                    });
                    claim.selections.retain(|s| *s != slots);
                    claim.selections.push(slots);
                }
            }

            Role::Spectator => {
                let joined = self.next_sequence();
                let signup = self.signups.entry(participant).or_default();
                signup.spectator.get_or_insert(joined);
            }

            Role::Novelty(emoji) => {
                self.signups
                    .entry(participant)
                    .or_default()
                    .novelty
                    .insert(emoji.clone());
            }
        }

        Ok(())
    }

    /// Reverses a selection. Never fails and never exceeds a cap.
    pub fn remove_reaction(&mut self, participant: UserId, role: &Role) -> RemoveOutcome {
        let mut outcome = RemoveOutcome::default();

        let Some(signup) = self.signups.get_mut(&participant) else {
            return outcome;
        };

        match role {
            Role::Storyteller => signup.storyteller = None,
            Role::Spectator => signup.spectator = None,
            Role::Novelty(emoji) => {
                signup.novelty.remove(emoji);
            }
            Role::MainPlayer { slots } | Role::Traveler { slots } => {
                let category = role.category();
                if let Some(claim) = signup.slot_claim_mut(category) {
                    if let Some(c) = claim.as_mut() {
                        c.selections.retain(|s| s != slots);
                        if c.selections.is_empty() {
                            *claim = None;
                        }
                    }
                }

                // Falling back to an earlier, larger party may no longer fit.
                let cap = self.slot_cap(category);
                while self.slot_total(category) > cap {
                    let Some(claim) = self
                        .signups
                        .get_mut(&participant)
                        .and_then(|s| s.slot_claim_mut(category))
                    else {
                        break;
                    };
                    let Some(c) = claim.as_mut() else {
                        break;
                    };
                    if let Some(slots) = c.selections.pop() {
                        outcome.evicted.push(match category {
                            RoleCategory::MainPlayer => Role::MainPlayer { slots },
                            _ => Role::Traveler { slots },
                        });
                    }
                    if c.selections.is_empty() {
                        *claim = None;
                    }
                }
            }
        }

        if self
            .signups
            .get(&participant)
            .is_some_and(Signup::is_empty)
        {
            self.signups.remove(&participant);
        }

        outcome
    }

    /// Current selections of one participant, as roles.
    pub fn roles_of(&self, participant: UserId) -> Vec<Role> {
        let Some(signup) = self.signups.get(&participant) else {
            return Vec::new();
        };

        let mut roles = Vec::new();
        if signup.storyteller.is_some() {
            roles.push(Role::Storyteller);
        }
        if let Some(claim) = &signup.main_player {
            roles.push(Role::MainPlayer {
                slots: claim.effective() as u8,
            });
        }
        if let Some(claim) = &signup.traveler {
            roles.push(Role::Traveler {
                slots: claim.effective() as u8,
            });
        }
        if signup.spectator.is_some() {
            roles.push(Role::Spectator);
        }
        roles.extend(signup.novelty.iter().cloned().map(Role::Novelty));
        roles
    }

    pub fn snapshot(&self) -> TallySnapshot {
        let mut storytellers = Vec::new();
        let mut main_players = Vec::new();
        let mut travelers = Vec::new();
        let mut spectators = Vec::new();
        let mut novelty = BTreeMap::new();

        for (participant, signup) in &self.signups {
            let participant = *participant;

            if let Some(joined) = signup.storyteller {
                storytellers.push((joined, participant));
            }
            if let Some(claim) = &signup.main_player {
                main_players.push((claim.joined, slot_entry(participant, claim)));
            }
            if let Some(claim) = &signup.traveler {
                travelers.push((claim.joined, slot_entry(participant, claim)));
            }
            if let Some(joined) = signup.spectator {
                spectators.push((joined, participant));
            }
            for emoji in &signup.novelty {
                *novelty.entry(emoji.clone()).or_insert(0) += 1;
            }
        }

        TallySnapshot {
            limits: self.limits,
            storytellers: first_come_first_served(storytellers),
            main_players: first_come_first_served(main_players),
            travelers: first_come_first_served(travelers),
            spectators: first_come_first_served(spectators),
            novelty,
        }
    }
}

fn slot_entry(participant: UserId, claim: &SlotClaim) -> SlotEntry {
    SlotEntry {
        participant,
        slots: claim.effective(),
    }
}

fn first_come_first_served<T>(mut entries: Vec<(u64, T)>) -> Vec<T> {
    entries.sort_by_key(|(joined, _)| *joined);
    entries.into_iter().map(|(_, entry)| entry).collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotEntry {
    pub participant: UserId,
    pub slots: u32,
}

/// An owned copy of the tally at one point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TallySnapshot {
    pub limits: CapacityLimits,
    pub storytellers: Vec<UserId>,
    pub main_players: Vec<SlotEntry>,
    pub travelers: Vec<SlotEntry>,
    pub spectators: Vec<UserId>,
    pub novelty: BTreeMap<String, usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleGroup<'a> {
    pub category: RoleCategory,
    pub entries: Vec<SlotEntry>,
    pub count: u32,
    pub cap: Option<u32>,
    pub novelty: Option<&'a BTreeMap<String, usize>>,
}

impl TallySnapshot {
    pub fn main_player_slots(&self) -> u32 {
        self.main_players.iter().map(|e| e.slots).sum()
    }

    pub fn traveler_slots(&self) -> u32 {
        self.travelers.iter().map(|e| e.slots).sum()
    }

    pub fn novelty_count(&self) -> usize {
        self.novelty.values().sum()
    }

    /// Everyone who signed up for something other than a novelty reaction.
    pub fn participants(&self) -> BTreeSet<UserId> {
        self.storytellers
            .iter()
            .chain(self.main_players.iter().map(|e| &e.participant))
            .chain(self.travelers.iter().map(|e| &e.participant))
            .chain(self.spectators.iter())
            .copied()
            .collect()
    }

    /// Signups grouped by role. Can be iterated any number of times.
    pub fn groups(&self) -> impl Iterator<Item = RoleGroup<'_>> {
        let single = |users: &[UserId]| -> Vec<SlotEntry> {
            users
                .iter()
                .map(|participant| SlotEntry {
                    participant: *participant,
                    slots: 1,
                })
                .collect()
        };

        [
            RoleGroup {
                category: RoleCategory::Storyteller,
                entries: single(&self.storytellers),
                count: self.storytellers.len() as u32,
                cap: Some(self.limits.storytellers),
                novelty: None,
            },
            RoleGroup {
                category: RoleCategory::MainPlayer,
                entries: self.main_players.clone(),
                count: self.main_player_slots(),
                cap: Some(self.limits.main_players),
                novelty: None,
            },
            RoleGroup {
                category: RoleCategory::Traveler,
                entries: self.travelers.clone(),
                count: self.traveler_slots(),
                cap: Some(self.limits.travelers),
                novelty: None,
            },
            RoleGroup {
                category: RoleCategory::Spectator,
                entries: single(&self.spectators),
                count: self.spectators.len() as u32,
                cap: None,
                novelty: None,
            },
            RoleGroup {
                category: RoleCategory::Novelty,
                entries: Vec::new(),
                count: self.novelty_count() as u32,
                cap: None,
                novelty: Some(&self.novelty),
            },
        ]
        .into_iter()
    }
}
