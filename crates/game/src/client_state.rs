use std::collections::HashMap;

use crate::delta::TickDelta;
use crate::fleet::FleetStats;
use crate::galaxy::{Galaxy, UNOWNED};

/// A minimal client-side fleet replica. Composition is not tracked (the wire
/// protocol never sends it back down); only the stats and health needed to
/// render the battle map are kept.
#[derive(Debug, Clone)]
pub struct ClientFleet {
    pub id: u64,
    pub owner: String,
    pub system_id: usize,
    pub health: u32,
    pub stats: FleetStats,
}

#[derive(Debug, Clone, Default)]
pub struct ClientSystem {
    pub owner: String,
}

/// The client's read-only replica of the authoritative galaxy (spec §4.8).
/// State here is never mutated except by applying a `TickDelta` in the fixed
/// order the spec prescribes: movements, health, fleet stat updates,
/// destructions, owner changes, resources, creations, victory.
#[derive(Debug, Clone, Default)]
pub struct ClientState {
    pub fleets: HashMap<u64, ClientFleet>,
    pub systems: HashMap<usize, ClientSystem>,
    pub resources: HashMap<String, u64>,
    pub victor: Option<String>,
}

impl ClientState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populates the replica from the starting `LobbySnapshot`'s galaxy
    /// (spec §4.6/§4.8): the join response carries every system's owner and
    /// every starter fleet, which no subsequent `TickDelta` ever repeats.
    /// Without this, fleets the player hasn't yet moved or upgraded are
    /// invisible to the replica.
    pub fn seed(&mut self, galaxy: &Galaxy) {
        for system in &galaxy.systems {
            self.systems.insert(
                system.id,
                ClientSystem {
                    owner: system.owner.clone(),
                },
            );
            for fleet in &system.fleets {
                self.fleets.insert(
                    fleet.id,
                    ClientFleet {
                        id: fleet.id,
                        owner: fleet.owner.clone(),
                        system_id: system.id,
                        health: fleet.health,
                        stats: fleet.stats,
                    },
                );
            }
        }
    }

    pub fn apply(&mut self, delta: &TickDelta) {
        for movement in delta.fleet_movements() {
            if let Some(fleet) = self.fleets.get_mut(&movement.fleet_id) {
                fleet.system_id = movement.to_system_id;
            }
        }

        for update in delta.health_updates() {
            if let Some(fleet) = self.fleets.get_mut(&update.fleet_id) {
                fleet.health = update.health;
            }
        }

        for update in delta.fleet_updates() {
            if let Some(fleet) = self.fleets.get_mut(&update.fleet_id) {
                fleet.health = update.health;
                fleet.stats = FleetStats {
                    max_health: update.max_health,
                    attack: update.attack,
                    exattack: update.exattack,
                    evasion: update.evasion,
                    armor: update.armor,
                };
            }
        }

        for destroyed in delta.fleet_destroyed() {
            self.fleets.remove(&destroyed.fleet_id);
        }

        for change in delta.system_owner_changes() {
            self.systems
                .entry(change.system_id)
                .or_insert_with(|| ClientSystem {
                    owner: UNOWNED.to_string(),
                })
                .owner = change.owner.clone();
        }

        for update in delta.ges_updates() {
            self.resources.insert(update.owner.clone(), update.amount);
        }

        for creation in delta.fleet_creations() {
            self.fleets.insert(
                creation.fleet_id,
                ClientFleet {
                    id: creation.fleet_id,
                    owner: creation.owner.clone(),
                    system_id: creation.system_id,
                    health: creation.health,
                    stats: FleetStats {
                        max_health: creation.health,
                        attack: creation.attack,
                        exattack: creation.exattack,
                        evasion: creation.evasion,
                        armor: creation.armor,
                    },
                },
            );
        }

        if let Some(victory) = &delta.victory {
            self.victor = Some(victory.winner.clone());
        }
    }

    pub fn fleets_in_system(&self, system_id: usize) -> impl Iterator<Item = &ClientFleet> {
        self.fleets.values().filter(move |f| f.system_id == system_id)
    }

    pub fn owner_of(&self, system_id: usize) -> &str {
        self.systems
            .get(&system_id)
            .map(|s| s.owner.as_str())
            .unwrap_or(UNOWNED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{
        DeltaBundle, FleetCreation, FleetDestroyed, FleetMovement, GesUpdate, HealthUpdate,
        SystemOwnerChange, Victory,
    };
    use crate::fleet::FleetStats;

    #[test]
    fn applies_creation_then_movement_then_health_then_destruction() {
        let mut state = ClientState::new();
        let mut bundle = DeltaBundle::default();
        bundle.fleet_creations.push(FleetCreation::from_stats(
            1,
            0,
            "alice".to_string(),
            FleetStats {
                max_health: 50,
                attack: 2,
                exattack: 1,
                evasion: 35,
                armor: 5,
            },
        ));
        state.apply(&bundle.into_tick_delta());
        assert_eq!(state.fleets[&1].system_id, 0);

        let mut bundle = DeltaBundle::default();
        bundle.fleet_movements.push(FleetMovement {
            fleet_id: 1,
            from_system_id: 0,
            to_system_id: 5,
        });
        bundle.health_updates.push(HealthUpdate {
            fleet_id: 1,
            system_id: 5,
            health: 20,
        });
        state.apply(&bundle.into_tick_delta());
        assert_eq!(state.fleets[&1].system_id, 5);
        assert_eq!(state.fleets[&1].health, 20);

        let mut bundle = DeltaBundle::default();
        bundle.fleet_destroyed.push(FleetDestroyed {
            fleet_id: 1,
            system_id: 5,
        });
        state.apply(&bundle.into_tick_delta());
        assert!(!state.fleets.contains_key(&1));
    }

    #[test]
    fn seed_populates_fleets_and_systems_from_the_starting_galaxy() {
        use crate::fleet::Fleet;

        let mut galaxy = Galaxy::new(2, 1);
        galaxy.set_system_owner(0, "alice");
        galaxy.add_fleet_to_system(0, Fleet::new_starter(1, "alice"));

        let mut state = ClientState::new();
        state.seed(&galaxy);

        assert_eq!(state.owner_of(0), "alice");
        assert_eq!(state.fleets[&1].system_id, 0);
        assert_eq!(state.fleets[&1].owner, "alice");
    }

    #[test]
    fn owner_change_and_resources_and_victory_apply() {
        let mut state = ClientState::new();
        let mut bundle = DeltaBundle::default();
        bundle.system_owner_changes.push(SystemOwnerChange {
            system_id: 3,
            owner: "bob".to_string(),
        });
        bundle.victory = Some(Victory {
            winner: "bob".to_string(),
        });
        let mut delta = bundle.into_tick_delta();
        delta.ges_updates = Some(vec![GesUpdate {
            owner: "bob".to_string(),
            amount: 1234,
        }]);
        state.apply(&delta);

        assert_eq!(state.owner_of(3), "bob");
        assert_eq!(state.resources["bob"], 1234);
        assert_eq!(state.victor.as_deref(), Some("bob"));
    }
}
