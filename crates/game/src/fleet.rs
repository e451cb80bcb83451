use serde::{Deserialize, Serialize};

use crate::config::class_stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipClass {
    Destroyer,
    Cruiser,
    Battleship,
    Dreadnought,
}

impl ShipClass {
    /// Parses the client console shorthand: `de`, `cr`, `ba`, `dr`.
    pub fn from_shorthand(s: &str) -> Option<Self> {
        match s {
            "de" => Some(ShipClass::Destroyer),
            "cr" => Some(ShipClass::Cruiser),
            "ba" => Some(ShipClass::Battleship),
            "dr" => Some(ShipClass::Dreadnought),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composition {
    pub destroyers: u32,
    pub cruisers: u32,
    pub battleships: u32,
    pub dreadnoughts: u32,
}

impl Composition {
    pub fn starter() -> Self {
        Self {
            destroyers: 1,
            ..Default::default()
        }
    }

    pub fn total_ships(&self) -> u32 {
        self.destroyers + self.cruisers + self.battleships + self.dreadnoughts
    }

    pub fn count(&self, class: ShipClass) -> u32 {
        match class {
            ShipClass::Destroyer => self.destroyers,
            ShipClass::Cruiser => self.cruisers,
            ShipClass::Battleship => self.battleships,
            ShipClass::Dreadnought => self.dreadnoughts,
        }
    }

    pub fn plus_one(&self, class: ShipClass) -> Self {
        let mut next = *self;
        match class {
            ShipClass::Destroyer => next.destroyers += 1,
            ShipClass::Cruiser => next.cruisers += 1,
            ShipClass::Battleship => next.battleships += 1,
            ShipClass::Dreadnought => next.dreadnoughts += 1,
        }
        next
    }

    fn for_each(&self) -> [(ShipClass, u32); 4] {
        [
            (ShipClass::Destroyer, self.destroyers),
            (ShipClass::Cruiser, self.cruisers),
            (ShipClass::Battleship, self.battleships),
            (ShipClass::Dreadnought, self.dreadnoughts),
        ]
    }
}

/// Derived stats, recomputed whenever composition changes (spec §4.2). Kept
/// alongside the composition as a cache; callers must call `recompute` after
/// any change to composition rather than relying on stale values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetStats {
    pub max_health: u32,
    pub attack: u32,
    pub exattack: u32,
    pub evasion: u32,
    pub armor: u32,
}

/// Banker-safe mean: add half the ship count before integer division, matching
/// spec §4.2's rounding rule exactly.
fn weighted_mean(total: u32, ships: u32) -> u32 {
    if ships == 0 {
        0
    } else {
        (total + ships / 2) / ships
    }
}

pub fn recompute_stats(composition: Composition) -> FleetStats {
    let ships = composition.total_ships();
    let mut max_health = 0u32;
    let mut attack = 0u32;
    let mut exattack = 0u32;
    let mut evasion_total = 0u32;
    let mut armor_total = 0u32;

    for (class, count) in composition.for_each() {
        let stats = class_stats(class);
        max_health += stats.health * count;
        attack += stats.attack * count;
        exattack += stats.exattack * count;
        evasion_total += stats.evasion * count;
        armor_total += stats.armor * count;
    }

    FleetStats {
        max_health,
        attack,
        exattack,
        evasion: weighted_mean(evasion_total, ships),
        armor: weighted_mean(armor_total, ships),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fleet {
    pub id: u64,
    pub owner: String,
    pub health: u32,
    pub composition: Composition,
    pub stats: FleetStats,
    pub last_moved_tick: u64,
}

impl Fleet {
    pub fn new_starter(id: u64, owner: impl Into<String>) -> Self {
        let composition = Composition::starter();
        let stats = recompute_stats(composition);
        Self {
            id,
            owner: owner.into(),
            health: stats.max_health,
            composition,
            stats,
            last_moved_tick: 0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Adds one ship of `class` to the composition, applying spec §9 Q4's
    /// resolved ordering: the health delta is computed from the *pre-update*
    /// composition, added to current health, and only then is the
    /// composition (and cached stats) overwritten.
    pub fn add_ship(&mut self, class: ShipClass) {
        let old_stats = self.stats;
        let new_composition = self.composition.plus_one(class);
        let new_stats = recompute_stats(new_composition);

        let health_delta = new_stats.max_health as i64 - old_stats.max_health as i64;
        self.health = (self.health as i64 + health_delta).max(0) as u32;
        self.composition = new_composition;
        self.stats = new_stats;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starter_fleet_stats_match_one_destroyer() {
        let fleet = Fleet::new_starter(1, "alice");
        assert_eq!(fleet.stats.max_health, 50);
        assert_eq!(fleet.stats.attack, 2);
        assert_eq!(fleet.stats.exattack, 1);
        assert_eq!(fleet.stats.evasion, 35);
        assert_eq!(fleet.stats.armor, 5);
        assert_eq!(fleet.health, 50);
    }

    #[test]
    fn upgrade_to_cruiser_recomputes_stats() {
        let mut fleet = Fleet::new_starter(1, "alice");
        fleet.add_ship(ShipClass::Cruiser);

        assert_eq!(fleet.composition.destroyers, 1);
        assert_eq!(fleet.composition.cruisers, 1);
        assert_eq!(fleet.stats.max_health, 50 + 75);
        assert_eq!(fleet.stats.attack, 2 + 1);
        assert_eq!(fleet.stats.exattack, 1 + 2);
        // (35 + 20 + 1) / 2 = 28 with banker-safe rounding.
        assert_eq!(fleet.stats.evasion, 28);
        // (5 + 15 + 1) / 2 = 10.
        assert_eq!(fleet.stats.armor, 10);
        assert_eq!(fleet.health, 50 + 75);
    }

    #[test]
    fn empty_composition_has_zero_evasion_and_armor() {
        let stats = recompute_stats(Composition::default());
        assert_eq!(stats.evasion, 0);
        assert_eq!(stats.armor, 0);
        assert_eq!(stats.max_health, 0);
    }

    #[test]
    fn damaged_fleet_keeps_delta_on_upgrade() {
        let mut fleet = Fleet::new_starter(1, "alice");
        fleet.health = 10;
        fleet.add_ship(ShipClass::Destroyer);
        // max health 50 -> 100, delta +50 applied to current health.
        assert_eq!(fleet.health, 60);
        assert_eq!(fleet.stats.max_health, 100);
    }
}
