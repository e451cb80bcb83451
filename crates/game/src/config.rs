use crate::fleet::ShipClass;

/// Per-class balance numbers: cost, max health, primary/secondary attack, evasion, armor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassStats {
    pub cost: u64,
    pub health: u32,
    pub attack: u32,
    pub exattack: u32,
    pub evasion: u32,
    pub armor: u32,
}

const DESTROYER: ClassStats = ClassStats {
    cost: 100,
    health: 50,
    attack: 2,
    exattack: 1,
    evasion: 35,
    armor: 5,
};

const CRUISER: ClassStats = ClassStats {
    cost: 350,
    health: 75,
    attack: 1,
    exattack: 2,
    evasion: 20,
    armor: 15,
};

const BATTLESHIP: ClassStats = ClassStats {
    cost: 700,
    health: 150,
    attack: 4,
    exattack: 3,
    evasion: 10,
    armor: 30,
};

const DREADNOUGHT: ClassStats = ClassStats {
    cost: 1200,
    health: 300,
    attack: 8,
    exattack: 6,
    evasion: 5,
    armor: 45,
};

pub fn class_stats(class: ShipClass) -> ClassStats {
    match class {
        ShipClass::Destroyer => DESTROYER,
        ShipClass::Cruiser => CRUISER,
        ShipClass::Battleship => BATTLESHIP,
        ShipClass::Dreadnought => DREADNOUGHT,
    }
}

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub max_players: u8,
    pub galaxy_width: u32,
    pub galaxy_height: u32,
    pub initial_resources: u64,
    pub resource_accrual_per_tick: u64,
    pub tick_period_ms: u64,
    pub fleet_creation_cost: u64,
    pub movement_cooldown_ticks: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_players: 2,
            galaxy_width: 5,
            galaxy_height: 5,
            initial_resources: 1000,
            resource_accrual_per_tick: 2,
            tick_period_ms: 500,
            fleet_creation_cost: 1000,
            movement_cooldown_ticks: 10,
        }
    }
}

impl GameConfig {
    pub fn system_count(&self) -> usize {
        (self.galaxy_width * self.galaxy_height) as usize
    }
}
