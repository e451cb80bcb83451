use serde::{Deserialize, Serialize};

use crate::fleet::FleetStats;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetMovement {
    pub fleet_id: u64,
    pub from_system_id: usize,
    pub to_system_id: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthUpdate {
    pub fleet_id: u64,
    pub system_id: usize,
    pub health: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetDestroyed {
    pub fleet_id: u64,
    pub system_id: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemOwnerChange {
    pub system_id: usize,
    pub owner: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetCreation {
    pub fleet_id: u64,
    pub system_id: usize,
    pub owner: String,
    pub attack: u32,
    pub exattack: u32,
    pub health: u32,
    pub evasion: u32,
    pub armor: u32,
}

impl FleetCreation {
    pub fn from_stats(fleet_id: u64, system_id: usize, owner: String, stats: FleetStats) -> Self {
        Self {
            fleet_id,
            system_id,
            owner,
            attack: stats.attack,
            exattack: stats.exattack,
            health: stats.max_health,
            evasion: stats.evasion,
            armor: stats.armor,
        }
    }
}

/// Emitted whenever a fleet's composition changes outside of combat (spec
/// §4.4's `fu` command), carrying the full recomputed stats so the client
/// replica's `ClientFleet::stats` never goes stale after an upgrade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetStatsUpdate {
    pub fleet_id: u64,
    pub system_id: usize,
    pub health: u32,
    pub max_health: u32,
    pub attack: u32,
    pub exattack: u32,
    pub evasion: u32,
    pub armor: u32,
}

impl FleetStatsUpdate {
    pub fn from_stats(fleet_id: u64, system_id: usize, health: u32, stats: FleetStats) -> Self {
        Self {
            fleet_id,
            system_id,
            health,
            max_health: stats.max_health,
            attack: stats.attack,
            exattack: stats.exattack,
            evasion: stats.evasion,
            armor: stats.armor,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GesUpdate {
    pub owner: String,
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Victory {
    pub winner: String,
}

/// The per-tick delta bundle, as broadcast on the wire (spec §3, §6). Every
/// field is optional: a fresh tick with nothing to report produces a bundle
/// whose accessors all return empty slices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fleet_movements: Option<Vec<FleetMovement>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_updates: Option<Vec<HealthUpdate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fleet_updates: Option<Vec<FleetStatsUpdate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fleet_destroyed: Option<Vec<FleetDestroyed>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_owner_changes: Option<Vec<SystemOwnerChange>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fleet_creations: Option<Vec<FleetCreation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ges_updates: Option<Vec<GesUpdate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub victory: Option<Victory>,
}

impl TickDelta {
    pub fn fleet_movements(&self) -> &[FleetMovement] {
        self.fleet_movements.as_deref().unwrap_or(&[])
    }
    pub fn health_updates(&self) -> &[HealthUpdate] {
        self.health_updates.as_deref().unwrap_or(&[])
    }
    pub fn fleet_updates(&self) -> &[FleetStatsUpdate] {
        self.fleet_updates.as_deref().unwrap_or(&[])
    }
    pub fn fleet_destroyed(&self) -> &[FleetDestroyed] {
        self.fleet_destroyed.as_deref().unwrap_or(&[])
    }
    pub fn system_owner_changes(&self) -> &[SystemOwnerChange] {
        self.system_owner_changes.as_deref().unwrap_or(&[])
    }
    pub fn fleet_creations(&self) -> &[FleetCreation] {
        self.fleet_creations.as_deref().unwrap_or(&[])
    }
    pub fn ges_updates(&self) -> &[GesUpdate] {
        self.ges_updates.as_deref().unwrap_or(&[])
    }
}

/// Accumulator built up over the course of a tick and drained into a
/// `TickDelta` at broadcast time (spec §9's "struct of slices" strategy).
#[derive(Debug, Clone, Default)]
pub struct DeltaBundle {
    pub fleet_movements: Vec<FleetMovement>,
    pub health_updates: Vec<HealthUpdate>,
    pub fleet_updates: Vec<FleetStatsUpdate>,
    pub fleet_destroyed: Vec<FleetDestroyed>,
    pub system_owner_changes: Vec<SystemOwnerChange>,
    pub fleet_creations: Vec<FleetCreation>,
    pub victory: Option<Victory>,
}

impl DeltaBundle {
    /// Keeps only the last owner-change recorded per system within this tick
    /// (spec §4.5 step 3).
    pub fn dedupe_owner_changes(&mut self) {
        let mut last_index = std::collections::HashMap::new();
        for (i, change) in self.system_owner_changes.iter().enumerate() {
            last_index.insert(change.system_id, i);
        }
        let mut kept_indices: Vec<usize> = last_index.values().copied().collect();
        kept_indices.sort_unstable();
        let kept: Vec<SystemOwnerChange> = kept_indices
            .into_iter()
            .map(|i| self.system_owner_changes[i].clone())
            .collect();
        self.system_owner_changes = kept;
    }

    pub fn is_empty(&self) -> bool {
        self.fleet_movements.is_empty()
            && self.health_updates.is_empty()
            && self.fleet_updates.is_empty()
            && self.fleet_destroyed.is_empty()
            && self.system_owner_changes.is_empty()
            && self.fleet_creations.is_empty()
            && self.victory.is_none()
    }

    /// Builds the base bundle for this tick; per-client `ges_updates` are
    /// appended by the caller once per recipient (spec §4.5 step 5).
    pub fn into_tick_delta(self) -> TickDelta {
        TickDelta {
            message: None,
            fleet_movements: (!self.fleet_movements.is_empty()).then_some(self.fleet_movements),
            health_updates: (!self.health_updates.is_empty()).then_some(self.health_updates),
            fleet_updates: (!self.fleet_updates.is_empty()).then_some(self.fleet_updates),
            fleet_destroyed: (!self.fleet_destroyed.is_empty()).then_some(self.fleet_destroyed),
            system_owner_changes: (!self.system_owner_changes.is_empty())
                .then_some(self.system_owner_changes),
            fleet_creations: (!self.fleet_creations.is_empty()).then_some(self.fleet_creations),
            ges_updates: None,
            victory: self.victory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_keeps_last_change_per_system() {
        let mut bundle = DeltaBundle::default();
        bundle.system_owner_changes.push(SystemOwnerChange {
            system_id: 5,
            owner: "none".into(),
        });
        bundle.system_owner_changes.push(SystemOwnerChange {
            system_id: 5,
            owner: "alice".into(),
        });
        bundle.system_owner_changes.push(SystemOwnerChange {
            system_id: 6,
            owner: "bob".into(),
        });
        bundle.dedupe_owner_changes();

        assert_eq!(bundle.system_owner_changes.len(), 2);
        let five = bundle
            .system_owner_changes
            .iter()
            .find(|c| c.system_id == 5)
            .unwrap();
        assert_eq!(five.owner, "alice");
    }

    #[test]
    fn empty_bundle_serializes_with_no_fields() {
        let bundle = DeltaBundle::default().into_tick_delta();
        let json = serde_json::to_string(&bundle).unwrap();
        assert_eq!(json, "{}");
    }
}
