use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::fleet::Fleet;

pub const UNOWNED: &str = "none";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct System {
    pub id: usize,
    pub x: u32,
    pub y: u32,
    pub owner: String,
    pub fleets: Vec<Fleet>,
}

impl System {
    fn new(id: usize, x: u32, y: u32) -> Self {
        Self {
            id,
            x,
            y,
            owner: UNOWNED.to_string(),
            fleets: Vec::new(),
        }
    }

    /// Distinct owners (excluding the unowned sentinel) with at least one
    /// living fleet present.
    pub fn living_owners(&self) -> HashSet<&str> {
        self.fleets
            .iter()
            .filter(|f| f.is_alive())
            .map(|f| f.owner.as_str())
            .collect()
    }

    pub fn living_fleets_of<'a>(&'a self, owner: &str) -> impl Iterator<Item = &'a Fleet> {
        self.fleets
            .iter()
            .filter(move |f| f.is_alive() && f.owner == owner)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerChange {
    pub system_id: usize,
    pub owner: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Galaxy {
    pub width: u32,
    pub height: u32,
    pub systems: Vec<System>,
}

impl Galaxy {
    pub fn new(width: u32, height: u32) -> Self {
        let mut systems = Vec::with_capacity((width * height) as usize);
        let mut id = 0usize;
        for y in 0..height {
            for x in 0..width {
                systems.push(System::new(id, x, y));
                id += 1;
            }
        }
        Self {
            width,
            height,
            systems,
        }
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    pub fn system_at(&self, x: u32, y: u32) -> &System {
        &self.systems[(y * self.width + x) as usize]
    }

    pub fn system(&self, id: usize) -> Option<&System> {
        self.systems.get(id)
    }

    pub fn system_mut(&mut self, id: usize) -> Option<&mut System> {
        self.systems.get_mut(id)
    }

    pub fn is_valid_system(&self, id: usize) -> bool {
        id < self.systems.len()
    }

    /// Sets the owner of `id`, returning an `OwnerChange` only if the owner
    /// actually differs (spec §4.1, and the no-op law of spec §8).
    pub fn set_system_owner(&mut self, id: usize, owner: &str) -> Option<OwnerChange> {
        let system = self.systems.get_mut(id)?;
        if system.owner == owner {
            return None;
        }
        system.owner = owner.to_string();
        Some(OwnerChange {
            system_id: id,
            owner: owner.to_string(),
        })
    }

    pub fn add_fleet_to_system(&mut self, id: usize, fleet: Fleet) {
        if let Some(system) = self.systems.get_mut(id) {
            system.fleets.push(fleet);
        }
    }

    pub fn remove_fleet_from_system(&mut self, system_id: usize, fleet_id: u64) -> Option<Fleet> {
        let system = self.systems.get_mut(system_id)?;
        let pos = system.fleets.iter().position(|f| f.id == fleet_id)?;
        Some(system.fleets.remove(pos))
    }

    pub fn get_fleet(&self, system_id: usize, fleet_id: u64) -> Option<&Fleet> {
        self.systems
            .get(system_id)?
            .fleets
            .iter()
            .find(|f| f.id == fleet_id)
    }

    pub fn get_fleet_mut(&mut self, system_id: usize, fleet_id: u64) -> Option<&mut Fleet> {
        self.systems
            .get_mut(system_id)?
            .fleets
            .iter_mut()
            .find(|f| f.id == fleet_id)
    }

    /// True iff at least two distinct non-empty owners have at least one
    /// living fleet in this system (spec §4.1).
    pub fn should_battle_begin(&self, system_id: usize) -> bool {
        self.systems
            .get(system_id)
            .map(|s| s.living_owners().len() >= 2)
            .unwrap_or(false)
    }

    /// The sole surviving owner of a system, or `None` (sentinel) if the
    /// system is empty of living fleets, per spec §4.3 step 1.
    pub fn surviving_owner(&self, system_id: usize) -> String {
        let Some(system) = self.systems.get(system_id) else {
            return UNOWNED.to_string();
        };
        let owners = system.living_owners();
        match owners.len() {
            1 => owners.into_iter().next().unwrap().to_string(),
            _ => UNOWNED.to_string(),
        }
    }

    pub fn owned_system_count(&self, player: &str) -> usize {
        self.systems.iter().filter(|s| s.owner == player).count()
    }

    /// Starting-system assignment from the galaxy corners (spec §4.1),
    /// matching the original's corner order per player count: 2 players get
    /// the two opposite corners top-left/bottom-right; 3 and 4 players both
    /// start from top-left, top-right, bottom-left, with 4 adding
    /// bottom-right last.
    pub fn corner_ids(&self, player_count: usize) -> Vec<usize> {
        let top_left = 0usize;
        let top_right = (self.width - 1) as usize;
        let bottom_left = (self.width * (self.height - 1)) as usize;
        let bottom_right = (self.width * self.height - 1) as usize;

        match player_count {
            2 => vec![top_left, bottom_right],
            3 => vec![top_left, top_right, bottom_left],
            4 => vec![top_left, top_right, bottom_left, bottom_right],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_id_equals_row_major_index() {
        let galaxy = Galaxy::new(5, 5);
        assert_eq!(galaxy.system_at(3, 2).id, 2 * 5 + 3);
    }

    #[test]
    fn set_owner_noop_produces_no_delta() {
        let mut galaxy = Galaxy::new(5, 5);
        assert!(galaxy.set_system_owner(0, "alice").is_some());
        assert!(galaxy.set_system_owner(0, "alice").is_none());
    }

    #[test]
    fn should_battle_begin_requires_two_owners() {
        let mut galaxy = Galaxy::new(5, 5);
        galaxy.add_fleet_to_system(0, Fleet::new_starter(1, "alice"));
        assert!(!galaxy.should_battle_begin(0));
        galaxy.add_fleet_to_system(0, Fleet::new_starter(2, "bob"));
        assert!(galaxy.should_battle_begin(0));
    }

    #[test]
    fn corner_assignment_for_two_players() {
        let galaxy = Galaxy::new(5, 5);
        assert_eq!(galaxy.corner_ids(2), vec![0, 24]);
    }
}
