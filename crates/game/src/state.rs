use std::collections::{HashMap, HashSet};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::combat;
use crate::command::Command;
use crate::config::{GameConfig, class_stats};
use crate::delta::{
    DeltaBundle, FleetCreation, FleetMovement, GesUpdate, SystemOwnerChange, TickDelta, Victory,
};
use crate::error::{CommandError, LobbyError};
use crate::fleet::Fleet;
use crate::galaxy::{Galaxy, UNOWNED};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
}

/// Outcome of a join attempt, telling the caller whether this join just
/// filled the lobby to capacity (spec §4.6 / original `AddPlayer`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Waiting,
    GameStarted,
}

/// The single source of truth for one game (spec §3). Every mutator and
/// every reader that composes a coherent snapshot is expected to run under
/// the caller's lock around this struct (the server wraps it in
/// `tokio::sync::Mutex`).
pub struct AuthoritativeState {
    pub config: GameConfig,
    pub players: HashMap<String, Player>,
    pub started: bool,
    pub galaxy: Galaxy,
    pub next_fleet_id: u64,
    resources: HashMap<String, u64>,
    owned_systems_index: HashMap<String, HashSet<usize>>,
    moved_this_tick: HashSet<u64>,
    pub battling_systems: HashSet<usize>,
    pub tick: u64,
    pending: DeltaBundle,
    rng: StdRng,
}

impl AuthoritativeState {
    pub fn new(config: GameConfig) -> Self {
        let galaxy = Galaxy::new(config.galaxy_width, config.galaxy_height);
        Self {
            players: HashMap::new(),
            started: false,
            galaxy,
            next_fleet_id: 1,
            resources: HashMap::new(),
            owned_systems_index: HashMap::new(),
            moved_this_tick: HashSet::new(),
            battling_systems: HashSet::new(),
            tick: 0,
            pending: DeltaBundle::default(),
            rng: StdRng::from_entropy(),
            config,
        }
    }

    pub fn player_count(&self) -> u8 {
        self.players.len() as u8
    }

    pub fn resource_balance(&self, name: &str) -> u64 {
        self.resources.get(name).copied().unwrap_or(0)
    }

    /// Registers a new player (spec §4.6 Join). Returns whether this join
    /// filled the game to capacity, in which case the caller is responsible
    /// for calling `initialize_game` and broadcasting the started snapshot.
    pub fn join(&mut self, name: &str) -> Result<JoinOutcome, LobbyError> {
        if self.started {
            return Err(LobbyError::AlreadyStarted);
        }
        if self.players.contains_key(name) {
            return Err(LobbyError::UsernameTaken(name.to_string()));
        }
        if self.players.len() >= self.config.max_players as usize {
            return Err(LobbyError::GameFull(self.config.max_players));
        }

        self.players.insert(
            name.to_string(),
            Player {
                name: name.to_string(),
            },
        );
        self.resources
            .insert(name.to_string(), self.config.initial_resources);
        self.owned_systems_index
            .insert(name.to_string(), HashSet::new());

        if self.players.len() == self.config.max_players as usize {
            self.initialize_game();
            Ok(JoinOutcome::GameStarted)
        } else {
            Ok(JoinOutcome::Waiting)
        }
    }

    /// Removes a player whose reliable stream ended (spec §4.10). Their
    /// resources and owned-systems index are destroyed with them; any fleets
    /// they still own remain in the galaxy (ownership is tracked per-system,
    /// not revoked retroactively — the spec makes no provision for orphaned
    /// fleets since this only happens mid-lobby or the player simply quits).
    pub fn remove_player(&mut self, name: &str) {
        self.players.remove(name);
        self.resources.remove(name);
        self.owned_systems_index.remove(name);
    }

    /// Assigns starting systems and starter fleets from the galaxy corners
    /// (spec §4.1), then marks the game started.
    fn initialize_game(&mut self) {
        let mut names: Vec<String> = self.players.keys().cloned().collect();
        names.sort();
        let corners = self.galaxy.corner_ids(names.len());

        for (name, system_id) in names.into_iter().zip(corners) {
            self.galaxy.set_system_owner(system_id, &name);
            self.owned_systems_index
                .entry(name.clone())
                .or_default()
                .insert(system_id);
            let fleet_id = self.allocate_fleet_id();
            self.galaxy
                .add_fleet_to_system(system_id, Fleet::new_starter(fleet_id, name));
        }
        self.started = true;
    }

    fn allocate_fleet_id(&mut self) -> u64 {
        let id = self.next_fleet_id;
        self.next_fleet_id += 1;
        id
    }

    fn record_owner_change_on_index(&mut self, system_id: usize, old_owner: &str, new_owner: &str) {
        if old_owner != UNOWNED {
            if let Some(set) = self.owned_systems_index.get_mut(old_owner) {
                set.remove(&system_id);
            }
        }
        if new_owner != UNOWNED {
            self.owned_systems_index
                .entry(new_owner.to_string())
                .or_default()
                .insert(system_id);
        }
    }

    fn set_owner_tracked(&mut self, system_id: usize, new_owner: &str) -> Option<SystemOwnerChange> {
        let old_owner = self
            .galaxy
            .system(system_id)
            .map(|s| s.owner.clone())
            .unwrap_or_else(|| UNOWNED.to_string());
        let change = self.galaxy.set_system_owner(system_id, new_owner)?;
        self.record_owner_change_on_index(system_id, &old_owner, new_owner);
        Some(change)
    }

    // ---- Command intake (spec §4.4) ----

    pub fn apply_command(&mut self, sender: &str, command: Command) -> Result<(), CommandError> {
        if !self.started {
            return Err(CommandError::NotStarted);
        }
        if !self.players.contains_key(sender) {
            return Err(CommandError::UnknownPlayer(sender.to_string()));
        }
        match command {
            Command::FleetMovement {
                fleet_id,
                from_system_id,
                to_system_id,
            } => self.apply_fleet_movement(sender, fleet_id, from_system_id, to_system_id),
            Command::FleetCreation { system_id } => self.apply_fleet_creation(sender, system_id),
            Command::FleetModification {
                fleet_id,
                system_id,
                ship_type,
            } => self.apply_fleet_modification(sender, fleet_id, system_id, ship_type),
        }
    }

    fn apply_fleet_movement(
        &mut self,
        sender: &str,
        fleet_id: u64,
        from_system_id: usize,
        to_system_id: usize,
    ) -> Result<(), CommandError> {
        if !self.galaxy.is_valid_system(from_system_id) {
            return Err(CommandError::SystemOutOfRange(from_system_id));
        }
        if !self.galaxy.is_valid_system(to_system_id) {
            return Err(CommandError::SystemOutOfRange(to_system_id));
        }
        if self.moved_this_tick.contains(&fleet_id) {
            return Err(CommandError::AlreadyMoved(fleet_id));
        }
        if self.battling_systems.contains(&from_system_id) {
            return Err(CommandError::SystemBattling(from_system_id));
        }

        let fleet = self
            .galaxy
            .get_fleet(from_system_id, fleet_id)
            .ok_or(CommandError::FleetNotFound(fleet_id, from_system_id))?;
        if fleet.owner != sender {
            return Err(CommandError::NotOwner(fleet_id, sender.to_string()));
        }
        let last_moved = fleet.last_moved_tick;
        if last_moved != 0 && self.tick.saturating_sub(last_moved) < self.config.movement_cooldown_ticks
        {
            let remaining = self.config.movement_cooldown_ticks - (self.tick - last_moved);
            return Err(CommandError::OnCooldown {
                fleet_id,
                remaining,
            });
        }

        let mut fleet = self
            .galaxy
            .remove_fleet_from_system(from_system_id, fleet_id)
            .expect("fleet presence was just checked");
        fleet.last_moved_tick = self.tick;
        self.galaxy.add_fleet_to_system(to_system_id, fleet);
        self.moved_this_tick.insert(fleet_id);

        self.pending.fleet_movements.push(FleetMovement {
            fleet_id,
            from_system_id,
            to_system_id,
        });

        // Post-move ownership logic on the destination (spec §4.4).
        if self.galaxy.should_battle_begin(to_system_id) {
            self.battling_systems.insert(to_system_id);
            if let Some(change) = self.set_owner_tracked(to_system_id, UNOWNED) {
                self.pending.system_owner_changes.push(change);
            }
        } else {
            let owner = self.galaxy.surviving_owner(to_system_id);
            if owner != UNOWNED {
                if let Some(change) = self.set_owner_tracked(to_system_id, &owner) {
                    self.pending.system_owner_changes.push(change);
                }
            }
        }

        Ok(())
    }

    fn apply_fleet_creation(&mut self, sender: &str, system_id: usize) -> Result<(), CommandError> {
        if !self.galaxy.is_valid_system(system_id) {
            return Err(CommandError::SystemOutOfRange(system_id));
        }
        let owner = self
            .galaxy
            .system(system_id)
            .map(|s| s.owner.clone())
            .unwrap_or_else(|| UNOWNED.to_string());
        if owner != sender {
            return Err(CommandError::SystemNotOwned(system_id, sender.to_string()));
        }
        let cost = self.config.fleet_creation_cost;
        let balance = self.resource_balance(sender);
        if balance < cost {
            return Err(CommandError::InsufficientResources {
                have: balance,
                need: cost,
            });
        }

        self.resources.insert(sender.to_string(), balance - cost);
        let fleet_id = self.allocate_fleet_id();
        let fleet = Fleet::new_starter(fleet_id, sender);
        let stats = fleet.stats;
        self.galaxy.add_fleet_to_system(system_id, fleet);

        self.pending.fleet_creations.push(FleetCreation::from_stats(
            fleet_id,
            system_id,
            sender.to_string(),
            stats,
        ));

        Ok(())
    }

    fn apply_fleet_modification(
        &mut self,
        sender: &str,
        fleet_id: u64,
        system_id: usize,
        ship_type: crate::fleet::ShipClass,
    ) -> Result<(), CommandError> {
        if !self.galaxy.is_valid_system(system_id) {
            return Err(CommandError::SystemOutOfRange(system_id));
        }
        let fleet = self
            .galaxy
            .get_fleet(system_id, fleet_id)
            .ok_or(CommandError::FleetNotFound(fleet_id, system_id))?;
        if fleet.owner != sender {
            return Err(CommandError::NotOwner(fleet_id, sender.to_string()));
        }

        let cost = class_stats(ship_type).cost;
        let balance = self.resource_balance(sender);
        if balance < cost {
            return Err(CommandError::InsufficientResources {
                have: balance,
                need: cost,
            });
        }

        self.resources.insert(sender.to_string(), balance - cost);
        let fleet = self
            .galaxy
            .get_fleet_mut(system_id, fleet_id)
            .expect("fleet presence was just checked");
        fleet.add_ship(ship_type);
        let health = fleet.health;
        let stats = fleet.stats;

        self.pending
            .fleet_updates
            .push(crate::delta::FleetStatsUpdate::from_stats(
                fleet_id, system_id, health, stats,
            ));

        Ok(())
    }

    // ---- Tick broadcaster (spec §4.5) ----

    /// Runs one tick: resolves combat, dedupes owner changes, checks
    /// victory, accrues resources, and returns the base bundle plus a
    /// per-player `GesUpdate` for every player who was in the game *before*
    /// this tick's victory reset (if any). A victory tick resets `self` back
    /// to a fresh lobby before returning, so the caller must use this
    /// pre-reset roster rather than re-reading `player_names()` afterwards —
    /// otherwise the final delta (carrying the owner changes and the
    /// `victory` field itself) would be sent to nobody (spec §4.9).
    /// Returns `None` if the game has not started (lobby phase — the
    /// broadcaster should skip this firing).
    pub fn run_tick(&mut self) -> Option<(TickDelta, Vec<GesUpdate>)> {
        if !self.started {
            return None;
        }

        let battling: Vec<usize> = self.battling_systems.iter().copied().collect();
        let mut still_battling = HashSet::new();
        for system_id in battling {
            let active =
                combat::resolve_system(&mut self.galaxy, system_id, &mut self.rng, &mut self.pending);
            if active {
                still_battling.insert(system_id);
            } else {
                let owner = self.galaxy.system(system_id).map(|s| s.owner.clone()).unwrap_or_default();
                self.record_owner_change_on_index(system_id, UNOWNED, &owner);
            }
        }
        self.battling_systems = still_battling;

        self.pending.dedupe_owner_changes();

        let total_systems = self.galaxy.system_count();
        let victor = self
            .players
            .keys()
            .find(|name| self.galaxy.owned_system_count(name) == total_systems)
            .cloned();
        if let Some(winner) = &victor {
            self.pending.victory = Some(Victory {
                winner: winner.clone(),
            });
        }

        for name in self.players.keys().cloned().collect::<Vec<_>>() {
            let balance = self.resource_balance(&name) + self.config.resource_accrual_per_tick;
            self.resources.insert(name, balance);
        }

        let ges_updates: Vec<GesUpdate> = self
            .players
            .keys()
            .map(|name| self.ges_update_for(name))
            .collect();

        let bundle = std::mem::take(&mut self.pending);
        let tick_delta = bundle.into_tick_delta();

        self.moved_this_tick.clear();
        self.tick += 1;

        if victor.is_some() {
            self.reset_to_lobby();
        }

        Some((tick_delta, ges_updates))
    }

    pub fn player_names(&self) -> Vec<String> {
        self.players.keys().cloned().collect()
    }

    pub fn ges_update_for(&self, name: &str) -> GesUpdate {
        GesUpdate {
            owner: name.to_string(),
            amount: self.resource_balance(name),
        }
    }

    /// Replaces this state with a fresh lobby (spec §4.9: Victory -> Lobby
    /// on the same tick boundary).
    fn reset_to_lobby(&mut self) {
        let config = self.config.clone();
        *self = AuthoritativeState::new(config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::ShipClass;

    fn two_player_started_state() -> AuthoritativeState {
        let mut state = AuthoritativeState::new(GameConfig::default());
        assert_eq!(state.join("alice").unwrap(), JoinOutcome::Waiting);
        assert_eq!(state.join("bob").unwrap(), JoinOutcome::GameStarted);
        state
    }

    #[test]
    fn join_fills_lobby_and_assigns_corners() {
        let state = two_player_started_state();
        assert!(state.started);
        assert_eq!(state.galaxy.system(0).unwrap().owner, "alice");
        assert_eq!(state.galaxy.system(24).unwrap().owner, "bob");
        assert_eq!(state.galaxy.system(0).unwrap().fleets.len(), 1);
    }

    #[test]
    fn third_join_is_rejected_after_start() {
        let mut state = two_player_started_state();
        assert_eq!(
            state.join("carol"),
            Err(LobbyError::AlreadyStarted)
        );
    }

    #[test]
    fn duplicate_username_rejected() {
        let mut state = AuthoritativeState::new(GameConfig::default());
        state.join("alice").unwrap();
        assert_eq!(
            state.join("alice"),
            Err(LobbyError::UsernameTaken("alice".to_string()))
        );
    }

    #[test]
    fn movement_then_cooldown_rejects_immediate_second_move() {
        let mut state = two_player_started_state();
        state
            .apply_command(
                "alice",
                Command::FleetMovement {
                    fleet_id: 1,
                    from_system_id: 0,
                    to_system_id: 5,
                },
            )
            .unwrap();
        let (delta, _) = state.run_tick().unwrap();
        assert_eq!(delta.fleet_movements().len(), 1);
        assert_eq!(delta.system_owner_changes()[0].owner, "alice");

        let err = state
            .apply_command(
                "alice",
                Command::FleetMovement {
                    fleet_id: 1,
                    from_system_id: 5,
                    to_system_id: 6,
                },
            )
            .unwrap_err();
        assert!(matches!(err, CommandError::OnCooldown { .. }));
    }

    #[test]
    fn fleet_creation_debits_resources_and_emits_delta() {
        let mut state = two_player_started_state();
        state
            .apply_command("alice", Command::FleetCreation { system_id: 0 })
            .unwrap();
        assert_eq!(state.resource_balance("alice"), 0);
        let (delta, _) = state.run_tick().unwrap();
        assert_eq!(delta.fleet_creations().len(), 1);
    }

    #[test]
    fn creation_on_unowned_system_rejected() {
        let mut state = two_player_started_state();
        let err = state
            .apply_command("alice", Command::FleetCreation { system_id: 12 })
            .unwrap_err();
        assert!(matches!(err, CommandError::SystemNotOwned(..)));
    }

    #[test]
    fn upgrade_fails_without_enough_resources() {
        let mut state = two_player_started_state();
        // Drain alice's resources via ten creations (1000 each) first.
        let err = state
            .apply_command(
                "alice",
                Command::FleetModification {
                    fleet_id: 1,
                    system_id: 0,
                    ship_type: ShipClass::Dreadnought,
                },
            )
            .unwrap_err();
        assert!(matches!(err, CommandError::InsufficientResources { .. }));
    }

    #[test]
    fn resources_accrue_every_tick() {
        let mut state = two_player_started_state();
        for _ in 0..10 {
            state.run_tick();
        }
        assert_eq!(state.resource_balance("alice"), 1000 + 10 * 2);
    }

    #[test]
    fn victory_resets_state_to_fresh_lobby() {
        let mut state = two_player_started_state();
        // Force alice to own every system directly (bypassing movement for
        // brevity in this unit test).
        let ids: Vec<usize> = (0..state.galaxy.system_count()).collect();
        for id in ids {
            state.galaxy.set_system_owner(id, "alice");
        }
        let (delta, _) = state.run_tick().unwrap();
        assert_eq!(delta.victory.unwrap().winner, "alice");
        assert!(!state.started);
        assert!(state.players.is_empty());
    }
}
