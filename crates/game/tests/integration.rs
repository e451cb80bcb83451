use starbit_core::{
    AuthoritativeState, ClientState, Command, GameConfig, JoinOutcome, ShipClass,
};

fn tiny_config() -> GameConfig {
    GameConfig {
        max_players: 2,
        galaxy_width: 2,
        galaxy_height: 1,
        initial_resources: 5000,
        resource_accrual_per_tick: 10,
        tick_period_ms: 10,
        fleet_creation_cost: 100,
        movement_cooldown_ticks: 1,
    }
}

#[test]
fn two_players_fight_over_the_only_contested_system_until_victory() {
    let mut state = AuthoritativeState::new(tiny_config());
    assert_eq!(state.join("alice").unwrap(), JoinOutcome::Waiting);
    assert_eq!(state.join("bob").unwrap(), JoinOutcome::GameStarted);

    // Corners of a 2x1 galaxy: alice -> system 0, bob -> system 1.
    assert_eq!(state.galaxy.system(0).unwrap().owner, "alice");
    assert_eq!(state.galaxy.system(1).unwrap().owner, "bob");

    // Bob sends his starter fleet into alice's system, provoking a battle.
    state
        .apply_command(
            "bob",
            Command::FleetMovement {
                fleet_id: 2,
                from_system_id: 1,
                to_system_id: 0,
            },
        )
        .unwrap();

    let mut client = ClientState::new();
    let mut ticks = 0;
    let winner = loop {
        let (delta, _) = state.run_tick().expect("game is running");
        client.apply(&delta);
        ticks += 1;
        if let Some(winner) = client.victor.clone() {
            break winner;
        }
        assert!(ticks < 1000, "combat should resolve well within 1000 ticks");
    };

    assert!(winner == "alice" || winner == "bob");
    // Victory resets the server to a fresh, empty lobby (spec §4.9).
    assert!(!state.started);
    assert_eq!(state.player_count(), 0);
}

#[test]
fn fleet_creation_and_upgrade_round_trip_through_the_client_replica() {
    let mut state = AuthoritativeState::new(tiny_config());
    state.join("alice").unwrap();
    state.join("bob").unwrap();

    state
        .apply_command("alice", Command::FleetCreation { system_id: 0 })
        .unwrap();
    let (delta, _) = state.run_tick().unwrap();

    let mut client = ClientState::new();
    client.apply(&delta);
    let created = delta.fleet_creations().first().unwrap();
    assert!(client.fleets.contains_key(&created.fleet_id));

    state
        .apply_command(
            "alice",
            Command::FleetModification {
                fleet_id: created.fleet_id,
                system_id: 0,
                ship_type: ShipClass::Cruiser,
            },
        )
        .unwrap();
    let (delta, _) = state.run_tick().unwrap();
    client.apply(&delta);

    let fleet = &client.fleets[&created.fleet_id];
    assert_eq!(fleet.health, 50 + 75);
}

#[test]
fn resources_accrue_across_ticks_for_both_players() {
    let mut state = AuthoritativeState::new(tiny_config());
    state.join("alice").unwrap();
    state.join("bob").unwrap();

    for _ in 0..5 {
        state.run_tick();
    }

    assert_eq!(state.resource_balance("alice"), 5000 + 5 * 10);
    assert_eq!(state.resource_balance("bob"), 5000 + 5 * 10);
}
