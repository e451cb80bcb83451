use std::collections::HashMap;

use rand::Rng;

use crate::delta::{DeltaBundle, FleetDestroyed, HealthUpdate, SystemOwnerChange};
use crate::galaxy::{Galaxy, UNOWNED};

/// A single combat step for one contested system (spec §4.3). Returns
/// `true` if the system is still battling after this step (remains in the
/// caller's battling-systems set).
pub fn resolve_system(
    galaxy: &mut Galaxy,
    system_id: usize,
    rng: &mut impl Rng,
    bundle: &mut DeltaBundle,
) -> bool {
    let still_battling_before = galaxy.should_battle_begin(system_id);
    if !still_battling_before {
        let winner = galaxy.surviving_owner(system_id);
        if let Some(change) = galaxy.set_system_owner(system_id, &winner) {
            bundle.system_owner_changes.push(SystemOwnerChange {
                system_id: change.system_id,
                owner: change.owner,
            });
        }
        return false;
    }

    let Some(system) = galaxy.system(system_id) else {
        return false;
    };

    // Group living fleets by owner (insertion order preserved via Vec).
    let mut fleets_by_owner: HashMap<String, Vec<u64>> = HashMap::new();
    for fleet in system.fleets.iter().filter(|f| f.is_alive()) {
        fleets_by_owner
            .entry(fleet.owner.clone())
            .or_default()
            .push(fleet.id);
    }

    // Precompute each fleet's attacker-side stats (armor/evasion of the
    // target are read fresh per strike since damage can kill fleets
    // mid-resolution; attacker stats are snapshotted up front so that an
    // attacker already damaged this phase still attacks with its pre-battle
    // stats, matching "every fleet acts once" semantics).
    let attackers: Vec<(u64, String, u32, u32)> = system
        .fleets
        .iter()
        .filter(|f| f.is_alive())
        .map(|f| (f.id, f.owner.clone(), f.stats.attack, f.stats.exattack))
        .collect();

    let mut touched_ids: std::collections::HashSet<u64> = std::collections::HashSet::new();

    for (attacker_id, owner, attack, exattack) in attackers {
        let enemy_ids: Vec<u64> = fleets_by_owner
            .iter()
            .filter(|(o, _)| **o != owner)
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();
        if enemy_ids.is_empty() {
            continue;
        }
        let target_id = enemy_ids[rng.gen_range(0..enemy_ids.len())];

        let Some(system) = galaxy.system_mut(system_id) else {
            continue;
        };
        let Some(target) = system.fleets.iter_mut().find(|f| f.id == target_id) else {
            continue;
        };
        if !target.is_alive() {
            continue;
        }

        let armor = target.stats.armor.min(100);
        let evasion = target.stats.evasion;

        // Phase A: primary attack, evadable.
        let primary_damage = attack * (100 - armor) / 100;
        let roll: u32 = rng.gen_range(0..100);
        if roll > evasion {
            target.health = target.health.saturating_sub(primary_damage);
        }

        // Phase B: secondary attack, always applies.
        let secondary_damage = exattack * (100 - armor) / 100;
        target.health = target.health.saturating_sub(secondary_damage);

        touched_ids.insert(target_id);
        let _ = attacker_id;
    }

    // Emit destruction or health-update events only for fleets actually
    // struck this step; bystanders sharing the system are left alone (spec
    // §4.3 step 4's "every touched enemy fleet").
    let Some(system) = galaxy.system_mut(system_id) else {
        return false;
    };
    let mut dead_ids = Vec::new();
    for fleet in system.fleets.iter() {
        if fleet.health == 0 {
            dead_ids.push(fleet.id);
        } else if touched_ids.contains(&fleet.id) {
            bundle.health_updates.push(HealthUpdate {
                fleet_id: fleet.id,
                system_id,
                health: fleet.health,
            });
        }
    }
    for fleet_id in &dead_ids {
        galaxy.remove_fleet_from_system(system_id, *fleet_id);
        bundle.fleet_destroyed.push(FleetDestroyed {
            fleet_id: *fleet_id,
            system_id,
        });
    }
    // Health updates for fleets that died this step are meaningless; the
    // destruction event supersedes them. Drop any we queued before death.
    let dead_set: std::collections::HashSet<u64> = dead_ids.into_iter().collect();
    bundle
        .health_updates
        .retain(|h| !(h.system_id == system_id && dead_set.contains(&h.fleet_id)));

    let still_battling_after = galaxy.should_battle_begin(system_id);
    if still_battling_after {
        if let Some(change) = galaxy.set_system_owner(system_id, UNOWNED) {
            bundle.system_owner_changes.push(SystemOwnerChange {
                system_id: change.system_id,
                owner: change.owner,
            });
        }
        true
    } else {
        let winner = galaxy.surviving_owner(system_id);
        if let Some(change) = galaxy.set_system_owner(system_id, &winner) {
            bundle.system_owner_changes.push(SystemOwnerChange {
                system_id: change.system_id,
                owner: change.owner,
            });
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::Fleet;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn battle_with_one_owner_resolves_immediately() {
        let mut galaxy = Galaxy::new(5, 5);
        galaxy.add_fleet_to_system(0, Fleet::new_starter(1, "alice"));
        let mut bundle = DeltaBundle::default();
        let mut rng = StdRng::seed_from_u64(1);
        let still_battling = resolve_system(&mut galaxy, 0, &mut rng, &mut bundle);
        assert!(!still_battling);
        assert_eq!(galaxy.system(0).unwrap().owner, "alice");
    }

    #[test]
    fn empty_system_resolves_to_unowned() {
        let mut galaxy = Galaxy::new(5, 5);
        let mut bundle = DeltaBundle::default();
        let mut rng = StdRng::seed_from_u64(1);
        let still_battling = resolve_system(&mut galaxy, 0, &mut rng, &mut bundle);
        assert!(!still_battling);
        assert_eq!(galaxy.system(0).unwrap().owner, UNOWNED);
    }

    #[test]
    fn two_owners_eventually_resolve_to_one_survivor() {
        let mut galaxy = Galaxy::new(5, 5);
        galaxy.add_fleet_to_system(0, Fleet::new_starter(1, "alice"));
        galaxy.add_fleet_to_system(0, Fleet::new_starter(2, "bob"));
        let mut rng = StdRng::seed_from_u64(42);

        let mut ticks = 0;
        loop {
            let mut bundle = DeltaBundle::default();
            let still_battling = resolve_system(&mut galaxy, 0, &mut rng, &mut bundle);
            ticks += 1;
            if !still_battling {
                break;
            }
            assert!(ticks < 10_000, "combat should terminate");
        }

        let owner = galaxy.system(0).unwrap().owner.clone();
        assert!(owner == "alice" || owner == "bob");
        assert_eq!(galaxy.system(0).unwrap().fleets.len(), 1);
    }
}
