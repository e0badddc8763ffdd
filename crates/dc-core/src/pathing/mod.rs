//! Movement planning
//!
//! Passability rules plus the distance maps built on top of them.

mod dijkstra;
mod passability;

pub use dijkstra::{PathingMap, Topology};
pub use passability::{PassMode, Passability};

use crate::agent::{Agent, Roster};
use crate::error::SessionError;
use crate::world::WorldMap;

/// Build a map toward `target` on the asker's floor under `mode`
///
/// Fails only when the floor has no terrain layer.
pub fn pathing_map(
    world: &dyn WorldMap,
    roster: &Roster,
    asker: &Agent,
    target: (i32, i32),
    mode: PassMode,
    topology: Topology,
) -> Result<PathingMap, SessionError> {
    let floor = asker.pos.floor;
    let bounds = world
        .bounds(floor)
        .ok_or(SessionError::MissingFloor { floor })?;
    let oracle = Passability::new(world, roster, asker, mode);
    Ok(PathingMap::compute(
        target,
        floor,
        bounds,
        |x, y| oracle.can_pass(x, y),
        topology,
    ))
}

/// Combat-aware map: attackable occupants count as open ground
pub fn full_pathing_map(
    world: &dyn WorldMap,
    roster: &Roster,
    asker: &Agent,
    target: (i32, i32),
    topology: Topology,
) -> Result<PathingMap, SessionError> {
    pathing_map(world, roster, asker, target, PassMode::Full, topology)
}

/// Terrain-only map used for wandering and exploring
pub fn simple_pathing_map(
    world: &dyn WorldMap,
    roster: &Roster,
    asker: &Agent,
    target: (i32, i32),
    topology: Topology,
) -> Result<PathingMap, SessionError> {
    pathing_map(world, roster, asker, target, PassMode::Simple, topology)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentId, Position};
    use crate::world::{Dungeon, Floor};

    #[test]
    fn test_full_map_reaches_through_enemy() {
        // The corridor is one cell wide and the rat plugs it
        let floor = Floor::from_ascii(
            "#######\n\
             #<...>#\n\
             #######",
        )
        .unwrap();
        let mut dungeon = Dungeon::from_floors(vec![floor]);
        let mut roster = Roster::new();
        let hero = Agent::player(AgentId(1), "hero", Position::new(1, 1, 0), 10, 4);
        let rat = Agent::creature(AgentId(2), "rat", Position::new(3, 1, 0), 3, 1);
        dungeon.place_entity(hero.id, hero.pos);
        dungeon.place_entity(rat.id, rat.pos);
        // Mark the rat's cell as rubble so only the attack rule opens it
        dungeon.floor_mut(0).unwrap().set_tile(3, 1, crate::world::Tile::Rubble);
        roster.insert(hero.id, hero.clone());
        roster.insert(rat.id, rat);

        let full = full_pathing_map(&dungeon, &roster, &hero, (5, 1), Topology::Eight).unwrap();
        let simple = simple_pathing_map(&dungeon, &roster, &hero, (5, 1), Topology::Eight).unwrap();
        assert_eq!(full.cost(1, 1), Some(4));
        assert_eq!(simple.cost(1, 1), None);
        assert_eq!(simple.cost(4, 1), Some(1));
    }

    #[test]
    fn test_missing_floor_is_fatal() {
        let dungeon = Dungeon::from_floors(vec![]);
        let roster = Roster::new();
        let hero = Agent::player(AgentId(1), "hero", Position::new(1, 1, 2), 10, 4);
        let err = simple_pathing_map(&dungeon, &roster, &hero, (0, 0), Topology::Four).unwrap_err();
        assert_eq!(err, SessionError::MissingFloor { floor: 2 });
    }
}
