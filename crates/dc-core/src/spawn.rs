//! World population
//!
//! Spawning is delegated to a `Spawner` so the session never decides what
//! creatures exist, only when one is requested.

use crate::agent::{Agent, AgentId, Position};
use crate::config::CreatureTemplate;
use crate::consts::{SPAWN_ATTEMPTS, SPAWN_RADIUS};
use crate::rng::GameRng;
use crate::world::WorldMap;

/// Produces a new agent near a requester
pub trait Spawner {
    /// Build an unplaced agent, or `None` when there is no room
    ///
    /// The returned id is a placeholder; the session assigns the real one.
    fn spawn(
        &mut self,
        requester: &Agent,
        world: &dyn WorldMap,
        rng: &mut GameRng,
    ) -> Option<Agent>;
}

/// Spawns creatures from a single template around the requester
#[derive(Debug, Clone)]
pub struct CreatureSpawner {
    template: CreatureTemplate,
    radius: i32,
}

impl CreatureSpawner {
    pub fn new(template: CreatureTemplate) -> Self {
        Self {
            template,
            radius: SPAWN_RADIUS,
        }
    }

    pub fn with_radius(mut self, radius: i32) -> Self {
        self.radius = radius.max(1);
        self
    }

    pub fn template(&self) -> &CreatureTemplate {
        &self.template
    }
}

impl Spawner for CreatureSpawner {
    fn spawn(
        &mut self,
        requester: &Agent,
        world: &dyn WorldMap,
        rng: &mut GameRng,
    ) -> Option<Agent> {
        let floor = requester.pos.floor;
        for _ in 0..SPAWN_ATTEMPTS {
            let x = requester.pos.x + rng.offset(self.radius);
            let y = requester.pos.y + rng.offset(self.radius);
            if (x, y) == requester.pos.xy() {
                continue;
            }
            if !world.is_tile_passable(x, y, floor) || world.entity_at(x, y, floor).is_some() {
                continue;
            }
            let t = &self.template;
            let pos = Position::new(x, y, floor);
            let creature = Agent::creature(AgentId(0), &t.name, pos, t.hp, t.damage)
                .with_rewards(t.difficulty, t.kill_xp, t.gold);
            return Some(creature);
        }
        None
    }
}

/// Never spawns anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSpawner;

impl Spawner for NoSpawner {
    fn spawn(
        &mut self,
        _requester: &Agent,
        _world: &dyn WorldMap,
        _rng: &mut GameRng,
    ) -> Option<Agent> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Role;
    use crate::world::{Dungeon, Floor};

    #[test]
    fn test_spawns_on_free_floor_near_requester() {
        let mut dungeon = Dungeon::from_floors(vec![Floor::from_ascii(
            "#########\n\
             #.......#\n\
             #.......#\n\
             #########",
        )
        .unwrap()]);
        let hero = Agent::player(AgentId(1), "hero", Position::new(4, 1, 0), 10, 3);
        dungeon.place_entity(hero.id, hero.pos);

        let mut spawner = CreatureSpawner::new(CreatureTemplate::default()).with_radius(2);
        let mut rng = GameRng::new(8);
        for _ in 0..50 {
            let creature = spawner.spawn(&hero, &dungeon, &mut rng).expect("room to spawn");
            assert_eq!(creature.role, Role::Creature);
            assert_eq!(creature.name, "kobold");
            assert!(dungeon.is_tile_passable(creature.pos.x, creature.pos.y, 0));
            assert_ne!(creature.pos, hero.pos);
            assert!(hero.pos.distance(&creature.pos).unwrap() <= 2);
        }
    }

    #[test]
    fn test_no_room_is_none() {
        let mut dungeon = Dungeon::from_floors(vec![Floor::from_ascii("###\n#.#\n###").unwrap()]);
        let hero = Agent::player(AgentId(1), "hero", Position::new(1, 1, 0), 10, 3);
        dungeon.place_entity(hero.id, hero.pos);
        let mut spawner = CreatureSpawner::new(CreatureTemplate::default());
        assert!(spawner.spawn(&hero, &dungeon, &mut GameRng::new(1)).is_none());
        assert!(NoSpawner.spawn(&hero, &dungeon, &mut GameRng::new(1)).is_none());
    }
}
