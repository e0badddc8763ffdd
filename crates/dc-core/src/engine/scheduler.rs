//! Turn scheduler
//!
//! Round-robin rotation over registered agents plus the work done for each
//! completed action: intent resolution, path cache refresh, periodic spawn
//! and round batching. Every action holds the turn lock: players release it
//! through a paced unlock, creatures release it as soon as they are done.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::TurnLock;
use crate::agent::{AgentId, AgentStatus, Decision, Intent, Position, Role, Roster};
use crate::combat::attack;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::pathing::pathing_map;
use crate::rng::GameRng;
use crate::session::{Downed, SessionEvent, SessionState};
use crate::spawn::Spawner;
use crate::world::WorldMap;

/// Mutable view of a session for the duration of one action
pub struct TurnContext<'a> {
    pub state: &'a mut SessionState,
    pub world: &'a mut dyn WorldMap,
    pub spawner: &'a mut dyn Spawner,
    pub lock: &'a mut TurnLock,
    pub rng: &'a mut GameRng,
    pub config: &'a SessionConfig,
    pub now: Duration,
}

/// How a player's turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerTurn {
    /// Action applied; unlock scheduled unless the session ended
    Acted,
    /// Manual player with nothing queued; the lock stays busy until input
    AwaitingInput,
    /// The win predicate already holds
    Won,
    /// The lock is terminal
    Rejected,
}

/// Round-robin actor rotation
#[derive(Debug, Clone, Default)]
pub struct TurnScheduler {
    rotation: VecDeque<AgentId>,
}

impl TurnScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: AgentId) {
        if !self.rotation.contains(&id) {
            self.rotation.push_back(id);
        }
    }

    pub fn remove(&mut self, id: AgentId) {
        self.rotation.retain(|a| *a != id);
    }

    pub fn len(&self) -> usize {
        self.rotation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rotation.is_empty()
    }

    /// Next agent allowed to act
    ///
    /// Agents that are not active are skipped; ones gone from the roster are
    /// forgotten. Creatures on other floors than the players stay dormant.
    pub fn next(&mut self, roster: &Roster, current_floor: usize) -> Option<AgentId> {
        for _ in 0..self.rotation.len() {
            let id = self.rotation.pop_front()?;
            let Some(agent) = roster.get(&id) else {
                continue;
            };
            if agent.status == AgentStatus::Removed {
                continue;
            }
            self.rotation.push_back(id);
            if !agent.is_viable() {
                continue;
            }
            if agent.role == Role::Creature && agent.pos.floor != current_floor {
                continue;
            }
            return Some(id);
        }
        None
    }

    /// Player action: win check, lock, resolve, then bookkeeping
    pub fn act_player(
        &mut self,
        ctx: &mut TurnContext<'_>,
        id: AgentId,
    ) -> Result<PlayerTurn, SessionError> {
        let depth = ctx.world.depth();
        if ctx.state.check_win(ctx.config.victory, depth) {
            ctx.lock.lock_terminal();
            return Ok(PlayerTurn::Won);
        }
        if !ctx.lock.lock() {
            return Ok(PlayerTurn::Rejected);
        }

        let intent = if ctx.state.agent(id)?.manual {
            match ctx.lock.take_deferred(id) {
                Some(intent) => intent,
                None => {
                    debug!(%id, "awaiting input");
                    return Ok(PlayerTurn::AwaitingInput);
                }
            }
        } else {
            decide(ctx, id)?
        };
        self.complete_player_action(ctx, id, intent)?;
        Ok(PlayerTurn::Acted)
    }

    /// Apply a player's intent and run the per-action bookkeeping
    ///
    /// Expects the lock to be held by this action.
    pub fn complete_player_action(
        &mut self,
        ctx: &mut TurnContext<'_>,
        id: AgentId,
        intent: Intent,
    ) -> Result<(), SessionError> {
        apply_intent(self, ctx, id, intent)?;
        if !ctx.state.is_running() {
            return Ok(());
        }

        let agent = ctx.state.agent_mut(id)?;
        agent.current_turn += 1;
        let (turn, steps) = (agent.current_turn, agent.spawn_steps);

        refresh_path(ctx, id)?;
        if steps > 0 && turn % u64::from(steps) == 0 {
            self.spawn_for(ctx, id)?;
        }
        if ctx.state.record_turn(id) {
            trace!(round = ctx.state.rounds(), "round complete");
        }
        ctx.lock.schedule_unlock(ctx.now, ctx.state.living_players());
        Ok(())
    }

    /// Creature action under the lock, reopened without a pacing delay
    ///
    /// Returns false when the lock is terminal and the creature did not act.
    pub fn act_creature(
        &mut self,
        ctx: &mut TurnContext<'_>,
        id: AgentId,
    ) -> Result<bool, SessionError> {
        if !ctx.lock.lock() {
            return Ok(false);
        }
        let outcome = self.creature_turn(ctx, id);
        // A killing blow on the last player leaves the lock terminal
        if !ctx.lock.is_terminal() {
            ctx.lock.unlock();
        }
        outcome.map(|()| true)
    }

    fn creature_turn(
        &mut self,
        ctx: &mut TurnContext<'_>,
        id: AgentId,
    ) -> Result<(), SessionError> {
        let intent = decide(ctx, id)?;
        apply_intent(self, ctx, id, intent)?;
        if let Ok(agent) = ctx.state.agent_mut(id) {
            agent.current_turn += 1;
        }
        Ok(())
    }

    /// Exactly one spawn request scoped to `id`
    fn spawn_for(&mut self, ctx: &mut TurnContext<'_>, id: AgentId) -> Result<(), SessionError> {
        let requester = ctx.state.agent(id)?;
        let Some(mut creature) = ctx.spawner.spawn(requester, &*ctx.world, ctx.rng) else {
            debug!(%id, "spawn found no room");
            return Ok(());
        };
        creature.id = ctx.state.next_agent_id();
        creature.truncate_name(ctx.config.name_length);
        if !ctx.world.is_tile_passable(creature.pos.x, creature.pos.y, creature.pos.floor)
            || !ctx.world.place_entity(creature.id, creature.pos)
        {
            warn!(%id, pos = %creature.pos, "spawner picked a blocked cell");
            return Ok(());
        }
        let spawned = ctx.state.register(creature);
        self.add(spawned);
        debug!(by = %id, agent = %spawned, "spawned");
        ctx.state.emit(SessionEvent::Spawned {
            agent: spawned,
            by: id,
        });
        Ok(())
    }
}

/// Resolve the agent's behavior into an intent, refreshing a stale map first
fn decide(ctx: &mut TurnContext<'_>, id: AgentId) -> Result<Intent, SessionError> {
    let agent = ctx.state.agent(id)?;
    let behavior = agent.behavior;
    let goal = behavior.goal(agent, ctx.state.roster(), &*ctx.world);

    if let Some(goal) = goal {
        if agent.cached_path(goal).is_none() {
            let map = pathing_map(
                &*ctx.world,
                ctx.state.roster(),
                agent,
                goal,
                behavior.pass_mode(),
                ctx.config.topology,
            )?;
            ctx.state.agent_mut(id)?.store_path(map);
        }
    }

    let agent = ctx.state.agent(id)?;
    let decision = Decision {
        agent,
        roster: ctx.state.roster(),
        world: &*ctx.world,
        map: goal.and_then(|g| agent.cached_path(g)),
        topology: ctx.config.topology,
        heal_below_percent: ctx.config.heal_below_percent,
    };
    let intent = behavior.decide(&decision, ctx.rng);
    trace!(%id, ?intent, "decided");
    Ok(intent)
}

/// Rebuild the actor's map from where it now stands
fn refresh_path(ctx: &mut TurnContext<'_>, id: AgentId) -> Result<(), SessionError> {
    let agent = ctx.state.agent(id)?;
    if !agent.is_viable() {
        return Ok(());
    }
    let behavior = agent.behavior;
    let target = behavior
        .goal(agent, ctx.state.roster(), &*ctx.world)
        .unwrap_or_else(|| agent.pos.xy());
    let map = pathing_map(
        &*ctx.world,
        ctx.state.roster(),
        agent,
        target,
        behavior.pass_mode(),
        ctx.config.topology,
    )?;
    ctx.state.agent_mut(id)?.store_path(map);
    Ok(())
}

fn apply_intent(
    scheduler: &mut TurnScheduler,
    ctx: &mut TurnContext<'_>,
    id: AgentId,
    intent: Intent,
) -> Result<(), SessionError> {
    let agent = ctx.state.agent(id)?;
    if !agent.is_viable() {
        return Ok(());
    }
    let pos = agent.pos;

    match intent {
        Intent::Wait => {}
        Intent::Rest => ctx.state.agent_mut(id)?.health.heal(1),
        Intent::Move(x, y) => {
            if !ctx.config.topology.adjacent(pos.xy(), (x, y)) {
                debug!(%id, x, y, "move ignored: not adjacent");
                return Ok(());
            }
            if let Some(occupant) = ctx.world.entity_at(x, y, pos.floor) {
                let hostile = ctx
                    .state
                    .roster()
                    .get(&occupant)
                    .is_some_and(|other| agent.can_attack(other) && other.is_viable());
                if hostile {
                    strike(scheduler, ctx, id, occupant)?;
                }
                return Ok(());
            }
            if !ctx.world.is_tile_passable(x, y, pos.floor) {
                return Ok(());
            }
            let to = Position::new(x, y, pos.floor);
            if ctx.world.move_entity(id, pos, to) {
                ctx.state.agent_mut(id)?.pos = to;
            }
        }
        Intent::Attack(target) => {
            let Some(other) = ctx.state.roster().get(&target) else {
                return Ok(());
            };
            let in_reach = other.pos.floor == pos.floor
                && ctx.config.topology.adjacent(pos.xy(), other.pos.xy());
            if in_reach && other.is_viable() && agent.can_attack(other) {
                strike(scheduler, ctx, id, target)?;
            }
        }
        Intent::Descend => {
            let on_exit = ctx.world.exit_point(pos.floor) == Some(pos.xy());
            if agent.is_player() && on_exit {
                ctx.state.descend(ctx.world)?;
            }
        }
    }
    Ok(())
}

fn strike(
    scheduler: &mut TurnScheduler,
    ctx: &mut TurnContext<'_>,
    attacker: AgentId,
    target: AgentId,
) -> Result<(), SessionError> {
    if attack(ctx, attacker, target)? != Downed::Ignored {
        scheduler.remove(target);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::spawn::NoSpawner;
    use crate::world::{Dungeon, Floor};

    fn duel(hero_hp: i32) -> (SessionState, Dungeon, TurnScheduler) {
        let mut world =
            Dungeon::from_floors(vec![Floor::from_ascii("#####\n#...#\n#####").unwrap()]);
        let mut state = SessionState::new();
        let mut scheduler = TurnScheduler::new();
        let hero = Agent::player(AgentId(1), "hero", Position::new(1, 1, 0), hero_hp, 3);
        let brute = Agent::creature(AgentId(2), "brute", Position::new(2, 1, 0), 10, 1);
        for agent in [hero, brute] {
            assert!(world.place_entity(agent.id, agent.pos));
            scheduler.add(agent.id);
            state.register(agent);
        }
        (state, world, scheduler)
    }

    fn creature_acts(
        scheduler: &mut TurnScheduler,
        state: &mut SessionState,
        world: &mut Dungeon,
        lock: &mut TurnLock,
    ) -> bool {
        let config = SessionConfig::default();
        let mut rng = GameRng::new(3);
        let mut ctx = TurnContext {
            state,
            world,
            spawner: &mut NoSpawner,
            lock,
            rng: &mut rng,
            config: &config,
            now: Duration::ZERO,
        };
        scheduler.act_creature(&mut ctx, AgentId(2)).unwrap()
    }

    #[test]
    fn test_creature_action_reopens_lock_without_delay() {
        let (mut state, mut world, mut scheduler) = duel(100);
        let mut lock = TurnLock::new(Duration::from_millis(100));

        assert!(creature_acts(&mut scheduler, &mut state, &mut world, &mut lock));
        assert_eq!(state.agent(AgentId(1)).unwrap().health.current(), 99);
        assert!(lock.is_open());
        assert_eq!(lock.pending_due(), None);
        assert_eq!(state.agent(AgentId(2)).unwrap().current_turn, 1);
    }

    #[test]
    fn test_creature_cannot_act_on_terminal_lock() {
        let (mut state, mut world, mut scheduler) = duel(100);
        let mut lock = TurnLock::new(Duration::from_millis(100));
        lock.lock_terminal();

        assert!(!creature_acts(&mut scheduler, &mut state, &mut world, &mut lock));
        assert_eq!(state.agent(AgentId(1)).unwrap().health.current(), 100);
        assert_eq!(state.agent(AgentId(2)).unwrap().current_turn, 0);
    }

    #[test]
    fn test_creature_kill_of_last_player_keeps_lock_terminal() {
        let (mut state, mut world, mut scheduler) = duel(1);
        let mut lock = TurnLock::new(Duration::from_millis(100));

        assert!(creature_acts(&mut scheduler, &mut state, &mut world, &mut lock));
        assert!(lock.is_terminal());
        assert_eq!(state.agent(AgentId(1)).unwrap().status, AgentStatus::Removed);
        // The dead player leaves the rotation
        assert_eq!(scheduler.len(), 1);
        assert_eq!(world.entity_at(1, 1, 0), None);
    }

    #[test]
    fn test_rotation_skips_inactive_and_forgets_removed() {
        let mut roster = Roster::new();
        let hero = Agent::player(AgentId(1), "hero", Position::new(1, 1, 0), 10, 3);
        let mut downed = Agent::player(AgentId(2), "down", Position::new(2, 1, 0), 10, 3);
        downed.status = AgentStatus::Incapacitated;
        let rat = Agent::creature(AgentId(3), "rat", Position::new(3, 1, 0), 3, 1);
        let deep_rat = Agent::creature(AgentId(4), "deep", Position::new(3, 1, 1), 3, 1);
        for agent in [hero, downed, rat, deep_rat] {
            roster.insert(agent.id, agent);
        }

        let mut scheduler = TurnScheduler::new();
        for id in 1..=5 {
            scheduler.add(AgentId(id));
        }
        scheduler.add(AgentId(1));
        assert_eq!(scheduler.len(), 5);

        let order: Vec<_> = (0..4).filter_map(|_| scheduler.next(&roster, 0)).collect();
        assert_eq!(order, vec![AgentId(1), AgentId(3), AgentId(1), AgentId(3)]);
        // Id 5 was never registered and is gone from the rotation
        assert_eq!(scheduler.len(), 4);
    }

    #[test]
    fn test_empty_rotation() {
        let mut scheduler = TurnScheduler::new();
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.next(&Roster::new(), 0), None);
    }
}
