//! Shared session state and its transitions
//!
//! Everything agents share lives here: the registry, the living-player count,
//! the players who acted this round and the floor index. Once the phase leaves `Running`
//! every mutating transition turns into a logged no-op.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{debug, info, warn};

use super::SessionEvent;
use crate::agent::{Agent, AgentId, AgentStatus, Roster};
use crate::combat::{Bounty, KillRules, credit_kill};
use crate::error::SessionError;
use crate::world::{WorldMap, nearest_free_cell};

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum Phase {
    Running,
    Won,
    /// Every player incapacitated
    Over,
}

/// Win predicate evaluated before each player action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VictoryCondition {
    Never,
    /// Shared floor index reaches this floor
    ReachFloor(usize),
    /// Some viable player has taken this many actions
    SurviveTurns(u64),
    /// Players stand on the last floor
    DeepestFloor,
}

/// Result of an incapacitation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Downed {
    /// Nothing happened: already down, unknown, or the session is over
    Ignored,
    Player,
    Creature,
    /// The last viable player went down
    GameOver,
}

/// Single-instance context shared by every component
#[derive(Debug, Clone)]
pub struct SessionState {
    agents: Roster,
    next_id: u32,
    living_players: usize,
    /// Viable players who have acted since the last redraw
    acted_this_round: HashSet<AgentId>,
    rounds: u64,
    current_floor: usize,
    phase: Phase,
    events: Vec<SessionEvent>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            agents: Roster::new(),
            next_id: 1,
            living_players: 0,
            acted_this_round: HashSet::new(),
            rounds: 0,
            current_floor: 0,
            phase: Phase::Running,
            events: Vec::new(),
        }
    }

    /// Reserve a fresh agent id
    pub fn next_agent_id(&mut self) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add an agent; viable players join the living count
    pub fn register(&mut self, agent: Agent) -> AgentId {
        let id = agent.id;
        self.next_id = self.next_id.max(id.0 + 1);
        if agent.is_player() && agent.is_viable() {
            self.living_players += 1;
        }
        debug!(%id, name = %agent.name, role = %agent.role, pos = %agent.pos, "agent registered");
        self.agents.insert(id, agent);
        id
    }

    pub fn agent(&self, id: AgentId) -> Result<&Agent, SessionError> {
        self.agents.get(&id).ok_or(SessionError::UnknownAgent(id))
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Result<&mut Agent, SessionError> {
        self.agents.get_mut(&id).ok_or(SessionError::UnknownAgent(id))
    }

    pub fn roster(&self) -> &Roster {
        &self.agents
    }

    /// Players in id order, including incapacitated ones
    pub fn players(&self) -> Vec<&Agent> {
        let mut players: Vec<&Agent> = self.agents.values().filter(|a| a.is_player()).collect();
        players.sort_by_key(|a| a.id);
        players
    }

    pub fn living_players(&self) -> usize {
        self.living_players
    }

    pub fn turns_taken_this_round(&self) -> usize {
        self.acted_this_round.len()
    }

    pub fn has_acted_this_round(&self, id: AgentId) -> bool {
        self.acted_this_round.contains(&id)
    }

    /// Completed rounds, one per redraw batch
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    pub fn current_floor(&self) -> usize {
        self.current_floor
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn emit(&mut self, event: SessionEvent) {
        self.events.push(event);
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Loss predicate: at least one player and none of them viable
    pub fn all_players_incapacitated(&self) -> bool {
        let mut players = self.agents.values().filter(|a| a.is_player()).peekable();
        players.peek().is_some() && players.all(|a| !a.is_viable())
    }

    /// Evaluate the win predicate, moving to `Won` the first time it holds
    pub fn check_win(&mut self, victory: VictoryCondition, depth: usize) -> bool {
        match self.phase {
            Phase::Won => return true,
            Phase::Over => return false,
            Phase::Running => {}
        }
        let won = match victory {
            VictoryCondition::Never => false,
            VictoryCondition::ReachFloor(floor) => self.current_floor >= floor,
            VictoryCondition::SurviveTurns(turns) => self
                .agents
                .values()
                .any(|a| a.is_player() && a.is_viable() && a.current_turn >= turns),
            VictoryCondition::DeepestFloor => self.current_floor + 1 >= depth,
        };
        if won {
            info!(floor = self.current_floor, "victory");
            self.phase = Phase::Won;
            self.emit(SessionEvent::Victory);
        }
        won
    }

    /// Count `id`'s action; true when it completed the round
    ///
    /// A second action by the same player within a round counts once.
    pub fn record_turn(&mut self, id: AgentId) -> bool {
        if !self.is_running() {
            return false;
        }
        let viable_player = self
            .agents
            .get(&id)
            .is_some_and(|a| a.is_player() && a.is_viable());
        if !viable_player {
            return false;
        }
        self.acted_this_round.insert(id);
        self.close_round_if_complete(true)
    }

    /// The round is complete once every viable player has acted
    fn close_round_if_complete(&mut self, redraw: bool) -> bool {
        if self.living_players == 0 || self.acted_this_round.len() < self.living_players {
            return false;
        }
        self.acted_this_round.clear();
        self.rounds += 1;
        if redraw {
            self.emit(SessionEvent::Redraw);
        }
        true
    }

    /// Apply damage from `attacker`; incapacitates on reaching minimum health
    pub fn damage(
        &mut self,
        target: AgentId,
        amount: i32,
        attacker: Option<AgentId>,
        rules: &KillRules,
    ) -> Result<Downed, SessionError> {
        if !self.is_running() {
            warn!(%target, phase = %self.phase, "damage ignored: session is not running");
            return Ok(Downed::Ignored);
        }
        let victim = self.agent_mut(target)?;
        if victim.status != AgentStatus::Active {
            return Ok(Downed::Ignored);
        }
        if !victim.health.damage(amount) {
            return Ok(Downed::Ignored);
        }
        self.incapacitate(target, attacker, rules)
    }

    /// `Active -> Incapacitated`, with kill credit and the loss check
    pub fn incapacitate(
        &mut self,
        victim: AgentId,
        killer: Option<AgentId>,
        rules: &KillRules,
    ) -> Result<Downed, SessionError> {
        if !self.is_running() {
            warn!(%victim, phase = %self.phase, "incapacitation ignored: session is not running");
            return Ok(Downed::Ignored);
        }
        let agent = self.agent_mut(victim)?;
        if agent.status != AgentStatus::Active {
            return Ok(Downed::Ignored);
        }
        agent.status = AgentStatus::Incapacitated;
        if !agent.health.at_min() {
            agent.health.damage(agent.health.current());
        }
        agent.clear_path();
        let is_player = agent.is_player();
        let bounty = Bounty::of(agent);

        if let Some(killer) = killer.filter(|k| *k != victim) {
            if let Ok(killer_agent) = self.agent_mut(killer) {
                credit_kill(killer_agent, &bounty, rules);
            }
        }

        if !is_player {
            debug!(%victim, ?killer, "creature slain");
            self.emit(SessionEvent::Slain {
                agent: victim,
                killer,
            });
            return Ok(Downed::Creature);
        }

        self.living_players = self.living_players.saturating_sub(1);
        self.acted_this_round.remove(&victim);
        info!(%victim, ?killer, living = self.living_players, "player incapacitated");
        self.emit(SessionEvent::Redraw);
        self.emit(SessionEvent::Die {
            agent: victim,
            killer,
        });

        if self.all_players_incapacitated() {
            info!("all players incapacitated, game over");
            self.phase = Phase::Over;
            self.acted_this_round.clear();
            self.emit(SessionEvent::GameOver);
            return Ok(Downed::GameOver);
        }

        // The survivors may all have acted already; the redraw above covers it
        if self.close_round_if_complete(false) {
            debug!(round = self.rounds, "round closed by a death");
        }
        Ok(Downed::Player)
    }

    /// `Incapacitated -> Removed`; creatures leave the registry entirely
    pub fn remove(&mut self, id: AgentId) -> Result<Option<Agent>, SessionError> {
        let agent = self.agent_mut(id)?;
        if agent.status != AgentStatus::Incapacitated {
            warn!(%id, status = %agent.status, "remove ignored: agent is not incapacitated");
            return Ok(None);
        }
        agent.status = AgentStatus::Removed;
        if agent.is_player() {
            // Kept for the final scores
            return Ok(Some(agent.clone()));
        }
        Ok(self.agents.remove(&id))
    }

    /// Move every viable player one floor down
    ///
    /// A no-op on the last floor or once the session has ended.
    pub fn descend(&mut self, world: &mut dyn WorldMap) -> Result<bool, SessionError> {
        if !self.is_running() {
            warn!(phase = %self.phase, "descend ignored: session is not running");
            return Ok(false);
        }
        let target = self.current_floor + 1;
        if target >= world.depth() {
            debug!(
                floor = self.current_floor,
                depth = world.depth(),
                "descend ignored: no deeper floor"
            );
            return Ok(false);
        }
        let arrival = world
            .entry_point(target)
            .ok_or(SessionError::MissingFloor { floor: target })?;
        self.relocate_players(world, target, arrival)?;
        self.current_floor = target;
        info!(floor = target, "descended");
        self.emit(SessionEvent::Descend { floor: target });
        self.emit(SessionEvent::Redraw);
        Ok(true)
    }

    /// Move every viable player one floor up, arriving on its exit
    pub fn ascend(&mut self, world: &mut dyn WorldMap) -> Result<bool, SessionError> {
        if !self.is_running() {
            warn!(phase = %self.phase, "ascend ignored: session is not running");
            return Ok(false);
        }
        let Some(target) = self.current_floor.checked_sub(1) else {
            debug!("ascend ignored: already on the top floor");
            return Ok(false);
        };
        let arrival = world
            .exit_point(target)
            .ok_or(SessionError::MissingFloor { floor: target })?;
        self.relocate_players(world, target, arrival)?;
        self.current_floor = target;
        info!(floor = target, "ascended");
        self.emit(SessionEvent::Ascend { floor: target });
        self.emit(SessionEvent::Redraw);
        Ok(true)
    }

    fn relocate_players(
        &mut self,
        world: &mut dyn WorldMap,
        floor: usize,
        arrival: (i32, i32),
    ) -> Result<(), SessionError> {
        if world.bounds(floor).is_none() {
            return Err(SessionError::MissingFloor { floor });
        }
        let mut movers: Vec<AgentId> = self
            .agents
            .values()
            .filter(|a| a.is_player() && a.is_viable())
            .map(|a| a.id)
            .collect();
        movers.sort();

        for id in movers {
            let from = self.agent(id)?.pos;
            let Some(to) = nearest_free_cell(&*world, arrival, floor) else {
                warn!(%id, floor, "no free cell on arrival, player stays behind");
                continue;
            };
            if !world.move_entity(id, from, to) {
                // Not on the map (never placed); put it there instead
                world.remove_entity(id, from);
                if !world.place_entity(id, to) {
                    continue;
                }
            }
            let agent = self.agent_mut(id)?;
            agent.pos = to;
            let behavior = agent.behavior;
            behavior.on_floor_change(agent);
            debug!(%id, pos = %to, "player relocated");
        }
        Ok(())
    }
}
