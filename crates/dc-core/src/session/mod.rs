//! Game session
//!
//! `Session` owns one game: the shared state, the world, the spawner, the
//! turn lock, the scheduler and a virtual clock. The driver advances the
//! clock; pending unlocks fire as it passes them and the engine loop runs
//! until the next player locks.

mod event;
mod state;

pub use event::SessionEvent;
pub use state::{Downed, Phase, SessionState, VictoryCondition};

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::agent::{Agent, AgentId, Behavior, Intent, Position, Role};
use crate::config::{PlayerTemplate, SessionConfig};
use crate::engine::{PlayerTurn, TurnContext, TurnLock, TurnScheduler};
use crate::error::SessionError;
use crate::rng::GameRng;
use crate::spawn::Spawner;
use crate::world::{WorldMap, nearest_free_cell};

/// What happened to a submitted intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The agent was waiting for it and acted immediately
    Executed,
    /// Queued until the agent's next turn
    Deferred,
    /// The session is over
    Rejected,
}

/// Final tally for one player
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Score {
    pub agent: AgentId,
    pub name: String,
    pub score: u64,
    pub turns: u64,
    pub gold: u32,
    pub total_xp_earned: u32,
    pub total_kp_earned: u32,
    pub alive: bool,
}

/// One running game
pub struct Session<W: WorldMap, S: Spawner> {
    config: SessionConfig,
    state: SessionState,
    world: W,
    spawner: S,
    lock: TurnLock,
    scheduler: TurnScheduler,
    rng: GameRng,
    clock: Duration,
    /// Manual player holding the lock until input arrives
    awaiting: Option<AgentId>,
    started: bool,
}

impl<W: WorldMap, S: Spawner> Session<W, S> {
    /// Fails if the config is invalid or the first floor has no terrain
    pub fn new(config: SessionConfig, world: W, spawner: S) -> Result<Self, SessionError> {
        config
            .validate()
            .map_err(|e| SessionError::Config(e.to_string()))?;
        if world.bounds(0).is_none() {
            return Err(SessionError::MissingFloor { floor: 0 });
        }
        let rng = config.seed.map_or_else(GameRng::from_entropy, GameRng::new);
        let lock = TurnLock::new(Duration::from_millis(config.turn_delay_ms));
        debug!(seed = rng.seed(), depth = world.depth(), "session created");
        Ok(Self {
            config,
            state: SessionState::new(),
            world,
            spawner,
            lock,
            scheduler: TurnScheduler::new(),
            rng,
            clock: Duration::ZERO,
            awaiting: None,
            started: false,
        })
    }

    /// Register an agent and put it on the map
    ///
    /// The id is reassigned and the name truncated to the configured length.
    /// Once the session has ended the agent is turned away with `Ok(None)`.
    pub fn add_agent(&mut self, mut agent: Agent) -> Result<Option<AgentId>, SessionError> {
        if !self.state.is_running() {
            warn!(
                name = %agent.name,
                phase = %self.state.phase(),
                "agent rejected: session is not running"
            );
            return Ok(None);
        }
        let floor = agent.pos.floor;
        if self.world.bounds(floor).is_none() {
            return Err(SessionError::MissingFloor { floor });
        }
        agent.id = self.state.next_agent_id();
        agent.truncate_name(self.config.name_length);

        let pos = agent.pos;
        if !self.world.is_tile_passable(pos.x, pos.y, floor)
            || !self.world.place_entity(agent.id, pos)
        {
            return Err(SessionError::Blocked { agent: agent.id, pos });
        }
        let id = self.state.register(agent);
        self.scheduler.add(id);
        Ok(Some(id))
    }

    /// Build a player from a template at the current floor's entry
    ///
    /// Falls back to the nearest free walkable cell when the entry is taken.
    pub fn add_player(
        &mut self,
        template: &PlayerTemplate,
    ) -> Result<Option<AgentId>, SessionError> {
        let floor = self.state.current_floor();
        let (width, height) = self
            .world
            .bounds(floor)
            .ok_or(SessionError::MissingFloor { floor })?;
        let origin = self
            .world
            .entry_point(floor)
            .unwrap_or((width / 2, height / 2));
        let pos = nearest_free_cell(&self.world, origin, floor).ok_or(SessionError::Blocked {
            agent: AgentId(0),
            pos: Position::new(origin.0, origin.1, floor),
        })?;

        let agent = Agent::player(AgentId(0), &template.name, pos, template.hp, template.damage)
            .with_behavior(Behavior::from_template(template.ai.as_deref()))
            .with_manual(template.manual)
            .with_spawn_steps(template.spawn_steps.unwrap_or(self.config.spawn_steps));
        self.add_agent(agent)
    }

    /// Run the engine loop for the first time
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.state.players().is_empty() {
            return Err(SessionError::NoPlayers);
        }
        if self.started {
            return Ok(());
        }
        self.started = true;
        info!(
            players = self.state.living_players(),
            agents = self.state.roster().len(),
            "session started"
        );
        self.run()
    }

    /// Move the clock forward, firing a due unlock and running the engine
    pub fn advance(&mut self, elapsed: Duration) -> Result<(), SessionError> {
        self.clock += elapsed;
        if self.started && self.lock.poll(self.clock) {
            self.run()?;
        }
        Ok(())
    }

    /// Jump the clock to the pending unlock, if any
    ///
    /// Returns false when nothing is pending: the session is over or a
    /// manual player is waiting for input.
    pub fn step(&mut self) -> Result<bool, SessionError> {
        let Some(due) = self.lock.pending_due() else {
            return Ok(false);
        };
        let elapsed = due.saturating_sub(self.clock);
        self.advance(elapsed)?;
        Ok(true)
    }

    /// Step until `limit` on the clock or until nothing is pending
    pub fn run_until(&mut self, limit: Duration) -> Result<(), SessionError> {
        while let Some(due) = self.lock.pending_due() {
            if due > limit {
                break;
            }
            self.step()?;
        }
        Ok(())
    }

    /// Hand an intent to an agent
    ///
    /// A manual player holding the lock acts at once; otherwise the intent
    /// waits for the agent's next turn.
    pub fn submit(&mut self, id: AgentId, intent: Intent) -> Result<Submission, SessionError> {
        self.state.agent(id)?;
        if self.is_finished() {
            warn!(%id, ?intent, "submission rejected: session is finished");
            return Ok(Submission::Rejected);
        }

        if self.awaiting == Some(id) {
            self.awaiting = None;
            let Self {
                config,
                state,
                world,
                spawner,
                lock,
                scheduler,
                rng,
                clock,
                ..
            } = self;
            let mut ctx = TurnContext {
                state,
                world,
                spawner,
                lock,
                rng,
                config,
                now: *clock,
            };
            scheduler.complete_player_action(&mut ctx, id, intent)?;
            return Ok(Submission::Executed);
        }

        if !self.lock.defer(id, intent) {
            return Ok(Submission::Rejected);
        }
        debug!(%id, ?intent, queued = self.lock.deferred_len(id), "intent deferred");
        Ok(Submission::Deferred)
    }

    /// Engine loop: let agents act until a player holds the lock
    fn run(&mut self) -> Result<(), SessionError> {
        let Self {
            config,
            state,
            world,
            spawner,
            lock,
            scheduler,
            rng,
            clock,
            awaiting,
            ..
        } = self;
        let mut ctx = TurnContext {
            state,
            world,
            spawner,
            lock,
            rng,
            config,
            now: *clock,
        };

        while ctx.lock.is_open() && ctx.state.is_running() {
            let Some(id) = scheduler.next(ctx.state.roster(), ctx.state.current_floor()) else {
                warn!("no agent can act");
                break;
            };
            match ctx.state.agent(id)?.role {
                Role::Creature => {
                    scheduler.act_creature(&mut ctx, id)?;
                }
                Role::Player => match scheduler.act_player(&mut ctx, id)? {
                    PlayerTurn::AwaitingInput => *awaiting = Some(id),
                    PlayerTurn::Acted | PlayerTurn::Won | PlayerTurn::Rejected => {}
                },
            }
        }
        if !ctx.state.is_running() {
            ctx.lock.lock_terminal();
        }
        Ok(())
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.state.drain_events()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn lock(&self) -> &TurnLock {
        &self.lock
    }

    /// Virtual clock
    pub fn now(&self) -> Duration {
        self.clock
    }

    /// Manual player currently holding the lock
    pub fn awaiting_input(&self) -> Option<AgentId> {
        self.awaiting
    }

    pub fn is_finished(&self) -> bool {
        !self.state.is_running() || self.lock.is_terminal()
    }

    /// Per-player scores, best first
    pub fn scores(&self) -> Vec<Score> {
        let mut scores: Vec<Score> = self
            .state
            .players()
            .into_iter()
            .map(|a| Score {
                agent: a.id,
                name: a.name.clone(),
                score: a.score(),
                turns: a.current_turn,
                gold: a.gold,
                total_xp_earned: a.total_xp_earned,
                total_kp_earned: a.total_kp_earned,
                alive: a.is_viable(),
            })
            .collect();
        scores.sort_by(|a, b| b.score.cmp(&a.score).then(a.agent.cmp(&b.agent)));
        scores
    }
}
