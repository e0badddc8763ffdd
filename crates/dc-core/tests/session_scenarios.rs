//! End-to-end session scenarios: spawn cadence per agent, floor bounds,
//! game over, round batching and the terminal lock.

use std::time::Duration;

use dc_core::agent::{Agent, AgentId, AgentStatus, Behavior, Factions, Intent, Position};
use dc_core::combat::KillRules;
use dc_core::config::{CreatureTemplate, PlayerTemplate, SessionConfig};
use dc_core::session::{Downed, Phase, Submission, VictoryCondition};
use dc_core::spawn::{CreatureSpawner, NoSpawner, Spawner};
use dc_core::world::{Dungeon, Floor, WorldMap};
use dc_core::{GameRng, Session, SessionEvent, SessionState};

/// Walled room with up stairs top-left and down stairs bottom-right
fn room(width: usize, height: usize) -> Floor {
    let mut rows = Vec::with_capacity(height);
    for y in 0..height {
        let row: String = (0..width)
            .map(|x| {
                if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
                    '#'
                } else if (x, y) == (1, 1) {
                    '<'
                } else if (x, y) == (width - 2, height - 2) {
                    '>'
                } else {
                    '.'
                }
            })
            .collect();
        rows.push(row);
    }
    Floor::from_ascii(&rows.join("\n")).unwrap()
}

fn dungeon(floors: usize) -> Dungeon {
    Dungeon::from_floors((0..floors).map(|_| room(20, 10)).collect())
}

fn config() -> SessionConfig {
    SessionConfig {
        seed: Some(42),
        victory: VictoryCondition::Never,
        ..SessionConfig::default()
    }
}

fn wanderer(spawn_steps: u32) -> PlayerTemplate {
    PlayerTemplate {
        ai: Some("Wander".into()),
        spawn_steps: Some(spawn_steps),
        ..PlayerTemplate::default()
    }
}

/// Records every spawn request and spawns harmless bystanders
struct Tracking {
    inner: Option<CreatureSpawner>,
    requests: Vec<(AgentId, u64)>,
}

impl Tracking {
    fn new(spawn: bool) -> Self {
        Self {
            inner: spawn.then(|| CreatureSpawner::new(CreatureTemplate::default())),
            requests: Vec::new(),
        }
    }
}

impl Spawner for Tracking {
    fn spawn(
        &mut self,
        requester: &Agent,
        world: &dyn WorldMap,
        rng: &mut GameRng,
    ) -> Option<Agent> {
        self.requests.push((requester.id, requester.current_turn));
        let mut creature = self.inner.as_mut()?.spawn(requester, world, rng)?;
        creature.behavior = Behavior::Idle;
        creature.factions = Factions::NEUTRAL;
        creature.anti_factions = Factions::empty();
        Some(creature)
    }
}

fn spawned_by(events: &[SessionEvent], requester: AgentId) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, SessionEvent::Spawned { by, .. } if *by == requester))
        .count()
}

#[test]
fn spawn_cadence_is_per_agent() {
    let mut session = Session::new(config(), dungeon(1), Tracking::new(true)).unwrap();
    let a = session.add_player(&wanderer(100)).unwrap().unwrap();
    let b = session.add_player(&wanderer(100)).unwrap().unwrap();
    session.start().unwrap();

    // A acts on odd actions, B on even ones; A's 100th is action 199
    for _ in 0..198 {
        assert!(session.step().unwrap());
    }
    assert_eq!(session.state().agent(a).unwrap().current_turn, 100);
    assert_eq!(session.state().agent(b).unwrap().current_turn, 99);
    assert_eq!(session.spawner().requests, vec![(a, 100)]);
    let events = session.drain_events();
    assert_eq!(spawned_by(&events, a), 1);
    assert_eq!(spawned_by(&events, b), 0);

    assert!(session.step().unwrap());
    assert_eq!(session.spawner().requests, vec![(a, 100), (b, 100)]);
    let events = session.drain_events();
    assert_eq!(spawned_by(&events, a), 0);
    assert_eq!(spawned_by(&events, b), 1);

    // The bystander sits near A
    let bystander = session
        .state()
        .roster()
        .values()
        .find(|agent| !agent.is_player())
        .unwrap();
    let a_pos = session.state().agent(a).unwrap().pos;
    assert_eq!(bystander.pos.floor, a_pos.floor);
}

#[test]
fn spawn_interval_zero_disables_spawning() {
    let mut session = Session::new(config(), dungeon(1), Tracking::new(false)).unwrap();
    session.add_player(&wanderer(0)).unwrap().unwrap();
    session.start().unwrap();
    for _ in 0..50 {
        session.step().unwrap();
    }
    assert!(session.spawner().requests.is_empty());
}

#[test]
fn descend_past_last_floor_is_noop() {
    let mut world = dungeon(5);
    let mut state = SessionState::new();
    let hero = Agent::player(AgentId(1), "hero", Position::new(3, 3, 0), 10, 3);
    assert!(world.place_entity(hero.id, hero.pos));
    state.register(hero);

    for floor in 1..=4 {
        assert!(state.descend(&mut world).unwrap());
        assert_eq!(state.current_floor(), floor);
    }
    assert!(!state.descend(&mut world).unwrap());
    assert_eq!(state.current_floor(), 4);
    assert_eq!(state.agent(AgentId(1)).unwrap().pos, Position::new(1, 1, 4));
}

#[test]
fn game_over_fires_exactly_once() {
    let mut world = dungeon(1);
    let mut state = SessionState::new();
    let rules = KillRules::default();
    for (id, x) in [(1, 2), (2, 3)] {
        let hero = Agent::player(AgentId(id), "hero", Position::new(x, 2, 0), 5, 3);
        assert!(world.place_entity(hero.id, hero.pos));
        state.register(hero);
    }
    let rat = Agent::creature(AgentId(3), "rat", Position::new(4, 2, 0), 5, 2);
    assert!(world.place_entity(rat.id, rat.pos));
    state.register(rat);

    assert_eq!(state.damage(AgentId(1), 5, Some(AgentId(3)), &rules).unwrap(), Downed::Player);
    assert_eq!(state.damage(AgentId(2), 5, Some(AgentId(3)), &rules).unwrap(), Downed::GameOver);
    assert!(state.all_players_incapacitated());
    assert_eq!(state.phase(), Phase::Over);

    assert_eq!(state.incapacitate(AgentId(3), Some(AgentId(1)), &rules).unwrap(), Downed::Ignored);
    let events = state.drain_events();
    assert_eq!(events.iter().filter(|e| **e == SessionEvent::GameOver).count(), 1);
    assert_eq!(events.iter().filter(|e| matches!(e, SessionEvent::Die { .. })).count(), 2);
}

#[test]
fn creature_kills_both_players_and_locks_for_good() {
    let config = SessionConfig {
        spawn_steps: 0,
        ..config()
    };
    let mut session = Session::new(config, dungeon(1), NoSpawner).unwrap();
    let template = PlayerTemplate {
        hp: 1,
        manual: true,
        ..PlayerTemplate::default()
    };
    let a = session.add_player(&template).unwrap().unwrap();
    let b = session.add_player(&template).unwrap().unwrap();
    let brute = Agent::creature(AgentId(0), "brute", Position::new(1, 2, 0), 50, 1);
    session.add_agent(brute).unwrap().unwrap();
    session.start().unwrap();

    for expected in [a, b, b] {
        assert_eq!(session.awaiting_input(), Some(expected));
        assert_eq!(session.submit(expected, Intent::Wait).unwrap(), Submission::Executed);
        assert!(session.step().unwrap());
    }

    assert!(session.is_finished());
    assert_eq!(session.state().phase(), Phase::Over);
    assert!(session.state().all_players_incapacitated());
    assert!(session.lock().is_terminal());
    assert_eq!(session.lock().pending_due(), None);

    let mut lock = session.lock().clone();
    assert!(!lock.lock());
    assert_eq!(session.submit(a, Intent::Wait).unwrap(), Submission::Rejected);
    assert!(!session.step().unwrap());

    let events = session.drain_events();
    assert_eq!(events.iter().filter(|e| **e == SessionEvent::GameOver).count(), 1);
    assert!(events.contains(&SessionEvent::Die {
        agent: a,
        killer: Some(AgentId(3)),
    }));

    let brute = session.state().agent(AgentId(3)).unwrap();
    assert_eq!(brute.conquest.get("Adventurer"), Some(&2));
    assert_eq!(brute.alignment, -100);

    // Dead players finish as Removed but keep their place in the scores
    for id in [a, b] {
        assert_eq!(session.state().agent(id).unwrap().status, AgentStatus::Removed);
    }
    let scores = session.scores();
    assert_eq!(scores.len(), 2);
    assert!(scores.iter().all(|s| !s.alive && s.turns > 0));
}

#[test]
fn death_mid_round_waits_for_remaining_player() {
    let config = SessionConfig {
        spawn_steps: 0,
        ..config()
    };
    let mut session = Session::new(config, dungeon(1), NoSpawner).unwrap();
    let template = PlayerTemplate {
        hp: 1,
        manual: true,
        ..PlayerTemplate::default()
    };
    let a = session.add_player(&template).unwrap().unwrap();
    let b = session.add_player(&template).unwrap().unwrap();
    // Acts between B and C, next to all three
    let brute = Agent::creature(AgentId(0), "brute", Position::new(1, 2, 0), 50, 50);
    let brute = session.add_agent(brute).unwrap().unwrap();
    let c = session.add_player(&template).unwrap().unwrap();
    session.start().unwrap();

    for id in [a, b] {
        assert_eq!(session.awaiting_input(), Some(id));
        session.submit(id, Intent::Wait).unwrap();
        assert!(session.step().unwrap());
    }

    // The brute killed A, who had already acted; C still owes a turn
    assert_eq!(session.awaiting_input(), Some(c));
    assert_eq!(session.state().agent(a).unwrap().status, AgentStatus::Removed);
    assert_eq!(session.state().rounds(), 0);
    assert_eq!(session.state().turns_taken_this_round(), 1);
    assert_eq!(session.state().agent(c).unwrap().current_turn, 0);
    assert_eq!(
        session.drain_events(),
        vec![
            SessionEvent::Redraw,
            SessionEvent::Die {
                agent: a,
                killer: Some(brute),
            },
        ]
    );

    assert_eq!(session.submit(c, Intent::Wait).unwrap(), Submission::Executed);
    assert_eq!(session.state().rounds(), 1);
    assert_eq!(session.state().turns_taken_this_round(), 0);
    assert_eq!(session.drain_events(), vec![SessionEvent::Redraw]);
}

#[test]
fn redraw_fires_once_per_round() {
    let mut session = Session::new(
        SessionConfig {
            spawn_steps: 0,
            ..config()
        },
        dungeon(1),
        NoSpawner,
    )
    .unwrap();
    for _ in 0..3 {
        session.add_player(&wanderer(0)).unwrap().unwrap();
    }
    session.start().unwrap();
    session.step().unwrap();
    assert_eq!(session.state().turns_taken_this_round(), 2);
    assert!(session.drain_events().is_empty());

    session.step().unwrap();
    assert_eq!(session.state().turns_taken_this_round(), 0);
    assert_eq!(session.drain_events(), vec![SessionEvent::Redraw]);
    assert_eq!(session.state().rounds(), 1);
}

#[test]
fn unlock_pacing_follows_living_players() {
    let mut session = Session::new(config(), dungeon(1), NoSpawner).unwrap();
    for _ in 0..4 {
        session.add_player(&wanderer(0)).unwrap().unwrap();
    }
    session.start().unwrap();
    assert_eq!(session.lock().pending_due(), Some(Duration::from_millis(25)));
    session.run_until(Duration::from_millis(100)).unwrap();
    assert_eq!(session.now(), Duration::from_millis(100));
    assert_eq!(session.state().rounds(), 1);
}

#[test]
fn explorers_descend_together() {
    let config = SessionConfig {
        spawn_steps: 0,
        victory: VictoryCondition::ReachFloor(2),
        ..config()
    };
    let mut session = Session::new(config, dungeon(3), NoSpawner).unwrap();
    let a = session.add_player(&PlayerTemplate::default()).unwrap().unwrap();
    let b = session.add_player(&PlayerTemplate::default()).unwrap().unwrap();
    session.start().unwrap();
    session.run_until(Duration::from_secs(600)).unwrap();

    assert_eq!(session.state().phase(), Phase::Won);
    assert_eq!(session.state().current_floor(), 2);
    let events = session.drain_events();
    assert!(events.contains(&SessionEvent::Descend { floor: 1 }));
    assert!(events.contains(&SessionEvent::Descend { floor: 2 }));
    assert_eq!(events.iter().filter(|e| **e == SessionEvent::Victory).count(), 1);
    for id in [a, b] {
        assert_eq!(session.state().agent(id).unwrap().pos.floor, 2);
    }
}
