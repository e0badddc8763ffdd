//! Damage rolls and kill credit
//!
//! Kill credit scales the victim's difficulty by its kill xp relative to a
//! divisor, capped at 1. Both constants come from `SessionConfig`.

use tracing::debug;

use crate::agent::{Agent, AgentId, Factions};
use crate::config::SessionConfig;
use crate::engine::TurnContext;
use crate::error::SessionError;
use crate::rng::GameRng;
use crate::session::Downed;

/// Constants governing kill rewards
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KillRules {
    pub kill_xp_divisor: f64,
    pub friendly_kill_penalty: i32,
}

impl KillRules {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            kill_xp_divisor: config.kill_xp_divisor,
            friendly_kill_penalty: config.friendly_kill_penalty,
        }
    }
}

impl Default for KillRules {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

/// What a killer collects from its victim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bounty {
    pub name: String,
    pub factions: Factions,
    pub difficulty: u32,
    pub kill_xp: u32,
    pub gold: u32,
}

impl Bounty {
    pub fn of(victim: &Agent) -> Self {
        Self {
            name: victim.name.clone(),
            factions: victim.factions,
            difficulty: victim.difficulty,
            kill_xp: victim.kill_xp,
            gold: victim.gold,
        }
    }
}

/// `floor(difficulty * min(kill_xp / divisor, 1))`
pub fn kill_credit(difficulty: u32, kill_xp: u32, divisor: f64) -> u32 {
    if divisor <= 0.0 {
        return difficulty;
    }
    let ratio = (f64::from(kill_xp) / divisor).min(1.0);
    (f64::from(difficulty) * ratio).floor() as u32
}

/// Apply a kill to the killer's counters
pub fn credit_kill(killer: &mut Agent, bounty: &Bounty, rules: &KillRules) {
    killer.total_kp_earned += kill_credit(bounty.difficulty, bounty.kill_xp, rules.kill_xp_divisor);
    killer.gain_xp(bounty.kill_xp);
    killer.gold += bounty.gold;
    *killer.conquest.entry(bounty.name.clone()).or_insert(0) += 1;

    if bounty.factions.contains(Factions::PLAYER) {
        killer.alignment -= rules.friendly_kill_penalty;
    }
}

/// Damage for one hit, `1..=attacker.damage`
pub fn roll_damage(attacker: &Agent, rng: &mut GameRng) -> i32 {
    rng.roll(attacker.damage.max(1)) as i32
}

/// Resolve one hit and clean up after an incapacitation
///
/// Downed agents leave the map, lose their queued intents and end up
/// `Removed`; creatures leave the registry too. The last player going down
/// closes the lock.
pub fn attack(
    ctx: &mut TurnContext<'_>,
    attacker: AgentId,
    target: AgentId,
) -> Result<Downed, SessionError> {
    let amount = roll_damage(ctx.state.agent(attacker)?, ctx.rng);
    let rules = KillRules::from_config(ctx.config);
    let downed = ctx.state.damage(target, amount, Some(attacker), &rules)?;
    debug!(%attacker, %target, amount, ?downed, "attack");

    match downed {
        Downed::Ignored => {}
        Downed::Player | Downed::GameOver => {
            let pos = ctx.state.agent(target)?.pos;
            ctx.world.remove_entity(target, pos);
            ctx.lock.drop_deferred(target);
            ctx.state.remove(target)?;
            if downed == Downed::GameOver {
                ctx.lock.lock_terminal();
            }
        }
        Downed::Creature => {
            if let Some(creature) = ctx.state.remove(target)? {
                ctx.world.remove_entity(target, creature.pos);
            }
            ctx.lock.drop_deferred(target);
        }
    }
    Ok(downed)
}
