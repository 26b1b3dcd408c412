//! Extra-game balancing pass.
//!
//! When the structural tiers leave every team one game short, each team gets
//! one additional cross-conference matchup. The pass keeps a queue of teams
//! still needing the game and removes both participants of every matchup it
//! creates, so no team is paired twice and nobody is skipped.

use std::collections::{BTreeSet, VecDeque};

use log::debug;

use super::rotation::circle_rounds;
use super::Structure;
use crate::error::ScheduleError;
use crate::models::{pair_key, TeamId, ViolationType};

/// Pairs every team with one extra far-tier opponent.
///
/// Conferences are paired by circle round `year + 1`. The preferred partner
/// of division `d`, rank `i` in the first conference of a pairing is rank `i`
/// of division `(d + year + 2) mod D` in the second; the inverse rule applies
/// from the second conference. When the preferred partner is taken or
/// already met, the first pending team of the other conference not yet met
/// is used. The conference chosen by year parity hosts.
///
/// Returns `(home, away)` pairs.
pub(super) fn extra_games(
    structure: &Structure,
    year: u16,
    met: &BTreeSet<(TeamId, TeamId)>,
) -> Result<Vec<(TeamId, TeamId)>, ScheduleError> {
    let confs = structure.conference_count();
    let divs = structure.division_count();
    let y = usize::from(year);
    let rounds = circle_rounds(confs);
    let pairing = &rounds[(y + 1) % (confs - 1)];
    let offset = (y + 2) % divs;

    let mut games = Vec::new();
    for &(first, second) in pairing {
        let host = if y % 2 == 0 { first } else { second };
        let mut queue: VecDeque<TeamId> = structure
            .conference_teams(first)
            .chain(structure.conference_teams(second))
            .collect();
        let mut pending: BTreeSet<TeamId> = queue.iter().copied().collect();

        while let Some(team) = queue.pop_front() {
            if !pending.contains(&team) {
                continue;
            }
            let Some((c, d, i)) = structure.position(team) else {
                continue;
            };
            let (other, preferred) = if c == first {
                (second, structure.team(second, (d + offset) % divs, i))
            } else {
                (first, structure.team(first, (d + divs - offset) % divs, i))
            };
            let available =
                |t: TeamId| pending.contains(&t) && t != team && !met.contains(&pair_key(team, t));

            let partner = if available(preferred) {
                Some(preferred)
            } else {
                structure.conference_teams(other).find(|&t| available(t))
            };
            let Some(partner) = partner else {
                return Err(ScheduleError::StructuralInfeasibility {
                    class: ViolationType::GameCount,
                    demand: pending.len(),
                    supply: pending.len() - 1,
                    detail: format!("no eligible extra-game opponent left for {team}"),
                });
            };
            if partner != preferred {
                debug!("extra game: {team} falls back to {partner} (preferred {preferred})");
            }

            pending.remove(&team);
            pending.remove(&partner);
            let team_hosts = c == host;
            games.push(if team_hosts {
                (team, partner)
            } else {
                (partner, team)
            });
        }
    }
    Ok(games)
}
