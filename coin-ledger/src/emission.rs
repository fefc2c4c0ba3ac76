//! Reputation-weighted emission planning
//!
//! The plan is computed in full before any coin is minted, so a request the
//! arithmetic cannot satisfy is rejected with the ledger untouched.
//!
//! # Allocation
//!
//! ```text
//! floor     = 1 coin per account
//! factor    = Σ reputation / (requested - accounts)      (truncating)
//! share[i]  = reputation[i] / factor                      (truncating)
//! leftover  = requested - accounts - Σ share
//! ```
//!
//! The `leftover` coins go one each to the accounts with the largest
//! `share`, ties broken by creation order.

use crate::{Error, Result};

/// Complete allocation for one emission request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmissionPlan {
    /// Requested total
    pub requested: u64,

    /// Proportional divisor, `None` when nothing is left after the floor
    pub factor: Option<u64>,

    /// Proportional share per account, in creation order
    pub shares: Vec<u64>,

    /// Accounts receiving one leftover coin, in award order
    pub leftover: Vec<usize>,
}

impl EmissionPlan {
    /// Coins awarded to each account, in creation order
    pub fn awards(&self) -> Vec<u64> {
        let mut awards: Vec<u64> = self.shares.iter().map(|share| share + 1).collect();
        for &index in &self.leftover {
            awards[index] += 1;
        }
        awards
    }

    /// Total coins the plan mints
    pub fn total(&self) -> u64 {
        self.awards().iter().sum()
    }
}

/// Plan an emission of `requested` coins over accounts with `reputations`
pub fn plan(reputations: &[u64], requested: u64) -> Result<EmissionPlan> {
    let population = reputations.len();
    let floor = population as u64;

    if requested < floor {
        return Err(Error::NotEnoughCoins {
            requested,
            population,
        });
    }

    let remainder = requested - floor;
    if remainder == 0 {
        return Ok(EmissionPlan {
            requested,
            factor: None,
            shares: vec![0; population],
            leftover: Vec::new(),
        });
    }

    let aggregate_reputation = reputations
        .iter()
        .try_fold(0u64, |acc, r| acc.checked_add(*r))
        .ok_or_else(|| Error::InvariantViolation("aggregate reputation overflows".to_string()))?;

    let factor = aggregate_reputation / remainder;
    if factor == 0 {
        return Err(Error::DegenerateFactor {
            aggregate_reputation,
            remainder,
        });
    }

    let shares: Vec<u64> = reputations.iter().map(|r| r / factor).collect();
    let proportional: u64 = shares.iter().sum();

    if proportional > remainder {
        return Err(Error::Overallocated {
            requested,
            allocated: floor + proportional,
        });
    }

    let leftover_count = (remainder - proportional) as usize;
    if leftover_count > population {
        return Err(Error::InvariantViolation(format!(
            "{} leftover coins exceed population {}",
            leftover_count, population
        )));
    }

    // sort_by is stable: equal shares keep creation order
    let mut ranking: Vec<usize> = (0..population).collect();
    ranking.sort_by(|&a, &b| shares[b].cmp(&shares[a]));
    ranking.truncate(leftover_count);

    tracing::debug!(
        requested,
        factor,
        proportional,
        leftover = leftover_count,
        "Planned emission"
    );

    Ok(EmissionPlan {
        requested,
        factor: Some(factor),
        shares,
        leftover: ranking,
    })
}
