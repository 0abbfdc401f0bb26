use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Chat platform user identifier
pub type UserId = i64;

/// Virtual credit amount; balances can never go negative
pub type Credits = u64;

/// Escrow identifier; betting games reuse their game id
pub type EscrowId = String;

/// Credits held on behalf of the participants of one wager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    #[serde(default)]
    pub id: EscrowId,
    pub creator_id: UserId,
    /// Per-participant stake, fixed at creation
    #[serde(rename = "amount")]
    pub stake: Credits,
    /// Contribution of every participant, creator included
    pub participants: BTreeMap<UserId, Credits>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Escrow {
    pub fn new(id: EscrowId, creator_id: UserId, stake: Credits) -> Self {
        let mut participants = BTreeMap::new();
        participants.insert(creator_id, stake);
        Self {
            id,
            creator_id,
            stake,
            participants,
            created_at: Utc::now(),
        }
    }

    /// Total credits held
    pub fn pot(&self) -> Credits {
        self.participants.values().sum()
    }

    pub fn is_participant(&self, user: UserId) -> bool {
        self.participants.contains_key(&user)
    }

    /// Whether anyone besides the creator has joined
    pub fn has_joiners(&self) -> bool {
        self.participants.keys().any(|&user| user != self.creator_id)
    }
}

/// How an escrow left the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscrowClosure {
    /// Pot paid to a winner
    Settled,
    /// Tie: every participant refunded
    Refunded,
    /// Creator cancelled: every participant refunded
    Cancelled,
}

impl fmt::Display for EscrowClosure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EscrowClosure::Settled => write!(f, "settled"),
            EscrowClosure::Refunded => write!(f, "refunded"),
            EscrowClosure::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of a terminal escrow operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub escrow_id: EscrowId,
    pub closure: EscrowClosure,
    pub pot: Credits,
    pub winner: Option<UserId>,
    /// Credits paid out per user; always sums to `pot`
    pub payouts: Vec<(UserId, Credits)>,
}

impl Settlement {
    pub fn paid_to(&self, user: UserId) -> Credits {
        self.payouts
            .iter()
            .filter(|(id, _)| *id == user)
            .map(|(_, amount)| amount)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_escrow_seats_creator() {
        let escrow = Escrow::new("ABC123".to_string(), 7, 100);
        assert_eq!(escrow.pot(), 100);
        assert!(escrow.is_participant(7));
        assert!(!escrow.has_joiners());
    }

    #[test]
    fn test_legacy_escrow_json_loads() {
        let escrow: Escrow = serde_json::from_str(
            r#"{"creator_id": 5, "amount": 50, "participants": {"5": 50, "9": 50}}"#,
        )
        .expect("legacy escrow");

        assert_eq!(escrow.stake, 50);
        assert_eq!(escrow.pot(), 100);
        assert!(escrow.has_joiners());
        assert!(escrow.id.is_empty());
    }
}
