//! Popcorn turn advance.
//!
//! States are `PRE_PICK` (no current actor) and `IN_ROUND` (a current actor
//! plus the ids still waiting this round). The acting participant nominates
//! the next one; once everyone has acted, anyone may be nominated again,
//! including whoever just acted, and that nomination opens the next round.

use turnkeeper_core::error::DomainError;

use super::events::TurnEvent;
use super::participant::Participant;
use super::state::Popcorn;

impl Popcorn {
    /// Creates a popcorn encounter awaiting the GM's first pick.
    #[must_use]
    pub fn new(participants: Vec<Participant>) -> Self {
        Self {
            participants,
            round_number: 1,
            is_started: false,
            current: None,
            remaining_in_round: Vec::new(),
        }
    }

    /// Returns the id of the acting participant.
    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Returns the ids that have not acted this round, in roster order.
    #[must_use]
    pub fn remaining_in_round(&self) -> &[String] {
        &self.remaining_in_round
    }

    /// Returns whether everyone has acted this round.
    #[must_use]
    pub fn is_round_end(&self) -> bool {
        self.current.is_some() && self.remaining_in_round.is_empty()
    }

    /// Returns whether the GM is re-picking partway through a round, after
    /// the acting participant left.
    fn is_mid_round_repick(&self) -> bool {
        self.current.is_none() && self.is_started && !self.remaining_in_round.is_empty()
    }

    /// Returns the ids that may be nominated next.
    ///
    /// Before the first pick and at a round boundary this is the whole
    /// roster (deduplicated, in roster order); mid-round it is exactly the
    /// ids still waiting, including while the GM re-picks.
    #[must_use]
    pub fn legal_nominees(&self) -> Vec<String> {
        if self.is_mid_round_repick() {
            self.remaining_in_round.clone()
        } else if self.current.is_none() || self.is_round_end() {
            let mut ids: Vec<String> = Vec::with_capacity(self.participants.len());
            for p in &self.participants {
                if !ids.contains(&p.id) {
                    ids.push(p.id.clone());
                }
            }
            ids
        } else {
            self.remaining_in_round.clone()
        }
    }

    fn everyone_except(&self, id: &str) -> Vec<String> {
        self.participants
            .iter()
            .filter(|p| p.id != id)
            .map(|p| p.id.clone())
            .collect()
    }

    /// The GM's pick: `PRE_PICK -> IN_ROUND`.
    ///
    /// The opening pick seeds the waiting list with everyone else. A re-pick
    /// after the acting participant left continues the round from the ids
    /// still waiting; if nobody is waiting it opens the next round.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NoParticipants` for an empty roster,
    /// `DomainError::Validation` when someone already holds the turn, and
    /// `DomainError::InvalidNominee` when `participant_id` is outside
    /// [`Popcorn::legal_nominees`].
    pub fn first_pick(&self, participant_id: &str) -> Result<(Self, Vec<TurnEvent>), DomainError> {
        if self.participants.is_empty() {
            return Err(DomainError::NoParticipants);
        }
        if self.current.is_some() {
            return Err(DomainError::Validation(
                "the first pick has already been made".to_owned(),
            ));
        }
        let legal = self.legal_nominees();
        if !legal.iter().any(|id| id == participant_id) {
            return Err(DomainError::InvalidNominee {
                nominee_id: participant_id.to_owned(),
                legal,
            });
        }

        let mut next = Self {
            is_started: true,
            current: Some(participant_id.to_owned()),
            ..self.clone()
        };
        let mut events = vec![TurnEvent::FirstPicked {
            participant_id: participant_id.to_owned(),
        }];
        if self.is_mid_round_repick() {
            next.remaining_in_round.retain(|id| id != participant_id);
        } else {
            next.remaining_in_round = self.everyone_except(participant_id);
            if self.is_started {
                next.round_number = self.round_number.saturating_add(1);
                events.push(TurnEvent::RoundStarted {
                    round_number: next.round_number,
                });
            }
        }
        events.push(TurnEvent::TurnPassed {
            from: None,
            to: participant_id.to_owned(),
        });
        Ok((next, events))
    }

    /// The current actor nominates who goes next.
    ///
    /// At a round boundary the round increments and the waiting list is
    /// reseeded with everyone except the nominee.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NoParticipants` for an empty roster,
    /// `DomainError::NotYetStarted` before the first pick, and
    /// `DomainError::InvalidNominee` (carrying the legal set) for a nominee
    /// outside [`Popcorn::legal_nominees`].
    pub fn advance(&self, nominee_id: &str) -> Result<(Self, Vec<TurnEvent>), DomainError> {
        if self.participants.is_empty() {
            return Err(DomainError::NoParticipants);
        }
        if self.current.is_none() {
            return Err(DomainError::NotYetStarted);
        }
        let legal = self.legal_nominees();
        if !legal.iter().any(|id| id == nominee_id) {
            return Err(DomainError::InvalidNominee {
                nominee_id: nominee_id.to_owned(),
                legal,
            });
        }

        let mut next = self.clone();
        let mut events = Vec::with_capacity(2);
        if self.is_round_end() {
            next.round_number = self.round_number.saturating_add(1);
            next.remaining_in_round = self.everyone_except(nominee_id);
            events.push(TurnEvent::RoundStarted {
                round_number: next.round_number,
            });
        } else {
            next.remaining_in_round.retain(|id| id != nominee_id);
        }
        next.current = Some(nominee_id.to_owned());
        events.push(TurnEvent::TurnPassed {
            from: self.current.clone(),
            to: nominee_id.to_owned(),
        });
        Ok((next, events))
    }

    /// Adds a participant to the pool. Once the first pick has been made the
    /// newcomer also waits to act this round.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the id is already present.
    pub fn add(&self, participant: Participant) -> Result<(Self, Vec<TurnEvent>), DomainError> {
        if self.participants.iter().any(|p| p.id == participant.id) {
            return Err(DomainError::Validation(format!(
                "{} is already in initiative",
                participant.name
            )));
        }

        let mut next = self.clone();
        if next.is_started {
            next.remaining_in_round.push(participant.id.clone());
        }
        let event = TurnEvent::ParticipantAdded {
            participant_id: participant.id.clone(),
        };
        next.participants.push(participant);
        Ok((next, vec![event]))
    }

    /// Removes a participant from the pool and the waiting list. Removing
    /// the current actor returns the encounter to `PRE_PICK` with the round
    /// number and waiting list kept.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ParticipantNotFound` for an unknown id.
    pub fn remove(&self, participant_id: &str) -> Result<(Self, Vec<TurnEvent>), DomainError> {
        if !self.participants.iter().any(|p| p.id == participant_id) {
            return Err(DomainError::ParticipantNotFound(participant_id.to_owned()));
        }

        let mut next = self.clone();
        next.participants.retain(|p| p.id != participant_id);
        next.remaining_in_round.retain(|id| id != participant_id);
        let mut events = vec![TurnEvent::ParticipantRemoved {
            participant_id: participant_id.to_owned(),
        }];
        if next.current.as_deref() == Some(participant_id) {
            next.current = None;
            events.push(TurnEvent::PickReturnedToGm);
        }
        Ok((next, events))
    }
}
