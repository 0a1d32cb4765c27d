//! Round-robin turn advance.
//!
//! States are `NOT_STARTED` and `ACTIVE(i)`. Every transition is a pure
//! function returning the successor state and the events it produced; the
//! receiver is never mutated.

use turnkeeper_core::error::DomainError;

use super::events::TurnEvent;
use super::participant::Participant;
use super::state::RoundRobin;

impl RoundRobin {
    /// Creates a not-yet-started round-robin with the given order.
    #[must_use]
    pub fn new(participants: Vec<Participant>) -> Self {
        Self {
            participants,
            round_number: 1,
            is_started: false,
            current_index: 0,
        }
    }

    /// Returns whether a GM has started this encounter.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.is_started
    }

    /// Returns the position of the current actor once started.
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.is_started.then_some(self.current_index)
    }

    /// Returns the current actor once started.
    #[must_use]
    pub fn current(&self) -> Option<&Participant> {
        self.current_index()
            .and_then(|index| self.participants.get(index))
    }

    /// Returns whether the current actor is the last one this round.
    #[must_use]
    pub fn is_round_end(&self) -> bool {
        self.is_started
            && !self.participants.is_empty()
            && self.current_index + 1 == self.participants.len()
    }

    /// `NOT_STARTED -> ACTIVE(0)`.
    ///
    /// An empty roster still starts; the broadcaster reports that nobody is
    /// in initiative.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if already started.
    pub fn start(&self) -> Result<(Self, Vec<TurnEvent>), DomainError> {
        if self.is_started {
            return Err(DomainError::Validation(
                "initiative has already started".to_owned(),
            ));
        }

        let next = Self {
            is_started: true,
            current_index: 0,
            ..self.clone()
        };
        let mut events = vec![TurnEvent::InitiativeStarted];
        if let Some(first) = next.current() {
            events.push(TurnEvent::TurnPassed {
                from: None,
                to: first.id.clone(),
            });
        }
        Ok((next, events))
    }

    /// `ACTIVE(i) -> ACTIVE((i + 1) mod N)`, incrementing the round on wrap.
    ///
    /// N is read from the current roster so additions and removals since the
    /// last advance are respected.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotYetStarted` before start and
    /// `DomainError::NoParticipants` when the roster is empty.
    pub fn advance(&self) -> Result<(Self, Vec<TurnEvent>), DomainError> {
        if !self.is_started {
            return Err(DomainError::NotYetStarted);
        }
        let n = self.participants.len();
        if n == 0 {
            return Err(DomainError::NoParticipants);
        }

        let from = self.current().map(|p| p.id.clone());
        let next_index = (self.current_index + 1) % n;
        let mut next = Self {
            current_index: next_index,
            ..self.clone()
        };

        let mut events = Vec::with_capacity(2);
        if next_index == 0 {
            next.round_number = next.round_number.saturating_add(1);
            events.push(TurnEvent::RoundStarted {
                round_number: next.round_number,
            });
        }
        events.push(TurnEvent::TurnPassed {
            from,
            to: next.participants[next_index].id.clone(),
        });
        Ok((next, events))
    }

    /// Appends a participant to the end of the order.
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

        let event = TurnEvent::ParticipantAdded {
            participant_id: participant.id.clone(),
        };
        let mut next = self.clone();
        next.participants.push(participant);
        Ok((next, vec![event]))
    }

    /// Removes a participant, keeping the turn pointer on a live entry.
    ///
    /// Removing an earlier entry shifts the pointer down. Removing the current
    /// actor hands the turn to whoever follows; if that wraps past the end the
    /// round counts as complete.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ParticipantNotFound` for an unknown id.
    pub fn remove(&self, participant_id: &str) -> Result<(Self, Vec<TurnEvent>), DomainError> {
        let position = self
            .participants
            .iter()
            .position(|p| p.id == participant_id)
            .ok_or_else(|| DomainError::ParticipantNotFound(participant_id.to_owned()))?;

        let mut next = self.clone();
        next.participants.remove(position);
        let mut events = vec![TurnEvent::ParticipantRemoved {
            participant_id: participant_id.to_owned(),
        }];

        if !self.is_started {
            return Ok((next, events));
        }

        if position < self.current_index {
            next.current_index -= 1;
        } else if position == self.current_index {
            if next.participants.is_empty() {
                next.current_index = 0;
            } else {
                if position >= next.participants.len() {
                    next.current_index = 0;
                    next.round_number = next.round_number.saturating_add(1);
                    events.push(TurnEvent::RoundStarted {
                        round_number: next.round_number,
                    });
                }
                events.push(TurnEvent::TurnPassed {
                    from: Some(participant_id.to_owned()),
                    to: next.participants[next.current_index].id.clone(),
                });
            }
        }
        Ok((next, events))
    }
}
