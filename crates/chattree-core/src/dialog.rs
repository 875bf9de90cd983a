use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::node::{NodeId, TurnPair};

/// Session-wide message number, starting at 1.
pub type TurnNumber = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogTurn {
    pub number: TurnNumber,
    pub role: Role,
    pub content: String,
    pub node_id: NodeId,
}

/// Append-only ledger of every message in the session.
///
/// Numbers are dense: the turn at position `i` has number `i + 1`. Users
/// speak on odd numbers and the assistant on even ones.
#[derive(Debug, Clone, Default)]
pub struct DialogStore {
    turns: Vec<DialogTurn>,
}

impl DialogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Number of the most recent turn, or 0 for an empty ledger.
    pub fn last_number(&self) -> TurnNumber {
        self.turns.last().map_or(0, |turn| turn.number)
    }

    /// The role the next appended turn must have.
    pub fn expected_role(&self) -> Role {
        if self.last_number() % 2 == 0 {
            Role::User
        } else {
            Role::Assistant
        }
    }

    pub fn append(
        &mut self,
        role: Role,
        content: impl Into<String>,
        node_id: NodeId,
    ) -> Result<&DialogTurn> {
        let expected = self.expected_role();
        if role != expected {
            return Err(Error::InvalidState(format!(
                "turn {} must be {expected:?}, got {role:?}",
                self.last_number() + 1
            )));
        }

        let number = self.last_number() + 1;
        self.turns.push(DialogTurn {
            number,
            role,
            content: content.into(),
            node_id,
        });
        Ok(&self.turns[self.turns.len() - 1])
    }

    /// Numbers the next exchange would get, without appending anything.
    pub fn next_exchange(&self) -> Result<TurnPair> {
        match self.expected_role() {
            Role::User => Ok(TurnPair::starting_at(self.last_number() + 1)),
            Role::Assistant => Err(Error::InvalidState(format!(
                "turn {} is an unanswered question",
                self.last_number()
            ))),
        }
    }

    /// Append a question and its answer as one unit: both or neither.
    pub fn append_exchange(
        &mut self,
        user_message: impl Into<String>,
        gpt_message: impl Into<String>,
        node_id: NodeId,
    ) -> Result<TurnPair> {
        let pair = self.next_exchange()?;
        self.append(Role::User, user_message, node_id.clone())?;
        self.append(Role::Assistant, gpt_message, node_id)?;
        Ok(pair)
    }

    pub fn get(&self, number: TurnNumber) -> Option<&DialogTurn> {
        let index = usize::try_from(number).ok()?.checked_sub(1)?;
        self.turns.get(index)
    }

    pub fn turns(&self) -> &[DialogTurn] {
        &self.turns
    }

    /// All turns numbered `<= up_to`, in order. The iterator is `Clone`, so
    /// callers can restart it from the beginning.
    pub fn turns_as_of(&self, up_to: TurnNumber) -> TurnsAsOf<'_> {
        TurnsAsOf {
            inner: self.turns.iter(),
            up_to,
        }
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

#[derive(Debug, Clone)]
pub struct TurnsAsOf<'a> {
    inner: std::slice::Iter<'a, DialogTurn>,
    up_to: TurnNumber,
}

impl<'a> Iterator for TurnsAsOf<'a> {
    type Item = &'a DialogTurn;

    fn next(&mut self) -> Option<Self::Item> {
        let turn = self.inner.next()?;
        if turn.number <= self.up_to {
            Some(turn)
        } else {
            // Numbers ascend, so nothing later can qualify either.
            self.inner = Default::default();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_exchanges(n: usize) -> DialogStore {
        let mut store = DialogStore::new();
        for i in 0..n {
            store
                .append_exchange(format!("q{i}"), format!("a{i}"), NodeId::root())
                .expect("exchange");
        }
        store
    }

    #[test]
    fn numbers_are_sequential_from_one() {
        let mut store = DialogStore::new();
        let first = store.append(Role::User, "hi", NodeId::root()).unwrap().number;
        let second = store
            .append(Role::Assistant, "hello", NodeId::root())
            .unwrap()
            .number;

        assert_eq!((first, second), (1, 2));
        assert_eq!(store.last_number(), 2);
    }

    #[test]
    fn alternation_is_enforced_without_consuming_a_number() {
        let mut store = DialogStore::new();
        let err = store.append(Role::Assistant, "early", NodeId::root());
        assert!(matches!(err, Err(Error::InvalidState(_))));
        assert!(store.is_empty());

        store.append(Role::User, "q", NodeId::root()).unwrap();
        assert!(store.append(Role::User, "again", NodeId::root()).is_err());
        assert!(store.next_exchange().is_err());
        assert_eq!(store.append(Role::Assistant, "a", NodeId::root()).unwrap().number, 2);
    }

    #[test]
    fn exchanges_take_odd_even_pairs() {
        let mut store = store_with_exchanges(1);
        let pair = store
            .append_exchange("q", "a", NodeId::from("root-1"))
            .unwrap();

        assert_eq!(pair, TurnPair::starting_at(3));
        assert_eq!(store.get(4).unwrap().role, Role::Assistant);
        assert_eq!(store.get(4).unwrap().node_id.as_str(), "root-1");
        assert!(store.get(0).is_none());
        assert!(store.get(5).is_none());
    }

    #[test]
    fn turns_as_of_is_bounded_and_restartable() {
        let store = store_with_exchanges(3);
        let view = store.turns_as_of(3);

        let first: Vec<_> = view.clone().map(|t| t.number).collect();
        let second: Vec<_> = view.map(|t| t.number).collect();

        assert_eq!(first, vec![1, 2, 3]);
        assert_eq!(first, second);
        assert_eq!(store.turns_as_of(0).count(), 0);
        assert_eq!(store.turns_as_of(100).count(), 6);
    }
}
