//! The persistent current term.

use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;

use crate::error::SafetyViolation;
use crate::raft_types::Term;
use crate::state::marshal::try_get_i64;
use crate::state::marshal::StateMarshal;

/// The current term of a member, persisted so that a restart can never
/// regress it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TermState {
    term: Term,
}

impl TermState {
    pub fn new() -> Self {
        Self { term: 0 }
    }

    pub fn with_term(term: Term) -> Self {
        Self { term }
    }

    pub fn current(&self) -> Term {
        self.term
    }

    /// Advance to `new_term`. Returns whether anything changed; a
    /// regression is a safety violation.
    pub fn update(&mut self, new_term: Term) -> Result<bool, SafetyViolation> {
        if new_term < self.term {
            return Err(SafetyViolation::TermRegression {
                current: self.term,
                proposed: new_term,
            });
        }
        if new_term == self.term {
            return Ok(false);
        }
        self.term = new_term;
        Ok(true)
    }
}

/// Durable encoding of [`TermState`]: the term as a big-endian `i64`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermStateMarshal;

impl StateMarshal<TermState> for TermStateMarshal {
    fn marshal(&self, state: &TermState, buf: &mut BytesMut) {
        buf.put_i64(state.term);
    }

    fn unmarshal(&self, buf: &mut Bytes) -> Option<TermState> {
        let term = try_get_i64(buf)?;
        Some(TermState { term })
    }

    fn start_state(&self) -> TermState {
        TermState::new()
    }

    fn ordinal(&self, state: &TermState) -> i64 {
        state.term
    }
}
