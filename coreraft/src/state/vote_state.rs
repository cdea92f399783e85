//! The persistent per-term vote record.

use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;

use crate::error::SafetyViolation;
use crate::raft_types::Term;
use crate::raft_types::NO_TERM;
use crate::state::marshal::try_get_i64;
use crate::state::marshal::try_get_u8;
use crate::state::marshal::ChannelMarshal;
use crate::state::marshal::StateMarshal;
use crate::type_config::RaftMember;

/// Which member we voted for in which term.
///
/// Must be durable before a granting vote response leaves the member, or a
/// restart could hand out a second vote in the same term.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize), serde(bound = ""))]
pub struct VoteState<M: RaftMember> {
    voted_for: Option<M>,
    term: Term,
}

impl<M: RaftMember> Default for VoteState<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RaftMember> VoteState<M> {
    pub fn new() -> Self {
        Self {
            voted_for: None,
            term: NO_TERM,
        }
    }

    pub fn with_vote(voted_for: M, term: Term) -> Self {
        Self {
            voted_for: Some(voted_for),
            term,
        }
    }

    pub fn voted_for(&self) -> Option<&M> {
        self.voted_for.as_ref()
    }

    pub fn term(&self) -> Term {
        self.term
    }

    /// Record a vote. Returns whether the persisted state changed.
    ///
    /// A term change resets the record unconditionally. Within one term
    /// the vote can only go from unset to set; replacing an existing vote
    /// with a different one is a safety violation.
    pub fn update(&mut self, voted_for: Option<M>, term: Term) -> Result<bool, SafetyViolation> {
        if term != self.term {
            self.voted_for = voted_for;
            self.term = term;
            return Ok(true);
        }

        match (&self.voted_for, voted_for) {
            (None, None) => Ok(false),
            (None, Some(new)) => {
                self.voted_for = Some(new);
                Ok(true)
            }
            (Some(current), new) => {
                if new.as_ref() == Some(current) {
                    Ok(false)
                } else {
                    Err(SafetyViolation::DoubleVote {
                        term,
                        voted_for: current.to_string(),
                    })
                }
            }
        }
    }
}

/// Durable encoding of [`VoteState`]: the term, a presence flag, and the
/// marshaled member.
pub struct VoteStateMarshal<M, CM> {
    member_marshal: CM,
    _p: std::marker::PhantomData<M>,
}

impl<M, CM> VoteStateMarshal<M, CM>
where
    M: RaftMember,
    CM: ChannelMarshal<M>,
{
    pub fn new(member_marshal: CM) -> Self {
        Self {
            member_marshal,
            _p: std::marker::PhantomData,
        }
    }
}

impl<M, CM> StateMarshal<VoteState<M>> for VoteStateMarshal<M, CM>
where
    M: RaftMember,
    CM: ChannelMarshal<M>,
{
    fn marshal(&self, state: &VoteState<M>, buf: &mut BytesMut) {
        buf.put_i64(state.term);
        match &state.voted_for {
            None => buf.put_u8(0),
            Some(m) => {
                buf.put_u8(1);
                self.member_marshal.marshal(m, buf);
            }
        }
    }

    fn unmarshal(&self, buf: &mut Bytes) -> Option<VoteState<M>> {
        let term = try_get_i64(buf)?;
        let voted_for = match try_get_u8(buf)? {
            0 => None,
            _ => Some(self.member_marshal.unmarshal(buf)?),
        };
        Some(VoteState { voted_for, term })
    }

    fn start_state(&self) -> VoteState<M> {
        VoteState::new()
    }

    fn ordinal(&self, state: &VoteState<M>) -> i64 {
        state.term
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::testing::TestMember;
    use crate::testing::TestMemberMarshal;

    #[test]
    fn test_vote_resets_on_term_change() {
        let mut v = VoteState::new();

        assert!(v.update(Some(TestMember(1)), 1).unwrap());
        assert_eq!(Some(&TestMember(1)), v.voted_for());

        // New term: any vote is acceptable, including none.
        assert!(v.update(None, 2).unwrap());
        assert_eq!(None, v.voted_for());
        assert_eq!(2, v.term());
    }

    #[test]
    fn test_unset_vote_can_be_set_once() {
        let mut v = VoteState::new();
        v.update(None, 3).unwrap();

        assert!(v.update(Some(TestMember(7)), 3).unwrap());
        // Voting again for the same member changes nothing.
        assert!(!v.update(Some(TestMember(7)), 3).unwrap());
    }

    #[test]
    fn test_conflicting_vote_in_same_term_is_a_violation() {
        let mut v = VoteState::new();
        v.update(Some(TestMember(1)), 3).unwrap();

        let err = v.update(Some(TestMember(2)), 3).unwrap_err();
        assert!(matches!(err, SafetyViolation::DoubleVote { term: 3, .. }));
        // The original vote is untouched.
        assert_eq!(Some(&TestMember(1)), v.voted_for());

        let err = v.update(None, 3).unwrap_err();
        assert!(matches!(err, SafetyViolation::DoubleVote { term: 3, .. }));
    }

    #[test]
    fn test_marshal_roundtrip() {
        let marshal = VoteStateMarshal::new(TestMemberMarshal);

        for state in [VoteState::new(), VoteState::with_vote(TestMember(3), 9)] {
            let mut buf = BytesMut::new();
            marshal.marshal(&state, &mut buf);
            let mut bytes = buf.freeze();
            assert_eq!(Some(state), marshal.unmarshal(&mut bytes));
        }
    }

    #[test]
    fn test_unmarshal_truncated_input_is_absent() {
        let marshal = VoteStateMarshal::new(TestMemberMarshal);
        let state = VoteState::with_vote(TestMember(3), 9);

        let mut buf = BytesMut::new();
        marshal.marshal(&state, &mut buf);
        let full = buf.freeze();

        for cut in 0..full.len() {
            let mut truncated = full.slice(0..cut);
            assert_eq!(None, marshal.unmarshal(&mut truncated), "cut at {}", cut);
        }
    }
}
