//! Durable encodings for persistent state.

use bytes::Bytes;
use bytes::BytesMut;

/// Encodes one value inside a larger state encoding.
///
/// `unmarshal` returns `None` when the input ends before a complete value
/// could be read; truncated input signals absence, not corruption.
pub trait ChannelMarshal<T>: Send + Sync {
    fn marshal(&self, value: &T, buf: &mut BytesMut);

    fn unmarshal(&self, buf: &mut Bytes) -> Option<T>;
}

/// Encodes a whole persisted state kind.
///
/// One implementation exists per persisted kind (vote, term, ...). The
/// `ordinal` orders encodings of the same kind so that a store keeping
/// multiple generations can pick the most recent.
pub trait StateMarshal<T>: Send + Sync {
    fn marshal(&self, state: &T, buf: &mut BytesMut);

    /// `None` when the input is truncated or holds no state.
    fn unmarshal(&self, buf: &mut Bytes) -> Option<T>;

    /// The state a member starts from when nothing was ever persisted.
    fn start_state(&self) -> T;

    fn ordinal(&self, state: &T) -> i64;
}

/// Reads an `i64`, or `None` if fewer than 8 bytes remain.
pub(crate) fn try_get_i64(buf: &mut Bytes) -> Option<i64> {
    use bytes::Buf;

    if buf.remaining() < 8 {
        return None;
    }
    Some(buf.get_i64())
}

/// Reads a single byte, or `None` at the end of input.
pub(crate) fn try_get_u8(buf: &mut Bytes) -> Option<u8> {
    use bytes::Buf;

    if buf.remaining() < 1 {
        return None;
    }
    Some(buf.get_u8())
}
