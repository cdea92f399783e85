//! Optional trait bounds that depend on enabled crate features.

/// A trait that is required only when the `serde` feature is enabled.
///
/// With `serde` enabled, member and content types must be serializable so
/// that messages and persistent state can derive `Serialize`/`Deserialize`
/// with `serde(bound = "")`.
#[cfg(feature = "serde")]
pub trait OptionalSerde: serde::Serialize + for<'de> serde::Deserialize<'de> {}

#[cfg(feature = "serde")]
impl<T> OptionalSerde for T where T: serde::Serialize + for<'de> serde::Deserialize<'de> {}

/// A trait that is required only when the `serde` feature is enabled.
#[cfg(not(feature = "serde"))]
pub trait OptionalSerde {}

#[cfg(not(feature = "serde"))]
impl<T> OptionalSerde for T {}
