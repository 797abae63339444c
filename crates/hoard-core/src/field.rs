//! The tri-state field model shared by every optional piece of metadata.
//!
//! A field is either never attempted ([`Tri::Unknown`]), attempted and
//! confirmed missing ([`Tri::Absent`]), or known with a value
//! ([`Tri::Present`]). `Absent` and `Unknown` must never be conflated:
//! treating an absent value as unknown makes upstream fetchers retry work
//! that is already known to be fruitless.

use serde::{Deserialize, Serialize};

// ─── Tri ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Tri<T> {
  /// No attempt has been made to learn the value.
  Unknown,
  /// An attempt was made and the value is confirmed not to exist.
  Absent,
  Present(T),
}

impl<T> Default for Tri<T> {
  fn default() -> Self { Self::Unknown }
}

impl<T> Tri<T> {
  pub fn is_unknown(&self) -> bool { matches!(self, Self::Unknown) }

  pub fn is_absent(&self) -> bool { matches!(self, Self::Absent) }

  pub fn is_known(&self) -> bool { !self.is_unknown() }

  pub fn present(&self) -> Option<&T> {
    match self {
      Self::Present(v) => Some(v),
      _ => None,
    }
  }

  pub fn as_ref(&self) -> Tri<&T> {
    match self {
      Self::Unknown => Tri::Unknown,
      Self::Absent => Tri::Absent,
      Self::Present(v) => Tri::Present(v),
    }
  }

  pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Tri<U> {
    match self {
      Self::Unknown => Tri::Unknown,
      Self::Absent => Tri::Absent,
      Self::Present(v) => Tri::Present(f(v)),
    }
  }

  /// A definite observation: `None` means the source looked and found
  /// nothing.
  pub fn observed(value: Option<T>) -> Self {
    match value {
      Some(v) => Self::Present(v),
      None => Self::Absent,
    }
  }

  /// A maybe-observation: `None` means the source says nothing at all.
  pub fn from_option(value: Option<T>) -> Self {
    match value {
      Some(v) => Self::Present(v),
      None => Self::Unknown,
    }
  }
}

// ─── Blank values ────────────────────────────────────────────────────────────

/// Values that can be present yet carry no information (an empty
/// description, an empty language list).
pub trait Blank {
  fn is_blank(&self) -> bool;
}

impl Blank for String {
  fn is_blank(&self) -> bool { self.trim().is_empty() }
}

impl<T> Blank for Vec<T> {
  fn is_blank(&self) -> bool { self.is_empty() }
}

impl Blank for bool {
  fn is_blank(&self) -> bool { false }
}

impl<T: Blank> Tri<T> {
  /// `true` once the field holds a non-blank value; settled values are never
  /// overwritten by the default merge policy.
  pub fn is_settled(&self) -> bool {
    matches!(self, Self::Present(v) if !v.is_blank())
  }

  /// Whether `incoming` should fill this field under the default policy.
  ///
  /// A non-blank incoming value replaces anything unsettled (unknown,
  /// absent, or blank). An incoming `Absent` or blank value only fills
  /// `Unknown`.
  pub fn accepts(&self, incoming: &Tri<T>) -> bool
  where
    T: PartialEq,
  {
    match incoming {
      Tri::Unknown => false,
      Tri::Absent => self.is_unknown(),
      Tri::Present(v) if v.is_blank() => self.is_unknown(),
      Tri::Present(_) => !self.is_settled() && self != incoming,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn text(s: &str) -> Tri<String> { Tri::Present(s.to_owned()) }

  #[test]
  fn three_states_are_distinct_in_json() {
    let unknown = serde_json::to_string(&Tri::<String>::Unknown).unwrap();
    let absent = serde_json::to_string(&Tri::<String>::Absent).unwrap();
    let present = serde_json::to_string(&text("hi")).unwrap();

    assert_eq!(absent, r#"{"state":"absent"}"#);
    assert_eq!(present, r#"{"state":"present","value":"hi"}"#);
    assert_ne!(unknown, absent);

    let back: Tri<String> = serde_json::from_str(&absent).unwrap();
    assert!(back.is_absent());
  }

  #[test]
  fn settled_requires_non_blank_value() {
    assert!(!Tri::<String>::Unknown.is_settled());
    assert!(!Tri::<String>::Absent.is_settled());
    assert!(!text("  ").is_settled());
    assert!(text("a tool").is_settled());
    assert!(Tri::Present(false).is_settled());
  }

  #[test]
  fn unknown_accepts_any_observation() {
    let field = Tri::<String>::Unknown;
    assert!(field.accepts(&Tri::Absent));
    assert!(field.accepts(&text("")));
    assert!(field.accepts(&text("x")));
    assert!(!field.accepts(&Tri::Unknown));
  }

  #[test]
  fn absent_is_replaced_only_by_positive_evidence() {
    let field = Tri::<String>::Absent;
    assert!(!field.accepts(&Tri::Absent));
    assert!(!field.accepts(&text("")));
    assert!(field.accepts(&text("found it")));
  }

  #[test]
  fn settled_value_is_never_replaced() {
    let field = text("ours");
    assert!(!field.accepts(&text("theirs")));
    assert!(!field.accepts(&Tri::Absent));
    assert!(!field.accepts(&text("ours")));
  }
}
