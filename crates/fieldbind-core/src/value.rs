#![forbid(unsafe_code)]

//! Field values and the absence policy.
//!
//! A binding falls back to its default when the store holds nothing at the
//! path. Whether a *stored* blank value (`""`, `0`, `false`, `null`) also
//! counts as nothing is a policy decision, see [`AbsencePolicy`].

use serde::{Deserialize, Serialize};

/// A value that can live in a field store.
pub trait FieldValue: Clone + PartialEq + 'static {
    /// Whether the value reads as blank: empty text, zero, `false`, null.
    ///
    /// Only consulted under [`AbsencePolicy::Blank`].
    fn is_blank(&self) -> bool;
}

impl FieldValue for serde_json::Value {
    fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Bool(b) => !b,
            Self::Number(n) => n.as_f64().is_some_and(|f| f == 0.0 || f.is_nan()),
            Self::String(s) => s.is_empty(),
            Self::Array(_) | Self::Object(_) => false,
        }
    }
}

impl FieldValue for String {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl FieldValue for &'static str {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl FieldValue for bool {
    fn is_blank(&self) -> bool {
        !*self
    }
}

macro_rules! impl_field_value_int {
    ($($t:ty),*) => {
        $(
            impl FieldValue for $t {
                fn is_blank(&self) -> bool {
                    *self == 0
                }
            }
        )*
    };
}

impl_field_value_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl FieldValue for f32 {
    fn is_blank(&self) -> bool {
        *self == 0.0 || self.is_nan()
    }
}

impl FieldValue for f64 {
    fn is_blank(&self) -> bool {
        *self == 0.0 || self.is_nan()
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn is_blank(&self) -> bool {
        self.as_ref().is_none_or(FieldValue::is_blank)
    }
}

impl<T: Clone + PartialEq + 'static> FieldValue for Vec<T> {
    fn is_blank(&self) -> bool {
        false
    }
}

/// When a stored value counts as absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AbsencePolicy {
    /// Only an empty slot is absent. Stored blanks are kept.
    #[default]
    Missing,
    /// An empty slot or a blank value is absent, so stored blanks are replaced
    /// by the default on read and by hydration.
    Blank,
}

impl AbsencePolicy {
    /// Whether `stored` counts as absent under this policy.
    #[must_use]
    pub fn is_absent<V: FieldValue>(self, stored: Option<&V>) -> bool {
        match (self, stored) {
            (_, None) => true,
            (Self::Missing, Some(_)) => false,
            (Self::Blank, Some(value)) => value.is_blank(),
        }
    }

    /// Parse the kebab-case name used in config files and the environment.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "missing" => Some(Self::Missing),
            "blank" => Some(Self::Blank),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_blanks() {
        for blank in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert!(blank.is_blank(), "{blank} should be blank");
        }
        for filled in [json!(true), json!(5), json!("x"), json!([]), json!({})] {
            assert!(!filled.is_blank(), "{filled} should not be blank");
        }
    }

    #[test]
    fn scalar_blanks() {
        assert!(String::new().is_blank());
        assert!(!"a".to_string().is_blank());
        assert!(0_i32.is_blank());
        assert!(!7_u64.is_blank());
        assert!(f64::NAN.is_blank());
        assert!(false.is_blank());
        assert!(None::<i32>.is_blank());
        assert!(Some(0_i32).is_blank());
        assert!(!Some(3_i32).is_blank());
        assert!(!Vec::<i32>::new().is_blank());
    }

    #[test]
    fn missing_policy_keeps_blanks() {
        let policy = AbsencePolicy::Missing;
        assert!(policy.is_absent::<i32>(None));
        assert!(!policy.is_absent(Some(&0)));
        assert!(!policy.is_absent(Some(&String::new())));
    }

    #[test]
    fn blank_policy_treats_blanks_as_absent() {
        let policy = AbsencePolicy::Blank;
        assert!(policy.is_absent::<i32>(None));
        assert!(policy.is_absent(Some(&0)));
        assert!(policy.is_absent(Some(&json!(""))));
        assert!(!policy.is_absent(Some(&json!("x"))));
    }

    #[test]
    fn default_policy_is_missing() {
        assert_eq!(AbsencePolicy::default(), AbsencePolicy::Missing);
    }

    #[test]
    fn from_name_is_case_insensitive() {
        assert_eq!(AbsencePolicy::from_name("Blank"), Some(AbsencePolicy::Blank));
        assert_eq!(AbsencePolicy::from_name(" missing "), Some(AbsencePolicy::Missing));
        assert_eq!(AbsencePolicy::from_name("falsy"), None);
    }
}
