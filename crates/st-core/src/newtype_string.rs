//! Macro for defining validated string newtypes.
//!
//! Migration and table names end up as ledger keys and SQL identifiers, so
//! they share one invariant: non-empty and free of surrounding whitespace.

/// Returns true when `s` is acceptable as a name.
pub(crate) fn is_valid_name(s: &str) -> bool {
    !s.is_empty() && s.trim() == s
}

/// Define a strongly-typed name newtype.
///
/// Generates the struct plus `new()` (panics on an invalid name),
/// `try_new()`, `as_str()`, `into_inner()`, `Display`, `AsRef<str>`,
/// `Deref<Target=str>`, `Borrow<str>`, string comparisons, and a
/// `Deserialize` impl that rejects invalid names.
macro_rules! define_name {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
        #[serde(transparent)]
        $vis struct $Name(String);

        impl<'de> serde::Deserialize<'de> for $Name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $Name::try_new(s).ok_or_else(|| {
                    serde::de::Error::custom(concat!(
                        stringify!($Name),
                        " must be non-empty without surrounding whitespace"
                    ))
                })
            }
        }

        impl $Name {
            /// Create a new name, panicking if it is empty or padded.
            ///
            /// Prefer [`try_new`](Self::try_new) for untrusted input.
            pub fn new(name: impl Into<String>) -> Self {
                let s = name.into();
                assert!(
                    $crate::newtype_string::is_valid_name(&s),
                    concat!(stringify!($Name), " must be non-empty without surrounding whitespace")
                );
                Self(s)
            }

            /// Try to create a new name, returning `None` if it is invalid.
            pub fn try_new(name: impl Into<String>) -> Option<Self> {
                let s = name.into();
                $crate::newtype_string::is_valid_name(&s).then_some(Self(s))
            }

            /// Return the name as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $Name {
            fn as_ref(&self) -> &str { &self.0 }
        }

        impl std::ops::Deref for $Name {
            type Target = str;
            fn deref(&self) -> &str { &self.0 }
        }

        impl std::borrow::Borrow<str> for $Name {
            fn borrow(&self) -> &str { &self.0 }
        }

        impl PartialEq<str> for $Name {
            fn eq(&self, other: &str) -> bool { self.0 == other }
        }

        impl PartialEq<&str> for $Name {
            fn eq(&self, other: &&str) -> bool { self.0 == *other }
        }
    };
}

pub(crate) use define_name;
