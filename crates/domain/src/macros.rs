//! Macro for implementing label conversions on unit enums
//!
//! Session phases and storage backends are logged, written to config files and
//! read back from environment variables. This macro gives them one consistent
//! textual form.
//!
//! # Example
//!
//! ```rust
//! use authsession_domain::impl_label_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Backend {
//!     File,
//!     Memory,
//! }
//!
//! impl_label_conversions!(Backend {
//!     File => "file",
//!     Memory => "memory",
//! });
//!
//! assert_eq!(Backend::File.as_str(), "file");
//! assert_eq!("MEMORY".parse::<Backend>(), Ok(Backend::Memory));
//! ```

/// Implements `as_str`, `Display` and `FromStr` for a unit enum.
///
/// Parsing trims surrounding whitespace and ignores ASCII case. Unknown labels
/// produce an error string naming the enum and the rejected input.
#[macro_export]
macro_rules! impl_label_conversions {
    ($enum_name:ident { $($variant:ident => $label:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical lowercase label.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_ascii_lowercase();
                $(
                    if normalized == $label {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }
    };
}
