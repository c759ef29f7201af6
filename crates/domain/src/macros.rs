//! Macro for implementing Display and FromStr for string-backed enums
//!
//! Session enums such as logout reasons and token roles travel as short
//! lowercase strings (config files, logs, JWT claims). This macro gives them
//! one implementation of both directions.
//!
//! # Example
//!
//! ```rust
//! use authgate_domain::impl_domain_str_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Channel {
//!     Web,
//!     Desktop,
//! }
//!
//! impl_domain_str_conversions!(Channel {
//!     Web => "web",
//!     Desktop => "desktop",
//! });
//!
//! assert_eq!(Channel::Web.to_string(), "web");
//! assert_eq!("DESKTOP".parse::<Channel>().unwrap(), Channel::Desktop);
//! ```

/// Implements Display and FromStr traits for string-backed enums
///
/// This macro generates:
/// - Display trait: converts enum variants to their lowercase strings
/// - FromStr trait: parses case-insensitive strings to enum variants
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their string
///   representations (must be lowercase)
#[macro_export]
macro_rules! impl_domain_str_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
