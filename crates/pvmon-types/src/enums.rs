// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of PVMon.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

/// Declares a closed string enum with a fallback variant.
///
/// Backend payloads spell the same status in several ways ("Online", "online",
/// "in-progress", "In Progress"). Values are trimmed, lowercased and have spaces
/// and dashes folded into underscores before matching; anything unrecognised
/// deserializes into the fallback variant instead of failing the whole record.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $value:literal $(| $alias:literal)* ),+ $(,)?
        }
        fallback = $fallback:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),+ ];

            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $value ),+
                }
            }

            /// Strict parse, `None` for unknown spellings.
            #[must_use]
            pub fn parse(raw: &str) -> Option<Self> {
                let normalized = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
                match normalized.as_str() {
                    $( $value $(| $alias)* => Some(Self::$variant), )+
                    _ => None,
                }
            }

            #[must_use]
            pub fn parse_lenient(raw: &str) -> Self {
                Self::parse(raw).unwrap_or(Self::$fallback)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$fallback
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = crate::lenient::opt_text(deserializer)?;
                Ok(raw.map(|r| Self::parse_lenient(&r)).unwrap_or_default())
            }
        }
    };
}

pub(crate) use string_enum;
