use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! label_enum {
    ($(#[$meta:meta])* $name:ident, $axis:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|label| label.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| ValidationError::UnknownLabel {
                        axis: $axis,
                        value: s.to_owned(),
                    })
            }
        }
    };
}

label_enum!(
    /// Whether the book is itself a canonical text or writes about one.
    SourceType, "source type" {
        Primary => "primary",
        Secondary => "secondary",
    }
);

label_enum!(
    /// What the book is for. A book may serve several.
    Function, "function" {
        Foundational => "foundational",
        Theory => "theory",
        Introductory => "introductory",
        Educational => "educational",
        Historical => "historical",
        Commentary => "commentary",
    }
);

label_enum!(
    Difficulty, "difficulty" {
        Beginner => "beginner",
        Intermediate => "intermediate",
        Advanced => "advanced",
    }
);

label_enum!(
    Tradition, "tradition" {
        ClassicalMarxism => "classical_marxism",
        Leninism => "leninism",
        Trotskyism => "trotskyism",
        Maoism => "maoism",
        WesternMarxism => "western_marxism",
        MarxismLeninism => "marxism_leninism",
        Other => "other",
    }
);
