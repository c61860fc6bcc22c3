use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(IngestionStage {
    Received => "received",
    TextExtracted => "text_extracted",
    Analyzed => "analyzed",
    Indexed => "indexed",
    AccountProvisioned => "account_provisioned",
    Complete => "complete",
});

impl IngestionStage {
    /// The stage that legally follows this one. `Complete` is terminal.
    pub fn next(&self) -> Option<IngestionStage> {
        match self {
            Self::Received => Some(Self::TextExtracted),
            Self::TextExtracted => Some(Self::Analyzed),
            Self::Analyzed => Some(Self::Indexed),
            Self::Indexed => Some(Self::AccountProvisioned),
            Self::AccountProvisioned => Some(Self::Complete),
            Self::Complete => None,
        }
    }
}

str_enum!(LedgerStatus {
    InProgress => "in_progress",
    Complete => "complete",
    Failed => "failed",
});

str_enum!(CredentialOrigin {
    DerivedDefault => "derived_default",
});
