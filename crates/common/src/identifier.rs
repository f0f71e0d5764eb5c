//! Package identifiers as given by users and clients.

use anyhow::anyhow;
use serde::{de, de::Visitor, Deserialize, Serialize};
use std::{
    convert::TryFrom,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// Identifies a package either by its numeric ID or by its slug. Which one a given string is gets
/// decided once, when it's parsed: a string consisting only of ASCII digits is an ID, anything
/// else is a slug.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Identifier {
    /// A package's numeric ID.
    ById(i64),
    /// A package's slug.
    BySlug(String),
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::ById(id) => write!(f, "{}", id),
            Identifier::BySlug(slug) => f.write_str(slug),
        }
    }
}

impl FromStr for Identifier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.is_empty() {
            Err(anyhow!("empty package identifier"))
        } else if s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Identifier::ById(s.parse()?))
        } else {
            Ok(Identifier::BySlug(String::from(s)))
        }
    }
}

impl Serialize for Identifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Identifier::ById(id) => serializer.serialize_i64(*id),
            Identifier::BySlug(slug) => serializer.serialize_str(slug),
        }
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct IdentifierVisitor;

        impl<'de> Visitor<'de> for IdentifierVisitor {
            type Value = Identifier;

            fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
                formatter.write_str("package ID or slug")
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Identifier::ById(v))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                i64::try_from(v)
                    .map(Identifier::ById)
                    .map_err(|_| de::Error::invalid_value(de::Unexpected::Unsigned(v), &self))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                v.parse::<Self::Value>()
                    .map_err(|_| de::Error::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_any(IdentifierVisitor)
    }
}
