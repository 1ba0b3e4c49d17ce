use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Stable, globally unique block identifier
    BlockId
);

string_id!(
    /// Article identifier
    ArticleId
);

/// Derive an id seed from an article id using CRC32
pub fn article_seed(article_id: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(article_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential block id generator scoped to one article
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String,
    count: u32,
}

impl IdGenerator {
    pub fn new(article_id: &ArticleId) -> Self {
        Self {
            seed: article_seed(article_id.as_str()),
            count: 0,
        }
    }

    pub fn from_seed(seed: String) -> Self {
        Self { seed, count: 0 }
    }

    /// Generate next sequential ID
    pub fn new_id(&mut self) -> BlockId {
        self.count += 1;
        BlockId::new(format!("{}-{}", self.seed, self.count))
    }

    /// Skip past every id this generator could already have produced
    pub fn resume_after<'a>(&mut self, existing: impl IntoIterator<Item = &'a BlockId>) {
        let prefix = format!("{}-", self.seed);
        for id in existing {
            if let Some(n) = id
                .as_str()
                .strip_prefix(&prefix)
                .and_then(|suffix| suffix.parse::<u32>().ok())
            {
                self.count = self.count.max(n);
            }
        }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}
