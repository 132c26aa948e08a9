//! Strongly-typed identifiers used across the engine.
//!
//! Downstream crates should *not* pass raw integers around for table or page ids.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! new_id {
    ($name:ident, $raw:ty) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name($raw);

        impl $name {
            pub const fn new(v: $raw) -> Self {
                Self(v)
            }
            pub const fn get(self) -> $raw {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

new_id!(TempTableId, u64);
new_id!(PageNo, u32);

impl PageNo {
    /// Every table starts with a non-data header page.
    pub const HEADER: PageNo = PageNo(0);

    pub const fn is_header(self) -> bool {
        self.0 == 0
    }

    pub const fn next(self) -> PageNo {
        PageNo(self.0 + 1)
    }
}

impl TempTableId {
    /// Table name under which the store registers this temp table.
    pub fn table_name(self) -> String {
        format!("temp_{}", self.0)
    }
}
