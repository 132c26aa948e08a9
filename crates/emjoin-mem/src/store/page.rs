//! Pages as the store hands them to operators.

use serde::{Deserialize, Serialize};

use emjoin_core::id::PageNo;
use emjoin_core::schema::Schema;
use emjoin_core::types::Record;

/// A fixed-capacity container of records.
///
/// Operators never look at a page's layout; they only count it against their
/// budget and iterate its records. Page 0 of every table is the header page
/// and carries no records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub number: PageNo,
    pub records: Vec<Record>,
}

impl Page {
    pub fn new(number: PageNo, records: Vec<Record>) -> Self {
        Self { number, records }
    }

    pub fn header() -> Self {
        Self {
            number: PageNo::HEADER,
            records: Vec::new(),
        }
    }

    pub fn is_header(&self) -> bool {
        self.number.is_header()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Payload of a table's header page on storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableHeader {
    pub name: String,
    pub schema: Schema,
    pub records_per_page: usize,
}
