//! Group recomputation over a record stream.
//!
//! When a chunk is synthesized from another source the ROOT_GROUPS and
//! ALL_GROUPS records it carries may be stale or empty placeholders.
//! [`GroupsCollector`] holds those records back, collects group ids from
//! every ARTIFACT_ADD that streams past, and emits freshly computed group
//! records once the inner stream is exhausted. Rebuilding a context's
//! group sets runs its live artifacts through the same collector.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::fields::root_group;
use crate::record::{EntryKey, Record, RecordType};

pub struct GroupsCollector<I> {
    inner: I,
    root_groups: BTreeSet<String>,
    all_groups: BTreeSet<String>,
    want_root: bool,
    want_all: bool,
    tail: Vec<Record>,
    exhausted: bool,
}

impl<I> GroupsCollector<I>
where
    I: Iterator<Item = Result<Record>>,
{
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            root_groups: BTreeSet::new(),
            all_groups: BTreeSet::new(),
            want_root: false,
            want_all: false,
            tail: Vec::new(),
            exhausted: false,
        }
    }

    pub fn root_groups(&self) -> &BTreeSet<String> {
        &self.root_groups
    }

    pub fn all_groups(&self) -> &BTreeSet<String> {
        &self.all_groups
    }

    fn observe(&mut self, record: &Record) {
        if record.record_type != RecordType::ArtifactAdd {
            return;
        }
        if let Some(group) = record.get_string(EntryKey::GroupId) {
            self.root_groups.insert(root_group(group).to_string());
            self.all_groups.insert(group.to_string());
        }
    }
}

impl<I> Iterator for GroupsCollector<I>
where
    I: Iterator<Item = Result<Record>>,
{
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.exhausted {
            match self.inner.next() {
                Some(Ok(record)) => match record.record_type {
                    RecordType::RootGroups => self.want_root = true,
                    RecordType::AllGroups => self.want_all = true,
                    _ => {
                        self.observe(&record);
                        return Some(Ok(record));
                    }
                },
                Some(Err(e)) => return Some(Err(e)),
                None => {
                    self.exhausted = true;
                    // Popped from the back: ALL_GROUPS comes out last.
                    if self.want_all {
                        self.tail
                            .push(Record::groups(RecordType::AllGroups, self.all_groups.iter().cloned()));
                    }
                    if self.want_root {
                        self.tail.push(Record::groups(
                            RecordType::RootGroups,
                            self.root_groups.iter().cloned(),
                        ));
                    }
                }
            }
        }
        self.tail.pop().map(Ok)
    }
}
