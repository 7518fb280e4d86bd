use crate::config::SeedMode;
use crate::subject::Weight;

/// A subject placed in a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Member {
    /// Row position in the packed sequence
    pub position: usize,
    pub weight: Weight,
}

/// Subjects grouped together within one trial, in placement order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    members: Vec<Member>,
    total_weight: u64,
}

impl Batch {
    /// Whether a subject of `weight` can join without exceeding `capacity`
    pub fn fits(&self, weight: Weight, capacity: u64) -> bool {
        self.total_weight + weight as u64 <= capacity
    }

    pub(crate) fn push(&mut self, member: Member) {
        self.total_weight += member.weight as u64;
        self.members.push(member);
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().map(|m| m.position)
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// One complete randomized packing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trial {
    capacity_batches: Vec<Batch>,
    leftover: Option<Batch>,
}

impl Trial {
    pub fn new(capacity_batches: Vec<Batch>, leftover: Option<Batch>) -> Self {
        Self {
            capacity_batches,
            leftover,
        }
    }

    /// The capacity-respecting batches, in scan order
    pub fn capacity_batches(&self) -> &[Batch] {
        &self.capacity_batches
    }

    /// Subjects no capacity batch could hold, if any
    pub fn leftover(&self) -> Option<&Batch> {
        self.leftover.as_ref()
    }

    /// Capacity batches followed by the leftover batch
    pub fn batches(&self) -> impl Iterator<Item = &Batch> {
        self.capacity_batches.iter().chain(self.leftover.iter())
    }

    /// Number of subjects across all batches
    pub fn subject_count(&self) -> usize {
        self.batches().map(Batch::len).sum()
    }
}

/// Trials of one run, in generation order (index 1 is the first draw)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialSet {
    trials: Vec<Trial>,
    seed: u64,
    mode: SeedMode,
}

impl TrialSet {
    pub fn new(trials: Vec<Trial>, seed: u64, mode: SeedMode) -> Self {
        Self { trials, seed, mode }
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    /// Look up a trial by its 1-based index
    pub fn trial(&self, index: usize) -> Option<&Trial> {
        index.checked_sub(1).and_then(|i| self.trials.get(i))
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn mode(&self) -> SeedMode {
        self.mode
    }
}
