use crate::history::{Member, MemberId};
use std::collections::HashMap;

/// Accumulated directed traffic from one member to another.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Interaction {
    pub count: u64,
    pub sum: f64,
}

impl Interaction {
    pub fn new(count: u64, sum: f64) -> Self {
        Self { count, sum }
    }

    pub fn record(&mut self, score: f64) {
        self.count += 1;
        self.sum += score;
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Dense author × target matrix over the tracked members of one scope.
///
/// Every ordered pair of distinct members has a cell from the start; the
/// diagonal is never read or written.
#[derive(Debug, Clone)]
pub struct InteractionMatrix {
    members: Vec<Member>,
    index: HashMap<MemberId, usize>,
    cells: Vec<Interaction>,
}

impl InteractionMatrix {
    /// Build a zeroed matrix. Duplicate members keep their first position.
    pub fn new(members: impl IntoIterator<Item = Member>) -> Self {
        let mut index = HashMap::new();
        let mut ordered = Vec::new();
        for member in members {
            if index.contains_key(&member.id) {
                continue;
            }
            index.insert(member.id, ordered.len());
            ordered.push(member);
        }
        let n = ordered.len();
        Self {
            members: ordered,
            index,
            cells: vec![Interaction::default(); n * n],
        }
    }

    /// A zeroed matrix over the same members.
    pub fn empty_like(&self) -> Self {
        Self {
            members: self.members.clone(),
            index: self.index.clone(),
            cells: vec![Interaction::default(); self.cells.len()],
        }
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: MemberId) -> bool {
        self.index.contains_key(&id)
    }

    fn slot(&self, author: MemberId, target: MemberId) -> Option<usize> {
        if author == target {
            return None;
        }
        let row = *self.index.get(&author)?;
        let col = *self.index.get(&target)?;
        Some(row * self.members.len() + col)
    }

    /// Count one message from `author` to `target` with sentiment `score`.
    ///
    /// Both ids must be tracked and distinct.
    pub fn record(&mut self, author: MemberId, target: MemberId, score: f64) {
        let slot = self.slot(author, target);
        debug_assert!(
            slot.is_some(),
            "record({author}, {target}) outside the tracked member set"
        );
        if let Some(slot) = slot {
            self.cells[slot].record(score);
        }
    }

    /// Interaction for an ordered pair. `None` for self pairs and untracked ids.
    pub fn get(&self, author: MemberId, target: MemberId) -> Option<&Interaction> {
        self.slot(author, target).map(|slot| &self.cells[slot])
    }

    /// Cell by matrix position; the diagonal reads as zero.
    pub fn at(&self, row: usize, col: usize) -> Interaction {
        if row == col {
            return Interaction::default();
        }
        self.cells[row * self.members.len() + col]
    }

    /// Total messages `author` addressed to anyone.
    pub fn outgoing_count(&self, author: MemberId) -> u64 {
        let Some(&row) = self.index.get(&author) else {
            return 0;
        };
        let n = self.members.len();
        self.cells[row * n..(row + 1) * n]
            .iter()
            .enumerate()
            .filter(|(col, _)| *col != row)
            .map(|(_, cell)| cell.count)
            .sum()
    }

    /// Fold another tally over the same members into this one.
    pub fn absorb(&mut self, other: &InteractionMatrix) {
        debug_assert_eq!(self.index, other.index, "absorb across different member sets");
        for (author, target, cell) in other.iter() {
            if let Some(slot) = self.slot(author.id, target.id) {
                self.cells[slot].count += cell.count;
                self.cells[slot].sum += cell.sum;
            }
        }
    }

    /// Non-empty cells as `(author, target, interaction)`.
    pub fn iter(&self) -> impl Iterator<Item = (&Member, &Member, &Interaction)> + '_ {
        let n = self.members.len();
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| !cell.is_empty())
            .map(move |(slot, cell)| (&self.members[slot / n], &self.members[slot % n], cell))
    }

    /// Number of recorded (author, target) messages.
    pub fn total_count(&self) -> u64 {
        self.cells.iter().map(|c| c.count).sum()
    }
}
