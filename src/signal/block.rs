use crate::error::{SignalError, SignalResult};

/// A mutually exclusive run of consecutive track sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSection {
    pub name: String,
    /// Track section indices, in driving order.
    pub sections: Vec<usize>,
    prev: usize,
    next: usize,
}

impl BlockSection {
    pub fn new(name: impl Into<String>, sections: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            sections,
            prev: 0,
            next: 0,
        }
    }

    pub fn first(&self) -> Option<usize> {
        self.sections.first().copied()
    }

    pub fn last(&self) -> Option<usize> {
        self.sections.last().copied()
    }

    pub fn prev(&self) -> usize {
        self.prev
    }

    pub fn next(&self) -> usize {
        self.next
    }
}

/// Blocks linked into a ring that covers every track section exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRing {
    blocks: Vec<BlockSection>,
    owner: Vec<usize>,
}

impl BlockRing {
    pub fn new(mut blocks: Vec<BlockSection>, section_count: usize) -> SignalResult<Self> {
        let owner = Self::coverage(&blocks, section_count)?;

        let n = blocks.len();
        for (i, block) in blocks.iter_mut().enumerate() {
            block.prev = (i + n - 1) % n;
            block.next = (i + 1) % n;
        }
        Ok(Self { blocks, owner })
    }

    /// Checks that `blocks` cover `section_count` sections exactly once and
    /// returns the owning block of every section.
    pub fn coverage(blocks: &[BlockSection], section_count: usize) -> SignalResult<Vec<usize>> {
        if blocks.is_empty() {
            return Err(SignalError::EmptyRing);
        }

        let mut owner = vec![usize::MAX; section_count];
        let mut count = vec![0usize; section_count];
        for (b, block) in blocks.iter().enumerate() {
            if block.sections.is_empty() {
                return Err(SignalError::EmptyBlock { block: b });
            }
            for &section in &block.sections {
                let slot = count.get_mut(section).ok_or(SignalError::UnknownSection {
                    block: b,
                    section,
                })?;
                *slot += 1;
                owner[section] = b;
            }
        }

        if let Some((section, &count)) = count.iter().enumerate().find(|(_, &c)| c != 1) {
            return Err(SignalError::Coverage { section, count });
        }
        Ok(owner)
    }

    /// Re-checks coverage against a new section count, keeping the ring
    /// untouched on error.
    pub fn revalidate(&mut self, section_count: usize) -> SignalResult<()> {
        self.owner = Self::coverage(&self.blocks, section_count)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[BlockSection] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> Option<&BlockSection> {
        self.blocks.get(index)
    }

    /// Block owning a track section.
    pub fn block_of(&self, section: usize) -> Option<usize> {
        self.owner.get(section).copied()
    }

    pub fn prev(&self, block: usize) -> usize {
        self.blocks.get(block).map_or(block, BlockSection::prev)
    }

    pub fn next(&self, block: usize) -> usize {
        self.blocks.get(block).map_or(block, BlockSection::next)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Free,
    Occupied,
}

/// Free flag per block. Only replaced through `enter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupancy {
    free: Vec<bool>,
}

impl Occupancy {
    pub fn all_free(ring: &BlockRing) -> Self {
        Self {
            free: vec![true; ring.len()],
        }
    }

    pub fn is_free(&self, block: usize) -> bool {
        self.free.get(block).copied().unwrap_or(false)
    }

    pub fn state(&self, block: usize) -> BlockState {
        if self.is_free(block) {
            BlockState::Free
        } else {
            BlockState::Occupied
        }
    }

    pub fn free_count(&self) -> usize {
        self.free.iter().filter(|&&f| f).count()
    }

    /// A train entered `block`: it becomes occupied and its predecessor,
    /// which the train just left, becomes free.
    #[must_use]
    pub fn enter(&self, ring: &BlockRing, block: usize) -> Occupancy {
        let mut next = self.clone();
        if block >= next.free.len() {
            return next;
        }
        next.free[block] = false;
        let prev = ring.prev(block);
        if prev != block {
            next.free[prev] = true;
        }
        next
    }

    /// A train was put into `block` directly, without leaving another one.
    #[must_use]
    pub fn occupy(&self, block: usize) -> Occupancy {
        let mut next = self.clone();
        if let Some(free) = next.free.get_mut(block) {
            *free = false;
        }
        next
    }
}
