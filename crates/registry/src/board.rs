use shared::{domain::ContainerId, error::CommandError};

pub const DEFAULT_COLUMNS: usize = 6;
pub const DEFAULT_ROWS: usize = 4;
/// Upper bound for either grid dimension.
pub const MAX_GRID_SIDE: usize = 32;

/// Fixed grid of placement slots. A slot holds at most one container and a container
/// sits in at most one slot.
#[derive(Debug, Clone)]
pub struct Board {
    columns: usize,
    rows: usize,
    slots: Vec<Option<ContainerId>>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new(DEFAULT_COLUMNS, DEFAULT_ROWS)
    }
}

impl Board {
    /// Dimensions above [`MAX_GRID_SIDE`] are clamped.
    pub fn new(columns: usize, rows: usize) -> Self {
        let columns = columns.min(MAX_GRID_SIDE);
        let rows = rows.min(MAX_GRID_SIDE);
        Self {
            columns,
            rows,
            slots: vec![None; columns * rows],
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[Option<ContainerId>] {
        &self.slots
    }

    pub fn occupant(&self, slot: usize) -> Option<&ContainerId> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn slot_of(&self, id: &ContainerId) -> Option<usize> {
        self.slots
            .iter()
            .position(|occupant| occupant.as_ref() == Some(id))
    }

    /// Returns `None` when the grid is full; the container then stays unplaced.
    pub fn place_first_free(&mut self, id: &ContainerId) -> Option<usize> {
        if let Some(slot) = self.slot_of(id) {
            return Some(slot);
        }
        let slot = self.slots.iter().position(Option::is_none)?;
        self.slots[slot] = Some(id.clone());
        Some(slot)
    }

    pub fn move_to(&mut self, id: &ContainerId, slot: usize) -> Result<usize, CommandError> {
        let slots = self.slots.len();
        let target = self
            .slots
            .get(slot)
            .ok_or(CommandError::SlotOutOfRange { slot, slots })?;
        match target {
            Some(occupant) if occupant == id => return Ok(slot),
            Some(occupant) => {
                return Err(CommandError::SlotOccupied {
                    slot,
                    container: occupant.short().to_string(),
                })
            }
            None => {}
        }
        self.release(id);
        self.slots[slot] = Some(id.clone());
        Ok(slot)
    }

    pub fn release(&mut self, id: &ContainerId) -> Option<usize> {
        let slot = self.slot_of(id)?;
        self.slots[slot] = None;
        Some(slot)
    }
}

#[cfg(test)]
#[path = "tests/board_tests.rs"]
mod tests;
