use habitat_common::{BuildableRecord, PlacementId, WorldPos};
use habitat_grid::Removal;
use habitat_kernel::{Site, SiteError};

/// A building action that can be applied to the site and reversed.
///
/// Each command carries the full record so it can undo itself.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildCommand {
    /// Place a module. Undo = remove it.
    Place { record: BuildableRecord },
    /// Remove a module. Undo = place it again under the same id.
    Remove { record: BuildableRecord },
}

impl BuildCommand {
    /// Produce the inverse command (for undo).
    pub fn inverse(&self) -> Self {
        match self {
            Self::Place { record } => Self::Remove {
                record: record.clone(),
            },
            Self::Remove { record } => Self::Place {
                record: record.clone(),
            },
        }
    }
}

/// Errors from building tool operations.
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error(transparent)]
    Site(#[from] SiteError),
    #[error("cannot restore {tag} at {pos}: the spot is taken")]
    Blocked { tag: String, pos: WorldPos },
}

/// Building tool with undo/redo.
///
/// Every accepted placement or removal is pushed on the undo stack and can
/// be reverted with `undo()` and re-applied with `redo()`.
#[derive(Debug, Default)]
pub struct BuildTool {
    undo_stack: Vec<BuildCommand>,
    redo_stack: Vec<BuildCommand>,
}

impl BuildTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a module. Returns its id, or `None` if the site rejected it.
    pub fn place(
        &mut self,
        site: &mut Site,
        record: BuildableRecord,
    ) -> Result<Option<PlacementId>, EditError> {
        let id = record.id;
        if !site.place(record.clone())? {
            return Ok(None);
        }
        self.undo_stack.push(BuildCommand::Place { record });
        self.redo_stack.clear();
        Ok(Some(id))
    }

    /// Remove a placed module and push to undo stack.
    pub fn remove(&mut self, site: &mut Site, id: PlacementId) -> Result<Removal, EditError> {
        let (record, outcome) = site.remove(id)?;
        self.undo_stack.push(BuildCommand::Remove { record });
        self.redo_stack.clear();
        Ok(outcome)
    }

    /// Undo the last edit. Returns true if an operation was undone.
    pub fn undo(&mut self, site: &mut Site) -> Result<bool, EditError> {
        let Some(cmd) = self.undo_stack.pop() else {
            return Ok(false);
        };
        if let Err(err) = apply_command(site, &cmd.inverse()) {
            self.undo_stack.push(cmd);
            return Err(err);
        }
        self.redo_stack.push(cmd);
        Ok(true)
    }

    /// Redo the last undone edit. Returns true if an operation was redone.
    pub fn redo(&mut self, site: &mut Site) -> Result<bool, EditError> {
        let Some(cmd) = self.redo_stack.pop() else {
            return Ok(false);
        };
        if let Err(err) = apply_command(site, &cmd) {
            self.redo_stack.push(cmd);
            return Err(err);
        }
        self.undo_stack.push(cmd);
        Ok(true)
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
}

fn apply_command(site: &mut Site, cmd: &BuildCommand) -> Result<(), EditError> {
    match cmd {
        BuildCommand::Place { record } => {
            if !site.place(record.clone())? {
                return Err(EditError::Blocked {
                    tag: record.tag.clone(),
                    pos: record.position,
                });
            }
        }
        BuildCommand::Remove { record } => {
            site.remove(record.id)?;
        }
    }
    tracing::debug!(?cmd, "build command applied");
    Ok(())
}
