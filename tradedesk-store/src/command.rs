// ============================================================================
// Optimistic Mutation Commands
// ============================================================================
//
// Each command applies a provisional change to a collection and returns a
// snapshot that can either confirm the change with the server's entity or
// roll the collection back to exactly what it was before.
//
// ============================================================================

use crate::collection::CollectionState;
use tradedesk_core::{Entity, EntityAction, EntityId, TransitionError};

/// A provisional change to one entity.
#[derive(Debug, Clone)]
pub enum MutationCommand<E: Entity> {
    /// Shallow-merge a patch onto the entity.
    Update { id: EntityId, patch: E::Patch },
    /// Remove the entity from the collection.
    Delete { id: EntityId },
    /// Move the entity to its next status.
    Transition { id: EntityId, action: E::Action },
}

impl<E: Entity> MutationCommand<E> {
    pub fn id(&self) -> &EntityId {
        match self {
            MutationCommand::Update { id, .. }
            | MutationCommand::Delete { id }
            | MutationCommand::Transition { id, .. } => id,
        }
    }

    /// Apply the provisional change and capture what is needed to undo it.
    ///
    /// Fails only for transitions the current status does not allow; in that
    /// case `state` is left untouched.
    pub fn apply(
        &self,
        state: &mut CollectionState<E>,
    ) -> Result<MutationSnapshot<E>, TransitionError> {
        match self {
            MutationCommand::Update { id, patch } => replace_with(state, id, |current| {
                let mut next = current.clone();
                next.apply_patch(patch);
                Ok(next)
            }),
            MutationCommand::Transition { id, action } => {
                replace_with(state, id, |current| action.apply_optimistic(current))
            }
            MutationCommand::Delete { id } => Ok(remove(state, id)),
        }
    }
}

/// Everything required to undo one applied command.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationSnapshot<E> {
    Replaced {
        id: EntityId,
        /// Item as it was in `items`, if it was listed.
        previous: Option<E>,
        /// Detail entity as it was, if it was the same record.
        previous_selected: Option<E>,
        /// Page generation the change was applied to.
        generation: u64,
    },
    Removed {
        id: EntityId,
        /// Original position and value, if it was listed.
        removed: Option<(usize, E)>,
        previous_selected: Option<E>,
        was_selected: bool,
        decremented_total: bool,
        generation: u64,
    },
}

impl<E: Entity> MutationSnapshot<E> {
    pub fn id(&self) -> &EntityId {
        match self {
            MutationSnapshot::Replaced { id, .. } | MutationSnapshot::Removed { id, .. } => id,
        }
    }

    /// Merge the confirmed server entity. A delete confirmed after the page
    /// was re-fetched also drops the entity from the fresh page.
    pub fn confirm(self, state: &mut CollectionState<E>, confirmed: Option<&E>) {
        match self {
            MutationSnapshot::Replaced { .. } => {
                if let Some(entity) = confirmed {
                    state.replace(entity.clone());
                    state.replace_selected(entity);
                }
            }
            MutationSnapshot::Removed { id, generation, .. } => {
                if state.generation != generation {
                    remove(state, &id);
                }
            }
        }
    }

    /// Restore the state captured before the command was applied.
    ///
    /// When the page was replaced in the meantime the fresh page is already
    /// authoritative: list rows and the total are left alone and only the
    /// detail entity and selection are restored.
    pub fn rollback(self, state: &mut CollectionState<E>) {
        match self {
            MutationSnapshot::Replaced {
                previous,
                previous_selected,
                generation,
                ..
            } => {
                if let Some(previous) = previous.filter(|_| state.generation == generation) {
                    state.replace(previous);
                }
                if let Some(previous_selected) = previous_selected {
                    state.replace_selected(&previous_selected);
                }
            }
            MutationSnapshot::Removed {
                id,
                removed,
                previous_selected,
                was_selected,
                decremented_total,
                generation,
            } => {
                if state.generation == generation {
                    if let Some((index, item)) = removed {
                        if !state.contains(&id) {
                            let index = index.min(state.items.len());
                            state.items.insert(index, item);
                        }
                    }
                    if decremented_total {
                        state.pagination.total_count += 1;
                    }
                }
                if was_selected && state.contains(&id) {
                    state.selected_ids.insert(id);
                }
                if state.selected.is_none() {
                    state.selected = previous_selected;
                }
            }
        }
    }
}

fn replace_with<E: Entity>(
    state: &mut CollectionState<E>,
    id: &EntityId,
    next: impl Fn(&E) -> Result<E, TransitionError>,
) -> Result<MutationSnapshot<E>, TransitionError> {
    let listed = state.position(id);
    let selected = state.selected.as_ref().filter(|s| s.id() == id).cloned();

    // Validate against whichever copy we have before touching anything.
    let listed_next = match listed {
        Some(index) => Some(next(&state.items[index])?),
        None => None,
    };
    let selected_next = match &selected {
        Some(current) => Some(next(current)?),
        None => None,
    };

    let previous = match (listed, listed_next) {
        (Some(index), Some(updated)) => Some(std::mem::replace(&mut state.items[index], updated)),
        _ => None,
    };
    if let Some(updated) = selected_next {
        state.selected = Some(updated);
    }

    Ok(MutationSnapshot::Replaced {
        id: id.clone(),
        previous,
        previous_selected: selected,
        generation: state.generation,
    })
}

fn remove<E: Entity>(state: &mut CollectionState<E>, id: &EntityId) -> MutationSnapshot<E> {
    let removed = state
        .position(id)
        .map(|index| (index, state.items.remove(index)));

    let decremented_total = removed.is_some() && state.pagination.total_count > 0;
    if decremented_total {
        state.pagination.total_count -= 1;
    }

    let was_selected = state.selected_ids.remove(id);
    let previous_selected = if state.selected.as_ref().is_some_and(|s| s.id() == id) {
        state.selected.take()
    } else {
        None
    };

    MutationSnapshot::Removed {
        id: id.clone(),
        removed,
        previous_selected,
        was_selected,
        decremented_total,
        generation: state.generation,
    }
}
