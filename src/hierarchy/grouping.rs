//! Grouping levels and the cyclic tiling shared by the grouping builders.
//!
//! A level is a short pattern of group sizes. The pattern tiles the elements
//! of the level below from element 0 onwards and repeats as often as needed,
//! backwards as well as forwards, so element indices are signed.

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateFunction;
use crate::error::{SpecResult, SpecificationError};
use crate::types::DataTypeSpec;

/// Merges `size` adjacent elements of the level below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub size: usize,
    #[serde(default)]
    pub function: AggregateFunction,
}

impl Group {
    pub fn new(size: usize, function: AggregateFunction) -> Self {
        Self { size, function }
    }
}

/// One output level: an ordered pattern of groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub groups: Vec<Group>,
}

/// The placement of one group instance within the tiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Tile {
    /// Global index of the group instance on its level.
    pub index: i64,
    /// First covered element of the level below.
    pub start: i64,
    /// One past the last covered element of the level below.
    pub end: i64,
    /// Position of the group within the declared pattern.
    pub position: usize,
}

impl Level {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a group, builder style.
    pub fn with_group(mut self, size: usize, function: AggregateFunction) -> Self {
        self.add_group(size, function);
        self
    }

    pub fn add_group(&mut self, size: usize, function: AggregateFunction) -> &mut Self {
        self.groups.push(Group::new(size, function));
        self
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of lower-level elements one pass of the pattern covers.
    pub fn pattern_size(&self) -> usize {
        self.groups.iter().map(|g| g.size).sum()
    }

    /// Find the group instance covering `element` of the level below.
    pub(crate) fn locate(&self, element: i64) -> Tile {
        let total = self.pattern_size().max(1) as i64;
        let count = self.groups.len().max(1) as i64;
        let cycle = element.div_euclid(total);
        let mut offset = element.rem_euclid(total);
        let mut start = cycle * total;

        for (position, group) in self.groups.iter().enumerate() {
            let size = group.size as i64;
            if offset < size {
                return Tile {
                    index: cycle * count + position as i64,
                    start,
                    end: start + size,
                    position,
                };
            }
            offset -= size;
            start += size;
        }

        // Only reachable for patterns without any non-empty group
        Tile {
            index: cycle * count,
            start: element,
            end: element + 1,
            position: 0,
        }
    }

    /// The group instance with global index `index`.
    pub(crate) fn tile(&self, index: i64) -> Tile {
        let total = self.pattern_size() as i64;
        let count = self.groups.len().max(1) as i64;
        let cycle = index.div_euclid(count);
        let position = index.rem_euclid(count) as usize;
        let offset: i64 = self.groups[..position.min(self.groups.len())]
            .iter()
            .map(|g| g.size as i64)
            .sum();
        let size = self.groups.get(position).map(|g| g.size as i64).unwrap_or(1);
        let start = cycle * total + offset;
        Tile {
            index,
            start,
            end: start + size,
            position,
        }
    }
}

/// Index at `depth` of the element that contains `element` of depth 0.
///
/// Depth 0 is the base level; depth `d` is tiled by `levels[d - 1]`.
pub(crate) fn ascend(levels: &[Level], depth: usize, element: i64) -> i64 {
    levels[..depth]
        .iter()
        .fold(element, |index, level| level.locate(index).index)
}

/// Base elements `[start, end)` covered by element `index` at `depth`.
pub(crate) fn base_range(levels: &[Level], depth: usize, index: i64) -> (i64, i64) {
    if depth == 0 {
        return (index, index + 1);
    }
    let tile = levels[depth - 1].tile(index);
    let (start, _) = base_range(levels, depth - 1, tile.start);
    let (_, end) = base_range(levels, depth - 1, tile.end - 1);
    (start, end)
}

/// Check the structural invariants of grouping levels.
pub fn validate_levels(levels: &[Level]) -> SpecResult<()> {
    for (i, level) in levels.iter().enumerate() {
        if level.is_empty() {
            return Err(SpecificationError::EmptyLevel { level: i });
        }
        if level.groups.iter().any(|g| g.size == 0) {
            return Err(SpecificationError::ZeroSizeGroup { level: i });
        }
    }
    Ok(())
}

/// Check that every group function can be evaluated for `data_type`.
pub fn check_functions(levels: &[Level], data_type: &DataTypeSpec) -> SpecResult<()> {
    levels
        .iter()
        .flat_map(|level| level.groups.iter())
        .try_for_each(|group| group.function.check(data_type))
}

/// A splice operation on grouping levels.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupEdit {
    /// Insert a size-1 group before `index`, copying its function.
    AddBefore { level: usize, index: usize },
    /// Insert a size-1 group after `index`, copying its function.
    AddAfter { level: usize, index: usize },
    /// Merge the group into its predecessor.
    MergeUp { level: usize, index: usize },
    /// Merge the group with its successor.
    MergeDown { level: usize, index: usize },
    Remove { level: usize, index: usize },
    Resize { level: usize, index: usize, size: usize },
    SetFunction {
        level: usize,
        index: usize,
        function: AggregateFunction,
    },
    /// Append a level holding a single group of size 1.
    AddLevel,
    RemoveLevel { level: usize },
}

impl GroupEdit {
    /// Apply the edit in place.
    pub fn apply(&self, levels: &mut Vec<Level>) -> SpecResult<()> {
        match self {
            GroupEdit::AddLevel => {
                levels.push(Level::new().with_group(1, AggregateFunction::default()));
                Ok(())
            }
            GroupEdit::RemoveLevel { level } => {
                checked(*level, levels.len())?;
                levels.remove(*level);
                Ok(())
            }
            GroupEdit::AddBefore { level, index } => {
                let groups = groups_mut(levels, *level)?;
                checked(*index, groups.len())?;
                let function = groups[*index].function.clone();
                groups.insert(*index, Group::new(1, function));
                Ok(())
            }
            GroupEdit::AddAfter { level, index } => {
                let groups = groups_mut(levels, *level)?;
                checked(*index, groups.len())?;
                let function = groups[*index].function.clone();
                groups.insert(*index + 1, Group::new(1, function));
                Ok(())
            }
            GroupEdit::MergeUp { level, index } => {
                let groups = groups_mut(levels, *level)?;
                checked(*index, groups.len())?;
                if *index == 0 {
                    return Err(SpecificationError::IndexOutOfBounds {
                        index: 0,
                        len: groups.len(),
                    });
                }
                let merged = groups.remove(*index);
                groups[*index - 1].size += merged.size;
                Ok(())
            }
            GroupEdit::MergeDown { level, index } => {
                let groups = groups_mut(levels, *level)?;
                checked(*index + 1, groups.len())?;
                let merged = groups.remove(*index + 1);
                groups[*index].size += merged.size;
                Ok(())
            }
            GroupEdit::Remove { level, index } => {
                let groups = groups_mut(levels, *level)?;
                checked(*index, groups.len())?;
                if groups.len() == 1 {
                    return Err(SpecificationError::LastElement("group"));
                }
                groups.remove(*index);
                Ok(())
            }
            GroupEdit::Resize { level, index, size } => {
                if *size == 0 {
                    return Err(SpecificationError::ZeroSizeGroup { level: *level });
                }
                let groups = groups_mut(levels, *level)?;
                checked(*index, groups.len())?;
                groups[*index].size = *size;
                Ok(())
            }
            GroupEdit::SetFunction {
                level,
                index,
                function,
            } => {
                let groups = groups_mut(levels, *level)?;
                checked(*index, groups.len())?;
                groups[*index].function = function.clone();
                Ok(())
            }
        }
    }
}

fn checked(index: usize, len: usize) -> SpecResult<()> {
    if index < len {
        Ok(())
    } else {
        Err(SpecificationError::IndexOutOfBounds { index, len })
    }
}

fn groups_mut(levels: &mut [Level], level: usize) -> SpecResult<&mut Vec<Group>> {
    let len = levels.len();
    levels
        .get_mut(level)
        .map(|l| &mut l.groups)
        .ok_or(SpecificationError::IndexOutOfBounds { index: level, len })
}
