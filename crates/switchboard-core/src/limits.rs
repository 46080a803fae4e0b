//! Input validation limits for registry entities

use crate::entity::Entity;

/// Maximum length for entity names (256 chars)
pub const MAX_NAME_LEN: usize = 256;

/// Maximum length for an entity description (16KB)
pub const MAX_DESCRIPTION_LEN: usize = 16 * 1024;

/// Maximum length for a registry path (512 chars)
pub const MAX_PATH_LEN: usize = 512;

/// Maximum tags per entity (64)
pub const MAX_TAGS_PER_ENTITY: usize = 64;

/// Maximum tag length (64 chars)
pub const MAX_TAG_LEN: usize = 64;

/// Maximum tools, skills or allowed tools nested in one entity (500)
pub const MAX_NESTED_ITEMS: usize = 500;

/// Maximum scope groups in one import (500)
pub const MAX_BATCH_GROUPS: usize = 500;

/// Validation error type
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyName,
    NameTooLong { len: usize, max: usize },
    DescriptionTooLong { len: usize, max: usize },
    TooManyTags { count: usize, max: usize },
    TagTooLong { len: usize, max: usize },
    EmptyTag,
    TooManyNestedItems { count: usize, max: usize },
    TooManyGroups { count: usize, max: usize },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Name cannot be empty"),
            Self::NameTooLong { len, max } => {
                write!(f, "Name too long: {} chars (max {})", len, max)
            }
            Self::DescriptionTooLong { len, max } => {
                write!(f, "Description too long: {} chars (max {})", len, max)
            }
            Self::TooManyTags { count, max } => {
                write!(f, "Too many tags: {} (max {})", count, max)
            }
            Self::TagTooLong { len, max } => {
                write!(f, "Tag too long: {} chars (max {})", len, max)
            }
            Self::EmptyTag => write!(f, "Tag cannot be empty"),
            Self::TooManyNestedItems { count, max } => {
                write!(f, "Too many nested items: {} (max {})", count, max)
            }
            Self::TooManyGroups { count, max } => {
                write!(f, "Too many groups in batch: {} (max {})", count, max)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate the user-supplied fields of an entity
pub fn validate_entity(entity: &Entity) -> Result<(), ValidationError> {
    if entity.name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if entity.name.len() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong {
            len: entity.name.len(),
            max: MAX_NAME_LEN,
        });
    }
    if entity.description.len() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::DescriptionTooLong {
            len: entity.description.len(),
            max: MAX_DESCRIPTION_LEN,
        });
    }
    if entity.tags.len() > MAX_TAGS_PER_ENTITY {
        return Err(ValidationError::TooManyTags {
            count: entity.tags.len(),
            max: MAX_TAGS_PER_ENTITY,
        });
    }
    for tag in &entity.tags {
        if tag.trim().is_empty() {
            return Err(ValidationError::EmptyTag);
        }
        if tag.len() > MAX_TAG_LEN {
            return Err(ValidationError::TagTooLong {
                len: tag.len(),
                max: MAX_TAG_LEN,
            });
        }
    }
    let nested = entity.nested_summaries().len();
    if nested > MAX_NESTED_ITEMS {
        return Err(ValidationError::TooManyNestedItems {
            count: nested,
            max: MAX_NESTED_ITEMS,
        });
    }
    Ok(())
}

/// Validate the size of a group import batch
pub fn validate_group_batch(count: usize) -> Result<(), ValidationError> {
    if count > MAX_BATCH_GROUPS {
        return Err(ValidationError::TooManyGroups {
            count,
            max: MAX_BATCH_GROUPS,
        });
    }
    Ok(())
}
