//! Ownership checks applied before any campaign or lead is read or mutated.

use uuid::Uuid;

use crate::error::DomainError;
use crate::models::{Campaign, Lead};

/// An entity that belongs to exactly one user.
pub trait Owned {
    const ENTITY: &'static str;

    fn id(&self) -> Uuid;
    fn owner_id(&self) -> Uuid;
}

impl Owned for Campaign {
    const ENTITY: &'static str = "campaign";

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

impl Owned for Lead {
    const ENTITY: &'static str = "lead";

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

pub fn authorize_access<T: Owned>(entity: &T, acting_user_id: Uuid) -> Result<(), DomainError> {
    if entity.owner_id() == acting_user_id {
        Ok(())
    } else {
        Err(DomainError::Forbidden {
            entity: T::ENTITY,
            id: entity.id(),
        })
    }
}

/// Resolves an optional lookup into an entity the acting user may touch.
pub fn require_owned<T: Owned>(entity: Option<T>, acting_user_id: Uuid) -> Result<T, DomainError> {
    let entity = entity.ok_or(DomainError::NotFound(T::ENTITY))?;
    authorize_access(&entity, acting_user_id)?;
    Ok(entity)
}
