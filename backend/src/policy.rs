//! Ownership rules for mutating owned records.
//!
//! Existence is checked before ownership, so a caller probing someone else's
//! missing record sees `NotFound` rather than `Forbidden`. Identifiers are
//! typed and canonical, which makes the comparison exact.

use crate::error::AppError;
use crate::types::UserId;

/// A record with a single owning user.
pub trait Owned {
    fn owner_id(&self) -> UserId;
}

/// Returns the resource when `actor` owns it.
pub fn ensure_owner<T: Owned>(
    actor: UserId,
    resource: Option<T>,
    what: &str,
) -> Result<T, AppError> {
    let resource = resource.ok_or_else(|| AppError::NotFound(format!("{} not found", what)))?;
    if resource.owner_id() != actor {
        return Err(AppError::Forbidden(format!(
            "You do not have permission to modify this {}",
            what.to_ascii_lowercase()
        )));
    }
    Ok(resource)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doc(UserId);

    impl Owned for Doc {
        fn owner_id(&self) -> UserId {
            self.0
        }
    }

    #[test]
    fn owner_passes() {
        let owner = UserId::new();
        assert!(ensure_owner(owner, Some(Doc(owner)), "Video").is_ok());
    }

    #[test]
    fn missing_resource_is_not_found_before_ownership() {
        let result = ensure_owner::<Doc>(UserId::new(), None, "Video");
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn other_user_is_forbidden() {
        let result = ensure_owner(UserId::new(), Some(Doc(UserId::new())), "Video");
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn differently_spelled_ids_compare_equal() {
        let owner: UserId = "0D5A3E8C-1F2B-4C3D-8E9F-A0B1C2D3E4F5".parse().unwrap();
        let actor: UserId = "0d5a3e8c-1f2b-4c3d-8e9f-a0b1c2d3e4f5".parse().unwrap();
        assert!(ensure_owner(actor, Some(Doc(owner)), "Comment").is_ok());
    }
}
