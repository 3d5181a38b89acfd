//! User directory
//!
//! Read-only view of the `users` collection owned by the auth collaborator.
//! Only `membershipType` is consumed here.

use crate::auth::User;
use crate::error::AuthError;
use crate::quota::MembershipTier;
use crate::store::SharedStore;
use tracing::{debug, instrument};

/// Field of the user profile holding the tier
pub const MEMBERSHIP_FIELD: &str = "membershipType";

/// Looks up user profiles in the document store
#[derive(Clone)]
pub struct UserDirectory {
    store: SharedStore,
    collection: String,
}

impl UserDirectory {
    pub fn new(store: SharedStore, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Load a user's membership tier
    #[instrument(skip(self))]
    pub async fn lookup(&self, user_id: &str) -> Result<User, AuthError> {
        let doc = self
            .store
            .get(&self.collection, user_id)
            .await?
            .ok_or_else(|| AuthError::UnknownUser(user_id.to_string()))?;

        let raw = doc
            .fields
            .get(MEMBERSHIP_FIELD)
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        let membership = MembershipTier::try_parse(raw).ok_or_else(|| AuthError::UnknownTier {
            user_id: user_id.to_string(),
            tier: raw.to_string(),
        })?;

        debug!(user_id, %membership, "Resolved user");
        Ok(User::new(user_id, membership))
    }
}
