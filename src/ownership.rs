use futures::future::try_join_all;
use uuid::Uuid;

use crate::{
    error::{ApiError, Result},
    repository::RepositoryState,
    validation::{INVALID_FOLDER_ID, INVALID_TAG_ID},
};

/// OwnershipValidator
///
/// Confirms that every folder and tag a note mutation references exists and belongs
/// to the requesting user. A reference to someone else's entity fails with exactly
/// the same message as a reference to nothing, so callers cannot probe for other
/// users' ids.
#[derive(Clone)]
pub struct OwnershipValidator {
    repo: RepositoryState,
}

impl OwnershipValidator {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// Runs the folder check, then the tag check. Nothing is written either way.
    pub async fn check(&self, user_id: Uuid, folder_id: Option<Uuid>, tag_ids: &[Uuid]) -> Result<()> {
        if let Some(folder_id) = folder_id {
            self.check_folder(user_id, folder_id).await?;
        }
        if !tag_ids.is_empty() {
            self.check_tags(user_id, tag_ids).await?;
        }
        Ok(())
    }

    async fn check_folder(&self, user_id: Uuid, folder_id: Uuid) -> Result<()> {
        match self.repo.get_folder(folder_id).await? {
            Some(folder) if folder.user_id == user_id => Ok(()),
            _ => {
                tracing::debug!(%user_id, %folder_id, "rejected folder reference");
                Err(ApiError::validation(INVALID_FOLDER_ID))
            }
        }
    }

    /// One lookup per tag, all in flight at once.
    async fn check_tags(&self, user_id: Uuid, tag_ids: &[Uuid]) -> Result<()> {
        let lookups = tag_ids.iter().map(|id| self.repo.get_tag(*id));
        let tags = try_join_all(lookups).await?;

        let all_owned = tags
            .iter()
            .all(|tag| tag.as_ref().is_some_and(|t| t.user_id == user_id));
        if all_owned {
            Ok(())
        } else {
            tracing::debug!(%user_id, "rejected tag reference");
            Err(ApiError::validation(INVALID_TAG_ID))
        }
    }
}
