//! Open access workflow state service

use crate::{
    error::{AppError, AppResult},
    models::{OpenaccessEntry, OpenaccessStage},
    repository::{Openaccess, Repository, WorkflowRepository},
};

#[derive(Clone)]
pub struct OpenaccessService {
    repository: WorkflowRepository<Openaccess>,
}

impl OpenaccessService {
    pub fn new(repository: Repository) -> Self {
        Self {
            repository: repository.openaccess,
        }
    }

    /// Start tracking an imported publication
    ///
    /// A publication that is imported again (its export tag was reset in the
    /// research system) keeps its row, but has to be marked as exported anew.
    pub async fn create(&self, pid: &str, pure_id: &str) -> AppResult<OpenaccessEntry> {
        match self.repository.create(pid, pure_id).await {
            Err(AppError::Duplicate(_)) => {
                tracing::info!("Publication {} imported again, export marking reset", pure_id);
                self.repository
                    .set_state(pid, OpenaccessStage::MarkedAsExported, false)
                    .await
            }
            result => result,
        }
    }

    pub async fn resolve(&self, pid: &str) -> AppResult<OpenaccessEntry> {
        self.repository.resolve(pid).await
    }

    /// Mark `stage` as done
    pub async fn set_state(&self, pid: &str, stage: OpenaccessStage) -> AppResult<OpenaccessEntry> {
        self.repository.set_state(pid, stage, true).await
    }

    pub async fn get_ready_to(&self, stage: OpenaccessStage) -> AppResult<Vec<OpenaccessEntry>> {
        self.repository.get_ready_to(stage).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::memory_pool;

    #[tokio::test]
    async fn test_recreate_resets_export_flag() {
        let service = OpenaccessService::new(Repository::new(memory_pool().await));
        service.create("rec-1", "900").await.unwrap();
        service.set_state("rec-1", OpenaccessStage::ImportedInRepo).await.unwrap();
        service.set_state("rec-1", OpenaccessStage::MarkedAsExported).await.unwrap();

        let entry = service.create("rec-1", "900").await.unwrap();
        assert!(entry.imported_in_repo);
        assert!(!entry.marked_as_exported);

        let ready = service.get_ready_to(OpenaccessStage::MarkedAsExported).await.unwrap();
        assert_eq!(ready.len(), 1);
    }
}
