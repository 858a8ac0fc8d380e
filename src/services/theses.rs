//! Theses workflow state service

use crate::{
    error::AppResult,
    models::{ThesesEntry, ThesesStage},
    repository::{Repository, Theses, WorkflowRepository},
};

#[derive(Clone)]
pub struct ThesesService {
    repository: WorkflowRepository<Theses>,
}

impl ThesesService {
    pub fn new(repository: Repository) -> Self {
        Self {
            repository: repository.theses,
        }
    }

    /// Start tracking an imported thesis
    pub async fn create(&self, pid: &str, cms_id: &str) -> AppResult<ThesesEntry> {
        let entry = self.repository.create(pid, cms_id).await?;
        tracing::debug!("Tracking thesis {} as {}", cms_id, pid);
        Ok(entry)
    }

    pub async fn resolve(&self, pid: &str) -> AppResult<ThesesEntry> {
        self.repository.resolve(pid).await
    }

    /// Mark `stage` as done
    pub async fn set_state(&self, pid: &str, stage: ThesesStage) -> AppResult<ThesesEntry> {
        self.repository.set_state(pid, stage, true).await
    }

    pub async fn get_ready_to(&self, stage: ThesesStage) -> AppResult<Vec<ThesesEntry>> {
        self.repository.get_ready_to(stage).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::memory_pool;

    #[tokio::test]
    async fn test_walks_the_stage_graph() {
        let service = ThesesService::new(Repository::new(memory_pool().await));
        service.create("rec-1", "4711").await.unwrap();
        service.set_state("rec-1", ThesesStage::ImportedInRepo).await.unwrap();

        for stage in &ThesesStage::ALL[1..] {
            let ready = service.get_ready_to(*stage).await.unwrap();
            assert_eq!(ready.len(), 1, "{}", stage);
            service.set_state("rec-1", *stage).await.unwrap();
            assert!(service.get_ready_to(*stage).await.unwrap().is_empty());
        }

        let entry = service.resolve("rec-1").await.unwrap();
        assert!(entry.published_in_cms);
    }
}
