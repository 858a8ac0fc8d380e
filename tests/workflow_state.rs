//! Workflow state store against an in-memory database

use repo_workflows::{
    config::DatabaseConfig,
    models::{OpenaccessStage, ThesesStage},
    repository::Repository,
    services::{openaccess::OpenaccessService, theses::ThesesService},
    AppError,
};

async fn repository() -> Repository {
    let config = DatabaseConfig {
        url: "sqlite::memory:".into(),
        max_connections: 1,
        min_connections: 1,
    };
    let repository = Repository::connect(&config).await.unwrap();
    repository.migrate().await.unwrap();
    repository
}

#[tokio::test]
async fn thesis_advances_one_stage_per_sweep() {
    let theses = ThesesService::new(repository().await);
    theses.create("rec-1", "4711").await.unwrap();

    assert!(theses.get_ready_to(ThesesStage::ArchivedInCms).await.unwrap().is_empty());
    theses.set_state("rec-1", ThesesStage::ImportedInRepo).await.unwrap();

    let mut previous = ThesesStage::ImportedInRepo;
    for stage in &ThesesStage::ALL[1..] {
        let ready = theses.get_ready_to(*stage).await.unwrap();
        assert_eq!(ready.len(), 1, "{} should be ready after {}", stage, previous);
        assert_eq!(ready[0].cms_id, "4711");

        theses.set_state("rec-1", *stage).await.unwrap();
        assert!(theses.get_ready_to(*stage).await.unwrap().is_empty());
        previous = *stage;
    }

    let entry = theses.resolve("rec-1").await.unwrap();
    assert!(entry.published_in_cms);
    assert!(entry.updated_in_repo);
}

#[tokio::test]
async fn stages_are_not_skipped() {
    let theses = ThesesService::new(repository().await);
    theses.create("rec-1", "4711").await.unwrap();
    theses.set_state("rec-1", ThesesStage::ImportedInRepo).await.unwrap();

    assert!(theses.get_ready_to(ThesesStage::CreatedInAlma).await.unwrap().is_empty());
    assert!(theses.get_ready_to(ThesesStage::PublishedInCms).await.unwrap().is_empty());
}

#[tokio::test]
async fn thesis_is_tracked_once() {
    let theses = ThesesService::new(repository().await);
    theses.create("rec-1", "4711").await.unwrap();

    let err = theses.create("rec-1", "4711").await.unwrap_err();
    assert!(err.is_duplicate());

    let err = theses.resolve("rec-2").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn reimported_publication_is_exported_again() {
    let openaccess = OpenaccessService::new(repository().await);
    openaccess.create("rec-1", "900").await.unwrap();
    openaccess.set_state("rec-1", OpenaccessStage::ImportedInRepo).await.unwrap();
    openaccess.set_state("rec-1", OpenaccessStage::MarkedAsExported).await.unwrap();
    assert!(openaccess
        .get_ready_to(OpenaccessStage::MarkedAsExported)
        .await
        .unwrap()
        .is_empty());

    let entry = openaccess.create("rec-1", "900").await.unwrap();
    assert!(entry.imported_in_repo);
    assert!(!entry.marked_as_exported);

    let ready = openaccess.get_ready_to(OpenaccessStage::MarkedAsExported).await.unwrap();
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0].pure_id, "900");
}
