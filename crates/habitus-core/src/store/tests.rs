//! Tests for the in-memory stores

#[cfg(test)]
mod tests {
    use crate::error::StoreError;
    use crate::event::ToolExecutionEvent;
    use crate::store::{
        with_timeout, AuditStore, InMemoryAuditStore, InMemorySimilarityService, SearchQuery,
        SimilarityService,
    };
    use crate::types::{CandidatePattern, Category, PatternId, PatternType};
    use std::time::Duration;

    fn candidate(description: &str, category: Category, confidence: f32) -> CandidatePattern {
        CandidatePattern::new(
            PatternType::Correction,
            category,
            description,
            format!("correction: {} for {}", description, category),
            confidence,
            "Bash",
        )
    }

    async fn insert(service: &InMemorySimilarityService, c: &CandidatePattern) -> PatternId {
        service
            .store(&c.text_content, c.category, c.confidence.value(), c.metadata())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_store_and_search() {
        let service = InMemorySimilarityService::new();
        let uv = candidate("use uv instead of pip", Category::PackageManagement, 0.8);
        let id = insert(&service, &uv).await;
        insert(
            &service,
            &candidate("prefer pytest over unittest", Category::Testing, 0.8),
        )
        .await;

        let hits = service
            .search(&SearchQuery::new(uv.text_content.clone(), 3))
            .await
            .unwrap();
        assert_eq!(hits[0].pattern.id, id);
        assert_eq!(hits[0].similarity, 1.0);
        assert_eq!(hits[0].pattern.frequency, 1);

        // Category scoping
        let hits = service
            .search(
                &SearchQuery::new(uv.text_content.clone(), 3)
                    .with_category(Some(Category::Testing)),
            )
            .await
            .unwrap();
        assert!(hits.iter().all(|h| h.pattern.category == Category::Testing));

        // Threshold
        let hits = service
            .search(&SearchQuery::new("use uv", 3).with_threshold(0.9))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_top_k_and_order() {
        let service = InMemorySimilarityService::new();
        for tool in ["uv", "pnpm", "yarn", "poetry"] {
            insert(
                &service,
                &candidate(&format!("use {} for package-management", tool), Category::PackageManagement, 0.5),
            )
            .await;
        }

        let hits = service
            .search(&SearchQuery::new("use pnpm for package-management", 2))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].pattern.text_content.contains("pnpm"));
        assert!(hits[0].similarity >= hits[1].similarity);
    }

    #[tokio::test]
    async fn test_reinforcement_is_monotonic() {
        let service = InMemorySimilarityService::new();
        let id = insert(
            &service,
            &candidate("use uv instead of pip", Category::PackageManagement, 0.95),
        )
        .await;

        let updated = service.record_reinforcement(&id, 0.1, 1.0, "seen again").await.unwrap();
        assert_eq!(updated.frequency, 2);
        assert_eq!(updated.confidence.value(), 1.0);

        let updated = service.record_reinforcement(&id, 0.1, 1.0, "seen again").await.unwrap();
        assert_eq!(updated.frequency, 3);
        assert_eq!(updated.confidence.value(), 1.0);

        let log = service.reinforcements().await;
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|r| r.confidence_after >= r.confidence_before));

        let missing = service
            .record_reinforcement(&PatternId::from_string("nope"), 0.1, 1.0, "")
            .await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_reinforcement_caps_at_current_confidence() {
        let service = InMemorySimilarityService::new();
        let id = insert(
            &service,
            &candidate("prefer pnpm over npm", Category::PackageManagement, 0.9),
        )
        .await;

        // Repeated steps stop at the ceiling no matter how many land
        for _ in 0..3 {
            service.record_reinforcement(&id, 0.1, 0.95, "seen again").await.unwrap();
        }
        let pattern = service.get(&id).await.unwrap();
        assert_eq!(pattern.frequency, 4);
        assert_eq!(pattern.confidence.value(), 0.95);
    }

    #[tokio::test]
    async fn test_stats() {
        let service = InMemorySimilarityService::new();
        insert(&service, &candidate("use uv instead of pip", Category::PackageManagement, 0.8)).await;
        insert(&service, &candidate("prefer ruff over pylint", Category::CodeQuality, 0.8)).await;
        insert(&service, &candidate("switch to pnpm from npm", Category::PackageManagement, 0.8)).await;

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.by_category.get(&Category::PackageManagement), Some(&2));
        assert_eq!(stats.by_category.get(&Category::CodeQuality), Some(&1));
    }

    #[tokio::test]
    async fn test_audit_append() {
        let audit = InMemoryAuditStore::new();
        let event = ToolExecutionEvent::new("Bash").with_arg("command", "ls");
        audit.append(&event, 0.4).await.unwrap();

        let records = audit.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event, event);
        assert_eq!(records[0].significance, 0.4);
    }

    #[tokio::test]
    async fn test_with_timeout() {
        let ok: Result<u32, StoreError> = with_timeout(Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let slow = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, StoreError>(())
        })
        .await;
        assert!(slow.unwrap_err().is_timeout());
    }
}
