//! End-to-end flow over an in-memory database: define, start, assign,
//! track, evaluate, and close out a test.

use std::sync::Arc;

use splitlab::adapters::sqlite::{
    create_migrated_test_pool, SqliteEventRepository, SqliteTestRepository,
};
use splitlab::domain::models::{
    AbTest, GoalType, TestDefinition, TestPatch, TestStatus, VariantDefinition, VisitorKey,
};
use splitlab::services::{
    EventRecorder, LifecycleController, SignificanceEvaluator, TestRegistry, VariantAssignor,
    Verdict,
};
use splitlab::EngineError;

struct Engine {
    registry: TestRegistry<SqliteTestRepository, SqliteEventRepository>,
    assignor: VariantAssignor<SqliteTestRepository>,
    recorder: EventRecorder<SqliteTestRepository, SqliteEventRepository>,
    evaluator: SignificanceEvaluator<SqliteTestRepository>,
    lifecycle: LifecycleController<SqliteTestRepository>,
}

async fn engine() -> Engine {
    let pool = create_migrated_test_pool()
        .await
        .expect("failed to create test pool");
    let test_repo = Arc::new(SqliteTestRepository::new(pool.clone()));
    let event_repo = Arc::new(SqliteEventRepository::new(pool));

    Engine {
        registry: TestRegistry::new(test_repo.clone(), event_repo.clone()),
        assignor: VariantAssignor::new(test_repo.clone()),
        recorder: EventRecorder::new(test_repo.clone(), event_repo),
        evaluator: SignificanceEvaluator::new(test_repo.clone()),
        lifecycle: LifecycleController::new(test_repo),
    }
}

fn headline_test() -> TestDefinition {
    TestDefinition {
        test: AbTest::new("Hero headline", "#hero-headline", GoalType::Click)
            .with_min_sample_size(100),
        variants: vec![
            VariantDefinition::control("Original"),
            VariantDefinition::treatment("Benefit-led"),
        ],
    }
}

#[tokio::test]
async fn test_full_experiment_lifecycle() {
    let engine = engine().await;

    let created = engine.registry.create_test(&headline_test()).await.unwrap();
    let test_id = created.test.id;
    assert_eq!(created.test.status, TestStatus::Draft);

    // Draft tests assign nobody.
    let visitor = VisitorKey::Anonymous("sess-1".to_string());
    let err = engine.assignor.assign(test_id, &visitor).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));

    let started = engine.lifecycle.activate(test_id).await.unwrap();
    assert_eq!(started.status, TestStatus::Running);

    // Assignments are sticky across repeated calls.
    let first = engine.assignor.assign(test_id, &visitor).await.unwrap();
    for _ in 0..10 {
        let again = engine.assignor.assign(test_id, &visitor).await.unwrap();
        assert_eq!(again.id, first.id);
    }

    // Control converts never, treatment converts 30% of the time: a clear
    // winner once both arms pass the sample floor.
    let control = created
        .variants
        .iter()
        .find(|v| v.is_control)
        .unwrap();
    let treatment = created
        .variants
        .iter()
        .find(|v| !v.is_control)
        .unwrap();

    for i in 0..500 {
        let visitor = VisitorKey::User(format!("user-{i}"));
        engine
            .recorder
            .record_impression(test_id, control.id, &visitor)
            .await
            .unwrap();
        engine
            .recorder
            .record_impression(test_id, treatment.id, &visitor)
            .await
            .unwrap();
        if i % 10 < 3 {
            engine
                .recorder
                .record_conversion(test_id, treatment.id, &visitor)
                .await
                .unwrap();
        }
    }

    let evaluation = engine.evaluator.evaluate(test_id).await.unwrap();
    assert_eq!(evaluation.verdict, Verdict::Winner(treatment.id));
    assert!(evaluation.p_value.unwrap() < 0.001);

    // Evaluation is read-only and repeatable.
    let again = engine.evaluator.evaluate(test_id).await.unwrap();
    assert_eq!(again.verdict, evaluation.verdict);

    // A test with events refuses deletion, then completes normally.
    let err = engine.registry.delete_test(test_id).await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    let completed = engine.lifecycle.complete(test_id).await.unwrap();
    assert_eq!(completed.status, TestStatus::Completed);

    // Terminal tests record nothing and assign nobody.
    let err = engine
        .recorder
        .record_impression(test_id, control.id, &visitor)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));
    let err = engine.assignor.assign(test_id, &visitor).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));

    // Evaluation still works after completion.
    let final_eval = engine.evaluator.evaluate(test_id).await.unwrap();
    assert_eq!(final_eval.verdict, Verdict::Winner(treatment.id));
}

#[tokio::test]
async fn test_insufficient_data_verdict() {
    let engine = engine().await;
    let created = engine.registry.create_test(&headline_test()).await.unwrap();
    engine.lifecycle.activate(created.test.id).await.unwrap();

    // 20 impressions per arm, far below the 100 floor.
    for i in 0..20 {
        let visitor = VisitorKey::User(format!("user-{i}"));
        for variant in &created.variants {
            engine
                .recorder
                .record_impression(created.test.id, variant.id, &visitor)
                .await
                .unwrap();
        }
    }

    let evaluation = engine.evaluator.evaluate(created.test.id).await.unwrap();
    assert_eq!(evaluation.verdict, Verdict::InsufficientData);
    assert!(evaluation.p_value.is_none());
}

#[tokio::test]
async fn test_no_significant_difference_verdict() {
    let engine = engine().await;
    let created = engine.registry.create_test(&headline_test()).await.unwrap();
    engine.lifecycle.activate(created.test.id).await.unwrap();

    // 10.0% vs 11.0% conversion at 500 impressions per arm.
    let control = created.variants.iter().find(|v| v.is_control).unwrap();
    let treatment = created.variants.iter().find(|v| !v.is_control).unwrap();

    for i in 0..500 {
        let visitor = VisitorKey::User(format!("user-{i}"));
        engine
            .recorder
            .record_impression(created.test.id, control.id, &visitor)
            .await
            .unwrap();
        engine
            .recorder
            .record_impression(created.test.id, treatment.id, &visitor)
            .await
            .unwrap();
        if i < 50 {
            engine
                .recorder
                .record_conversion(created.test.id, control.id, &visitor)
                .await
                .unwrap();
        }
        if i < 55 {
            engine
                .recorder
                .record_conversion(created.test.id, treatment.id, &visitor)
                .await
                .unwrap();
        }
    }

    let evaluation = engine.evaluator.evaluate(created.test.id).await.unwrap();
    assert_eq!(evaluation.verdict, Verdict::NoSignificantDifference);
}

#[tokio::test]
async fn test_stopped_test_stays_closed() {
    let engine = engine().await;
    let created = engine.registry.create_test(&headline_test()).await.unwrap();
    engine.lifecycle.activate(created.test.id).await.unwrap();
    engine.lifecycle.stop(created.test.id).await.unwrap();

    // No path out of stopped, not even via a registry patch.
    let err = engine
        .registry
        .update_test(created.test.id, TestPatch {
            status: Some(TestStatus::Running),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_counters_survive_reconcile() {
    let engine = engine().await;
    let created = engine.registry.create_test(&headline_test()).await.unwrap();
    engine.lifecycle.activate(created.test.id).await.unwrap();

    let variant = &created.variants[0];
    for i in 0..25 {
        let visitor = VisitorKey::Anonymous(format!("sess-{i}"));
        engine
            .recorder
            .record_impression(created.test.id, variant.id, &visitor)
            .await
            .unwrap();
        if i % 5 == 0 {
            engine
                .recorder
                .record_conversion(created.test.id, variant.id, &visitor)
                .await
                .unwrap();
        }
    }

    engine.recorder.reconcile(created.test.id).await.unwrap();

    let loaded = engine.registry.get_test(created.test.id).await.unwrap();
    let reconciled = loaded.variants.iter().find(|v| v.id == variant.id).unwrap();
    assert_eq!(reconciled.impressions, 25);
    assert_eq!(reconciled.conversions, 5);
    assert!((reconciled.conversion_rate - 0.2).abs() < 1e-9);
}
