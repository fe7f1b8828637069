//! Store contract tests against the in-memory implementation.

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use scenegate_core::approval::ApprovalThreshold;
use scenegate_core::grid::SceneLayout;
use scenegate_core::submission::{NewSceneSubmission, SceneSubmission};
use scenegate_db::{
    AutoApprovalCounter, LayoutOwner, LayoutStore, MemoryStore, StoreError, SubmissionStore,
    ThresholdStore,
};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_submission(user: &str, scene: i32) -> NewSceneSubmission {
    NewSceneSubmission {
        template_id: "tpl-1".to_string(),
        assignment_id: "asg-1".to_string(),
        user_id: user.to_string(),
        scene_number: scene,
        scene_title: None,
        video_url: None,
    }
}

// ---------------------------------------------------------------------------
// Submissions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn insert_and_find_by_id() {
    let store = MemoryStore::new();
    let s = SceneSubmission::new(new_submission("u1", 1), Utc::now());
    store.insert(&s).await.unwrap();

    let found = store.find_by_id(s.id).await.unwrap().unwrap();
    assert_eq!(found, s);
}

#[tokio::test]
async fn latest_for_slot_follows_chain() {
    let store = MemoryStore::new();
    let first = SceneSubmission::new(new_submission("u1", 1), Utc::now());
    store.insert(&first).await.unwrap();
    let second = first
        .resubmit(new_submission("u1", 1), Utc::now() + Duration::seconds(1))
        .unwrap();
    store.insert(&second).await.unwrap();

    let latest = store
        .find_latest_for_slot("asg-1", "u1", 1)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.id, second.id);
    assert!(store.is_superseded(first.id).await.unwrap());
    assert!(!store.is_superseded(second.id).await.unwrap());
}

#[tokio::test]
async fn second_successor_of_same_row_conflicts() {
    let store = MemoryStore::new();
    let first = SceneSubmission::new(new_submission("u1", 1), Utc::now());
    store.insert(&first).await.unwrap();

    let a = first.resubmit(new_submission("u1", 1), Utc::now()).unwrap();
    let b = first.resubmit(new_submission("u1", 1), Utc::now()).unwrap();
    store.insert(&a).await.unwrap();
    assert_matches!(store.insert(&b).await, Err(StoreError::Conflict(_)));
}

#[tokio::test]
async fn update_refuses_superseded_row() {
    let store = MemoryStore::new();
    let mut first = SceneSubmission::new(new_submission("u1", 1), Utc::now());
    store.insert(&first).await.unwrap();
    let second = first.resubmit(new_submission("u1", 1), Utc::now()).unwrap();
    store.insert(&second).await.unwrap();

    first.approve("mgr", Utc::now()).unwrap();
    assert_matches!(store.update(&first).await, Err(StoreError::Conflict(_)));

    let stored = store.find_by_id(first.id).await.unwrap().unwrap();
    assert!(stored.is_pending());
}

#[tokio::test]
async fn update_missing_row_is_not_found() {
    let store = MemoryStore::new();
    let s = SceneSubmission::new(new_submission("u1", 1), Utc::now());
    assert_matches!(store.update(&s).await, Err(StoreError::NotFound { .. }));
}

#[tokio::test]
async fn pending_queue_excludes_superseded_and_approved() {
    let store = MemoryStore::new();
    let old = SceneSubmission::new(new_submission("u1", 1), Utc::now());
    store.insert(&old).await.unwrap();
    let head = old.resubmit(new_submission("u1", 1), Utc::now()).unwrap();
    store.insert(&head).await.unwrap();

    let mut approved = SceneSubmission::new(new_submission("u1", 2), Utc::now());
    approved.approve("mgr", Utc::now()).unwrap();
    store.insert(&approved).await.unwrap();

    let pending = store.list_pending(50).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, head.id);
}

#[tokio::test]
async fn list_for_assignment_user_sorted_by_scene() {
    let store = MemoryStore::new();
    for scene in [3, 1, 2] {
        let s = SceneSubmission::new(new_submission("u1", scene), Utc::now());
        store.insert(&s).await.unwrap();
    }
    let other = SceneSubmission::new(new_submission("u2", 1), Utc::now());
    store.insert(&other).await.unwrap();

    let rows = store.list_for_assignment_user("asg-1", "u1").await.unwrap();
    let scenes: Vec<i32> = rows.iter().map(|s| s.scene_number).collect();
    assert_eq!(scenes, vec![1, 2, 3]);
}

#[tokio::test]
async fn cascade_deletes() {
    let store = MemoryStore::new();
    store
        .insert(&SceneSubmission::new(new_submission("u1", 1), Utc::now()))
        .await
        .unwrap();
    store
        .insert(&SceneSubmission::new(new_submission("u2", 1), Utc::now()))
        .await
        .unwrap();

    assert_eq!(store.delete_by_user("u1").await.unwrap(), 1);
    assert_eq!(store.delete_by_template("tpl-1").await.unwrap(), 1);
    assert_eq!(store.delete_by_template("tpl-1").await.unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

#[tokio::test]
async fn threshold_upsert_keeps_id_per_scope() {
    let store = MemoryStore::new();
    let mut t = ApprovalThreshold::defaults_for("tpl-1");
    t.manager_id = Some("mgr-1".into());

    let created = store.upsert(&t).await.unwrap();
    let id = created.id.unwrap();

    t.global_threshold = 0.9;
    let updated = store.upsert(&t).await.unwrap();
    assert_eq!(updated.id, Some(id));
    assert_eq!(updated.global_threshold, 0.9);

    // Template-wide scope is separate.
    assert!(store.find("tpl-1", None).await.unwrap().is_none());
    assert!(store.find("tpl-1", Some("mgr-1")).await.unwrap().is_some());
}

#[tokio::test]
async fn threshold_list_and_delete() {
    let store = MemoryStore::new();
    for template in ["b", "a"] {
        let mut t = ApprovalThreshold::defaults_for(template);
        t.manager_id = Some("mgr-1".into());
        store.upsert(&t).await.unwrap();
    }

    let listed = store.list_for_manager("mgr-1").await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].template_id, "a");

    let id = listed[0].id.unwrap();
    assert!(store.delete(id).await.unwrap());
    assert!(!store.delete(id).await.unwrap());
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

#[tokio::test]
async fn counter_stops_at_cap() {
    let store = MemoryStore::new();
    assert!(store.try_acquire("tpl-1", 2).await.unwrap());
    assert!(store.try_acquire("tpl-1", 2).await.unwrap());
    assert!(!store.try_acquire("tpl-1", 2).await.unwrap());
    assert_eq!(store.used("tpl-1").await.unwrap(), 2);

    store.release("tpl-1").await.unwrap();
    assert_eq!(store.used("tpl-1").await.unwrap(), 1);
}

#[tokio::test]
async fn zero_cap_never_grants() {
    let store = MemoryStore::new();
    assert!(!store.try_acquire("tpl-1", 0).await.unwrap());
}

#[tokio::test]
async fn concurrent_claims_never_exceed_cap() {
    let store = Arc::new(MemoryStore::new());
    let mut handles = Vec::new();
    for _ in 0..20 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.try_acquire("tpl-1", 5).await.unwrap()
        }));
    }

    let mut granted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            granted += 1;
        }
    }
    assert_eq!(granted, 5);
    assert_eq!(store.used("tpl-1").await.unwrap(), 5);
}

// ---------------------------------------------------------------------------
// Layouts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn layouts_are_scoped_by_owner_kind() {
    let store = MemoryStore::new();
    let scenes = vec![SceneLayout::uniform("intro"), SceneLayout::uniform("outro")];
    store
        .put_layouts(LayoutOwner::Template, "x", &scenes)
        .await
        .unwrap();

    assert_eq!(
        store.get_layouts(LayoutOwner::Template, "x").await.unwrap(),
        Some(scenes)
    );
    assert!(store
        .get_layouts(LayoutOwner::Video, "x")
        .await
        .unwrap()
        .is_none());
}
