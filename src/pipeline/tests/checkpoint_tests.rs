//! Unit tests for checkpoint capture, integrity, and the in-memory store.

use super::support;
use crate::pipeline::{
    adapters::memory::InMemoryCheckpointStore,
    domain::{
        Checkpoint, CheckpointPhase, PersistedCheckpointData, PipelineState, SnapshotError, Stage,
    },
    ports::{CheckpointStore, CheckpointStoreError},
};
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use serde_json::json;

#[fixture]
fn state() -> PipelineState {
    support::state()
}

fn capture(state: &PipelineState, sequence: u64) -> Checkpoint {
    Checkpoint::capture(
        state,
        Some(Stage::Research),
        CheckpointPhase::BeforeStage,
        sequence,
        &DefaultClock,
    )
    .expect("state should serialize")
}

fn tampered(checkpoint: &Checkpoint) -> Checkpoint {
    let mut snapshot = checkpoint.snapshot().clone();
    if let Some(object) = snapshot.as_object_mut() {
        object.insert("approved".to_owned(), json!(true));
    }
    Checkpoint::from_persisted(PersistedCheckpointData {
        run_id: checkpoint.run_id(),
        stage: checkpoint.stage(),
        phase: checkpoint.phase(),
        sequence: checkpoint.sequence(),
        snapshot,
        digest: checkpoint.digest().to_owned(),
        created_at: checkpoint.created_at(),
    })
}

#[rstest]
fn capture_restores_identical_state(state: PipelineState) {
    let checkpoint = capture(&state, 0);

    assert_eq!(checkpoint.run_id(), state.run_id());
    assert_eq!(checkpoint.digest().len(), 64);
    assert_eq!(checkpoint.restore().expect("restore"), state);
}

#[rstest]
fn credentials_survive_the_snapshot(state: PipelineState) {
    let restored = capture(&state, 0).restore().expect("restore");
    assert_eq!(restored.credentials().expose(), "token-123");
}

#[rstest]
fn tampered_snapshot_fails_integrity_check(state: PipelineState) {
    let checkpoint = tampered(&capture(&state, 4));

    assert_eq!(
        checkpoint.restore(),
        Err(SnapshotError::DigestMismatch {
            run_id: state.run_id(),
            sequence: 4,
        })
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn store_keeps_sequence_order(state: PipelineState) {
    let store = InMemoryCheckpointStore::new();
    for sequence in 0..3 {
        store
            .append(&capture(&state, sequence))
            .await
            .expect("append in order");
    }

    let listed = store.list(state.run_id()).await.expect("list");
    let sequences: Vec<u64> = listed.iter().map(Checkpoint::sequence).collect();
    assert_eq!(sequences, vec![0, 1, 2]);
    let latest = store.latest(state.run_id()).await.expect("latest");
    assert_eq!(latest.map(|checkpoint| checkpoint.sequence()), Some(2));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn store_rejects_duplicates_and_gaps(state: PipelineState) {
    let store = InMemoryCheckpointStore::new();
    store.append(&capture(&state, 0)).await.expect("first");

    let duplicate = store.append(&capture(&state, 0)).await;
    assert!(matches!(
        duplicate,
        Err(CheckpointStoreError::Duplicate { sequence: 0, .. })
    ));

    let gap = store.append(&capture(&state, 5)).await;
    assert!(matches!(
        gap,
        Err(CheckpointStoreError::OutOfOrder {
            sequence: 5,
            expected: 1,
            ..
        })
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn runs_do_not_share_sequences(state: PipelineState) {
    let other = support::state();
    let store = InMemoryCheckpointStore::new();

    store.append(&capture(&state, 0)).await.expect("first run");
    store.append(&capture(&other, 0)).await.expect("second run");

    assert_eq!(store.list(state.run_id()).await.expect("list").len(), 1);
    assert_eq!(store.list(other.run_id()).await.expect("list").len(), 1);
}
