use service_overrides::{
    GitCoordinates, GitSaveChoices, InMemoryOverrideStore, OverrideContext, OverrideError,
    OverrideListing, OverrideQuery, OverrideScope, OverrideState, OverrideType, OverrideValue,
    PendingRemoteSave, ProjectScope, ReconcileStrategy, RowEditor, SaveOutcome, SectionEditor,
    SectionRef, StoreCall, StoreTarget,
};

const REPO: &str = "service-config";
const FILE: &str = ".harness/overrides/prod.yaml";

fn coordinates() -> GitCoordinates {
    GitCoordinates::new("github", REPO, "main", FILE)
}

async fn empty_state(store: &InMemoryOverrideStore) -> OverrideState {
    let mut state = OverrideState::new(OverrideContext::new(
        ProjectScope::project("acc", "org", "proj"),
        OverrideQuery::new(OverrideType::EnvGlobal, 10),
    ));
    OverrideListing::load(&mut state, store).await.unwrap();
    store.clear_calls();
    state
}

fn pending(outcome: SaveOutcome) -> PendingRemoteSave {
    match outcome {
        SaveOutcome::AwaitingGitDetails(pending) => pending,
        other => panic!("expected a pending git save, got {:?}", other),
    }
}

/// Creates the prod override in git and returns the state showing it
async fn with_remote_override(store: &InMemoryOverrideStore) -> OverrideState {
    let mut state = empty_state(store).await;

    SectionEditor::start_new_section(&mut state).unwrap();
    SectionEditor::select_scope(&mut state, OverrideScope::environment("prod")).unwrap();
    RowEditor::set_row_value(
        &mut state,
        SectionRef::New,
        0,
        OverrideValue::variable("REPLICAS", "3"),
    )
    .unwrap();

    let outcome =
        SectionEditor::create_new_section(&mut state, store, StoreTarget::Remote(coordinates()))
            .await
            .unwrap();
    let pending = pending(outcome);
    assert!(store.calls().is_empty());
    assert_eq!(pending.git_details, coordinates());

    let outcome = SectionEditor::confirm_remote_save(
        &mut state,
        store,
        &pending,
        &GitSaveChoices::commit("main", "Add prod overrides"),
    )
    .await
    .unwrap();
    assert!(matches!(
        outcome,
        SaveOutcome::Saved {
            strategy: ReconcileStrategy::FullReload,
            ..
        }
    ));
    store.clear_calls();
    state
}

#[tokio::test]
async fn test_remote_create_commits_file() {
    let store = InMemoryOverrideStore::new();
    let state = with_remote_override(&store).await;

    assert_eq!(state.list.len(), 1);
    let record = state.list.sections()[0].record.clone().unwrap();
    assert!(record.is_remote());

    let file = store.git_file(REPO, "main", FILE).unwrap();
    let metadata = record.store_metadata();
    assert_eq!(metadata.last_object_id.as_deref(), Some(file.object_id.as_str()));
    assert_eq!(metadata.last_commit_id.as_deref(), Some(file.commit_id.as_str()));
    assert_eq!(file.message, "Add prod overrides");
    assert!(!state.session.lock().is_held());
}

#[tokio::test]
async fn test_incomplete_dialog_choices_block_the_call() {
    let store = InMemoryOverrideStore::new();
    let mut state = with_remote_override(&store).await;
    RowEditor::edit_row(&mut state, 0, SectionRef::Existing(0)).unwrap();

    let pending = pending(
        SectionEditor::update_section(&mut state, &store, 0)
            .await
            .unwrap(),
    );

    let err = SectionEditor::confirm_remote_save(
        &mut state,
        &store,
        &pending,
        &GitSaveChoices::commit("feature", "branch off").on_new_branch(" "),
    )
    .await
    .unwrap_err();
    assert_eq!(
        err,
        OverrideError::GitDetailsIncomplete {
            missing: vec!["baseBranch"]
        }
    );
    assert!(store.calls().is_empty());
    assert_eq!(state.session.holder(), Some(SectionRef::Existing(0)));
}

#[tokio::test]
async fn test_conflict_then_resolved_retry() {
    let store = InMemoryOverrideStore::new();
    let mut state = with_remote_override(&store).await;
    let section = SectionRef::Existing(0);

    let row = RowEditor::add_row(&mut state, section).unwrap();
    RowEditor::set_row_value(&mut state, section, row, OverrideValue::variable("REGION", "eu"))
        .unwrap();
    let pending = pending(SectionEditor::update_section(&mut state, &store, 0).await.unwrap());
    assert_eq!(pending.resource_identity.identifier.as_deref(), Some("prod"));

    // Someone else pushes to the same file meanwhile
    let external = store
        .push_external_commit(REPO, "main", FILE, "hotfix replicas")
        .unwrap();

    let choices = GitSaveChoices::commit("main", "Add region");
    let err = SectionEditor::confirm_remote_save(&mut state, &store, &pending, &choices)
        .await
        .unwrap_err();
    let conflict = match err {
        OverrideError::RemoteCallFailure {
            message,
            conflict_commit_id: Some(commit),
        } => {
            assert!(message.contains(&external[..8]));
            commit
        }
        other => panic!("expected a conflict, got {:?}", other),
    };
    assert_eq!(conflict, external);
    assert_eq!(state.session.holder(), Some(section));
    assert_eq!(state.list.sections()[0].rows.len(), 2);

    let outcome = SectionEditor::confirm_remote_save(
        &mut state,
        &store,
        &pending,
        &choices.resolving_conflict(&conflict),
    )
    .await
    .unwrap();
    assert!(matches!(
        outcome,
        SaveOutcome::Saved {
            strategy: ReconcileStrategy::RebuildSlot(0),
            ..
        }
    ));

    let file = store.git_file(REPO, "main", FILE).unwrap();
    assert_eq!(file.parent_commit_id.as_deref(), Some(external.as_str()));
    assert_eq!(state.list.sections()[0].values().len(), 2);
    assert!(!state.session.lock().is_held());
    assert_eq!(
        store.mutation_calls(),
        vec![
            StoreCall::UpdateRemote("prod".to_string()),
            StoreCall::UpdateRemote("prod".to_string())
        ]
    );
}

#[tokio::test]
async fn test_save_to_new_branch() {
    let store = InMemoryOverrideStore::new();
    let mut state = with_remote_override(&store).await;
    RowEditor::set_row_value(
        &mut state,
        SectionRef::Existing(0),
        0,
        OverrideValue::variable("REPLICAS", "5"),
    )
    .unwrap();

    let pending = pending(SectionEditor::update_section(&mut state, &store, 0).await.unwrap());
    SectionEditor::confirm_remote_save(
        &mut state,
        &store,
        &pending,
        &GitSaveChoices::commit("scale-up", "Scale prod").on_new_branch("main"),
    )
    .await
    .unwrap();

    let main = store.git_file(REPO, "main", FILE).unwrap();
    let branch = store.git_file(REPO, "scale-up", FILE).unwrap();
    assert_eq!(branch.parent_commit_id.as_deref(), Some(main.commit_id.as_str()));
    assert_ne!(branch.object_id, main.object_id);

    let record = state.list.sections()[0].record.clone().unwrap();
    assert_eq!(record.git_coordinates().branch, "scale-up");
}
