use deliverybook_core::{
    Contact, ContactDraft, ContactService, ContactStore, MutationOutcome, NeighborService,
    SkipReason,
};

async fn setup(neighbors: &[&str]) -> (ContactStore, NeighborService) {
    let store = ContactStore::open_in_memory().unwrap();
    store
        .upsert(Contact::new("1", "Juan", "Calle 1").with_neighbors(neighbors.iter().copied()))
        .await
        .unwrap();
    let service = NeighborService::new(store.clone());
    (store, service)
}

async fn neighbors_of(store: &ContactStore, id: &str) -> Vec<String> {
    store.get(id).await.unwrap().unwrap().neighbors
}

#[tokio::test]
async fn add_appends_trimmed_value() {
    let (store, service) = setup(&["Ana"]).await;

    let outcome = service.add_neighbor("1", "  Luis  ").await.unwrap();

    assert_eq!(outcome, MutationOutcome::Applied);
    assert_eq!(neighbors_of(&store, "1").await, ["Ana", "Luis"]);
}

#[tokio::test]
async fn add_allows_duplicates() {
    let (store, service) = setup(&["Ana"]).await;
    service.add_neighbor("1", "Ana").await.unwrap();
    assert_eq!(neighbors_of(&store, "1").await, ["Ana", "Ana"]);
}

#[tokio::test]
async fn blank_values_are_rejected() {
    let (store, service) = setup(&["Ana"]).await;

    assert_eq!(
        service.add_neighbor("1", "   ").await.unwrap(),
        MutationOutcome::Skipped(SkipReason::BlankValue)
    );
    assert_eq!(
        service.update_neighbor("1", 0, "").await.unwrap(),
        MutationOutcome::Skipped(SkipReason::BlankValue)
    );
    assert_eq!(neighbors_of(&store, "1").await, ["Ana"]);
}

#[tokio::test]
async fn unknown_ids_leave_the_store_unchanged() {
    let (store, service) = setup(&["Ana"]).await;
    let revision = store.revision();

    for outcome in [
        service.add_neighbor("404", "Luis").await.unwrap(),
        service.update_neighbor("404", 0, "Luis").await.unwrap(),
        service.delete_neighbor("404", 0).await.unwrap(),
    ] {
        assert_eq!(outcome, MutationOutcome::Skipped(SkipReason::UnknownId));
    }
    assert_eq!(store.get("404").await.unwrap(), None);
    assert_eq!(store.count().await.unwrap(), 1);
    assert_eq!(store.revision(), revision);
}

#[tokio::test]
async fn update_replaces_in_place() {
    let (store, service) = setup(&["Ana", "Luis", "Marta"]).await;

    service.update_neighbor("1", 1, "Luisa").await.unwrap();

    assert_eq!(neighbors_of(&store, "1").await, ["Ana", "Luisa", "Marta"]);
}

#[tokio::test]
async fn out_of_range_indexes_are_noops() {
    let (store, service) = setup(&["Ana", "Luis"]).await;

    assert_eq!(
        service.update_neighbor("1", 2, "Marta").await.unwrap(),
        MutationOutcome::Skipped(SkipReason::IndexOutOfRange { index: 2, len: 2 })
    );
    assert_eq!(
        service.delete_neighbor("1", 5).await.unwrap(),
        MutationOutcome::Skipped(SkipReason::IndexOutOfRange { index: 5, len: 2 })
    );
    assert_eq!(neighbors_of(&store, "1").await, ["Ana", "Luis"]);
}

#[tokio::test]
async fn delete_first_shifts_later_entries_down() {
    let (store, service) = setup(&["A", "B", "C"]).await;

    service.delete_neighbor("1", 0).await.unwrap();

    assert_eq!(neighbors_of(&store, "1").await, ["B", "C"]);
}

#[tokio::test]
async fn neighbor_edits_keep_recency() {
    let (store, service) = setup(&["Ana"]).await;
    store.set_last_accessed("1", Some(42)).await.unwrap();

    service.add_neighbor("1", "Luis").await.unwrap();

    assert_eq!(store.get("1").await.unwrap().unwrap().last_accessed, Some(42));
}

#[tokio::test]
async fn concurrent_appends_are_not_lost() {
    let (store, service) = setup(&[]).await;

    let tasks: Vec<_> = (0..16)
        .map(|index| {
            let service = service.clone();
            tokio::spawn(async move { service.add_neighbor("1", &format!("n{index}")).await })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap().unwrap().is_applied());
    }

    let mut neighbors = neighbors_of(&store, "1").await;
    neighbors.sort();
    let mut expected: Vec<String> = (0..16).map(|index| format!("n{index}")).collect();
    expected.sort();
    assert_eq!(neighbors, expected);
}

#[tokio::test]
async fn editor_save_trims_and_validates_required_fields() {
    let store = ContactStore::open_in_memory().unwrap();
    let editor = ContactService::new(store.clone());

    let blank = editor
        .save(ContactDraft {
            id: "7".into(),
            name: "Rosa".into(),
            address: "  ".into(),
            neighbors: Vec::new(),
        })
        .await
        .unwrap();
    assert_eq!(
        blank,
        MutationOutcome::Skipped(SkipReason::BlankField { field: "address" })
    );
    assert_eq!(store.count().await.unwrap(), 0);

    let saved = editor
        .save(ContactDraft {
            id: " 7 ".into(),
            name: " Rosa ".into(),
            address: "Mitre 10".into(),
            neighbors: vec!["Ana".into(), " ".into(), " Luis".into()],
        })
        .await
        .unwrap();
    assert!(saved.is_applied());

    let loaded = editor.load("7").await.unwrap().unwrap();
    assert_eq!(loaded.name, "Rosa");
    assert_eq!(loaded.neighbors, ["Ana", "Luis"]);
    assert_eq!(loaded.last_accessed, None);
}

#[tokio::test]
async fn editor_save_preserves_last_accessed_of_existing_contact() {
    let store = ContactStore::open_in_memory().unwrap();
    let editor = ContactService::new(store.clone());
    store
        .upsert(Contact::new("7", "Rosa", "Mitre 10"))
        .await
        .unwrap();
    store.set_last_accessed("7", Some(99)).await.unwrap();

    let mut draft = ContactDraft::from(editor.load("7").await.unwrap().unwrap());
    draft.address = "Mitre 12".into();
    editor.save(draft).await.unwrap();

    let loaded = store.get("7").await.unwrap().unwrap();
    assert_eq!(loaded.address, "Mitre 12");
    assert_eq!(loaded.last_accessed, Some(99));

    assert!(editor.delete("7").await.unwrap().is_applied());
    assert_eq!(store.count().await.unwrap(), 0);
}
