use futures::future::join_all;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

use remote_tree::prelude::*;

fn sample() -> MemoryClient {
    MemoryClient::new()
        .with_root("root", "Root")
        .with_container("root", "a", "A")
        .with_container("root", "b", "B")
        .with_leaf("root", "x", "x.csv", LeafType::Table)
}

fn root_of(client: &Arc<MemoryClient>) -> Arc<Node> {
    let session = Session::new(client.clone(), NavigatorConfig::default());
    Node::new_root(Metadata::container("root", "Root", None), session).unwrap()
}

#[tokio::test]
async fn test_sequential_discovery_lists_once() {
    let client = Arc::new(sample());
    let root = root_of(&client);

    root.discover_children().await.unwrap();
    root.discover_children().await.unwrap();

    assert_eq!(client.calls().list_children, 1);
    assert_eq!(root.readiness(), Readiness::Ready);
}

#[tokio::test]
async fn test_concurrent_discovery_collapses_to_one_call() {
    let client = Arc::new(sample().with_listing_delay(Duration::from_millis(20)));
    let root = root_of(&client);

    let outcomes = join_all((0..8).map(|_| root.discover_children())).await;

    assert!(outcomes.iter().all(|o| o.is_ok()));
    assert_eq!(client.calls().list_children, 1);
    assert_eq!(root.readiness(), Readiness::Ready);
    assert_eq!(root.child_metadata(NodeKind::Container).len(), 2);
}

#[tokio::test]
async fn test_waiters_across_tasks_share_the_listing() {
    let client = Arc::new(sample().with_listing_delay(Duration::from_millis(20)));
    let root = root_of(&client);

    let first = {
        let root = root.clone();
        tokio::spawn(async move { root.discover_children().await })
    };
    tokio::task::yield_now().await;
    assert_eq!(root.readiness(), Readiness::Discovering);

    root.discover_children().await.unwrap();
    first.await.unwrap().unwrap();
    assert_eq!(client.calls().list_children, 1);
}

#[tokio::test]
async fn test_failed_listing_rolls_back_to_unstarted() {
    let client = Arc::new(sample().with_listing_delay(Duration::from_millis(10)));
    let root = root_of(&client);
    client.fail_next_listings(1);

    let outcomes = join_all((0..4).map(|_| root.discover_children())).await;
    assert!(outcomes
        .iter()
        .all(|o| matches!(o, Err(TreeError::RemoteUnavailable(_)))));
    assert_eq!(root.readiness(), Readiness::Unstarted);
    assert_eq!(client.calls().list_children, 1);

    root.discover_children().await.unwrap();
    assert_eq!(root.readiness(), Readiness::Ready);
    assert_eq!(client.calls().list_children, 2);
}

#[tokio::test]
async fn test_abandoned_discovery_still_caches() {
    let client = Arc::new(sample().with_listing_delay(Duration::from_millis(30)));
    let root = root_of(&client);

    let abandoned =
        tokio::time::timeout(Duration::from_millis(1), root.discover_children()).await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(root.readiness(), Readiness::Ready);

    root.discover_children().await.unwrap();
    assert_eq!(client.calls().list_children, 1);
}

#[tokio::test]
async fn test_missing_container_reports_not_found() {
    let client = Arc::new(sample());
    let session = Session::new(client.clone(), NavigatorConfig::default());
    let ghost = Node::new_root(Metadata::container("ghost", "Ghost", None), session).unwrap();

    let err = ghost.discover_children().await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(ghost.readiness(), Readiness::Unstarted);
}
