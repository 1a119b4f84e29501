use pretty_assertions::assert_eq;
use tests::{assert_err, assert_ok, fixtures, DbTest};
use tether::{stmt::Create, Client, Query, Value};

#[tokio::test]
async fn builder_needs_a_driver() {
    assert_err!(
        Client::builder(fixtures::levels()).build().await,
        is_invalid_config
    );
}

#[tokio::test]
async fn unknown_collections_fail_on_use() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::levels()).await;

    assert!(client.schema().model("levels").is_some());

    let badges = client.collection("badges");
    assert_eq!(badges.name(), "badges");
    assert_err!(badges.get(1).await, is_invalid_config);
    assert_err!(badges.add(Create::new()).await, is_invalid_config);
    assert_err!(badges.find(Query::new()).await, is_invalid_config);
    assert!(test.log().is_empty());
}

#[tokio::test]
async fn clients_sharing_a_store_need_fresh_counters() {
    let mut test = DbTest::new();
    let first = test.setup_db(fixtures::levels()).await;

    let mut builder = Client::builder(fixtures::levels());
    let second = assert_ok!(builder.driver(test.memory()).build().await);

    let a = assert_ok!(first.collection("levels").add(Create::new().set("level", 1)).await);
    let b = assert_ok!(second.collection("levels").add(Create::new().set("level", 2)).await);
    assert_eq!(a["id"], Value::from(1));
    assert_eq!(b["id"], Value::from(2));

    // The first client still believes key 2 is free
    assert_err!(
        first.collection("levels").add(Create::new().set("level", 3)).await,
        is_add_failed
    );

    first.invalidate_caches();
    let c = assert_ok!(first.collection("levels").add(Create::new().set("level", 3)).await);
    assert_eq!(c["id"], Value::from(3));

    assert_eq!(assert_ok!(second.collection("levels").find(Query::new()).await).len(), 3);
}

#[tokio::test]
async fn clones_share_counters() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::levels()).await;
    let clone = client.clone();

    assert_ok!(client.collection("levels").add(Create::new().set("level", 1)).await);
    let added = assert_ok!(clone.collection("levels").add(Create::new().set("level", 2)).await);
    assert_eq!(added["id"], Value::from(2));
}
