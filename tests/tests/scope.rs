use pretty_assertions::assert_eq;
use tests::{assert_err, assert_ok, fixtures, DbTest, OpKind};
use tether::{
    stmt::{Create, Update},
    Mode, Query, Selection,
};

fn sorted(mut scope: Vec<String>) -> Vec<String> {
    scope.sort();
    scope
}

#[tokio::test]
async fn every_storage_call_stays_in_scope() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::library()).await;

    assert_ok!(client.collection("tags").add(Create::new().set("label", "rust")).await);
    assert_ok!(
        client
            .collection("authors")
            .add(Create::new().set("name", "A").create_many(
                "books",
                [
                    Create::new()
                        .set("title", "One")
                        .connect("tags", "rust")
                        .create("reviews", Create::new().set("body", "great")),
                    Create::new().set("title", "Two"),
                ],
            ))
            .await
    );
    assert_ok!(client.collection("authors").add(Create::new().set("name", "B")).await);

    assert_ok!(
        client
            .collection("books")
            .update(
                2,
                Update::new()
                    .connect("author", 2)
                    .create("reviews", Create::new().set("body", "fine"))
                    .update_related("reviews", Update::new().set("stars", 5)),
            )
            .await
    );
    assert_ok!(
        client
            .collection("reviews")
            .find(Query::new().include(
                Selection::new().nested("book", Query::new().include(["author", "tags"])),
            ))
            .await
    );
    assert_ok!(
        client
            .collection("authors")
            .update(1, Update::new().delete_key("books", 1))
            .await
    );
    assert_ok!(client.collection("authors").delete(2).await);
    assert_ok!(client.export().await);

    let log = test.log();
    assert!(log.count(|op| op.is_write()) > 0);
    let violations = log.out_of_scope();
    assert!(violations.is_empty(), "{violations:#?}");
}

#[tokio::test]
async fn deletes_lock_everything_reachable() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::library()).await;
    let log = test.log();

    assert_ok!(client.collection("authors").delete(1).await);

    let (scope, mode) = log.transactions().pop().unwrap();
    assert_eq!(sorted(scope), ["authors", "books", "reviews", "tags"]);
    assert_eq!(mode, Mode::ReadWrite);
}

#[tokio::test]
async fn queries_lock_what_they_resolve() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::library()).await;
    let log = test.log();

    assert_ok!(
        client
            .collection("authors")
            .find(Query::new().include(["books"]))
            .await
    );
    assert_ok!(client.collection("reviews").get(1).await);

    assert_eq!(
        log.transactions(),
        [
            (vec!["authors".to_string(), "books".to_string()], Mode::ReadOnly),
            (vec!["reviews".to_string()], Mode::ReadOnly),
        ]
    );
}

#[tokio::test]
async fn failed_operations_abort() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::kennel()).await;
    let log = test.log();

    assert_ok!(
        client
            .collection("owners")
            .add(Create::new().set("name", "O").create("pets", Create::new().set("name", "Rex")))
            .await
    );
    assert!(log.last_committed());

    assert_err!(client.collection("owners").delete(1).await, is_delete_restricted);
    assert!(!log.last_committed());
    assert_eq!(log.count(|op| *op == OpKind::Abort), 1);

    // Nothing was written by the failed delete
    let ops = log.ops();
    let begin = ops
        .iter()
        .rposition(|op| matches!(op.kind, OpKind::Begin { .. }))
        .unwrap();
    assert!(ops[begin..].iter().all(|op| !op.kind.is_write()));
}
