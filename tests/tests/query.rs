use pretty_assertions::assert_eq;
use serde_json::json;
use tests::{assert_err, assert_ok, fixtures, DbTest};
use tether::{doc, stmt::Create, Client, Query, Selection, Value};

fn empty() -> Vec<Value> {
    vec![]
}

async fn library(test: &mut DbTest) -> Client {
    let client = test.setup_db(fixtures::library()).await;

    assert_ok!(client.collection("tags").add(Create::new().set("label", "rust")).await);
    assert_ok!(
        client
            .collection("authors")
            .add_many(vec![
                Create::new().set("name", "A").create_many(
                    "books",
                    [
                        Create::new()
                            .set("title", "One")
                            .connect("tags", "rust")
                            .create("reviews", Create::new().set("body", "great")),
                        Create::new().set("title", "Two"),
                    ],
                ),
                Create::new()
                    .set("name", "B")
                    .create("books", Create::new().set("title", "Three")),
            ])
            .await
    );

    client
}

#[tokio::test]
async fn filters_run_in_key_order() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::levels()).await;
    let levels = client.collection("levels");

    for level in [4, 0, 3, 1] {
        assert_ok!(levels.add(Create::new().set("level", level)).await);
    }

    let found = assert_ok!(
        levels
            .find(Query::new().where_fn("level", |level| level.as_i64().is_some_and(|l| l > 2)))
            .await
    );
    let ids: Vec<_> = found.iter().map(|level| level["id"].clone()).collect();
    assert_eq!(ids, [Value::from(1), Value::from(3)]);

    let first = assert_ok!(levels.find_first(Query::new().where_eq("level", 1)).await).unwrap();
    assert_eq!(first, doc! { "id" => 4, "level" => 1, "name" => Value::Null });

    assert!(assert_ok!(levels.find_first(Query::new().where_eq("level", 7)).await).is_none());
}

#[tokio::test]
async fn stored_documents_come_back_unchanged() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::library()).await;

    let added = assert_ok!(client.collection("authors").add(Create::new().set("name", "A")).await);
    let book = assert_ok!(
        client
            .collection("books")
            .add(
                Create::new()
                    .set("title", "T")
                    .connect("author", 1)
                    .create("reviews", Create::new().set("body", "ok")),
            )
            .await
    );

    assert_eq!(assert_ok!(client.collection("authors").get(1).await).unwrap()["name"], added["name"]);
    assert_eq!(assert_ok!(client.collection("books").get(1).await).unwrap(), book);

    let stored = assert_ok!(client.collection("reviews").get(1).await).unwrap();
    assert_eq!(stored["stars"], Value::from(3));
}

#[tokio::test]
async fn include_resolves_relations() {
    let mut test = DbTest::new();
    let client = library(&mut test).await;

    let authors = assert_ok!(
        client
            .collection("authors")
            .find(Query::new().include(["books"]))
            .await
    );
    assert_eq!(authors.len(), 2);

    // The back-reference to the author is stripped from each book
    assert_eq!(
        authors[0],
        doc! {
            "id" => 1,
            "name" => "A",
            "books" => vec![
                doc! {
                    "id" => 1,
                    "title" => "One",
                    "pages" => Value::Null,
                    "reviews" => vec![1],
                    "tags" => vec!["rust"],
                },
                doc! {
                    "id" => 2,
                    "title" => "Two",
                    "pages" => Value::Null,
                    "reviews" => empty(),
                    "tags" => empty(),
                },
            ],
        }
    );
}

#[tokio::test]
async fn select_keeps_only_named_fields() {
    let mut test = DbTest::new();
    let client = library(&mut test).await;

    let authors = assert_ok!(
        client
            .collection("authors")
            .find(Query::new().select(["name"]))
            .await
    );
    assert_eq!(authors, [doc! { "name" => "A" }, doc! { "name" => "B" }]);

    let books = assert_ok!(
        client
            .collection("books")
            .find(
                Query::new()
                    .where_eq("title", "One")
                    .select(Selection::new().field("title").nested(
                        "tags",
                        Query::new().select(["label"]),
                    )),
            )
            .await
    );
    assert_eq!(
        books,
        [doc! { "title" => "One", "tags" => vec![doc! { "label" => "rust" }] }]
    );
}

#[tokio::test]
async fn nested_filters() {
    let mut test = DbTest::new();
    let client = library(&mut test).await;

    let author = assert_ok!(
        client
            .collection("authors")
            .find_first(Query::new().where_eq("name", "A").select(
                Selection::new().nested("books", Query::new().where_eq("title", "Two").select(["title"])),
            ))
            .await
    )
    .unwrap();
    assert_eq!(author, doc! { "books" => vec![doc! { "title" => "Two" }] });

    // A singular relation that fails its filter resolves to null
    let book = assert_ok!(
        client
            .collection("books")
            .find_first(Query::new().include(
                Selection::new().nested("author", Query::new().where_eq("name", "B")),
            ))
            .await
    )
    .unwrap();
    assert_eq!(book["id"], Value::from(1));
    assert!(book["author"].is_null());
}

#[tokio::test]
async fn back_references_resolve_when_named() {
    let mut test = DbTest::new();
    let client = library(&mut test).await;

    let author = assert_ok!(
        client
            .collection("authors")
            .find_first(Query::new().select(Selection::new().field("name").nested(
                "books",
                Query::new().select(Selection::new().field("title").field("author")),
            )))
            .await
    )
    .unwrap();

    let books = author["books"].expect_list();
    assert_eq!(books.len(), 2);
    assert_eq!(
        books[0],
        Value::from(doc! { "title" => "One", "author" => doc! { "id" => 1, "name" => "A" } })
    );
}

#[tokio::test]
async fn deletes_clean_up_back_references() {
    let mut test = DbTest::new();
    let client = library(&mut test).await;

    assert_ok!(client.collection("books").delete(2).await);
    let raw = assert_ok!(client.collection("authors").get(1).await).unwrap();
    assert_eq!(raw["books"], Value::from(vec![1]));
}

#[tokio::test]
async fn dangling_references_are_dropped() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::library()).await;

    // Imports take references as given
    assert_ok!(
        client
            .import(&json!({
                "authors": [{ "id": 1, "name": "A", "books": ["/books/1", "/books/2"] }],
                "books": [{
                    "id": 1,
                    "title": "One",
                    "pages": null,
                    "author": "/authors/1",
                    "reviews": [],
                    "tags": [],
                }],
            }))
            .await
    );
    let raw = assert_ok!(client.collection("authors").get(1).await).unwrap();
    assert_eq!(raw["books"], Value::from(vec![1, 2]));

    let author = assert_ok!(
        client
            .collection("authors")
            .find_first(Query::new().select(
                Selection::new().nested("books", Query::new().select(["title"])),
            ))
            .await
    )
    .unwrap();
    assert_eq!(author, doc! { "books" => vec![doc! { "title" => "One" }] });
}

#[tokio::test]
async fn invalid_query_shapes() {
    let mut test = DbTest::new();
    let client = library(&mut test).await;
    let authors = client.collection("authors");

    assert_err!(
        authors
            .find(Query::new().select(["name"]).include(["books"]))
            .await,
        is_invalid_config
    );
    assert_err!(authors.find(Query::new().select(["age"])).await, is_invalid_config);
    assert_err!(
        authors.compile_query(Query::new().include(["nope"])).await,
        is_invalid_config
    );

    // Nothing reached the driver
    let log = test.log();
    log.clear();
    assert_err!(authors.find(Query::new().include(["age"])).await, is_invalid_config);
    assert!(log.is_empty());
}

#[tokio::test]
async fn compiled_queries_can_be_rerun() {
    let mut test = DbTest::new();
    let client = library(&mut test).await;
    let books = client.collection("books");

    let query = || Query::new().include(["author", "reviews"]);
    let compiled = assert_ok!(books.compile_query(query()).await);

    let expected = assert_ok!(books.find(query()).await);
    assert_eq!(assert_ok!(compiled.find().await), expected);

    assert_ok!(
        books
            .add(Create::new().set("title", "Four").connect("author", 2))
            .await
    );

    let again = assert_ok!(compiled.find().await);
    assert_eq!(again.len(), 4);
    assert_eq!(again[..3], expected[..]);
    assert_eq!(again[3]["author"], Value::from(doc! { "id" => 2, "name" => "B" }));

    let first = assert_ok!(compiled.find_first().await).unwrap();
    assert_eq!(first, expected[0]);
}
