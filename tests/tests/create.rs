use pretty_assertions::assert_eq;
use serde_json::json;
use tests::{assert_err, assert_ok, fixtures, DbTest};
use tether::{doc, stmt::Create, Query, Value};

fn empty() -> Vec<Value> {
    vec![]
}

#[tokio::test]
async fn auto_increment_keys_start_at_one() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::library()).await;
    let authors = client.collection("authors");

    let first = assert_ok!(authors.add(Create::new().set("name", "A")).await);
    let second = assert_ok!(authors.add(Create::new().set("name", "B")).await);

    assert_eq!(first, doc! { "id" => 1, "name" => "A", "books" => empty() });
    assert_eq!(second["id"], Value::from(2));
}

#[tokio::test]
async fn connect_writes_both_sides() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::library()).await;
    let authors = client.collection("authors");
    let books = client.collection("books");

    assert_ok!(authors.add(Create::new().set("name", "A")).await);
    let book = assert_ok!(
        books
            .add(Create::new().set("title", "T").connect("author", 1))
            .await
    );

    assert_eq!(
        book,
        doc! {
            "id" => 1,
            "title" => "T",
            "pages" => Value::Null,
            "author" => 1,
            "reviews" => empty(),
            "tags" => empty(),
        }
    );

    let author = assert_ok!(authors.get(1).await).unwrap();
    assert_eq!(author["books"], Value::from(vec![1]));
}

#[tokio::test]
async fn nested_creates_thread_the_parent_key() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::library()).await;

    let author = assert_ok!(
        client
            .collection("authors")
            .add(
                Create::new().set("name", "A").create_many(
                    "books",
                    [
                        Create::new()
                            .set("title", "One")
                            .create("reviews", Create::new().set("body", "great")),
                        Create::new().set("title", "Two"),
                    ],
                ),
            )
            .await
    );
    assert_eq!(author["books"], Value::from(vec![1, 2]));

    let books = assert_ok!(client.collection("books").find(Query::new()).await);
    assert_eq!(books.len(), 2);
    for book in &books {
        assert_eq!(book["author"], Value::from(1));
    }
    assert_eq!(books[0]["reviews"], Value::from(vec![1]));

    let review = assert_ok!(client.collection("reviews").get(1).await).unwrap();
    assert_eq!(
        review,
        doc! { "id" => 1, "body" => "great", "stars" => 3, "book" => 1 }
    );
}

#[tokio::test]
async fn connect_to_missing_document_writes_nothing() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::library()).await;

    assert_err!(
        client
            .collection("books")
            .add(Create::new().set("title", "T").connect("author", 99))
            .await,
        is_document_not_found
    );

    // Earlier writes in the same payload are rolled back too
    assert_err!(
        client
            .collection("authors")
            .add(
                Create::new()
                    .set("name", "A")
                    .create(
                        "books",
                        Create::new()
                            .set("title", "T")
                            .create("reviews", Create::new().set("body", "b")),
                    )
                    .connect("books", 99),
            )
            .await,
        is_document_not_found
    );

    let log = test.log();
    assert!(log.written().contains("books"));
    assert!(!log.last_committed());

    let export = assert_ok!(client.export().await);
    assert_eq!(
        export,
        serde_json::json!({ "authors": [], "books": [], "reviews": [], "tags": [] })
    );
}

#[tokio::test]
async fn unidirectional_relations_only_check_existence() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::library()).await;

    assert_ok!(client.collection("authors").add(Create::new().set("name", "A")).await);
    assert_ok!(client.collection("tags").add(Create::new().set("label", "rust")).await);

    let book = assert_ok!(
        client
            .collection("books")
            .add(
                Create::new()
                    .set("title", "T")
                    .connect("author", 1)
                    .connect("tags", "rust"),
            )
            .await
    );
    assert_eq!(book["tags"], Value::from(vec!["rust"]));

    let tag = assert_ok!(client.collection("tags").get("rust").await).unwrap();
    assert_eq!(tag, doc! { "label" => "rust", "color" => Value::Null });

    assert_err!(
        client
            .collection("books")
            .add(
                Create::new()
                    .set("title", "U")
                    .connect("author", 1)
                    .connect("tags", "go"),
            )
            .await,
        is_document_not_found
    );
}

#[tokio::test]
async fn duplicate_connects_are_rejected() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::library()).await;

    assert_ok!(client.collection("authors").add(Create::new().set("name", "A")).await);
    assert_ok!(client.collection("tags").add(Create::new().set("label", "rust")).await);

    assert_err!(
        client
            .collection("books")
            .add(
                Create::new()
                    .set("title", "T")
                    .connect("author", 1)
                    .connect_many("tags", ["rust", "rust"]),
            )
            .await,
        is_invalid_item
    );
}

#[tokio::test]
async fn invalid_payloads() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::library()).await;
    let authors = client.collection("authors");
    let books = client.collection("books");

    // Unknown field
    assert_err!(
        authors
            .add(Create::new().set("name", "A").set("age", 3))
            .await,
        is_invalid_item
    );

    // Missing required property
    assert_err!(authors.add(Create::new()).await, is_invalid_item);

    // Wrong property type
    assert_err!(authors.add(Create::new().set("name", 5)).await, is_invalid_item);

    // Auto-increment keys cannot be supplied
    assert_err!(
        authors.add(Create::new().set("id", 7).set("name", "A")).await,
        is_invalid_item
    );

    // Required relation left out
    assert_err!(books.add(Create::new().set("title", "T")).await, is_invalid_item);

    // Relations take $connect/$create, not raw values
    assert_ok!(authors.add(Create::new().set("name", "A")).await);
    assert_err!(
        books
            .add(Create::new().set("title", "T").set("author", 1))
            .await,
        is_invalid_item
    );

    // Singular relations take one connection
    assert_ok!(authors.add(Create::new().set("name", "B")).await);
    assert_err!(
        books
            .add(
                Create::new()
                    .set("title", "T")
                    .connect_many("author", [1, 2])
            )
            .await,
        is_invalid_item
    );

    // Supplied keys must be present
    assert_err!(
        client
            .collection("tags")
            .add(Create::new().set("color", "red"))
            .await,
        is_invalid_item
    );
}

#[tokio::test]
async fn populated_singular_mirror_is_not_overwritten() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::accounts()).await;
    let users = client.collection("users");

    let first = assert_ok!(
        users
            .add(
                Create::new()
                    .set("email", "a@example.com")
                    .create("profile", Create::new().set("bio", "hi")),
            )
            .await
    );
    assert_eq!(first["profile"], Value::from(1));

    let profile = assert_ok!(client.collection("profiles").get(1).await).unwrap();
    assert_eq!(profile["user"], first["id"]);

    assert_err!(
        users
            .add(
                Create::new()
                    .set("email", "b@example.com")
                    .connect("profile", 1),
            )
            .await,
        is_overwrite_relation
    );

    assert_eq!(assert_ok!(users.find(Query::new()).await).len(), 1);
}

#[tokio::test]
async fn mirror_pointing_at_a_missing_document_counts_as_unset() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::accounts()).await;
    let id = "6f1c2a8e-3b4d-4e5f-8a9b-0c1d2e3f4a5b";

    assert_ok!(
        client
            .import(&json!({
                "users": [{ "id": id, "email": "a@example.com", "profile": "/profiles/9" }],
            }))
            .await
    );

    let profile = assert_ok!(
        client
            .collection("profiles")
            .add(Create::new().connect("user", id))
            .await
    );
    assert_eq!(profile["user"], Value::from(id));

    let user = assert_ok!(client.collection("users").get(id).await).unwrap();
    assert_eq!(user["profile"], profile["id"]);
}

#[tokio::test]
async fn generated_keys() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::accounts()).await;

    let user = assert_ok!(
        client
            .collection("users")
            .add(Create::new().set("email", "a@example.com"))
            .await
    );

    let id = user["id"].as_str().unwrap();
    assert_eq!(id.len(), 36);

    let fetched = assert_ok!(client.collection("users").get(id).await).unwrap();
    assert_eq!(fetched, user);
}

#[tokio::test]
async fn add_many_is_atomic() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::levels()).await;
    let levels = client.collection("levels");

    let added = assert_ok!(
        levels
            .add_many(vec![
                Create::new().set("level", 0),
                Create::new().set("level", 1),
            ])
            .await
    );
    assert_eq!(added.len(), 2);

    assert_err!(
        levels
            .add_many(vec![
                Create::new().set("level", 2),
                Create::new().set("level", "three"),
            ])
            .await,
        is_invalid_item
    );

    assert_eq!(assert_ok!(levels.find(Query::new()).await).len(), 2);
}
