use pretty_assertions::assert_eq;
use tests::{assert_err, assert_ok, fixtures, DbTest};
use tether::{
    stmt::{Create, Update},
    Client, Filter, Model, OnDelete, PrimaryKey, Property, Query, Relation, Schema, Value,
};

async fn library_with_books(test: &mut DbTest) -> Client {
    let client = test.setup_db(fixtures::library()).await;

    assert_ok!(
        client
            .collection("authors")
            .add_many(vec![
                Create::new().set("name", "A").create_many(
                    "books",
                    [
                        Create::new()
                            .set("title", "One")
                            .create("reviews", Create::new().set("body", "good")),
                        Create::new().set("title", "Two"),
                    ],
                ),
                Create::new().set("name", "B"),
            ])
            .await
    );

    client
}

fn level_above(n: i64) -> Filter {
    Filter::new().matches("level", move |level| level.as_i64().is_some_and(|l| l > n))
}

#[tokio::test]
async fn set_and_apply_properties() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::levels()).await;
    let levels = client.collection("levels");

    assert_ok!(levels.add(Create::new().set("level", 1)).await);

    let updated = assert_ok!(
        levels
            .update(
                1,
                Update::new()
                    .set("name", "first")
                    .apply("level", |level| Value::from(level.as_i64().unwrap_or(0) + 1)),
            )
            .await
    );
    assert_eq!(updated["level"], Value::from(2));
    assert_eq!(updated["name"], Value::from("first"));

    let stored = assert_ok!(levels.get(1).await).unwrap();
    assert_eq!(stored, updated);
}

#[tokio::test]
async fn update_by_key_respects_the_filter() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::levels()).await;
    let levels = client.collection("levels");

    assert_ok!(levels.add(Create::new().set("level", 1)).await);

    assert_err!(
        levels
            .update(1, Update::new().filter(Filter::new().eq("level", 5)).set("name", "x"))
            .await,
        is_document_not_found
    );
    assert_err!(
        levels.update(2, Update::new().set("name", "x")).await,
        is_document_not_found
    );

    let stored = assert_ok!(levels.get(1).await).unwrap();
    assert!(stored["name"].is_null());
}

#[tokio::test]
async fn malformed_updates() {
    let mut test = DbTest::new();
    let client = library_with_books(&mut test).await;
    let books = client.collection("books");

    // Primary keys are fixed
    assert_err!(books.update(1, Update::new().set("id", 9)).await, is_invalid_item);

    // Unknown fields
    assert_err!(books.update(1, Update::new().set("isbn", "x")).await, is_invalid_item);

    // Values are validated
    assert_err!(books.update(1, Update::new().set("pages", "many")).await, is_invalid_item);

    // Relations only take relation operations
    assert_err!(books.update(1, Update::new().set("author", 2)).await, is_invalid_item);
    assert_err!(books.update(1, Update::new().connect("title", 2)).await, is_invalid_item);

    // A required relation cannot be emptied
    assert_err!(books.update(1, Update::new().disconnect("author")).await, is_invalid_item);
    assert_err!(books.update(1, Update::new().delete("author")).await, is_invalid_item);

    // Array relations need keys, singular relations take none
    assert_err!(
        client
            .collection("authors")
            .update(1, Update::new().disconnect("books"))
            .await,
        is_invalid_item
    );

    let book = assert_ok!(books.get(1).await).unwrap();
    assert_eq!(book["title"], Value::from("One"));
}

#[tokio::test]
async fn update_many_and_first() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::levels()).await;
    let levels = client.collection("levels");

    for level in 0..5 {
        assert_ok!(levels.add(Create::new().set("level", level)).await);
    }

    let updated = assert_ok!(
        levels
            .update_many(Update::new().filter(level_above(2)).set("name", "high"))
            .await
    );
    assert_eq!(updated.len(), 2);

    let first = assert_ok!(
        levels
            .update_first(Update::new().filter(level_above(0)).set("name", "low"))
            .await
    )
    .unwrap();
    assert_eq!(first["level"], Value::from(1));

    let high = assert_ok!(levels.find(Query::new().where_eq("name", "high")).await);
    let high: Vec<_> = high.iter().map(|level| level["level"].clone()).collect();
    assert_eq!(high, [Value::from(3), Value::from(4)]);

    let none = assert_ok!(
        levels
            .update_first(Update::new().filter(level_above(10)).set("name", "x"))
            .await
    );
    assert!(none.is_none());
}

#[tokio::test]
async fn connect_repoints_singular_relation() {
    let mut test = DbTest::new();
    let client = library_with_books(&mut test).await;

    let book = assert_ok!(
        client
            .collection("books")
            .update(1, Update::new().connect("author", 2))
            .await
    );
    assert_eq!(book["author"], Value::from(2));

    let authors = client.collection("authors");
    let a = assert_ok!(authors.get(1).await).unwrap();
    let b = assert_ok!(authors.get(2).await).unwrap();
    assert_eq!(a["books"], Value::from(vec![2]));
    assert_eq!(b["books"], Value::from(vec![1]));

    // Connecting what is already connected changes nothing
    let again = assert_ok!(
        client
            .collection("books")
            .update(1, Update::new().connect("author", 2))
            .await
    );
    assert_eq!(again, book);
}

#[tokio::test]
async fn create_through_update() {
    let mut test = DbTest::new();
    let client = library_with_books(&mut test).await;

    let author = assert_ok!(
        client
            .collection("authors")
            .update(2, Update::new().create("books", Create::new().set("title", "Three")))
            .await
    );
    assert_eq!(author["books"], Value::from(vec![3]));

    let book = assert_ok!(client.collection("books").get(3).await).unwrap();
    assert_eq!(book["author"], Value::from(2));
}

#[tokio::test]
async fn update_related_documents() {
    let mut test = DbTest::new();
    let client = library_with_books(&mut test).await;

    assert_ok!(
        client
            .collection("authors")
            .update(
                1,
                Update::new().update_related(
                    "books",
                    Update::new()
                        .filter(Filter::new().eq("title", "Two"))
                        .set("pages", 120),
                ),
            )
            .await
    );

    let books = assert_ok!(client.collection("books").find(Query::new()).await);
    assert!(books[0]["pages"].is_null());
    assert_eq!(books[1]["pages"], Value::from(120));
}

#[tokio::test]
async fn delete_through_update() {
    let mut test = DbTest::new();
    let client = library_with_books(&mut test).await;
    let authors = client.collection("authors");

    let author = assert_ok!(authors.update(1, Update::new().delete_key("books", 1)).await);
    assert_eq!(author["books"], Value::from(vec![2]));

    // The book is gone, and its review cascaded with it
    assert!(assert_ok!(client.collection("books").get(1).await).is_none());
    assert!(assert_ok!(client.collection("reviews").get(1).await).is_none());

    // Deleting something that is not linked
    assert_err!(
        authors.update(1, Update::new().delete_key("books", 1)).await,
        is_document_not_found
    );

    let author = assert_ok!(authors.update(1, Update::new().delete_all("books")).await);
    assert_eq!(author["books"], Value::from(Vec::<Value>::new()));
    assert!(assert_ok!(client.collection("books").find(Query::new()).await).is_empty());
}

#[tokio::test]
async fn disconnect_is_idempotent() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::league()).await;

    assert_ok!(
        client
            .collection("teams")
            .add(
                Create::new()
                    .set("name", "Reds")
                    .create_many("players", [Create::new().set("name", "P1"), Create::new().set("name", "P2")]),
            )
            .await
    );

    let players = client.collection("players");
    let player = assert_ok!(players.update(1, Update::new().disconnect("team")).await);
    assert!(player["team"].is_null());

    let again = assert_ok!(players.update(1, Update::new().disconnect("team")).await);
    assert_eq!(again, player);

    let team = assert_ok!(
        client
            .collection("teams")
            .update(1, Update::new().disconnect_key("players", 1))
            .await
    );
    assert_eq!(team["players"], Value::from(vec![2]));

    let team = assert_ok!(
        client
            .collection("teams")
            .update(1, Update::new().disconnect_all("players"))
            .await
    );
    assert_eq!(team["players"], Value::from(Vec::<Value>::new()));

    let p2 = assert_ok!(players.get(2).await).unwrap();
    assert!(p2["team"].is_null());
}

#[tokio::test]
async fn required_mirror_blocks_disconnect() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::kennel()).await;

    assert_ok!(
        client
            .collection("owners")
            .add(
                Create::new()
                    .set("name", "O")
                    .create("pets", Create::new().set("name", "Rex")),
            )
            .await
    );

    assert_err!(
        client
            .collection("owners")
            .update(1, Update::new().disconnect_key("pets", 1))
            .await,
        is_invalid_item
    );

    let pet = assert_ok!(client.collection("pets").get(1).await).unwrap();
    assert_eq!(pet["owner"], Value::from(1));
    let owner = assert_ok!(client.collection("owners").get(1).await).unwrap();
    assert_eq!(owner["pets"], Value::from(vec![1]));
}

#[tokio::test]
async fn singular_relations_on_both_sides() {
    let mut test = DbTest::new();
    let client = test.setup_db(fixtures::accounts()).await;
    let users = client.collection("users");
    let profiles = client.collection("profiles");

    let first = assert_ok!(
        users
            .add(
                Create::new()
                    .set("email", "a@example.com")
                    .create("profile", Create::new()),
            )
            .await
    );
    let second = assert_ok!(users.add(Create::new().set("email", "b@example.com")).await);
    let first_id = first["id"].as_str().unwrap().to_string();
    let second_id = second["id"].as_str().unwrap().to_string();

    // Profile 1 already belongs to the first user
    assert_err!(
        users
            .update(second_id.as_str(), Update::new().connect("profile", 1))
            .await,
        is_overwrite_relation
    );

    // Replacing the first user's profile frees the old one
    let first = assert_ok!(
        users
            .update(
                first_id.as_str(),
                Update::new().create("profile", Create::new().set("bio", "new")),
            )
            .await
    );
    assert_eq!(first["profile"], Value::from(2));

    let old = assert_ok!(profiles.get(1).await).unwrap();
    assert!(old["user"].is_null());

    // Now the second user can take it
    assert_ok!(
        users
            .update(second_id.as_str(), Update::new().connect("profile", 1))
            .await
    );
    let old = assert_ok!(profiles.get(1).await).unwrap();
    assert_eq!(old["user"], Value::from(second_id.as_str()));

    // Deleting through a singular relation, twice
    let first = assert_ok!(users.update(first_id.as_str(), Update::new().delete("profile")).await);
    assert!(first["profile"].is_null());
    assert!(assert_ok!(profiles.get(2).await).is_none());

    assert_ok!(users.update(first_id.as_str(), Update::new().delete("profile")).await);
}

#[tokio::test]
async fn update_many_skips_documents_deleted_along_the_way() {
    let schema = Schema::builder()
        .register(
            Model::builder("folders")
                .primary_key("id", PrimaryKey::auto_increment())
                .relation("files", Relation::many("files")),
        )
        .register(
            Model::builder("files")
                .primary_key("id", PrimaryKey::auto_increment())
                .property("name", Property::string())
                .relation(
                    "folder",
                    Relation::optional("folders").on_delete(OnDelete::Cascade),
                ),
        )
        .build()
        .unwrap();

    let mut test = DbTest::new();
    let client = test.setup_db(schema).await;

    assert_ok!(
        client
            .collection("folders")
            .add(Create::new().create_many(
                "files",
                [
                    Create::new().set("name", "a"),
                    Create::new().set("name", "b"),
                ],
            ))
            .await
    );

    // Deleting the first file's folder takes the second file with it
    let updated = assert_ok!(
        client
            .collection("files")
            .update_many(Update::new().delete("folder"))
            .await
    );
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0]["name"], Value::from("a"));
    assert!(updated[0]["folder"].is_null());

    assert!(assert_ok!(client.collection("folders").get(1).await).is_none());
    assert!(assert_ok!(client.collection("files").get(2).await).is_none());
}
