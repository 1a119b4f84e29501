//! Schemas shared by the integration tests.

use tether::{KeyType, Model, OnDelete, PrimaryKey, Property, Relation, Schema};

/// Authors own books, books own reviews. Deleting an author cascades all the
/// way down. Books carry unidirectional tags.
pub fn library() -> Schema {
    Schema::builder()
        .register(
            Model::builder("authors")
                .primary_key("id", PrimaryKey::auto_increment())
                .property("name", Property::string())
                .relation("books", Relation::many("books")),
        )
        .register(
            Model::builder("books")
                .primary_key("id", PrimaryKey::auto_increment())
                .property("title", Property::string())
                .property("pages", Property::int().optional())
                .relation("author", Relation::one("authors").on_delete(OnDelete::Cascade))
                .relation("reviews", Relation::many("reviews"))
                .relation("tags", Relation::many("tags").unidirectional()),
        )
        .register(
            Model::builder("reviews")
                .primary_key("id", PrimaryKey::auto_increment())
                .property("body", Property::string())
                .property("stars", Property::int().default(3))
                .relation("book", Relation::one("books").on_delete(OnDelete::Cascade)),
        )
        .register(
            Model::builder("tags")
                .primary_key("label", PrimaryKey::supplied(KeyType::String))
                .property("color", Property::string().optional()),
        )
        .build()
        .unwrap()
}

/// Pets must have an owner; owners with pets cannot be deleted.
pub fn kennel() -> Schema {
    Schema::builder()
        .register(
            Model::builder("owners")
                .primary_key("id", PrimaryKey::auto_increment())
                .property("name", Property::string())
                .relation("pets", Relation::many("pets")),
        )
        .register(
            Model::builder("pets")
                .primary_key("id", PrimaryKey::auto_increment())
                .property("name", Property::string())
                .relation("owner", Relation::one("owners")),
        )
        .build()
        .unwrap()
}

/// Players may belong to a team; deleting the team leaves them free agents.
pub fn league() -> Schema {
    Schema::builder()
        .register(
            Model::builder("teams")
                .primary_key("id", PrimaryKey::auto_increment())
                .property("name", Property::string())
                .relation("players", Relation::many("players")),
        )
        .register(
            Model::builder("players")
                .primary_key("id", PrimaryKey::auto_increment())
                .property("name", Property::string())
                .relation("team", Relation::optional("teams").on_delete(OnDelete::SetNull)),
        )
        .build()
        .unwrap()
}

/// A one-to-one pair, both sides optional.
pub fn accounts() -> Schema {
    Schema::builder()
        .register(
            Model::builder("users")
                .primary_key("id", PrimaryKey::uuid())
                .property("email", Property::string())
                .relation("profile", Relation::optional("profiles")),
        )
        .register(
            Model::builder("profiles")
                .primary_key("id", PrimaryKey::auto_increment())
                .property("bio", Property::string().default(""))
                .relation("user", Relation::optional("users")),
        )
        .build()
        .unwrap()
}

/// A single collection of numbered levels.
pub fn levels() -> Schema {
    Schema::builder()
        .register(
            Model::builder("levels")
                .primary_key("id", PrimaryKey::auto_increment())
                .property("level", Property::int())
                .property("name", Property::string().optional()),
        )
        .build()
        .unwrap()
}
