use bson::doc;
use mongodb::{
    options::{ClientOptions, Credential, IndexOptions, ResolverConfig},
    Client, Database, IndexModel,
};
use tracing::{info, instrument};

use crate::config::mongo_conf::MongoConfig;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};

pub const USERS: &str = "users";
pub const BOOKS: &str = "books";
pub const CATEGORIES: &str = "categories";

/// Opens a pooled client and returns the configured database handle.
pub async fn connect(config: &MongoConfig) -> Result<Database, mongodb::error::Error> {
    let mut client_options =
        ClientOptions::parse_with_resolver_config(&config.uri, ResolverConfig::cloudflare()).await?;
    client_options.app_name = Some("BookstoreBackend".to_string());
    client_options.max_pool_size = Some(config.pool_size);
    client_options.connect_timeout = Some(std::time::Duration::from_secs(config.connection_timeout_secs));
    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        client_options.credential = Some(
            Credential::builder()
                .username(username.clone())
                .password(password.clone())
                .build(),
        );
    }
    let client = Client::with_options(client_options)?;
    Ok(client.database(&config.database))
}

fn unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

/// Creates the unique indexes the uniqueness rules rely on. Safe to run on every start.
#[instrument(skip(db))]
pub async fn ensure_indexes(db: &Database) -> RepositoryResult<()> {
    let users = db.collection::<bson::Document>(USERS);
    for field in ["email", "userName", "phone"] {
        users
            .create_index(unique(doc! { field: 1 }), None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to create users.{} index: {}", field, e)))?;
    }

    db.collection::<bson::Document>(CATEGORIES)
        .create_index(unique(doc! { "name": 1 }), None)
        .await
        .map_err(|e| RepositoryError::database(format!("Failed to create categories.name index: {}", e)))?;

    db.collection::<bson::Document>(BOOKS)
        .create_index(unique(doc! { "title": 1, "category": 1 }), None)
        .await
        .map_err(|e| RepositoryError::database(format!("Failed to create books index: {}", e)))?;

    info!("MongoDB indexes ensured");
    Ok(())
}
