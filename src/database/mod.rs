pub mod contacts;
pub mod users;

#[cfg(test)]
pub mod memory;

pub use contacts::{ContactStore, MongoContactStore};
pub use users::{MongoUserStore, UserStore};

use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::{Client, Collection, Database};
use thiserror::Error;

const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("Email is already in use")]
    DuplicateEmail,
}

/// True when the driver rejected a write because of a unique index.
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == DUPLICATE_KEY,
        _ => false,
    }
}

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> mongodb::error::Result<Self> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // Extract database name from URI or use default
        let db_name = uri
            .rsplit('/')
            .next()
            .and_then(|s| s.split('?').next())
            .filter(|s| !s.is_empty() && !s.contains(':'))
            .unwrap_or("contacts");

        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the indexes the stores rely on. `users(email)` is unique so a
    /// signup race still ends in a duplicate-key error instead of two accounts.
    async fn ensure_indexes(&self) -> mongodb::error::Result<()> {
        use mongodb::bson::doc;
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let contacts = self.collection::<mongodb::bson::Document>(contacts::COLLECTION);
        let owner_index = IndexModel::builder().keys(doc! { "owner": 1 }).build();

        match contacts.create_index(owner_index).await {
            Ok(_) => log::info!("   ✅ Index created: contacts(owner)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        let users = self.collection::<mongodb::bson::Document>(users::COLLECTION);
        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        // A failure here means existing data violates uniqueness; refuse to start.
        users.create_index(email_index).await?;
        log::info!("   ✅ Index created: users(email) unique");

        let verification_index = IndexModel::builder()
            .keys(doc! { "verificationToken": 1 })
            .build();

        match users.create_index(verification_index).await {
            Ok(_) => log::info!("   ✅ Index created: users(verificationToken)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    /// Check if the connection is healthy
    pub async fn ping(&self) -> bool {
        self.db
            .run_command(mongodb::bson::doc! { "ping": 1 })
            .await
            .is_ok()
    }
}

/// Live database for the `#[ignore]`d store tests.
#[cfg(test)]
pub(crate) async fn connect_for_tests() -> MongoDB {
    dotenv::dotenv().ok();
    let uri = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| "mongodb://localhost:27017/contacts_test".to_string());
    MongoDB::new(&uri).await.expect("MongoDB must be running")
}
