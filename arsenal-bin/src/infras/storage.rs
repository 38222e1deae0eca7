use crate::infras::uploads::ImageKind;
use arsenal_db::enums::EstablishmentKind;
use aws_sdk_s3::{
    config::{BehaviorVersion, Credentials, Region},
    primitives::ByteStream,
    Client, Config,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use chrono::Utc;
use rand::{distributions::Alphanumeric, prelude::StdRng, Rng, SeedableRng};
use rocket::fairing::{AdHoc, Fairing};
use serde::Deserialize;
use std::{collections::HashMap, fmt, sync::Arc};
use tokio::sync::RwLock;

/// Buckets uploaded objects are sorted into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Blog,
    Events,
    Stores,
    Clubs,
    Servicing,
    Establishments,
    Listings,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blog => "blog",
            Self::Events => "events",
            Self::Stores => "stores",
            Self::Clubs => "clubs",
            Self::Servicing => "servicing",
            Self::Establishments => "establishments",
            Self::Listings => "listings",
        }
    }

    // Range logos live in the generic establishments bucket
    pub fn for_establishment(kind: EstablishmentKind) -> Self {
        match kind {
            EstablishmentKind::Store => Self::Stores,
            EstablishmentKind::Club => Self::Clubs,
            EstablishmentKind::Range => Self::Establishments,
            EstablishmentKind::Servicing => Self::Servicing,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object key `<subfolder/>?<uid>-<millis>-<random>.<ext>`, unique per user and upload.
pub fn object_key(subfolder: Option<&str>, uid: &str, ext: &str) -> String {
    let random: String = StdRng::from_entropy()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();
    let name = format!("{}-{}-{}.{}", uid, Utc::now().timestamp_millis(), random, ext);
    match subfolder {
        Some(folder) => format!("{}/{}", folder.trim_matches('/'), name),
        None => name,
    }
}

/// A validated object ready to be stored
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub kind: ImageKind,
}

#[rocket::async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, bucket: Bucket, key: &str, object: StoredObject) -> anyhow::Result<()>;

    fn public_url(&self, bucket: Bucket, key: &str) -> String;

    /// Upload and return the public URL of the object.
    async fn put(
        &self,
        bucket: Bucket,
        subfolder: Option<&str>,
        uid: &str,
        object: StoredObject,
    ) -> anyhow::Result<String> {
        let key = object_key(subfolder, uid, object.kind.extension());
        self.upload(bucket, &key, object).await?;
        Ok(self.public_url(bucket, &key))
    }
}

fn join_url(base: &str, bucket: Bucket, key: &str) -> String {
    format!("{}/{}/{}", base.trim_end_matches('/'), bucket, key)
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
}

/// Configuration section `storage`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    S3 {
        public_base: String,
        s3: S3Config,
    },
    Memory {
        public_base: String,
    },
}

/// S3-compatible storage, addressed path-style
#[derive(Clone, Debug)]
pub struct S3Storage {
    client: Client,
    public_base: String,
}

impl S3Storage {
    pub fn new(config: &S3Config, public_base: &str) -> Self {
        // One has to define something to be the credential provider name,
        // but it doesn't seem like the value matters
        let creds = Credentials::new(&config.access_key, &config.secret_key, None, None, "arsenal");
        let s3_config = Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(creds)
            .force_path_style(true)
            .build();
        Self {
            client: Client::from_conf(s3_config),
            public_base: public_base.to_string(),
        }
    }
}

#[rocket::async_trait]
impl ObjectStorage for S3Storage {
    async fn upload(&self, bucket: Bucket, key: &str, object: StoredObject) -> anyhow::Result<()> {
        use md5::{Digest, Md5};

        // Calculate the hash of the file
        let mut hasher = Md5::new();
        hasher.update(&object.bytes);
        let hash = hasher.finalize();

        self.client
            .put_object()
            .bucket(bucket.as_str())
            .key(key)
            .content_type(object.kind.mime())
            .content_md5(STANDARD.encode(hash))
            .body(ByteStream::from(object.bytes))
            .send()
            .await?;
        Ok(())
    }

    fn public_url(&self, bucket: Bucket, key: &str) -> String {
        join_url(&self.public_base, bucket, key)
    }
}

/// Keeps objects in process memory. Used in development and tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    objects: Arc<RwLock<HashMap<(Bucket, String), StoredObject>>>,
    public_base: String,
}

impl MemoryStorage {
    pub fn new(public_base: &str) -> Self {
        Self {
            objects: Arc::default(),
            public_base: public_base.to_string(),
        }
    }

    #[cfg(test)]
    pub async fn get(&self, bucket: Bucket, key: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .await
            .get(&(bucket, key.to_string()))
            .cloned()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[rocket::async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(&self, bucket: Bucket, key: &str, object: StoredObject) -> anyhow::Result<()> {
        self.objects
            .write()
            .await
            .insert((bucket, key.to_string()), object);
        Ok(())
    }

    fn public_url(&self, bucket: Bucket, key: &str) -> String {
        join_url(&self.public_base, bucket, key)
    }
}

/// The storage backend managed by rocket
pub enum Storage {
    S3(S3Storage),
    Memory(MemoryStorage),
}

impl Storage {
    pub fn from_config(config: &StorageConfig) -> Self {
        match config {
            StorageConfig::S3 { public_base, s3 } => Self::S3(S3Storage::new(s3, public_base)),
            StorageConfig::Memory { public_base } => Self::Memory(MemoryStorage::new(public_base)),
        }
    }

    pub fn fairing() -> impl Fairing {
        AdHoc::try_on_ignite("Object storage", |rocket| async move {
            let config: StorageConfig = match rocket.figment().extract_inner("storage") {
                Ok(c) => c,
                Err(e) => {
                    log::error!("Failed on constructing the object storage backend: {:?}", e);
                    return Err(rocket);
                }
            };
            if let StorageConfig::Memory { .. } = config {
                log::warn!("Uploads are kept in memory and will be lost on restart");
            }
            Ok(rocket.manage(Self::from_config(&config)))
        })
    }
}

#[rocket::async_trait]
impl ObjectStorage for Storage {
    async fn upload(&self, bucket: Bucket, key: &str, object: StoredObject) -> anyhow::Result<()> {
        match self {
            Self::S3(s) => s.upload(bucket, key, object).await,
            Self::Memory(m) => m.upload(bucket, key, object).await,
        }
    }

    fn public_url(&self, bucket: Bucket, key: &str) -> String {
        match self {
            Self::S3(s) => s.public_url(bucket, key),
            Self::Memory(m) => m.public_url(bucket, key),
        }
    }
}
