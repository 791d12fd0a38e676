//! Cluster, bucket and scope handles.

use crate::collection::Collection;
use crate::config::ConnectionOptions;
use crate::protocol::{BucketInfo, OpenBucketRequest, DEFAULT_COLLECTION, DEFAULT_SCOPE};
use crate::transport::{SharedTransport, Transport};
use crate::{error::Result, Error};
use std::sync::Arc;

/// Username and password presented when a bucket is opened.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordAuthenticator {
    pub username: String,
    pub password: String,
}

impl PasswordAuthenticator {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for PasswordAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordAuthenticator")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Entry point: a transport plus connection-wide options and credentials.
#[derive(Clone)]
pub struct Cluster {
    transport: SharedTransport,
    options: Arc<ConnectionOptions>,
    authenticator: Option<PasswordAuthenticator>,
}

impl Cluster {
    pub fn connect<T: Transport + 'static>(transport: T, options: ConnectionOptions) -> Self {
        Self {
            transport: Arc::new(transport),
            options: Arc::new(options),
            authenticator: None,
        }
    }

    /// Connect over a transport that is already shared.
    pub fn with_shared(transport: SharedTransport, options: ConnectionOptions) -> Self {
        Self {
            transport,
            options: Arc::new(options),
            authenticator: None,
        }
    }

    /// Credentials used by subsequent [`Cluster::bucket`] calls.
    pub fn authenticate(&mut self, authenticator: PasswordAuthenticator) -> &mut Self {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    /// Open a bucket.
    pub fn bucket(&self, name: &str) -> Result<Bucket> {
        if name.is_empty() {
            return Err(Error::BadInput("empty bucket name".into()));
        }
        let (username, password) = match &self.authenticator {
            Some(auth) => (auth.username.clone(), auth.password.clone()),
            None => (name.to_string(), String::new()),
        };
        let info = self.transport.open_bucket(&OpenBucketRequest {
            bucket: name.to_string(),
            username,
            password,
        })?;
        tracing::info!(
            bucket = %info.name,
            partitions = info.partitions,
            replicas = info.replicas,
            "bucket opened"
        );
        Ok(Bucket {
            transport: self.transport.clone(),
            info: Arc::new(info),
            options: self.options.clone(),
        })
    }
}

impl std::fmt::Debug for Cluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cluster")
            .field("options", &self.options)
            .field("authenticator", &self.authenticator)
            .finish()
    }
}

/// An open bucket.
#[derive(Clone)]
pub struct Bucket {
    transport: SharedTransport,
    info: Arc<BucketInfo>,
    options: Arc<ConnectionOptions>,
}

impl Bucket {
    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn info(&self) -> &BucketInfo {
        &self.info
    }

    pub fn scope(&self, name: &str) -> Scope {
        Scope {
            bucket: self.clone(),
            name: name.to_string(),
        }
    }

    pub fn default_collection(&self) -> Collection {
        self.scope(DEFAULT_SCOPE).collection(DEFAULT_COLLECTION)
    }
}

impl std::fmt::Debug for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket").field("info", &self.info).finish()
    }
}

#[derive(Debug, Clone)]
pub struct Scope {
    bucket: Bucket,
    name: String,
}

impl Scope {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection(&self, name: &str) -> Collection {
        Collection::new(
            self.bucket.transport.clone(),
            self.bucket.info.clone(),
            self.name.clone(),
            name,
            self.bucket.options.clone(),
        )
    }
}
