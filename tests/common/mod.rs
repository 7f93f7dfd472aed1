//! Shared fixtures for the integration suites: an in-memory fetcher and
//! byte cache, plus catalog documents modeled on real cirros-style data.

// Not every suite uses every fixture.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Mutex, Once};

use async_trait::async_trait;

use streamcat::error::FetchError;
use streamcat::fetch::{ByteCache, Fetcher};

static INIT: Once = Once::new();

/// Route engine tracing through the test harness, honoring `RUST_LOG`.
/// Safe to call from every test; only the first call installs.
pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Fetcher backed by a URL-to-bytes map. Unknown URLs report `NotFound`.
#[derive(Default)]
pub struct MapFetcher {
    documents: HashMap<String, Vec<u8>>,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: &str, bytes: impl Into<Vec<u8>>) {
        self.documents.insert(url.to_string(), bytes.into());
    }
}

#[async_trait]
impl Fetcher for MapFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                url: url.to_string(),
            })
    }
}

/// Fetcher that fails every request, for transport-error paths.
pub struct FailingFetcher;

#[async_trait]
impl Fetcher for FailingFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        Err(FetchError::Transport {
            url: url.to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

/// In-memory byte cache.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, key: &str, bytes: impl Into<Vec<u8>>) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl ByteCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    async fn put(&self, key: &str, bytes: &[u8]) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
    }
}

/// A products:1.0 document with three versions of a pinky amd64 server
/// image and one i386 sibling product, cirros-style.
pub const FOOCLOUD_PRODUCTS: &str = r#"{
    "format": "products:1.0",
    "content_id": "com.example.foovendor:released:download",
    "datatype": "image-downloads",
    "products": {
        "pinky:server:amd64": {
            "arch": "amd64",
            "release": "pinky",
            "stream": "released",
            "versions": {
                "20120611": {
                    "label": "release",
                    "items": {
                        "disk1.img": {
                            "path": "files/release-20120611/disk1.img",
                            "ftype": "disk1.img",
                            "size": 4204,
                            "md5": "1f076f93f89dc82b25812cd102556362"
                        }
                    }
                },
                "20120827": {
                    "label": "release",
                    "items": {
                        "disk1.img": {
                            "path": "files/release-20120827/disk1.img",
                            "ftype": "disk1.img",
                            "size": 4207,
                            "md5": "6847bd7f24e7a0bdcf6b1c425e93cbbe"
                        }
                    }
                },
                "20130111": {
                    "label": "release",
                    "items": {
                        "disk1.img": {
                            "path": "files/release-20130111/disk1.img",
                            "ftype": "disk1.img",
                            "size": 4210,
                            "md5": "797e2d488c799eab0a8eb09a9c1ff4a3"
                        },
                        "root.tar.gz": {
                            "path": "files/release-20130111/root.tar.gz",
                            "ftype": "root.tar.gz",
                            "size": 9310
                        }
                    }
                }
            }
        },
        "pinky:server:i386": {
            "arch": "i386",
            "release": "pinky",
            "stream": "released",
            "versions": {
                "20120827": {
                    "label": "release",
                    "items": {
                        "disk1.img": {
                            "path": "files/release-20120827/disk1-i386.img",
                            "ftype": "disk1.img",
                            "size": 4012,
                            "md5": "1a48a42e27f0f6c04d56b77fe45f4e52"
                        }
                    }
                }
            }
        }
    }
}"#;

/// A products:1.0 document for a different content identifier (devel
/// stream) carrying its own version of the amd64 product.
pub const FOOCLOUD_DEVEL: &str = r#"{
    "format": "products:1.0",
    "content_id": "com.example.foovendor:devel:download",
    "products": {
        "pinky:server:amd64": {
            "arch": "amd64",
            "release": "pinky",
            "stream": "devel",
            "versions": {
                "20130215": {
                    "items": {
                        "disk1.img": {
                            "path": "files/devel-20130215/disk1.img",
                            "ftype": "disk1.img",
                            "size": 4302
                        }
                    }
                }
            }
        }
    }
}"#;

/// A stream-collection:1.0 document referencing the released products
/// document and advertising two regional mirrors.
pub const FOOCLOUD_COLLECTION: &str = r#"{
    "format": "stream-collection:1.0",
    "description": "foovendor released streams",
    "streams": [
        {
            "endpoint": "https://us-mirror.example.com",
            "path": "streams/v1/released.json",
            "region": "us-east-1",
            "arch": "amd64",
            "cloud": "foocloud"
        },
        {
            "endpoint": "https://eu-mirror.example.com",
            "path": "streams/v1/released.json",
            "region": "eu-west-1",
            "arch": "amd64",
            "cloud": "foocloud"
        }
    ]
}"#;
