/*!
 * Persistence contract handed to command handlers
 *
 * Every handler declares the documents it owns on a shared `CodecBuilder`
 * while the registry is open. The codec is built once at lock and shared by
 * all handlers through `StorageContext`.
 */

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StorageError, StorageResult};

/// Collects codec settings contributed by registered handlers.
#[derive(Debug, Clone)]
pub struct CodecBuilder {
    pretty: bool,
    schemas: BTreeMap<String, u32>,
}

impl CodecBuilder {
    pub fn new(pretty: bool) -> Self {
        Self {
            pretty,
            schemas: BTreeMap::new(),
        }
    }

    pub fn pretty(&mut self, pretty: bool) -> &mut Self {
        self.pretty = pretty;
        self
    }

    /// Registers a document name and its current format version.
    /// Re-registering a name overwrites the version.
    pub fn register_schema(&mut self, schema: &str, version: u32) -> &mut Self {
        self.schemas.insert(schema.to_string(), version);
        self
    }

    pub fn build(&self) -> JsonCodec {
        JsonCodec {
            pretty: self.pretty,
            schemas: self.schemas.clone(),
        }
    }
}

impl Default for CodecBuilder {
    fn default() -> Self {
        Self::new(true)
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    schema: &'a str,
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    schema: String,
    version: u32,
    data: serde_json::Value,
}

/// Versioned JSON documents, one file per schema under the storage root.
#[derive(Debug, Clone)]
pub struct JsonCodec {
    pretty: bool,
    schemas: BTreeMap<String, u32>,
}

impl JsonCodec {
    pub fn is_pretty(&self) -> bool {
        self.pretty
    }

    pub fn schemas(&self) -> impl Iterator<Item = (&str, u32)> {
        self.schemas.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn version_of(&self, schema: &str) -> StorageResult<u32> {
        self.schemas
            .get(schema)
            .copied()
            .ok_or_else(|| StorageError::UnknownSchema(schema.to_string()))
    }

    pub fn encode<T: Serialize>(&self, schema: &str, value: &T) -> StorageResult<String> {
        let envelope = EnvelopeRef {
            schema,
            version: self.version_of(schema)?,
            data: value,
        };
        let encoded = if self.pretty {
            serde_json::to_string_pretty(&envelope)
        } else {
            serde_json::to_string(&envelope)
        };
        encoded.map_err(|source| StorageError::Json {
            schema: schema.to_string(),
            source,
        })
    }

    pub fn decode<T: DeserializeOwned>(&self, schema: &str, text: &str) -> StorageResult<T> {
        let expected = self.version_of(schema)?;
        let json_error = |source: serde_json::Error| StorageError::Json {
            schema: schema.to_string(),
            source,
        };
        let envelope: Envelope = serde_json::from_str(text).map_err(json_error)?;
        if envelope.schema != schema || envelope.version != expected {
            return Err(StorageError::SchemaMismatch {
                schema: schema.to_string(),
                expected,
                found: envelope.version,
            });
        }
        serde_json::from_value(envelope.data).map_err(json_error)
    }

    pub fn path_for(root: &Path, schema: &str) -> PathBuf {
        root.join(format!("{}.json", schema))
    }

    /// Writes the document next to its final path, then renames it into place.
    pub fn save<T: Serialize>(&self, root: &Path, schema: &str, value: &T) -> StorageResult<PathBuf> {
        let text = self.encode(schema, value)?;
        let path = Self::path_for(root, schema);
        let tmp = root.join(format!(".{}.json.tmp", schema));

        fs::write(&tmp, text).map_err(|source| StorageError::Io {
            context: format!("writing {}", tmp.display()),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StorageError::Io {
            context: format!("replacing {}", path.display()),
            source,
        })?;

        debug!("saved document {} to {}", schema, path.display());
        Ok(path)
    }

    /// Returns `Ok(None)` when the document has never been saved.
    pub fn load<T: DeserializeOwned>(&self, root: &Path, schema: &str) -> StorageResult<Option<T>> {
        let path = Self::path_for(root, schema);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StorageError::Io {
                    context: format!("reading {}", path.display()),
                    source,
                })
            }
        };
        self.decode(schema, &text).map(Some)
    }
}

/// Storage root plus the shared codec, passed to `init` and `save`.
#[derive(Debug, Clone)]
pub struct StorageContext {
    root: PathBuf,
    codec: Arc<JsonCodec>,
}

impl StorageContext {
    pub fn new(root: impl Into<PathBuf>, codec: Arc<JsonCodec>) -> Self {
        Self {
            root: root.into(),
            codec,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn codec(&self) -> &JsonCodec {
        &self.codec
    }

    pub fn save<T: Serialize>(&self, schema: &str, value: &T) -> StorageResult<PathBuf> {
        self.codec.save(&self.root, schema, value)
    }

    pub fn load<T: DeserializeOwned>(&self, schema: &str) -> StorageResult<Option<T>> {
        self.codec.load(&self.root, schema)
    }
}
