//! Parameter providers: configuration values addressed by path.
//!
//! The container never interprets a parameter path. It hands the path
//! verbatim to the configured [`ParameterProvider`] and passes the returned
//! [`Value`] on to the provider being built.

use thiserror::Error;

use crate::error::BoxError;
use crate::value::Value;

#[cfg(feature = "config")]
pub use json::JsonParameterProvider;

/// Failure reported by a [`ParameterProvider`].
#[derive(Debug, Clone, Error)]
pub enum ParameterError {
    /// No parameter provider was configured on the container
    #[error("no parameter provider configured")]
    NotConfigured,

    #[error("no parameter at {0}")]
    NotFound(String),

    /// Value type the provider cannot store
    #[error("cannot store a {type_name} at {path}")]
    Unsupported { path: String, type_name: &'static str },

    /// Path walks through a value that is not an object
    #[error("{0} is not an object")]
    NotAnObject(String),

    /// Source could not be read or parsed
    #[error("failed to load parameters: {0}")]
    Load(String),

    #[error(transparent)]
    Other(BoxError),
}

/// Source of configuration values.
///
/// # Examples
///
/// ```rust
/// use ref_di::{ParameterError, ParameterProvider, Value};
/// use std::collections::HashMap;
/// use parking_lot::RwLock;
///
/// #[derive(Default)]
/// struct MapParams(RwLock<HashMap<String, Value>>);
///
/// impl ParameterProvider for MapParams {
///     fn get(&self, path: &str) -> Result<Value, ParameterError> {
///         self.0.read().get(path).cloned().ok_or_else(|| ParameterError::NotFound(path.into()))
///     }
///
///     fn set(&self, path: &str, value: Value) -> Result<(), ParameterError> {
///         self.0.write().insert(path.into(), value);
///         Ok(())
///     }
/// }
///
/// let params = MapParams::default();
/// params.set("db.dsn", Value::new("sqlite::memory:".to_string())).unwrap();
/// assert_eq!(params.get("db.dsn").unwrap().get::<String>().as_deref(), Some("sqlite::memory:"));
/// ```
pub trait ParameterProvider: Send + Sync {
    fn get(&self, path: &str) -> Result<Value, ParameterError>;
    fn set(&self, path: &str, value: Value) -> Result<(), ParameterError>;
}

/// Placeholder used until a real provider is configured.
///
/// Every call fails with [`ParameterError::NotConfigured`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NoParameterProvider;

impl ParameterProvider for NoParameterProvider {
    fn get(&self, _path: &str) -> Result<Value, ParameterError> {
        Err(ParameterError::NotConfigured)
    }

    fn set(&self, _path: &str, _value: Value) -> Result<(), ParameterError> {
        Err(ParameterError::NotConfigured)
    }
}

#[cfg(feature = "config")]
mod json {
    use std::path::Path;
    use std::sync::Arc;

    use parking_lot::RwLock;
    use serde::de::DeserializeOwned;
    use serde::Serialize;
    use serde_json::{Map, Value as Json};

    use super::{ParameterError, ParameterProvider};
    use crate::value::Value;

    /// Parameters backed by an in-memory JSON tree, addressed by dot paths.
    ///
    /// `get` converts leaves to native values: strings to `String`, booleans
    /// to `bool`, integers to `i64` (or `u64` above `i64::MAX`), other numbers
    /// to `f64` and `null` to [`Value::nil`]. Arrays and objects are returned
    /// as `serde_json::Value`. Use [`JsonParameterProvider::get_as`] to
    /// deserialize into any other type.
    ///
    /// `set` creates missing intermediate objects.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ref_di::{JsonParameterProvider, ParameterProvider, Value};
    ///
    /// let params = JsonParameterProvider::from_str(r#"{"http": {"port": 8080}}"#).unwrap();
    /// assert_eq!(params.get("http.port").unwrap().get::<i64>(), Some(8080));
    ///
    /// params.set("http.host", Value::new("localhost".to_string())).unwrap();
    /// let host: String = params.get_as("http.host").unwrap();
    /// assert_eq!(host, "localhost");
    /// ```
    #[derive(Debug)]
    pub struct JsonParameterProvider {
        tree: RwLock<Json>,
    }

    impl Default for JsonParameterProvider {
        fn default() -> Self {
            Self::new()
        }
    }

    impl JsonParameterProvider {
        pub fn new() -> Self {
            Self::from_json(Json::Object(Map::new()))
        }

        pub fn from_json(tree: Json) -> Self {
            JsonParameterProvider {
                tree: RwLock::new(tree),
            }
        }

        #[allow(clippy::should_implement_trait)]
        pub fn from_str(source: &str) -> Result<Self, ParameterError> {
            serde_json::from_str(source)
                .map(Self::from_json)
                .map_err(|e| ParameterError::Load(e.to_string()))
        }

        pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ParameterError> {
            let path = path.as_ref();
            let content = std::fs::read_to_string(path)
                .map_err(|e| ParameterError::Load(format!("{}: {e}", path.display())))?;
            Self::from_str(&content)
        }

        pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, ParameterError> {
            serde_json::to_value(value)
                .map(Self::from_json)
                .map_err(|e| ParameterError::Load(e.to_string()))
        }

        /// Deserializes the subtree at `path`.
        pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<T, ParameterError> {
            let node = self.node(path)?;
            serde_json::from_value(node).map_err(|e| ParameterError::Other(Arc::new(e)))
        }

        /// Copy of the whole tree.
        pub fn snapshot(&self) -> Json {
            self.tree.read().clone()
        }

        fn node(&self, path: &str) -> Result<Json, ParameterError> {
            let tree = self.tree.read();
            segments(path)
                .try_fold(&*tree, |node, segment| match node {
                    Json::Object(map) => map.get(segment),
                    Json::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                    _ => None,
                })
                .cloned()
                .ok_or_else(|| ParameterError::NotFound(path.to_string()))
        }
    }

    fn segments(path: &str) -> impl Iterator<Item = &str> {
        path.split('.').filter(|s| !s.is_empty())
    }

    fn to_value(node: Json) -> Value {
        match node {
            Json::Null => Value::nil(),
            Json::Bool(b) => Value::new(b),
            Json::String(s) => Value::new(s),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::new(i)
                } else if let Some(u) = n.as_u64() {
                    Value::new(u)
                } else {
                    Value::new(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            other => Value::new(other),
        }
    }

    fn to_json(path: &str, value: &Value) -> Result<Json, ParameterError> {
        if value.is_nil() {
            return Ok(Json::Null);
        }
        if let Some(json) = value.get::<Json>() {
            return Ok(json);
        }
        if let Some(s) = value.get::<String>() {
            return Ok(Json::String(s));
        }
        if let Some(s) = value.get::<&'static str>() {
            return Ok(Json::String(s.to_string()));
        }
        if let Some(b) = value.get::<bool>() {
            return Ok(Json::Bool(b));
        }
        if let Some(i) = value.get::<i64>() {
            return Ok(Json::from(i));
        }
        if let Some(i) = value.get::<i32>() {
            return Ok(Json::from(i));
        }
        if let Some(u) = value.get::<u64>() {
            return Ok(Json::from(u));
        }
        if let Some(u) = value.get::<u32>() {
            return Ok(Json::from(u));
        }
        if let Some(f) = value.get::<f64>() {
            return Ok(Json::from(f));
        }
        Err(ParameterError::Unsupported {
            path: path.to_string(),
            type_name: value.type_name(),
        })
    }

    impl ParameterProvider for JsonParameterProvider {
        fn get(&self, path: &str) -> Result<Value, ParameterError> {
            self.node(path).map(to_value)
        }

        fn set(&self, path: &str, value: Value) -> Result<(), ParameterError> {
            let leaf = to_json(path, &value)?;
            let parts: Vec<&str> = segments(path).collect();
            let Some((last, parents)) = parts.split_last() else {
                *self.tree.write() = leaf;
                return Ok(());
            };

            let mut tree = self.tree.write();
            let mut node = &mut *tree;
            for (depth, segment) in parents.iter().enumerate() {
                let map = node
                    .as_object_mut()
                    .ok_or_else(|| ParameterError::NotAnObject(parts[..depth].join(".")))?;
                node = map
                    .entry(segment.to_string())
                    .or_insert_with(|| Json::Object(Map::new()));
            }
            node.as_object_mut()
                .ok_or_else(|| ParameterError::NotAnObject(parents.join(".")))?
                .insert(last.to_string(), leaf);
            Ok(())
        }
    }

}
