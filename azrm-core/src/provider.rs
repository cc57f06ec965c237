//! Provider - Error taxonomy and the object-safe resource surface
//!
//! A Provider exposes one [`ManagedResource`] per resource type and one
//! [`ReadOnlyResource`] per data source. Callers hand them untyped
//! configuration ([`Attributes`]) and ID strings; the generic harness in
//! [`crate::handler`] turns those into typed handler calls.

use std::future::Future;
use std::pin::Pin;

use crate::differ::Diff;
use crate::resource::{Attributes, State};
use crate::schema::ResourceSchema;

/// Category of a provider error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The remote object does not exist (HTTP 404)
    NotFound,
    /// Create found an object with the same key; it has to be imported
    AlreadyExists,
    /// Configuration rejected before any call was made
    Validation,
    /// Azure returned an error
    Api,
    /// The operation did not finish within its timeout
    Timeout,
    /// The resource type does not support the operation
    Unsupported,
    /// A payload could not be converted
    Decode,
}

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub message: String,
    /// Resource type the error belongs to (e.g., "azurerm_dns_a_record")
    pub resource_type: Option<String>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref resource_type) = self.resource_type {
            write!(f, "[{}] {}", resource_type, self.message)?;
        } else {
            write!(f, "{}", self.message)?;
        }
        if let Some(ref cause) = self.cause {
            write!(f, ": {}", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Api, message)
    }

    pub fn with_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            resource_type: None,
            cause: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::NotFound, message)
    }

    /// Create found an existing object under `id`
    pub fn already_exists(id: &str) -> Self {
        Self::with_kind(
            ErrorKind::AlreadyExists,
            format!(
                "A resource with the ID {:?} already exists - to be managed it needs to be imported into the State",
                id
            ),
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Validation, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Timeout, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Unsupported, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Decode, message)
    }

    /// Attach the resource type unless one is already set
    pub fn for_resource(mut self, resource_type: impl Into<String>) -> Self {
        if self.resource_type.is_none() {
            self.resource_type = Some(resource_type.into());
        }
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A managed resource type with Create/Read/Update/Delete
pub trait ManagedResource: Send + Sync {
    /// Resource type name (e.g., "azurerm_automation_account")
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> ResourceSchema;

    /// Validate configuration without calling Azure
    fn validate(&self, config: &Attributes) -> ProviderResult<()>;

    /// Parse an ID of this resource type and describe its segments
    fn describe_id(&self, id: &str) -> ProviderResult<String>;

    /// Decide between no-op, in-place update and replacement
    fn plan(&self, prior: &Attributes, desired: &Attributes) -> ProviderResult<Diff>;

    /// Create the resource; fails if it already exists
    fn create(&self, config: &Attributes) -> BoxFuture<'_, ProviderResult<State>>;

    /// Read the resource; returns `State::not_found()` if it is gone
    fn read(&self, id: &str) -> BoxFuture<'_, ProviderResult<State>>;

    fn update(&self, id: &str, config: &Attributes) -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete the resource; an already absent resource is not an error
    fn delete(&self, id: &str) -> BoxFuture<'_, ProviderResult<()>>;

    /// Read an existing resource for adoption; absence is an error
    fn import(&self, id: &str) -> BoxFuture<'_, ProviderResult<State>>;
}

/// A data source: looks up an existing object from its configuration
pub trait ReadOnlyResource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> ResourceSchema;

    fn validate(&self, config: &Attributes) -> ProviderResult<()>;

    /// Look the object up; a missing object is a `NotFound` error
    fn read(&self, config: &Attributes) -> BoxFuture<'_, ProviderResult<State>>;
}

/// Main Provider trait
///
/// Exposes every resource type and data source the provider can handle.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "azurerm")
    fn name(&self) -> &'static str;

    fn resources(&self) -> Vec<&dyn ManagedResource>;

    fn data_sources(&self) -> Vec<&dyn ReadOnlyResource>;

    fn resource(&self, type_name: &str) -> Option<&dyn ManagedResource> {
        self.resources()
            .into_iter()
            .find(|r| r.type_name() == type_name)
    }

    fn data_source(&self, type_name: &str) -> Option<&dyn ReadOnlyResource> {
        self.data_sources()
            .into_iter()
            .find(|d| d.type_name() == type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_resource_type_and_cause() {
        let cause = std::io::Error::other("connection reset");
        let err = ProviderError::new("reading Zone \"example.com\"")
            .for_resource("azurerm_dns_zone")
            .with_cause(cause);
        assert_eq!(
            err.to_string(),
            "[azurerm_dns_zone] reading Zone \"example.com\": connection reset"
        );
    }

    #[test]
    fn for_resource_keeps_first_type() {
        let err = ProviderError::not_found("gone")
            .for_resource("azurerm_dns_a_record")
            .for_resource("other");
        assert_eq!(err.resource_type.as_deref(), Some("azurerm_dns_a_record"));
        assert!(err.is_not_found());
    }

    #[test]
    fn already_exists_mentions_import() {
        let err = ProviderError::already_exists("/subscriptions/sub1");
        assert_eq!(err.kind, ErrorKind::AlreadyExists);
        assert!(err.message.contains("imported"));
    }
}
