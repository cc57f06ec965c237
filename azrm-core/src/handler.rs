//! Handler - Generic CRUD harness shared by every resource type
//!
//! A resource type implements [`ResourceHandler`] with a typed model, a typed
//! ID and the calls that talk to Azure. [`Managed`] wraps it and runs the
//! control flow that is the same everywhere:
//!
//! 1. apply schema defaults and validate configuration
//! 2. decode it into the typed model and run cross-field checks
//! 3. check that no object with the same ID exists (requires import)
//! 4. call the handler under the operation timeout
//! 5. read the object back and flatten it into state

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::Timeouts;
use crate::differ::{self, Diff};
use crate::id::IdParseError;
use crate::provider::{
    BoxFuture, ManagedResource, ProviderError, ProviderResult, ReadOnlyResource,
};
use crate::resource::{self, Attributes, State};
use crate::schema::ResourceSchema;

/// A typed resource ID
pub trait ResourceIdentity: fmt::Display + Clone + Send + Sync + Sized {
    /// Decode the canonical ID string
    fn parse(id: &str) -> Result<Self, IdParseError>;

    /// Human readable description used in error messages
    fn describe(&self) -> String;
}

/// Per-resource-type behaviour plugged into [`Managed`]
#[async_trait]
pub trait ResourceHandler: Send + Sync + 'static {
    type Model: Serialize + DeserializeOwned + Send + Sync;
    type Id: ResourceIdentity;

    fn type_name(&self) -> &'static str;

    fn schema(&self) -> ResourceSchema;

    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    /// Cross-field rules the schema cannot express
    fn validate(&self, _model: &Self::Model) -> Result<(), Vec<String>> {
        Ok(())
    }

    /// Rules that only apply when the object is first created
    fn validate_create(&self, _model: &Self::Model) -> Result<(), Vec<String>> {
        Ok(())
    }

    /// Derive the ID a new object will have
    fn id_for(&self, model: &Self::Model) -> ProviderResult<Self::Id>;

    async fn create(&self, id: &Self::Id, model: &Self::Model) -> ProviderResult<()>;

    /// Fetch the object; `Ok(None)` when Azure reports it does not exist
    async fn read(&self, id: &Self::Id) -> ProviderResult<Option<Self::Model>>;

    fn supports_update(&self) -> bool {
        false
    }

    async fn update(&self, id: &Self::Id, _model: &Self::Model) -> ProviderResult<()> {
        Err(ProviderError::unsupported(format!(
            "updating {} is not supported, the resource must be replaced",
            id.describe()
        )))
    }

    /// Delete the object; a `NotFound` error is treated as success by [`Managed`]
    async fn delete(&self, id: &Self::Id) -> ProviderResult<()>;
}

/// Run `operation` with a time limit
pub async fn with_timeout<T, F>(limit: Duration, operation: &str, fut: F) -> ProviderResult<T>
where
    F: Future<Output = ProviderResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::timeout(format!(
            "{} did not complete within {:?}",
            operation, limit
        ))),
    }
}

/// Validate configuration against a schema and decode it into a typed model
pub fn prepare<M: DeserializeOwned>(
    schema: &ResourceSchema,
    config: &Attributes,
) -> ProviderResult<M> {
    let mut attributes = config.clone();
    schema.apply_defaults(&mut attributes);

    if let Err(errors) = schema.validate(&attributes) {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        return Err(ProviderError::validation(messages.join("; ")));
    }

    resource::decode(&attributes)
        .map_err(|e| ProviderError::decode("decoding configuration").with_cause(e))
}

fn parse_id<I: ResourceIdentity>(id: &str) -> ProviderResult<I> {
    I::parse(id).map_err(|e| ProviderError::validation("invalid resource ID").with_cause(e))
}

/// Generic managed resource built from a [`ResourceHandler`]
pub struct Managed<H: ResourceHandler> {
    handler: H,
    timeouts: Timeouts,
}

impl<H: ResourceHandler> Managed<H> {
    pub fn new(handler: H) -> Self {
        let timeouts = handler.timeouts();
        Self { handler, timeouts }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    fn decode_config(&self, config: &Attributes) -> ProviderResult<H::Model> {
        let model: H::Model = prepare(&self.handler.schema(), config)?;
        self.handler
            .validate(&model)
            .map_err(|errors| ProviderError::validation(errors.join("; ")))?;
        Ok(model)
    }

    /// Flatten a model into state, keeping sensitive values Azure never echoes
    fn to_state(
        &self,
        id: &H::Id,
        model: &H::Model,
        config: Option<&Attributes>,
    ) -> ProviderResult<State> {
        let mut attributes = resource::encode(model)
            .map_err(|e| ProviderError::decode("flattening response").with_cause(e))?;

        if let Some(config) = config {
            for (name, schema) in &self.handler.schema().attributes {
                if schema.sensitive
                    && !attributes.contains_key(name)
                    && let Some(value) = config.get(name)
                {
                    attributes.insert(name.clone(), value.clone());
                }
            }
        }

        Ok(State::existing(id.to_string(), attributes))
    }

    async fn read_back(&self, id: &H::Id, config: &Attributes) -> ProviderResult<State> {
        let model = with_timeout(
            self.timeouts.read,
            &format!("reading {}", id.describe()),
            self.handler.read(id),
        )
        .await?
        .ok_or_else(|| {
            ProviderError::not_found(format!("{} was not found after writing", id.describe()))
        })?;
        self.to_state(id, &model, Some(config))
    }

    pub async fn create_resource(&self, config: &Attributes) -> ProviderResult<State> {
        let model = self.decode_config(config)?;
        self.handler
            .validate_create(&model)
            .map_err(|errors| ProviderError::validation(errors.join("; ")))?;
        let id = self.handler.id_for(&model)?;

        let existing = with_timeout(
            self.timeouts.read,
            &format!("checking for presence of existing {}", id.describe()),
            self.handler.read(&id),
        )
        .await?;
        if existing.is_some() {
            return Err(ProviderError::already_exists(&id.to_string()));
        }

        log::info!("creating {}", id.describe());
        with_timeout(
            self.timeouts.create,
            &format!("creating {}", id.describe()),
            self.handler.create(&id, &model),
        )
        .await?;

        self.read_back(&id, config).await
    }

    pub async fn read_resource(&self, id: &str) -> ProviderResult<State> {
        let id: H::Id = parse_id(id)?;
        let model = with_timeout(
            self.timeouts.read,
            &format!("reading {}", id.describe()),
            self.handler.read(&id),
        )
        .await?;

        match model {
            Some(model) => self.to_state(&id, &model, None),
            None => {
                log::warn!("{} was not found - removing from state", id.describe());
                Ok(State::not_found())
            }
        }
    }

    pub async fn update_resource(&self, id: &str, config: &Attributes) -> ProviderResult<State> {
        let id: H::Id = parse_id(id)?;
        if !self.handler.supports_update() {
            return Err(ProviderError::unsupported(format!(
                "updating {} is not supported, the resource must be replaced",
                id.describe()
            )));
        }
        let model = self.decode_config(config)?;

        log::info!("updating {}", id.describe());
        with_timeout(
            self.timeouts.update,
            &format!("updating {}", id.describe()),
            self.handler.update(&id, &model),
        )
        .await?;

        self.read_back(&id, config).await
    }

    pub async fn delete_resource(&self, id: &str) -> ProviderResult<()> {
        let id: H::Id = parse_id(id)?;

        log::info!("deleting {}", id.describe());
        let result = with_timeout(
            self.timeouts.delete,
            &format!("deleting {}", id.describe()),
            self.handler.delete(&id),
        )
        .await;

        match result {
            Err(e) if e.is_not_found() => {
                log::debug!("{} was already deleted", id.describe());
                Ok(())
            }
            other => other,
        }
    }

    pub async fn import_resource(&self, id: &str) -> ProviderResult<State> {
        let parsed: H::Id = parse_id(id)?;
        let state = self.read_resource(id).await?;
        if !state.exists {
            return Err(ProviderError::not_found(format!(
                "cannot import non-existent {}",
                parsed.describe()
            )));
        }
        Ok(state)
    }
}

impl<H: ResourceHandler> ManagedResource for Managed<H> {
    fn type_name(&self) -> &'static str {
        self.handler.type_name()
    }

    fn schema(&self) -> ResourceSchema {
        self.handler.schema()
    }

    fn validate(&self, config: &Attributes) -> ProviderResult<()> {
        self.decode_config(config)
            .map(|_| ())
            .map_err(|e| e.for_resource(self.handler.type_name()))
    }

    fn describe_id(&self, id: &str) -> ProviderResult<String> {
        parse_id::<H::Id>(id)
            .map(|parsed| parsed.describe())
            .map_err(|e| e.for_resource(self.handler.type_name()))
    }

    fn plan(&self, prior: &Attributes, desired: &Attributes) -> ProviderResult<Diff> {
        self.validate(desired)?;
        let schema = self.handler.schema();
        let mut desired = desired.clone();
        schema.apply_defaults(&mut desired);
        Ok(differ::diff(&schema, prior, &desired))
    }

    fn create(&self, config: &Attributes) -> BoxFuture<'_, ProviderResult<State>> {
        let config = config.clone();
        Box::pin(async move {
            self.create_resource(&config)
                .await
                .map_err(|e| e.for_resource(self.handler.type_name()))
        })
    }

    fn read(&self, id: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.to_string();
        Box::pin(async move {
            self.read_resource(&id)
                .await
                .map_err(|e| e.for_resource(self.handler.type_name()))
        })
    }

    fn update(&self, id: &str, config: &Attributes) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.to_string();
        let config = config.clone();
        Box::pin(async move {
            self.update_resource(&id, &config)
                .await
                .map_err(|e| e.for_resource(self.handler.type_name()))
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            self.delete_resource(&id)
                .await
                .map_err(|e| e.for_resource(self.handler.type_name()))
        })
    }

    fn import(&self, id: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.to_string();
        Box::pin(async move {
            self.import_resource(&id)
                .await
                .map_err(|e| e.for_resource(self.handler.type_name()))
        })
    }
}

/// Per-data-source behaviour plugged into [`DataSource`]
#[async_trait]
pub trait DataSourceHandler: Send + Sync + 'static {
    type Model: Serialize + DeserializeOwned + Send + Sync;

    fn type_name(&self) -> &'static str;

    fn schema(&self) -> ResourceSchema;

    fn read_timeout(&self) -> Duration {
        Timeouts::default().read
    }

    /// Look up the object described by `query`; returns its ID and populated model
    async fn read(&self, query: &Self::Model) -> ProviderResult<Option<(String, Self::Model)>>;

    /// Description of the looked-up object for error messages
    fn describe(&self, query: &Self::Model) -> String;
}

/// Generic data source built from a [`DataSourceHandler`]
pub struct DataSource<H: DataSourceHandler> {
    handler: H,
}

impl<H: DataSourceHandler> DataSource<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    pub async fn read_data(&self, config: &Attributes) -> ProviderResult<State> {
        let query: H::Model = prepare(&self.handler.schema(), config)?;
        let description = self.handler.describe(&query);

        let found = with_timeout(
            self.handler.read_timeout(),
            &format!("reading {}", description),
            self.handler.read(&query),
        )
        .await?;

        let (id, model) =
            found.ok_or_else(|| ProviderError::not_found(format!("{} was not found", description)))?;
        let attributes = resource::encode(&model)
            .map_err(|e| ProviderError::decode("flattening response").with_cause(e))?;
        Ok(State::existing(id, attributes))
    }
}

impl<H: DataSourceHandler> ReadOnlyResource for DataSource<H> {
    fn type_name(&self) -> &'static str {
        self.handler.type_name()
    }

    fn schema(&self) -> ResourceSchema {
        self.handler.schema()
    }

    fn validate(&self, config: &Attributes) -> ProviderResult<()> {
        prepare::<H::Model>(&self.handler.schema(), config)
            .map(|_| ())
            .map_err(|e| e.for_resource(self.handler.type_name()))
    }

    fn read(&self, config: &Attributes) -> BoxFuture<'_, ProviderResult<State>> {
        let config = config.clone();
        Box::pin(async move {
            self.read_data(&config)
                .await
                .map_err(|e| e.for_resource(self.handler.type_name()))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use serde::Deserialize;

    use super::*;
    use crate::id::IdTemplate;
    use crate::provider::ErrorKind;
    use crate::resource::Value;
    use crate::schema::{AttributeSchema, AttributeType};

    const WIDGET: IdTemplate = IdTemplate::new("Example.Widgets", &["widgets"]);

    #[derive(Debug, Clone, PartialEq)]
    struct WidgetId {
        resource_group: String,
        name: String,
    }

    impl fmt::Display for WidgetId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&WIDGET.encode("sub1", &self.resource_group, &[&self.name]))
        }
    }

    impl ResourceIdentity for WidgetId {
        fn parse(id: &str) -> Result<Self, IdParseError> {
            let s = WIDGET.decode(id)?;
            Ok(Self {
                resource_group: s.resource_group,
                name: s.names[0].clone(),
            })
        }

        fn describe(&self) -> String {
            format!("Widget {:?} (Resource Group {:?})", self.name, self.resource_group)
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Widget {
        name: String,
        resource_group_name: String,
        size: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        secret: Option<String>,
    }

    #[derive(Default)]
    struct WidgetHandler {
        store: Mutex<HashMap<String, Widget>>,
        updatable: bool,
    }

    #[async_trait]
    impl ResourceHandler for WidgetHandler {
        type Model = Widget;
        type Id = WidgetId;

        fn type_name(&self) -> &'static str {
            "example_widget"
        }

        fn schema(&self) -> ResourceSchema {
            ResourceSchema::new("example_widget")
                .attribute(
                    AttributeSchema::new("name", AttributeType::String)
                        .required()
                        .force_new(),
                )
                .attribute(
                    AttributeSchema::new("resource_group_name", AttributeType::String)
                        .required()
                        .force_new(),
                )
                .attribute(AttributeSchema::new("size", AttributeType::Int).with_default(1))
                .attribute(AttributeSchema::new("secret", AttributeType::String).sensitive())
        }

        fn validate(&self, model: &Widget) -> Result<(), Vec<String>> {
            if model.size > 10 {
                return Err(vec!["`size` must not exceed 10".to_string()]);
            }
            Ok(())
        }

        fn id_for(&self, model: &Widget) -> ProviderResult<WidgetId> {
            Ok(WidgetId {
                resource_group: model.resource_group_name.clone(),
                name: model.name.clone(),
            })
        }

        async fn create(&self, id: &WidgetId, model: &Widget) -> ProviderResult<()> {
            let mut stored = model.clone();
            stored.secret = None;
            self.store.lock().unwrap().insert(id.to_string(), stored);
            Ok(())
        }

        async fn read(&self, id: &WidgetId) -> ProviderResult<Option<Widget>> {
            Ok(self.store.lock().unwrap().get(&id.to_string()).cloned())
        }

        fn supports_update(&self) -> bool {
            self.updatable
        }

        async fn update(&self, id: &WidgetId, model: &Widget) -> ProviderResult<()> {
            self.create(id, model).await
        }

        async fn delete(&self, id: &WidgetId) -> ProviderResult<()> {
            match self.store.lock().unwrap().remove(&id.to_string()) {
                Some(_) => Ok(()),
                None => Err(ProviderError::not_found(format!("{} not found", id.describe()))),
            }
        }
    }

    fn config(name: &str) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert("name".to_string(), Value::from(name));
        attrs.insert("resource_group_name".to_string(), Value::from("rg1"));
        attrs.insert("secret".to_string(), Value::from("hunter2"));
        attrs
    }

    #[tokio::test]
    async fn create_reads_back_and_keeps_sensitive_values() {
        let widgets = Managed::new(WidgetHandler::default());
        let state = widgets.create(&config("w1")).await.unwrap();

        assert!(state.exists);
        assert_eq!(
            state.id.as_deref(),
            Some("/subscriptions/sub1/resourceGroups/rg1/providers/Example.Widgets/widgets/w1")
        );
        assert_eq!(state.get("size"), Some(&Value::Int(1)));
        assert_eq!(state.get("secret"), Some(&Value::from("hunter2")));
    }

    #[tokio::test]
    async fn create_refuses_to_adopt_existing_object() {
        let widgets = Managed::new(WidgetHandler::default());
        widgets.create(&config("w1")).await.unwrap();

        let err = widgets.create(&config("w1")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyExists);
        assert_eq!(err.resource_type.as_deref(), Some("example_widget"));
    }

    #[tokio::test]
    async fn validation_happens_before_any_call() {
        let widgets = Managed::new(WidgetHandler::default());
        let mut attrs = config("w1");
        attrs.insert("size".to_string(), Value::Int(11));

        let err = widgets.create(&attrs).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(widgets.handler().store.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_of_missing_object_drops_state() {
        let widgets = Managed::new(WidgetHandler::default());
        let state = widgets
            .read("/subscriptions/sub1/resourceGroups/rg1/providers/Example.Widgets/widgets/gone")
            .await
            .unwrap();
        assert!(!state.exists);
    }

    #[tokio::test]
    async fn read_rejects_malformed_ids() {
        let widgets = Managed::new(WidgetHandler::default());
        let err = widgets
            .read("/subscriptions/sub1/resourceGroups/rg1/providers/Example.Widgets/Widgets/w1")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn describe_id_uses_the_typed_id() {
        let widgets = Managed::new(WidgetHandler::default());
        let described = widgets
            .describe_id("/subscriptions/sub1/resourceGroups/rg1/providers/Example.Widgets/widgets/w1")
            .unwrap();
        assert_eq!(described, r#"Widget "w1" (Resource Group "rg1")"#);

        let err = widgets
            .describe_id("/subscriptions/sub1/resourceGroups/rg1")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.resource_type.as_deref(), Some("example_widget"));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let widgets = Managed::new(WidgetHandler::default());
        let state = widgets.create(&config("w1")).await.unwrap();
        let id = state.id.clone().unwrap();

        widgets.delete(&id).await.unwrap();
        widgets.delete(&id).await.unwrap();
    }

    #[tokio::test]
    async fn update_requires_support() {
        let widgets = Managed::new(WidgetHandler::default());
        let id = widgets.create(&config("w1")).await.unwrap().id.unwrap();
        let err = widgets.update(&id, &config("w1")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unsupported);

        let widgets = Managed::new(WidgetHandler {
            updatable: true,
            ..Default::default()
        });
        let id = widgets.create(&config("w1")).await.unwrap().id.unwrap();
        let mut attrs = config("w1");
        attrs.insert("size".to_string(), Value::Int(5));
        let state = widgets.update(&id, &attrs).await.unwrap();
        assert_eq!(state.get("size"), Some(&Value::Int(5)));
    }

    #[tokio::test]
    async fn import_requires_existing_object() {
        let widgets = Managed::new(WidgetHandler::default());
        let err = widgets
            .import("/subscriptions/sub1/resourceGroups/rg1/providers/Example.Widgets/widgets/w9")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn plan_marks_force_new_changes() {
        let widgets = Managed::new(WidgetHandler::default());
        let mut prior = config("w1");
        prior.insert("size".to_string(), Value::Int(1));

        assert_eq!(widgets.plan(&prior, &config("w1")).unwrap(), Diff::NoChange);
        assert!(matches!(
            widgets.plan(&prior, &config("w2")).unwrap(),
            Diff::Replace { .. }
        ));
    }

    #[tokio::test]
    async fn operations_respect_timeouts() {
        let result: ProviderResult<()> = with_timeout(
            Duration::from_millis(10),
            "sleeping",
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
        )
        .await;
        assert_eq!(result.unwrap_err().kind, ErrorKind::Timeout);
    }
}
