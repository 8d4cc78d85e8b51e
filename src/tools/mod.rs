//! Conversation tools exposed over the tool-call protocol.
//!
//! Every handler returns a JSON object with a `success` flag. Not-found and
//! validation failures come back as `{ "success": false, "error": ... }`;
//! storage, HTTP and parse failures are returned as [`Error`] for the server
//! to report as protocol errors.

pub mod args;
pub mod schema;

use crate::config::{Backend, Config, DefaultsConfig};
use crate::core::update::{UpdateResult, update_thread_with};
use crate::core::{SaveOptions, SearchHit, Thread, ThreadMetadata, generate_id, locate, search};
use crate::error::{Error, Result};
use crate::storage::{LocalStore, RemoteStore, ThreadStore};
use crate::summarize::{ChatSummarizer, Enrichment, Summarizer, enrich};
use args::{ListArgs, SaveArgs, SearchArgs, TargetArgs, UpdateArgs, decode};
use serde_json::{Value, json};
use tracing::{debug, info};

/// Stores, defaults and collaborators the tools run against.
pub struct ToolContext {
    local: Box<dyn ThreadStore>,
    remote: Option<Box<dyn ThreadStore>>,
    backend: Backend,
    defaults: DefaultsConfig,
    summarizer: Option<Box<dyn Summarizer>>,
}

impl ToolContext {
    /// Context over a local store with default settings.
    #[must_use]
    pub fn new(local: Box<dyn ThreadStore>) -> Self {
        Self {
            local,
            remote: None,
            backend: Backend::Local,
            defaults: DefaultsConfig::default(),
            summarizer: None,
        }
    }

    /// Build everything the configuration asks for.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote store or summarizer is configured but
    /// cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self> {
        let remote: Option<Box<dyn ThreadStore>> = if config.remote.is_enabled() {
            Some(Box::new(RemoteStore::new(&config.remote)?))
        } else {
            None
        };
        let summarizer = ChatSummarizer::from_config(&config.summarizer)?
            .map(|s| Box::new(s) as Box<dyn Summarizer>);

        Ok(Self {
            local: Box::new(LocalStore::new(config.storage.path.clone())),
            remote,
            backend: config.storage.backend,
            defaults: config.defaults.clone(),
            summarizer,
        })
    }

    /// Use a remote store.
    #[must_use]
    pub fn with_remote(mut self, remote: Box<dyn ThreadStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Backend used when a call does not pick one.
    #[must_use]
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Replace the defaults.
    #[must_use]
    pub fn with_defaults(mut self, defaults: DefaultsConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// Use a summarizer.
    #[must_use]
    pub fn with_summarizer(mut self, summarizer: Box<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// The store a call should use.
    ///
    /// # Errors
    ///
    /// Returns a validation error if remote storage is requested but not
    /// configured.
    pub fn store(&self, requested: Option<Backend>) -> Result<&dyn ThreadStore> {
        match requested.unwrap_or(self.backend) {
            Backend::Local => Ok(self.local.as_ref()),
            Backend::Remote => self.remote.as_deref().ok_or_else(|| {
                Error::Validation("Remote storage is not configured".to_string())
            }),
        }
    }

    /// Whether `name` is a tool this context handles.
    #[must_use]
    pub fn has_tool(name: &str) -> bool {
        schema::all_tools().iter().any(|t| t.name == name)
    }

    /// Run a tool.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown tools and for fatal storage, HTTP or
    /// parse failures. Validation failures are returned as
    /// `{ "success": false }` results instead.
    pub fn call(&self, name: &str, arguments: Value) -> Result<Value> {
        debug!(tool = name, "tool call");
        let result = match name {
            schema::SAVE => decode(name, arguments).and_then(|a: SaveArgs| self.save(&a)),
            schema::LIST => decode(name, arguments).and_then(|a: ListArgs| self.list(&a)),
            schema::GET => decode(name, arguments).and_then(|a: TargetArgs| self.get(&a)),
            schema::SEARCH => decode(name, arguments).and_then(|a: SearchArgs| self.search(&a)),
            schema::UPDATE => decode(name, arguments).and_then(|a: UpdateArgs| self.update(&a)),
            schema::DELETE => decode(name, arguments).and_then(|a: TargetArgs| self.delete(&a)),
            other => return Err(Error::InvalidState(format!("unknown tool '{other}'"))),
        };

        match result {
            Err(e) if e.is_validation() => Ok(failure(&e.to_string())),
            other => other,
        }
    }

    fn summarizer(&self) -> Option<&dyn Summarizer> {
        self.summarizer.as_deref()
    }

    fn save(&self, args: &SaveArgs) -> Result<Value> {
        let store = self.store(args.storage()?)?;
        let options = SaveOptions {
            format: args.format()?.unwrap_or(self.defaults.format),
            include_metadata: args.include_metadata.unwrap_or(self.defaults.include_metadata),
            include_timestamps: args
                .include_timestamps
                .unwrap_or(self.defaults.include_timestamps),
        };

        let mut thread = Thread {
            id: args
                .id
                .clone()
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(generate_id),
            metadata: ThreadMetadata {
                source_app: args.source_app.clone(),
                tags: args.tags.clone(),
                summary: args.summary.clone(),
                ..ThreadMetadata::new(args.title.clone())
            },
            messages: args.messages.clone(),
        };
        enrich(
            self.summarizer(),
            &mut thread,
            Enrichment {
                summary: args.generate_summary && args.summary.is_none(),
                tags: args.generate_tags,
            },
        );

        let descriptor = store.save(&thread, &options)?;
        info!(id = %descriptor.id, format = %options.format, "saved conversation");

        Ok(json!({
            "success": true,
            "conversation": descriptor,
            "messageCount": thread.messages.len(),
        }))
    }

    fn list(&self, args: &ListArgs) -> Result<Value> {
        let store = self.store(args.storage()?)?;
        let descriptors = store.list()?;
        let total = descriptors.len();
        let limit = args.limit.unwrap_or(self.defaults.list_limit);
        let conversations: Vec<_> = descriptors.into_iter().take(limit).collect();

        Ok(json!({
            "success": true,
            "conversations": conversations,
            "total": total,
        }))
    }

    fn get(&self, args: &TargetArgs) -> Result<Value> {
        let store = self.store(args.storage()?)?;
        let target = args.target();
        let Some(located) = locate(store, &target)? else {
            return Ok(not_found(&target.describe()));
        };

        let mut conversation = serde_json::to_value(&located.thread)?;
        if let (Some(descriptor), Some(object)) = (&located.descriptor, conversation.as_object_mut())
        {
            object.insert("format".to_string(), json!(descriptor.format));
            object.insert("savedAt".to_string(), json!(descriptor.saved_at));
        }

        Ok(json!({
            "success": true,
            "found": true,
            "conversation": conversation,
        }))
    }

    fn search(&self, args: &SearchArgs) -> Result<Value> {
        let store = self.store(args.storage()?)?;
        let criteria = args.criteria(self.defaults.search_limit)?;
        let hits = search(store, &criteria, args.include_relevance)?;
        let results: Vec<Value> = hits.iter().map(hit_json).collect();

        Ok(json!({
            "success": true,
            "total": results.len(),
            "results": results,
        }))
    }

    fn update(&self, args: &UpdateArgs) -> Result<Value> {
        let store = self.store(args.storage()?)?;
        let target = args.target();
        let request = args.request()?;
        let defaults = self.defaults.save_options();

        let result = update_thread_with(store, &target, &request, &defaults, |thread| {
            enrich(
                self.summarizer(),
                thread,
                Enrichment {
                    summary: args.generate_summary && args.summary.is_none(),
                    tags: false,
                },
            );
        })?;

        match result {
            UpdateResult::NotFound => Ok(not_found(&target.describe())),
            UpdateResult::Updated {
                descriptor,
                thread,
                messages_added,
            } => {
                info!(id = %descriptor.id, messages_added, "updated conversation");
                Ok(json!({
                    "success": true,
                    "found": true,
                    "conversation": descriptor,
                    "messagesAdded": messages_added,
                    "totalMessages": thread.messages.len(),
                }))
            }
        }
    }

    fn delete(&self, args: &TargetArgs) -> Result<Value> {
        let store = self.store(args.storage()?)?;
        let target = args.target();

        // Title lookups resolve to an id first; id lookups go straight to the store.
        let id = match target.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => match locate(store, &target)? {
                Some(located) => located.thread.id,
                None => return Ok(not_found(&target.describe())),
            },
        };

        if !store.delete(&id)? {
            return Ok(not_found(&target.describe()));
        }
        info!(%id, "deleted conversation");
        Ok(json!({"success": true, "deleted": true, "id": id}))
    }
}

fn failure(message: &str) -> Value {
    json!({"success": false, "error": message})
}

fn not_found(what: &str) -> Value {
    json!({
        "success": false,
        "found": false,
        "error": format!("Conversation not found for {what}"),
    })
}

fn hit_json(hit: &SearchHit) -> Value {
    let mut value = json!({
        "conversation": hit.descriptor,
        "metadata": hit.thread.metadata,
        "messageCount": hit.thread.messages.len(),
    });
    if let Some(object) = value.as_object_mut() {
        if let Some(relevance) = &hit.relevance {
            object.insert("relevance".to_string(), json!(relevance));
        }
        if let Some(details) = &hit.details {
            object.insert("details".to_string(), json!(details));
        }
    }
    value
}
