// src/attribution.rs
//! Resolves a call-method identifier to the plugin that placed the call.

use futures::future::{self, BoxFuture, FutureExt};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::collaborators::PluginRegistry;
use crate::error::DetailError;
use crate::models::{Attribution, CallMethodId};

#[derive(Clone)]
pub struct AttributionResolver {
    registry: Arc<dyn PluginRegistry>,
}

impl AttributionResolver {
    pub fn new(registry: Arc<dyn PluginRegistry>) -> Self {
        Self { registry }
    }

    /// Looks the identifier up in the registry. Absent identifiers, registry
    /// misses and registry errors all resolve to `Unattributed`.
    pub fn resolve(&self, id: Option<CallMethodId>) -> BoxFuture<'static, Attribution> {
        let Some(id) = id else {
            return future::ready(Attribution::Unattributed).boxed();
        };

        let lookup = self.registry.lookup(id.clone());
        async move {
            match lookup.await {
                Ok(Some(info)) => {
                    debug!(call_method = %id, plugin = %info.name, "attribution resolved");
                    Attribution::Plugin(info)
                }
                Ok(None) => {
                    let miss = DetailError::PluginLookupMiss(id);
                    warn!(error = %miss, "falling back to unattributed");
                    Attribution::Unattributed
                }
                Err(e) => {
                    warn!(call_method = %id, error = %e, "plugin lookup failed, falling back to unattributed");
                    Attribution::Unattributed
                }
            }
        }
        .boxed()
    }
}
