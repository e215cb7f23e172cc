use {super::plugin::ChannelPlugin, std::collections::HashMap};

/// Registry of all loaded channel plugins, keyed by channel id.
pub struct ChannelRegistry {
    plugins: HashMap<String, Box<dyn ChannelPlugin>>,
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    pub fn register(&mut self, plugin: Box<dyn ChannelPlugin>) {
        self.plugins.insert(plugin.id().to_string(), plugin);
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&dyn ChannelPlugin> {
        self.plugins.get(id).map(|p| p.as_ref())
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Box<dyn ChannelPlugin>> {
        self.plugins.get_mut(id)
    }

    #[must_use]
    pub fn list(&self) -> Vec<&str> {
        self.plugins.keys().map(|s| s.as_str()).collect()
    }

    /// Stop every running plugin, logging failures rather than aborting the
    /// sweep partway.
    pub async fn stop_all(&mut self) {
        for (id, plugin) in &mut self.plugins {
            if plugin.is_running()
                && let Err(e) = plugin.stop().await
            {
                tracing::warn!(channel = %id, error = %e, "failed to stop channel plugin");
            }
        }
    }
}
